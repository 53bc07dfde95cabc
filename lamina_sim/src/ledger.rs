// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Redraw-efficiency accounting and grading.
//!
//! [`RedrawLedger`] consumes one [`RedrawSample`] per completed frame — the
//! pixels the engine decided to repaint against the pixels the driver
//! actually wrote — and grades how well damage tracking is holding up.
//! Overdraw near 1.0 means the frame rects are tight and widgets paint only
//! what changed; a climbing ratio, or a steady diet of full-layer frames,
//! means damage has degraded into "repaint everything".

use lamina_core::rect::Rect;

/// Per-frame accounting fed into [`RedrawLedger::observe`].
#[derive(Clone, Copy, Debug)]
pub struct RedrawSample {
    /// Total area of the frame's rect list, in pixels.
    pub pixels_damaged: u64,
    /// Pixels the driver reported writing for the frame.
    pub pixels_written: u64,
    /// Entries in the frame rect list.
    pub rects_drawn: u32,
    /// The frame repainted the whole layer.
    pub full_redraw: bool,
}

impl RedrawSample {
    /// Builds a sample from a frame's rect list.
    ///
    /// The list is disjoint after preframe folding, so summing areas counts
    /// each damaged pixel once. A list that is exactly the layer bounds
    /// counts as a full redraw.
    #[must_use]
    pub fn for_frame(frame_rects: &[Rect], bounds: Rect, pixels_written: u64) -> Self {
        let mut damaged: u64 = 0;
        for &rect in frame_rects {
            damaged += rect.area().unsigned_abs();
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "damage lists are capped far below u32::MAX"
        )]
        let rects_drawn = frame_rects.len() as u32;
        Self {
            pixels_damaged: damaged,
            pixels_written,
            rects_drawn,
            full_redraw: frame_rects.len() == 1 && frame_rects[0] == bounds,
        }
    }
}

/// Letter grade for redraw efficiency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Efficiency {
    /// Tight frame rects, negligible overdraw.
    A,
    /// Moderate overdraw.
    B,
    /// Heavy overdraw or frequent full redraws.
    C,
    /// Damage tracking is not earning its keep.
    D,
}

impl Efficiency {
    /// Returns a short label for HUD rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// Aggregated report returned by [`RedrawLedger::observe`].
#[derive(Clone, Copy, Debug)]
pub struct RedrawReport {
    /// Current grade.
    pub grade: Efficiency,
    /// This frame's written/damaged ratio.
    pub overdraw: f64,
    /// Full-layer redraws per 1000 observed frames.
    pub full_redraws_per_1000: f64,
    /// Total frames observed.
    pub total_frames: u64,
    /// Total full-layer redraws observed.
    pub full_redraws: u64,
}

/// Rolling efficiency ledger with fixed-size overdraw history.
#[derive(Debug)]
pub struct RedrawLedger<const N: usize> {
    overdraw: [f64; N],
    cursor: usize,
    total_frames: u64,
    full_redraws: u64,
}

impl<const N: usize> Default for RedrawLedger<N> {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl<const N: usize> RedrawLedger<N> {
    /// Creates a ledger with `seed_overdraw` prefilled in the ring buffer.
    #[must_use]
    pub const fn new(seed_overdraw: f64) -> Self {
        Self {
            overdraw: [seed_overdraw; N],
            cursor: 0,
            total_frames: 0,
            full_redraws: 0,
        }
    }

    /// Folds one frame into the ledger and returns an updated report.
    ///
    /// A sample with zero damaged pixels but nonzero writes grades as if
    /// every written pixel were overdraw.
    #[must_use]
    pub fn observe(&mut self, sample: RedrawSample) -> RedrawReport {
        self.total_frames = self.total_frames.saturating_add(1);
        let overdraw = sample.pixels_written as f64 / sample.pixels_damaged.max(1) as f64;
        self.overdraw[self.cursor % N] = overdraw;
        self.cursor = (self.cursor + 1) % N;

        if sample.full_redraw {
            self.full_redraws = self.full_redraws.saturating_add(1);
        }

        let full_rate = self.full_redraws as f64 * 1000.0 / self.total_frames as f64;
        let grade = grade_for(overdraw, full_rate);

        RedrawReport {
            grade,
            overdraw,
            full_redraws_per_1000: full_rate,
            total_frames: self.total_frames,
            full_redraws: self.full_redraws,
        }
    }

    /// Returns ring-buffer overdraw ratios oldest→newest.
    #[must_use]
    pub fn overdraw_history(&self) -> [f64; N] {
        let mut out = [0.0; N];
        let mut i = 0;
        while i < N {
            out[i] = self.overdraw[(self.cursor + i) % N];
            i += 1;
        }
        out
    }

    /// Returns an ASCII sparkline over `overdraw_history()`.
    #[must_use]
    pub fn sparkline_ascii(&self, min: f64, max: f64) -> String {
        const LEVELS: &[u8] = b" .:-=+*#%@";
        let mut out = String::with_capacity(N);
        let mut i = 0;
        while i < N {
            let v = self.overdraw[(self.cursor + i) % N].clamp(min, max);
            let t = (v - min) / (max - min);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "index is clamped to ASCII level count"
            )]
            let level = (t * (LEVELS.len() as f64 - 1.0) + 0.5) as usize;
            out.push(LEVELS[level] as char);
            i += 1;
        }
        out
    }
}

fn grade_for(overdraw: f64, full_redraws_per_1000: f64) -> Efficiency {
    if overdraw < 1.5 && full_redraws_per_1000 < 10.0 {
        Efficiency::A
    } else if overdraw < 2.5 && full_redraws_per_1000 < 100.0 {
        Efficiency::B
    } else if overdraw < 4.0 && full_redraws_per_1000 < 400.0 {
        Efficiency::C
    } else {
        Efficiency::D
    }
}

// ---------------------------------------------------------------------------
