// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-widget properties.

use alloc::vec::Vec;
use core::fmt;

use crate::dirty::DirtyState;
use crate::draw::{DrawState, Scheme};
use crate::hal::Color;
use crate::rect::Rect;

/// How a widget paints the area behind its content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Background {
    /// Nothing is painted. The widget relies on whatever is already in the
    /// framebuffer, which is only coherent when an opaque ancestor repaints
    /// together with it.
    None,
    /// The area is flood-filled with the scheme base color.
    #[default]
    Fill,
    /// The pixels underneath the widget are captured on first paint and
    /// restored on every later paint, simulating transparency without
    /// repainting ancestors.
    Cache,
}

/// Outline style painted after the background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Border {
    /// No outline.
    #[default]
    None,
    /// A one-pixel rectangle in the shadow color.
    Line,
    /// A two-pixel raised bevel (light top-left, dark bottom-right).
    Bevel,
}

/// A captured rectangle of framebuffer pixels backing [`Background::Cache`].
#[derive(Clone, PartialEq, Eq)]
pub struct PixelCache {
    /// Layer-space rectangle the pixels were read from.
    pub rect: Rect,
    /// Row-major pixels, `rect.width * rect.height` entries.
    pub pixels: Vec<Color>,
}

impl fmt::Debug for PixelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelCache({:?}, {} px)", self.rect, self.pixels.len())
    }
}

/// Property record for one widget.
///
/// Plain attribute fields are public. Geometry and visibility changes must
/// still go through the [`Context`](crate::context::Context) mutators so the
/// owning layer receives damage for both the old and new footprint; writing
/// `rect` directly moves the widget without scheduling any repaint.
#[derive(Clone, Debug)]
pub struct Widget {
    /// Bounds in parent space. For a layer root this is the layer's position
    /// and size on the display.
    pub rect: Rect,
    /// Hidden widgets are skipped by paint, pick, and invalidation, together
    /// with their entire subtree.
    pub visible: bool,
    /// Disabled widgets still paint but do not accept focus or input.
    pub enabled: bool,
    /// When set, `alpha` participates in cumulative blending down the tree.
    pub alpha_enabled: bool,
    /// Blend amount, 255 = opaque. Ignored unless `alpha_enabled`.
    pub alpha: u8,
    /// Promise that the widget paints every pixel of its rect. Lets the
    /// occlusion walk treat it as a blocker even with `Background::None`.
    pub opaque: bool,
    /// Background style.
    pub background: Background,
    /// Border style.
    pub border: Border,
    /// Color scheme. `None` suppresses painting of this widget entirely.
    pub scheme: Option<Scheme>,
    /// Captured pixels for [`Background::Cache`]. Invalidated on resize.
    pub cache: Option<PixelCache>,
    dirty: DirtyState,
    draw_state: DrawState,
}

impl Widget {
    /// Returns a record with default attributes.
    ///
    /// New widgets start fully dirty so that their first frame paints them.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rect: Rect::EMPTY,
            visible: true,
            enabled: true,
            alpha_enabled: false,
            alpha: 255,
            opaque: false,
            background: Background::Fill,
            border: Border::None,
            scheme: None,
            cache: None,
            dirty: DirtyState::Dirty,
            draw_state: DrawState::START,
        }
    }

    /// Current dirty state.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> DirtyState {
        self.dirty
    }

    /// Forces the dirty state, including downward transitions.
    ///
    /// Invalidation and paint use the raise-only path internally and never
    /// lower a state by accident; this is the explicit override.
    #[inline]
    pub fn set_dirty(&mut self, state: DirtyState) {
        self.dirty = state;
    }

    /// Raises the dirty state, never lowering it.
    #[inline]
    pub(crate) fn raise_dirty(&mut self, target: DirtyState) {
        self.dirty = self.dirty.raise(target);
    }

    /// Current draw cursor.
    #[inline]
    #[must_use]
    pub const fn draw_state(&self) -> DrawState {
        self.draw_state
    }

    /// Sets the draw cursor. Behaviors advance this between draw steps.
    #[inline]
    pub fn set_draw_state(&mut self, state: DrawState) {
        self.draw_state = state;
    }
}

impl Default for Widget {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
