// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`TraceSink`] that prints one line per event.
//!
//! Useful while bringing up a display driver, or when a layer repaints more
//! or less than expected: attach a [`PrettyPrintSink`] for a frame or two
//! and read the damage and paint decisions as they were made.

use std::fmt;
use std::io::{self, Write};

use lamina_core::layer::DamageRoute;
use lamina_core::trace::{
    BufferSwapEvent, DamageEvent, FrameDoneEvent, PreframeEvent, SubFrameEvent, TraceSink,
    WidgetPaintEvent,
};

/// A [`TraceSink`] that writes one human-readable line per event.
///
/// Write errors are swallowed; a tracing sink has nowhere to report them.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that prints to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self { writer: Box::new(io::stderr()) }
    }

    /// Creates a sink that prints to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that prints to `writer`.
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_damage(&mut self, event: &DamageEvent) {
        let _ = writeln!(
            self.writer,
            "[damage] layer={} {:?} -> {}",
            event.layer,
            event.rect,
            route_name(event.route)
        );
    }

    fn on_preframe(&mut self, event: &PreframeEvent) {
        let _ = writeln!(
            self.writer,
            "[preframe] layer={} {} damage rects -> {} frame rects",
            event.layer, event.input_rects, event.frame_rects
        );
    }

    fn on_sub_frame(&mut self, event: &SubFrameEvent) {
        let _ = writeln!(
            self.writer,
            "[sub-frame] layer={} rect {}: {:?}",
            event.layer, event.rect_index, event.rect
        );
    }

    fn on_widget_paint(&mut self, event: &WidgetPaintEvent) {
        let _ = writeln!(
            self.writer,
            "[widget] layer={} widget {} painted in {} steps",
            event.layer, event.widget, event.steps
        );
    }

    fn on_frame_done(&mut self, event: &FrameDoneEvent) {
        let _ = writeln!(
            self.writer,
            "[frame-done] layer={} {} rects drawn, frame {}",
            event.layer, event.rects_drawn, event.frame_draw_count
        );
    }

    fn on_buffer_swap(&mut self, event: &BufferSwapEvent) {
        let _ = writeln!(self.writer, "[swap] layer={}", event.layer);
    }
}

fn route_name(route: DamageRoute) -> &'static str {
    match route {
        DamageRoute::Current { merged: false } => "current",
        DamageRoute::Current { merged: true } => "current (merged)",
        DamageRoute::Pending { merged: false } => "pending",
        DamageRoute::Pending { merged: true } => "pending (merged)",
        DamageRoute::Dropped => "dropped",
    }
}

// ---------------------------------------------------------------------------
