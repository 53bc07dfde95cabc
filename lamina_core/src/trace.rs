// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the redraw pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! paint pump calls at each stage. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates the per-rect
//!   [`SubFrameEvent`] and per-widget [`WidgetPaintEvent`] plus the
//!   corresponding `TraceSink` methods.

use crate::layer::DamageRoute;
use crate::rect::Rect;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a damage rectangle is injected into a layer.
#[derive(Clone, Copy, Debug)]
pub struct DamageEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
    /// The rect as submitted, before clipping.
    pub rect: Rect,
    /// Where the rect ended up.
    pub route: DamageRoute,
}

/// Emitted when a layer's frame opens and its frame rects are folded.
#[derive(Clone, Copy, Debug)]
pub struct PreframeEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
    /// Entries in the damage set before normalization.
    pub input_rects: u32,
    /// Disjoint rects the frame will draw.
    pub frame_rects: u32,
}

/// Emitted when the drawing pass moves onto a frame rect.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SubFrameEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
    /// Index into the frame rect list.
    pub rect_index: u32,
    /// The rect being drawn, in layer space.
    pub rect: Rect,
}

/// Emitted when a widget finishes painting within a sub-frame.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct WidgetPaintEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
    /// Raw widget slot index.
    pub widget: u32,
    /// Draw steps the behavior took.
    pub steps: u32,
}

/// Emitted when a layer's frame closes (after the buffer swap).
#[derive(Clone, Copy, Debug)]
pub struct FrameDoneEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
    /// Disjoint rects the frame drew.
    pub rects_drawn: u32,
    /// Lifetime frame counter, including this frame.
    pub frame_draw_count: u32,
}

/// Emitted when a layer's back buffer is presented.
#[derive(Clone, Copy, Debug)]
pub struct BufferSwapEvent {
    /// Slot index of the layer on the active screen.
    pub layer: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the redraw pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when damage is injected into a layer.
    fn on_damage(&mut self, e: &DamageEvent) {
        _ = e;
    }

    /// Called when a layer's frame opens.
    fn on_preframe(&mut self, e: &PreframeEvent) {
        _ = e;
    }

    /// Called per frame rect (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_sub_frame(&mut self, e: &SubFrameEvent) {
        _ = e;
    }

    /// Called per painted widget (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_widget_paint(&mut self, e: &WidgetPaintEvent) {
        _ = e;
    }

    /// Called when a layer's frame closes.
    fn on_frame_done(&mut self, e: &FrameDoneEvent) {
        _ = e;
    }

    /// Called when a layer's back buffer is presented.
    fn on_buffer_swap(&mut self, e: &BufferSwapEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`DamageEvent`].
    #[inline]
    pub fn damage(&mut self, e: &DamageEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_damage(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PreframeEvent`].
    #[inline]
    pub fn preframe(&mut self, e: &PreframeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_preframe(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SubFrameEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn sub_frame(&mut self, e: &SubFrameEvent) {
        if let Some(s) = &mut self.sink {
            s.on_sub_frame(e);
        }
    }

    /// Emits a [`WidgetPaintEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn widget_paint(&mut self, e: &WidgetPaintEvent) {
        if let Some(s) = &mut self.sink {
            s.on_widget_paint(e);
        }
    }

    /// Emits a [`FrameDoneEvent`].
    #[inline]
    pub fn frame_done(&mut self, e: &FrameDoneEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_done(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BufferSwapEvent`].
    #[inline]
    pub fn buffer_swap(&mut self, e: &BufferSwapEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_buffer_swap(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
