// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capture of trace events into a compact byte stream.
//!
//! [`RecorderSink`] implements [`TraceSink`] by appending one tagged record
//! per event to an in-memory buffer. Fields are little-endian and records
//! carry no framing beyond the leading tag byte, so the buffer can be
//! streamed over a serial link as it grows and a truncated tail simply ends
//! decoding. [`decode`] turns the bytes back into [`RecordedEvent`]s.

use lamina_core::layer::DamageRoute;
use lamina_core::rect::Rect;
use lamina_core::trace::{
    BufferSwapEvent, DamageEvent, FrameDoneEvent, PreframeEvent, SubFrameEvent, TraceSink,
    WidgetPaintEvent,
};

/// Tag byte of a damage routing record.
pub const TAG_DAMAGE: u8 = 1;
/// Tag byte of a preframe record.
pub const TAG_PREFRAME: u8 = 2;
/// Tag byte of a sub-frame record.
pub const TAG_SUB_FRAME: u8 = 3;
/// Tag byte of a widget paint record.
pub const TAG_WIDGET_PAINT: u8 = 4;
/// Tag byte of a frame completion record.
pub const TAG_FRAME_DONE: u8 = 5;
/// Tag byte of a buffer swap record.
pub const TAG_BUFFER_SWAP: u8 = 6;

// Route bytes for the final field of a damage record.
const ROUTE_CURRENT: u8 = 0;
const ROUTE_CURRENT_MERGED: u8 = 1;
const ROUTE_PENDING: u8 = 2;
const ROUTE_PENDING_MERGED: u8 = 3;
const ROUTE_DROPPED: u8 = 4;

/// A [`TraceSink`] that appends every event to a byte buffer.
///
/// The buffer is append-only. [`as_bytes`](RecorderSink::as_bytes) may be
/// called at any point to inspect or flush what has accumulated so far.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recording so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recording.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn write_rect(&mut self, rect: Rect) {
        self.write_i32(rect.x);
        self.write_i32(rect.y);
        self.write_i32(rect.width);
        self.write_i32(rect.height);
    }

    fn write_route(&mut self, route: DamageRoute) {
        let byte = match route {
            DamageRoute::Current { merged: false } => ROUTE_CURRENT,
            DamageRoute::Current { merged: true } => ROUTE_CURRENT_MERGED,
            DamageRoute::Pending { merged: false } => ROUTE_PENDING,
            DamageRoute::Pending { merged: true } => ROUTE_PENDING_MERGED,
            DamageRoute::Dropped => ROUTE_DROPPED,
        };
        self.write_u8(byte);
    }
}

impl TraceSink for RecorderSink {
    fn on_damage(&mut self, event: &DamageEvent) {
        self.write_u8(TAG_DAMAGE);
        self.write_u32(event.layer);
        self.write_rect(event.rect);
        self.write_route(event.route);
    }

    fn on_preframe(&mut self, event: &PreframeEvent) {
        self.write_u8(TAG_PREFRAME);
        self.write_u32(event.layer);
        self.write_u32(event.input_rects);
        self.write_u32(event.frame_rects);
    }

    fn on_sub_frame(&mut self, event: &SubFrameEvent) {
        self.write_u8(TAG_SUB_FRAME);
        self.write_u32(event.layer);
        self.write_u32(event.rect_index);
        self.write_rect(event.rect);
    }

    fn on_widget_paint(&mut self, event: &WidgetPaintEvent) {
        self.write_u8(TAG_WIDGET_PAINT);
        self.write_u32(event.layer);
        self.write_u32(event.widget);
        self.write_u32(event.steps);
    }

    fn on_frame_done(&mut self, event: &FrameDoneEvent) {
        self.write_u8(TAG_FRAME_DONE);
        self.write_u32(event.layer);
        self.write_u32(event.rects_drawn);
        self.write_u32(event.frame_draw_count);
    }

    fn on_buffer_swap(&mut self, event: &BufferSwapEvent) {
        self.write_u8(TAG_BUFFER_SWAP);
        self.write_u32(event.layer);
    }
}

// ---------------------------------------------------------------------------

/// A single decoded record.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A damage rectangle was routed.
    Damage(DamageEvent),
    /// A layer folded its queued damage into a frame list.
    Preframe(PreframeEvent),
    /// A layer began drawing one frame rectangle.
    SubFrame(SubFrameEvent),
    /// A widget finished painting within a sub-frame.
    WidgetPaint(WidgetPaintEvent),
    /// A layer drew its last frame rectangle.
    FrameDone(FrameDoneEvent),
    /// A layer's buffers were swapped.
    BufferSwap(BufferSwapEvent),
}

/// Decodes a recording produced by [`RecorderSink`].
///
/// The iterator stops at the first malformed or unknown record, so a
/// truncated recording yields the records that survived intact.
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter { data: bytes, pos: 0 }
}

/// Iterator over the records of a recording. Created by [`decode`].
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    fn read_i32(&mut self) -> Option<i32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(i32::from_le_bytes(bytes.try_into().ok()?))
    }

    fn read_rect(&mut self) -> Option<Rect> {
        let x = self.read_i32()?;
        let y = self.read_i32()?;
        let width = self.read_i32()?;
        let height = self.read_i32()?;
        Some(Rect::new(x, y, width, height))
    }

    fn read_route(&mut self) -> Option<DamageRoute> {
        match self.read_u8()? {
            ROUTE_CURRENT => Some(DamageRoute::Current { merged: false }),
            ROUTE_CURRENT_MERGED => Some(DamageRoute::Current { merged: true }),
            ROUTE_PENDING => Some(DamageRoute::Pending { merged: false }),
            ROUTE_PENDING_MERGED => Some(DamageRoute::Pending { merged: true }),
            ROUTE_DROPPED => Some(DamageRoute::Dropped),
            _ => None,
        }
    }

    fn decode_damage(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        let rect = self.read_rect()?;
        let route = self.read_route()?;
        Some(RecordedEvent::Damage(DamageEvent { layer, rect, route }))
    }

    fn decode_preframe(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        let input_rects = self.read_u32()?;
        let frame_rects = self.read_u32()?;
        Some(RecordedEvent::Preframe(PreframeEvent { layer, input_rects, frame_rects }))
    }

    fn decode_sub_frame(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        let rect_index = self.read_u32()?;
        let rect = self.read_rect()?;
        Some(RecordedEvent::SubFrame(SubFrameEvent { layer, rect_index, rect }))
    }

    fn decode_widget_paint(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        let widget = self.read_u32()?;
        let steps = self.read_u32()?;
        Some(RecordedEvent::WidgetPaint(WidgetPaintEvent { layer, widget, steps }))
    }

    fn decode_frame_done(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        let rects_drawn = self.read_u32()?;
        let frame_draw_count = self.read_u32()?;
        Some(RecordedEvent::FrameDone(FrameDoneEvent { layer, rects_drawn, frame_draw_count }))
    }

    fn decode_buffer_swap(&mut self) -> Option<RecordedEvent> {
        let layer = self.read_u32()?;
        Some(RecordedEvent::BufferSwap(BufferSwapEvent { layer }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        match self.read_u8()? {
            TAG_DAMAGE => self.decode_damage(),
            TAG_PREFRAME => self.decode_preframe(),
            TAG_SUB_FRAME => self.decode_sub_frame(),
            TAG_WIDGET_PAINT => self.decode_widget_paint(),
            TAG_FRAME_DONE => self.decode_frame_done(),
            TAG_BUFFER_SWAP => self.decode_buffer_swap(),
            _ => None, // unknown tag ends the stream
        }
    }
}

// ---------------------------------------------------------------------------
