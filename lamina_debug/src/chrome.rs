// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Export of a recording to the Chrome trace event format.
//!
//! The output loads in `chrome://tracing` or [Perfetto]. Each layer becomes
//! one track (its `tid` is the layer slot), every frame appears as a span
//! from preframe to completion, and damage, sub-frame, widget paint, and
//! swap records appear as instant events around it.
//!
//! Records carry no timestamps, so events are laid out one synthetic
//! microsecond apart in recorded order. Horizontal distance is sequence,
//! not time.
//!
//! [Perfetto]: https://ui.perfetto.dev

use std::io::{self, Write};

use lamina_core::layer::DamageRoute;
use lamina_core::rect::Rect;
use serde_json::json;

use crate::recorder::{self, RecordedEvent};

/// Converts a [`RecorderSink`](crate::recorder::RecorderSink) recording into
/// Chrome trace JSON.
///
/// # Errors
///
/// Returns an error when writing to `writer` fails.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events = Vec::new();
    let mut ts: u64 = 0;
    for record in recorder::decode(bytes) {
        events.push(match record {
            RecordedEvent::Damage(event) => {
                let (route, merged) = route_parts(event.route);
                json!({
                    "ph": "i",
                    "name": "Damage",
                    "cat": "damage",
                    "ts": ts,
                    "pid": 0,
                    "tid": event.layer,
                    "s": "t",
                    "args": {
                        "rect": rect_json(event.rect),
                        "route": route,
                        "merged": merged,
                    },
                })
            }
            RecordedEvent::Preframe(event) => json!({
                "ph": "B",
                "name": "Frame",
                "cat": "frame",
                "ts": ts,
                "pid": 0,
                "tid": event.layer,
                "args": {
                    "input_rects": event.input_rects,
                    "frame_rects": event.frame_rects,
                },
            }),
            RecordedEvent::SubFrame(event) => json!({
                "ph": "i",
                "name": "SubFrame",
                "cat": "paint",
                "ts": ts,
                "pid": 0,
                "tid": event.layer,
                "s": "t",
                "args": {
                    "rect_index": event.rect_index,
                    "rect": rect_json(event.rect),
                },
            }),
            RecordedEvent::WidgetPaint(event) => json!({
                "ph": "i",
                "name": "WidgetPaint",
                "cat": "paint",
                "ts": ts,
                "pid": 0,
                "tid": event.layer,
                "s": "t",
                "args": {
                    "widget": event.widget,
                    "steps": event.steps,
                },
            }),
            RecordedEvent::FrameDone(event) => json!({
                "ph": "E",
                "name": "Frame",
                "cat": "frame",
                "ts": ts,
                "pid": 0,
                "tid": event.layer,
                "args": {
                    "rects_drawn": event.rects_drawn,
                    "frame_draw_count": event.frame_draw_count,
                },
            }),
            RecordedEvent::BufferSwap(event) => json!({
                "ph": "i",
                "name": "BufferSwap",
                "cat": "frame",
                "ts": ts,
                "pid": 0,
                "tid": event.layer,
                "s": "t",
                "args": {},
            }),
        });
        ts += 1;
    }
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn rect_json(rect: Rect) -> serde_json::Value {
    json!({
        "x": rect.x,
        "y": rect.y,
        "width": rect.width,
        "height": rect.height,
    })
}

fn route_parts(route: DamageRoute) -> (&'static str, bool) {
    match route {
        DamageRoute::Current { merged } => ("current", merged),
        DamageRoute::Pending { merged } => ("pending", merged),
        DamageRoute::Dropped => ("dropped", false),
    }
}

// ---------------------------------------------------------------------------
