// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage-tracked widget layers and incremental redraw for embedded displays.
//!
//! `lamina_core` is a retained-mode compositor core for resource-constrained
//! displays. Widgets live in an arena-backed tree rooted at per-display
//! *layers*; mutations queue *damage rectangles* against the owning layer, and
//! the paint machine redraws only the damaged, visible, non-occluded geometry,
//! cooperating with the display's buffer swap chain. It is `no_std` compatible
//! (with `alloc`) and uses struct-of-arrays storage with generational index
//! handles.
//!
//! # Architecture
//!
//! One frame of work flows through the crate like this:
//!
//! ```text
//!   widget mutators (move/resize/show/…)
//!       │
//!       ▼
//!   Layer::add_damage ──► current_damage (or pending_damage mid-frame)
//!                              │
//!       Context::update ───────┘
//!            │
//!            ▼
//!   Layer::preframe ──► frame_rects (disjoint) ──► paint per sub-frame
//!                                                      │
//!            ┌─────────────────────────────────────────┘
//!            ▼
//!   DisplayDriver::swap_layer ──► Layer::finish_frame (buffer catch-up)
//! ```
//!
//! **[`rect`]** — Integer rect algebra: clip, combine, split, containment.
//!
//! **[`rect_list`]** — Ordered damage-rect lists with first-match merging,
//! dedup, similar-merge, and overlap removal.
//!
//! **[`widget`]** — Struct-of-arrays widget tree with generational handles;
//! geometry, visibility, dirty state, and a behavior object per widget.
//!
//! **[`layer`]** — Per-display-layer damage lifecycle: the
//! `Ready → Preframe → InProgress → Complete` frame machine, multi-buffer
//! coherency, and the disjoint frame-rect set.
//!
//! **[`context`]** — The paint driver: an explicitly passed orchestrator that
//! walks layers through preframe/draw/postlayer with cooperative preemption.
//!
//! **[`screen`]** — Layer slots, orientation, show/hide lifecycle.
//!
//! **[`space`]** — Coordinate-space conversion, occlusion tests, hit-testing.
//!
//! **[`draw`]** — The resumable draw-step contract widgets implement, plus
//! the default background/border painter and color scheme.
//!
//! **[`hal`]** — The [`DisplayDriver`](hal::DisplayDriver) trait the engine
//! renders through; the only place pixels are touched.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! damage/paint instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): forwards std support to dependencies.
//! - `trace` (disabled by default): enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): gates per-widget
//!   and per-sub-frame events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod context;
pub mod dirty;
pub mod draw;
pub mod error;
pub mod hal;
pub mod layer;
pub mod rect;
pub mod rect_list;
pub mod screen;
pub mod space;
pub mod trace;
pub mod widget;
