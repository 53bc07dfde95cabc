// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostic sinks for the `lamina_core` trace stream.
//!
//! `lamina_core` reports the life of every frame through the
//! [`TraceSink`](lamina_core::trace::TraceSink) trait: damage routing,
//! preframe folding, per-rectangle sub-frames, widget paint, and buffer
//! swaps. This crate provides three consumers for that stream:
//!
//! - [`recorder`] captures events into a compact byte buffer that can be
//!   stored and decoded later, away from the device that produced it.
//! - [`pretty`] prints one human-readable line per event, for watching a
//!   frame unfold on a terminal.
//! - [`chrome`] converts a recording into the Chrome trace event format so
//!   it can be inspected in `chrome://tracing` or [Perfetto].
//!
//! The usual arrangement on a constrained target is to record on-device
//! with [`recorder::RecorderSink`] and ship the bytes off-device for
//! [`chrome::export`] or [`recorder::decode`].
//!
//! [Perfetto]: https://ui.perfetto.dev

pub mod chrome;
pub mod pretty;
pub mod recorder;
