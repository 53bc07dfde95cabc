// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget tree data model.
//!
//! A *widget* is a node in a layer's paint tree. Each widget has:
//!
//! - An identity ([`WidgetId`]) — a generational handle that becomes stale
//!   when the widget is destroyed, preventing use-after-free bugs at the API
//!   level.
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   tree. Sibling order is paint order (first child at the bottom).
//! - A property record ([`Widget`]) — bounds in parent space, visibility,
//!   blending, background and border styles, color scheme, and the dirty and
//!   draw-cursor bookkeeping the paint loop works from.
//! - A behavior — a boxed [`WidgetBehavior`](crate::draw::WidgetBehavior)
//!   that paints the widget in resumable steps and receives lifecycle hooks.
//!
//! Widgets are stored in struct-of-arrays layout with index-based handles
//! for cache-friendly traversal.
//!
//! # Damage routing
//!
//! Property records are plain data; mutating one does not schedule a repaint
//! on its own. The [`Context`](crate::context::Context) mutators wrap record
//! changes with damage for the old and new footprint, which is what makes a
//! moved or restyled widget actually show up.

mod id;
mod props;
mod store;
mod traverse;

pub use id::{INVALID, WidgetId};
pub use props::{Background, Border, PixelCache, Widget};
pub use store::WidgetStore;
pub use traverse::{Children, next_above};

pub(crate) use traverse::{next_painted_after, next_skipping_children};
