// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate spaces, cumulative blending, occlusion, and picking.
//!
//! Three spaces matter:
//!
//! - **parent space** — what [`Widget::rect`](crate::widget::Widget::rect)
//!   is expressed in.
//! - **layer space** — relative to the layer's top-left corner. Damage
//!   rects, frame rects, clip rects, and all drawing use this space. The
//!   layer root's own position does not contribute: the root *is* the layer,
//!   so it maps to `(0, 0)`.
//! - **screen space** — layer space translated by the root widget's
//!   position, then optionally mirrored and rotated for the panel.

use crate::hal::Orientation;
use crate::rect::Rect;
use crate::widget::{self, INVALID, WidgetId, WidgetStore};

// -- Space conversion --

/// Converts a widget's rect to layer space. Raw-index variant.
pub(crate) fn layer_space_bounds(store: &WidgetStore, idx: u32) -> Rect {
    let mut acc = store.widget_at(idx).rect;
    if store.parent[idx as usize] == INVALID {
        // Layer root: its x/y is the layer's screen position, not an offset
        // inside the layer.
        return Rect::of_size(acc.width, acc.height);
    }
    let mut at = store.parent[idx as usize];
    while store.parent[at as usize] != INVALID {
        let r = store.widget_at(at).rect;
        acc = acc.translated(r.x, r.y);
        at = store.parent[at as usize];
    }
    acc
}

/// Converts a widget's rect to layer space.
///
/// # Panics
///
/// Panics if the handle is stale.
#[must_use]
pub fn rect_to_layer_space(store: &WidgetStore, id: WidgetId) -> Rect {
    // Validate through the handle API before touching raw columns.
    let _ = store.widget(id);
    layer_space_bounds(store, id.index())
}

/// Translates a layer-space rect into screen space given the layer's rect.
#[inline]
#[must_use]
pub const fn layer_to_screen_space(rect: Rect, layer_rect: Rect) -> Rect {
    rect.translated(layer_rect.x, layer_rect.y)
}

/// Maps a screen-space rect to physical panel coordinates.
///
/// Mirroring flips horizontally in screen space first, then the rotation is
/// applied. `display_w`/`display_h` are the logical screen dimensions the
/// rect is expressed in.
#[must_use]
pub const fn screen_to_oriented(
    rect: Rect,
    display_w: i32,
    display_h: i32,
    orientation: Orientation,
    mirrored: bool,
) -> Rect {
    let r = if mirrored {
        Rect::new(display_w - rect.x - rect.width, rect.y, rect.width, rect.height)
    } else {
        rect
    };
    match orientation {
        Orientation::Deg0 => r,
        Orientation::Deg90 => Rect::new(r.y, display_w - r.x - r.width, r.height, r.width),
        Orientation::Deg180 => Rect::new(
            display_w - r.x - r.width,
            display_h - r.y - r.height,
            r.width,
            r.height,
        ),
        Orientation::Deg270 => Rect::new(display_h - r.y - r.height, r.x, r.height, r.width),
    }
}

// -- Cumulative blending --

/// Product of the widget's and its ancestors' enabled alpha amounts.
///
/// 255 when nothing along the chain blends.
#[expect(
    clippy::cast_possible_truncation,
    reason = "a running product of factors in 0..=255 starting at 255 stays in 0..=255"
)]
pub(crate) fn cumulative_alpha(store: &WidgetStore, idx: u32) -> u8 {
    let mut acc: u32 = 255;
    let mut at = idx;
    while at != INVALID {
        let w = store.widget_at(at);
        if w.alpha_enabled {
            acc = acc * u32::from(w.alpha) / 255;
        }
        at = store.parent[at as usize];
    }
    acc as u8
}

/// Whether any widget along the ancestor chain (including `idx`) enables
/// alpha blending. A blended widget cannot occlude what is below it.
pub(crate) fn alpha_chain_enabled(store: &WidgetStore, idx: u32) -> bool {
    let mut at = idx;
    while at != INVALID {
        if store.widget_at(at).alpha_enabled {
            return true;
        }
        at = store.parent[at as usize];
    }
    false
}

/// Whether the widget and all of its ancestors are visible.
pub(crate) fn effectively_visible(store: &WidgetStore, idx: u32) -> bool {
    let mut at = idx;
    while at != INVALID {
        if !store.widget_at(at).visible {
            return false;
        }
        at = store.parent[at as usize];
    }
    true
}

// -- Occlusion --

/// Whether `rect` (layer space) is fully covered by a widget painted after
/// `idx`. Raw-index variant.
///
/// A blocker must be effectively visible, not alpha-blended anywhere along
/// its chain, promise full-rect coverage (a background style, or the
/// `opaque` hint), and contain `rect` entirely. Partial covers never count;
/// only a single widget covering the whole rect does.
pub(crate) fn occluded(store: &WidgetStore, idx: u32, rect: Rect) -> bool {
    if rect.is_degenerate() {
        return false;
    }
    let mut at = widget::next_painted_after(store, idx);
    while at != INVALID {
        let w = store.widget_at(at);
        if !w.visible {
            // A hidden widget hides its whole subtree from the paint walk.
            at = widget::next_skipping_children(store, at);
            continue;
        }
        let covers_pixels = w.opaque || !matches!(w.background, crate::widget::Background::None);
        if covers_pixels
            && effectively_visible(store, at)
            && !alpha_chain_enabled(store, at)
            && layer_space_bounds(store, at).contains_rect(rect)
        {
            return true;
        }
        at = widget::next_painted_after(store, at);
    }
    false
}

/// Whether `rect` (layer space) is fully covered by widgets painted after
/// `id`.
///
/// # Panics
///
/// Panics if the handle is stale.
#[must_use]
pub fn is_occluded(store: &WidgetStore, id: WidgetId, rect: Rect) -> bool {
    let _ = store.widget(id);
    occluded(store, id.index(), rect)
}

// -- Picking --

/// Finds the deepest visible widget containing the point, topmost first.
///
/// `x`/`y` are in layer space. Returns `None` when the point misses the
/// layer root entirely. Visibility prunes whole subtrees; enabled state is
/// deliberately not checked here, so callers can route events to disabled
/// widgets' ancestors if they wish.
#[must_use]
pub fn pick(store: &WidgetStore, root: WidgetId, x: i32, y: i32) -> Option<WidgetId> {
    if !store.is_alive(root) {
        return None;
    }
    let idx = root.index();
    let w = store.widget_at(idx);
    if !w.visible || !Rect::of_size(w.rect.width, w.rect.height).contains_point(x, y) {
        return None;
    }
    Some(store.id_at(pick_in(store, idx, x, y)))
}

/// Descends into the topmost child containing the (local) point.
fn pick_in(store: &WidgetStore, idx: u32, lx: i32, ly: i32) -> u32 {
    // Walk to the last child, then scan top to bottom.
    let mut child = store.first_child[idx as usize];
    if child == INVALID {
        return idx;
    }
    while store.next_sibling[child as usize] != INVALID {
        child = store.next_sibling[child as usize];
    }
    while child != INVALID {
        let w = store.widget_at(child);
        if w.visible && w.rect.contains_point(lx, ly) {
            return pick_in(store, child, lx - w.rect.x, ly - w.rect.y);
        }
        child = store.prev_sibling[child as usize];
    }
    idx
}
