// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer damage tracking and the frame state machine.
//!
//! Every hardware layer owns one [`Layer`] record. Damage flows through it in
//! stages:
//!
//! ```text
//!   add_damage ──▶ current ──preframe──▶ frame rects ──▶ draw ──▶ finish
//!       │                      ▲                                    │
//!       └──(mid-frame)──▶ pending ───────(bounce at finish)─────────┘
//! ```
//!
//! - **current** accumulates damage for the next frame, merged on insert.
//! - **pending** catches damage that arrives while a frame is being drawn,
//!   so a running frame never observes its own rect list changing.
//! - **prev** remembers the last frame's damage when the layer has more than
//!   one buffer, so the buffer that was *not* written last frame catches up.
//! - **frame rects** is the normalized, mutually disjoint list the drawing
//!   pass walks one rectangle at a time. Disjointness is what guarantees no
//!   pixel is composited twice per frame.
//!
//! The frame state gates the routing: [`Ready`](LayerFrameState::Ready) and
//! [`Preframe`](LayerFrameState::Preframe) route into `current`;
//! [`InProgress`](LayerFrameState::InProgress) and
//! [`Complete`](LayerFrameState::Complete) route into `pending`.

use crate::error::Rejection;
use crate::hal::{BufferSpec, Color};
use crate::rect::Rect;
use crate::rect_list::RectList;
use crate::widget::WidgetId;

/// Largest supported swap chain depth.
pub const MAX_BUFFERS: usize = 3;

/// Where a layer is in its redraw cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerFrameState {
    /// Nothing to draw.
    #[default]
    Ready,
    /// Damage is queued; the next paint pump will open a frame.
    Preframe,
    /// Frame rects are being drawn.
    InProgress,
    /// All frame rects drawn; waiting for the buffer swap.
    Complete,
}

/// Where [`Layer::add_damage`] put a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageRoute {
    /// Joined the upcoming frame. `merged` is true when an existing entry
    /// absorbed it instead of a new one being appended.
    Current {
        /// Absorbed by an existing entry.
        merged: bool,
    },
    /// A frame was mid-flight; deferred to the frame after it.
    Pending {
        /// Absorbed by an existing entry.
        merged: bool,
    },
    /// Clipped to nothing by the layer bounds.
    Dropped,
}

/// Damage bookkeeping and scan-out configuration for one hardware layer.
///
/// A layer owns the root of a widget tree (created and stored separately in
/// the [`WidgetStore`](crate::widget::WidgetStore)) plus the rect lists and
/// frame state that drive incremental redraw. Geometry is not duplicated
/// here: the root widget's rect *is* the layer's position and size, and
/// methods that need it take `bounds`, the layer-space rect
/// `Rect::of_size(width, height)`.
#[derive(Debug)]
pub struct Layer {
    root: WidgetId,
    frame_state: LayerFrameState,

    // -- Damage lists --
    prev_damage: RectList,
    current_damage: RectList,
    pending_damage: RectList,
    scratch: RectList,
    frame_rects: RectList,
    frame_rect_idx: usize,
    /// Frames completed over the layer's lifetime. The multi-buffer
    /// bootstrap keys off values 0 and 1, so this never resets.
    frame_draw_count: u32,

    // -- Scan-out configuration --
    buffer_count: u32,
    buffer_specs: [BufferSpec; MAX_BUFFERS],
    vsync: bool,
    alpha_enabled: bool,
    alpha: u8,
    mask_enabled: bool,
    mask_color: Color,

    // -- Input --
    input_rect: Rect,
    input_rect_locked: bool,
    allow_input_pass_through: bool,

    // -- Lifecycle --
    deleting: bool,
    delta_accum: u32,
}

impl Layer {
    /// Creates a layer over the given root widget.
    ///
    /// Starts with a single buffer, vsync on, no blending, no mask.
    #[must_use]
    pub fn new(root: WidgetId) -> Self {
        Self {
            root,
            frame_state: LayerFrameState::Ready,
            prev_damage: RectList::new(),
            current_damage: RectList::new(),
            pending_damage: RectList::new(),
            scratch: RectList::new(),
            frame_rects: RectList::new(),
            frame_rect_idx: 0,
            frame_draw_count: 0,
            buffer_count: 1,
            buffer_specs: [BufferSpec::Auto; MAX_BUFFERS],
            vsync: true,
            alpha_enabled: false,
            alpha: 255,
            mask_enabled: false,
            // Classic chroma key.
            mask_color: Color::rgb(0xFF, 0x00, 0xFF),
            input_rect: Rect::EMPTY,
            input_rect_locked: true,
            allow_input_pass_through: false,
            deleting: false,
            delta_accum: 0,
        }
    }

    /// Handle of the root widget.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> WidgetId {
        self.root
    }

    /// Current frame state.
    #[inline]
    #[must_use]
    pub const fn frame_state(&self) -> LayerFrameState {
        self.frame_state
    }

    // -- Damage pipeline --

    /// Queues a damaged rectangle, in layer space.
    ///
    /// The rect is clipped to `bounds` first; what survives routes into the
    /// current list, or into the pending list when a frame is mid-flight.
    /// With `no_combine` the rect is kept separate from overlapping entries
    /// (containment still absorbs it), which callers use when they know
    /// merging would bloat the repainted area.
    ///
    /// A `Ready` layer moves to `Preframe`; the caller is responsible for
    /// marking the root widget dirty on that transition.
    ///
    /// # Errors
    ///
    /// [`Rejection::LayerDeleting`] while the layer is being torn down.
    pub fn add_damage(
        &mut self,
        bounds: Rect,
        rect: Rect,
        no_combine: bool,
    ) -> Result<DamageRoute, Rejection> {
        if self.deleting {
            return Err(Rejection::LayerDeleting);
        }
        let clipped = rect.clip(bounds);
        if clipped.is_degenerate() {
            return Ok(DamageRoute::Dropped);
        }
        if self.frame_state < LayerFrameState::InProgress {
            let merged = self.current_damage.add_damage(clipped, no_combine);
            if self.frame_state == LayerFrameState::Ready {
                self.frame_state = LayerFrameState::Preframe;
            }
            Ok(DamageRoute::Current { merged })
        } else {
            let merged = self.pending_damage.add_damage(clipped, no_combine);
            Ok(DamageRoute::Pending { merged })
        }
    }

    /// Opens a frame: folds queued damage into the disjoint frame rect list.
    ///
    /// With more than one buffer the previous frame's damage joins the input
    /// set, because the buffer about to be written missed that frame. The
    /// combined set is normalized, then folded so that no two frame rects
    /// overlap: each rect either lands whole, or is split around an earlier
    /// rect and its remainder re-queued.
    pub fn preframe(&mut self) {
        self.frame_state = LayerFrameState::InProgress;
        self.scratch.clear();
        if self.buffer_count > 1 {
            self.scratch.extend_from(&self.prev_damage);
        }
        self.scratch.extend_from(&self.current_damage);
        self.scratch.normalize();

        self.frame_rects.clear();
        while let Some(rect) = self.scratch.take_front() {
            self.fold_into_frame_list(rect);
        }
        self.frame_rect_idx = 0;

        if self.frame_rects.is_empty() {
            // Nothing survived normalization; the frame has no work.
            self.frame_state = LayerFrameState::Complete;
        }
    }

    /// Folds one rect into `frame_rects`, keeping the list disjoint.
    fn fold_into_frame_list(&mut self, rect: Rect) {
        for &entry in self.frame_rects.as_slice() {
            if entry.contains_rect(rect) {
                // Already covered.
                return;
            }
            if entry.intersects(rect) {
                // Keep the non-overlapping remainder for a later pass.
                for &piece in &rect.split_around(entry) {
                    self.scratch.push(piece);
                }
                return;
            }
        }
        self.frame_rects.push(rect);
    }

    /// The rect the drawing pass should paint now, if the frame has one.
    #[must_use]
    pub fn current_frame_rect(&self) -> Option<Rect> {
        if self.frame_state == LayerFrameState::InProgress {
            self.frame_rects.get(self.frame_rect_idx)
        } else {
            None
        }
    }

    /// Advances to the next frame rect after one has been fully painted.
    ///
    /// Returns `true` when the frame is complete and the layer is ready for
    /// its buffer swap.
    pub fn postframe(&mut self) -> bool {
        self.frame_rect_idx += 1;
        if self.frame_rect_idx >= self.frame_rects.len() {
            self.frame_state = LayerFrameState::Complete;
            true
        } else {
            false
        }
    }

    /// Closes the frame after the buffer swap.
    ///
    /// Rolls damage history forward for multi-buffer coherency. The first
    /// two frames of a layer's life bootstrap the history: after frame zero
    /// the whole layer is carried (the other buffer has never been written),
    /// after frame one nothing is (both buffers have seen a full pass).
    /// Damage deferred to `pending` during the frame bounces into `current`
    /// and re-opens the layer at `Preframe` so the next pump redraws
    /// immediately.
    pub fn finish_frame(&mut self, bounds: Rect) {
        if self.buffer_count > 1 {
            self.prev_damage.clone_from(&self.current_damage);
            if self.frame_draw_count == 0 {
                self.prev_damage.clear();
                self.prev_damage.push(bounds);
            } else if self.frame_draw_count == 1 {
                self.prev_damage.clear();
            }
        }

        self.current_damage.clear();
        if self.pending_damage.is_empty() {
            self.frame_state = LayerFrameState::Ready;
        } else {
            core::mem::swap(&mut self.current_damage, &mut self.pending_damage);
            self.frame_state = LayerFrameState::Preframe;
        }
        self.frame_draw_count = self.frame_draw_count.wrapping_add(1);
    }

    // -- Damage list inspection --

    /// Damage queued for the next frame.
    #[must_use]
    pub fn current_damage(&self) -> &RectList {
        &self.current_damage
    }

    /// Damage deferred while the running frame completes.
    #[must_use]
    pub fn pending_damage(&self) -> &RectList {
        &self.pending_damage
    }

    /// The previous frame's damage (multi-buffer history).
    #[must_use]
    pub fn prev_damage(&self) -> &RectList {
        &self.prev_damage
    }

    /// The disjoint rect list of the open frame.
    #[must_use]
    pub fn frame_rects(&self) -> &RectList {
        &self.frame_rects
    }

    /// Index of the frame rect being drawn.
    #[inline]
    #[must_use]
    pub const fn frame_rect_index(&self) -> usize {
        self.frame_rect_idx
    }

    /// Frames completed over the layer's lifetime.
    #[inline]
    #[must_use]
    pub const fn frame_draw_count(&self) -> u32 {
        self.frame_draw_count
    }

    // -- Scan-out configuration --

    /// Swap chain depth.
    #[inline]
    #[must_use]
    pub const fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    /// Sets the swap chain depth, clamped to `1..=MAX_BUFFERS`.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the depth is already in effect.
    pub fn set_buffer_count(&mut self, count: u32) -> Result<(), Rejection> {
        let clamped = count.clamp(1, MAX_BUFFERS as u32);
        if clamped == self.buffer_count {
            return Err(Rejection::Unchanged);
        }
        self.buffer_count = clamped;
        Ok(())
    }

    /// Backing store of one swap chain slot.
    ///
    /// # Errors
    ///
    /// [`Rejection::BufferIndex`] for slots past `MAX_BUFFERS`.
    pub fn buffer_spec(&self, idx: usize) -> Result<BufferSpec, Rejection> {
        self.buffer_specs
            .get(idx)
            .copied()
            .ok_or(Rejection::BufferIndex(idx))
    }

    /// Backing stores of the active swap chain slots, front first.
    #[must_use]
    pub fn buffer_specs(&self) -> &[BufferSpec] {
        &self.buffer_specs[..self.buffer_count as usize]
    }

    /// Sets the backing store of one swap chain slot.
    ///
    /// # Errors
    ///
    /// [`Rejection::BufferIndex`] for slots past `MAX_BUFFERS`;
    /// [`Rejection::Unchanged`] when the spec is already in effect.
    pub fn set_buffer_spec(&mut self, idx: usize, spec: BufferSpec) -> Result<(), Rejection> {
        let slot = self
            .buffer_specs
            .get_mut(idx)
            .ok_or(Rejection::BufferIndex(idx))?;
        if *slot == spec {
            return Err(Rejection::Unchanged);
        }
        *slot = spec;
        Ok(())
    }

    /// Whether buffer swaps wait for vertical sync.
    #[inline]
    #[must_use]
    pub const fn vsync(&self) -> bool {
        self.vsync
    }

    /// Ties buffer swaps to vertical sync.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_vsync(&mut self, enabled: bool) -> Result<(), Rejection> {
        if self.vsync == enabled {
            return Err(Rejection::Unchanged);
        }
        self.vsync = enabled;
        Ok(())
    }

    /// Layer-level alpha blending, applied by the scan-out hardware.
    #[inline]
    #[must_use]
    pub const fn alpha(&self) -> (bool, u8) {
        (self.alpha_enabled, self.alpha)
    }

    /// Configures layer-level alpha blending.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_alpha(&mut self, enabled: bool, amount: u8) -> Result<(), Rejection> {
        if self.alpha_enabled == enabled && self.alpha == amount {
            return Err(Rejection::Unchanged);
        }
        self.alpha_enabled = enabled;
        self.alpha = amount;
        Ok(())
    }

    /// Chroma-key mask, applied by the scan-out hardware.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> (bool, Color) {
        (self.mask_enabled, self.mask_color)
    }

    /// Configures the chroma-key mask.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_mask(&mut self, enabled: bool, color: Color) -> Result<(), Rejection> {
        if self.mask_enabled == enabled && self.mask_color == color {
            return Err(Rejection::Unchanged);
        }
        self.mask_enabled = enabled;
        self.mask_color = color;
        Ok(())
    }

    // -- Input --

    /// The rect input events are tested against, in layer space.
    ///
    /// While locked (the default) this mirrors the layer bounds.
    #[must_use]
    pub fn input_rect(&self, bounds: Rect) -> Rect {
        if self.input_rect_locked {
            bounds
        } else {
            self.input_rect
        }
    }

    /// Decouples the input rect from the layer bounds and sets it.
    pub fn set_input_rect(&mut self, rect: Rect) {
        self.input_rect = rect;
        self.input_rect_locked = false;
    }

    /// Re-ties the input rect to the layer bounds.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already locked.
    pub fn lock_input_rect(&mut self) -> Result<(), Rejection> {
        if self.input_rect_locked {
            return Err(Rejection::Unchanged);
        }
        self.input_rect_locked = true;
        Ok(())
    }

    /// Whether input that misses every widget falls through to the layer
    /// below.
    #[inline]
    #[must_use]
    pub const fn allow_input_pass_through(&self) -> bool {
        self.allow_input_pass_through
    }

    /// Sets input pass-through.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_allow_input_pass_through(&mut self, allow: bool) -> Result<(), Rejection> {
        if self.allow_input_pass_through == allow {
            return Err(Rejection::Unchanged);
        }
        self.allow_input_pass_through = allow;
        Ok(())
    }

    // -- Lifecycle --

    /// Whether the layer is being torn down.
    #[inline]
    #[must_use]
    pub const fn is_deleting(&self) -> bool {
        self.deleting
    }

    /// Marks the layer as mid-teardown; further damage is rejected.
    pub(crate) fn mark_deleting(&mut self) {
        self.deleting = true;
    }

    /// Banks update time while the layer cannot tick.
    pub(crate) fn add_delta(&mut self, dt_ms: u32) {
        self.delta_accum = self.delta_accum.saturating_add(dt_ms);
    }

    /// Takes the banked update time.
    pub(crate) fn take_delta(&mut self) -> u32 {
        core::mem::take(&mut self.delta_accum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetStore;

    const BOUNDS: Rect = Rect::of_size(100, 60);

    fn test_layer() -> Layer {
        let mut store = WidgetStore::new();
        Layer::new(store.create_default_widget())
    }

    fn disjoint(rects: &[Rect]) -> bool {
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                if a.intersects(*b) {
                    return false;
                }
            }
        }
        true
    }

    fn total_area(rects: &[Rect]) -> i64 {
        rects.iter().map(|r| r.area()).sum()
    }

    #[test]
    fn damage_routes_to_current_before_frame() {
        let mut layer = test_layer();
        assert_eq!(layer.frame_state(), LayerFrameState::Ready);

        let route = layer.add_damage(BOUNDS, Rect::new(5, 5, 10, 10), false).unwrap();
        assert_eq!(route, DamageRoute::Current { merged: false });
        assert_eq!(layer.frame_state(), LayerFrameState::Preframe);
        assert_eq!(layer.current_damage().as_slice(), [Rect::new(5, 5, 10, 10)]);
    }

    #[test]
    fn damage_clips_to_layer_bounds() {
        let mut layer = test_layer();

        // Overflowing rect is trimmed.
        layer.add_damage(BOUNDS, Rect::new(90, 50, 40, 40), false).unwrap();
        assert_eq!(layer.current_damage().as_slice(), [Rect::new(90, 50, 10, 10)]);

        // Fully outside is dropped without touching state.
        let mut other = test_layer();
        let route = other.add_damage(BOUNDS, Rect::new(200, 0, 10, 10), false).unwrap();
        assert_eq!(route, DamageRoute::Dropped);
        assert_eq!(other.frame_state(), LayerFrameState::Ready);
        assert!(other.current_damage().is_empty());
    }

    #[test]
    fn deleting_layer_rejects_damage() {
        let mut layer = test_layer();
        layer.mark_deleting();
        assert_eq!(
            layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false),
            Err(Rejection::LayerDeleting)
        );
    }

    #[test]
    fn mid_frame_damage_defers_then_bounces() {
        let mut layer = test_layer();
        layer.add_damage(BOUNDS, Rect::new(0, 0, 20, 20), false).unwrap();
        layer.preframe();
        assert_eq!(layer.frame_state(), LayerFrameState::InProgress);

        // Damage arriving mid-frame must not disturb the open frame.
        let route = layer.add_damage(BOUNDS, Rect::new(50, 0, 20, 20), false).unwrap();
        assert_eq!(route, DamageRoute::Pending { merged: false });
        assert_eq!(layer.frame_rects().len(), 1);
        assert_eq!(layer.pending_damage().as_slice(), [Rect::new(50, 0, 20, 20)]);

        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);

        // The deferred rect bounced into current and re-opened the layer.
        assert_eq!(layer.frame_state(), LayerFrameState::Preframe);
        assert_eq!(layer.current_damage().as_slice(), [Rect::new(50, 0, 20, 20)]);
        assert!(layer.pending_damage().is_empty());
    }

    #[test]
    fn preframe_builds_disjoint_frame_rects() {
        let mut layer = test_layer();
        layer.add_damage(BOUNDS, Rect::new(0, 0, 60, 40), true).unwrap();
        layer.add_damage(BOUNDS, Rect::new(30, 20, 60, 40), true).unwrap();
        layer.preframe();

        let rects = layer.frame_rects().as_slice();
        assert!(disjoint(rects));
        // Union area: 2400 + 2400 - 600 overlap.
        assert_eq!(total_area(rects), 4200);
        assert_eq!(layer.current_frame_rect(), Some(rects[0]));
    }

    #[test]
    fn frame_rect_cursor_walks_the_list() {
        let mut layer = test_layer();
        layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), true).unwrap();
        layer.add_damage(BOUNDS, Rect::new(50, 0, 10, 10), true).unwrap();
        layer.preframe();
        assert_eq!(layer.frame_rects().len(), 2);

        assert!(layer.current_frame_rect().is_some());
        assert!(!layer.postframe());
        assert_eq!(layer.frame_rect_index(), 1);
        assert!(layer.postframe());
        assert_eq!(layer.frame_state(), LayerFrameState::Complete);
        assert_eq!(layer.current_frame_rect(), None);
    }

    #[test]
    fn multibuffer_bootstrap_carries_full_layer_once() {
        let mut layer = test_layer();
        layer.set_buffer_count(2).unwrap();

        // Frame 0: prev becomes the full layer.
        layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false).unwrap();
        layer.preframe();
        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);
        assert_eq!(layer.prev_damage().as_slice(), [BOUNDS]);
        assert_eq!(layer.frame_draw_count(), 1);

        // Frame 1: both buffers have now seen a full pass; prev clears.
        layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false).unwrap();
        layer.preframe();
        assert_eq!(total_area(layer.frame_rects().as_slice()), BOUNDS.area());
        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);
        assert!(layer.prev_damage().is_empty());

        // Frame 2 onward: prev mirrors the frame just drawn.
        layer.add_damage(BOUNDS, Rect::new(20, 20, 8, 8), false).unwrap();
        layer.preframe();
        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);
        assert_eq!(layer.prev_damage().as_slice(), [Rect::new(20, 20, 8, 8)]);
    }

    #[test]
    fn multibuffer_preframe_merges_history() {
        let mut layer = test_layer();
        layer.set_buffer_count(2).unwrap();

        // Get past the bootstrap frames.
        for _ in 0..2 {
            layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false).unwrap();
            layer.preframe();
            while !layer.postframe() {}
            layer.finish_frame(BOUNDS);
        }

        layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false).unwrap();
        layer.preframe();
        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);

        // The buffer being written next missed the (0,0) frame; history
        // brings it along.
        layer.add_damage(BOUNDS, Rect::new(50, 0, 10, 10), false).unwrap();
        layer.preframe();
        let rects = layer.frame_rects().as_slice();
        assert!(disjoint(rects));
        assert_eq!(total_area(rects), 200);
    }

    #[test]
    fn single_buffer_keeps_no_history() {
        let mut layer = test_layer();
        layer.add_damage(BOUNDS, Rect::new(0, 0, 10, 10), false).unwrap();
        layer.preframe();
        while !layer.postframe() {}
        layer.finish_frame(BOUNDS);
        assert!(layer.prev_damage().is_empty());
        assert_eq!(layer.frame_state(), LayerFrameState::Ready);
    }

    #[test]
    fn buffer_count_rejects_redundant_sets() {
        let mut layer = test_layer();
        assert_eq!(layer.set_buffer_count(1), Err(Rejection::Unchanged));
        layer.set_buffer_count(2).unwrap();
        assert_eq!(layer.buffer_count(), 2);
        // Clamped to the supported depth.
        layer.set_buffer_count(99).unwrap();
        assert_eq!(layer.buffer_count(), MAX_BUFFERS as u32);
    }

    #[test]
    fn input_rect_tracks_bounds_until_decoupled() {
        let mut layer = test_layer();
        assert_eq!(layer.input_rect(BOUNDS), BOUNDS);
        layer.set_input_rect(Rect::new(10, 10, 20, 20));
        assert_eq!(layer.input_rect(BOUNDS), Rect::new(10, 10, 20, 20));
        layer.lock_input_rect().unwrap();
        assert_eq!(layer.input_rect(BOUNDS), BOUNDS);
        assert_eq!(layer.lock_input_rect(), Err(Rejection::Unchanged));
    }
}
