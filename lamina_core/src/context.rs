// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The context: widget storage, screens, and the paint pump.
//!
//! A [`Context`] owns everything the engine needs — the widget arena, the
//! screen list, focus state, and the frame machine — and is passed explicitly
//! wherever it is needed; there is no global instance. The embedding's main
//! loop calls [`Context::update`] with the elapsed time and a
//! [`DisplayDriver`]; update ticks widget animations, then pumps the paint
//! machine until the display is current (or until a preemption point, see
//! [`PreemptLevel`]).
//!
//! # Damage routing
//!
//! Widget mutators ([`move_widget`](Context::move_widget),
//! [`set_visible`](Context::set_visible), …) queue damage against the owning
//! layer automatically: the affected footprint is converted to layer space
//! and added to the layer's damage list before and/or after the change.
//! Rects can also be queued directly with
//! [`inject_damage`](Context::inject_damage). Damage on a `Ready` layer
//! additionally marks the layer's root widget dirty so the next pump pass
//! picks the layer up.
//!
//! # The paint pump
//!
//! Painting is a resumable state machine so that slow targets can interleave
//! input handling with drawing:
//!
//! ```text
//!   Idle ──damage──► Preframe ──► PreLayer ──► Drawing ──► PostLayer ──► Idle
//!                        ▲            │  ▲        │ ▲           │
//!                        │            │  └─next───┘ └──yield    │
//!                        └──pending bounced──────────────◄──────┘
//! ```
//!
//! `PreLayer` folds the layer's queued damage into disjoint frame rects and
//! invalidates the widget tree against the first one; `Drawing` walks the
//! tree in paint order, running each dirty widget's
//! [`draw_step`](crate::draw::WidgetBehavior::draw_step) sequence; when the
//! last frame rect is painted, `PostLayer` swaps the layer's buffers and
//! closes the frame. Damage that arrived mid-frame was deferred to the
//! pending list and bounces the layer straight back into another frame.
//!
//! Preemption only ever happens *between* driver calls; the pump never
//! abandons a primitive mid-draw.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::dirty::DirtyState;
use crate::draw::{
    DrawState, DrawStep, PaintCx, PreemptLevel, Scheme, UpdateStatus, WidgetBehavior,
};
use crate::error::Rejection;
use crate::hal::{DisplayDriver, HwLayerId};
use crate::layer::{DamageRoute, Layer, LayerFrameState};
use crate::rect::Rect;
use crate::screen::{MAX_LAYERS, Screen, ScreenEvents};
use crate::space;
use crate::trace::{BufferSwapEvent, DamageEvent, FrameDoneEvent, PreframeEvent, Tracer};
#[cfg(feature = "trace-rich")]
use crate::trace::{SubFrameEvent, WidgetPaintEvent};
use crate::widget::{Background, Border, INVALID, Widget, WidgetId, WidgetStore};

/// Where the paint pump currently stands.
///
/// `Idle` and `Preframe` are both "between frames"; the difference is that
/// `Preframe` promises queued damage. The remaining phases mean a frame is
/// open on [`Context::current_layer_slot`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintPhase {
    /// Nothing queued; painting is a no-op.
    #[default]
    Idle,
    /// Damage is queued; the next pump pass opens a frame.
    Preframe,
    /// Folding a layer's damage into frame rects.
    PreLayer,
    /// Walking the widget tree over the current frame rect.
    Drawing,
    /// Swapping buffers and closing the layer's frame.
    PostLayer,
}

/// What a [`Context::paint`] call achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintFlow {
    /// Every layer is current; nothing left to draw.
    Idle,
    /// A preemption point was reached; call again to continue the frame.
    Yielded,
}

/// Result of painting one widget subtree.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SubtreeFlow {
    Completed,
    Preempted,
}

/// The engine instance: widget arena, screens, focus, and the frame machine.
///
/// ```
/// use lamina_core::context::Context;
/// use lamina_core::hal::{Color, DisplayDriver, HwLayerId};
/// use lamina_core::rect::Rect;
/// use lamina_core::screen::Screen;
/// use lamina_core::trace::Tracer;
///
/// struct Null;
/// impl DisplayDriver for Null {
///     fn display_size(&self) -> (i32, i32) { (480, 272) }
///     fn set_active_layer(&mut self, _: HwLayerId) {}
///     fn set_clip(&mut self, _: Rect) {}
///     fn swap_layer(&mut self, _: HwLayerId) {}
///     fn fill_rect(&mut self, _: Rect, _: Color, _: u8) {}
///     fn draw_line(&mut self, _: i32, _: i32, _: i32, _: i32, _: Color, _: u8) {}
/// }
///
/// let mut ctx = Context::new();
/// let mut driver = Null;
/// let screen = ctx.add_screen(Screen::new());
/// let root = ctx.create_layer(screen, 0, Rect::new(0, 0, 480, 272)).unwrap();
/// ctx.show_screen(screen, &mut driver).unwrap();
/// ctx.update(16, &mut driver, &mut Tracer::none());
/// assert!(ctx.is_idle());
/// # let _ = root;
/// ```
#[derive(Debug)]
pub struct Context {
    store: WidgetStore,
    screens: Vec<Screen>,
    active_screen: Option<usize>,
    focus: Option<WidgetId>,
    edit: Option<WidgetId>,
    language: u32,
    default_scheme: Scheme,
    preempt_level: PreemptLevel,
    phase: PaintPhase,
    current_layer: usize,
    // Logical display dimensions, captured from the driver on show_screen.
    display_size: (i32, i32),
    // Reused buffer for widgets that raised their dirty state during update.
    update_raised: Vec<u32>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates an empty context with no screens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: WidgetStore::new(),
            screens: Vec::new(),
            active_screen: None,
            focus: None,
            edit: None,
            language: 0,
            default_scheme: Scheme::DEFAULT,
            preempt_level: PreemptLevel::None,
            phase: PaintPhase::Idle,
            current_layer: 0,
            display_size: (0, 0),
            update_raised: Vec::new(),
        }
    }

    // -- Store access --

    /// The widget arena.
    #[inline]
    #[must_use]
    pub const fn widgets(&self) -> &WidgetStore {
        &self.store
    }

    /// The widget arena, mutably.
    ///
    /// Topology changes (attach, detach, reorder) go through here. Property
    /// writes through the raw store bypass damage tracking; stale pixels
    /// stay on screen until something else invalidates them. Prefer the
    /// context mutators for anything already painted.
    #[inline]
    pub fn widgets_mut(&mut self) -> &mut WidgetStore {
        &mut self.store
    }

    // -- Widget creation and destruction --

    /// Creates a detached widget with the given behavior and the default
    /// scheme.
    pub fn create_widget(&mut self, behavior: Box<dyn WidgetBehavior>) -> WidgetId {
        let id = self.store.create_widget(behavior);
        self.store.widget_mut(id).scheme = Some(self.default_scheme);
        id
    }

    /// Creates a detached widget with the default painter and scheme.
    pub fn create_default_widget(&mut self) -> WidgetId {
        let id = self.store.create_default_widget();
        self.store.widget_mut(id).scheme = Some(self.default_scheme);
        id
    }

    /// Destroys a widget and its descendants, repainting the footprint.
    ///
    /// Focus and edit assignments into the destroyed subtree are cleared.
    ///
    /// # Errors
    ///
    /// Damage rejections other than [`Rejection::LayerDeleting`] propagate.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or refers to a layer root (use
    /// [`delete_layer`](Self::delete_layer) for those).
    pub fn destroy_widget(&mut self, id: WidgetId) -> Result<(), Rejection> {
        assert!(
            !self.is_layer_root(id),
            "cannot destroy a layer root (delete the layer)"
        );
        self.damage_widget(id)?;
        if self.store.parent(id).is_some() {
            self.store.remove_from_parent(id);
        }
        self.store.destroy_subtree(id);
        self.clear_stale_focus();
        Ok(())
    }

    // -- Screens --

    /// Adds a screen, returning its index.
    pub fn add_screen(&mut self, screen: Screen) -> usize {
        self.screens.push(screen);
        self.screens.len() - 1
    }

    /// Number of screens.
    #[must_use]
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// The screen at `idx`.
    ///
    /// # Errors
    ///
    /// [`Rejection::ScreenIndex`] when out of range.
    pub fn screen(&self, idx: usize) -> Result<&Screen, Rejection> {
        self.screens.get(idx).ok_or(Rejection::ScreenIndex(idx))
    }

    /// The screen at `idx`, mutably.
    ///
    /// # Errors
    ///
    /// [`Rejection::ScreenIndex`] when out of range.
    pub fn screen_mut(&mut self, idx: usize) -> Result<&mut Screen, Rejection> {
        self.screens.get_mut(idx).ok_or(Rejection::ScreenIndex(idx))
    }

    /// The index of the screen currently shown, if any.
    #[inline]
    #[must_use]
    pub const fn active_screen(&self) -> Option<usize> {
        self.active_screen
    }

    /// Makes the screen at `idx` the active one.
    ///
    /// The outgoing screen gets its [`ScreenEvents::hidden`] hook and, unless
    /// it is persistent, its widget trees are destroyed. The incoming screen
    /// is built through [`ScreenEvents::create`] if needed, its layers are
    /// programmed into the driver, everything on it is damaged so the first
    /// frame repaints fully, and [`ScreenEvents::shown`] fires.
    ///
    /// # Errors
    ///
    /// [`Rejection::ScreenIndex`] when out of range;
    /// [`Rejection::Unchanged`] when the screen is already active;
    /// [`Rejection::PaintInProgress`] while a frame is open.
    pub fn show_screen(
        &mut self,
        idx: usize,
        driver: &mut dyn DisplayDriver,
    ) -> Result<(), Rejection> {
        if idx >= self.screens.len() {
            return Err(Rejection::ScreenIndex(idx));
        }
        if self.active_screen == Some(idx) {
            return Err(Rejection::Unchanged);
        }
        if self.painting() {
            return Err(Rejection::PaintInProgress);
        }
        self.display_size = driver.display_size();

        if let Some(old) = self.active_screen.take() {
            self.fire_screen_event(old, |events, ctx, screen| events.hidden(ctx, screen));
            if !self.screens[old].persistent() {
                self.teardown_screen(old);
            }
        }

        self.active_screen = Some(idx);
        if !self.screens[idx].is_created() {
            self.fire_screen_event(idx, |events, ctx, screen| events.create(ctx, screen));
            self.screens[idx].set_created(true);
        }

        driver.set_orientation(self.screens[idx].orientation(), self.screens[idx].mirrored());
        for slot in 0..MAX_LAYERS {
            let Some(layer) = self.screens[idx].layer(slot) else {
                continue;
            };
            let hw = HwLayerId::from_slot(slot);
            let root = layer.root();
            let w = self.store.widget(root);
            driver.set_layer_enabled(hw, w.visible);
            driver.set_layer_position(hw, w.rect.x, w.rect.y);
            driver.set_layer_size(hw, w.rect.width, w.rect.height);
            driver.set_layer_buffers(hw, layer.buffer_specs());
            let (alpha_enabled, alpha) = layer.alpha();
            driver.set_layer_alpha(hw, alpha_enabled, alpha);
            let (mask_enabled, mask) = layer.mask();
            driver.set_layer_mask(hw, mask_enabled, mask);
            driver.set_layer_vsync(hw, layer.vsync());
        }

        // Everything on the incoming screen repaints.
        self.invalidate_all();
        self.fire_screen_event(idx, |events, ctx, screen| events.shown(ctx, screen));
        Ok(())
    }

    // -- Layers --

    /// Creates a layer in `slot` of `screen`, returning its root widget.
    ///
    /// The root gets the default painter and scheme and `rect` as its screen
    /// position and size. An occupied slot is deleted first. On the active
    /// screen the new layer is damaged in full.
    ///
    /// # Errors
    ///
    /// [`Rejection::ScreenIndex`] / [`Rejection::LayerIndex`] when out of
    /// range; [`Rejection::PaintInProgress`] when replacing a layer while a
    /// frame is open.
    pub fn create_layer(
        &mut self,
        screen: usize,
        slot: usize,
        rect: Rect,
    ) -> Result<WidgetId, Rejection> {
        if screen >= self.screens.len() {
            return Err(Rejection::ScreenIndex(screen));
        }
        if slot >= MAX_LAYERS {
            return Err(Rejection::LayerIndex(slot));
        }
        if self.screens[screen].layer(slot).is_some() {
            self.delete_layer(screen, slot)?;
        }
        let root = self.create_default_widget();
        self.store.widget_mut(root).rect = rect;
        let _ = self.screens[screen].set_layer(slot, Some(Layer::new(root)));
        if self.active_screen == Some(screen) {
            let bounds = Rect::of_size(rect.width, rect.height);
            let _ = self.damage_layer(screen, slot, bounds, false);
        }
        Ok(root)
    }

    /// Deletes the layer in `slot` of `screen` along with its widget tree.
    ///
    /// # Errors
    ///
    /// [`Rejection::ScreenIndex`] when out of range; [`Rejection::LayerIndex`]
    /// when the slot is empty; [`Rejection::PaintInProgress`] while a frame
    /// is open on the owning screen.
    pub fn delete_layer(&mut self, screen: usize, slot: usize) -> Result<(), Rejection> {
        if screen >= self.screens.len() {
            return Err(Rejection::ScreenIndex(screen));
        }
        if self.active_screen == Some(screen) && self.painting() {
            return Err(Rejection::PaintInProgress);
        }
        let Some(layer) = self.screens[screen].layer_mut(slot) else {
            return Err(Rejection::LayerIndex(slot));
        };
        layer.mark_deleting();
        let root = layer.root();
        if self.store.is_alive(root) {
            self.store.destroy_subtree(root);
        }
        let _ = self.screens[screen].set_layer(slot, None);
        self.clear_stale_focus();
        Ok(())
    }

    // -- Damage --

    /// Repaints a widget's current footprint.
    ///
    /// # Errors
    ///
    /// Damage rejections other than [`Rejection::LayerDeleting`] propagate.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn invalidate(&mut self, id: WidgetId) -> Result<(), Rejection> {
        self.damage_widget(id)
    }

    /// Queues a damage rect, in layer space, against a layer of the active
    /// screen.
    ///
    /// `no_combine` keeps the rect separate from overlapping entries, for
    /// callers that know merging would bloat the repainted area.
    ///
    /// # Errors
    ///
    /// [`Rejection::NoActiveScreen`] without an active screen;
    /// [`Rejection::LayerIndex`] when the slot is empty;
    /// [`Rejection::LayerDeleting`] while the layer is being torn down.
    pub fn inject_damage(
        &mut self,
        slot: usize,
        rect: Rect,
        no_combine: bool,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), Rejection> {
        let screen_idx = self.active_screen.ok_or(Rejection::NoActiveScreen)?;
        let route = self.damage_layer(screen_idx, slot, rect, no_combine)?;
        tracer.damage(&DamageEvent {
            layer: trace_u32(slot),
            rect,
            route,
        });
        Ok(())
    }

    /// Damages every layer of the active screen in full.
    pub fn invalidate_all(&mut self) {
        let Some(screen_idx) = self.active_screen else {
            return;
        };
        for slot in 0..MAX_LAYERS {
            let Some(layer) = self.screens[screen_idx].layer(slot) else {
                continue;
            };
            if layer.is_deleting() {
                continue;
            }
            let root = layer.root();
            if !self.store.is_alive(root) {
                continue;
            }
            let r = self.store.widget(root).rect;
            let _ = self.damage_layer(screen_idx, slot, Rect::of_size(r.width, r.height), false);
        }
    }

    // -- Widget mutators --
    //
    // Each mutator rejects redundant requests, damages the affected
    // footprint(s), and fires the matching behavior hook.

    /// Moves a widget within its parent.
    ///
    /// Both the old and the new footprint are damaged; for a disjoint move
    /// that is two separate repaint rects, not their bounding box.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the position is already in effect.
    pub fn move_widget(&mut self, id: WidgetId, x: i32, y: i32) -> Result<(), Rejection> {
        let rect = self.store.widget(id).rect;
        if rect.x == x && rect.y == y {
            return Err(Rejection::Unchanged);
        }
        self.damage_widget(id)?;
        {
            let w = self.store.widget_mut(id);
            w.rect.x = x;
            w.rect.y = y;
        }
        self.fire_widget_hook(id, |behavior, widget| behavior.moved(widget));
        self.damage_widget(id)?;
        Ok(())
    }

    /// Resizes a widget.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the size is already in effect.
    pub fn resize_widget(&mut self, id: WidgetId, width: i32, height: i32) -> Result<(), Rejection> {
        let rect = self.store.widget(id).rect;
        if rect.width == width && rect.height == height {
            return Err(Rejection::Unchanged);
        }
        self.damage_widget(id)?;
        {
            let w = self.store.widget_mut(id);
            w.rect.width = width;
            w.rect.height = height;
            // A cached background no longer matches the footprint.
            w.cache = None;
        }
        self.fire_widget_hook(id, |behavior, widget| behavior.resized(widget));
        self.damage_widget(id)?;
        Ok(())
    }

    /// Shows or hides a widget (and, visually, its subtree).
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the state is already in effect.
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> Result<(), Rejection> {
        if self.store.widget(id).visible == visible {
            return Err(Rejection::Unchanged);
        }
        if visible {
            self.store.widget_mut(id).visible = true;
            self.damage_widget(id)?;
        } else {
            // Damage first; the footprint still matters while visible.
            self.damage_widget(id)?;
            self.store.widget_mut(id).visible = false;
        }
        Ok(())
    }

    /// Enables or disables a widget.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the state is already in effect.
    pub fn set_enabled(&mut self, id: WidgetId, enabled: bool) -> Result<(), Rejection> {
        if self.store.widget(id).enabled == enabled {
            return Err(Rejection::Unchanged);
        }
        self.store.widget_mut(id).enabled = enabled;
        self.damage_widget(id)?;
        Ok(())
    }

    /// Configures a widget's alpha blending.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the state is already in effect.
    pub fn set_alpha(&mut self, id: WidgetId, enabled: bool, amount: u8) -> Result<(), Rejection> {
        {
            let w = self.store.widget(id);
            if w.alpha_enabled == enabled && w.alpha == amount {
                return Err(Rejection::Unchanged);
            }
        }
        {
            let w = self.store.widget_mut(id);
            w.alpha_enabled = enabled;
            w.alpha = amount;
        }
        self.damage_widget(id)?;
        Ok(())
    }

    /// Sets a widget's background style.
    ///
    /// Any cached background pixels are dropped.
    ///
    /// # Errors
    ///
    /// [`Rejection::LayerCache`] when asking for [`Background::Cache`] on a
    /// layer root; [`Rejection::Unchanged`] when already in effect.
    pub fn set_background(&mut self, id: WidgetId, background: Background) -> Result<(), Rejection> {
        if background == Background::Cache && self.is_layer_root(id) {
            return Err(Rejection::LayerCache);
        }
        if self.store.widget(id).background == background {
            return Err(Rejection::Unchanged);
        }
        {
            let w = self.store.widget_mut(id);
            w.background = background;
            w.cache = None;
        }
        self.damage_widget(id)?;
        Ok(())
    }

    /// Sets a widget's border style.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_border(&mut self, id: WidgetId, border: Border) -> Result<(), Rejection> {
        if self.store.widget(id).border == border {
            return Err(Rejection::Unchanged);
        }
        self.store.widget_mut(id).border = border;
        self.damage_widget(id)?;
        Ok(())
    }

    /// Sets or clears a widget's color scheme.
    ///
    /// A widget without a scheme is skipped by paint entirely.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_scheme(&mut self, id: WidgetId, scheme: Option<Scheme>) -> Result<(), Rejection> {
        if self.store.widget(id).scheme == scheme {
            return Err(Rejection::Unchanged);
        }
        self.store.widget_mut(id).scheme = scheme;
        self.damage_widget(id)?;
        Ok(())
    }

    /// Marks a widget as promising full-rect coverage when painting.
    ///
    /// Purely an occlusion hint; no repaint is queued.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect.
    pub fn set_opaque(&mut self, id: WidgetId, opaque: bool) -> Result<(), Rejection> {
        if self.store.widget(id).opaque == opaque {
            return Err(Rejection::Unchanged);
        }
        self.store.widget_mut(id).opaque = opaque;
        Ok(())
    }

    // -- Focus and edit --

    /// The widget holding input focus.
    #[inline]
    #[must_use]
    pub const fn focus(&self) -> Option<WidgetId> {
        self.focus
    }

    /// Moves input focus, firing the lost/gained hooks.
    ///
    /// Changing focus always leaves edit mode first.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already focused;
    /// [`Rejection::Disabled`] when the target is disabled.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_focus(&mut self, id: Option<WidgetId>) -> Result<(), Rejection> {
        if self.focus == id {
            return Err(Rejection::Unchanged);
        }
        if let Some(new) = id {
            if !self.store.widget(new).enabled {
                return Err(Rejection::Disabled);
            }
        }
        if self.edit.is_some() {
            let _ = self.set_edit(None);
        }
        let old = core::mem::replace(&mut self.focus, id);
        if let Some(old_id) = old {
            if self.store.is_alive(old_id) {
                self.fire_widget_hook(old_id, |behavior, widget| behavior.focus_lost(widget));
            }
        }
        if let Some(new_id) = id {
            self.fire_widget_hook(new_id, |behavior, widget| behavior.focus_gained(widget));
        }
        Ok(())
    }

    /// The widget in edit mode.
    #[inline]
    #[must_use]
    pub const fn edit(&self) -> Option<WidgetId> {
        self.edit
    }

    /// Enters or leaves edit mode on a widget.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when already in effect;
    /// [`Rejection::NotEditable`] when the behavior refuses edit mode.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_edit(&mut self, id: Option<WidgetId>) -> Result<(), Rejection> {
        if self.edit == id {
            return Err(Rejection::Unchanged);
        }
        if let Some(new) = id {
            let _ = self.store.widget(new);
            let editable = self.store.behaviors[new.index() as usize]
                .as_ref()
                .is_some_and(|behavior| behavior.editable());
            if !editable {
                return Err(Rejection::NotEditable);
            }
        }
        self.edit = id;
        Ok(())
    }

    // -- Language --

    /// The current string language id.
    #[inline]
    #[must_use]
    pub const fn language(&self) -> u32 {
        self.language
    }

    /// Switches the string language, notifying every live widget and
    /// repainting the active screen.
    ///
    /// # Errors
    ///
    /// [`Rejection::Unchanged`] when the language is already selected.
    pub fn change_language(&mut self, language: u32) -> Result<(), Rejection> {
        if self.language == language {
            return Err(Rejection::Unchanged);
        }
        self.language = language;
        for idx in 0..self.store.len {
            if let Some(mut behavior) = self.store.take_behavior(idx) {
                behavior.language_changed(self.store.widget_at_mut(idx));
                self.store.put_behavior(idx, behavior);
            }
        }
        self.invalidate_all();
        Ok(())
    }

    // -- Input --

    /// Finds the widget under a screen-space point.
    ///
    /// Layers are probed topmost first. A point inside a layer's input rect
    /// resolves within that layer's tree; when it hits no widget there, the
    /// layer swallows the event unless it allows input pass-through.
    #[must_use]
    pub fn widget_at_point(&self, x: i32, y: i32) -> Option<WidgetId> {
        let screen_idx = self.active_screen?;
        let screen = &self.screens[screen_idx];
        for slot in (0..MAX_LAYERS).rev() {
            let Some(layer) = screen.layer(slot) else {
                continue;
            };
            if layer.is_deleting() {
                continue;
            }
            let root = layer.root();
            if !self.store.is_alive(root) {
                continue;
            }
            let r = self.store.widget(root).rect;
            let bounds = Rect::of_size(r.width, r.height);
            let (lx, ly) = (x - r.x, y - r.y);
            if !layer.input_rect(bounds).contains_point(lx, ly) {
                continue;
            }
            if let Some(hit) = space::pick(&self.store, root, lx, ly) {
                return Some(hit);
            }
            if !layer.allow_input_pass_through() {
                return None;
            }
        }
        None
    }

    // -- Frame machine --

    /// How aggressively painting yields. See [`PreemptLevel`].
    #[inline]
    #[must_use]
    pub const fn preempt_level(&self) -> PreemptLevel {
        self.preempt_level
    }

    /// Sets the preemption level. Takes effect at the next preemption check.
    pub fn set_preempt_level(&mut self, level: PreemptLevel) {
        self.preempt_level = level;
    }

    /// Where the paint pump currently stands.
    #[inline]
    #[must_use]
    pub const fn paint_phase(&self) -> PaintPhase {
        self.phase
    }

    /// Whether nothing is queued and no frame is open.
    #[inline]
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, PaintPhase::Idle)
    }

    /// The slot of the layer a frame is open on. Meaningless while idle.
    #[inline]
    #[must_use]
    pub const fn current_layer_slot(&self) -> usize {
        self.current_layer
    }

    /// Ticks widget updates with the elapsed milliseconds, then paints.
    ///
    /// Layers with an open or queued frame do not tick; their time is banked
    /// and delivered in one lump once the frame closes, so animations see
    /// real elapsed time rather than pump scheduling. Behaviors that raised
    /// their widget's dirty state during the tick get their footprints
    /// damaged automatically.
    ///
    /// Returns [`UpdateStatus::Pending`] while any behavior keeps animating.
    pub fn update(
        &mut self,
        dt_ms: u32,
        driver: &mut dyn DisplayDriver,
        tracer: &mut Tracer<'_>,
    ) -> UpdateStatus {
        let mut pending = false;
        if let Some(screen_idx) = self.active_screen {
            for slot in 0..MAX_LAYERS {
                let Some(layer) = self.screens[screen_idx].layer_mut(slot) else {
                    continue;
                };
                if layer.is_deleting() {
                    continue;
                }
                if layer.frame_state() != LayerFrameState::Ready {
                    layer.add_delta(dt_ms);
                    continue;
                }
                let dt_total = layer.take_delta().saturating_add(dt_ms);
                let root = layer.root();
                if !self.store.is_alive(root) {
                    continue;
                }
                let mut raised = core::mem::take(&mut self.update_raised);
                raised.clear();
                if self.update_subtree(root.index(), dt_total, &mut raised)
                    == UpdateStatus::Pending
                {
                    pending = true;
                }
                for &idx in &raised {
                    let id = self.store.id_at(idx);
                    let _ = self.damage_widget(id);
                }
                self.update_raised = raised;
            }
        }
        self.paint(driver, tracer);
        if pending {
            UpdateStatus::Pending
        } else {
            UpdateStatus::Done
        }
    }

    /// Pumps the paint machine until idle or a preemption point.
    pub fn paint(&mut self, driver: &mut dyn DisplayDriver, tracer: &mut Tracer<'_>) -> PaintFlow {
        loop {
            match self.paint_step(driver, tracer) {
                DrawStep::Continue => {}
                DrawStep::Yield => return PaintFlow::Yielded,
                DrawStep::Done => return PaintFlow::Idle,
            }
        }
    }

    // -- Internals: damage plumbing --

    /// Whether a frame is currently open (preemption may have paused it).
    fn painting(&self) -> bool {
        !matches!(self.phase, PaintPhase::Idle | PaintPhase::Preframe)
    }

    /// Routes a layer-space damage rect into a layer of `screen_idx`.
    ///
    /// On the `Ready -> Preframe` transition the layer's root widget is
    /// marked dirty and, for the active screen, the pump is flagged.
    fn damage_layer(
        &mut self,
        screen_idx: usize,
        slot: usize,
        rect: Rect,
        no_combine: bool,
    ) -> Result<DamageRoute, Rejection> {
        let screen = self
            .screens
            .get(screen_idx)
            .ok_or(Rejection::ScreenIndex(screen_idx))?;
        let layer = screen.layer(slot).ok_or(Rejection::LayerIndex(slot))?;
        let root = layer.root();
        let was_ready = layer.frame_state() == LayerFrameState::Ready;
        let r = self.store.widget(root).rect;
        let bounds = Rect::of_size(r.width, r.height);

        let layer = self
            .screens
            .get_mut(screen_idx)
            .and_then(|screen| screen.layer_mut(slot))
            .ok_or(Rejection::LayerIndex(slot))?;
        let route = layer.add_damage(bounds, rect, no_combine)?;

        if was_ready && !matches!(route, DamageRoute::Dropped) {
            self.store.widget_mut(root).raise_dirty(DirtyState::Dirty);
            if self.active_screen == Some(screen_idx) && self.phase == PaintPhase::Idle {
                self.phase = PaintPhase::Preframe;
            }
        }
        Ok(route)
    }

    /// Damages a widget's layer-space footprint on its owning layer.
    ///
    /// Widgets on inactive screens (or detached subtrees) need no damage;
    /// they repaint in full when their screen is shown.
    fn damage_widget(&mut self, id: WidgetId) -> Result<(), Rejection> {
        let _ = self.store.widget(id);
        let Some(screen_idx) = self.active_screen else {
            return Ok(());
        };
        let Some(slot) = self.owning_layer_slot(screen_idx, id.index()) else {
            return Ok(());
        };
        let rect = space::layer_space_bounds(&self.store, id.index());
        match self.damage_layer(screen_idx, slot, rect, false) {
            Ok(_) | Err(Rejection::LayerDeleting) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The slot on `screen_idx` whose layer owns the widget at `idx`.
    fn owning_layer_slot(&self, screen_idx: usize, idx: u32) -> Option<usize> {
        let mut at = idx;
        while self.store.parent[at as usize] != INVALID {
            at = self.store.parent[at as usize];
        }
        self.screens[screen_idx]
            .layer_slots()
            .find(|(_, layer)| layer.root().index() == at)
            .map(|(slot, _)| slot)
    }

    fn is_layer_root(&self, id: WidgetId) -> bool {
        self.screens
            .iter()
            .any(|screen| screen.layer_slots().any(|(_, layer)| layer.root() == id))
    }

    // -- Internals: screens --

    fn fire_screen_event(
        &mut self,
        idx: usize,
        hook: fn(&mut dyn ScreenEvents, &mut Context, usize),
    ) {
        let Some(mut events) = self.screens[idx].events.take() else {
            return;
        };
        hook(events.as_mut(), self, idx);
        // The hook may have installed a replacement; keep the newer one.
        if self.screens[idx].events.is_none() {
            self.screens[idx].events = Some(events);
        }
    }

    fn teardown_screen(&mut self, screen_idx: usize) {
        for slot in 0..MAX_LAYERS {
            if let Some(layer) = self.screens[screen_idx].layer_mut(slot) {
                layer.mark_deleting();
            }
            let root = self.screens[screen_idx].layer(slot).map(Layer::root);
            if let Some(root) = root {
                if self.store.is_alive(root) {
                    self.store.destroy_subtree(root);
                }
            }
            let _ = self.screens[screen_idx].set_layer(slot, None);
        }
        self.screens[screen_idx].set_created(false);
        self.clear_stale_focus();
    }

    fn clear_stale_focus(&mut self) {
        if self.focus.is_some_and(|id| !self.store.is_alive(id)) {
            self.focus = None;
        }
        if self.edit.is_some_and(|id| !self.store.is_alive(id)) {
            self.edit = None;
        }
    }

    fn fire_widget_hook(&mut self, id: WidgetId, hook: fn(&mut dyn WidgetBehavior, &mut Widget)) {
        let idx = id.index();
        if let Some(mut behavior) = self.store.take_behavior(idx) {
            hook(behavior.as_mut(), self.store.widget_at_mut(idx));
            self.store.put_behavior(idx, behavior);
        }
    }

    // -- Internals: update --

    fn update_subtree(&mut self, idx: u32, dt_ms: u32, raised: &mut Vec<u32>) -> UpdateStatus {
        let mut pending = false;
        if let Some(mut behavior) = self.store.take_behavior(idx) {
            let before = self.store.widget_at(idx).dirty();
            let status = behavior.update(self.store.widget_at_mut(idx), dt_ms);
            self.store.put_behavior(idx, behavior);
            if status == UpdateStatus::Pending {
                pending = true;
            }
            if self.store.widget_at(idx).dirty() > before {
                raised.push(idx);
            }
        }
        // Read the link before recursing; the hooks below may edit topology.
        let mut child = self.store.first_child[idx as usize];
        while child != INVALID {
            let next = self.store.next_sibling[child as usize];
            if self.update_subtree(child, dt_ms, raised) == UpdateStatus::Pending {
                pending = true;
            }
            child = next;
        }
        if pending {
            UpdateStatus::Pending
        } else {
            UpdateStatus::Done
        }
    }

    // -- Internals: the paint pump --

    /// Advances the pump by one transition.
    fn paint_step(&mut self, driver: &mut dyn DisplayDriver, tracer: &mut Tracer<'_>) -> DrawStep {
        let Some(screen_idx) = self.active_screen else {
            self.phase = PaintPhase::Idle;
            return DrawStep::Done;
        };
        match self.phase {
            PaintPhase::Idle | PaintPhase::Preframe => {
                match self.find_layer_needing_draw(screen_idx, 0) {
                    Some(slot) => {
                        self.current_layer = slot;
                        self.phase = PaintPhase::PreLayer;
                        DrawStep::Continue
                    }
                    None => {
                        self.phase = PaintPhase::Idle;
                        DrawStep::Done
                    }
                }
            }

            PaintPhase::PreLayer => {
                let slot = self.current_layer;
                let Some((root, buffer_count, current_len, prev_len)) =
                    self.screens[screen_idx].layer(slot).map(|layer| {
                        (
                            layer.root(),
                            layer.buffer_count(),
                            layer.current_damage().len(),
                            layer.prev_damage().len(),
                        )
                    })
                else {
                    // The slot emptied between steps; rescan.
                    self.phase = PaintPhase::Preframe;
                    return DrawStep::Continue;
                };
                let r = self.store.widget(root).rect;
                let hw = HwLayerId::from_slot(slot);

                // Scan-out geometry follows the root widget.
                driver.set_layer_enabled(hw, self.store.widget(root).visible);
                driver.set_layer_position(hw, r.x, r.y);
                driver.set_layer_size(hw, r.width, r.height);

                let input_rects = current_len + if buffer_count > 1 { prev_len } else { 0 };
                let Some(layer) = self.screens[screen_idx].layer_mut(slot) else {
                    self.phase = PaintPhase::Preframe;
                    return DrawStep::Continue;
                };
                layer.preframe();
                let frame_rects = layer.frame_rects().len();
                let first = layer.current_frame_rect();
                tracer.preframe(&PreframeEvent {
                    layer: trace_u32(slot),
                    input_rects: trace_u32(input_rects),
                    frame_rects: trace_u32(frame_rects),
                });
                match first {
                    Some(rect) => {
                        trace_sub_frame(tracer, slot, 0, rect);
                        let bounds = Rect::of_size(r.width, r.height);
                        self.invalidate_tree_rect(root.index(), bounds, rect);
                        self.phase = PaintPhase::Drawing;
                    }
                    None => {
                        self.phase = PaintPhase::PostLayer;
                    }
                }
                DrawStep::Continue
            }

            PaintPhase::Drawing => {
                let slot = self.current_layer;
                let Some((root, rect)) = self.screens[screen_idx]
                    .layer(slot)
                    .map(|layer| (layer.root(), layer.current_frame_rect()))
                else {
                    self.phase = PaintPhase::Preframe;
                    return DrawStep::Continue;
                };
                let Some(rect) = rect else {
                    self.phase = PaintPhase::PostLayer;
                    return DrawStep::Continue;
                };
                driver.set_active_layer(HwLayerId::from_slot(slot));
                driver.begin();
                let flow = self.paint_rec(root.index(), rect, slot, driver, tracer);
                driver.end();
                match flow {
                    SubtreeFlow::Preempted => DrawStep::Yield,
                    SubtreeFlow::Completed => {
                        let advance = self.screens[screen_idx].layer_mut(slot).map(|layer| {
                            let done = layer.postframe();
                            (done, layer.frame_rect_index(), layer.current_frame_rect())
                        });
                        match advance {
                            Some((true, _, _)) => self.phase = PaintPhase::PostLayer,
                            Some((false, rect_index, Some(next))) => {
                                trace_sub_frame(tracer, slot, rect_index, next);
                                let r = self.store.widget(root).rect;
                                let bounds = Rect::of_size(r.width, r.height);
                                self.invalidate_tree_rect(root.index(), bounds, next);
                            }
                            Some((false, _, None)) => self.phase = PaintPhase::PostLayer,
                            None => self.phase = PaintPhase::Preframe,
                        }
                        DrawStep::Continue
                    }
                }
            }

            PaintPhase::PostLayer => {
                let slot = self.current_layer;
                let info = self.screens[screen_idx]
                    .layer(slot)
                    .map(|layer| (layer.root(), layer.frame_rects().len()));
                if let Some((root, rects_drawn)) = info {
                    let r = self.store.widget(root).rect;
                    driver.swap_layer(HwLayerId::from_slot(slot));
                    tracer.buffer_swap(&BufferSwapEvent { layer: trace_u32(slot) });
                    let mut frame_draw_count = 0;
                    if let Some(layer) = self.screens[screen_idx].layer_mut(slot) {
                        layer.finish_frame(Rect::of_size(r.width, r.height));
                        frame_draw_count = layer.frame_draw_count();
                    }
                    tracer.frame_done(&FrameDoneEvent {
                        layer: trace_u32(slot),
                        rects_drawn: trace_u32(rects_drawn),
                        frame_draw_count,
                    });
                }
                // Later slots first, then rescan from the bottom for frames
                // re-opened by a pending bounce.
                match self
                    .find_layer_needing_draw(screen_idx, slot + 1)
                    .or_else(|| self.find_layer_needing_draw(screen_idx, 0))
                {
                    Some(next) => {
                        self.current_layer = next;
                        self.phase = PaintPhase::PreLayer;
                        DrawStep::Continue
                    }
                    None => {
                        self.phase = PaintPhase::Idle;
                        DrawStep::Done
                    }
                }
            }
        }
    }

    /// First slot at or after `from` whose layer has frame work and scans out
    /// somewhere on the display.
    fn find_layer_needing_draw(&self, screen_idx: usize, from: usize) -> Option<usize> {
        let screen = self.screens.get(screen_idx)?;
        let (dw, dh) = self.display_size;
        let display = Rect::of_size(dw, dh);
        for slot in from..MAX_LAYERS {
            let Some(layer) = screen.layer(slot) else {
                continue;
            };
            if layer.is_deleting() || layer.frame_state() == LayerFrameState::Ready {
                continue;
            }
            let root = layer.root();
            if !self.store.is_alive(root) {
                continue;
            }
            let w = self.store.widget(root);
            if w.visible && w.rect.intersects(display) {
                return Some(slot);
            }
        }
        None
    }

    /// Marks widgets overlapping `target` dirty, ancestors `Child`.
    ///
    /// Invisible subtrees are skipped outright. A widget whose overlap with
    /// `target` is fully covered by something painted later is left alone;
    /// children are always recursed into, since they may overflow the parent.
    fn invalidate_tree_rect(&mut self, idx: u32, parent_bounds: Rect, target: Rect) {
        if !self.store.widget_at(idx).visible {
            return;
        }
        let bounds = space::layer_space_bounds(&self.store, idx);
        if bounds.intersects(parent_bounds) && bounds.intersects(target) {
            let overlap = bounds.clip(target);
            if !space::occluded(&self.store, idx, overlap) {
                self.store.widget_at_mut(idx).raise_dirty(DirtyState::Dirty);
                self.propagate_child_up(idx);
            }
        }
        let mut child = self.store.first_child[idx as usize];
        while child != INVALID {
            let next = self.store.next_sibling[child as usize];
            self.invalidate_tree_rect(child, bounds, target);
            child = next;
        }
    }

    /// Raises ancestors to `Child`, stopping at the first that already knows.
    fn propagate_child_up(&mut self, idx: u32) {
        let mut at = self.store.parent[idx as usize];
        while at != INVALID {
            let w = self.store.widget_at_mut(at);
            if w.dirty() >= DirtyState::Child {
                break;
            }
            w.set_dirty(DirtyState::Child);
            at = self.store.parent[at as usize];
        }
    }

    /// Paints the dirty widgets of a subtree over one frame rect.
    fn paint_rec(
        &mut self,
        idx: u32,
        damage: Rect,
        slot: usize,
        driver: &mut dyn DisplayDriver,
        tracer: &mut Tracer<'_>,
    ) -> SubtreeFlow {
        if !self.store.widget_at(idx).visible {
            return SubtreeFlow::Completed;
        }
        let bounds = space::layer_space_bounds(&self.store, idx);
        if !bounds.intersects(damage) {
            return SubtreeFlow::Completed;
        }

        if self.store.widget_at(idx).dirty() == DirtyState::Dirty {
            let clip = bounds.clip(damage);
            let alpha = space::cumulative_alpha(&self.store, idx);
            let skip = alpha == 0
                || self.store.widget_at(idx).scheme.is_none()
                || space::occluded(&self.store, idx, clip);
            if skip {
                // Nothing to draw, but the bookkeeping still advances.
                self.finish_widget_paint(idx);
            } else {
                driver.set_clip(clip);
                let mut steps: u32 = 0;
                loop {
                    let Some(mut behavior) = self.store.take_behavior(idx) else {
                        self.finish_widget_paint(idx);
                        break;
                    };
                    let step = {
                        let mut cx = PaintCx {
                            widget: self.store.widget_at_mut(idx),
                            bounds,
                            clip,
                            alpha,
                        };
                        behavior.draw_step(&mut cx, driver)
                    };
                    self.store.put_behavior(idx, behavior);
                    steps += 1;
                    match step {
                        DrawStep::Continue => {
                            if self.preempt_level == PreemptLevel::Level2 {
                                return SubtreeFlow::Preempted;
                            }
                        }
                        DrawStep::Yield => return SubtreeFlow::Preempted,
                        DrawStep::Done => {
                            self.finish_widget_paint(idx);
                            trace_widget_paint(tracer, slot, idx, steps);
                            break;
                        }
                    }
                }
                if self.preempt_level >= PreemptLevel::Level1 {
                    return SubtreeFlow::Preempted;
                }
            }
        }

        let mut child = self.store.first_child[idx as usize];
        while child != INVALID {
            let next = self.store.next_sibling[child as usize];
            if self.paint_rec(child, damage, slot, driver, tracer) == SubtreeFlow::Preempted {
                return SubtreeFlow::Preempted;
            }
            child = next;
        }

        // Collapse Child once every descendant has been handled.
        if self.store.widget_at(idx).dirty() == DirtyState::Child && !self.any_dirty_child(idx) {
            self.store.widget_at_mut(idx).set_dirty(DirtyState::Clean);
        }
        SubtreeFlow::Completed
    }

    /// Resets the draw cursor and settles the dirty state after a paint.
    fn finish_widget_paint(&mut self, idx: u32) {
        let pending_children = self.any_dirty_child(idx);
        let w = self.store.widget_at_mut(idx);
        w.set_draw_state(DrawState::START);
        w.set_dirty(if pending_children {
            DirtyState::Child
        } else {
            DirtyState::Clean
        });
    }

    fn any_dirty_child(&self, idx: u32) -> bool {
        let mut child = self.store.first_child[idx as usize];
        while child != INVALID {
            if self.store.widget_at(child).dirty().needs_work() {
                return true;
            }
            child = self.store.next_sibling[child as usize];
        }
        false
    }

    // -- Defaults --

    /// The scheme new widgets start with.
    #[inline]
    #[must_use]
    pub const fn default_scheme(&self) -> Scheme {
        self.default_scheme
    }

    /// Sets the scheme new widgets start with. Existing widgets keep theirs.
    pub fn set_default_scheme(&mut self, scheme: Scheme) {
        self.default_scheme = scheme;
    }
}

// -- Trace shims --
//
// Keep the rich-event cfg noise out of the pump; without `trace-rich` these
// consume their arguments and compile to nothing.

/// Slot index or rect count as the `u32` the trace events carry.
#[expect(
    clippy::cast_possible_truncation,
    reason = "layer slots and per-frame rect counts are bounded far below u32::MAX"
)]
const fn trace_u32(value: usize) -> u32 {
    value as u32
}

fn trace_sub_frame(tracer: &mut Tracer<'_>, slot: usize, rect_index: usize, rect: Rect) {
    #[cfg(feature = "trace-rich")]
    tracer.sub_frame(&SubFrameEvent {
        layer: trace_u32(slot),
        rect_index: trace_u32(rect_index),
        rect,
    });
    #[cfg(not(feature = "trace-rich"))]
    {
        _ = (tracer, slot, rect_index, rect);
    }
}

fn trace_widget_paint(tracer: &mut Tracer<'_>, slot: usize, widget: u32, steps: u32) {
    #[cfg(feature = "trace-rich")]
    tracer.widget_paint(&WidgetPaintEvent {
        layer: trace_u32(slot),
        widget,
        steps,
    });
    #[cfg(not(feature = "trace-rich"))]
    {
        _ = (tracer, slot, widget, steps);
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;
    use crate::hal::Color;

    const LAYER_W: i32 = 100;
    const LAYER_H: i32 = 60;

    #[derive(Default)]
    struct SpyDriver {
        fills: Vec<(Rect, Color)>,
        clips: Vec<Rect>,
        swaps: u32,
    }

    impl DisplayDriver for SpyDriver {
        fn display_size(&self) -> (i32, i32) {
            (480, 272)
        }
        fn set_active_layer(&mut self, _layer: HwLayerId) {}
        fn set_clip(&mut self, rect: Rect) {
            self.clips.push(rect);
        }
        fn swap_layer(&mut self, _layer: HwLayerId) {
            self.swaps += 1;
        }
        fn fill_rect(&mut self, rect: Rect, color: Color, _alpha: u8) {
            self.fills.push((rect, color));
        }
        fn draw_line(&mut self, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _c: Color, _a: u8) {}
    }

    /// Context with one screen and a single layer at slot 0, already shown.
    fn pumped() -> (Context, SpyDriver, WidgetId) {
        let mut ctx = Context::new();
        let mut driver = SpyDriver::default();
        let screen = ctx.add_screen(Screen::new());
        let root = ctx
            .create_layer(screen, 0, Rect::new(0, 0, LAYER_W, LAYER_H))
            .unwrap();
        ctx.show_screen(screen, &mut driver).unwrap();
        (ctx, driver, root)
    }

    fn attach_child(ctx: &mut Context, parent: WidgetId, rect: Rect) -> WidgetId {
        let child = ctx.create_default_widget();
        ctx.widgets_mut().widget_mut(child).rect = rect;
        ctx.widgets_mut().add_child(parent, child);
        child
    }

    #[test]
    fn first_frame_paints_full_layer_and_swaps() {
        let (mut ctx, mut driver, _root) = pumped();
        assert!(!ctx.is_idle());
        assert_eq!(ctx.paint(&mut driver, &mut Tracer::none()), PaintFlow::Idle);
        assert!(ctx.is_idle());
        assert_eq!(driver.swaps, 1);
        assert_eq!(
            driver.fills,
            vec![(Rect::new(0, 0, LAYER_W, LAYER_H), Scheme::DEFAULT.base)]
        );
        let layer = ctx.screen(0).unwrap().layer(0).unwrap();
        assert_eq!(layer.frame_state(), LayerFrameState::Ready);
        assert_eq!(layer.frame_draw_count(), 1);
    }

    #[test]
    fn idle_paint_is_a_no_op() {
        let (mut ctx, mut driver, _root) = pumped();
        ctx.paint(&mut driver, &mut Tracer::none());
        driver.fills.clear();
        driver.swaps = 0;
        assert_eq!(ctx.paint(&mut driver, &mut Tracer::none()), PaintFlow::Idle);
        assert!(driver.fills.is_empty());
        assert_eq!(driver.swaps, 0);
    }

    #[test]
    fn widget_move_repaints_both_positions() {
        let (mut ctx, mut driver, root) = pumped();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.paint(&mut driver, &mut Tracer::none());

        driver.fills.clear();
        ctx.move_widget(child, 60, 10).unwrap();
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(
                layer.current_damage().as_slice(),
                [Rect::new(10, 10, 20, 20), Rect::new(60, 10, 20, 20)]
            );
        }
        ctx.paint(&mut driver, &mut Tracer::none());
        // Old spot: layer background. New spot: the child exactly covers its
        // damage rect, so the background below it is skipped.
        assert_eq!(
            driver.fills,
            vec![
                (Rect::new(10, 10, 20, 20), Scheme::DEFAULT.base),
                (Rect::new(60, 10, 20, 20), Scheme::DEFAULT.base),
            ]
        );
    }

    #[test]
    fn overlapping_damage_merges_in_place() {
        let (mut ctx, mut driver, _root) = pumped();
        ctx.paint(&mut driver, &mut Tracer::none());
        ctx.inject_damage(0, Rect::new(0, 0, 50, 50), false, &mut Tracer::none())
            .unwrap();
        ctx.inject_damage(0, Rect::new(40, 0, 50, 50), false, &mut Tracer::none())
            .unwrap();
        let layer = ctx.screen(0).unwrap().layer(0).unwrap();
        assert_eq!(
            layer.current_damage().as_slice(),
            [Rect::new(0, 0, 90, 50)]
        );
    }

    #[test]
    fn disjoint_damage_draws_two_sub_frames_in_one_swap() {
        let (mut ctx, mut driver, _root) = pumped();
        ctx.paint(&mut driver, &mut Tracer::none());
        driver.fills.clear();
        driver.swaps = 0;
        ctx.inject_damage(0, Rect::new(0, 0, 10, 10), false, &mut Tracer::none())
            .unwrap();
        ctx.inject_damage(0, Rect::new(50, 0, 10, 10), false, &mut Tracer::none())
            .unwrap();
        ctx.paint(&mut driver, &mut Tracer::none());
        assert_eq!(
            driver.fills,
            vec![
                (Rect::new(0, 0, 10, 10), Scheme::DEFAULT.base),
                (Rect::new(50, 0, 10, 10), Scheme::DEFAULT.base),
            ]
        );
        assert_eq!(driver.swaps, 1);
    }

    #[test]
    fn mid_frame_damage_defers_then_repaints() {
        let (mut ctx, mut driver, root) = pumped();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.paint(&mut driver, &mut Tracer::none());

        ctx.set_preempt_level(PreemptLevel::Level1);
        ctx.invalidate(child).unwrap();
        assert_eq!(
            ctx.paint(&mut driver, &mut Tracer::none()),
            PaintFlow::Yielded
        );
        assert!(!ctx.is_idle());

        // Damage arriving now must wait for the open frame.
        ctx.invalidate(root).unwrap();
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(layer.frame_state(), LayerFrameState::InProgress);
            assert_eq!(layer.pending_damage().len(), 1);
        }

        driver.swaps = 0;
        while ctx.paint(&mut driver, &mut Tracer::none()) == PaintFlow::Yielded {}
        // The deferred damage bounced straight into a second frame.
        assert_eq!(driver.swaps, 2);
        assert!(ctx.is_idle());
        let layer = ctx.screen(0).unwrap().layer(0).unwrap();
        assert_eq!(layer.frame_state(), LayerFrameState::Ready);
        assert!(layer.pending_damage().is_empty());
    }

    #[test]
    fn opaque_sibling_suppresses_covered_paint() {
        let (mut ctx, mut driver, root) = pumped();
        let below = attach_child(&mut ctx, root, Rect::new(10, 10, 30, 30));
        let _above = attach_child(&mut ctx, root, Rect::new(10, 10, 30, 30));
        let mut red = Scheme::DEFAULT;
        red.base = Color::rgb(0xFF, 0, 0);
        ctx.set_scheme(below, Some(red)).unwrap();

        ctx.paint(&mut driver, &mut Tracer::none());
        // The covered widget's fill never reaches the driver.
        assert!(
            driver
                .fills
                .iter()
                .all(|&(_, color)| color != Color::rgb(0xFF, 0, 0))
        );
        assert!(
            driver
                .fills
                .contains(&(Rect::new(10, 10, 30, 30), Scheme::DEFAULT.base))
        );
    }

    #[test]
    fn hiding_a_widget_repaints_the_hole() {
        let (mut ctx, mut driver, root) = pumped();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.paint(&mut driver, &mut Tracer::none());

        driver.fills.clear();
        ctx.set_visible(child, false).unwrap();
        ctx.paint(&mut driver, &mut Tracer::none());
        assert_eq!(
            driver.fills,
            vec![(Rect::new(10, 10, 20, 20), Scheme::DEFAULT.base)]
        );
    }

    #[test]
    fn destroying_a_widget_repaints_its_footprint() {
        let (mut ctx, mut driver, root) = pumped();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.paint(&mut driver, &mut Tracer::none());

        driver.fills.clear();
        ctx.destroy_widget(child).unwrap();
        assert!(!ctx.widgets().is_alive(child));
        ctx.paint(&mut driver, &mut Tracer::none());
        assert_eq!(
            driver.fills,
            vec![(Rect::new(10, 10, 20, 20), Scheme::DEFAULT.base)]
        );
    }

    #[test]
    fn second_buffer_replays_previous_frame_damage() {
        let (mut ctx, mut driver, _root) = pumped();
        ctx.screen_mut(0)
            .unwrap()
            .layer_mut(0)
            .unwrap()
            .set_buffer_count(2)
            .unwrap();
        ctx.paint(&mut driver, &mut Tracer::none());

        driver.fills.clear();
        ctx.inject_damage(0, Rect::new(0, 0, 10, 10), false, &mut Tracer::none())
            .unwrap();
        ctx.paint(&mut driver, &mut Tracer::none());
        // The second buffer has never been written; the frame covers it all.
        assert_eq!(
            driver.fills,
            vec![(Rect::new(0, 0, LAYER_W, LAYER_H), Scheme::DEFAULT.base)]
        );

        driver.fills.clear();
        ctx.inject_damage(0, Rect::new(0, 0, 10, 10), false, &mut Tracer::none())
            .unwrap();
        ctx.paint(&mut driver, &mut Tracer::none());
        // From here on only the union with the previous frame repaints.
        assert_eq!(
            driver.fills,
            vec![(Rect::new(0, 0, 10, 10), Scheme::DEFAULT.base)]
        );
    }

    #[test]
    fn switching_screens_tears_down_non_persistent_trees() {
        let mut ctx = Context::new();
        let mut driver = SpyDriver::default();
        let a = ctx.add_screen(Screen::new());
        let b = ctx.add_screen(Screen::new());
        let root_a = ctx.create_layer(a, 0, Rect::new(0, 0, 50, 50)).unwrap();
        let root_b = ctx.create_layer(b, 0, Rect::new(0, 0, 50, 50)).unwrap();

        ctx.show_screen(a, &mut driver).unwrap();
        assert_eq!(ctx.active_screen(), Some(a));
        ctx.show_screen(b, &mut driver).unwrap();
        assert_eq!(ctx.active_screen(), Some(b));
        assert!(!ctx.widgets().is_alive(root_a));
        assert!(ctx.widgets().is_alive(root_b));
        assert!(!ctx.screen(a).unwrap().is_created());
        assert!(ctx.screen(a).unwrap().layer(0).is_none());
    }

    #[test]
    fn persistent_screens_keep_their_widgets_when_hidden() {
        let mut ctx = Context::new();
        let mut driver = SpyDriver::default();
        let a = ctx.add_screen(Screen::new());
        let b = ctx.add_screen(Screen::new());
        ctx.screen_mut(a).unwrap().set_persistent(true);
        let root_a = ctx.create_layer(a, 0, Rect::new(0, 0, 50, 50)).unwrap();
        let _root_b = ctx.create_layer(b, 0, Rect::new(0, 0, 50, 50)).unwrap();

        ctx.show_screen(a, &mut driver).unwrap();
        ctx.show_screen(b, &mut driver).unwrap();
        assert!(ctx.widgets().is_alive(root_a));
        assert!(ctx.screen(a).unwrap().is_created());
        assert!(ctx.screen(a).unwrap().layer(0).is_some());
    }

    struct ProbeEvents {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ScreenEvents for ProbeEvents {
        fn create(&mut self, ctx: &mut Context, screen: usize) {
            self.log.borrow_mut().push("create");
            ctx.create_layer(screen, 0, Rect::new(0, 0, 40, 40)).unwrap();
        }
        fn shown(&mut self, _ctx: &mut Context, _screen: usize) {
            self.log.borrow_mut().push("shown");
        }
        fn hidden(&mut self, _ctx: &mut Context, _screen: usize) {
            self.log.borrow_mut().push("hidden");
        }
    }

    #[test]
    fn screen_events_fire_in_order() {
        let mut ctx = Context::new();
        let mut driver = SpyDriver::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = ctx.add_screen(Screen::new());
        let b = ctx.add_screen(Screen::new());
        ctx.screen_mut(a)
            .unwrap()
            .set_events(Box::new(ProbeEvents { log: log.clone() }));

        ctx.show_screen(a, &mut driver).unwrap();
        assert_eq!(*log.borrow(), ["create", "shown"]);
        assert!(ctx.screen(a).unwrap().layer(0).is_some());

        ctx.show_screen(b, &mut driver).unwrap();
        assert_eq!(*log.borrow(), ["create", "shown", "hidden"]);

        // Non-persistent, so the next show rebuilds from scratch.
        ctx.show_screen(a, &mut driver).unwrap();
        assert_eq!(
            *log.borrow(),
            ["create", "shown", "hidden", "create", "shown"]
        );
    }

    /// Ticks forever, mirroring accumulated time into the alpha field so
    /// tests can observe it from the outside.
    struct Blinker {
        elapsed: u32,
    }

    impl WidgetBehavior for Blinker {
        fn draw_step(&mut self, cx: &mut PaintCx<'_>, driver: &mut dyn DisplayDriver) -> DrawStep {
            driver.fill_rect(cx.clip, Color::rgb(0, 0, 0xFF), cx.alpha);
            DrawStep::Done
        }
        fn update(&mut self, widget: &mut Widget, dt_ms: u32) -> UpdateStatus {
            self.elapsed += dt_ms;
            widget.alpha = (self.elapsed & 0xFF) as u8;
            widget.set_dirty(DirtyState::Dirty);
            UpdateStatus::Pending
        }
    }

    #[test]
    fn update_converts_raised_dirty_into_damage() {
        let (mut ctx, mut driver, root) = pumped();
        let w = ctx.create_widget(Box::new(Blinker { elapsed: 0 }));
        ctx.widgets_mut().widget_mut(w).rect = Rect::new(5, 5, 10, 10);
        ctx.widgets_mut().add_child(root, w);
        ctx.paint(&mut driver, &mut Tracer::none());

        driver.fills.clear();
        let status = ctx.update(16, &mut driver, &mut Tracer::none());
        assert_eq!(status, UpdateStatus::Pending);
        assert!(
            driver
                .fills
                .contains(&(Rect::new(5, 5, 10, 10), Color::rgb(0, 0, 0xFF)))
        );
        assert!(ctx.is_idle());
    }

    #[test]
    fn update_banks_time_while_a_frame_is_open() {
        let (mut ctx, mut driver, root) = pumped();
        let w = ctx.create_widget(Box::new(Blinker { elapsed: 0 }));
        ctx.widgets_mut().widget_mut(w).rect = Rect::new(5, 5, 10, 10);
        ctx.widgets_mut().add_child(root, w);
        ctx.paint(&mut driver, &mut Tracer::none());

        ctx.set_preempt_level(PreemptLevel::Level2);
        ctx.invalidate(root).unwrap();
        assert_eq!(
            ctx.paint(&mut driver, &mut Tracer::none()),
            PaintFlow::Yielded
        );
        // These ticks land while the frame is open: banked, not delivered.
        ctx.update(7, &mut driver, &mut Tracer::none());
        ctx.update(9, &mut driver, &mut Tracer::none());
        assert_eq!(ctx.widgets().widget(w).alpha, 255);

        ctx.set_preempt_level(PreemptLevel::None);
        while ctx.paint(&mut driver, &mut Tracer::none()) == PaintFlow::Yielded {}
        // The first tick after the frame closes delivers the lump sum.
        ctx.update(4, &mut driver, &mut Tracer::none());
        assert_eq!(ctx.widgets().widget(w).alpha, 20);
    }

    struct FocusProbe;

    impl WidgetBehavior for FocusProbe {
        fn draw_step(&mut self, _cx: &mut PaintCx<'_>, _driver: &mut dyn DisplayDriver) -> DrawStep {
            DrawStep::Done
        }
        fn focus_gained(&mut self, widget: &mut Widget) {
            widget.alpha = 1;
        }
        fn focus_lost(&mut self, widget: &mut Widget) {
            widget.alpha = 2;
        }
        fn editable(&self) -> bool {
            true
        }
    }

    #[test]
    fn focus_hooks_fire_and_edit_requires_editable() {
        let (mut ctx, _driver, root) = pumped();
        let a = ctx.create_widget(Box::new(FocusProbe));
        let b = ctx.create_default_widget();
        ctx.widgets_mut().add_child(root, a);
        ctx.widgets_mut().add_child(root, b);

        ctx.set_focus(Some(a)).unwrap();
        assert_eq!(ctx.focus(), Some(a));
        assert_eq!(ctx.widgets().widget(a).alpha, 1);
        assert_eq!(ctx.set_focus(Some(a)).unwrap_err(), Rejection::Unchanged);

        ctx.set_edit(Some(a)).unwrap();
        assert_eq!(ctx.edit(), Some(a));
        assert_eq!(ctx.set_edit(Some(b)).unwrap_err(), Rejection::NotEditable);

        ctx.set_enabled(b, false).unwrap();
        assert_eq!(ctx.set_focus(Some(b)).unwrap_err(), Rejection::Disabled);

        // Dropping focus leaves edit mode and fires the lost hook.
        ctx.set_focus(None).unwrap();
        assert_eq!(ctx.widgets().widget(a).alpha, 2);
        assert_eq!(ctx.edit(), None);
        assert_eq!(ctx.focus(), None);
    }

    #[test]
    fn configuration_guards_reject_invalid_requests() {
        let (mut ctx, mut driver, root) = pumped();
        assert_eq!(
            ctx.set_background(root, Background::Cache).unwrap_err(),
            Rejection::LayerCache
        );
        assert_eq!(ctx.move_widget(root, 0, 0).unwrap_err(), Rejection::Unchanged);
        assert_eq!(
            ctx.show_screen(0, &mut driver).unwrap_err(),
            Rejection::Unchanged
        );
        assert_eq!(
            ctx.show_screen(9, &mut driver).unwrap_err(),
            Rejection::ScreenIndex(9)
        );
        assert_eq!(
            ctx.create_layer(0, MAX_LAYERS, Rect::EMPTY).unwrap_err(),
            Rejection::LayerIndex(MAX_LAYERS)
        );
        assert_eq!(
            ctx.inject_damage(3, Rect::new(0, 0, 5, 5), false, &mut Tracer::none())
                .unwrap_err(),
            Rejection::LayerIndex(3)
        );
    }

    #[test]
    fn layer_deletion_is_refused_mid_frame() {
        let (mut ctx, mut driver, root) = pumped();
        ctx.paint(&mut driver, &mut Tracer::none());

        ctx.set_preempt_level(PreemptLevel::Level2);
        ctx.invalidate(root).unwrap();
        assert_eq!(
            ctx.paint(&mut driver, &mut Tracer::none()),
            PaintFlow::Yielded
        );
        assert_eq!(ctx.delete_layer(0, 0).unwrap_err(), Rejection::PaintInProgress);

        ctx.set_preempt_level(PreemptLevel::None);
        while ctx.paint(&mut driver, &mut Tracer::none()) == PaintFlow::Yielded {}
        ctx.delete_layer(0, 0).unwrap();
        assert!(!ctx.widgets().is_alive(root));
        assert!(ctx.screen(0).unwrap().layer(0).is_none());
    }

    #[test]
    fn point_lookup_honors_layer_input_rects() {
        let (mut ctx, _driver, root) = pumped();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));

        assert_eq!(ctx.widget_at_point(15, 15), Some(child));
        assert_eq!(ctx.widget_at_point(50, 50), Some(root));
        assert_eq!(ctx.widget_at_point(200, 200), None);

        // Shrink the input rect; points outside it miss the layer.
        ctx.screen_mut(0)
            .unwrap()
            .layer_mut(0)
            .unwrap()
            .set_input_rect(Rect::new(0, 0, 12, 12));
        assert_eq!(ctx.widget_at_point(50, 50), None);
        assert_eq!(ctx.widget_at_point(5, 5), Some(root));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn trace_events_cover_the_frame_lifecycle() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Log(Vec<&'static str>);
        impl TraceSink for Log {
            fn on_damage(&mut self, _e: &DamageEvent) {
                self.0.push("damage");
            }
            fn on_preframe(&mut self, _e: &PreframeEvent) {
                self.0.push("preframe");
            }
            fn on_frame_done(&mut self, _e: &FrameDoneEvent) {
                self.0.push("frame_done");
            }
            fn on_buffer_swap(&mut self, _e: &BufferSwapEvent) {
                self.0.push("swap");
            }
        }

        let (mut ctx, mut driver, _root) = pumped();
        ctx.paint(&mut driver, &mut Tracer::none());

        let mut log = Log::default();
        ctx.inject_damage(0, Rect::new(0, 0, 10, 10), false, &mut Tracer::new(&mut log))
            .unwrap();
        ctx.paint(&mut driver, &mut Tracer::new(&mut log));
        assert_eq!(log.0, ["damage", "preframe", "swap", "frame_done"]);
    }
}
