// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screens: named sets of layers that show and hide together.
//!
//! A screen is the unit of navigation. Exactly one screen is active at a
//! time; showing another tears the current one down (unless it is marked
//! persistent) and builds the next one through its [`ScreenEvents`] hooks.
//! Layers occupy fixed slots matching the hardware layer indices, so slot 0
//! scans out below slot 1 and so on.

use alloc::boxed::Box;
use core::fmt;

use crate::error::Rejection;
use crate::hal::Orientation;
use crate::layer::Layer;

/// Number of layer slots per screen, matching typical scan-out hardware.
pub const MAX_LAYERS: usize = 8;

/// Lifecycle hooks for building and tearing down a screen's widget tree.
///
/// Hooks receive the owning [`Context`](crate::context::Context) so they can
/// create layers and widgets; the events object is temporarily taken out of
/// the screen for the duration of a call. All hooks default to no-ops.
pub trait ScreenEvents {
    /// Called the first time the screen is shown (and again after a
    /// non-persistent screen was torn down). Builds the widget tree.
    fn create(&mut self, ctx: &mut crate::context::Context, screen: usize) {
        _ = (ctx, screen);
    }

    /// Called every time the screen becomes active.
    fn shown(&mut self, ctx: &mut crate::context::Context, screen: usize) {
        _ = (ctx, screen);
    }

    /// Called when the screen stops being active, before any teardown.
    fn hidden(&mut self, ctx: &mut crate::context::Context, screen: usize) {
        _ = (ctx, screen);
    }
}

/// One screen: up to [`MAX_LAYERS`] layers plus display-level configuration.
pub struct Screen {
    layers: [Option<Layer>; MAX_LAYERS],
    persistent: bool,
    created: bool,
    orientation: Orientation,
    mirrored: bool,
    layer_swap_sync: bool,
    pub(crate) events: Option<Box<dyn ScreenEvents>>,
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("layers", &self.layers)
            .field("persistent", &self.persistent)
            .field("created", &self.created)
            .field("orientation", &self.orientation)
            .finish_non_exhaustive()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    /// Creates an empty, non-persistent screen in the native orientation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: core::array::from_fn(|_| None),
            persistent: false,
            created: false,
            orientation: Orientation::Deg0,
            mirrored: false,
            layer_swap_sync: false,
            events: None,
        }
    }

    /// Installs the lifecycle hooks.
    pub fn set_events(&mut self, events: Box<dyn ScreenEvents>) {
        self.events = Some(events);
    }

    // -- Layer slots --

    /// Puts a layer into a slot, returning what occupied it before.
    ///
    /// # Errors
    ///
    /// [`Rejection::LayerIndex`] for slots past [`MAX_LAYERS`].
    pub fn set_layer(
        &mut self,
        slot: usize,
        layer: Option<Layer>,
    ) -> Result<Option<Layer>, Rejection> {
        let entry = self
            .layers
            .get_mut(slot)
            .ok_or(Rejection::LayerIndex(slot))?;
        Ok(core::mem::replace(entry, layer))
    }

    /// The layer in a slot, if any.
    #[must_use]
    pub fn layer(&self, slot: usize) -> Option<&Layer> {
        self.layers.get(slot).and_then(Option::as_ref)
    }

    /// The layer in a slot, mutably.
    #[must_use]
    pub fn layer_mut(&mut self, slot: usize) -> Option<&mut Layer> {
        self.layers.get_mut(slot).and_then(Option::as_mut)
    }

    /// Occupied slots in scan-out order (bottom first).
    pub fn layer_slots(&self) -> impl Iterator<Item = (usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(slot, layer)| layer.as_ref().map(|l| (slot, l)))
    }

    // -- Configuration --

    /// Whether the screen's widget tree survives being hidden.
    #[inline]
    #[must_use]
    pub const fn persistent(&self) -> bool {
        self.persistent
    }

    /// Marks the screen persistent (or not).
    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// Whether [`ScreenEvents::create`] has run since the last teardown.
    #[inline]
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.created
    }

    pub(crate) fn set_created(&mut self, created: bool) {
        self.created = created;
    }

    /// Display rotation while this screen is active.
    #[inline]
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Sets the display rotation. Takes effect when the screen is shown.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Whether the display is horizontally mirrored.
    #[inline]
    #[must_use]
    pub const fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Sets horizontal mirroring. Takes effect when the screen is shown.
    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    /// Whether all layers should swap in the same vsync interval.
    #[inline]
    #[must_use]
    pub const fn layer_swap_sync(&self) -> bool {
        self.layer_swap_sync
    }

    /// Requests synchronized layer swaps. A hint for drivers that support
    /// ganged swaps; the engine itself swaps layers as their frames finish.
    pub fn set_layer_swap_sync(&mut self, sync: bool) {
        self.layer_swap_sync = sync;
    }
}
