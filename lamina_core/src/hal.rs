// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display driver contract.
//!
//! The engine never touches pixels. Everything it draws goes through a
//! [`DisplayDriver`]: layer register programming, clip state, and the few
//! primitives the default painters need. Hardware integrations implement
//! this trait over their blitter/LCD controller; `lamina_sim` provides a
//! software implementation for tests and demos.
//!
//! Configuration methods default to no-ops so a minimal driver only has to
//! provide the active-layer/clip plumbing and the drawing primitives.
//! Drivers without pixel read-back may leave [`read_region`] as the default,
//! at the cost of the background-cache optimization doing nothing.
//!
//! # Crate boundaries
//!
//! `lamina_core` owns the widget/layer data model, the damage engine, and
//! this contract. Driver crates depend on `lamina_core` and provide hardware
//! glue; application code wires both together and calls
//! [`Context::update`](crate::context::Context::update) from its main loop.
//!
//! [`read_region`]: DisplayDriver::read_region

use core::fmt;

use crate::rect::Rect;

/// Identifies a hardware display layer.
///
/// The engine assigns these from screen slot positions; drivers map them to
/// whatever the display controller uses to select a layer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HwLayerId(pub u32);

impl fmt::Debug for HwLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HwLayerId({})", self.0)
    }
}

impl HwLayerId {
    /// The id for a screen slot position.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "slot positions are bounded by `MAX_LAYERS`"
    )]
    pub const fn from_slot(slot: usize) -> Self {
        Self(slot as u32)
    }
}

/// A packed ARGB8888 color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:08X})", self.0)
    }
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);

    /// An opaque color from 8-bit channels.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(0xFF, r, g, b)
    }

    /// A color from alpha plus 8-bit channels.
    #[inline]
    #[must_use]
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// The alpha channel.
    #[inline]
    #[must_use]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The red channel.
    #[inline]
    #[must_use]
    pub const fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// The green channel.
    #[inline]
    #[must_use]
    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// The blue channel.
    #[inline]
    #[must_use]
    pub const fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// How one backing buffer of a layer's swap chain is obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferSpec {
    /// The driver allocates the buffer.
    #[default]
    Auto,
    /// The buffer lives at a fixed memory address.
    Address(usize),
}

/// Physical display rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Native orientation.
    #[default]
    Deg0,
    /// Rotated 90° counter-clockwise.
    Deg90,
    /// Rotated 180°.
    Deg180,
    /// Rotated 270° counter-clockwise.
    Deg270,
}

/// The hardware seam the engine renders through.
///
/// One method call is the atomic unit of drawing: cooperative preemption
/// yields *between* calls, never inside one.
pub trait DisplayDriver {
    /// Physical display dimensions in pixels, before orientation.
    fn display_size(&self) -> (i32, i32);

    // -- Layer programming (defaults: no-op) --

    /// Enables or disables a hardware layer.
    fn set_layer_enabled(&mut self, layer: HwLayerId, enabled: bool) {
        _ = (layer, enabled);
    }

    /// Positions a layer on the display.
    fn set_layer_position(&mut self, layer: HwLayerId, x: i32, y: i32) {
        _ = (layer, x, y);
    }

    /// Sizes a layer.
    fn set_layer_size(&mut self, layer: HwLayerId, width: i32, height: i32) {
        _ = (layer, width, height);
    }

    /// Configures a layer's swap chain; `specs.len()` is the buffer count.
    fn set_layer_buffers(&mut self, layer: HwLayerId, specs: &[BufferSpec]) {
        _ = (layer, specs);
    }

    /// Configures layer-level alpha blending.
    fn set_layer_alpha(&mut self, layer: HwLayerId, enabled: bool, amount: u8) {
        _ = (layer, enabled, amount);
    }

    /// Configures the layer's chroma-key mask.
    fn set_layer_mask(&mut self, layer: HwLayerId, enabled: bool, color: Color) {
        _ = (layer, enabled, color);
    }

    /// Ties the layer's buffer swap to vertical sync.
    fn set_layer_vsync(&mut self, layer: HwLayerId, enabled: bool) {
        _ = (layer, enabled);
    }

    /// Programs display rotation and mirroring.
    fn set_orientation(&mut self, orientation: Orientation, mirrored: bool) {
        _ = (orientation, mirrored);
    }

    // -- Frame plumbing --

    /// Selects the layer subsequent draws target.
    fn set_active_layer(&mut self, layer: HwLayerId);

    /// Sets the clip rect, in active-layer space, for subsequent draws.
    fn set_clip(&mut self, rect: Rect);

    /// Opens a draw batch. Defaults to a no-op.
    fn begin(&mut self) {}

    /// Closes a draw batch. Defaults to a no-op.
    fn end(&mut self) {}

    /// Presents the layer's back buffer and rotates its swap chain.
    fn swap_layer(&mut self, layer: HwLayerId);

    // -- Primitives (clipped to the current clip rect) --

    /// Fills `rect` with `color` at the given alpha.
    fn fill_rect(&mut self, rect: Rect, color: Color, alpha: u8);

    /// Draws a straight line between two points.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, alpha: u8);

    /// Copies a pixel block to `dest`; `pixels` is row-major, `dest`-sized.
    ///
    /// Defaults to a no-op for drivers without blit support.
    fn blit(&mut self, dest: Rect, pixels: &[Color]) {
        _ = (dest, pixels);
    }

    /// Reads the pixels under `rect` from the active layer's back buffer
    /// into `out` (row-major, `rect`-sized).
    ///
    /// Defaults to leaving `out` untouched for drivers without read-back.
    fn read_region(&mut self, rect: Rect, out: &mut [Color]) {
        _ = (rect, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_channel_packing() {
        let c = Color::argb(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.0, 0x1234_5678);
        assert_eq!(c.alpha(), 0x12);
        assert_eq!(c.red(), 0x34);
        assert_eq!(c.green(), 0x56);
        assert_eq!(c.blue(), 0x78);
    }

    #[test]
    fn rgb_is_opaque() {
        assert_eq!(Color::rgb(1, 2, 3).alpha(), 0xFF);
    }

    #[test]
    fn debug_formats() {
        assert_eq!(alloc::format!("{:?}", HwLayerId(2)), "HwLayerId(2)");
        assert_eq!(
            alloc::format!("{:?}", Color::rgb(0xAB, 0xCD, 0xEF)),
            "Color(#FFABCDEF)"
        );
    }

    #[test]
    fn minimal_driver_compiles_with_defaults() {
        struct Bare;
        impl DisplayDriver for Bare {
            fn display_size(&self) -> (i32, i32) {
                (480, 272)
            }
            fn set_active_layer(&mut self, _layer: HwLayerId) {}
            fn set_clip(&mut self, _rect: Rect) {}
            fn swap_layer(&mut self, _layer: HwLayerId) {}
            fn fill_rect(&mut self, _rect: Rect, _color: Color, _alpha: u8) {}
            fn draw_line(
                &mut self,
                _x0: i32,
                _y0: i32,
                _x1: i32,
                _y1: i32,
                _color: Color,
                _alpha: u8,
            ) {
            }
        }

        let mut d = Bare;
        d.set_layer_enabled(HwLayerId(0), true);
        d.begin();
        d.blit(Rect::new(0, 0, 1, 1), &[Color::BLACK]);
        let mut out = [Color::WHITE];
        d.read_region(Rect::new(0, 0, 1, 1), &mut out);
        assert_eq!(out[0], Color::WHITE);
        d.end();
    }
}
