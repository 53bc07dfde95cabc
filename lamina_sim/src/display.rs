// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A software [`DisplayDriver`] over in-memory pixel buffers.
//!
//! [`SimDisplay`] models the hardware the engine expects: per-layer swap
//! chains of packed ARGB8888 buffers, a clip rect, and the drawing
//! primitives. Draws are clipped exactly as a blitter would clip them, land
//! in the back buffer only, and are journaled as [`DrawRecord`]s so tests
//! can assert on what was painted rather than on what was requested.
//!
//! The journal and the per-pixel write counts are the ground truth for the
//! redraw assertions in this crate: disjoint frame rects write each damaged
//! pixel once, an occluded widget's color never lands, and swap-chain
//! buffers converge once damage replay catches up.

use std::fmt;
use std::io::{self, Write};

use lamina_core::hal::{BufferSpec, Color, DisplayDriver, HwLayerId};
use lamina_core::rect::Rect;

/// One draw call as it landed.
///
/// Fills and blits record their clipped extent and are dropped entirely when
/// clipping leaves nothing; lines record the endpoints as issued and are
/// dropped when no pixel survived the clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawRecord {
    /// A solid fill.
    Fill {
        /// Target layer.
        layer: HwLayerId,
        /// Clipped extent that was written.
        rect: Rect,
        /// Requested fill color.
        color: Color,
        /// Requested blend amount.
        alpha: u8,
    },
    /// A line.
    Line {
        /// Target layer.
        layer: HwLayerId,
        /// Start column.
        x0: i32,
        /// Start row.
        y0: i32,
        /// End column.
        x1: i32,
        /// End row.
        y1: i32,
        /// Requested line color.
        color: Color,
    },
    /// A pixel-block copy.
    Blit {
        /// Target layer.
        layer: HwLayerId,
        /// Clipped destination that was written.
        rect: Rect,
    },
    /// A buffer swap.
    Swap {
        /// Target layer.
        layer: HwLayerId,
    },
}

/// Backing state for one hardware layer.
#[derive(Default)]
struct SimLayer {
    width: i32,
    height: i32,
    /// Swap chain; every buffer is `width * height` packed ARGB8888 pixels.
    buffers: Vec<Vec<u32>>,
    /// Index of the presented buffer.
    front: usize,
    /// Per-pixel write count since the journal was last cleared.
    writes: Vec<u32>,
}

impl SimLayer {
    fn bounds(&self) -> Rect {
        Rect::of_size(self.width, self.height)
    }

    fn back_index(&self) -> usize {
        if self.buffers.len() <= 1 {
            0
        } else {
            (self.front + 1) % self.buffers.len()
        }
    }

    fn resize(&mut self, width: i32, height: i32) {
        if self.width == width && self.height == height && !self.buffers.is_empty() {
            return;
        }
        self.width = width;
        self.height = height;
        let len = (width.max(0) as usize) * (height.max(0) as usize);
        let count = self.buffers.len().max(1);
        self.buffers = vec![vec![0; len]; count];
        self.front = 0;
        self.writes = vec![0; len];
    }

    fn set_buffer_count(&mut self, count: usize) {
        let count = count.max(1);
        if count == self.buffers.len() {
            return;
        }
        let len = self.buffers.first().map_or(0, Vec::len);
        self.buffers = vec![vec![0; len]; count];
        self.front = 0;
    }

    /// Overwrites one back-buffer pixel; false when out of bounds.
    fn put_pixel(&mut self, x: i32, y: i32, value: u32) -> bool {
        if !self.bounds().contains_point(x, y) {
            return false;
        }
        let back = self.back_index();
        let idx = (y * self.width + x) as usize;
        self.buffers[back][idx] = value;
        self.writes[idx] += 1;
        true
    }

    /// Blends one back-buffer pixel; false when out of bounds.
    fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: u8) -> bool {
        if !self.bounds().contains_point(x, y) {
            return false;
        }
        let back = self.back_index();
        let idx = (y * self.width + x) as usize;
        let dst = self.buffers[back][idx];
        self.buffers[back][idx] = blend(dst, color, alpha);
        self.writes[idx] += 1;
        true
    }
}

/// Source-over blend of `src` at `alpha` onto `dst`; the result is opaque.
fn blend(dst: u32, src: Color, alpha: u8) -> u32 {
    if alpha == 0xFF {
        return 0xFF00_0000 | (src.0 & 0x00FF_FFFF);
    }
    let a = u32::from(alpha);
    let inv = 255 - a;
    let d = Color(dst);
    let channel = |s: u8, d: u8| (u32::from(s) * a + u32::from(d) * inv) / 255;
    let r = channel(src.red(), d.red());
    let g = channel(src.green(), d.green());
    let b = channel(src.blue(), d.blue());
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

/// A software [`DisplayDriver`] for tests and demos.
///
/// Layers come into existence when first touched and start with a single
/// zero-sized buffer; [`set_layer_size`](DisplayDriver::set_layer_size) and
/// [`set_layer_buffers`](DisplayDriver::set_layer_buffers) shape them and
/// are idempotent, so the engine may re-program geometry every frame without
/// losing content. `Address` buffer specs are accepted but the simulator
/// allocates every buffer itself.
pub struct SimDisplay {
    width: i32,
    height: i32,
    layers: Vec<SimLayer>,
    active: HwLayerId,
    clip: Rect,
    journal: Vec<DrawRecord>,
    pixels_written: u64,
}

impl fmt::Debug for SimDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimDisplay")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers.len())
            .field("journal", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl SimDisplay {
    /// Creates a display of the given physical dimensions.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            active: HwLayerId(0),
            clip: Rect::EMPTY,
            journal: Vec::new(),
            pixels_written: 0,
        }
    }

    fn get(&self, layer: HwLayerId) -> Option<&SimLayer> {
        self.layers.get(layer.0 as usize)
    }

    /// Grows the layer table on first touch.
    fn get_mut(&mut self, layer: HwLayerId) -> &mut SimLayer {
        let idx = layer.0 as usize;
        if idx >= self.layers.len() {
            self.layers.resize_with(idx + 1, SimLayer::default);
        }
        &mut self.layers[idx]
    }

    // -- Journal --

    /// Every draw that landed since the last [`clear_journal`](Self::clear_journal).
    #[must_use]
    pub fn journal(&self) -> &[DrawRecord] {
        &self.journal
    }

    /// Clears the journal, the per-pixel write counts, and the written-pixel
    /// counter. Buffer contents are untouched.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
        self.pixels_written = 0;
        for layer in &mut self.layers {
            layer.writes.fill(0);
        }
    }

    /// Pixels written by fills, lines, and blits since the last clear.
    #[must_use]
    pub fn pixels_written(&self) -> u64 {
        self.pixels_written
    }

    /// Row-major per-pixel write counts for `layer` since the last clear.
    #[must_use]
    pub fn write_counts(&self, layer: HwLayerId) -> Option<&[u32]> {
        self.get(layer).map(|sim| sim.writes.as_slice())
    }

    // -- Presented content --

    /// The presented color at `(x, y)` of `layer`.
    #[must_use]
    pub fn pixel(&self, layer: HwLayerId, x: i32, y: i32) -> Option<Color> {
        let sim = self.get(layer)?;
        if !sim.bounds().contains_point(x, y) {
            return None;
        }
        let front = sim.buffers.get(sim.front)?;
        Some(Color(front[(y * sim.width + x) as usize]))
    }

    /// Raw native-endian bytes of the presented buffer, for hashing or
    /// snapshot comparison. Use [`pixel`](Self::pixel) for channel access.
    #[must_use]
    pub fn front_bytes(&self, layer: HwLayerId) -> Option<&[u8]> {
        let sim = self.get(layer)?;
        sim.buffers
            .get(sim.front)
            .map(|front| bytemuck::cast_slice(front.as_slice()))
    }

    /// Buffers in `layer`'s swap chain, 1 for unknown layers.
    #[must_use]
    pub fn buffer_count(&self, layer: HwLayerId) -> usize {
        self.get(layer).map_or(1, |sim| sim.buffers.len().max(1))
    }

    /// Whether every buffer of `layer`'s swap chain holds identical pixels.
    #[must_use]
    pub fn buffers_coherent(&self, layer: HwLayerId) -> bool {
        self.buffers_match_except(layer, &[])
    }

    /// Like [`buffers_coherent`](Self::buffers_coherent), ignoring pixels
    /// inside any of `exclude`.
    ///
    /// With multi-buffering the engine leaves the back buffer stale by
    /// exactly the damage still queued for replay; pass those rects to check
    /// that everything else has converged.
    #[must_use]
    pub fn buffers_match_except(&self, layer: HwLayerId, exclude: &[Rect]) -> bool {
        let Some(sim) = self.get(layer) else {
            return true;
        };
        let Some(front) = sim.buffers.get(sim.front) else {
            return true;
        };
        for buffer in &sim.buffers {
            for y in 0..sim.height {
                for x in 0..sim.width {
                    let idx = (y * sim.width + x) as usize;
                    if buffer[idx] != front[idx]
                        && !exclude.iter().any(|r| r.contains_point(x, y))
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Writes the presented buffer of `layer` as a binary PPM image.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::NotFound`] for a layer the engine never touched;
    /// otherwise whatever writing to `writer` reports.
    pub fn write_ppm(&self, layer: HwLayerId, writer: &mut dyn Write) -> io::Result<()> {
        let sim = self
            .get(layer)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such layer"))?;
        let front = sim
            .buffers
            .get(sim.front)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "layer has no buffers"))?;
        write!(writer, "P6\n{} {}\n255\n", sim.width, sim.height)?;
        for &pixel in front {
            let color = Color(pixel);
            writer.write_all(&[color.red(), color.green(), color.blue()])?;
        }
        Ok(())
    }
}

impl DisplayDriver for SimDisplay {
    fn display_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn set_layer_size(&mut self, layer: HwLayerId, width: i32, height: i32) {
        self.get_mut(layer).resize(width, height);
    }

    fn set_layer_buffers(&mut self, layer: HwLayerId, specs: &[BufferSpec]) {
        self.get_mut(layer).set_buffer_count(specs.len());
    }

    fn set_active_layer(&mut self, layer: HwLayerId) {
        self.active = layer;
    }

    fn set_clip(&mut self, rect: Rect) {
        self.clip = rect;
    }

    fn swap_layer(&mut self, layer: HwLayerId) {
        let sim = self.get_mut(layer);
        if sim.buffers.len() > 1 {
            sim.front = (sim.front + 1) % sim.buffers.len();
        }
        self.journal.push(DrawRecord::Swap { layer });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, alpha: u8) {
        let active = self.active;
        let clip = self.clip;
        let sim = self.get_mut(active);
        let landed = rect.clip(clip).clip(sim.bounds());
        if landed.is_degenerate() {
            return;
        }
        let mut written = 0_u64;
        for y in landed.y..=landed.bottom() {
            for x in landed.x..=landed.right() {
                if sim.blend_pixel(x, y, color, alpha) {
                    written += 1;
                }
            }
        }
        self.pixels_written += written;
        self.journal.push(DrawRecord::Fill {
            layer: active,
            rect: landed,
            color,
            alpha,
        });
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, alpha: u8) {
        let active = self.active;
        let clip = self.clip;
        let mut written = 0_u64;
        {
            let sim = self.get_mut(active);
            let bounds = sim.bounds().clip(clip);
            // Bresenham; per-pixel clip keeps partially visible lines honest.
            let dx = (x1 - x0).abs();
            let dy = -(y1 - y0).abs();
            let sx = if x0 < x1 { 1 } else { -1 };
            let sy = if y0 < y1 { 1 } else { -1 };
            let mut err = dx + dy;
            let (mut x, mut y) = (x0, y0);
            loop {
                if bounds.contains_point(x, y) && sim.blend_pixel(x, y, color, alpha) {
                    written += 1;
                }
                if x == x1 && y == y1 {
                    break;
                }
                let e2 = 2 * err;
                if e2 >= dy {
                    err += dy;
                    x += sx;
                }
                if e2 <= dx {
                    err += dx;
                    y += sy;
                }
            }
        }
        self.pixels_written += written;
        if written > 0 {
            self.journal.push(DrawRecord::Line {
                layer: active,
                x0,
                y0,
                x1,
                y1,
                color,
            });
        }
    }

    fn blit(&mut self, dest: Rect, pixels: &[Color]) {
        let active = self.active;
        let clip = self.clip;
        let sim = self.get_mut(active);
        let landed = dest.clip(clip).clip(sim.bounds());
        if landed.is_degenerate() {
            return;
        }
        let Ok(expected) = usize::try_from(dest.area()) else {
            return;
        };
        if pixels.len() < expected {
            return;
        }
        let mut written = 0_u64;
        for y in landed.y..=landed.bottom() {
            for x in landed.x..=landed.right() {
                let src = pixels[((y - dest.y) * dest.width + (x - dest.x)) as usize];
                if sim.put_pixel(x, y, 0xFF00_0000 | (src.0 & 0x00FF_FFFF)) {
                    written += 1;
                }
            }
        }
        self.pixels_written += written;
        self.journal.push(DrawRecord::Blit {
            layer: active,
            rect: landed,
        });
    }

    fn read_region(&mut self, rect: Rect, out: &mut [Color]) {
        let Some(sim) = self.get(self.active) else {
            return;
        };
        let Ok(expected) = usize::try_from(rect.area()) else {
            return;
        };
        if out.len() < expected {
            return;
        }
        let readable = rect.clip(sim.bounds());
        if readable.is_degenerate() {
            return;
        }
        let back = sim.back_index();
        let buffer = &sim.buffers[back];
        for y in readable.y..=readable.bottom() {
            for x in readable.x..=readable.right() {
                let src = buffer[(y * sim.width + x) as usize];
                out[((y - rect.y) * rect.width + (x - rect.x)) as usize] = Color(src);
            }
        }
    }
}

// ---------------------------------------------------------------------------
