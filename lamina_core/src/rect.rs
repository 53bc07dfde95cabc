// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangle algebra.
//!
//! [`Rect`] is the unit of damage tracking: an axis-aligned rectangle with
//! `i32` origin and extent, covering the inclusive pixel span
//! `x ..= x + width - 1`. A rect with zero or negative extent is *degenerate*
//! and intersects nothing, including itself; every operation documents how it
//! treats degenerate inputs.

use core::fmt;

/// An axis-aligned rectangle in some integer coordinate space.
///
/// Fields are plain `i32`; a non-positive `width` or `height` marks the rect
/// as [degenerate](Self::is_degenerate).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Horizontal extent in pixels.
    pub width: i32,
    /// Vertical extent in pixels.
    pub height: i32,
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl Rect {
    /// The empty rect at the origin.
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Creates a rect from origin and extent.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rect of the given extent at the origin.
    #[inline]
    #[must_use]
    pub const fn of_size(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether this rect has no area (zero or negative extent).
    #[inline]
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The rightmost column covered, inclusive.
    ///
    /// Meaningless for degenerate rects.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width - 1
    }

    /// The bottommost row covered, inclusive.
    ///
    /// Meaningless for degenerate rects.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height - 1
    }

    /// The covered area in pixels; zero for degenerate rects.
    #[inline]
    #[must_use]
    pub const fn area(self) -> i64 {
        if self.is_degenerate() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// This rect shifted by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width,
            height: self.height,
        }
    }

    /// Whether `self` and `other` share at least one pixel.
    ///
    /// Edge-adjacent rects do not intersect. Degenerate rects intersect
    /// nothing, including themselves.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        !self.is_degenerate()
            && !other.is_degenerate()
            && self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Whether the pixel `(px, py)` lies inside `self`.
    ///
    /// Always false for degenerate rects.
    #[inline]
    #[must_use]
    pub const fn contains_point(self, px: i32, py: i32) -> bool {
        !self.is_degenerate()
            && px >= self.x
            && px <= self.right()
            && py >= self.y
            && py <= self.bottom()
    }

    /// Whether every pixel of `other` lies inside `self`.
    ///
    /// Always false when either rect is degenerate.
    #[inline]
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        !self.is_degenerate()
            && !other.is_degenerate()
            && self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// The region of `self` inside `other`.
    ///
    /// Returns [`Rect::EMPTY`] when the rects are disjoint or either is
    /// degenerate.
    #[inline]
    #[must_use]
    pub const fn clip(self, other: Self) -> Self {
        if self.is_degenerate() || other.is_degenerate() {
            return Self::EMPTY;
        }
        let x = if self.x > other.x { self.x } else { other.x };
        let y = if self.y > other.y { self.y } else { other.y };
        let right = if self.right() < other.right() {
            self.right()
        } else {
            other.right()
        };
        let bottom = if self.bottom() < other.bottom() {
            self.bottom()
        } else {
            other.bottom()
        };
        if right < x || bottom < y {
            return Self::EMPTY;
        }
        Self {
            x,
            y,
            width: right - x + 1,
            height: bottom - y + 1,
        }
    }

    /// The smallest rect containing both `self` and `other`.
    ///
    /// A degenerate argument contributes nothing: the other argument is
    /// returned unchanged.
    #[inline]
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        if self.is_degenerate() {
            return other;
        }
        if other.is_degenerate() {
            return self;
        }
        let x = if self.x < other.x { self.x } else { other.x };
        let y = if self.y < other.y { self.y } else { other.y };
        let right = if self.right() > other.right() {
            self.right()
        } else {
            other.right()
        };
        let bottom = if self.bottom() > other.bottom() {
            self.bottom()
        } else {
            other.bottom()
        };
        Self {
            x,
            y,
            width: right - x + 1,
            height: bottom - y + 1,
        }
    }

    /// The pieces of `self` not covered by `other`.
    ///
    /// Produces up to four mutually disjoint rects: full-width top and bottom
    /// bands, then left and right slices beside the overlap. If the rects are
    /// disjoint the single piece is `self`; if `other` covers `self` there
    /// are no pieces.
    #[must_use]
    pub fn split_around(self, other: Self) -> SplitPieces {
        let overlap = self.clip(other);
        if overlap.is_degenerate() {
            return SplitPieces::one(self);
        }

        let mut out = SplitPieces::none();
        // Band above the overlap.
        out.push_non_degenerate(Self::new(self.x, self.y, self.width, overlap.y - self.y));
        // Band below the overlap.
        out.push_non_degenerate(Self::new(
            self.x,
            overlap.bottom() + 1,
            self.width,
            self.bottom() - overlap.bottom(),
        ));
        // Slice left of the overlap.
        out.push_non_degenerate(Self::new(
            self.x,
            overlap.y,
            overlap.x - self.x,
            overlap.height,
        ));
        // Slice right of the overlap.
        out.push_non_degenerate(Self::new(
            overlap.right() + 1,
            overlap.y,
            self.right() - overlap.right(),
            overlap.height,
        ));
        out
    }
}

/// The up-to-four leftover pieces produced by [`Rect::split_around`].
#[derive(Clone, Copy, Debug)]
pub struct SplitPieces {
    pieces: [Rect; 4],
    len: u8,
}

impl SplitPieces {
    const fn none() -> Self {
        Self {
            pieces: [Rect::EMPTY; 4],
            len: 0,
        }
    }

    const fn one(rect: Rect) -> Self {
        Self {
            pieces: [rect, Rect::EMPTY, Rect::EMPTY, Rect::EMPTY],
            len: 1,
        }
    }

    fn push_non_degenerate(&mut self, rect: Rect) {
        if !rect.is_degenerate() {
            self.pieces[self.len as usize] = rect;
            self.len += 1;
        }
    }

    /// The pieces as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Rect] {
        &self.pieces[..self.len as usize]
    }

    /// Number of pieces (0–4).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether there are no pieces (`other` covered the subject).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'a> IntoIterator for &'a SplitPieces {
    type Item = &'a Rect;
    type IntoIter = core::slice::Iter<'a, Rect>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}
