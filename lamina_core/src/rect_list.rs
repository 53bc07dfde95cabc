// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered damage-rectangle lists.
//!
//! [`RectList`] is the working storage behind every per-layer damage list:
//! a small-vector of [`Rect`]s with inline capacity [`RECT_LIST_INLINE`] and
//! a hard cap of [`MAX_DAMAGE_RECTS`] entries. Nothing deduplicates on
//! insert; [`add_damage`](RectList::add_damage) applies the single-pass
//! first-match merge rule, and the explicit
//! [`remove_duplicates`](RectList::remove_duplicates) →
//! [`merge_similar`](RectList::merge_similar) →
//! [`remove_overlapping`](RectList::remove_overlapping) pipeline normalizes
//! a list before frame-rect assembly.
//!
//! Growth is bounded: an insert that would exceed the cap collapses the list
//! to a single union rect, trading redraw granularity for a memory ceiling.

use core::fmt;

use smallvec::SmallVec;

use crate::rect::Rect;

/// Inline capacity of a [`RectList`]; longer lists spill to the heap.
pub const RECT_LIST_INLINE: usize = 8;

/// Hard cap on entries per list. Inserts beyond this degrade the list to a
/// single union rect rather than growing.
pub const MAX_DAMAGE_RECTS: usize = 64;

/// An ordered, mutable sequence of damage rectangles.
#[derive(Clone, Default)]
pub struct RectList {
    rects: SmallVec<[Rect; RECT_LIST_INLINE]>,
}

impl fmt::Debug for RectList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rects.iter()).finish()
    }
}

impl RectList {
    /// Creates an empty list.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rects: SmallVec::new_const(),
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Whether the list has no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The entries as a slice, in insertion order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Rect] {
        &self.rects
    }

    /// Iterates over the entries in order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Rect> {
        self.rects.iter()
    }

    /// The entry at `idx`, if in range.
    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Rect> {
        self.rects.get(idx).copied()
    }

    /// Removes all entries.
    #[inline]
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Appends `rect` without any merging, subject to the cap.
    ///
    /// Degenerate rects are dropped.
    pub fn push(&mut self, rect: Rect) {
        if rect.is_degenerate() {
            return;
        }
        if self.rects.len() >= MAX_DAMAGE_RECTS {
            self.collapse_to_union(rect);
        } else {
            self.rects.push(rect);
        }
    }

    /// Appends every entry of `other`, subject to the cap.
    pub fn extend_from(&mut self, other: &Self) {
        for rect in other.iter() {
            self.push(*rect);
        }
    }

    /// Removes and returns the front entry, if any.
    pub fn take_front(&mut self) -> Option<Rect> {
        if self.rects.is_empty() {
            None
        } else {
            Some(self.rects.remove(0))
        }
    }

    /// Records damage using the single-pass first-match rule.
    ///
    /// Scans front to back: an entry that already contains `rect` absorbs it;
    /// a `rect` that contains an entry replaces it; otherwise the first
    /// overlapping entry is replaced by the combined bounding box (unless
    /// `no_combine`). If nothing matches, `rect` is appended.
    ///
    /// Returns `true` when the damage was absorbed by an existing entry (or
    /// was degenerate), `false` when it was appended as a new entry. The scan
    /// stops at the first match, so the result is not guaranteed minimal;
    /// later entries are not re-examined against each other.
    pub fn add_damage(&mut self, rect: Rect, no_combine: bool) -> bool {
        if rect.is_degenerate() {
            return true;
        }
        for entry in &mut self.rects {
            if entry.contains_rect(rect) {
                return true;
            }
            if rect.contains_rect(*entry) {
                *entry = rect;
                return true;
            }
            if !no_combine && entry.intersects(rect) {
                *entry = entry.combine(rect);
                return true;
            }
        }
        self.push(rect);
        false
    }

    /// Removes exact duplicates, keeping the first occurrence.
    pub fn remove_duplicates(&mut self) {
        let mut i = 0;
        while i < self.rects.len() {
            let mut j = i + 1;
            while j < self.rects.len() {
                if self.rects[j] == self.rects[i] {
                    self.rects.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    /// Combines entries that overlap and span the same extent on the
    /// perpendicular axis, until no such pair remains.
    ///
    /// Two entries merge when they share `y`/`height` and overlap
    /// horizontally, or share `x`/`width` and overlap vertically. The
    /// combined rect is exact (no new area). Edge-adjacent entries do not
    /// merge; only overlapping ones do.
    pub fn merge_similar(&mut self) {
        loop {
            let Some((i, j)) = self.find_similar_pair() else {
                break;
            };
            let merged = self.rects[i].combine(self.rects[j]);
            self.rects[i] = merged;
            self.rects.remove(j);
        }
    }

    /// Removes entries wholly contained in another entry.
    pub fn remove_overlapping(&mut self) {
        let mut i = 0;
        'scan: while i < self.rects.len() {
            for j in 0..self.rects.len() {
                if i != j && self.rects[j].contains_rect(self.rects[i]) {
                    self.rects.remove(i);
                    continue 'scan;
                }
            }
            i += 1;
        }
    }

    /// Runs the ordered normalize pipeline: dedup, merge similar, then drop
    /// contained entries.
    pub fn normalize(&mut self) {
        self.remove_duplicates();
        self.merge_similar();
        self.remove_overlapping();
    }

    fn find_similar_pair(&self) -> Option<(usize, usize)> {
        for i in 0..self.rects.len() {
            for j in (i + 1)..self.rects.len() {
                let (a, b) = (self.rects[i], self.rects[j]);
                let same_row = a.y == b.y && a.height == b.height;
                let same_col = a.x == b.x && a.width == b.width;
                if (same_row || same_col) && a.intersects(b) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Cap overflow: trade granularity for a bounded list.
    fn collapse_to_union(&mut self, rect: Rect) {
        let mut union = rect;
        for entry in &self.rects {
            union = union.combine(*entry);
        }
        self.rects.clear();
        self.rects.push(union);
    }
}

impl<'a> IntoIterator for &'a RectList {
    type Item = &'a Rect;
    type IntoIter = core::slice::Iter<'a, Rect>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_damage_appends_disjoint() {
        let mut list = RectList::new();
        assert!(!list.add_damage(Rect::new(0, 0, 10, 10), false));
        assert!(!list.add_damage(Rect::new(50, 50, 10, 10), false));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn add_damage_drops_covered() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(0, 0, 100, 100), false);
        assert!(list.add_damage(Rect::new(10, 10, 5, 5), false));
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 100, 100)]);
    }

    #[test]
    fn add_damage_replaces_contained_entry() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(10, 10, 5, 5), false);
        assert!(list.add_damage(Rect::new(0, 0, 100, 100), false));
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 100, 100)]);
    }

    #[test]
    fn add_damage_combines_overlap() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(0, 0, 50, 50), false);
        assert!(list.add_damage(Rect::new(40, 0, 50, 50), false));
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 90, 50)]);
    }

    #[test]
    fn add_damage_no_combine_appends_overlap() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(0, 0, 50, 50), true);
        assert!(!list.add_damage(Rect::new(40, 0, 50, 50), true));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn add_damage_edge_adjacent_stays_separate() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(10, 10, 20, 20), false);
        list.add_damage(Rect::new(30, 10, 20, 20), false);
        assert_eq!(
            list.as_slice(),
            &[Rect::new(10, 10, 20, 20), Rect::new(30, 10, 20, 20)]
        );
    }

    #[test]
    fn add_damage_first_match_wins() {
        let mut list = RectList::new();
        list.add_damage(Rect::new(0, 0, 10, 10), true);
        list.add_damage(Rect::new(20, 0, 10, 10), true);
        // Overlaps both entries; only the first is combined.
        list.add_damage(Rect::new(5, 0, 20, 10), false);
        assert_eq!(
            list.as_slice(),
            &[Rect::new(0, 0, 25, 10), Rect::new(20, 0, 10, 10)]
        );
    }

    #[test]
    fn add_damage_ignores_degenerate() {
        let mut list = RectList::new();
        assert!(list.add_damage(Rect::EMPTY, false));
        assert!(list.is_empty());
    }

    #[test]
    fn remove_duplicates_keeps_first() {
        let mut list = RectList::new();
        let r = Rect::new(0, 0, 10, 10);
        list.push(r);
        list.push(Rect::new(20, 20, 5, 5));
        list.push(r);
        list.push(r);
        list.remove_duplicates();
        assert_eq!(list.as_slice(), &[r, Rect::new(20, 20, 5, 5)]);
    }

    #[test]
    fn merge_similar_merges_same_row_overlap() {
        let mut list = RectList::new();
        list.push(Rect::new(0, 0, 50, 50));
        list.push(Rect::new(40, 0, 50, 50));
        list.merge_similar();
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 90, 50)]);
    }

    #[test]
    fn merge_similar_leaves_adjacent_alone() {
        let mut list = RectList::new();
        list.push(Rect::new(10, 10, 20, 20));
        list.push(Rect::new(30, 10, 20, 20));
        list.merge_similar();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn merge_similar_runs_to_fixpoint() {
        let mut list = RectList::new();
        // Three overlapping same-row rects; the first merge enables the next.
        list.push(Rect::new(0, 0, 30, 10));
        list.push(Rect::new(50, 0, 30, 10));
        list.push(Rect::new(25, 0, 30, 10));
        list.merge_similar();
        assert_eq!(list.as_slice(), &[Rect::new(0, 0, 80, 10)]);
    }

    #[test]
    fn merge_similar_columns() {
        let mut list = RectList::new();
        list.push(Rect::new(5, 0, 10, 40));
        list.push(Rect::new(5, 30, 10, 40));
        list.merge_similar();
        assert_eq!(list.as_slice(), &[Rect::new(5, 0, 10, 70)]);
    }

    #[test]
    fn remove_overlapping_drops_contained() {
        let mut list = RectList::new();
        list.push(Rect::new(0, 0, 100, 100));
        list.push(Rect::new(10, 10, 5, 5));
        list.push(Rect::new(200, 0, 10, 10));
        list.remove_overlapping();
        assert_eq!(
            list.as_slice(),
            &[Rect::new(0, 0, 100, 100), Rect::new(200, 0, 10, 10)]
        );
    }

    #[test]
    fn remove_overlapping_keeps_partial_overlap() {
        let mut list = RectList::new();
        list.push(Rect::new(0, 0, 50, 50));
        list.push(Rect::new(40, 40, 50, 50));
        list.remove_overlapping();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn take_front_drains_in_order() {
        let mut list = RectList::new();
        list.push(Rect::new(0, 0, 1, 1));
        list.push(Rect::new(1, 0, 1, 1));
        assert_eq!(list.take_front(), Some(Rect::new(0, 0, 1, 1)));
        assert_eq!(list.take_front(), Some(Rect::new(1, 0, 1, 1)));
        assert_eq!(list.take_front(), None);
    }

    #[test]
    fn cap_overflow_collapses_to_union() {
        let mut list = RectList::new();
        let mut x = 0;
        for _ in 0..MAX_DAMAGE_RECTS {
            list.push(Rect::new(x, 0, 5, 5));
            x += 10;
        }
        assert_eq!(list.len(), MAX_DAMAGE_RECTS);
        list.push(Rect::new(0, 100, 5, 5));
        assert_eq!(list.len(), 1);
        let union = list.get(0).unwrap();
        assert!(union.contains_rect(Rect::new(0, 100, 5, 5)));
        assert!(union.contains_rect(Rect::new(630, 0, 5, 5)));
    }
}
