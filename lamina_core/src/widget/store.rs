// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays widget storage with allocation and topology management.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::draw::{DefaultPainter, WidgetBehavior};

use super::Widget;
use super::id::{INVALID, WidgetId};
use super::traverse::Children;

/// Struct-of-arrays storage for all widgets.
///
/// Widgets are addressed by [`WidgetId`] handles. Internally, each widget
/// occupies a slot in parallel arrays. Destroyed widgets are recycled via a
/// free list, and generation counters prevent stale handle access.
///
/// Sibling order is paint order: the first child paints first (bottom), the
/// last child paints last (top).
pub struct WidgetStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Payload --
    pub(crate) widgets: Vec<Widget>,
    pub(crate) behaviors: Vec<Option<Box<dyn WidgetBehavior>>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl fmt::Debug for WidgetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetStore")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetStore {
    /// Creates an empty widget store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            widgets: Vec::new(),
            behaviors: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation API --

    /// Creates a new widget with the given behavior and returns its handle.
    ///
    /// The widget starts detached, with [`Widget::new`] defaults.
    pub fn create_widget(&mut self, behavior: Box<dyn WidgetBehavior>) -> WidgetId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.widgets[idx as usize] = Widget::new();
            self.behaviors[idx as usize] = Some(behavior);
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.widgets.push(Widget::new());
            self.behaviors.push(Some(behavior));
            self.generation.push(0);
            idx
        };

        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Creates a new widget with the [`DefaultPainter`] behavior.
    pub fn create_default_widget(&mut self) -> WidgetId {
        self.create_widget(Box::new(DefaultPainter))
    }

    /// Destroys a widget, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the widget has children (destroy or detach them first, or use
    /// [`destroy_subtree`](Self::destroy_subtree)) or if the handle is stale.
    pub fn destroy_widget(&mut self, id: WidgetId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy widget with children"
        );

        // Remove from parent's child list if attached.
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        // Drop the payload eagerly; a cached background can be large.
        self.widgets[idx as usize] = Widget::new();
        self.behaviors[idx as usize] = None;

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
    }

    /// Destroys a widget and all of its descendants, children first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_subtree(&mut self, id: WidgetId) {
        self.validate(id);
        let mut child = self.first_child[id.idx as usize];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.destroy_subtree(self.id_at(child));
            child = next;
        }
        self.destroy_widget(id);
    }

    /// Returns whether the given handle refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`, on top of its siblings.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: WidgetId, child: WidgetId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `child` from its current parent.
    ///
    /// The widget stays alive and can be re-attached elsewhere.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the widget has no parent.
    pub fn remove_from_parent(&mut self, child: WidgetId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "widget has no parent");
        self.unlink_from_parent(c);
    }

    /// Inserts `child` before `sibling` in the sibling list, so that `child`
    /// paints below `sibling`.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: WidgetId, sibling: WidgetId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;
    }

    /// Returns the parent of a widget, if any.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID { None } else { Some(self.id_at(p)) }
    }

    /// Returns an iterator over the direct children of a widget, in paint
    /// order (bottom to top).
    #[must_use]
    pub fn children(&self, id: WidgetId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    // -- Property access --

    /// Returns the property record of a widget.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn widget(&self, id: WidgetId) -> &Widget {
        self.validate(id);
        &self.widgets[id.idx as usize]
    }

    /// Returns the mutable property record of a widget.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn widget_mut(&mut self, id: WidgetId) -> &mut Widget {
        self.validate(id);
        &mut self.widgets[id.idx as usize]
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found during tree walks) rather than
    // `WidgetId` handles, skipping generation validation. Only use with
    // indices that came from the topology columns of a live widget.

    /// Returns the property record at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn widget_at(&self, idx: u32) -> &Widget {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.widgets[idx as usize]
    }

    /// Returns the mutable property record at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn widget_at_mut(&mut self, idx: u32) -> &mut Widget {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &mut self.widgets[idx as usize]
    }

    /// Returns the handle for raw slot `idx` at its current generation.
    pub(crate) fn id_at(&self, idx: u32) -> WidgetId {
        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Takes the behavior out of a slot for a hook call.
    ///
    /// Must be paired with [`put_behavior`](Self::put_behavior); while taken,
    /// the slot reports no behavior and paint skips it.
    pub(crate) fn take_behavior(&mut self, idx: u32) -> Option<Box<dyn WidgetBehavior>> {
        self.behaviors[idx as usize].take()
    }

    /// Returns a behavior taken with [`take_behavior`](Self::take_behavior).
    pub(crate) fn put_behavior(&mut self, idx: u32, behavior: Box<dyn WidgetBehavior>) {
        self.behaviors[idx as usize] = Some(behavior);
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: WidgetId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale WidgetId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
