// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, WidgetId};
use super::store::WidgetStore;

/// An iterator over the direct children of a widget, in paint order.
///
/// Created by [`WidgetStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a WidgetStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a WidgetStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(WidgetId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

/// Returns the raw slot index of the next widget in paint order after `idx`,
/// or [`INVALID`] when `idx` is the last widget painted on its layer.
///
/// Paint order is a pre-order walk: first child, else next sibling, else the
/// next sibling of the nearest ancestor that has one. Everything this yields
/// paints after `idx` and can therefore cover it.
pub(crate) fn next_painted_after(store: &WidgetStore, idx: u32) -> u32 {
    if store.first_child[idx as usize] != INVALID {
        return store.first_child[idx as usize];
    }
    let mut at = idx;
    loop {
        if store.next_sibling[at as usize] != INVALID {
            return store.next_sibling[at as usize];
        }
        at = store.parent[at as usize];
        if at == INVALID {
            return INVALID;
        }
    }
}

/// Like [`next_painted_after`] but never descends into `idx`'s children.
///
/// Used to step over the subtree of a hidden widget, whose descendants are
/// not painted either.
pub(crate) fn next_skipping_children(store: &WidgetStore, idx: u32) -> u32 {
    let mut at = idx;
    loop {
        if store.next_sibling[at as usize] != INVALID {
            return store.next_sibling[at as usize];
        }
        at = store.parent[at as usize];
        if at == INVALID {
            return INVALID;
        }
    }
}

/// Returns the handle of the next widget in paint order, if any.
#[must_use]
pub fn next_above(store: &WidgetStore, id: WidgetId) -> Option<WidgetId> {
    if !store.is_alive(id) {
        return None;
    }
    let next = next_painted_after(store, id.index());
    if next == INVALID {
        None
    } else {
        Some(store.id_at(next))
    }
}
