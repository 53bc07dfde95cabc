// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-widget dirty state.
//!
//! Dirtiness is tri-state and ordered: `Clean < Child < Dirty`. `Child`
//! means some descendant needs redraw but this widget itself does not;
//! `Dirty` means the widget's own pixels are stale. Invalidation only ever
//! *raises* the state ([`DirtyState::raise`]); the only transitions downward
//! are the explicit post-paint clears the paint machine performs.
//!
//! Invariant: a widget is `Clean` exactly when neither it nor any descendant
//! needs redraw.

/// How much of a widget's subtree needs repainting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirtyState {
    /// Neither this widget nor any descendant needs redraw.
    #[default]
    Clean,
    /// Some descendant needs redraw; this widget's own pixels are current.
    Child,
    /// This widget's own pixels need redraw.
    Dirty,
}

impl DirtyState {
    /// Returns the higher of `self` and `target`.
    ///
    /// Raising never lowers: `Dirty.raise(Child)` stays `Dirty`.
    #[inline]
    #[must_use]
    pub fn raise(self, target: Self) -> Self {
        if target > self { target } else { self }
    }

    /// Whether any repainting is needed at or below this widget.
    #[inline]
    #[must_use]
    pub const fn needs_work(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_clean_child_dirty() {
        assert!(DirtyState::Clean < DirtyState::Child);
        assert!(DirtyState::Child < DirtyState::Dirty);
    }

    #[test]
    fn raise_never_lowers() {
        assert_eq!(
            DirtyState::Dirty.raise(DirtyState::Child),
            DirtyState::Dirty
        );
        assert_eq!(
            DirtyState::Child.raise(DirtyState::Clean),
            DirtyState::Child
        );
        assert_eq!(
            DirtyState::Clean.raise(DirtyState::Dirty),
            DirtyState::Dirty
        );
    }

    #[test]
    fn needs_work_only_for_clean_is_false() {
        assert!(!DirtyState::Clean.needs_work());
        assert!(DirtyState::Child.needs_work());
        assert!(DirtyState::Dirty.needs_work());
    }
}
