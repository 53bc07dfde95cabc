// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benign failure conditions.
//!
//! The engine splits failures into two families. Programmer errors (stale
//! handles, destroying a widget that still has children, out-of-range raw
//! indices) panic with a specific message. Everything else is a benign
//! [`Rejection`]: local, non-fatal, and expected to be checked and skipped
//! by the caller rather than propagated upward. Redundant state transitions
//! fall in the second family on purpose — asking twice for the same flag is
//! not worth surfacing to a user.

use thiserror::Error;

/// A benign, non-fatal refusal. Check and skip; never a crash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The layer is mid-deletion; damage and mutation are ignored.
    #[error("layer is being deleted")]
    LayerDeleting,

    /// No layer occupies the given slot.
    #[error("no layer in slot {0}")]
    LayerIndex(usize),

    /// No screen at the given index.
    #[error("no screen at index {0}")]
    ScreenIndex(usize),

    /// The layer's swap chain has no buffer at the given index.
    #[error("no buffer at index {0}")]
    BufferIndex(usize),

    /// The operation cannot run while a frame is being painted.
    #[error("paint in progress")]
    PaintInProgress,

    /// No screen is currently shown.
    #[error("no screen is active")]
    NoActiveScreen,

    /// The requested state is already in effect.
    #[error("value already set")]
    Unchanged,

    /// The widget's behavior does not accept edit focus.
    #[error("widget is not editable")]
    NotEditable,

    /// Disabled widgets refuse focus.
    #[error("widget is disabled")]
    Disabled,

    /// Layers repaint from damage; they cannot cache their background.
    #[error("layer roots cannot use a background cache")]
    LayerCache,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn display_messages() {
        assert_eq!(
            format!("{}", Rejection::LayerDeleting),
            "layer is being deleted"
        );
        assert_eq!(format!("{}", Rejection::LayerIndex(3)), "no layer in slot 3");
        assert_eq!(format!("{}", Rejection::Unchanged), "value already set");
    }
}
