// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Nothing in this crate surfaces an error to the embedding application.
//! [`CaptureError`] exists so that capture continuations and surface
//! snapshots can report *why* they produced nothing; every consumer logs it
//! and keeps its previous state.

/// Why a bitmap capture or surface snapshot produced no pixels.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The surface holds cross-origin content and cannot be read back.
    #[error("surface is tainted by cross-origin content")]
    Tainted,
    /// The element is not in a state the capture collaborator can render.
    #[error("element is detached and cannot be captured")]
    Detached,
    /// The requested or produced bitmap has no area.
    #[error("capture has zero area ({width}x{height})")]
    ZeroSize {
        /// Width in device pixels.
        width: u32,
        /// Height in device pixels.
        height: u32,
    },
    /// The capture collaborator rejected the request.
    #[error("capture rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_message_names_dimensions() {
        let err = CaptureError::ZeroSize {
            width: 0,
            height: 12,
        };
        assert_eq!(err.to_string(), "capture has zero area (0x12)");
    }
}
