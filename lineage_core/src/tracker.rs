// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface transform tracking.
//!
//! A [`TransformTracker`] mirrors the cumulative effect of the
//! save/restore/translate/rotate/scale/transform/setTransform calls issued
//! against one surface, so positions passed to later drawing calls can be
//! projected into surface pixel space.

use kurbo::{Affine, Point};

use crate::draw::TextStyle;
use crate::transform::SetTransform;

/// One entry on the save stack.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformState {
    /// The transform at the time of `save`.
    pub matrix: Affine,
    /// The text style at the time of `save`.
    pub text: TextStyle,
}

/// Current transform plus save stack for one surface.
///
/// Starts at identity with an empty stack.
#[derive(Clone, Debug, Default)]
pub struct TransformTracker {
    current: Affine,
    stack: Vec<TransformState>,
}

impl TransformTracker {
    /// Creates a tracker at identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current transform.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Affine {
        self.current
    }

    /// Number of saved states.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes the current transform and `text` style.
    pub fn save(&mut self, text: TextStyle) {
        self.stack.push(TransformState {
            matrix: self.current,
            text,
        });
    }

    /// Pops the most recent saved state and adopts its transform.
    ///
    /// Returns `None` and leaves the transform untouched if the stack is empty.
    pub fn restore(&mut self) -> Option<TransformState> {
        let state = self.stack.pop()?;
        self.current = state.matrix;
        Some(state)
    }

    /// `translate(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.current = self.current * Affine::translate((dx, dy));
    }

    /// `rotate(angle)`, in radians.
    pub fn rotate(&mut self, angle: f64) {
        self.current = self.current * Affine::rotate(angle);
    }

    /// `scale(sx, sy)`.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.current = self.current * Affine::scale_non_uniform(sx, sy);
    }

    /// `transform(a, b, c, d, e, f)`.
    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let m = [a, b, c, d, e, f];
        if m.iter().all(|v| v.is_finite()) {
            self.current = self.current * Affine::new(m);
        }
    }

    /// `setTransform(...)` in any of its call shapes.
    pub fn set_transform(&mut self, set: SetTransform) {
        self.current = set.resolve(self.current);
    }

    /// Projects a point in drawing space into surface pixel space.
    #[inline]
    #[must_use]
    pub fn project(&self, p: Point) -> Point {
        self.current * p
    }
}
