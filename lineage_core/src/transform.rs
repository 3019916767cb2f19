// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2-D affine helpers for the drawing-API mirror.
//!
//! Transforms are [`kurbo::Affine`] values whose coefficients
//! `[a, b, c, d, e, f]` are laid out exactly like the 2-D canvas matrix:
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```
//!
//! so a canvas `transform(a, b, c, d, e, f)` call composes as
//! `current * Affine::new([a, b, c, d, e, f])`.

use kurbo::Affine;

/// A matrix-like argument to `setTransform`, as passed by script.
///
/// Missing components take their identity value, mirroring `DOMMatrix2DInit`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MatrixInit {
    /// Horizontal scaling.
    pub a: Option<f64>,
    /// Vertical skewing.
    pub b: Option<f64>,
    /// Horizontal skewing.
    pub c: Option<f64>,
    /// Vertical scaling.
    pub d: Option<f64>,
    /// Horizontal translation.
    pub e: Option<f64>,
    /// Vertical translation.
    pub f: Option<f64>,
}

impl MatrixInit {
    /// Builds a fully specified matrix-like value.
    #[must_use]
    pub const fn from_coeffs(c: [f64; 6]) -> Self {
        Self {
            a: Some(c[0]),
            b: Some(c[1]),
            c: Some(c[2]),
            d: Some(c[3]),
            e: Some(c[4]),
            f: Some(c[5]),
        }
    }

    /// Converts to an affine, or `None` if any supplied component is not finite.
    #[must_use]
    pub fn to_affine(&self) -> Option<Affine> {
        let coeffs = [
            self.a.unwrap_or(1.0),
            self.b.unwrap_or(0.0),
            self.c.unwrap_or(0.0),
            self.d.unwrap_or(1.0),
            self.e.unwrap_or(0.0),
            self.f.unwrap_or(0.0),
        ];
        coeffs
            .iter()
            .all(|v| v.is_finite())
            .then(|| Affine::new(coeffs))
    }
}

/// The three call shapes of `setTransform`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SetTransform {
    /// `setTransform()` with no arguments: reset to identity.
    Reset,
    /// `setTransform(matrix)`: adopt a matrix-like value.
    Matrix(MatrixInit),
    /// `setTransform(a, b, c, d, e, f)`.
    Components([f64; 6]),
}

impl SetTransform {
    /// Resolves the replacement matrix.
    ///
    /// A malformed matrix-like value falls back to identity. Non-finite
    /// component arguments are ignored like the canvas ignores them, keeping
    /// `current`.
    #[must_use]
    pub fn resolve(&self, current: Affine) -> Affine {
        match self {
            Self::Reset => Affine::IDENTITY,
            Self::Matrix(init) => init.to_affine().unwrap_or(Affine::IDENTITY),
            Self::Components(c) => {
                if c.iter().all(|v| v.is_finite()) {
                    Affine::new(*c)
                } else {
                    current
                }
            }
        }
    }
}

/// Returns the 2×2 linear part of `xf` with translation removed.
#[inline]
#[must_use]
pub fn linear_part(xf: Affine) -> Affine {
    let [a, b, c, d, _, _] = xf.as_coeffs();
    Affine::new([a, b, c, d, 0.0, 0.0])
}

/// Formats the linear part of `xf` as a CSS `matrix()` value.
///
/// Translation is carried by `left`/`top`, so the last two terms are always
/// zero and `transform-origin: 0 0` keeps the element anchored at its
/// projected origin.
#[must_use]
pub fn css_matrix(xf: Affine) -> String {
    let [a, b, c, d, _, _] = xf.as_coeffs();
    format!("matrix({a}, {b}, {c}, {d}, 0, 0)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    const EPS: f64 = 1e-9;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    #[test]
    fn canvas_translate_composes_on_the_right() {
        let scaled = Affine::scale(2.0);
        let m = scaled * Affine::translate((10.0, 0.0));
        // Canvas semantics: translation is in the scaled space.
        assert!(approx(m * Point::ORIGIN, Point::new(20.0, 0.0)));
    }

    #[test]
    fn matrix_init_defaults_missing_components() {
        let init = MatrixInit {
            e: Some(5.0),
            ..MatrixInit::default()
        };
        assert_eq!(
            init.to_affine(),
            Some(Affine::new([1.0, 0.0, 0.0, 1.0, 5.0, 0.0]))
        );
    }

    #[test]
    fn malformed_matrix_falls_back_to_identity() {
        let init = MatrixInit {
            a: Some(f64::NAN),
            ..MatrixInit::default()
        };
        let current = Affine::translate((3.0, 4.0));
        assert_eq!(
            SetTransform::Matrix(init).resolve(current),
            Affine::IDENTITY
        );
    }

    #[test]
    fn reset_is_identity() {
        assert_eq!(
            SetTransform::Reset.resolve(Affine::scale(9.0)),
            Affine::IDENTITY
        );
    }

    #[test]
    fn components_build_directly() {
        let set = SetTransform::Components([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            set.resolve(Affine::IDENTITY).as_coeffs(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn non_finite_components_keep_current() {
        let current = Affine::translate((1.0, 1.0));
        let set = SetTransform::Components([1.0, 0.0, 0.0, f64::INFINITY, 0.0, 0.0]);
        assert_eq!(set.resolve(current), current);
    }

    #[test]
    fn css_matrix_drops_translation() {
        let xf = Affine::new([2.0, 0.0, 0.0, 3.0, 40.0, 50.0]);
        assert_eq!(css_matrix(xf), "matrix(2, 0, 0, 3, 0, 0)");
        assert_eq!(linear_part(xf).translation(), kurbo::Vec2::ZERO);
    }
}
