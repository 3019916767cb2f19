// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bitmap surfaces.

use std::any::Any;
use std::rc::Rc;

use kurbo::Rect;

use crate::error::CaptureError;

/// A shared handle to a bitmap surface. Identity is `Rc` address identity.
pub type Surface = Rc<dyn Raster>;

/// An addressable, mutable 2-D raster target.
pub trait Raster {
    /// Returns `self` as [`Any`] so backends can recover their concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Width in device pixels.
    fn width(&self) -> u32;

    /// Height in device pixels.
    fn height(&self) -> u32;

    /// Copies the current pixels into an image that can be displayed in the DOM.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Tainted`] when the surface cannot be read back.
    fn snapshot(&self) -> Result<Snapshot, CaptureError>;
}

/// Returns the surface bounds in its own pixel space.
#[must_use]
pub fn bounds(surface: &dyn Raster) -> Rect {
    Rect::new(0.0, 0.0, f64::from(surface.width()), f64::from(surface.height()))
}

/// A frozen copy of a surface's pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// A URL the DOM can load the pixels from (typically a `data:` URL).
    pub url: String,
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
}

impl Snapshot {
    /// Formats the snapshot as a CSS `background-image` value.
    #[must_use]
    pub fn css_background(&self) -> String {
        format!("url(\"{}\")", self.url)
    }
}
