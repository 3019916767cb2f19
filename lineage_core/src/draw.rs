// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The modelled subset of the imperative 2-D drawing API.
//!
//! [`Context2d`] is the interface both the real drawing context (a backend
//! type) and the instrumenting proxy ([`TrackedContext`]) implement. Only
//! operations that affect where content lands on the surface are modelled.
//!
//! [`TrackedContext`]: crate::instrument::TrackedContext

use std::fmt;

use kurbo::{Rect, Size};

use crate::dom::Element;
use crate::surface::Surface;
use crate::transform::SetTransform;

/// Horizontal text alignment (`textAlign`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Align to the start edge of the line (left in LTR).
    #[default]
    Start,
    /// Align to the end edge of the line (right in LTR).
    End,
    /// Left edge at the anchor.
    Left,
    /// Right edge at the anchor.
    Right,
    /// Centered on the anchor.
    Center,
}

impl TextAlign {
    /// Parses a `textAlign` keyword. Unknown keywords yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "start" => Self::Start,
            "end" => Self::End,
            "left" => Self::Left,
            "right" => Self::Right,
            "center" => Self::Center,
            _ => return None,
        })
    }

    /// Returns the CSS keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }

    /// Horizontal offset from the anchor to the left edge of a run of `width`.
    ///
    /// Assumes left-to-right text.
    #[must_use]
    pub fn offset(self, width: f64) -> f64 {
        match self {
            Self::Start | Self::Left => 0.0,
            Self::Center => -width / 2.0,
            Self::End | Self::Right => -width,
        }
    }
}

/// Vertical text baseline (`textBaseline`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    /// Top of the em square.
    Top,
    /// Hanging baseline.
    Hanging,
    /// Middle of the em square.
    Middle,
    /// Alphabetic baseline.
    #[default]
    Alphabetic,
    /// Ideographic baseline.
    Ideographic,
    /// Bottom of the em square.
    Bottom,
}

impl TextBaseline {
    /// Parses a `textBaseline` keyword. Unknown keywords yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "top" => Self::Top,
            "hanging" => Self::Hanging,
            "middle" => Self::Middle,
            "alphabetic" => Self::Alphabetic,
            "ideographic" => Self::Ideographic,
            "bottom" => Self::Bottom,
            _ => return None,
        })
    }

    /// Returns the canvas keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Hanging => "hanging",
            Self::Middle => "middle",
            Self::Alphabetic => "alphabetic",
            Self::Ideographic => "ideographic",
            Self::Bottom => "bottom",
        }
    }
}

/// The text-related drawing state saved alongside the transform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextStyle {
    /// CSS font shorthand.
    pub font: String,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Vertical baseline.
    pub baseline: TextBaseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: String::from("10px sans-serif"),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
        }
    }
}

/// The subset of `measureText` results the ghost layer needs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Advance width.
    pub width: f64,
    /// Distance from the baseline to the top of the drawn glyphs.
    pub ascent: f64,
    /// Distance from the baseline to the bottom of the drawn glyphs.
    pub descent: f64,
}

impl TextMetrics {
    /// Total ink height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// Something `drawImage` can draw.
#[derive(Clone)]
pub enum ImageSource {
    /// Another bitmap surface.
    Surface(Surface),
    /// A DOM image-like element (`<img>`, `<video>`) with its natural size.
    Element {
        /// The element.
        element: Element,
        /// Natural width in pixels.
        width: u32,
        /// Natural height in pixels.
        height: u32,
    },
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(s) => f
                .debug_struct("Surface")
                .field("width", &s.width())
                .field("height", &s.height())
                .finish_non_exhaustive(),
            Self::Element { width, height, .. } => f
                .debug_struct("Element")
                .field("width", width)
                .field("height", height)
                .finish_non_exhaustive(),
        }
    }
}

impl ImageSource {
    /// The image's natural size.
    #[must_use]
    pub fn natural_size(&self) -> Size {
        match self {
            Self::Surface(s) => Size::new(f64::from(s.width()), f64::from(s.height())),
            Self::Element { width, height, .. } => {
                Size::new(f64::from(*width), f64::from(*height))
            }
        }
    }
}

/// The three call shapes of `drawImage`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawImage {
    /// `drawImage(image, dx, dy)`.
    At {
        /// Destination x.
        dx: f64,
        /// Destination y.
        dy: f64,
    },
    /// `drawImage(image, dx, dy, dw, dh)`.
    Scaled {
        /// Destination rectangle.
        dest: Rect,
    },
    /// `drawImage(image, sx, sy, sw, sh, dx, dy, dw, dh)`.
    Cropped {
        /// Source rectangle inside the image.
        src: Rect,
        /// Destination rectangle.
        dest: Rect,
    },
}

impl DrawImage {
    /// Returns the destination rectangle for an image of the given natural size.
    #[must_use]
    pub fn destination(&self, natural: Size) -> Rect {
        match *self {
            Self::At { dx, dy } => Rect::from_origin_size((dx, dy), natural),
            Self::Scaled { dest } | Self::Cropped { dest, .. } => dest,
        }
    }
}

/// The imperative 2-D drawing interface.
pub trait Context2d {
    /// The surface this context draws into.
    fn surface(&self) -> Surface;

    /// Pushes the drawing state.
    fn save(&mut self);
    /// Pops the drawing state. No-op when nothing was saved.
    fn restore(&mut self);

    /// Translates the current transform.
    fn translate(&mut self, dx: f64, dy: f64);
    /// Rotates the current transform by `angle` radians.
    fn rotate(&mut self, angle: f64);
    /// Scales the current transform.
    fn scale(&mut self, sx: f64, sy: f64);
    /// Multiplies the current transform by the given matrix.
    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);
    /// Replaces the current transform.
    fn set_transform(&mut self, transform: SetTransform);

    /// Returns the current text style.
    fn text_style(&self) -> TextStyle;
    /// Sets the CSS font shorthand.
    fn set_font(&mut self, font: &str);
    /// Sets the horizontal text alignment.
    fn set_text_align(&mut self, align: TextAlign);
    /// Sets the vertical text baseline.
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    /// Returns the current global alpha.
    fn global_alpha(&self) -> f64;

    /// Measures `text` with the current font.
    fn measure_text(&self, text: &str) -> TextMetrics;
    /// Fills `text` anchored at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    /// Strokes `text` anchored at `(x, y)`.
    fn stroke_text(&mut self, text: &str, x: f64, y: f64);

    /// Fills a rectangle.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Strokes a rectangle.
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Clears a rectangle to transparent.
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    /// Draws an image.
    fn draw_image(&mut self, image: &ImageSource, args: DrawImage);
}
