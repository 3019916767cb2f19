// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas surfaces and the 2-D drawing context.
//!
//! [`WebCanvas`] is a [`Raster`] over an `HtmlCanvasElement`; snapshots are
//! PNG data URLs. [`WebContext2d`] forwards the [`Context2d`] subset to a
//! `CanvasRenderingContext2d`. Wrap it with
//! [`Inspector::instrument`](lineage_core::Inspector::instrument) to record
//! ghosts.

use std::any::Any;
use std::rc::Rc;

use lineage_core::CaptureError;
use lineage_core::draw::{
    Context2d, DrawImage, ImageSource, TextAlign, TextBaseline, TextMetrics, TextStyle,
};
use lineage_core::surface::{Raster, Snapshot, Surface};
use lineage_core::transform::SetTransform;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, HtmlVideoElement,
};

use crate::dom::WebNode;

/// A [`Raster`] backed by an `HtmlCanvasElement`.
pub struct WebCanvas {
    canvas: HtmlCanvasElement,
}

impl core::fmt::Debug for WebCanvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebCanvas")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .finish()
    }
}

impl WebCanvas {
    /// Wraps `canvas`.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Rc<Self> {
        Rc::new(Self { canvas })
    }

    /// The underlying canvas element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Recovers the canvas behind a core surface, if it is a [`WebCanvas`].
    #[must_use]
    pub fn canvas_of(surface: &dyn Raster) -> Option<&HtmlCanvasElement> {
        surface.as_any().downcast_ref::<Self>().map(Self::canvas)
    }

    /// Opens a 2-D context drawing into this surface.
    ///
    /// Returns `None` when the canvas already has a different context type.
    #[must_use]
    pub fn context(self: &Rc<Self>) -> Option<WebContext2d> {
        let ctx = self
            .canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(WebContext2d {
            ctx,
            surface: Rc::clone(self) as Surface,
        })
    }
}

impl Raster for WebCanvas {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        // `toDataURL` throws a SecurityError on tainted canvases.
        let url = self.canvas.to_data_url().map_err(|err| {
            log::debug!("toDataURL failed: {err:?}");
            CaptureError::Tainted
        })?;
        Ok(Snapshot {
            url,
            width: self.width(),
            height: self.height(),
        })
    }
}

/// A [`Context2d`] forwarding to a `CanvasRenderingContext2d`.
pub struct WebContext2d {
    ctx: CanvasRenderingContext2d,
    surface: Surface,
}

impl core::fmt::Debug for WebContext2d {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebContext2d")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .finish_non_exhaustive()
    }
}

impl WebContext2d {
    /// The underlying rendering context.
    #[must_use]
    pub fn raw(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }
}

enum Drawable<'a> {
    Image(&'a HtmlImageElement),
    Video(&'a HtmlVideoElement),
    Canvas(&'a HtmlCanvasElement),
}

impl<'a> Drawable<'a> {
    fn from_source(image: &'a ImageSource) -> Option<Self> {
        match image {
            ImageSource::Surface(surface) => WebCanvas::canvas_of(&**surface).map(Self::Canvas),
            ImageSource::Element { element, .. } => {
                let element = WebNode::element_of(&**element)?;
                if let Some(img) = element.dyn_ref::<HtmlImageElement>() {
                    Some(Self::Image(img))
                } else if let Some(video) = element.dyn_ref::<HtmlVideoElement>() {
                    Some(Self::Video(video))
                } else {
                    element.dyn_ref::<HtmlCanvasElement>().map(Self::Canvas)
                }
            }
        }
    }

    fn draw(&self, ctx: &CanvasRenderingContext2d, args: DrawImage) -> Result<(), JsValue> {
        match (self, args) {
            (Self::Image(i), DrawImage::At { dx, dy }) => {
                ctx.draw_image_with_html_image_element(i, dx, dy)
            }
            (Self::Image(i), DrawImage::Scaled { dest: d }) => ctx
                .draw_image_with_html_image_element_and_dw_and_dh(
                    i,
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
            (Self::Image(i), DrawImage::Cropped { src: s, dest: d }) => ctx
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    i,
                    s.x0,
                    s.y0,
                    s.width(),
                    s.height(),
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
            (Self::Video(v), DrawImage::At { dx, dy }) => {
                ctx.draw_image_with_html_video_element(v, dx, dy)
            }
            (Self::Video(v), DrawImage::Scaled { dest: d }) => ctx
                .draw_image_with_html_video_element_and_dw_and_dh(
                    v,
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
            (Self::Video(v), DrawImage::Cropped { src: s, dest: d }) => ctx
                .draw_image_with_html_video_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    v,
                    s.x0,
                    s.y0,
                    s.width(),
                    s.height(),
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
            (Self::Canvas(c), DrawImage::At { dx, dy }) => {
                ctx.draw_image_with_html_canvas_element(c, dx, dy)
            }
            (Self::Canvas(c), DrawImage::Scaled { dest: d }) => ctx
                .draw_image_with_html_canvas_element_and_dw_and_dh(
                    c,
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
            (Self::Canvas(c), DrawImage::Cropped { src: s, dest: d }) => ctx
                .draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    c,
                    s.x0,
                    s.y0,
                    s.width(),
                    s.height(),
                    d.x0,
                    d.y0,
                    d.width(),
                    d.height(),
                ),
        }
    }
}

impl Context2d for WebContext2d {
    fn surface(&self) -> Surface {
        Rc::clone(&self.surface)
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let _ = self.ctx.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        let _ = self.ctx.rotate(angle);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        let _ = self.ctx.scale(sx, sy);
    }

    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let _ = self.ctx.transform(a, b, c, d, e, f);
    }

    fn set_transform(&mut self, transform: SetTransform) {
        let [a, b, c, d, e, f] = match transform {
            SetTransform::Reset => {
                let _ = self.ctx.reset_transform();
                return;
            }
            // The canvas itself ignores non-finite components.
            SetTransform::Components(c) => c,
            SetTransform::Matrix(_) => transform.resolve(kurbo::Affine::IDENTITY).as_coeffs(),
        };
        let _ = self.ctx.set_transform(a, b, c, d, e, f);
    }

    fn text_style(&self) -> TextStyle {
        TextStyle {
            font: self.ctx.font(),
            align: TextAlign::parse(&self.ctx.text_align()).unwrap_or_default(),
            baseline: TextBaseline::parse(&self.ctx.text_baseline()).unwrap_or_default(),
        }
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ctx.set_text_align(align.as_str());
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ctx.set_text_baseline(baseline.as_str());
    }

    fn global_alpha(&self) -> f64 {
        self.ctx.global_alpha()
    }

    fn measure_text(&self, text: &str) -> TextMetrics {
        match self.ctx.measure_text(text) {
            Ok(m) => TextMetrics {
                width: m.width(),
                ascent: m.actual_bounding_box_ascent(),
                descent: m.actual_bounding_box_descent(),
            },
            Err(err) => {
                log::debug!("measureText failed: {err:?}");
                TextMetrics::default()
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let _ = self.ctx.fill_text(text, x, y);
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64) {
        let _ = self.ctx.stroke_text(text, x, y);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.stroke_rect(x, y, w, h);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.clear_rect(x, y, w, h);
    }

    fn draw_image(&mut self, image: &ImageSource, args: DrawImage) {
        let Some(drawable) = Drawable::from_source(image) else {
            log::warn!("drawImage: unsupported image source {image:?}");
            return;
        };
        if let Err(err) = drawable.draw(&self.ctx, args) {
            log::warn!("drawImage failed: {err:?}");
        }
    }
}
