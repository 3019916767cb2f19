// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capture collaborator contract and the provenance-recording wrapper.
//!
//! The off-screen DOM snapshot service is asynchronous. Its Rust face is
//! continuation-passing: [`CaptureService::capture`] returns immediately and
//! calls `done` exactly once, possibly much later and possibly after other
//! captures issued after it.
//!
//! [`InstrumentedCapture`] is a drop-in [`CaptureService`] that registers
//! every successful capture in the [`ProvenanceRegistry`] before handing the
//! bitmap on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dom::Element;
use crate::error::CaptureError;
use crate::provenance::{ProvenanceRecord, ProvenanceRegistry};
use crate::surface::Surface;

/// Parameters for one capture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureOptions {
    /// Width in CSS pixels; the element's own width when `None`.
    pub width: Option<u32>,
    /// Height in CSS pixels; the element's own height when `None`.
    pub height: Option<u32>,
    /// Device-pixel scale; `1.0` when `None`.
    pub scale: Option<f64>,
    /// CSS background color painted under the content.
    pub background_color: Option<String>,
}

impl CaptureOptions {
    /// Options with an explicit size and scale.
    #[must_use]
    pub fn sized(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            scale: Some(scale),
            background_color: None,
        }
    }
}

/// Continuation receiving a capture result.
pub type CaptureCallback = Box<dyn FnOnce(Result<Surface, CaptureError>)>;

/// Rasterizes a DOM element into a bitmap.
pub trait CaptureService {
    /// Starts a capture of `element`. `done` is called exactly once.
    fn capture(&self, element: &Element, options: &CaptureOptions, done: CaptureCallback);
}

/// A [`CaptureService`] that records provenance for every capture.
pub struct InstrumentedCapture {
    inner: Rc<dyn CaptureService>,
    registry: Rc<RefCell<ProvenanceRegistry>>,
}

impl fmt::Debug for InstrumentedCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedCapture")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl InstrumentedCapture {
    /// Wraps `inner`, recording into `registry`.
    #[must_use]
    pub fn new(inner: Rc<dyn CaptureService>, registry: Rc<RefCell<ProvenanceRegistry>>) -> Self {
        Self { inner, registry }
    }
}

impl CaptureService for InstrumentedCapture {
    fn capture(&self, element: &Element, options: &CaptureOptions, done: CaptureCallback) {
        if options.width == Some(0) || options.height == Some(0) {
            let err = CaptureError::ZeroSize {
                width: options.width.unwrap_or(0),
                height: options.height.unwrap_or(0),
            };
            log::warn!("capture skipped: {err}");
            done(Err(err));
            return;
        }

        let registry = Rc::clone(&self.registry);
        let source = Rc::clone(element);
        let requested = options.clone();
        self.inner.capture(
            element,
            options,
            Box::new(move |result| {
                let result = result.and_then(|bitmap| {
                    let scale = requested.scale.unwrap_or(1.0);
                    let width = requested.width.unwrap_or_else(|| logical(bitmap.width(), scale));
                    let height = requested
                        .height
                        .unwrap_or_else(|| logical(bitmap.height(), scale));
                    if bitmap.width() == 0 || bitmap.height() == 0 {
                        return Err(CaptureError::ZeroSize {
                            width: bitmap.width(),
                            height: bitmap.height(),
                        });
                    }
                    registry
                        .borrow_mut()
                        .register(&bitmap, ProvenanceRecord::new(source, width, height, scale));
                    Ok(bitmap)
                });
                if let Err(err) = &result {
                    log::warn!("capture failed: {err}");
                }
                done(result);
            }),
        );
    }
}

/// Converts a device-pixel extent back to CSS pixels.
fn logical(device: u32, scale: f64) -> u32 {
    if scale > 0.0 && scale.is_finite() {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "rounded, non-negative pixel extent"
        )]
        let v = (f64::from(device) / scale).round() as u32;
        v
    } else {
        device
    }
}
