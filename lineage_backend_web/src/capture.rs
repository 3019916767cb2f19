// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Promise-based capture adapter.
//!
//! [`PromiseCapture`] adapts a JavaScript snapshot function of the shape
//! `(element, options) => Promise<HTMLCanvasElement>` to the
//! [`CaptureService`] contract. The options object carries `width`,
//! `height`, `scale` and `backgroundColor` when set.

use js_sys::{Function, Object, Promise, Reflect};
use lineage_core::CaptureError;
use lineage_core::capture::{CaptureCallback, CaptureOptions, CaptureService};
use lineage_core::dom::Element;
use lineage_core::surface::Surface;
use wasm_bindgen::{JsCast as _, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use crate::canvas::WebCanvas;
use crate::dom::WebNode;

/// A [`CaptureService`] calling a JavaScript snapshot function.
#[derive(Clone, Debug)]
pub struct PromiseCapture {
    snapshot: Function,
}

impl PromiseCapture {
    /// Wraps `snapshot`.
    #[must_use]
    pub fn new(snapshot: Function) -> Self {
        Self { snapshot }
    }
}

/// One entry of the options object passed to the snapshot function.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OptionValue {
    Number(f64),
    Text(String),
}

/// The options object's entries, in a fixed order. Unset options are omitted.
pub(crate) fn option_fields(options: &CaptureOptions) -> Vec<(&'static str, OptionValue)> {
    let mut fields = Vec::new();
    if let Some(w) = options.width {
        fields.push(("width", OptionValue::Number(f64::from(w))));
    }
    if let Some(h) = options.height {
        fields.push(("height", OptionValue::Number(f64::from(h))));
    }
    if let Some(s) = options.scale {
        fields.push(("scale", OptionValue::Number(s)));
    }
    if let Some(color) = &options.background_color {
        fields.push(("backgroundColor", OptionValue::Text(color.clone())));
    }
    fields
}

fn options_object(options: &CaptureOptions) -> Object {
    let object = Object::new();
    for (key, value) in option_fields(options) {
        let value = match value {
            OptionValue::Number(n) => JsValue::from_f64(n),
            OptionValue::Text(s) => JsValue::from_str(&s),
        };
        if let Err(err) = Reflect::set(&object, &JsValue::from_str(key), &value) {
            log::warn!("could not set capture option {key}: {err:?}");
        }
    }
    object
}

fn describe(err: &JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    format!("{err:?}")
}

fn settle(result: Result<JsValue, JsValue>) -> Result<Surface, CaptureError> {
    let value = result.map_err(|err| CaptureError::Rejected(describe(&err)))?;
    let canvas = value
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| CaptureError::Rejected(String::from("snapshot did not produce a canvas")))?;
    Ok(WebCanvas::new(canvas))
}

impl CaptureService for PromiseCapture {
    fn capture(&self, element: &Element, options: &CaptureOptions, done: CaptureCallback) {
        let Some(target) = WebNode::element_of(&**element) else {
            done(Err(CaptureError::Rejected(String::from("not a web element"))));
            return;
        };
        let options = options_object(options);
        let returned = match self.snapshot.call2(&JsValue::NULL, target, &options) {
            Ok(value) => value,
            Err(err) => {
                done(Err(CaptureError::Rejected(describe(&err))));
                return;
            }
        };
        // Plain values are accepted as already-resolved promises.
        let promise = Promise::resolve(&returned);
        wasm_bindgen_futures::spawn_local(async move {
            done(settle(JsFuture::from(promise).await));
        });
    }
}
