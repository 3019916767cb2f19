// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for lineage.
//!
//! This crate implements the `lineage_core` host traits over browser APIs:
//!
//! - [`WebNode`] / [`WebDocument`]: DOM elements, with `MutationObserver`
//!   watches
//! - [`WebCanvas`]: `<canvas>` surfaces, snapshotted through `toDataURL`
//! - [`WebContext2d`]: the 2-D drawing context
//! - [`PromiseCapture`]: a capture service over a JavaScript snapshot
//!   function returning a `Promise`
//! - [`ContextMenu`] and [`mount_ghosts`]: the right-click inspection
//!   affordance and ghost-layer placement
//!
//! The scene graph stays with the embedder, which implements
//! [`Mesh`](lineage_core::scene::Mesh) and
//! [`Material`](lineage_core::scene::Material) for its own types.

mod canvas;
mod capture;
mod dom;
mod menu;

pub use canvas::{WebCanvas, WebContext2d};
pub use capture::PromiseCapture;
pub use dom::{WebDocument, WebNode};
pub use menu::{ContextMenu, mount_ghosts, normalized_pointer};

use std::rc::Rc;

use lineage_core::{Host, Inspector, InspectorConfig};

/// Initializes the per-thread [`Inspector`] for the current page.
///
/// The overlay is a fixed, full-viewport `<div>` appended to `<body>`;
/// inspected sources are moved into it while a session is open. Returns
/// `None` outside a browser window or when the overlay cannot be created.
/// Later calls return the existing inspector.
#[must_use]
pub fn init(config: InspectorConfig, snapshot: js_sys::Function) -> Option<Rc<Inspector>> {
    if let Some(existing) = Inspector::global() {
        return Some(existing);
    }
    let document = WebDocument::from_window()?;
    let body = document.body()?;
    let overlay = lineage_core::dom::Document::create_element(&document, "div")?;
    overlay.set_attribute("data-lineage-overlay", "");
    for (property, value) in OVERLAY_STYLES {
        overlay.set_style(property, value);
    }
    body.append_child(&overlay);
    Some(Inspector::init(
        config,
        Host {
            document: Rc::new(document),
            capture: Rc::new(PromiseCapture::new(snapshot)),
            overlay,
        },
    ))
}

/// Fixed, top-most, scrollable; empty until a session opens.
const OVERLAY_STYLES: [(&str, &str); 6] = [
    ("position", "fixed"),
    ("right", "16px"),
    ("top", "16px"),
    ("z-index", "2147483647"),
    ("overflow", "auto"),
    ("max-height", "calc(100vh - 32px)"),
];
