// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Right-click inspection and ghost-layer mounting.

use std::rc::Rc;

use kurbo::{Point, Rect};
use lineage_core::Inspector;
use lineage_core::scene::PickEvent;
use lineage_core::surface::Surface;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{HtmlElement, MouseEvent};

use crate::dom::WebNode;

/// Maps a client-space pointer position to normalized device coordinates
/// of `bounds`: `x` and `y` in `[-1, 1]`, `y` pointing up.
#[must_use]
pub fn normalized_pointer(client: Point, bounds: Rect) -> Point {
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Point::ORIGIN;
    }
    Point::new(
        (client.x - bounds.x0) / bounds.width() * 2.0 - 1.0,
        -((client.y - bounds.y0) / bounds.height() * 2.0 - 1.0),
    )
}

type MenuClosure = Closure<dyn FnMut(MouseEvent)>;

/// A `contextmenu` listener that inspects whatever the embedder picks.
///
/// The embedder supplies a pick function mapping normalized pointer
/// coordinates to a [`PickEvent`] (typically a raycast into its scene).
/// When a pick opens a session, the browser menu is suppressed. Dropping
/// the `ContextMenu` removes the listener.
pub struct ContextMenu {
    target: HtmlElement,
    closure: Option<MenuClosure>,
}

impl core::fmt::Debug for ContextMenu {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextMenu")
            .field("attached", &self.closure.is_some())
            .finish_non_exhaustive()
    }
}

impl ContextMenu {
    /// Listens for `contextmenu` on `target`.
    pub fn attach(
        target: HtmlElement,
        inspector: Rc<Inspector>,
        mut pick: impl FnMut(Point) -> Option<PickEvent> + 'static,
    ) -> Self {
        let element = target.clone();
        let closure = Closure::wrap(Box::new(move |event: MouseEvent| {
            let r = element.get_bounding_client_rect();
            let bounds = Rect::new(r.left(), r.top(), r.right(), r.bottom());
            let client = Point::new(f64::from(event.client_x()), f64::from(event.client_y()));
            let Some(picked) = pick(normalized_pointer(client, bounds)) else {
                return;
            };
            if inspector.inspect(&picked).is_some() {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        if let Err(err) = target
            .add_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref())
        {
            log::warn!("could not listen for contextmenu: {err:?}");
            return Self {
                target,
                closure: None,
            };
        }
        Self {
            target,
            closure: Some(closure),
        }
    }

    /// Removes the listener. Idempotent.
    pub fn detach(&mut self) {
        if let Some(closure) = self.closure.take() {
            if let Err(err) = self
                .target
                .remove_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref())
            {
                log::warn!("could not remove contextmenu listener: {err:?}");
            }
        }
    }
}

impl Drop for ContextMenu {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Inline styles placing a ghost container of `surface` device pixels over
/// a canvas laid out at `layout` (CSS pixels, relative to the offset parent).
pub(crate) fn overlay_styles(surface: (u32, u32), layout: Rect) -> Vec<(&'static str, String)> {
    let (w, h) = (f64::from(surface.0), f64::from(surface.1));
    let sx = if w > 0.0 { layout.width() / w } else { 1.0 };
    let sy = if h > 0.0 { layout.height() / h } else { 1.0 };
    vec![
        ("left", format!("{}px", layout.x0)),
        ("top", format!("{}px", layout.y0)),
        ("width", format!("{w}px")),
        ("height", format!("{h}px")),
        ("transform-origin", String::from("0 0")),
        ("transform", format!("scale({sx},{sy})")),
    ]
}

/// Places the ghost container recorded for `surface` over `canvas`.
///
/// The container is inserted right after the canvas in the canvas's parent
/// and scaled from device pixels to the canvas's CSS size. Call again after
/// layout changes. Returns `false` if nothing has been drawn on `surface`
/// through an instrumented context yet.
pub fn mount_ghosts(inspector: &Inspector, surface: &Surface, canvas: &HtmlElement) -> bool {
    let Some(container) = inspector.instrumentation().ghost_container(surface) else {
        return false;
    };
    let Some(ghosts) = WebNode::element_of(&*container) else {
        return false;
    };
    let layout = Rect::from_origin_size(
        (f64::from(canvas.offset_left()), f64::from(canvas.offset_top())),
        (
            f64::from(canvas.offset_width()),
            f64::from(canvas.offset_height()),
        ),
    );
    for (property, value) in overlay_styles((surface.width(), surface.height()), layout) {
        container.set_style(property, &value);
    }
    if let Err(err) = canvas.after_with_node_1(ghosts) {
        log::warn!("could not mount ghost layer: {err:?}");
        return false;
    }
    true
}
