// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM nodes and mutation watches over `web-sys`.
//!
//! Wrapping the same DOM element twice yields two handles with distinct
//! identities. Keep the handle that was registered or captured; handles
//! returned by [`Node::parent`] and [`Node::next_sibling`] are only good for
//! structural operations.

use std::any::Any;
use std::rc::Rc;

use lineage_core::dom::{Document, Element, MutationWatch, Node};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{CssStyleDeclaration, HtmlElement, MutationObserver, MutationObserverInit};

/// A [`Node`] backed by a `web_sys::Element`.
pub struct WebNode {
    element: web_sys::Element,
}

impl core::fmt::Debug for WebNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebNode")
            .field("tag", &self.element.tag_name())
            .finish()
    }
}

impl WebNode {
    /// Wraps `element` in a new handle.
    #[must_use]
    pub fn new(element: web_sys::Element) -> Rc<Self> {
        Rc::new(Self { element })
    }

    /// Wraps `element` as a core [`Element`].
    #[must_use]
    pub fn element_handle(element: web_sys::Element) -> Element {
        Self::new(element)
    }

    /// The underlying DOM element.
    #[must_use]
    pub fn element(&self) -> &web_sys::Element {
        &self.element
    }

    /// Recovers the DOM element behind a core handle, if it is a [`WebNode`].
    #[must_use]
    pub fn element_of(node: &dyn Node) -> Option<&web_sys::Element> {
        node.as_any().downcast_ref::<Self>().map(Self::element)
    }

    fn style_declaration(&self) -> Option<CssStyleDeclaration> {
        self.element.dyn_ref::<HtmlElement>().map(HtmlElement::style)
    }
}

impl Node for WebNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Node) -> bool {
        Self::element_of(other).is_some_and(|other| self.element.is_same_node(Some(&**other)))
    }

    fn parent(&self) -> Option<Element> {
        self.element.parent_element().map(Self::element_handle)
    }

    fn next_sibling(&self) -> Option<Element> {
        self.element.next_element_sibling().map(Self::element_handle)
    }

    fn is_connected(&self) -> bool {
        self.element.is_connected()
    }

    fn append_child(&self, child: &Element) {
        let Some(child) = Self::element_of(&**child) else {
            log::warn!("append_child: not a web element");
            return;
        };
        if let Err(err) = self.element.append_child(child) {
            log::warn!("appendChild failed: {err:?}");
        }
    }

    fn insert_before(&self, child: &Element, reference: &Element) {
        let (Some(child), Some(reference)) =
            (Self::element_of(&**child), Self::element_of(&**reference))
        else {
            log::warn!("insert_before: not a web element");
            return;
        };
        if let Err(err) = self.element.insert_before(child, Some(reference)) {
            log::warn!("insertBefore failed: {err:?}");
        }
    }

    fn remove(&self) {
        self.element.remove();
    }

    fn remove_children(&self) {
        self.element.set_text_content(None);
    }

    fn child_count(&self) -> usize {
        usize::try_from(self.element.child_element_count()).unwrap_or(usize::MAX)
    }

    fn style(&self, property: &str) -> Option<String> {
        self.style_declaration()?
            .get_property_value(property)
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn set_style(&self, property: &str, value: &str) {
        if let Some(s) = self.style_declaration() {
            if let Err(err) = s.set_property(property, value) {
                log::debug!("style {property} rejected: {err:?}");
            }
        }
    }

    fn remove_style(&self, property: &str) {
        if let Some(s) = self.style_declaration() {
            if let Err(err) = s.remove_property(property) {
                log::debug!("style {property} not removed: {err:?}");
            }
        }
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(err) = self.element.set_attribute(name, value) {
            log::warn!("setAttribute({name}) failed: {err:?}");
        }
    }

    fn set_text(&self, text: &str) {
        self.element.set_text_content(Some(text));
    }

    fn observe(&self, on_mutation: Box<dyn FnMut()>) -> Box<dyn MutationWatch> {
        let closure = Closure::wrap(on_mutation);
        let observer = match MutationObserver::new(closure.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                log::warn!("MutationObserver unavailable: {err:?}");
                return Box::new(WebWatch::default());
            }
        };
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_attributes(true);
        init.set_character_data(true);
        if let Err(err) = observer.observe_with_options(&self.element, &init) {
            log::warn!("MutationObserver.observe failed: {err:?}");
            return Box::new(WebWatch::default());
        }
        Box::new(WebWatch {
            observer: Some(observer),
            closure: Some(closure),
        })
    }
}

/// A `MutationObserver` registration. Disconnects on drop.
#[derive(Default)]
struct WebWatch {
    observer: Option<MutationObserver>,
    /// Kept alive for as long as the observer may call it.
    closure: Option<Closure<dyn FnMut()>>,
}

impl MutationWatch for WebWatch {
    fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.closure.take();
    }
}

impl Drop for WebWatch {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// A [`Document`] backed by `web_sys::Document`.
#[derive(Clone, Debug)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    /// Wraps `document`.
    #[must_use]
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The current window's document, if there is one.
    #[must_use]
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }

    /// The document's `<body>` as a core [`Element`].
    #[must_use]
    pub fn body(&self) -> Option<Element> {
        self.document
            .body()
            .map(|body| WebNode::element_handle(body.unchecked_into()))
    }
}

impl Document for WebDocument {
    fn create_element(&self, tag: &str) -> Option<Element> {
        match self.document.create_element(tag) {
            Ok(element) => Some(WebNode::element_handle(element)),
            Err(err) => {
                log::warn!("createElement({tag}) failed: {err:?}");
                None
            }
        }
    }
}
