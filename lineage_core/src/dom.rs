// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM collaborator contract.
//!
//! The core never touches a concrete DOM. It reaches elements through the
//! [`Node`] trait and creates new ones through [`Document`]. Backends wrap
//! their native element type (see `lineage_backend_web`); tests use an
//! in-memory fake.
//!
//! Two [`Element`] handles refer to the same DOM node exactly when
//! [`same_node`] holds. Backends may hand out a fresh handle per lookup, so
//! handle addresses alone do not decide identity; [`Node::same_as`] does.

use std::any::Any;
use std::rc::Rc;

use crate::weak::same_rc;

/// A shared handle to a DOM element.
pub type Element = Rc<dyn Node>;

/// Compares two element handles by node identity.
#[inline]
#[must_use]
pub fn same_node(a: &Element, b: &Element) -> bool {
    same_rc(a, b) || a.same_as(&**b)
}

/// The operations the core needs from a DOM element.
///
/// Mutating methods are infallible from the caller's point of view; a
/// backend that hits a host error logs it and leaves the node unchanged.
pub trait Node {
    /// Returns `self` as [`Any`] so backends can recover their concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Whether `other` wraps the same underlying DOM node.
    ///
    /// [`parent`](Self::parent) and [`next_sibling`](Self::next_sibling)
    /// may return new handles each call; this compares what they point at.
    fn same_as(&self, other: &dyn Node) -> bool;

    /// Returns the element's parent, if it has one.
    fn parent(&self) -> Option<Element>;

    /// Returns the element's next sibling, if it has one.
    fn next_sibling(&self) -> Option<Element>;

    /// Returns whether the element is attached to the visible document.
    fn is_connected(&self) -> bool;

    /// Appends `child` as the last child, moving it from any previous parent.
    fn append_child(&self, child: &Element);

    /// Inserts `child` before `reference`, which must be a child of `self`.
    fn insert_before(&self, child: &Element, reference: &Element);

    /// Detaches the element from its parent.
    fn remove(&self);

    /// Removes every child.
    fn remove_children(&self);

    /// Returns the number of child elements.
    fn child_count(&self) -> usize;

    /// Reads an inline style property. Empty values read as `None`.
    fn style(&self, property: &str) -> Option<String>;

    /// Sets an inline style property.
    fn set_style(&self, property: &str, value: &str);

    /// Removes an inline style property.
    fn remove_style(&self, property: &str);

    /// Sets an attribute.
    fn set_attribute(&self, name: &str, value: &str);

    /// Replaces the element's content with a single text node.
    fn set_text(&self, text: &str);

    /// Starts observing child-list, subtree, attribute and character-data
    /// mutations inside this element.
    ///
    /// `on_mutation` may be called once for a batch of changes. Observation
    /// stops when the returned watch is disconnected or dropped.
    fn observe(&self, on_mutation: Box<dyn FnMut()>) -> Box<dyn MutationWatch>;
}

/// A live mutation observation. Dropping it disconnects.
pub trait MutationWatch {
    /// Stops delivering callbacks. Idempotent.
    fn disconnect(&mut self);
}

/// Creates DOM elements.
pub trait Document {
    /// Creates a detached element with the given tag name.
    ///
    /// Returns `None` when the host refuses, e.g. for an invalid tag name.
    fn create_element(&self, tag: &str) -> Option<Element>;
}

/// Inline placement styling of an element, saved so it can be put back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlinePlacement {
    /// The `position` property.
    pub position: Option<String>,
    /// The `left` property.
    pub left: Option<String>,
    /// The `top` property.
    pub top: Option<String>,
    /// The `transform` property.
    pub transform: Option<String>,
}

impl InlinePlacement {
    const PROPERTIES: [&'static str; 4] = ["position", "left", "top", "transform"];

    /// Reads the placement properties of `element`.
    #[must_use]
    pub fn read(element: &dyn Node) -> Self {
        Self {
            position: element.style("position"),
            left: element.style("left"),
            top: element.style("top"),
            transform: element.style("transform"),
        }
    }

    /// Writes the saved values back, removing properties that were unset.
    pub fn restore(&self, element: &dyn Node) {
        let values = [&self.position, &self.left, &self.top, &self.transform];
        for (property, value) in Self::PROPERTIES.iter().zip(values) {
            match value {
                Some(v) => element.set_style(property, v),
                None => element.remove_style(property),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDom;

    #[test]
    fn placement_round_trips_including_unset() {
        let dom = FakeDom::new();
        let el = dom.create_element("div");
        el.set_style("position", "absolute");
        el.set_style("left", "-9999px");
        let saved = InlinePlacement::read(&*el);

        el.set_style("position", "relative");
        el.set_style("left", "0");
        el.set_style("top", "0");
        saved.restore(&*el);

        assert_eq!(el.style("position").as_deref(), Some("absolute"));
        assert_eq!(el.style("left").as_deref(), Some("-9999px"));
        assert_eq!(el.style("top"), None, "top was unset before");
    }
}
