// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host doubles for unit tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::capture::{CaptureCallback, CaptureOptions, CaptureService};
use crate::dom::{Document, Element, MutationWatch, Node, same_node};
use crate::draw::{
    Context2d, DrawImage, ImageSource, TextAlign, TextBaseline, TextMetrics, TextStyle,
};
use crate::error::CaptureError;
use crate::scene::{Material, Mesh, Metadata, Texture};
use crate::surface::{Raster, Snapshot, Surface};
use crate::transform::SetTransform;

// ---------------------------------------------------------------------------
// DOM
// ---------------------------------------------------------------------------

type Observer = (Rc<Cell<bool>>, Rc<RefCell<Box<dyn FnMut()>>>);

/// A DOM element double with synchronous mutation observers.
pub(crate) struct FakeNode {
    me: Weak<Self>,
    tag: String,
    is_root: bool,
    parent: RefCell<Weak<Self>>,
    children: RefCell<Vec<Rc<Self>>>,
    styles: RefCell<BTreeMap<String, String>>,
    attributes: RefCell<BTreeMap<String, String>>,
    text: RefCell<String>,
    observers: RefCell<Vec<Observer>>,
    fresh_handles: Rc<Cell<bool>>,
}

impl FakeNode {
    fn create(tag: &str, is_root: bool, fresh_handles: &Rc<Cell<bool>>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            tag: tag.to_owned(),
            is_root,
            fresh_handles: Rc::clone(fresh_handles),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            styles: RefCell::new(BTreeMap::new()),
            attributes: RefCell::new(BTreeMap::new()),
            text: RefCell::new(String::new()),
            observers: RefCell::new(Vec::new()),
        })
    }

    fn of(element: &Element) -> Rc<Self> {
        element
            .as_any()
            .downcast_ref::<Self>()
            .and_then(|n| n.me.upgrade())
            .expect("element is a FakeNode")
    }

    /// A handle to `node` as returned from traversal.
    fn handle(&self, node: Rc<Self>) -> Element {
        if self.fresh_handles.get() {
            Rc::new(FakeHandle(node)) as Element
        } else {
            node as Element
        }
    }

    pub(crate) fn tag(&self) -> &str {
        &self.tag
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn parent_node(&self) -> Option<Rc<Self>> {
        self.parent.borrow().upgrade()
    }

    fn detach_from_parent(&self) {
        if let Some(parent) = self.parent_node() {
            parent
                .children
                .borrow_mut()
                .retain(|c| !std::ptr::eq(Rc::as_ptr(c), self));
            *self.parent.borrow_mut() = Weak::new();
            parent.notify();
        }
    }

    /// Fires the observers of this node and of every ancestor.
    fn notify(&self) {
        let mut callbacks = Vec::new();
        let mut node = self.me.upgrade();
        while let Some(n) = node {
            n.observers.borrow_mut().retain(|(live, _)| live.get());
            callbacks.extend(n.observers.borrow().iter().map(|(_, cb)| Rc::clone(cb)));
            node = n.parent_node();
        }
        for cb in callbacks {
            (cb.borrow_mut())();
        }
    }
}

impl Node for FakeNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Node) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| std::ptr::eq(self, other))
    }

    fn parent(&self) -> Option<Element> {
        self.parent_node().map(|p| self.handle(p))
    }

    fn next_sibling(&self) -> Option<Element> {
        let parent = self.parent_node()?;
        let children = parent.children.borrow();
        let idx = children
            .iter()
            .position(|c| std::ptr::eq(Rc::as_ptr(c), self))?;
        let sibling = Rc::clone(children.get(idx + 1)?);
        Some(self.handle(sibling))
    }

    fn is_connected(&self) -> bool {
        if self.is_root {
            return true;
        }
        self.parent_node().is_some_and(|p| p.is_connected())
    }

    fn append_child(&self, child: &Element) {
        let child = Self::of(child);
        child.detach_from_parent();
        *child.parent.borrow_mut() = self.me.clone();
        self.children.borrow_mut().push(child);
        self.notify();
    }

    fn insert_before(&self, child: &Element, reference: &Element) {
        let child = Self::of(child);
        child.detach_from_parent();
        *child.parent.borrow_mut() = self.me.clone();
        {
            let mut children = self.children.borrow_mut();
            let idx = children
                .iter()
                .position(|c| same_node(&(Rc::clone(c) as Element), reference))
                .unwrap_or(children.len());
            children.insert(idx, child);
        }
        self.notify();
    }

    fn remove(&self) {
        self.detach_from_parent();
    }

    fn remove_children(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for c in &children {
            *c.parent.borrow_mut() = Weak::new();
        }
        self.notify();
    }

    fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn style(&self, property: &str) -> Option<String> {
        self.styles
            .borrow()
            .get(property)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn set_style(&self, property: &str, value: &str) {
        self.styles
            .borrow_mut()
            .insert(property.to_owned(), value.to_owned());
        self.notify();
    }

    fn remove_style(&self, property: &str) {
        self.styles.borrow_mut().remove(property);
        self.notify();
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_owned(), value.to_owned());
        self.notify();
    }

    fn set_text(&self, text: &str) {
        text.clone_into(&mut self.text.borrow_mut());
        self.notify();
    }

    fn observe(&self, on_mutation: Box<dyn FnMut()>) -> Box<dyn MutationWatch> {
        let live = Rc::new(Cell::new(true));
        self.observers
            .borrow_mut()
            .push((Rc::clone(&live), Rc::new(RefCell::new(on_mutation))));
        Box::new(FakeWatch(live))
    }
}

/// A second handle to a fake node, the way a browser backend mints a new
/// wrapper for every `parentElement` lookup. Its `Rc` address differs from
/// the node's; `as_any` still exposes the node.
struct FakeHandle(Rc<FakeNode>);

impl Node for FakeHandle {
    fn as_any(&self) -> &dyn Any {
        self.0.as_any()
    }

    fn same_as(&self, other: &dyn Node) -> bool {
        self.0.same_as(other)
    }

    fn parent(&self) -> Option<Element> {
        self.0.parent()
    }

    fn next_sibling(&self) -> Option<Element> {
        self.0.next_sibling()
    }

    fn is_connected(&self) -> bool {
        self.0.is_connected()
    }

    fn append_child(&self, child: &Element) {
        self.0.append_child(child);
    }

    fn insert_before(&self, child: &Element, reference: &Element) {
        self.0.insert_before(child, reference);
    }

    fn remove(&self) {
        self.0.remove();
    }

    fn remove_children(&self) {
        self.0.remove_children();
    }

    fn child_count(&self) -> usize {
        self.0.child_count()
    }

    fn style(&self, property: &str) -> Option<String> {
        self.0.style(property)
    }

    fn set_style(&self, property: &str, value: &str) {
        self.0.set_style(property, value);
    }

    fn remove_style(&self, property: &str) {
        self.0.remove_style(property);
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.0.set_attribute(name, value);
    }

    fn set_text(&self, text: &str) {
        self.0.set_text(text);
    }

    fn observe(&self, on_mutation: Box<dyn FnMut()>) -> Box<dyn MutationWatch> {
        self.0.observe(on_mutation)
    }
}

struct FakeWatch(Rc<Cell<bool>>);

impl MutationWatch for FakeWatch {
    fn disconnect(&mut self) {
        self.0.set(false);
    }
}

impl Drop for FakeWatch {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A document whose root element is always connected.
pub(crate) struct FakeDom {
    root: Rc<FakeNode>,
    refuse: Cell<bool>,
    fresh_handles: Rc<Cell<bool>>,
}

impl FakeDom {
    pub(crate) fn new() -> Self {
        let fresh_handles = Rc::new(Cell::new(false));
        Self {
            root: FakeNode::create("body", true, &fresh_handles),
            refuse: Cell::new(false),
            fresh_handles,
        }
    }

    /// Creates a detached element; never refused.
    pub(crate) fn create_element(&self, tag: &str) -> Element {
        FakeNode::create(tag, false, &self.fresh_handles)
    }

    /// Makes `parent` and `next_sibling` return a new handle on every call.
    pub(crate) fn fresh_handles(&self, on: bool) {
        self.fresh_handles.set(on);
    }

    /// Makes [`Document::create_element`] fail until turned off again.
    pub(crate) fn refuse_elements(&self, refuse: bool) {
        self.refuse.set(refuse);
    }

    /// The connected document body.
    pub(crate) fn body(&self) -> Element {
        Rc::clone(&self.root) as Element
    }
}

impl Document for FakeDom {
    fn create_element(&self, tag: &str) -> Option<Element> {
        (!self.refuse.get()).then(|| FakeDom::create_element(self, tag))
    }
}

/// The text content of a fake element.
pub(crate) fn text_of(element: &Element) -> String {
    FakeNode::of(element).text.borrow().clone()
}

/// The fake node behind an element.
pub(crate) fn fake(element: &Element) -> Rc<FakeNode> {
    FakeNode::of(element)
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// A raster double. `label` lets tests tell captures apart.
pub(crate) struct FakeRaster {
    width: u32,
    height: u32,
    label: String,
    tainted: Cell<bool>,
    snapshots: Cell<u32>,
}

impl FakeRaster {
    pub(crate) fn new(width: u32, height: u32) -> Rc<Self> {
        Self::labelled(width, height, "")
    }

    pub(crate) fn labelled(width: u32, height: u32, label: &str) -> Rc<Self> {
        Rc::new(Self {
            width,
            height,
            label: label.to_owned(),
            tainted: Cell::new(false),
            snapshots: Cell::new(0),
        })
    }

    pub(crate) fn taint(&self) {
        self.tainted.set(true);
    }

    pub(crate) fn label_of(surface: &Surface) -> String {
        surface
            .as_any()
            .downcast_ref::<Self>()
            .map(|r| r.label.clone())
            .unwrap_or_default()
    }
}

impl Raster for FakeRaster {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        if self.tainted.get() {
            return Err(CaptureError::Tainted);
        }
        let n = self.snapshots.get() + 1;
        self.snapshots.set(n);
        Ok(Snapshot {
            url: format!("data:image/png;fake,{}x{}#{n}", self.width, self.height),
            width: self.width,
            height: self.height,
        })
    }
}

// ---------------------------------------------------------------------------
// Drawing context
// ---------------------------------------------------------------------------

/// A drawing context that logs every call it receives.
pub(crate) struct FakeContext {
    surface: Surface,
    style: TextStyle,
    saved: Vec<TextStyle>,
    calls: Vec<String>,
}

impl FakeContext {
    pub(crate) fn new(surface: Surface) -> Self {
        Self {
            surface,
            style: TextStyle::default(),
            saved: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl Context2d for FakeContext {
    fn surface(&self) -> Surface {
        Rc::clone(&self.surface)
    }

    fn save(&mut self) {
        self.saved.push(self.style.clone());
        self.calls.push("save".into());
    }

    fn restore(&mut self) {
        if let Some(style) = self.saved.pop() {
            self.style = style;
        }
        self.calls.push("restore".into());
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.calls.push(format!("translate({dx}, {dy})"));
    }

    fn rotate(&mut self, angle: f64) {
        self.calls.push(format!("rotate({angle})"));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.calls.push(format!("scale({sx}, {sy})"));
    }

    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.calls
            .push(format!("transform({a}, {b}, {c}, {d}, {e}, {f})"));
    }

    fn set_transform(&mut self, _transform: SetTransform) {
        self.calls.push("setTransform".into());
    }

    fn text_style(&self) -> TextStyle {
        self.style.clone()
    }

    fn set_font(&mut self, font: &str) {
        font.clone_into(&mut self.style.font);
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.style.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.style.baseline = baseline;
    }

    fn global_alpha(&self) -> f64 {
        1.0
    }

    /// Six pixels per character, 8 up and 2 down.
    fn measure_text(&self, text: &str) -> TextMetrics {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        TextMetrics {
            width: 6.0 * f64::from(chars),
            ascent: 8.0,
            descent: 2.0,
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.calls.push(format!("fillText({text}, {x}, {y})"));
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64) {
        self.calls.push(format!("strokeText({text}, {x}, {y})"));
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(format!("fillRect({x}, {y}, {w}, {h})"));
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(format!("strokeRect({x}, {y}, {w}, {h})"));
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(format!("clearRect({x}, {y}, {w}, {h})"));
    }

    fn draw_image(&mut self, _image: &ImageSource, _args: DrawImage) {
        self.calls.push("drawImage".into());
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

struct PendingCapture {
    options: CaptureOptions,
    label: String,
    done: CaptureCallback,
}

/// A capture service whose requests complete only when the test says so.
///
/// The text of the captured element is read when the request is issued,
/// and becomes the label of the produced [`FakeRaster`].
#[derive(Default)]
pub(crate) struct DeferredCapture {
    queue: RefCell<VecDeque<PendingCapture>>,
    issued: Cell<usize>,
}

impl DeferredCapture {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of requests still waiting.
    pub(crate) fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Total requests ever received.
    pub(crate) fn issued(&self) -> usize {
        self.issued.get()
    }

    /// Completes the oldest request successfully.
    pub(crate) fn complete_next(&self) {
        let next = self.queue.borrow_mut().pop_front();
        if let Some(p) = next {
            Self::finish(p);
        }
    }

    /// Completes the newest request successfully.
    pub(crate) fn complete_last(&self) {
        let last = self.queue.borrow_mut().pop_back();
        if let Some(p) = last {
            Self::finish(p);
        }
    }

    /// Fails the oldest request.
    pub(crate) fn fail_next(&self, err: CaptureError) {
        let next = self.queue.borrow_mut().pop_front();
        if let Some(p) = next {
            (p.done)(Err(err));
        }
    }

    fn finish(p: PendingCapture) {
        let scale = p.options.scale.unwrap_or(1.0);
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "test sizes are small and positive"
        )]
        let px = |v: Option<u32>| (f64::from(v.unwrap_or(100)) * scale).round() as u32;
        let bitmap: Surface = FakeRaster::labelled(px(p.options.width), px(p.options.height), &p.label);
        (p.done)(Ok(bitmap));
    }
}

impl CaptureService for DeferredCapture {
    fn capture(&self, element: &Element, options: &CaptureOptions, done: CaptureCallback) {
        self.issued.set(self.issued.get() + 1);
        let label = gather_text(&FakeNode::of(element));
        self.queue.borrow_mut().push_back(PendingCapture {
            options: options.clone(),
            label,
            done,
        });
    }
}

fn gather_text(node: &FakeNode) -> String {
    let mut out = node.text.borrow().clone();
    for child in node.children.borrow().iter() {
        out.push_str(&gather_text(child));
    }
    out
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A material double counting re-upload requests.
#[derive(Default)]
pub(crate) struct FakeMaterial {
    map: RefCell<Option<Rc<Texture>>>,
    updates: Cell<u32>,
    metadata: Metadata,
}

impl FakeMaterial {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn updates(&self) -> u32 {
        self.updates.get()
    }
}

impl Material for FakeMaterial {
    fn map(&self) -> Option<Rc<Texture>> {
        self.map.borrow().clone()
    }

    fn set_map(&self, map: Option<Rc<Texture>>) {
        *self.map.borrow_mut() = map;
    }

    fn mark_needs_update(&self) {
        self.updates.set(self.updates.get() + 1);
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// A mesh double with explicit face-to-slot mapping.
pub(crate) struct FakeMesh {
    materials: Vec<Rc<FakeMaterial>>,
    metadata: Metadata,
    children: RefCell<Vec<Rc<dyn Mesh>>>,
    faces: RefCell<HashMap<usize, usize>>,
}

impl FakeMesh {
    pub(crate) fn new(materials: Vec<Rc<FakeMaterial>>) -> Rc<Self> {
        Rc::new(Self {
            materials,
            metadata: Metadata::new(),
            children: RefCell::new(Vec::new()),
            faces: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn map_face(&self, face: usize, slot: usize) {
        self.faces.borrow_mut().insert(face, slot);
    }

    pub(crate) fn add_child(&self, child: Rc<dyn Mesh>) {
        self.children.borrow_mut().push(child);
    }
}

impl Mesh for FakeMesh {
    fn materials(&self) -> Vec<Rc<dyn Material>> {
        self.materials
            .iter()
            .map(|m| Rc::clone(m) as Rc<dyn Material>)
            .collect()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn children(&self) -> Vec<Rc<dyn Mesh>> {
        self.children.borrow().clone()
    }

    fn material_index_for_face(&self, face: usize) -> Option<usize> {
        self.faces.borrow().get(&face).copied()
    }
}
