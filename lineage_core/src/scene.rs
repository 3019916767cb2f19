// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-graph collaborator contract.
//!
//! The core only reads and replaces the `map` slot of a [`Material`] and asks
//! for a re-upload. Meshes and materials belong to the renderer; the core
//! holds them through `Rc`/`Weak` handles and never owns their lifecycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use kurbo::Point;

use crate::dom::Element;
use crate::surface::Surface;

/// The pixels behind a texture.
#[derive(Clone)]
pub enum TextureImage {
    /// A bitmap surface (captured or drawn).
    Surface(Surface),
    /// A live DOM media element used directly (`<video>`, `<img>`).
    Media(Element),
    /// No image yet.
    Empty,
}

impl fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(s) => write!(f, "Surface({}x{})", s.width(), s.height()),
            Self::Media(_) => f.write_str("Media"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// A texture object as far as the core is concerned.
///
/// Identity matters: replacing a material's map always installs a new
/// `Rc<Texture>`.
#[derive(Debug)]
pub struct Texture {
    image: TextureImage,
    needs_update: Cell<bool>,
}

impl Texture {
    /// Creates a texture over `image`, flagged for upload.
    #[must_use]
    pub fn new(image: TextureImage) -> Self {
        Self {
            image,
            needs_update: Cell::new(true),
        }
    }

    /// Creates a texture backed by a bitmap surface.
    #[must_use]
    pub fn from_surface(surface: Surface) -> Self {
        Self::new(TextureImage::Surface(surface))
    }

    /// Creates a texture backed by a live media element.
    #[must_use]
    pub fn from_media(element: Element) -> Self {
        Self::new(TextureImage::Media(element))
    }

    /// The backing image.
    #[must_use]
    pub fn image(&self) -> &TextureImage {
        &self.image
    }

    /// The backing surface, if the image is one.
    #[must_use]
    pub fn surface(&self) -> Option<&Surface> {
        match &self.image {
            TextureImage::Surface(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the renderer should re-upload the pixels.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.needs_update.get()
    }

    /// Sets the re-upload flag.
    pub fn set_needs_update(&self, value: bool) {
        self.needs_update.set(value);
    }
}

/// User-attachable metadata on a mesh or material.
///
/// `source_override` is the manual escape hatch: when set, inspecting the
/// mesh opens this element regardless of any automatic detection.
#[derive(Default)]
pub struct Metadata {
    source_override: RefCell<Option<Element>>,
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("source_override", &self.source_override.borrow().is_some())
            .finish()
    }
}

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The manual source override.
    #[must_use]
    pub fn source_override(&self) -> Option<Element> {
        self.source_override.borrow().clone()
    }

    /// Sets or clears the manual source override.
    pub fn set_source_override(&self, element: Option<Element>) {
        *self.source_override.borrow_mut() = element;
    }
}

/// A material slot.
pub trait Material {
    /// The texture currently bound to the `map` slot.
    fn map(&self) -> Option<Rc<Texture>>;

    /// Replaces the `map` slot.
    fn set_map(&self, map: Option<Rc<Texture>>);

    /// Flags the material for re-upload.
    fn mark_needs_update(&self);

    /// The material's metadata bag.
    fn metadata(&self) -> &Metadata;
}

/// A mesh node.
pub trait Mesh {
    /// Material slots in slot order.
    fn materials(&self) -> Vec<Rc<dyn Material>>;

    /// The mesh's metadata bag.
    fn metadata(&self) -> &Metadata;

    /// Direct child meshes.
    fn children(&self) -> Vec<Rc<dyn Mesh>> {
        Vec::new()
    }

    /// Maps a picked face to its material slot, for grouped geometry.
    fn material_index_for_face(&self, face: usize) -> Option<usize> {
        _ = face;
        None
    }
}

/// Visits `root` and all descendant meshes depth-first, parents first.
pub fn traverse(root: &Rc<dyn Mesh>, visit: &mut dyn FnMut(&Rc<dyn Mesh>)) {
    let mut stack = vec![Rc::clone(root)];
    while let Some(mesh) = stack.pop() {
        visit(&mesh);
        let mut children = mesh.children();
        children.reverse();
        stack.extend(children);
    }
}

/// What part of a mesh a pick hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hit {
    /// A face index, resolved through [`Mesh::material_index_for_face`].
    Face(usize),
    /// A material slot index.
    Material(usize),
}

/// A pick (right-click) on a mesh.
#[derive(Clone)]
pub struct PickEvent {
    /// The picked mesh.
    pub mesh: Rc<dyn Mesh>,
    /// What was hit, if the picker reports it.
    pub hit: Option<Hit>,
    /// Pointer position in screen coordinates.
    pub pointer: Point,
}

impl fmt::Debug for PickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickEvent")
            .field("hit", &self.hit)
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

impl PickEvent {
    /// The material slot the pick narrows to, if known.
    #[must_use]
    pub fn material_index(&self) -> Option<usize> {
        match self.hit? {
            Hit::Material(i) => Some(i),
            Hit::Face(face) => self.mesh.material_index_for_face(face),
        }
    }
}

/// Installs `texture` on the material slots of `mesh`.
///
/// With `slot` set only that slot is touched. Otherwise every slot is
/// touched, or only those already holding a texture when `textured_only`.
/// Returns the number of slots updated.
pub fn publish_texture(
    mesh: &dyn Mesh,
    slot: Option<usize>,
    texture: &Rc<Texture>,
    textured_only: bool,
) -> usize {
    let mut updated = 0;
    for (i, material) in mesh.materials().iter().enumerate() {
        if slot.is_some_and(|s| s != i) {
            continue;
        }
        if textured_only && material.map().is_none() {
            continue;
        }
        material.set_map(Some(Rc::clone(texture)));
        material.mark_needs_update();
        updated += 1;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMaterial, FakeMesh, FakeRaster};

    #[test]
    fn face_hits_resolve_through_mesh() {
        let mesh = FakeMesh::new(vec![FakeMaterial::new(), FakeMaterial::new()]);
        mesh.map_face(4, 1);
        let pick = PickEvent {
            mesh: mesh.clone(),
            hit: Some(Hit::Face(4)),
            pointer: Point::ORIGIN,
        };
        assert_eq!(pick.material_index(), Some(1));
    }

    #[test]
    fn traverse_visits_descendants_in_order() {
        let leaf = FakeMesh::new(vec![]);
        let mid = FakeMesh::new(vec![]);
        mid.add_child(leaf.clone());
        let root = FakeMesh::new(vec![]);
        root.add_child(mid.clone());
        let root: Rc<dyn Mesh> = root;

        let mut seen = 0;
        traverse(&root, &mut |_| seen += 1);
        assert_eq!(seen, 3);
    }

    #[test]
    fn publish_respects_slot_and_textured_only() {
        let textured = FakeMaterial::new();
        textured.set_map(Some(Rc::new(Texture::from_surface(FakeRaster::new(4, 4)))));
        let bare = FakeMaterial::new();
        let mesh = FakeMesh::new(vec![textured.clone(), bare.clone()]);
        let tex = Rc::new(Texture::from_surface(FakeRaster::new(8, 8)));

        assert_eq!(publish_texture(&*mesh, None, &tex, true), 1);
        assert!(bare.map().is_none());
        assert_eq!(textured.updates(), 1);

        assert_eq!(publish_texture(&*mesh, Some(1), &tex, false), 1);
        assert!(bare.map().is_some());
    }
}
