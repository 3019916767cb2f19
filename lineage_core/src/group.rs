// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mesh groups: markup rendered onto meshes.
//!
//! A [`MeshGroup`] splits its children into meshes and markup. The markup is
//! gathered into one off-screen container of the group's size, captured
//! through the inspector's instrumented capture service, and published as
//! the texture of every material of every mesh in the group. Right-clicking
//! one of those meshes opens an inspection session on the container.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::capture::CaptureOptions;
use crate::dom::{Document, Element};
use crate::inspector::Inspector;
use crate::scene::{Mesh, PickEvent, Texture, traverse};
use crate::session::Session;
use crate::weak::same_rc;

/// A child of a [`MeshGroup`].
#[derive(Clone)]
pub enum Child {
    /// A 3-D primitive.
    Mesh(Rc<dyn Mesh>),
    /// Markup to render onto the group's meshes.
    Markup(Element),
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh(_) => f.write_str("Mesh"),
            Self::Markup(_) => f.write_str("Markup"),
        }
    }
}

/// Meshes textured from a shared markup container.
pub struct MeshGroup {
    meshes: Vec<Rc<dyn Mesh>>,
    container: Element,
    width: u32,
    height: u32,
    scale: f64,
}

impl fmt::Debug for MeshGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshGroup")
            .field("meshes", &self.meshes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl MeshGroup {
    /// Classifies `children` and builds the markup container.
    ///
    /// The container is never attached to the document. Returns `None` if
    /// the document cannot create it.
    #[must_use]
    pub fn new(
        document: &dyn Document,
        children: Vec<Child>,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let container = document.create_element("div")?;
        container.set_attribute("data-mesh-group", "");
        container.set_style("width", &format!("{width}px"));
        container.set_style("height", &format!("{height}px"));
        container.set_style("overflow", "hidden");

        let mut meshes = Vec::new();
        for child in children {
            match child {
                Child::Mesh(mesh) => meshes.push(mesh),
                Child::Markup(element) => container.append_child(&element),
            }
        }
        Some(Self {
            meshes,
            container,
            width,
            height,
            scale: 1.0,
        })
    }

    /// Sets the device-pixel scale used for captures.
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// The markup container.
    #[must_use]
    pub fn container(&self) -> &Element {
        &self.container
    }

    /// The group's meshes.
    #[must_use]
    pub fn meshes(&self) -> &[Rc<dyn Mesh>] {
        &self.meshes
    }

    /// Whether `mesh` is one of the group's meshes or their descendants.
    #[must_use]
    pub fn contains(&self, mesh: &Rc<dyn Mesh>) -> bool {
        let mut found = false;
        for root in &self.meshes {
            traverse(root, &mut |m| found |= same_rc(m, mesh));
        }
        found
    }

    /// Captures the markup and publishes it onto every mesh in the group.
    ///
    /// Completion is asynchronous; a failed capture leaves textures as they
    /// were.
    pub fn publish(&self, inspector: &Inspector) {
        let meshes: Vec<Weak<dyn Mesh>> = self.meshes.iter().map(Rc::downgrade).collect();
        let registry = Rc::clone(inspector.registry());
        inspector.capture().capture(
            &self.container,
            &CaptureOptions::sized(self.width, self.height, self.scale),
            Box::new(move |result| {
                let bitmap = match result {
                    Ok(bitmap) => bitmap,
                    Err(err) => {
                        log::warn!("mesh group capture failed: {err}");
                        return;
                    }
                };
                let texture = Rc::new(Texture::from_surface(Rc::clone(&bitmap)));
                let record = registry.borrow().lookup(&bitmap);
                for root in meshes.iter().filter_map(Weak::upgrade) {
                    if let Some(record) = &record {
                        record.set_associated_mesh(&root);
                    }
                    traverse(&root, &mut |mesh| {
                        for material in mesh.materials() {
                            material.set_map(Some(Rc::clone(&texture)));
                            material.mark_needs_update();
                        }
                    });
                }
                if let Some(record) = record {
                    registry.borrow_mut().register_texture(&texture, record);
                }
            }),
        );
    }

    /// Handles a right-click: inspects the pick if it hit this group.
    pub fn on_context_menu(&self, inspector: &Inspector, pick: &PickEvent) -> Option<Rc<Session>> {
        if !self.contains(&pick.mesh) {
            return None;
        }
        inspector.inspect(pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::{Host, InspectorConfig};
    use crate::scene::Material;
    use crate::testing::{DeferredCapture, FakeDom, FakeMaterial, FakeMesh};
    use kurbo::Point;

    fn inspector(dom: &Rc<FakeDom>, raw: &Rc<DeferredCapture>) -> Rc<Inspector> {
        let overlay = dom.create_element("div");
        dom.body().append_child(&overlay);
        Inspector::new(
            InspectorConfig::default(),
            Host {
                document: dom.clone(),
                capture: raw.clone(),
                overlay,
            },
        )
    }

    #[test]
    fn children_are_classified() {
        let dom = FakeDom::new();
        let a = dom.create_element("p");
        let b = dom.create_element("p");
        let mesh = FakeMesh::new(vec![]);
        let group = MeshGroup::new(
            &dom,
            vec![Child::Markup(a), Child::Mesh(mesh), Child::Markup(b)],
            64,
            32,
        )
        .unwrap();
        assert_eq!(group.meshes().len(), 1);
        assert_eq!(group.container().child_count(), 2);
        assert_eq!(group.container().style("width").as_deref(), Some("64px"));
    }

    #[test]
    fn publish_textures_descendants() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = inspector(&dom, &raw);

        let inner = FakeMaterial::new();
        let child = FakeMesh::new(vec![inner.clone()]);
        let outer = FakeMaterial::new();
        let root = FakeMesh::new(vec![outer.clone()]);
        root.add_child(child);
        let group = MeshGroup::new(&*dom, vec![Child::Mesh(root.clone())], 128, 128)
            .unwrap()
            .with_scale(2.0);
        group.publish(&inspector);
        assert!(outer.map().is_none(), "nothing until the capture lands");
        raw.complete_next();

        let texture = outer.map().expect("published");
        assert!(Rc::ptr_eq(&texture, &inner.map().expect("published")));
        assert_eq!(texture.surface().map(|s| s.width()), Some(256));
        let record = inspector
            .registry()
            .borrow()
            .lookup_texture(&texture)
            .expect("tracked");
        let root: Rc<dyn Mesh> = root;
        assert!(record.associated_mesh().is_some_and(|m| same_rc(&m, &root)));
    }

    #[test]
    fn failed_publish_changes_nothing() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = inspector(&dom, &raw);
        let material = FakeMaterial::new();
        let group = MeshGroup::new(
            &*dom,
            vec![Child::Mesh(FakeMesh::new(vec![material.clone()]))],
            8,
            8,
        )
        .unwrap();
        group.publish(&inspector);
        raw.fail_next(crate::error::CaptureError::Tainted);
        assert!(material.map().is_none());
        assert_eq!(material.updates(), 0);
    }

    #[test]
    fn foreign_meshes_are_ignored() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = inspector(&dom, &raw);
        let group = MeshGroup::new(&*dom, vec![Child::Mesh(FakeMesh::new(vec![]))], 8, 8).unwrap();
        let pick = PickEvent {
            mesh: FakeMesh::new(vec![FakeMaterial::new()]),
            hit: None,
            pointer: Point::ORIGIN,
        };
        assert!(group.on_context_menu(&inspector, &pick).is_none());
    }

    #[test]
    fn refused_container_builds_no_group() {
        let dom = FakeDom::new();
        dom.refuse_elements(true);
        assert!(MeshGroup::new(&dom, vec![Child::Mesh(FakeMesh::new(vec![]))], 8, 8).is_none());
    }
}
