// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Provenance: which DOM content produced which bitmap.
//!
//! The [`ProvenanceRegistry`] maps bitmap surfaces (and texture objects) to
//! a shared [`ProvenanceRecord`]. Both maps are weakly keyed, so a record
//! lives only as long as something else keeps its bitmap or texture alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::Element;
use crate::scene::{Mesh, Texture, TextureImage};
use crate::surface::{Raster, Snapshot, Surface};
use crate::weak::WeakKeyMap;

/// Where a bitmap came from and how it was captured.
#[derive(Clone)]
pub struct ProvenanceRecord {
    /// The element (subtree root) that was captured. Not owned.
    pub source: Element,
    /// Captured width in CSS pixels.
    pub width: u32,
    /// Captured height in CSS pixels.
    pub height: u32,
    /// Device-pixel scale the capture used.
    pub scale: f64,
    /// Composited picture the surface showed before it inherited this record.
    pub backdrop: Option<Snapshot>,
    /// The source is a live media element, not a capture.
    pub raw: bool,
    mesh: RefCell<Option<Weak<dyn Mesh>>>,
}

impl fmt::Debug for ProvenanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvenanceRecord")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("backdrop", &self.backdrop.is_some())
            .field("raw", &self.raw)
            .field("mesh", &self.associated_mesh().is_some())
            .finish_non_exhaustive()
    }
}

impl ProvenanceRecord {
    /// Creates a record for a capture of `source`.
    ///
    /// Zero dimensions are clamped to one pixel and a non-positive or
    /// non-finite scale to `1.0`.
    #[must_use]
    pub fn new(source: Element, width: u32, height: u32, scale: f64) -> Self {
        Self {
            source,
            width: width.max(1),
            height: height.max(1),
            scale: if scale.is_finite() && scale > 0.0 {
                scale
            } else {
                1.0
            },
            backdrop: None,
            raw: false,
            mesh: RefCell::new(None),
        }
    }

    /// Marks the record as describing a raw media source.
    #[must_use]
    pub fn mark_raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// A copy of this record for a surface that had `self`'s surface drawn
    /// onto it, carrying that surface's prior pixels as a backdrop.
    #[must_use]
    pub fn inherit(&self, backdrop: Option<Snapshot>) -> Self {
        Self {
            backdrop,
            ..self.clone()
        }
    }

    /// The mesh most recently resolved to this record, if still alive.
    #[must_use]
    pub fn associated_mesh(&self) -> Option<Rc<dyn Mesh>> {
        self.mesh.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Replaces the associated mesh.
    pub fn set_associated_mesh(&self, mesh: &Rc<dyn Mesh>) {
        *self.mesh.borrow_mut() = Some(Rc::downgrade(mesh));
    }
}

/// Weakly keyed provenance lookup.
#[derive(Debug, Default)]
pub struct ProvenanceRegistry {
    surfaces: WeakKeyMap<dyn Raster, Rc<ProvenanceRecord>>,
    textures: WeakKeyMap<Texture, Rc<ProvenanceRecord>>,
}

impl ProvenanceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records or overwrites the provenance of `surface`.
    pub fn register(&mut self, surface: &Surface, record: ProvenanceRecord) -> Rc<ProvenanceRecord> {
        let record = Rc::new(record);
        self.surfaces.insert(surface, Rc::clone(&record));
        log::trace!(
            "registered provenance for {}x{} surface",
            surface.width(),
            surface.height()
        );
        record
    }

    /// Associates a texture with an existing record.
    pub fn register_texture(&mut self, texture: &Rc<Texture>, record: Rc<ProvenanceRecord>) {
        self.textures.insert(texture, record);
    }

    /// Looks up the provenance of `surface`.
    #[must_use]
    pub fn lookup(&self, surface: &Surface) -> Option<Rc<ProvenanceRecord>> {
        self.surfaces.get(surface).cloned()
    }

    /// Looks up the provenance of `texture`, directly or through its surface.
    #[must_use]
    pub fn lookup_texture(&self, texture: &Rc<Texture>) -> Option<Rc<ProvenanceRecord>> {
        if let Some(record) = self.textures.get(texture) {
            return Some(Rc::clone(record));
        }
        match texture.image() {
            TextureImage::Surface(surface) => self.lookup(surface),
            TextureImage::Media(_) | TextureImage::Empty => None,
        }
    }

    /// Returns whether `surface` has a record.
    #[must_use]
    pub fn is_tracked(&self, surface: &Surface) -> bool {
        self.surfaces.contains_key(surface)
    }

    /// Number of live surface entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns `true` if no surface is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.textures.clear();
    }
}
