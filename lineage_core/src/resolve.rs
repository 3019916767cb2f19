// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mesh-to-source resolution.
//!
//! Given a picked mesh, [`Resolver::resolve`] finds the DOM content behind
//! its texture. Candidates are checked in strict priority order and the
//! first match wins:
//!
//! 1. a manual `source_override` on a candidate material, then on the mesh,
//! 2. a provenance record for a candidate texture or its surface,
//! 3. a ghost layer over a candidate texture's surface,
//! 4. a candidate texture backed by a live media element (raw source).
//!
//! When the pick names a material slot only that slot is a candidate;
//! otherwise every slot is, in slot order.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::Element;
use crate::instrument::Instrumentation;
use crate::provenance::{ProvenanceRecord, ProvenanceRegistry};
use crate::scene::{Material, Mesh, PickEvent, TextureImage};
use crate::surface::{Snapshot, Surface};
use crate::trace::SourceTag;

/// What kind of source a session opens.
#[derive(Clone)]
pub enum SourceKind {
    /// An element named by a manual override.
    Manual,
    /// A DOM subtree captured through the capture service.
    Captured,
    /// The ghost layer of a drawn surface.
    Ghost {
        /// The surface the ghosts mirror.
        surface: Surface,
    },
    /// A live media element used directly as a texture.
    Raw,
}

impl fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().as_str())
    }
}

impl SourceKind {
    /// The diagnostic tag for this kind.
    #[must_use]
    pub fn tag(&self) -> SourceTag {
        match self {
            Self::Manual => SourceTag::Manual,
            Self::Captured => SourceTag::Captured,
            Self::Ghost { .. } => SourceTag::Ghost,
            Self::Raw => SourceTag::Raw,
        }
    }
}

/// Everything an inspection session needs about its source.
#[derive(Clone)]
pub struct CaptureInfo {
    /// How the source was found.
    pub kind: SourceKind,
    /// The element to relocate into the overlay.
    pub element: Element,
    /// Width to recapture at.
    pub width: u32,
    /// Height to recapture at.
    pub height: u32,
    /// Scale to recapture at.
    pub scale: f64,
    /// The mesh that was picked.
    pub mesh: Weak<dyn Mesh>,
    /// The material slot to republish into; all textured slots when `None`.
    pub material_index: Option<usize>,
    /// Whether the element was in the visible document before the session.
    pub was_connected: bool,
    /// Picture to show behind the element.
    pub backdrop: Option<Snapshot>,
    /// The provenance record the source came from, if any.
    pub record: Option<Rc<ProvenanceRecord>>,
}

impl fmt::Debug for CaptureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureInfo")
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("material_index", &self.material_index)
            .field("was_connected", &self.was_connected)
            .field("backdrop", &self.backdrop.is_some())
            .finish_non_exhaustive()
    }
}

impl CaptureInfo {
    /// Whether DOM mutations should trigger a recapture.
    ///
    /// Ghost layers and raw media have no capture path of their own.
    #[must_use]
    pub fn recapturable(&self) -> bool {
        matches!(self.kind, SourceKind::Manual | SourceKind::Captured)
    }
}

/// Resolves picked meshes to their DOM sources.
pub struct Resolver {
    registry: Rc<RefCell<ProvenanceRegistry>>,
    instrumentation: Rc<Instrumentation>,
    default_size: (u32, u32),
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("default_size", &self.default_size)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a resolver.
    ///
    /// `default_size` is used for sources with no recorded size (manual
    /// overrides and raw media).
    #[must_use]
    pub fn new(
        registry: Rc<RefCell<ProvenanceRegistry>>,
        instrumentation: Rc<Instrumentation>,
        default_size: (u32, u32),
    ) -> Self {
        Self {
            registry,
            instrumentation,
            default_size,
        }
    }

    /// Resolves a pick event.
    #[must_use]
    pub fn resolve_pick(&self, pick: &PickEvent) -> Option<CaptureInfo> {
        self.resolve(&pick.mesh, pick.material_index())
    }

    /// Resolves `mesh`, narrowed to `material_index` when given.
    #[must_use]
    pub fn resolve(&self, mesh: &Rc<dyn Mesh>, material_index: Option<usize>) -> Option<CaptureInfo> {
        let candidates: Vec<(usize, Rc<dyn Material>)> = match material_index {
            Some(i) => mesh
                .materials()
                .get(i)
                .map(|m| vec![(i, Rc::clone(m))])
                .unwrap_or_default(),
            None => mesh.materials().into_iter().enumerate().collect(),
        };

        for (i, material) in &candidates {
            if let Some(element) = material.metadata().source_override() {
                return Some(self.manual(mesh, element, Some(*i)));
            }
        }
        if let Some(element) = mesh.metadata().source_override() {
            return Some(self.manual(mesh, element, material_index));
        }

        for (i, material) in &candidates {
            let Some(texture) = material.map() else {
                continue;
            };
            let record = self.registry.borrow().lookup_texture(&texture);
            if let Some(record) = record.filter(|r| !r.raw) {
                record.set_associated_mesh(mesh);
                return Some(CaptureInfo {
                    kind: SourceKind::Captured,
                    element: Rc::clone(&record.source),
                    width: record.width,
                    height: record.height,
                    scale: record.scale,
                    mesh: Rc::downgrade(mesh),
                    material_index: Some(*i),
                    was_connected: record.source.is_connected(),
                    backdrop: record.backdrop.clone(),
                    record: Some(record),
                });
            }
            if let Some(surface) = texture.surface()
                && let Some(container) = self.instrumentation.ghost_container(surface)
            {
                return Some(CaptureInfo {
                    kind: SourceKind::Ghost {
                        surface: Rc::clone(surface),
                    },
                    was_connected: container.is_connected(),
                    element: container,
                    width: surface.width(),
                    height: surface.height(),
                    scale: 1.0,
                    mesh: Rc::downgrade(mesh),
                    material_index: Some(*i),
                    backdrop: None,
                    record: None,
                });
            }
        }

        for (i, material) in &candidates {
            let Some(texture) = material.map() else {
                continue;
            };
            let TextureImage::Media(element) = texture.image() else {
                continue;
            };
            let existing = self.registry.borrow().lookup_texture(&texture);
            let record = existing.unwrap_or_else(|| {
                let (width, height) = self.default_size;
                let record = Rc::new(
                    ProvenanceRecord::new(Rc::clone(element), width, height, 1.0).mark_raw(),
                );
                self.registry
                    .borrow_mut()
                    .register_texture(&texture, Rc::clone(&record));
                record
            });
            record.set_associated_mesh(mesh);
            return Some(CaptureInfo {
                kind: SourceKind::Raw,
                element: Rc::clone(element),
                width: record.width,
                height: record.height,
                scale: record.scale,
                mesh: Rc::downgrade(mesh),
                material_index: Some(*i),
                was_connected: element.is_connected(),
                backdrop: None,
                record: Some(record),
            });
        }

        log::debug!(
            "no inspectable source among {} material slot(s)",
            candidates.len()
        );
        None
    }

    fn manual(&self, mesh: &Rc<dyn Mesh>, element: Element, material_index: Option<usize>) -> CaptureInfo {
        let (width, height) = self.default_size;
        CaptureInfo {
            kind: SourceKind::Manual,
            was_connected: element.is_connected(),
            element,
            width,
            height,
            scale: 1.0,
            mesh: Rc::downgrade(mesh),
            material_index,
            backdrop: None,
            record: None,
        }
    }
}
