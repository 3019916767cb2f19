// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture provenance tracking and DOM-to-texture live sync.
//!
//! `lineage_core` remembers which DOM content produced which texture, mirrors
//! text and shapes drawn through an imperative 2-D API as invisible,
//! selectable DOM "ghosts", and keeps a picked mesh's texture in sync with
//! its source while that source is being edited.
//!
//! The crate is host-agnostic. The DOM, bitmap surfaces, the drawing API, the
//! scene graph and the DOM snapshot service are all reached through traits;
//! `lineage_backend_web` implements them on top of `web-sys`.
//!
//! # Architecture
//!
//! ```text
//!   drawing call ──► TrackedContext ──► TransformTracker ──► GhostLayer
//!
//!   capture call ──► InstrumentedCapture ──► ProvenanceRegistry
//!
//!   PickEvent ──► Resolver ──► CaptureInfo ──► SyncController
//!                                                   │ mutation
//!                                                   ▼
//!                         capture ──► new Texture ──► Material::set_map
//! ```
//!
//! **[`tracker`]**: Per-surface affine transform plus save/restore stack,
//! mirroring canvas transform semantics.
//!
//! **[`ghost`]**: Absolutely positioned, transparent DOM mirrors of drawing
//! calls, placed through the tracker.
//!
//! **[`provenance`]**: Weakly keyed map from bitmaps and textures to the
//! element and parameters that produced them.
//!
//! **[`resolve`]**: Finds the source behind a picked mesh: manual override,
//! provenance record, ghost layer, then raw media.
//!
//! **[`session`]**: The live sync state machine with stale-result
//! sequencing.
//!
//! **[`capture`]**: The capture collaborator contract and its
//! provenance-recording wrapper.
//!
//! **[`instrument`]**: The recording drawing-context proxy.
//!
//! **[`inspector`]**: The per-thread service tying everything together.
//!
//! **[`group`]**: Markup rendered onto a group of meshes.
//!
//! **[`trace`]**: [`InspectSink`](trace::InspectSink) trait and event types,
//! with a shared [`Tracer`](trace::Tracer) handle.
//!
//! Host contracts live in [`dom`], [`surface`], [`draw`] and [`scene`].

pub mod capture;
pub mod dom;
pub mod draw;
pub mod error;
pub mod ghost;
pub mod group;
pub mod inspector;
pub mod instrument;
pub mod provenance;
pub mod resolve;
pub mod scene;
pub mod session;
pub mod surface;
pub mod trace;
pub mod tracker;
pub mod transform;
pub mod weak;

#[cfg(test)]
mod testing;

pub use error::CaptureError;
pub use inspector::{Host, Inspector, InspectorConfig};
