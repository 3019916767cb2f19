// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured diagnostics for inspection sessions.
//!
//! This module provides an [`InspectSink`] trait with one method per event.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] is a cheap, cloneable handle to an optional boxed sink. The
//! inspector, the drawing instrumentation and the sync controller share one
//! tracer, so installing a sink once covers every component.
//!
//! Human-readable output, recording and Chrome trace export live in
//! `lineage_debug`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which kind of source an inspection session opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// A manual override element.
    Manual,
    /// A captured DOM subtree.
    Captured,
    /// A ghost layer over a drawn surface.
    Ghost,
    /// A live media element used as a texture.
    Raw,
}

impl SourceTag {
    /// Short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Captured => "captured",
            Self::Ghost => "ghost",
            Self::Raw => "raw",
        }
    }
}

/// Why a recapture result was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// The session closed before the capture finished.
    SessionClosed,
    /// A newer recapture was already applied.
    Superseded,
    /// The capture collaborator failed.
    CaptureFailed,
    /// The mesh the session was opened for is gone.
    MeshDropped,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an inspection session attaches its source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOpenedEvent {
    /// Session counter.
    pub session: u64,
    /// Source kind.
    pub source: SourceTag,
    /// Capture width.
    pub width: u32,
    /// Capture height.
    pub height: u32,
    /// Whether the source was attached to the document beforehand.
    pub was_connected: bool,
}

/// Emitted when an inspection session detaches its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionClosedEvent {
    /// Session counter.
    pub session: u64,
    /// Whether the source went back to its original parent.
    pub reattached: bool,
    /// How many recaptures were applied during the session.
    pub recaptures: u32,
}

/// Emitted when a recapture is issued or applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecaptureEvent {
    /// Session counter.
    pub session: u64,
    /// Request counter within the session.
    pub request: u64,
}

/// Emitted when a recapture result is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecaptureDiscardedEvent {
    /// Session counter.
    pub session: u64,
    /// Request counter within the session.
    pub request: u64,
    /// Why it was dropped.
    pub reason: DiscardReason,
}

/// Emitted when a pick resolved to nothing inspectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionMissEvent {
    /// The material slot the pick narrowed to, if any.
    pub material_index: Option<usize>,
    /// Number of material slots searched.
    pub searched: usize,
}

/// Emitted when a full-surface clear flushes a ghost layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostFlushEvent {
    /// Ghost elements removed.
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// InspectSink trait
// ---------------------------------------------------------------------------

/// Receives inspection events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait InspectSink {
    /// Called when a session opens.
    fn on_session_opened(&mut self, e: &SessionOpenedEvent) {
        _ = e;
    }

    /// Called when a session closes.
    fn on_session_closed(&mut self, e: &SessionClosedEvent) {
        _ = e;
    }

    /// Called when a recapture is issued.
    fn on_recapture_started(&mut self, e: &RecaptureEvent) {
        _ = e;
    }

    /// Called when a recapture result replaces the mesh texture.
    fn on_recapture_applied(&mut self, e: &RecaptureEvent) {
        _ = e;
    }

    /// Called when a recapture result is dropped.
    fn on_recapture_discarded(&mut self, e: &RecaptureDiscardedEvent) {
        _ = e;
    }

    /// Called when a pick resolves to nothing.
    fn on_resolution_miss(&mut self, e: &ResolutionMissEvent) {
        _ = e;
    }

    /// Called when a ghost layer is flushed by a full clear.
    fn on_ghost_flush(&mut self, e: &GhostFlushEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// An [`InspectSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl InspectSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer handle
// ---------------------------------------------------------------------------

/// Shared handle to an optional [`InspectSink`].
///
/// Clones share the same slot. Events are dropped while no sink is set.
/// Sinks must not call back into the tracer.
#[derive(Clone, Default)]
pub struct Tracer {
    sink: Rc<RefCell<Option<Box<dyn InspectSink>>>>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("has_sink", &self.sink.borrow().is_some())
            .finish()
    }
}

impl Tracer {
    /// Creates a tracer with no sink.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Installs `sink`, replacing any previous one.
    pub fn set_sink(&self, sink: Box<dyn InspectSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }

    /// Removes and returns the current sink.
    pub fn take_sink(&self) -> Option<Box<dyn InspectSink>> {
        self.sink.borrow_mut().take()
    }

    #[inline]
    fn emit(&self, f: impl FnOnce(&mut dyn InspectSink)) {
        if let Ok(mut slot) = self.sink.try_borrow_mut()
            && let Some(sink) = slot.as_mut()
        {
            f(sink.as_mut());
        }
    }

    /// Emits a [`SessionOpenedEvent`].
    pub fn session_opened(&self, e: &SessionOpenedEvent) {
        self.emit(|s| s.on_session_opened(e));
    }

    /// Emits a [`SessionClosedEvent`].
    pub fn session_closed(&self, e: &SessionClosedEvent) {
        self.emit(|s| s.on_session_closed(e));
    }

    /// Emits a recapture-started [`RecaptureEvent`].
    pub fn recapture_started(&self, e: &RecaptureEvent) {
        self.emit(|s| s.on_recapture_started(e));
    }

    /// Emits a recapture-applied [`RecaptureEvent`].
    pub fn recapture_applied(&self, e: &RecaptureEvent) {
        self.emit(|s| s.on_recapture_applied(e));
    }

    /// Emits a [`RecaptureDiscardedEvent`].
    pub fn recapture_discarded(&self, e: &RecaptureDiscardedEvent) {
        self.emit(|s| s.on_recapture_discarded(e));
    }

    /// Emits a [`ResolutionMissEvent`].
    pub fn resolution_miss(&self, e: &ResolutionMissEvent) {
        self.emit(|s| s.on_resolution_miss(e));
    }

    /// Emits a [`GhostFlushEvent`].
    pub fn ghost_flush(&self, e: &GhostFlushEvent) {
        self.emit(|s| s.on_ghost_flush(e));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
