// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable event output.
//!
//! [`PrettyPrintSink`] implements [`InspectSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lineage_core::trace::{
    DiscardReason, GhostFlushEvent, InspectSink, RecaptureDiscardedEvent, RecaptureEvent,
    ResolutionMissEvent, SessionClosedEvent, SessionOpenedEvent,
};

/// Writes human-readable event lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

pub(crate) fn reason_name(reason: DiscardReason) -> &'static str {
    match reason {
        DiscardReason::SessionClosed => "session-closed",
        DiscardReason::Superseded => "superseded",
        DiscardReason::CaptureFailed => "capture-failed",
        DiscardReason::MeshDropped => "mesh-dropped",
    }
}

impl<W: Write> InspectSink for PrettyPrintSink<W> {
    fn on_session_opened(&mut self, e: &SessionOpenedEvent) {
        let _ = writeln!(
            self.writer,
            "[session:open] id={} source={} size={}x{} connected={}",
            e.session,
            e.source.as_str(),
            e.width,
            e.height,
            e.was_connected,
        );
    }

    fn on_session_closed(&mut self, e: &SessionClosedEvent) {
        let _ = writeln!(
            self.writer,
            "[session:close] id={} reattached={} recaptures={}",
            e.session, e.reattached, e.recaptures,
        );
    }

    fn on_recapture_started(&mut self, e: &RecaptureEvent) {
        let _ = writeln!(
            self.writer,
            "[recapture:start] session={} request={}",
            e.session, e.request,
        );
    }

    fn on_recapture_applied(&mut self, e: &RecaptureEvent) {
        let _ = writeln!(
            self.writer,
            "[recapture:apply] session={} request={}",
            e.session, e.request,
        );
    }

    fn on_recapture_discarded(&mut self, e: &RecaptureDiscardedEvent) {
        let _ = writeln!(
            self.writer,
            "[recapture:drop] session={} request={} reason={}",
            e.session,
            e.request,
            reason_name(e.reason),
        );
    }

    fn on_resolution_miss(&mut self, e: &ResolutionMissEvent) {
        let slot = match e.material_index {
            Some(i) => i.to_string(),
            None => String::from("any"),
        };
        let _ = writeln!(
            self.writer,
            "[resolve:miss] slot={slot} searched={}",
            e.searched,
        );
    }

    fn on_ghost_flush(&mut self, e: &GhostFlushEvent) {
        let _ = writeln!(self.writer, "[ghost:flush] removed={}", e.removed);
    }
}
