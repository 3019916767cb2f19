// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Sessions become duration slices on one track. Recaptures become async
//! slices keyed by request number, ending on apply or discard. Resolution
//! misses and ghost flushes are instants.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::pretty::reason_name;
use crate::recorder::{RecordedEvent, decode};

const SESSION_TID: u32 = 0;
const RENDER_TID: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Recorded timestamps are written as-is and read as microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for stamped in decode(bytes) {
        let ts = stamped.at;
        match stamped.event {
            RecordedEvent::SessionOpened(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Session",
                    "cat": "Sync",
                    "ts": ts,
                    "pid": 0,
                    "tid": SESSION_TID,
                    "args": {
                        "session": e.session,
                        "source": e.source.as_str(),
                        "width": e.width,
                        "height": e.height,
                        "was_connected": e.was_connected,
                    }
                }));
            }
            RecordedEvent::SessionClosed(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Session",
                    "cat": "Sync",
                    "ts": ts,
                    "pid": 0,
                    "tid": SESSION_TID,
                    "args": {
                        "reattached": e.reattached,
                        "recaptures": e.recaptures,
                    }
                }));
            }
            RecordedEvent::RecaptureStarted(e) => {
                events.push(json!({
                    "ph": "b",
                    "name": "Recapture",
                    "cat": "Capture",
                    "id": e.request,
                    "ts": ts,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "args": { "session": e.session }
                }));
            }
            RecordedEvent::RecaptureApplied(e) => {
                events.push(json!({
                    "ph": "e",
                    "name": "Recapture",
                    "cat": "Capture",
                    "id": e.request,
                    "ts": ts,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "args": { "outcome": "applied" }
                }));
            }
            RecordedEvent::RecaptureDiscarded(e) => {
                events.push(json!({
                    "ph": "e",
                    "name": "Recapture",
                    "cat": "Capture",
                    "id": e.request,
                    "ts": ts,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "args": { "outcome": reason_name(e.reason) }
                }));
            }
            RecordedEvent::ResolutionMiss(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ResolutionMiss",
                    "cat": "Resolve",
                    "ts": ts,
                    "pid": 0,
                    "tid": SESSION_TID,
                    "s": "t",
                    "args": {
                        "material_index": e.material_index,
                        "searched": e.searched,
                    }
                }));
            }
            RecordedEvent::GhostFlush(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "GhostFlush",
                    "cat": "Ghost",
                    "ts": ts,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": { "removed": e.removed }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(&mut *writer, &events).map_err(io::Error::other)?;
    writer.flush()
}
