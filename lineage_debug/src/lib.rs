// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and Chrome trace export for lineage
//! inspection events.
//!
//! This crate provides [`InspectSink`](lineage_core::trace::InspectSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording into a shared
//!   [`recorder::Recording`], with [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from
//!   recorded bytes.

pub mod chrome;
pub mod pretty;
pub mod recorder;
