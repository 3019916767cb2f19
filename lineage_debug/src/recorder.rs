// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`InspectSink`] and encodes events as
//! little-endian records, each prefixed by a tag byte and a `u64`
//! timestamp. The bytes land in a shared [`Recording`], so they stay
//! readable after the sink has been handed to a
//! [`Tracer`](lineage_core::trace::Tracer). [`decode`] reads them back as an
//! iterator of [`Stamped`] events.
//!
//! Timestamps come from a caller-supplied clock. The default clock counts
//! events, which keeps recordings deterministic.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lineage_core::trace::{
    DiscardReason, GhostFlushEvent, InspectSink, RecaptureDiscardedEvent, RecaptureEvent,
    ResolutionMissEvent, SessionClosedEvent, SessionOpenedEvent, SourceTag,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SESSION_OPENED: u8 = 1;
const TAG_SESSION_CLOSED: u8 = 2;
const TAG_RECAPTURE_STARTED: u8 = 3;
const TAG_RECAPTURE_APPLIED: u8 = 4;
const TAG_RECAPTURE_DISCARDED: u8 = 5;
const TAG_RESOLUTION_MISS: u8 = 6;
const TAG_GHOST_FLUSH: u8 = 7;

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Shared buffer a [`RecorderSink`] writes into.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl Recording {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink appending to this recording, stamped by event count.
    #[must_use]
    pub fn sink(&self) -> RecorderSink {
        let mut n = 0;
        self.sink_with_clock(Box::new(move || {
            n += 1;
            n
        }))
    }

    /// A sink appending to this recording, stamped by `clock`.
    ///
    /// `clock` should return microseconds.
    #[must_use]
    pub fn sink_with_clock(&self, clock: Box<dyn FnMut() -> u64>) -> RecorderSink {
        RecorderSink {
            buf: Rc::clone(&self.buf),
            clock,
        }
    }

    /// A copy of the recorded bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// Decodes everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Stamped> {
        decode(&self.buf.borrow()).collect()
    }

    /// Discards everything recorded so far.
    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// An [`InspectSink`] that encodes events into a [`Recording`].
pub struct RecorderSink {
    buf: Rc<RefCell<Vec<u8>>>,
    clock: Box<dyn FnMut() -> u64>,
}

impl fmt::Debug for RecorderSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderSink")
            .field("len", &self.buf.borrow().len())
            .finish_non_exhaustive()
    }
}

impl RecorderSink {
    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let at = (self.clock)();
        let mut buf = self.buf.borrow_mut();
        buf.push(tag);
        buf.extend_from_slice(&at.to_le_bytes());
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.borrow_mut().push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.borrow_mut().extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.borrow_mut().extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_option_index(&mut self, v: Option<usize>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(u64::try_from(val).unwrap_or(u64::MAX));
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_source(&mut self, s: SourceTag) {
        self.write_u8(match s {
            SourceTag::Manual => 0,
            SourceTag::Captured => 1,
            SourceTag::Ghost => 2,
            SourceTag::Raw => 3,
        });
    }

    fn write_reason(&mut self, r: DiscardReason) {
        self.write_u8(match r {
            DiscardReason::SessionClosed => 0,
            DiscardReason::Superseded => 1,
            DiscardReason::CaptureFailed => 2,
            DiscardReason::MeshDropped => 3,
        });
    }
}

impl InspectSink for RecorderSink {
    fn on_session_opened(&mut self, e: &SessionOpenedEvent) {
        self.begin(TAG_SESSION_OPENED);
        self.write_u64(e.session);
        self.write_source(e.source);
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_u8(u8::from(e.was_connected));
    }

    fn on_session_closed(&mut self, e: &SessionClosedEvent) {
        self.begin(TAG_SESSION_CLOSED);
        self.write_u64(e.session);
        self.write_u8(u8::from(e.reattached));
        self.write_u32(e.recaptures);
    }

    fn on_recapture_started(&mut self, e: &RecaptureEvent) {
        self.begin(TAG_RECAPTURE_STARTED);
        self.write_u64(e.session);
        self.write_u64(e.request);
    }

    fn on_recapture_applied(&mut self, e: &RecaptureEvent) {
        self.begin(TAG_RECAPTURE_APPLIED);
        self.write_u64(e.session);
        self.write_u64(e.request);
    }

    fn on_recapture_discarded(&mut self, e: &RecaptureDiscardedEvent) {
        self.begin(TAG_RECAPTURE_DISCARDED);
        self.write_u64(e.session);
        self.write_u64(e.request);
        self.write_reason(e.reason);
    }

    fn on_resolution_miss(&mut self, e: &ResolutionMissEvent) {
        self.begin(TAG_RESOLUTION_MISS);
        self.write_option_index(e.material_index);
        self.write_count(e.searched);
    }

    fn on_ghost_flush(&mut self, e: &GhostFlushEvent) {
        self.begin(TAG_GHOST_FLUSH);
        self.write_count(e.removed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`SessionOpenedEvent`].
    SessionOpened(SessionOpenedEvent),
    /// A [`SessionClosedEvent`].
    SessionClosed(SessionClosedEvent),
    /// A recapture-started [`RecaptureEvent`].
    RecaptureStarted(RecaptureEvent),
    /// A recapture-applied [`RecaptureEvent`].
    RecaptureApplied(RecaptureEvent),
    /// A [`RecaptureDiscardedEvent`].
    RecaptureDiscarded(RecaptureDiscardedEvent),
    /// A [`ResolutionMissEvent`].
    ResolutionMiss(ResolutionMissEvent),
    /// A [`GhostFlushEvent`].
    GhostFlush(GhostFlushEvent),
}

/// A decoded event with its timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Stamped {
    /// Clock value when the event was recorded.
    pub at: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Stamped`] events.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|v| usize::try_from(v).unwrap_or(usize::MAX))
    }

    fn read_option_index(&mut self) -> Option<Option<usize>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some((present != 0).then(|| usize::try_from(val).unwrap_or(usize::MAX)))
    }

    fn read_source(&mut self) -> Option<SourceTag> {
        Some(match self.read_u8()? {
            0 => SourceTag::Manual,
            1 => SourceTag::Captured,
            2 => SourceTag::Ghost,
            _ => SourceTag::Raw,
        })
    }

    fn read_reason(&mut self) -> Option<DiscardReason> {
        Some(match self.read_u8()? {
            0 => DiscardReason::SessionClosed,
            1 => DiscardReason::Superseded,
            2 => DiscardReason::CaptureFailed,
            _ => DiscardReason::MeshDropped,
        })
    }

    fn read_recapture(&mut self) -> Option<RecaptureEvent> {
        Some(RecaptureEvent {
            session: self.read_u64()?,
            request: self.read_u64()?,
        })
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_SESSION_OPENED => RecordedEvent::SessionOpened(SessionOpenedEvent {
                session: self.read_u64()?,
                source: self.read_source()?,
                width: self.read_u32()?,
                height: self.read_u32()?,
                was_connected: self.read_bool()?,
            }),
            TAG_SESSION_CLOSED => RecordedEvent::SessionClosed(SessionClosedEvent {
                session: self.read_u64()?,
                reattached: self.read_bool()?,
                recaptures: self.read_u32()?,
            }),
            TAG_RECAPTURE_STARTED => RecordedEvent::RecaptureStarted(self.read_recapture()?),
            TAG_RECAPTURE_APPLIED => RecordedEvent::RecaptureApplied(self.read_recapture()?),
            TAG_RECAPTURE_DISCARDED => {
                RecordedEvent::RecaptureDiscarded(RecaptureDiscardedEvent {
                    session: self.read_u64()?,
                    request: self.read_u64()?,
                    reason: self.read_reason()?,
                })
            }
            TAG_RESOLUTION_MISS => RecordedEvent::ResolutionMiss(ResolutionMissEvent {
                material_index: self.read_option_index()?,
                searched: self.read_count()?,
            }),
            TAG_GHOST_FLUSH => RecordedEvent::GhostFlush(GhostFlushEvent {
                removed: self.read_count()?,
            }),
            _ => return None, // unknown tag → stop iteration
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Stamped;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at = self.read_u64()?;
        let event = self.decode_event(tag)?;
        Some(Stamped { at, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifecycle_is_recorded_in_order() {
        let recording = Recording::new();
        let mut sink = recording.sink();
        sink.on_session_opened(&SessionOpenedEvent {
            session: 1,
            source: SourceTag::Captured,
            width: 512,
            height: 512,
            was_connected: false,
        });
        sink.on_recapture_started(&RecaptureEvent {
            session: 1,
            request: 1,
        });
        sink.on_recapture_applied(&RecaptureEvent {
            session: 1,
            request: 1,
        });
        sink.on_session_closed(&SessionClosedEvent {
            session: 1,
            reattached: false,
            recaptures: 1,
        });

        let events = recording.events();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events.iter().map(|s| s.at).collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
        match &events[0].event {
            RecordedEvent::SessionOpened(e) => {
                assert_eq!(e.source, SourceTag::Captured);
                assert_eq!((e.width, e.height), (512, 512));
                assert!(!e.was_connected);
            }
            other => panic!("expected SessionOpened, got {other:?}"),
        }
        assert!(matches!(events[2].event, RecordedEvent::RecaptureApplied(_)));
        match &events[3].event {
            RecordedEvent::SessionClosed(e) => assert_eq!(e.recaptures, 1),
            other => panic!("expected SessionClosed, got {other:?}"),
        }
    }

    #[test]
    fn discard_reason_and_miss_slot_survive() {
        let recording = Recording::new();
        let mut sink = recording.sink_with_clock(Box::new(|| 42));
        sink.on_recapture_discarded(&RecaptureDiscardedEvent {
            session: 2,
            request: 5,
            reason: DiscardReason::MeshDropped,
        });
        sink.on_resolution_miss(&ResolutionMissEvent {
            material_index: Some(3),
            searched: 1,
        });

        let events = recording.events();
        assert_eq!(
            events[0].event,
            RecordedEvent::RecaptureDiscarded(RecaptureDiscardedEvent {
                session: 2,
                request: 5,
                reason: DiscardReason::MeshDropped,
            })
        );
        assert_eq!(
            events[1],
            Stamped {
                at: 42,
                event: RecordedEvent::ResolutionMiss(ResolutionMissEvent {
                    material_index: Some(3),
                    searched: 1,
                }),
            }
        );
    }

    #[test]
    fn recording_outlives_a_boxed_sink() {
        let recording = Recording::new();
        let tracer = lineage_core::trace::Tracer::none();
        tracer.set_sink(Box::new(recording.sink()));
        tracer.ghost_flush(&GhostFlushEvent { removed: 7 });
        drop(tracer);
        assert_eq!(
            recording.events()[0].event,
            RecordedEvent::GhostFlush(GhostFlushEvent { removed: 7 })
        );
    }

    #[test]
    fn truncated_buffer_stops_cleanly() {
        let recording = Recording::new();
        recording.sink().on_ghost_flush(&GhostFlushEvent { removed: 1 });
        let bytes = recording.bytes();
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 0);
        assert!(decode(&[]).next().is_none());
        recording.clear();
        assert!(recording.events().is_empty());
    }
}
