// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live sync between a relocated DOM source and its mesh texture.
//!
//! A [`SyncController`] owns the single inspection overlay. Opening a
//! session moves the resolved source element (the element itself, not a
//! copy) into the overlay and, for capturable sources, starts watching it.
//! Each mutation batch issues a recapture at the recorded size and scale;
//! results are republished onto the picked mesh's material.
//!
//! Session states run `Idle → Attached → (Mutated → Recaptured)* →
//! Detached`. Every recapture carries a per-session request number. A result
//! is applied only while its session is live and only if it is newer than
//! the last one applied, so out-of-order completions are dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::capture::{CaptureOptions, CaptureService};
use crate::dom::{Element, InlinePlacement, MutationWatch};
use crate::error::CaptureError;
use crate::resolve::CaptureInfo;
use crate::scene::{Texture, publish_texture};
use crate::surface::Surface;
use crate::trace::{
    DiscardReason, RecaptureDiscardedEvent, RecaptureEvent, SessionClosedEvent,
    SessionOpenedEvent, Tracer,
};

/// Lifecycle state of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, not yet attached.
    Idle,
    /// Source relocated into the overlay.
    Attached,
    /// A mutation was seen and a recapture is in flight.
    Mutated,
    /// A recapture result was published.
    Recaptured,
    /// Closed.
    Detached,
}

/// Where the source element sat before the session moved it.
struct Origin {
    placement: InlinePlacement,
    parent: Option<Element>,
    next_sibling: Option<Element>,
}

/// One open (or closed) inspection session.
pub struct Session {
    id: u64,
    info: CaptureInfo,
    origin: Origin,
    state: Cell<SessionState>,
    watch: RefCell<Option<Box<dyn MutationWatch>>>,
    requested: Cell<u64>,
    applied: Cell<u64>,
    recaptures: Cell<u32>,
    texture: RefCell<Option<Rc<Texture>>>,
    tracer: Tracer,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("info", &self.info)
            .field("state", &self.state.get())
            .field("requested", &self.requested.get())
            .field("applied", &self.applied.get())
            .field("recaptures", &self.recaptures.get())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session counter, unique per controller.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The resolved source.
    #[must_use]
    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether the session has not been closed.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state.get() != SessionState::Detached
    }

    /// Number of recapture results published.
    #[must_use]
    pub fn recaptures(&self) -> u32 {
        self.recaptures.get()
    }

    /// The last texture this session published.
    #[must_use]
    pub fn texture(&self) -> Option<Rc<Texture>> {
        self.texture.borrow().clone()
    }

    fn discard(&self, request: u64, reason: DiscardReason) {
        self.tracer.recapture_discarded(&RecaptureDiscardedEvent {
            session: self.id,
            request,
            reason,
        });
    }

    fn apply(&self, request: u64, result: Result<Surface, CaptureError>) {
        if !self.is_live() {
            log::debug!("session {} closed; dropping recapture {request}", self.id);
            self.discard(request, DiscardReason::SessionClosed);
            return;
        }
        let bitmap = match result {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!("recapture {request} of session {} failed: {err}", self.id);
                self.discard(request, DiscardReason::CaptureFailed);
                return;
            }
        };
        if request <= self.applied.get() {
            log::debug!("recapture {request} superseded in session {}", self.id);
            self.discard(request, DiscardReason::Superseded);
            return;
        }
        let Some(mesh) = self.info.mesh.upgrade() else {
            self.discard(request, DiscardReason::MeshDropped);
            return;
        };

        let texture = Rc::new(Texture::from_surface(bitmap));
        let slot = self.info.material_index;
        if publish_texture(&*mesh, slot, &texture, slot.is_none()) == 0 && slot.is_none() {
            publish_texture(&*mesh, None, &texture, false);
        }
        *self.texture.borrow_mut() = Some(texture);
        self.applied.set(request);
        self.recaptures.set(self.recaptures.get() + 1);
        self.state.set(SessionState::Recaptured);
        self.tracer.recapture_applied(&RecaptureEvent {
            session: self.id,
            request,
        });
    }
}

/// Owns the inspection overlay and at most one open [`Session`].
pub struct SyncController {
    me: Weak<Self>,
    overlay: Element,
    capture: Rc<dyn CaptureService>,
    background_color: Option<String>,
    tracer: Tracer,
    sessions: Cell<u64>,
    active: RefCell<Option<Rc<Session>>>,
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncController")
            .field("background_color", &self.background_color)
            .field("sessions", &self.sessions.get())
            .field("active", &self.active.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncController {
    /// Creates a controller presenting sources inside `overlay`.
    ///
    /// `capture` should be the instrumented capture service so recaptures
    /// are themselves tracked.
    #[must_use]
    pub fn new(
        overlay: Element,
        capture: Rc<dyn CaptureService>,
        background_color: Option<String>,
        tracer: Tracer,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            overlay,
            capture,
            background_color,
            tracer,
            sessions: Cell::new(0),
            active: RefCell::new(None),
        })
    }

    /// The overlay element.
    #[must_use]
    pub fn overlay(&self) -> &Element {
        &self.overlay
    }

    /// The open session, if any.
    #[must_use]
    pub fn active(&self) -> Option<Rc<Session>> {
        self.active.borrow().clone()
    }

    /// Opens a session for `info`, closing any open one first.
    pub fn open(&self, info: CaptureInfo) -> Rc<Session> {
        self.close();

        let id = self.sessions.get() + 1;
        self.sessions.set(id);

        let element = Rc::clone(&info.element);
        let origin = Origin {
            placement: InlinePlacement::read(&*element),
            parent: element.parent(),
            next_sibling: element.next_sibling(),
        };

        element.set_style("position", "relative");
        element.set_style("left", "0");
        element.set_style("top", "0");
        element.remove_style("transform");
        self.overlay.append_child(&element);
        if let Some(backdrop) = &info.backdrop {
            self.overlay
                .set_style("background-image", &backdrop.css_background());
            self.overlay.set_style("background-size", "100% 100%");
            self.overlay.set_style("background-repeat", "no-repeat");
        }

        let session = Rc::new(Session {
            id,
            origin,
            state: Cell::new(SessionState::Idle),
            watch: RefCell::new(None),
            requested: Cell::new(0),
            applied: Cell::new(0),
            recaptures: Cell::new(0),
            texture: RefCell::new(None),
            tracer: self.tracer.clone(),
            info,
        });
        session.state.set(SessionState::Attached);

        if session.info.recapturable() {
            let controller = self.me.clone();
            let weak = Rc::downgrade(&session);
            let watch = element.observe(Box::new(move || {
                if let (Some(controller), Some(session)) = (controller.upgrade(), weak.upgrade()) {
                    controller.recapture(&session);
                }
            }));
            *session.watch.borrow_mut() = Some(watch);
        }

        log::debug!(
            "session {id} attached ({:?}, {}x{})",
            session.info.kind,
            session.info.width,
            session.info.height
        );
        self.tracer.session_opened(&SessionOpenedEvent {
            session: id,
            source: session.info.kind.tag(),
            width: session.info.width,
            height: session.info.height,
            was_connected: session.info.was_connected,
        });
        *self.active.borrow_mut() = Some(Rc::clone(&session));
        session
    }

    /// Issues a recapture for `session`.
    ///
    /// Does nothing for closed sessions and for ghost or raw sources. Safe
    /// to call redundantly: each call captures the DOM as it is now.
    pub fn recapture(&self, session: &Rc<Session>) {
        if !session.is_live() || !session.info.recapturable() {
            return;
        }
        session.state.set(SessionState::Mutated);
        let request = session.requested.get() + 1;
        session.requested.set(request);
        self.tracer.recapture_started(&RecaptureEvent {
            session: session.id,
            request,
        });

        let options = CaptureOptions {
            width: Some(session.info.width),
            height: Some(session.info.height),
            scale: Some(session.info.scale),
            background_color: self.background_color.clone(),
        };
        let weak = Rc::downgrade(session);
        let tracer = self.tracer.clone();
        let id = session.id;
        self.capture.capture(
            &session.info.element,
            &options,
            Box::new(move |result| match weak.upgrade() {
                Some(session) => session.apply(request, result),
                None => tracer.recapture_discarded(&RecaptureDiscardedEvent {
                    session: id,
                    request,
                    reason: DiscardReason::SessionClosed,
                }),
            }),
        );
    }

    /// Closes the open session. Returns `false` if none was open.
    pub fn close(&self) -> bool {
        let Some(session) = self.active.borrow_mut().take() else {
            return false;
        };
        if let Some(mut watch) = session.watch.borrow_mut().take() {
            watch.disconnect();
        }
        session.state.set(SessionState::Detached);

        let element = &session.info.element;
        let origin = &session.origin;
        origin.placement.restore(&**element);
        let reattached = match (&origin.parent, session.info.was_connected) {
            (Some(parent), true) => {
                match &origin.next_sibling {
                    Some(sibling) if sibling.parent().is_some_and(|p| p.same_as(&**parent)) => {
                        parent.insert_before(element, sibling);
                    }
                    _ => parent.append_child(element),
                }
                true
            }
            _ => {
                element.remove();
                false
            }
        };
        self.overlay.remove_style("background-image");
        self.overlay.remove_style("background-size");
        self.overlay.remove_style("background-repeat");

        log::debug!("session {} detached (reattached: {reattached})", session.id);
        self.tracer.session_closed(&SessionClosedEvent {
            session: session.id,
            reattached,
            recaptures: session.recaptures.get(),
        });
        true
    }
}
