// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The inspector service.
//!
//! [`Inspector`] wires the components together around one shared
//! [`ProvenanceRegistry`] and one [`Tracer`]:
//!
//! ```text
//!   Context2d ──► TrackedContext ──► Instrumentation ──► ghost layers
//!                                         │
//!   CaptureService ──► InstrumentedCapture ┴──► ProvenanceRegistry
//!                                                     │
//!   PickEvent ──► Resolver ──► CaptureInfo ──► SyncController ──► Material::set_map
//! ```
//!
//! One inspector exists per UI thread. [`Inspector::init`] creates it on
//! first call and returns the existing one afterwards; tests reset it with
//! [`Inspector::reset_global`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::capture::{CaptureService, InstrumentedCapture};
use crate::dom::{Document, Element};
use crate::draw::Context2d;
use crate::instrument::{Instrumentation, TrackedContext};
use crate::provenance::ProvenanceRegistry;
use crate::resolve::{CaptureInfo, Resolver};
use crate::scene::{Mesh, PickEvent};
use crate::session::{Session, SyncController};
use crate::trace::{InspectSink, ResolutionMissEvent, Tracer};

/// Inspector configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct InspectorConfig {
    /// Record drawing-API calls into transform trackers and ghost layers.
    pub instrument_drawing: bool,
    /// Fraction of a surface a drawn image must cover to count as a
    /// background.
    pub background_coverage: f64,
    /// Capture size used for manual overrides and raw media.
    pub override_size: (u32, u32),
    /// Background color forwarded to recaptures.
    pub background_color: Option<String>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            instrument_drawing: true,
            background_coverage: 0.85,
            override_size: (512, 512),
            background_color: None,
        }
    }
}

impl InspectorConfig {
    /// Capture-based tracking only; drawing calls pass through unrecorded.
    #[must_use]
    pub fn capture_only() -> Self {
        Self {
            instrument_drawing: false,
            ..Self::default()
        }
    }
}

/// Host collaborators the inspector needs.
#[derive(Clone)]
pub struct Host {
    /// Element factory.
    pub document: Rc<dyn Document>,
    /// The raw off-screen capture service.
    pub capture: Rc<dyn CaptureService>,
    /// The overlay sources are relocated into while inspected.
    pub overlay: Element,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

thread_local! {
    static GLOBAL: RefCell<Option<Rc<Inspector>>> = const { RefCell::new(None) };
}

/// Provenance tracking, drawing instrumentation and live sync in one place.
pub struct Inspector {
    config: InspectorConfig,
    document: Rc<dyn Document>,
    registry: Rc<RefCell<ProvenanceRegistry>>,
    instrumentation: Rc<Instrumentation>,
    capture: Rc<InstrumentedCapture>,
    resolver: Resolver,
    controller: Rc<SyncController>,
    tracer: Tracer,
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("instrumentation", &self.instrumentation)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Inspector {
    /// Creates a standalone inspector.
    ///
    /// Most embedders want [`Inspector::init`] instead.
    #[must_use]
    pub fn new(config: InspectorConfig, host: Host) -> Rc<Self> {
        let tracer = Tracer::none();
        let registry = Rc::new(RefCell::new(ProvenanceRegistry::new()));
        let instrumentation = Rc::new(Instrumentation::new(
            Rc::clone(&host.document),
            Rc::clone(&registry),
            config.background_coverage,
            tracer.clone(),
        ));
        if config.instrument_drawing {
            instrumentation.install();
        }
        let capture = Rc::new(InstrumentedCapture::new(host.capture, Rc::clone(&registry)));
        let resolver = Resolver::new(
            Rc::clone(&registry),
            Rc::clone(&instrumentation),
            config.override_size,
        );
        let controller = SyncController::new(
            host.overlay,
            Rc::clone(&capture) as Rc<dyn CaptureService>,
            config.background_color.clone(),
            tracer.clone(),
        );
        Rc::new(Self {
            config,
            document: host.document,
            registry,
            instrumentation,
            capture,
            resolver,
            controller,
            tracer,
        })
    }

    /// Returns this thread's inspector, creating it on first call.
    ///
    /// Later calls ignore their arguments.
    pub fn init(config: InspectorConfig, host: Host) -> Rc<Self> {
        GLOBAL.with(|slot| {
            if let Some(existing) = slot.borrow().as_ref() {
                return Rc::clone(existing);
            }
            let inspector = Self::new(config, host);
            *slot.borrow_mut() = Some(Rc::clone(&inspector));
            log::debug!("inspector initialized");
            inspector
        })
    }

    /// This thread's inspector, if [`init`](Self::init) has run.
    #[must_use]
    pub fn global() -> Option<Rc<Self>> {
        GLOBAL.with(|slot| slot.borrow().clone())
    }

    /// Closes any open session and forgets this thread's inspector.
    pub fn reset_global() {
        let previous = GLOBAL.with(|slot| slot.borrow_mut().take());
        if let Some(inspector) = previous {
            inspector.close();
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// The element factory.
    #[must_use]
    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    /// The shared provenance registry.
    #[must_use]
    pub fn registry(&self) -> &Rc<RefCell<ProvenanceRegistry>> {
        &self.registry
    }

    /// The drawing instrumentation service.
    #[must_use]
    pub fn instrumentation(&self) -> &Rc<Instrumentation> {
        &self.instrumentation
    }

    /// The instrumented capture service, a drop-in for the raw one.
    #[must_use]
    pub fn capture(&self) -> Rc<dyn CaptureService> {
        Rc::clone(&self.capture) as Rc<dyn CaptureService>
    }

    /// The diagnostics handle shared by every component.
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Installs a diagnostics sink.
    pub fn set_sink(&self, sink: Box<dyn InspectSink>) {
        self.tracer.set_sink(sink);
    }

    /// Turns drawing instrumentation on or off at runtime.
    pub fn set_instrument_drawing(&self, enabled: bool) {
        if enabled {
            self.instrumentation.install();
        }
        self.instrumentation.set_enabled(enabled);
    }

    /// Wraps a drawing context so its calls are recorded.
    pub fn instrument<C: Context2d>(&self, ctx: C) -> TrackedContext<C> {
        self.instrumentation.wrap(ctx)
    }

    /// Resolves `mesh` without opening a session.
    #[must_use]
    pub fn resolve(&self, mesh: &Rc<dyn Mesh>, material_index: Option<usize>) -> Option<CaptureInfo> {
        self.resolver.resolve(mesh, material_index)
    }

    /// Opens an inspection session for a pick.
    ///
    /// Any open session is closed first. Returns `None`, opening nothing,
    /// when the pick resolves to no source.
    pub fn inspect(&self, pick: &PickEvent) -> Option<Rc<Session>> {
        self.controller.close();
        let material_index = pick.material_index();
        let Some(info) = self.resolver.resolve(&pick.mesh, material_index) else {
            self.tracer.resolution_miss(&ResolutionMissEvent {
                material_index,
                searched: match material_index {
                    Some(_) => 1,
                    None => pick.mesh.materials().len(),
                },
            });
            return None;
        };
        Some(self.controller.open(info))
    }

    /// The open session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Rc<Session>> {
        self.controller.active()
    }

    /// Closes the open session. Returns `false` if none was open.
    pub fn close(&self) -> bool {
        self.controller.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOptions;
    use crate::dom::same_node;
    use crate::group::{Child, MeshGroup};
    use crate::scene::{Hit, Material};
    use crate::session::SessionState;
    use crate::testing::{DeferredCapture, FakeDom, FakeMaterial, FakeMesh, FakeRaster};
    use crate::trace::{RecaptureEvent, SessionClosedEvent};
    use kurbo::Point;

    fn host(dom: &Rc<FakeDom>, capture: &Rc<DeferredCapture>) -> Host {
        let overlay = dom.create_element("div");
        dom.body().append_child(&overlay);
        Host {
            document: dom.clone(),
            capture: capture.clone(),
            overlay,
        }
    }

    #[derive(Default)]
    struct Counts {
        applied: u32,
        misses: u32,
        closed: Vec<SessionClosedEvent>,
    }

    struct CountingSink(Rc<RefCell<Counts>>);

    impl InspectSink for CountingSink {
        fn on_recapture_applied(&mut self, _e: &RecaptureEvent) {
            self.0.borrow_mut().applied += 1;
        }

        fn on_resolution_miss(&mut self, _e: &ResolutionMissEvent) {
            self.0.borrow_mut().misses += 1;
        }

        fn on_session_closed(&mut self, e: &SessionClosedEvent) {
            self.0.borrow_mut().closed.push(*e);
        }
    }

    #[test]
    fn edit_offscreen_source_end_to_end() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::default(), host(&dom, &raw));
        let counts = Rc::new(RefCell::new(Counts::default()));
        inspector.set_sink(Box::new(CountingSink(Rc::clone(&counts))));

        // A 512×512 off-screen container rendered once through the wrapper.
        let label = dom.create_element("span");
        label.set_text("A");
        let material = FakeMaterial::new();
        let mesh = FakeMesh::new(vec![material.clone()]);
        let group = MeshGroup::new(
            &*dom,
            vec![Child::Mesh(mesh.clone()), Child::Markup(label.clone())],
            512,
            512,
        )
        .unwrap();
        group.publish(&inspector);
        raw.complete_next();
        let first = material.map().expect("initial texture");
        assert!(!group.container().is_connected());

        // Pick and inspect.
        let pick = PickEvent {
            mesh: mesh.clone(),
            hit: Some(Hit::Material(0)),
            pointer: Point::new(10.0, 10.0),
        };
        let session = group.on_context_menu(&inspector, &pick).expect("session");
        assert!(same_node(&session.info().element, group.container()));
        assert!(!session.info().was_connected);
        assert!(group.container().is_connected(), "shown in the overlay");

        // Edit the text.
        label.set_text("B");
        assert_eq!(raw.pending(), 1, "exactly one recapture");
        raw.complete_next();

        let second = material.map().expect("recaptured texture");
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(material.updates() >= 2);
        assert_eq!(session.state(), SessionState::Recaptured);
        let bitmap = second.surface().expect("bitmap");
        assert_eq!(FakeRaster::label_of(bitmap), "B");
        assert_eq!((bitmap.width(), bitmap.height()), (512, 512));
        assert!(inspector.registry().borrow().is_tracked(bitmap));

        // Closing detaches the container back off-screen.
        assert!(inspector.close());
        assert!(!group.container().is_connected());
        assert!(group.container().parent().is_none());
        assert_eq!(raw.issued(), 2);

        let counts = counts.borrow();
        assert_eq!(counts.applied, 1);
        assert_eq!(counts.closed.len(), 1);
        assert!(!counts.closed[0].reattached);
        assert_eq!(counts.closed[0].recaptures, 1);
    }

    #[test]
    fn miss_opens_nothing() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::default(), host(&dom, &raw));
        let counts = Rc::new(RefCell::new(Counts::default()));
        inspector.set_sink(Box::new(CountingSink(Rc::clone(&counts))));

        let pick = PickEvent {
            mesh: FakeMesh::new(vec![FakeMaterial::new()]),
            hit: None,
            pointer: Point::ORIGIN,
        };
        assert!(inspector.inspect(&pick).is_none());
        assert!(inspector.session().is_none());
        assert_eq!(counts.borrow().misses, 1);
    }

    #[test]
    fn inspecting_again_closes_the_previous_session() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::default(), host(&dom, &raw));

        let material = FakeMaterial::new();
        let mesh = FakeMesh::new(vec![material]);
        let source = dom.create_element("div");
        dom.body().append_child(&source);
        mesh.metadata().set_source_override(Some(source.clone()));
        let pick = PickEvent {
            mesh,
            hit: None,
            pointer: Point::ORIGIN,
        };

        let first = inspector.inspect(&pick).expect("first");
        let second = inspector.inspect(&pick).expect("second");
        assert!(!first.is_live());
        assert!(second.is_live());
        inspector.close();
        assert!(same_node(&source.parent().expect("parent"), &dom.body()));
    }

    #[test]
    fn manual_override_recaptures_into_untextured_mesh() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::default(), host(&dom, &raw));

        let material = FakeMaterial::new();
        let mesh = FakeMesh::new(vec![material.clone()]);
        let source = dom.create_element("div");
        mesh.metadata().set_source_override(Some(source.clone()));
        let pick = PickEvent {
            mesh,
            hit: None,
            pointer: Point::ORIGIN,
        };
        inspector.inspect(&pick).expect("session");
        source.set_text("edited");
        raw.complete_next();
        let map = material.map().expect("published");
        assert_eq!(map.surface().map(|s| s.width()), Some(512));
    }

    #[test]
    fn capture_only_config_leaves_drawing_alone() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::capture_only(), host(&dom, &raw));
        assert!(!inspector.instrumentation().is_active());
        inspector.set_instrument_drawing(true);
        assert!(inspector.instrumentation().is_active());
    }

    #[test]
    fn instrumented_capture_is_a_drop_in() {
        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let inspector = Inspector::new(InspectorConfig::default(), host(&dom, &raw));
        let el = dom.create_element("div");
        inspector.capture().capture(
            &el,
            &CaptureOptions::sized(16, 16, 1.0),
            Box::new(|_| {}),
        );
        raw.complete_next();
        assert_eq!(inspector.registry().borrow().len(), 1);
    }

    #[test]
    fn global_is_init_once_and_resettable() {
        Inspector::reset_global();
        assert!(Inspector::global().is_none());

        let dom = Rc::new(FakeDom::new());
        let raw = DeferredCapture::new();
        let a = Inspector::init(InspectorConfig::default(), host(&dom, &raw));
        let b = Inspector::init(InspectorConfig::capture_only(), host(&dom, &raw));
        assert!(Rc::ptr_eq(&a, &b));
        assert!(b.config().instrument_drawing);
        assert!(Inspector::global().is_some_and(|g| Rc::ptr_eq(&g, &a)));

        Inspector::reset_global();
        assert!(Inspector::global().is_none());
    }
}
