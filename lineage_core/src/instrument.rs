// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing-API instrumentation.
//!
//! [`TrackedContext`] is a capability-preserving proxy over any
//! [`Context2d`]. Every call is forwarded to the wrapped context unchanged;
//! while the shared [`Instrumentation`] service is installed and enabled,
//! the proxy first records side data:
//!
//! - transform calls update the surface's [`TransformTracker`],
//! - text, rectangle and image calls add ghosts to the surface's
//!   [`GhostLayer`], created on first use,
//! - full-surface `fillRect`/`clearRect` flush the ghost layer,
//! - drawing one tracked surface onto an untracked one hands the source's
//!   provenance to the destination, with a backdrop snapshot.
//!
//! Per-surface state is weakly keyed, so it goes away with the surface.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use kurbo::Rect;

use crate::dom::{Document, Element};
use crate::draw::{
    Context2d, DrawImage, ImageSource, TextAlign, TextBaseline, TextMetrics, TextStyle,
};
use crate::ghost::{GhostKind, GhostLayer, coverage, covers};
use crate::provenance::ProvenanceRegistry;
use crate::surface::{Raster, Surface, bounds};
use crate::trace::{GhostFlushEvent, Tracer};
use crate::tracker::TransformTracker;
use crate::transform::SetTransform;
use crate::weak::WeakKeyMap;

/// Instrumentation state for one surface.
#[derive(Debug, Default)]
pub struct SurfaceState {
    /// Transform mirror.
    pub tracker: TransformTracker,
    /// Ghost mirror, once anything ghostable was drawn.
    pub ghost: Option<GhostLayer>,
}

/// The shared drawing-instrumentation service.
pub struct Instrumentation {
    document: Rc<dyn Document>,
    registry: Rc<RefCell<ProvenanceRegistry>>,
    surfaces: RefCell<WeakKeyMap<dyn Raster, SurfaceState>>,
    background_coverage: f64,
    enabled: Cell<bool>,
    installed: Cell<bool>,
    tracer: Tracer,
}

impl fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumentation")
            .field("surfaces", &self.surfaces.borrow().len())
            .field("background_coverage", &self.background_coverage)
            .field("enabled", &self.enabled.get())
            .field("installed", &self.installed.get())
            .finish_non_exhaustive()
    }
}

impl Instrumentation {
    /// Creates an uninstalled, enabled service.
    ///
    /// `background_coverage` is the fraction of a surface a `drawImage`
    /// must cover to count as a background.
    #[must_use]
    pub fn new(
        document: Rc<dyn Document>,
        registry: Rc<RefCell<ProvenanceRegistry>>,
        background_coverage: f64,
        tracer: Tracer,
    ) -> Self {
        Self {
            document,
            registry,
            surfaces: RefCell::new(WeakKeyMap::new()),
            background_coverage,
            enabled: Cell::new(true),
            installed: Cell::new(false),
            tracer,
        }
    }

    /// Installs the instrumentation. Returns `false` if it already was.
    pub fn install(&self) -> bool {
        if self.installed.replace(true) {
            return false;
        }
        log::debug!("drawing instrumentation installed");
        true
    }

    /// Whether [`install`](Self::install) has run.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Turns recording on or off without uninstalling.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Whether recording is turned on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Whether drawing calls are currently being recorded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.installed.get() && self.enabled.get()
    }

    /// Wraps `inner` in a recording proxy.
    pub fn wrap<C: Context2d>(self: &Rc<Self>, inner: C) -> TrackedContext<C> {
        TrackedContext {
            surface: inner.surface(),
            inner,
            instrumentation: Rc::clone(self),
        }
    }

    /// A copy of the transform tracker of `surface`, if it was touched.
    #[must_use]
    pub fn tracker(&self, surface: &Surface) -> Option<TransformTracker> {
        self.surfaces.borrow().get(surface).map(|s| s.tracker.clone())
    }

    /// The ghost container of `surface`, if it has a ghost layer.
    #[must_use]
    pub fn ghost_container(&self, surface: &Surface) -> Option<Element> {
        self.surfaces
            .borrow()
            .get(surface)
            .and_then(|s| s.ghost.as_ref())
            .map(|g| Rc::clone(g.container()))
    }

    /// Runs `f` against the ghost layer of `surface`, if it has one.
    pub fn with_ghost<R>(&self, surface: &Surface, f: impl FnOnce(&GhostLayer) -> R) -> Option<R> {
        self.surfaces
            .borrow()
            .get(surface)
            .and_then(|s| s.ghost.as_ref())
            .map(f)
    }

    /// Number of surfaces with live state.
    #[must_use]
    pub fn tracked_surfaces(&self) -> usize {
        self.surfaces.borrow().len()
    }

    fn with_state<R>(&self, surface: &Surface, f: impl FnOnce(&mut SurfaceState) -> R) -> R {
        let mut surfaces = self.surfaces.borrow_mut();
        f(surfaces.get_or_insert_with(surface, SurfaceState::default))
    }

    /// Runs `f` against the ghost layer of `surface`, creating it on first
    /// use. Skipped if the layer cannot be created.
    fn with_ghost_mut(
        &self,
        surface: &Surface,
        f: impl FnOnce(&mut GhostLayer, &TransformTracker, &dyn Document),
    ) {
        let document = &*self.document;
        self.with_state(surface, |state| {
            if state.ghost.is_none() {
                state.ghost = GhostLayer::new(document);
                if state.ghost.is_none() {
                    log::warn!("could not create a ghost layer; drawing is not recorded");
                }
            }
            if let Some(ghost) = state.ghost.as_mut() {
                f(ghost, &state.tracker, document);
            }
        });
    }

    fn covers_surface(&self, surface: &Surface, rect: Rect) -> bool {
        self.with_state(surface, |state| covers(&state.tracker, rect, bounds(&**surface)))
    }

    fn flush(&self, surface: &Surface) {
        let removed = self.with_state(surface, |state| state.ghost.as_mut().map(GhostLayer::clear));
        if let Some(removed) = removed {
            log::trace!("full clear flushed {removed} ghost(s)");
            self.tracer.ghost_flush(&GhostFlushEvent { removed });
        }
    }

    fn record_text(
        &self,
        surface: &Surface,
        kind: GhostKind,
        text: &str,
        x: f64,
        y: f64,
        metrics: TextMetrics,
        style: &TextStyle,
    ) {
        self.with_ghost_mut(surface, |ghost, tracker, document| {
            ghost.record_text(document, tracker, kind, text, (x, y).into(), metrics, style);
        });
    }

    fn record_rect(&self, surface: &Surface, kind: GhostKind, rect: Rect, clears: bool) {
        if clears && self.covers_surface(surface, rect) {
            self.flush(surface);
        }
        self.with_ghost_mut(surface, |ghost, tracker, document| {
            ghost.record_rect(document, tracker, kind, rect);
        });
    }

    fn record_image(&self, surface: &Surface, image: &ImageSource, args: DrawImage) {
        let dest = args.destination(image.natural_size());
        let threshold = self.background_coverage;
        let background = self.with_state(surface, |state| {
            coverage(&state.tracker, dest, bounds(&**surface)) >= threshold
        });
        self.with_ghost_mut(surface, |ghost, tracker, document| {
            ghost.record_image(document, tracker, dest, background);
        });

        let ImageSource::Surface(source) = image else {
            return;
        };
        let Some(record) = self.registry.borrow().lookup(source) else {
            return;
        };
        if self.registry.borrow().is_tracked(surface) {
            return;
        }
        let backdrop = match surface.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::debug!("no backdrop for composited surface: {err}");
                None
            }
        };
        self.registry
            .borrow_mut()
            .register(surface, record.inherit(backdrop));
    }
}

/// A [`Context2d`] proxy that records into an [`Instrumentation`] service.
pub struct TrackedContext<C> {
    inner: C,
    surface: Surface,
    instrumentation: Rc<Instrumentation>,
}

impl<C> fmt::Debug for TrackedContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedContext")
            .field("instrumentation", &self.instrumentation)
            .finish_non_exhaustive()
    }
}

impl<C> TrackedContext<C> {
    /// The wrapped context.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the proxy.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn active(&self) -> bool {
        self.instrumentation.is_active()
    }

    /// Mirrors a state or transform call. Runs even while recording is off
    /// so the tracker never drifts from the real context.
    fn track(&self, f: impl FnOnce(&mut TransformTracker)) {
        self.instrumentation
            .with_state(&self.surface, |state| f(&mut state.tracker));
    }
}

impl<C: Context2d> Context2d for TrackedContext<C> {
    fn surface(&self) -> Surface {
        Rc::clone(&self.surface)
    }

    fn save(&mut self) {
        let style = self.inner.text_style();
        self.track(|t| t.save(style));
        self.inner.save();
    }

    fn restore(&mut self) {
        self.track(|t| {
            t.restore();
        });
        self.inner.restore();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.track(|t| t.translate(dx, dy));
        self.inner.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        self.track(|t| t.rotate(angle));
        self.inner.rotate(angle);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.track(|t| t.scale(sx, sy));
        self.inner.scale(sx, sy);
    }

    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.track(|t| t.transform(a, b, c, d, e, f));
        self.inner.transform(a, b, c, d, e, f);
    }

    fn set_transform(&mut self, transform: SetTransform) {
        self.track(|t| t.set_transform(transform));
        self.inner.set_transform(transform);
    }

    fn text_style(&self) -> TextStyle {
        self.inner.text_style()
    }

    fn set_font(&mut self, font: &str) {
        self.inner.set_font(font);
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.inner.set_text_align(align);
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.inner.set_text_baseline(baseline);
    }

    fn global_alpha(&self) -> f64 {
        self.inner.global_alpha()
    }

    fn measure_text(&self, text: &str) -> TextMetrics {
        self.inner.measure_text(text)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        if self.active() {
            let metrics = self.inner.measure_text(text);
            let style = self.inner.text_style();
            self.instrumentation
                .record_text(&self.surface, GhostKind::Text, text, x, y, metrics, &style);
        }
        self.inner.fill_text(text, x, y);
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64) {
        if self.active() {
            let metrics = self.inner.measure_text(text);
            let style = self.inner.text_style();
            self.instrumentation.record_text(
                &self.surface,
                GhostKind::StrokeText,
                text,
                x,
                y,
                metrics,
                &style,
            );
        }
        self.inner.stroke_text(text, x, y);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if self.active() {
            self.instrumentation.record_rect(
                &self.surface,
                GhostKind::FilledRect,
                Rect::new(x, y, x + w, y + h),
                true,
            );
        }
        self.inner.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if self.active() {
            self.instrumentation.record_rect(
                &self.surface,
                GhostKind::StrokedRect,
                Rect::new(x, y, x + w, y + h),
                false,
            );
        }
        self.inner.stroke_rect(x, y, w, h);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if self.active() {
            let rect = Rect::new(x, y, x + w, y + h);
            if self.instrumentation.covers_surface(&self.surface, rect) {
                self.instrumentation.flush(&self.surface);
            }
        }
        self.inner.clear_rect(x, y, w, h);
    }

    fn draw_image(&mut self, image: &ImageSource, args: DrawImage) {
        if self.active() {
            self.instrumentation.record_image(&self.surface, image, args);
        }
        self.inner.draw_image(image, args);
    }
}
