// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ghost layers: invisible DOM mirrors of drawing-API output.
//!
//! A [`GhostLayer`] owns a full-size, non-interactive, overflow-clipped
//! container. Each observed drawing call adds one absolutely positioned,
//! transparent element whose origin is the call's anchor projected through
//! the surface's current transform. The 2×2 linear part of that transform is
//! applied as a CSS `matrix()`; translation lives in `left`/`top`.
//!
//! Only text ghosts accept text selection. Placing the container over the
//! surface on screen is the embedder's job.

use std::fmt;

use kurbo::{Point, Rect};

use crate::dom::{Document, Element};
use crate::draw::{TextMetrics, TextStyle};
use crate::tracker::TransformTracker;
use crate::transform::css_matrix;

/// What kind of drawing call a ghost element mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GhostKind {
    /// `fillText`.
    Text,
    /// `strokeText`.
    StrokeText,
    /// `fillRect`.
    FilledRect,
    /// `strokeRect`.
    StrokedRect,
    /// `drawImage`.
    Image,
}

impl GhostKind {
    /// The tag written to the element's `data-ghost` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::StrokeText => "stroke-text",
            Self::FilledRect => "filled-rect",
            Self::StrokedRect => "stroked-rect",
            Self::Image => "image",
        }
    }

    /// Whether ghosts of this kind permit text selection.
    #[must_use]
    pub const fn selectable(self) -> bool {
        matches!(self, Self::Text | Self::StrokeText)
    }
}

/// How a ghost element is placed and whether it takes pointer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Anchor in drawing space (before the current transform).
    pub anchor: Point,
    /// Whether the element receives pointer events.
    pub interactive: bool,
    /// Optional `z-index`.
    pub stack_order: Option<i32>,
    /// Optional `opacity`.
    pub opacity: Option<f64>,
}

/// A recorded ghost element.
#[derive(Clone)]
pub struct GhostEntry {
    /// Which call produced it.
    pub kind: GhostKind,
    /// The DOM element.
    pub element: Element,
    /// Projected origin in surface pixels.
    pub origin: Point,
    /// The CSS matrix applied to the element.
    pub matrix: String,
    /// Whether the element receives pointer events.
    pub interactive: bool,
}

impl fmt::Debug for GhostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostEntry")
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("matrix", &self.matrix)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

/// The ghost mirror of one surface.
pub struct GhostLayer {
    container: Element,
    entries: Vec<GhostEntry>,
}

impl fmt::Debug for GhostLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostLayer")
            .field("container", &"Element")
            .field("entries", &self.entries)
            .finish()
    }
}

impl GhostLayer {
    /// Creates a layer with a fresh container element.
    ///
    /// Returns `None` if the document cannot create the container.
    #[must_use]
    pub fn new(document: &dyn Document) -> Option<Self> {
        let container = document.create_element("div")?;
        container.set_attribute("data-ghost-layer", "");
        container.set_style("position", "absolute");
        container.set_style("left", "0");
        container.set_style("top", "0");
        container.set_style("width", "100%");
        container.set_style("height", "100%");
        container.set_style("overflow", "hidden");
        container.set_style("pointer-events", "none");
        Some(Self {
            container,
            entries: Vec::new(),
        })
    }

    /// The container element holding every ghost.
    #[must_use]
    pub fn container(&self) -> &Element {
        &self.container
    }

    /// Recorded ghosts in draw order.
    #[must_use]
    pub fn entries(&self) -> &[GhostEntry] {
        &self.entries
    }

    /// Number of recorded ghosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every ghost. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.container.remove_children();
        self.entries.clear();
        removed
    }

    /// Positions `element` through `tracker` and appends it to the layer.
    pub fn record(
        &mut self,
        tracker: &TransformTracker,
        kind: GhostKind,
        element: Element,
        placement: Placement,
    ) {
        let xf = tracker.current();
        let origin = tracker.project(placement.anchor);
        let matrix = css_matrix(xf);

        element.set_attribute("data-ghost", kind.as_str());
        element.set_attribute("draggable", "false");
        element.set_style("position", "absolute");
        element.set_style("left", &format!("{}px", origin.x));
        element.set_style("top", &format!("{}px", origin.y));
        element.set_style("transform-origin", "0 0");
        element.set_style("transform", &matrix);
        element.set_style(
            "pointer-events",
            if placement.interactive { "auto" } else { "none" },
        );
        element.set_style(
            "user-select",
            if kind.selectable() { "text" } else { "none" },
        );
        if let Some(z) = placement.stack_order {
            element.set_style("z-index", &z.to_string());
        }
        if let Some(opacity) = placement.opacity {
            element.set_style("opacity", &opacity.to_string());
        }

        self.container.append_child(&element);
        self.entries.push(GhostEntry {
            kind,
            element,
            origin,
            matrix,
            interactive: placement.interactive,
        });
    }

    /// Records a `fillText`/`strokeText` call.
    ///
    /// The ghost is a transparent, `pre`-whitespace span sized to the
    /// measured run, shifted for alignment and up by the ascent so its box
    /// covers the drawn glyphs.
    pub fn record_text(
        &mut self,
        document: &dyn Document,
        tracker: &TransformTracker,
        kind: GhostKind,
        text: &str,
        anchor: Point,
        metrics: TextMetrics,
        style: &TextStyle,
    ) {
        let Some(el) = document.create_element("span") else {
            return;
        };
        el.set_text(text);
        el.set_style("color", "transparent");
        el.set_style("white-space", "pre");
        el.set_style("font", &style.font);
        el.set_style("width", &format!("{}px", metrics.width));
        el.set_style("height", &format!("{}px", metrics.height()));
        el.set_style("line-height", &format!("{}px", metrics.height()));
        el.set_style("cursor", "text");

        let local = Point::new(
            anchor.x + style.align.offset(metrics.width),
            anchor.y - metrics.ascent,
        );
        let stack_order = self.next_stack_order();
        self.record(
            tracker,
            kind,
            el,
            Placement {
                anchor: local,
                interactive: true,
                stack_order: Some(stack_order),
                opacity: None,
            },
        );
    }

    /// Records a `fillRect`/`strokeRect` placeholder.
    pub fn record_rect(
        &mut self,
        document: &dyn Document,
        tracker: &TransformTracker,
        kind: GhostKind,
        rect: Rect,
    ) {
        let Some(el) = sized_placeholder(document, rect) else {
            return;
        };
        self.record(
            tracker,
            kind,
            el,
            Placement {
                anchor: rect.origin(),
                interactive: false,
                stack_order: None,
                opacity: Some(0.0),
            },
        );
    }

    /// Records a `drawImage` placeholder.
    ///
    /// A `background` image sits under everything drawn after it and takes
    /// no pointer input.
    pub fn record_image(
        &mut self,
        document: &dyn Document,
        tracker: &TransformTracker,
        dest: Rect,
        background: bool,
    ) {
        let Some(el) = sized_placeholder(document, dest) else {
            return;
        };
        let stack_order = if background {
            0
        } else {
            self.next_stack_order()
        };
        self.record(
            tracker,
            GhostKind::Image,
            el,
            Placement {
                anchor: dest.origin(),
                interactive: !background,
                stack_order: Some(stack_order),
                opacity: Some(0.0),
            },
        );
    }

    fn next_stack_order(&self) -> i32 {
        i32::try_from(self.entries.len() + 1).unwrap_or(i32::MAX)
    }
}

fn sized_placeholder(document: &dyn Document, rect: Rect) -> Option<Element> {
    let el = document.create_element("div")?;
    el.set_style("width", &format!("{}px", rect.width().abs()));
    el.set_style("height", &format!("{}px", rect.height().abs()));
    Some(el)
}

/// Slack for corners landing exactly on an edge after an inverse transform.
const EDGE_EPSILON: f64 = 1e-9;

/// Whether `rect`, drawn under `tracker`'s transform, covers all of `bounds`.
///
/// Every corner of `bounds` is mapped back into drawing space and must land
/// inside `rect`. A singular transform paints no area and covers nothing.
#[must_use]
pub fn covers(tracker: &TransformTracker, rect: Rect, bounds: Rect) -> bool {
    if bounds.area() <= 0.0 {
        return false;
    }
    let xf = tracker.current();
    let det = xf.determinant();
    if !det.is_finite() || det.abs() < f64::EPSILON {
        return false;
    }
    let inverse = xf.inverse();
    let rect = rect.abs();
    corners(bounds).into_iter().all(|corner| {
        let p = inverse * corner;
        p.x >= rect.x0 - EDGE_EPSILON
            && p.x <= rect.x1 + EDGE_EPSILON
            && p.y >= rect.y0 - EDGE_EPSILON
            && p.y <= rect.y1 + EDGE_EPSILON
    })
}

/// Fraction of `bounds` covered by `rect` drawn under `tracker`'s transform.
///
/// The drawn quadrilateral is clipped against `bounds` exactly, so rotated
/// and skewed draws are not overstated.
#[must_use]
pub fn coverage(tracker: &TransformTracker, rect: Rect, bounds: Rect) -> f64 {
    let area = bounds.area();
    if area <= 0.0 {
        return 0.0;
    }
    let xf = tracker.current();
    let quad: Vec<Point> = corners(rect.abs()).into_iter().map(|p| xf * p).collect();
    (polygon_area(&clip_to_rect(quad, bounds)) / area).clamp(0.0, 1.0)
}

fn corners(r: Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

/// Sutherland-Hodgman clip of a convex polygon against an axis-aligned rect.
fn clip_to_rect(polygon: Vec<Point>, bounds: Rect) -> Vec<Point> {
    // Each edge: signed distance inside the half-plane (>= 0 keeps).
    let edges: [&dyn Fn(Point) -> f64; 4] = [
        &|p: Point| p.x - bounds.x0,
        &|p: Point| bounds.x1 - p.x,
        &|p: Point| p.y - bounds.y0,
        &|p: Point| bounds.y1 - p.y,
    ];
    let mut output = polygon;
    for inside in edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        for (i, &current) in input.iter().enumerate() {
            let previous = input[(i + input.len() - 1) % input.len()];
            let (dc, dp) = (inside(current), inside(previous));
            if dc >= 0.0 {
                if dp < 0.0 {
                    output.push(previous.lerp(current, dp / (dp - dc)));
                }
                output.push(current);
            } else if dp >= 0.0 {
                output.push(previous.lerp(current, dp / (dp - dc)));
            }
        }
    }
    output
}

/// Shoelace area, unsigned.
fn polygon_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}
