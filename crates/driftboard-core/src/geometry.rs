//! Geometry kernel: bounds, intersection, resize math, hit testing and color helpers.
//!
//! Everything here is a pure function of its inputs.

use crate::layers::{Layer, LayerId, Rgb};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Axis-aligned box stored as origin plus extents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Xywh {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Xywh {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn is_zero_area(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.right(), self.bottom())
    }
}

impl From<Rect> for Xywh {
    fn from(rect: Rect) -> Self {
        let rect = rect.abs();
        Xywh::new(rect.x0, rect.y0, rect.width(), rect.height())
    }
}

/// Edge mask of a resize handle. Diagonal handles combine two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(u8);

impl Side {
    pub const TOP: Side = Side(1);
    pub const BOTTOM: Side = Side(2);
    pub const LEFT: Side = Side(4);
    pub const RIGHT: Side = Side(8);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Side(bits & 0b1111)
    }

    pub const fn contains(self, other: Side) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Side {
    type Output = Side;

    fn bitor(self, rhs: Side) -> Side {
        Side(self.0 | rhs.0)
    }
}

impl BitOrAssign for Side {
    fn bitor_assign(&mut self, rhs: Side) {
        self.0 |= rhs.0;
    }
}

/// Smallest box enclosing all of `boxes`, or `None` when empty.
pub fn bounding_box_of_set(boxes: impl IntoIterator<Item = Xywh>) -> Option<Xywh> {
    let mut iter = boxes.into_iter();
    let first = iter.next()?;
    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.right(), first.bottom());
    for b in iter {
        left = left.min(b.x);
        top = top.min(b.y);
        right = right.max(b.right());
        bottom = bottom.max(b.bottom());
    }
    Some(Xywh::new(left, top, right - left, bottom - top))
}

/// Strict-inequality overlap test. A zero-area `rect` never intersects.
pub fn rect_intersect(rect: Xywh, bounds: Xywh) -> bool {
    if rect.is_zero_area() {
        return false;
    }
    rect.x < bounds.right()
        && rect.right() > bounds.x
        && rect.y < bounds.bottom()
        && rect.bottom() > bounds.y
}

/// The normalized rectangle spanned by a selection-net drag.
pub fn selection_net_rect(origin: Point, current: Point) -> Xywh {
    Xywh::new(
        origin.x.min(current.x),
        origin.y.min(current.y),
        (origin.x - current.x).abs(),
        (origin.y - current.y).abs(),
    )
}

/// Ids of the layers whose bounds intersect the net, in the given (z-)order.
pub fn find_intersecting_layers<'a>(
    layers: impl IntoIterator<Item = (LayerId, &'a Layer)>,
    origin: Point,
    current: Point,
) -> Vec<LayerId> {
    let net = selection_net_rect(origin, current);
    layers
        .into_iter()
        .filter(|(_, layer)| rect_intersect(net, layer.bounds()))
        .map(|(id, _)| id)
        .collect()
}

/// Recompute the edges named by `corner` so that they follow `point`.
///
/// Each edge is measured against the opposite edge of `bounds`, so dragging
/// past it flips the box instead of producing negative extents.
pub fn resize_bounds(bounds: Xywh, corner: Side, point: Point) -> Xywh {
    let mut result = bounds;

    if corner.contains(Side::LEFT) {
        result.x = point.x.min(bounds.right());
        result.width = (bounds.right() - point.x).abs();
    }
    if corner.contains(Side::RIGHT) {
        result.x = point.x.min(bounds.x);
        result.width = (point.x - bounds.x).abs();
    }
    if corner.contains(Side::TOP) {
        result.y = point.y.min(bounds.bottom());
        result.height = (bounds.bottom() - point.y).abs();
    }
    if corner.contains(Side::BOTTOM) {
        result.y = point.y.min(bounds.y);
        result.height = (point.y - bounds.y).abs();
    }

    result
}

/// A resize handle on the selection bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeHandle {
    pub corner: Side,
    pub rect: Xywh,
}

/// The eight handles around `bounds`, clockwise from the top-left corner.
pub fn resize_handles(bounds: Xywh, handle_width: f64) -> [ResizeHandle; 8] {
    let half = handle_width / 2.0;
    let Xywh { x, y, width, height } = bounds;
    let handle = |corner: Side, cx: f64, cy: f64| ResizeHandle {
        corner,
        rect: Xywh::new(cx - half, cy - half, handle_width, handle_width),
    };
    [
        handle(Side::TOP | Side::LEFT, x, y),
        handle(Side::TOP, x + width / 2.0, y),
        handle(Side::TOP | Side::RIGHT, x + width, y),
        handle(Side::RIGHT, x + width, y + height / 2.0),
        handle(Side::BOTTOM | Side::RIGHT, x + width, y + height),
        handle(Side::BOTTOM, x + width / 2.0, y + height),
        handle(Side::BOTTOM | Side::LEFT, x, y + height),
        handle(Side::LEFT, x, y + height / 2.0),
    ]
}

/// The handle under `point`, if any.
pub fn hit_test_resize_handle(bounds: Xywh, handle_width: f64, point: Point) -> Option<ResizeHandle> {
    resize_handles(bounds, handle_width)
        .into_iter()
        .find(|handle| handle.rect.contains(point))
}

/// Minimum distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => (point - *single).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Whether `point` (canvas coordinates) hits `layer`.
///
/// Paths are tested against their raw points, never the rendered outline.
pub fn hit_test_layer(layer: &Layer, point: Point, tolerance: f64) -> bool {
    let bounds = layer.bounds();
    match layer {
        Layer::Rectangle(_) | Layer::Text(_) | Layer::Note(_) => bounds.contains(point),
        Layer::Ellipse(_) => {
            let rx = bounds.width / 2.0;
            let ry = bounds.height / 2.0;
            if rx < f64::EPSILON || ry < f64::EPSILON {
                return false;
            }
            let d = point - bounds.center();
            (d.x / rx).powi(2) + (d.y / ry).powi(2) <= 1.0
        }
        Layer::Path(path) => {
            let inflated = bounds.to_rect().inflate(tolerance, tolerance);
            if !inflated.contains(point) {
                return false;
            }
            let points: Vec<Point> = path.absolute_points().collect();
            point_to_polyline_dist(point, &points) <= tolerance
        }
    }
}

/// Readable text color on top of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contrast {
    Black,
    White,
}

impl Contrast {
    pub fn as_css(&self) -> &'static str {
        match self {
            Contrast::Black => "black",
            Contrast::White => "white",
        }
    }
}

/// Pick black text for light fills (luminance above 182), white otherwise.
pub fn contrast_color(color: Rgb) -> Contrast {
    let luminance = 0.299 * color.r as f64 + 0.587 * color.g as f64 + 0.114 * color.b as f64;
    if luminance > 182.0 {
        Contrast::Black
    } else {
        Contrast::White
    }
}

/// Stable per-connection color: `palette[connection_id % palette.len()]`.
pub fn connection_color<T>(connection_id: u32, palette: &[T]) -> Option<&T> {
    if palette.is_empty() {
        return None;
    }
    palette.get(connection_id as usize % palette.len())
}

/// Font size for a text layer of the given extents.
pub fn text_font_size(width: f64, height: f64) -> f64 {
    (height * 0.5).min(width * 0.5).min(100.0)
}

/// Font size for a sticky note of the given extents.
pub fn note_font_size(width: f64, height: f64) -> f64 {
    (height * 0.15).min(width * 0.15).min(95.0)
}
