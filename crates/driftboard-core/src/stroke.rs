//! Pressure-sensitive stroke outlines for freehand paths.
//!
//! A stroke is a polyline of [`StrokePoint`]s. Rendering turns it into a
//! closed outline polygon whose half-width follows the pressure, then into a
//! smooth [`BezPath`]. Hit testing and bounds never use the outline.

use crate::layers::StrokePoint;
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of segments used for each round cap.
const CAP_SEGMENTS: usize = 8;
/// Number of vertices used for a single-dot stroke.
const DOT_SEGMENTS: usize = 16;

/// Outline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeOptions {
    /// Base diameter of the stroke.
    pub size: f64,
    /// How much pressure narrows the stroke (0 = constant width).
    pub thinning: f64,
    /// Minimum spacing between outline vertices, as a fraction of `size`.
    pub smoothing: f64,
    /// How strongly input points are pulled towards the previous point.
    pub streamline: f64,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
        }
    }
}

impl StrokeOptions {
    /// Half-width of the stroke at the given pressure.
    pub fn radius(&self, pressure: f64) -> f64 {
        let pressure = pressure.clamp(0.0, 1.0);
        (self.size * (0.5 - self.thinning * (0.5 - pressure))).max(0.01)
    }
}

/// Compute the closed outline polygon of a stroke.
pub fn stroke_outline(points: &[StrokePoint], options: &StrokeOptions) -> Vec<Point> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    // Streamline: each point moves towards its input by factor t.
    let t = 0.15 + (1.0 - options.streamline.clamp(0.0, 1.0)) * 0.85;
    let mut smoothed: Vec<(Point, f64)> = Vec::with_capacity(points.len());
    let mut prev = first.point();
    smoothed.push((prev, first.pressure));
    for p in &points[1..] {
        let next = prev.lerp(p.point(), t);
        if (next - prev).hypot2() > f64::EPSILON {
            smoothed.push((next, p.pressure));
            prev = next;
        }
    }

    if smoothed.len() == 1 {
        let (center, pressure) = smoothed[0];
        return dot(center, options.radius(pressure));
    }

    let min_dist_sq = (options.size * options.smoothing).powi(2);
    let last = smoothed.len() - 1;
    let mut left: Vec<Point> = Vec::new();
    let mut right: Vec<Point> = Vec::new();
    let mut direction = Vec2::new(1.0, 0.0);

    for (i, &(p, pressure)) in smoothed.iter().enumerate() {
        let before = smoothed[i.saturating_sub(1)].0;
        let after = smoothed[(i + 1).min(last)].0;
        let d = after - before;
        if d.hypot2() > f64::EPSILON {
            direction = d.normalize();
        }
        let normal = Vec2::new(-direction.y, direction.x) * options.radius(pressure);
        let l = p + normal;
        let r = p - normal;

        let spaced = left.last().is_none_or(|&prev: &Point| (l - prev).hypot2() > min_dist_sq);
        if i == 0 || i == last || spaced {
            left.push(l);
            right.push(r);
        }
    }

    let (start, start_pressure) = smoothed[0];
    let (end, end_pressure) = smoothed[last];
    let start_dir = (smoothed[1].0 - start).normalize();
    let end_dir = (end - smoothed[last - 1].0).normalize();

    let mut outline = left;
    outline.extend(cap(end, end_dir, options.radius(end_pressure)));
    outline.extend(right.into_iter().rev());
    outline.extend(cap(start, -start_dir, options.radius(start_pressure)));
    outline
}

/// Interior vertices of a half circle around `center`, sweeping from the
/// left side of `direction` through its tip to the right side.
fn cap(center: Point, direction: Vec2, radius: f64) -> impl Iterator<Item = Point> {
    let normal = Vec2::new(-direction.y, direction.x);
    (1..CAP_SEGMENTS).map(move |i| {
        let theta = PI * i as f64 / CAP_SEGMENTS as f64;
        center + (normal * theta.cos() + direction * theta.sin()) * radius
    })
}

fn dot(center: Point, radius: f64) -> Vec<Point> {
    (0..DOT_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / DOT_SEGMENTS as f64;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

/// Turn an outline polygon into a closed path of quadratic segments.
///
/// Starts at the first vertex, then for every consecutive pair (wrapping
/// around) curves through the first vertex to the pair's midpoint.
pub fn outline_to_path(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = outline.first() else {
        return path;
    };

    path.move_to(first);
    for (i, &p) in outline.iter().enumerate() {
        let next = outline[(i + 1) % outline.len()];
        path.quad_to(p, p.midpoint(next));
    }
    path.close_path();
    path
}

/// Outline a stroke and convert it to a path in one step.
pub fn stroke_to_path(points: &[StrokePoint], options: &StrokeOptions) -> BezPath {
    outline_to_path(&stroke_outline(points, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{PathEl, Shape};

    #[test]
    fn test_radius_follows_pressure() {
        let options = StrokeOptions::default();
        assert!((options.radius(0.5) - 8.0).abs() < 1e-9);
        assert!((options.radius(1.0) - 12.0).abs() < 1e-9);
        assert!(options.radius(0.0) < options.radius(1.0));
    }

    #[test]
    fn test_empty_stroke() {
        assert!(stroke_outline(&[], &StrokeOptions::default()).is_empty());
        assert!(stroke_to_path(&[], &StrokeOptions::default()).elements().is_empty());
    }

    #[test]
    fn test_single_point_is_a_dot() {
        let outline = stroke_outline(&[StrokePoint::new(10.0, 10.0, 0.5)], &StrokeOptions::default());
        assert_eq!(outline.len(), DOT_SEGMENTS);
        for p in outline {
            assert!(((p - Point::new(10.0, 10.0)).hypot() - 8.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outline_surrounds_stroke() {
        let points = [
            StrokePoint::new(0.0, 0.0, 0.5),
            StrokePoint::new(50.0, 0.0, 0.5),
            StrokePoint::new(100.0, 0.0, 0.5),
        ];
        let outline = stroke_outline(&points, &StrokeOptions::default());
        assert!(outline.len() > 4);

        let max_y = outline.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let min_y = outline.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert!(max_y > 0.0 && min_y < 0.0);
    }

    #[test]
    fn test_outline_to_path_commands() {
        let outline = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let path = outline_to_path(&outline);
        let elements = path.elements();

        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0], PathEl::MoveTo(Point::new(0.0, 0.0)));
        assert_eq!(elements[1], PathEl::QuadTo(Point::new(0.0, 0.0), Point::new(5.0, 0.0)));
        assert_eq!(elements[3], PathEl::QuadTo(Point::new(10.0, 10.0), Point::new(5.0, 5.0)));
        assert_eq!(elements[4], PathEl::ClosePath);
        assert!(path.bounding_box().width() > 0.0);
        assert_eq!(path.to_svg(), "M0,0 Q0,0 5,0 Q10,0 10,5 Q10,10 5,5 Z");
    }
}
