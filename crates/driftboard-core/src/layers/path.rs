//! Freehand path layers.

use super::{LayerFrame, Rgb};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// One sampled pointer position with its pressure.
///
/// Serialized as an `[x, y, pressure]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl StrokePoint {
    pub const fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<[f64; 3]> for StrokePoint {
    fn from([x, y, pressure]: [f64; 3]) -> Self {
        Self { x, y, pressure }
    }
}

impl From<StrokePoint> for [f64; 3] {
    fn from(p: StrokePoint) -> Self {
        [p.x, p.y, p.pressure]
    }
}

/// A committed freehand stroke.
///
/// `points` are relative to the frame origin, so translating the layer only
/// touches `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLayer {
    #[serde(flatten)]
    pub frame: LayerFrame,
    #[serde(default)]
    pub points: Vec<StrokePoint>,
}

impl PathLayer {
    /// Build a path from a draft in canvas coordinates.
    ///
    /// The bounding box comes from the raw points and the points are re-based
    /// to its origin. Returns `None` for drafts shorter than two points.
    pub fn from_draft(draft: &[StrokePoint], fill: Rgb) -> Option<Self> {
        if draft.len() < 2 {
            return None;
        }

        let mut left = f64::INFINITY;
        let mut top = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for p in draft {
            left = left.min(p.x);
            top = top.min(p.y);
            right = right.max(p.x);
            bottom = bottom.max(p.y);
        }

        Some(Self {
            frame: LayerFrame {
                x: left,
                y: top,
                width: right - left,
                height: bottom - top,
                fill,
                value: None,
            },
            points: draft
                .iter()
                .map(|p| StrokePoint::new(p.x - left, p.y - top, p.pressure))
                .collect(),
        })
    }

    /// Points translated back into canvas coordinates.
    pub fn absolute_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points
            .iter()
            .map(|p| Point::new(p.x + self.frame.x, p.y + self.frame.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_point_draft() {
        let draft = [StrokePoint::new(0.0, 0.0, 0.5), StrokePoint::new(10.0, 10.0, 0.5)];
        let path = PathLayer::from_draft(&draft, Rgb::new(1, 2, 3)).unwrap();
        assert!((path.frame.x).abs() < f64::EPSILON);
        assert!((path.frame.y).abs() < f64::EPSILON);
        assert!((path.frame.width - 10.0).abs() < f64::EPSILON);
        assert!((path.frame.height - 10.0).abs() < f64::EPSILON);
        assert_eq!(path.points, draft.to_vec());
        assert_eq!(path.frame.fill, Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_draft_rebased_to_box_origin() {
        let draft = [
            StrokePoint::new(50.0, 80.0, 0.2),
            StrokePoint::new(30.0, 100.0, 0.4),
            StrokePoint::new(70.0, 90.0, 0.6),
        ];
        let path = PathLayer::from_draft(&draft, Rgb::BLACK).unwrap();
        assert!((path.frame.x - 30.0).abs() < f64::EPSILON);
        assert!((path.frame.y - 80.0).abs() < f64::EPSILON);
        assert!((path.frame.width - 40.0).abs() < f64::EPSILON);
        assert!((path.frame.height - 20.0).abs() < f64::EPSILON);
        assert_eq!(path.points[0], StrokePoint::new(20.0, 0.0, 0.2));

        let absolute: Vec<Point> = path.absolute_points().collect();
        assert_eq!(absolute[1], Point::new(30.0, 100.0));
    }

    #[test]
    fn test_short_draft_discarded() {
        assert!(PathLayer::from_draft(&[], Rgb::BLACK).is_none());
        assert!(PathLayer::from_draft(&[StrokePoint::new(1.0, 1.0, 0.5)], Rgb::BLACK).is_none());
    }
}
