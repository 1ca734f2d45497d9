//! Camera module for panning the canvas.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Client-local pan offset.
///
/// Only maps pointer coordinates to canvas coordinates; it is never shared
/// and never part of history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform from canvas to screen coordinates, for renderers.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset)
    }

    /// Convert a screen point to canvas coordinates.
    ///
    /// The screen position is rounded to whole pixels first.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        Point::new(
            screen_point.x.round() - self.offset.x,
            screen_point.y.round() - self.offset.y,
        )
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        canvas_point + self.offset
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Scroll-wheel panning moves the view against the wheel delta.
    pub fn wheel(&mut self, delta: Vec2) {
        self.offset -= delta;
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.offset, Vec2::ZERO);
        assert_eq!(camera.screen_to_canvas(Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
    }

    #[test]
    fn test_screen_to_canvas_rounds_then_offsets() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(50.0, 100.0);
        let canvas = camera.screen_to_canvas(Point::new(100.4, 200.6));
        assert!((canvas.x - 50.0).abs() < f64::EPSILON);
        assert!((canvas.y - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(30.0, -20.0);
        let original = Point::new(123.0, 456.0);
        let back = camera.canvas_to_screen(camera.screen_to_canvas(original));
        assert_eq!(back, original);
    }

    #[test]
    fn test_wheel_and_pan() {
        let mut camera = Camera::new();
        camera.wheel(Vec2::new(10.0, 20.0));
        assert_eq!(camera.offset, Vec2::new(-10.0, -20.0));
        camera.pan(Vec2::new(10.0, 20.0));
        assert_eq!(camera.offset, Vec2::ZERO);
    }
}
