//! Layer records: the drawable objects stored on a board.

mod path;

pub use path::{PathLayer, StrokePoint};

use crate::geometry::Xywh;
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for layers.
pub type LayerId = Uuid;

/// An opaque RGB color, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation, e.g. `#ff6633`.
    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for Rgb {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b)
    }
}

impl From<Rgb> for Color {
    fn from(color: Rgb) -> Self {
        Color::from_rgb8(color.r, color.g, color.b)
    }
}

/// Discriminant of a [`Layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Rectangle,
    Ellipse,
    Path,
    Text,
    Note,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Rectangle => "rectangle",
            LayerType::Ellipse => "ellipse",
            LayerType::Path => "path",
            LayerType::Text => "text",
            LayerType::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rectangle" => Some(LayerType::Rectangle),
            "ellipse" => Some(LayerType::Ellipse),
            "path" => Some(LayerType::Path),
            "text" => Some(LayerType::Text),
            "note" => Some(LayerType::Note),
            _ => None,
        }
    }
}

/// Fields shared by every layer variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Rgb,
    /// Text payload of text and note layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LayerFrame {
    pub fn new(bounds: Xywh, fill: Rgb) -> Self {
        Self {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            fill,
            value: None,
        }
    }

    pub fn bounds(&self) -> Xywh {
        Xywh::new(self.x, self.y, self.width, self.height)
    }
}

/// A drawable object on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Rectangle(LayerFrame),
    Ellipse(LayerFrame),
    Path(PathLayer),
    Text(LayerFrame),
    Note(LayerFrame),
}

impl Layer {
    /// Create a layer of the given type. Paths start with no points.
    pub fn new(layer_type: LayerType, frame: LayerFrame) -> Self {
        match layer_type {
            LayerType::Rectangle => Layer::Rectangle(frame),
            LayerType::Ellipse => Layer::Ellipse(frame),
            LayerType::Text => Layer::Text(frame),
            LayerType::Note => Layer::Note(frame),
            LayerType::Path => Layer::Path(PathLayer {
                frame,
                points: Vec::new(),
            }),
        }
    }

    pub fn layer_type(&self) -> LayerType {
        match self {
            Layer::Rectangle(_) => LayerType::Rectangle,
            Layer::Ellipse(_) => LayerType::Ellipse,
            Layer::Path(_) => LayerType::Path,
            Layer::Text(_) => LayerType::Text,
            Layer::Note(_) => LayerType::Note,
        }
    }

    pub fn frame(&self) -> &LayerFrame {
        match self {
            Layer::Rectangle(f) | Layer::Ellipse(f) | Layer::Text(f) | Layer::Note(f) => f,
            Layer::Path(path) => &path.frame,
        }
    }

    pub fn frame_mut(&mut self) -> &mut LayerFrame {
        match self {
            Layer::Rectangle(f) | Layer::Ellipse(f) | Layer::Text(f) | Layer::Note(f) => f,
            Layer::Path(path) => &mut path.frame,
        }
    }

    pub fn bounds(&self) -> Xywh {
        self.frame().bounds()
    }

    pub fn fill(&self) -> Rgb {
        self.frame().fill
    }

    /// Box-local stroke points; empty for non-path layers.
    pub fn points(&self) -> &[StrokePoint] {
        match self {
            Layer::Path(path) => &path.points,
            _ => &[],
        }
    }
}

/// A partial update of a layer's fields.
///
/// `value` is doubly optional: `Some(None)` clears the text payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub fill: Option<Rgb>,
    pub value: Option<Option<String>>,
}

impl LayerPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bounds(bounds: Xywh) -> Self {
        Self {
            x: Some(bounds.x),
            y: Some(bounds.y),
            width: Some(bounds.width),
            height: Some(bounds.height),
            ..Default::default()
        }
    }

    pub fn fill(fill: Rgb) -> Self {
        Self {
            fill: Some(fill),
            ..Default::default()
        }
    }

    pub fn value(value: Option<String>) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write every present field into `layer`.
    pub fn apply(&self, layer: &mut Layer) {
        let frame = layer.frame_mut();
        if let Some(x) = self.x {
            frame.x = x;
        }
        if let Some(y) = self.y {
            frame.y = y;
        }
        if let Some(width) = self.width {
            frame.width = width;
        }
        if let Some(height) = self.height {
            frame.height = height;
        }
        if let Some(fill) = self.fill {
            frame.fill = fill;
        }
        if let Some(value) = &self.value {
            frame.value = value.clone();
        }
    }

    /// The current values in `layer` of the fields this patch touches.
    pub fn capture(&self, layer: &Layer) -> LayerPatch {
        let frame = layer.frame();
        LayerPatch {
            x: self.x.map(|_| frame.x),
            y: self.y.map(|_| frame.y),
            width: self.width.map(|_| frame.width),
            height: self.height.map(|_| frame.height),
            fill: self.fill.map(|_| frame.fill),
            value: self.value.as_ref().map(|_| frame.value.clone()),
        }
    }

    /// Fields of `self` win; fields only present in `other` are taken from it.
    pub fn or(self, other: LayerPatch) -> LayerPatch {
        LayerPatch {
            x: self.x.or(other.x),
            y: self.y.or(other.y),
            width: self.width.or(other.width),
            height: self.height.or(other.height),
            fill: self.fill.or(other.fill),
            value: self.value.or(other.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> LayerFrame {
        LayerFrame::new(Xywh::new(10.0, 20.0, 100.0, 50.0), Rgb::new(255, 0, 0))
    }

    #[test]
    fn test_rgb_to_css() {
        assert_eq!(Rgb::new(255, 102, 51).to_css(), "#ff6633");
        assert_eq!(Rgb::BLACK.to_css(), "#000000");
    }

    #[test]
    fn test_rgb_peniko_conversion() {
        let color: Color = Rgb::new(1, 2, 3).into();
        assert_eq!(Rgb::from(color), Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_layer_json_shape() {
        let layer = Layer::new(LayerType::Rectangle, frame());
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["type"], "rectangle");
        assert_eq!(json["width"], 100.0);
        assert_eq!(json["fill"]["r"], 255);
        assert!(json.get("value").is_none());

        let back: Layer = serde_json::from_value(json).unwrap();
        assert_eq!(back, layer);
    }

    #[test]
    fn test_path_layer_json_points_are_triples() {
        let layer = Layer::Path(PathLayer {
            frame: frame(),
            points: vec![StrokePoint::new(0.0, 0.0, 0.5), StrokePoint::new(10.0, 5.0, 0.25)],
        });
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["type"], "path");
        assert_eq!(json["points"][1], serde_json::json!([10.0, 5.0, 0.25]));

        let back: Layer = serde_json::from_value(json).unwrap();
        assert_eq!(back.points().len(), 2);
    }

    #[test]
    fn test_patch_apply_and_capture() {
        let mut layer = Layer::new(LayerType::Note, frame());
        let patch = LayerPatch::position(1.0, 2.0);
        let before = patch.capture(&layer);
        assert_eq!(before, LayerPatch::position(10.0, 20.0));

        patch.apply(&mut layer);
        assert!((layer.frame().x - 1.0).abs() < f64::EPSILON);
        assert!((layer.frame().width - 100.0).abs() < f64::EPSILON);

        before.apply(&mut layer);
        assert!((layer.frame().x - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_value_clear() {
        let mut layer = Layer::new(LayerType::Text, frame());
        LayerPatch::value(Some("hello".into())).apply(&mut layer);
        assert_eq!(layer.frame().value.as_deref(), Some("hello"));

        let clear = LayerPatch::value(None);
        assert_eq!(clear.capture(&layer), LayerPatch::value(Some("hello".into())));
        clear.apply(&mut layer);
        assert!(layer.frame().value.is_none());
    }

    #[test]
    fn test_patch_or_prefers_self() {
        let merged = LayerPatch::position(1.0, 1.0).or(LayerPatch::bounds(Xywh::new(5.0, 5.0, 7.0, 8.0)));
        assert_eq!(merged.x, Some(1.0));
        assert_eq!(merged.width, Some(7.0));
        assert!(merged.fill.is_none());
    }
}
