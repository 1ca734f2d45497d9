//! Pointer and keyboard input as seen by the canvas.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pressure reported by devices without pressure sensing.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A pointer sample in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub position: Point,
    pub pressure: f64,
}

impl PointerInput {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            pressure: DEFAULT_PRESSURE,
        }
    }

    pub fn with_pressure(position: Point, pressure: f64) -> Self {
        Self { position, pressure }
    }
}

impl From<Point> for PointerInput {
    fn from(position: Point) -> Self {
        Self::new(position)
    }
}

/// Global keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
}

impl Shortcut {
    /// Ctrl/Cmd+Z is undo, with Shift it is redo.
    pub fn from_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        if !modifiers.command() || !key.eq_ignore_ascii_case("z") {
            return None;
        }
        if modifiers.shift {
            Some(Shortcut::Redo)
        } else {
            Some(Shortcut::Undo)
        }
    }
}
