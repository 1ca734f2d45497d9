//! Tool system for the whiteboard.

use crate::canvas::CanvasState;
use crate::layers::LayerType;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Tool {
    #[default]
    Select,
    /// Click to insert a layer of this type.
    Insert(LayerType),
    /// Freehand drawing.
    Pencil,
}

impl Tool {
    /// The canvas state a tool click enters.
    pub fn initial_state(self) -> CanvasState {
        match self {
            Tool::Select => CanvasState::None,
            Tool::Pencil | Tool::Insert(LayerType::Path) => CanvasState::Pencil,
            Tool::Insert(layer_type) => CanvasState::Inserting { layer_type },
        }
    }

    /// The tool highlighted for a canvas state.
    pub fn from_state(state: &CanvasState) -> Tool {
        match state {
            CanvasState::Inserting { layer_type } => Tool::Insert(*layer_type),
            CanvasState::Pencil => Tool::Pencil,
            _ => Tool::Select,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_states() {
        assert_eq!(Tool::Select.initial_state(), CanvasState::None);
        assert_eq!(Tool::Insert(LayerType::Path).initial_state(), CanvasState::Pencil);
        assert_eq!(
            Tool::Insert(LayerType::Note).initial_state(),
            CanvasState::Inserting {
                layer_type: LayerType::Note
            }
        );
    }

    #[test]
    fn test_tool_from_state() {
        let state = Tool::Insert(LayerType::Ellipse).initial_state();
        assert_eq!(Tool::from_state(&state), Tool::Insert(LayerType::Ellipse));
        assert_eq!(Tool::from_state(&CanvasState::Translating { current: kurbo::Point::ZERO }), Tool::Select);
    }
}
