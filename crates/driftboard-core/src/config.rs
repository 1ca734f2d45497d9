//! Session configuration.

use crate::stroke::StrokeOptions;
use serde::{Deserialize, Serialize};

/// Maximum number of layers on a board.
pub const MAX_LAYERS: usize = 100;
/// Manhattan distance a press must travel before it becomes a selection net.
pub const SELECTION_NET_THRESHOLD: f64 = 7.0;
/// Width and height of layers created by the insert tools.
pub const DEFAULT_INSERT_SIZE: f64 = 100.0;
/// Side length of a resize handle.
pub const HANDLE_WIDTH: f64 = 8.0;
/// Maximum undo steps kept per session.
pub const MAX_UNDO_HISTORY: usize = 50;
/// Colors assigned to connections.
pub const DEFAULT_PALETTE: [&str; 5] = ["#FF6633", "#FFB399", "#FF33FF", "#FFFF99", "#00B3E6"];

/// Tunables of a canvas session. Missing JSON keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub max_layers: usize,
    pub selection_net_threshold: f64,
    pub insert_size: f64,
    pub handle_width: f64,
    /// Distance within which a pointer hits a freehand path.
    pub path_hit_tolerance: f64,
    pub max_history: usize,
    pub stroke: StrokeOptions,
    pub palette: Vec<String>,
    /// Other participants listed before collapsing into a "+N" count.
    pub max_shown_participants: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_layers: MAX_LAYERS,
            selection_net_threshold: SELECTION_NET_THRESHOLD,
            insert_size: DEFAULT_INSERT_SIZE,
            handle_width: HANDLE_WIDTH,
            path_hit_tolerance: HANDLE_WIDTH,
            max_history: MAX_UNDO_HISTORY,
            stroke: StrokeOptions::default(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            max_shown_participants: 2,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Color assigned to a connection.
    pub fn connection_color(&self, connection_id: u32) -> Option<&str> {
        crate::geometry::connection_color(connection_id, &self.palette).map(String::as_str)
    }
}
