//! Driftboard Core Library
//!
//! Platform-agnostic core of the Driftboard collaborative whiteboard: the
//! replicated layer model, per-connection presence, local undo history and
//! the canvas interaction state machine.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod crdt;
mod events;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layers;
pub mod presence;
pub mod storage;
pub mod store;
pub mod stroke;
pub mod tools;

pub use camera::Camera;
pub use canvas::{Canvas, CanvasState};
pub use config::CanvasConfig;
pub use crdt::LoroStorage;
pub use geometry::{ResizeHandle, Side, Xywh};
pub use history::{Change, History};
pub use input::{Modifiers, PointerInput, Shortcut};
pub use layers::{Layer, LayerFrame, LayerId, LayerPatch, LayerType, PathLayer, Rgb, StrokePoint};
pub use presence::{ConnectionId, Peer, Presence, PresenceChannel, PresenceRoom, RoomConnection, UserInfo};
pub use storage::{MemoryStorage, ReplicatedStorage, StoreError, StoreResult};
pub use store::{LayerStore, Reorder};
pub use stroke::{StrokeOptions, stroke_to_path};
pub use tools::Tool;
