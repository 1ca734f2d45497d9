//! Canvas session: the interaction state machine and the actions it drives.
//!
//! A [`Canvas`] ties together the layer store, the local history, this
//! connection's presence and the camera. Pointer and keyboard handlers live
//! in [`crate::events`]; this module holds the state and the discrete
//! actions of the selection toolbar.

use crate::camera::Camera;
use crate::config::CanvasConfig;
use crate::geometry::{
    ResizeHandle, Side, Xywh, bounding_box_of_set, hit_test_layer, hit_test_resize_handle,
    resize_handles,
};
use crate::history::{Change, History};
use crate::layers::{LayerId, LayerPatch, LayerType, Rgb};
use crate::presence::{Participant, Participants, Presence, PresenceChannel, participants, selection_colors};
use crate::storage::{ReplicatedStorage, StoreResult};
use crate::store::{LayerStore, Reorder};
use crate::tools::Tool;
use kurbo::Point;
use std::collections::HashMap;

/// Client-local interaction mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CanvasState {
    #[default]
    None,
    /// Pointer is down on empty canvas, not yet dragged far enough.
    Pressing { origin: Point },
    /// Drag-rectangle selection.
    SelectionNet { origin: Point, current: Option<Point> },
    /// Dragging the selected layers.
    Translating { current: Point },
    /// Waiting for a click to insert a layer.
    Inserting { layer_type: LayerType },
    /// Dragging a resize handle of the sole selected layer.
    Resizing { initial_bounds: Xywh, corner: Side },
    /// Freehand drawing.
    Pencil,
}

/// Log a backend failure on its way out to the host.
pub(crate) fn logged<T>(result: StoreResult<T>, action: &str) -> StoreResult<T> {
    if let Err(e) = &result {
        log::error!("{action} failed: {e}");
    }
    result
}

/// One open board as seen by one connection.
pub struct Canvas<S, P> {
    pub(crate) board_id: String,
    pub(crate) config: CanvasConfig,
    pub(crate) store: LayerStore<S>,
    pub(crate) history: History,
    pub(crate) channel: P,
    pub(crate) presence: Presence,
    pub(crate) camera: Camera,
    pub(crate) state: CanvasState,
    pub(crate) last_used_color: Rgb,
    /// Changes of the action in progress that did not come from the store.
    pending: Vec<Change>,
}

impl<S: ReplicatedStorage, P: PresenceChannel> Canvas<S, P> {
    /// Open a session on a board.
    pub fn open(board_id: impl Into<String>, storage: S, channel: P, config: CanvasConfig) -> Self {
        let board_id = board_id.into();
        let store = LayerStore::new(storage, config.max_layers);
        log::info!(
            "Opened board {board_id} as connection {} with {} layers",
            channel.connection_id(),
            store.len()
        );
        let mut canvas = Self {
            board_id,
            history: History::new(config.max_history),
            config,
            store,
            channel,
            presence: Presence::default(),
            camera: Camera::new(),
            state: CanvasState::None,
            last_used_color: Rgb::BLACK,
            pending: Vec::new(),
        };
        canvas.publish();
        canvas
    }

    /// End the session, leaving the presence room. Returns the storage.
    pub fn close(mut self) -> S {
        self.presence = Presence::default();
        self.publish();
        self.channel.leave();
        log::info!("Closed board {}", self.board_id);
        self.store.into_storage()
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn store(&self) -> &LayerStore<S> {
        &self.store
    }

    /// Mutable store access. Writes to the storage underneath, such as
    /// remote imports, bypass history; store operations join the next step.
    pub fn store_mut(&mut self) -> &mut LayerStore<S> {
        &mut self.store
    }

    pub fn channel(&self) -> &P {
        &self.channel
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn selection(&self) -> &[LayerId] {
        &self.presence.selection
    }

    pub fn last_used_color(&self) -> Rgb {
        self.last_used_color
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub(crate) fn publish(&mut self) {
        self.channel.publish(&self.presence);
    }

    /// Replace the selection and broadcast it. History-marked replacements
    /// become part of the current undo step.
    pub(crate) fn set_selection(&mut self, selection: Vec<LayerId>, add_to_history: bool) {
        if add_to_history {
            self.pending.extend(self.store.take_changes());
            self.pending.push(Change::Selection {
                before: self.presence.selection.clone(),
                after: selection.clone(),
            });
        }
        self.presence.selection = selection;
        self.publish();
    }

    /// Hand the changes of the finished action to the history.
    pub(crate) fn end_action(&mut self) {
        let mut changes = std::mem::take(&mut self.pending);
        changes.extend(self.store.take_changes());
        self.history.record(changes);
    }

    fn apply_changes(&mut self, changes: &[Change]) -> StoreResult<()> {
        let mut selection = None;
        for change in changes {
            match change {
                Change::Selection { after, .. } => selection = Some(after.clone()),
                _ => self.store.apply_change(change)?,
            }
        }
        if let Some(selection) = selection {
            self.presence.selection = selection.into_iter().filter(|id| self.store.contains(id)).collect();
            self.publish();
        }
        self.store.take_changes();
        Ok(())
    }

    /// Revert the last local step. Leaves the canvas state untouched.
    ///
    /// During a drag the part of the gesture made so far is its own step;
    /// the rest of the drag still folds into one more.
    pub fn undo(&mut self) -> StoreResult<()> {
        self.end_action();
        let result = match self.history.undo() {
            Some(changes) => logged(self.apply_changes(&changes), "Undo"),
            None => Ok(()),
        };
        self.hold_gesture();
        result
    }

    /// Re-apply the last undone step. Leaves the canvas state untouched.
    pub fn redo(&mut self) -> StoreResult<()> {
        self.end_action();
        let result = match self.history.redo() {
            Some(changes) => logged(self.apply_changes(&changes), "Redo"),
            None => Ok(()),
        };
        self.hold_gesture();
        result
    }

    /// Hold the history paused again if a drag outlived an undo or redo.
    fn hold_gesture(&mut self) {
        if matches!(self.state, CanvasState::Translating { .. } | CanvasState::Resizing { .. }) {
            self.history.pause();
        }
    }

    /// Switch tools.
    pub fn select_tool(&mut self, tool: Tool) {
        self.state = tool.initial_state();
    }

    /// The tool matching the current state.
    pub fn tool(&self) -> Tool {
        Tool::from_state(&self.state)
    }

    /// Fill every selected layer and remember the color for new layers.
    pub fn set_fill(&mut self, color: Rgb) -> StoreResult<()> {
        self.last_used_color = color;
        let selection = self.presence.selection.clone();
        let result = selection
            .iter()
            .try_for_each(|id| self.store.update(id, &LayerPatch::fill(color)));
        self.end_action();
        logged(result, "Set fill")
    }

    pub fn move_to_front(&mut self) -> StoreResult<()> {
        self.reorder_selection(Reorder::ToFront)
    }

    pub fn move_to_back(&mut self) -> StoreResult<()> {
        self.reorder_selection(Reorder::ToBack)
    }

    fn reorder_selection(&mut self, direction: Reorder) -> StoreResult<()> {
        let selection = self.presence.selection.clone();
        let result = self.store.reorder(&selection, direction);
        self.end_action();
        logged(result, "Reorder")
    }

    /// Delete the selected layers and clear the selection as one step.
    pub fn delete_selection(&mut self) -> StoreResult<()> {
        let selection = self.presence.selection.clone();
        if selection.is_empty() {
            return Ok(());
        }
        let result = self.store.remove(&selection);
        self.set_selection(Vec::new(), true);
        self.end_action();
        logged(result, "Delete")
    }

    /// Edit the text of a text or note layer.
    pub fn update_layer_value(&mut self, id: &LayerId, value: Option<String>) -> StoreResult<()> {
        let result = self.store.set_value(id, value);
        self.end_action();
        logged(result, "Update text")
    }

    /// Bounds of the selected layers that still exist.
    pub fn selection_bounds(&self) -> Option<Xywh> {
        bounding_box_of_set(
            self.presence
                .selection
                .iter()
                .filter_map(|id| self.store.get(id))
                .map(|layer| layer.bounds()),
        )
    }

    /// Resize handles, offered only when exactly one non-path layer is selected.
    pub fn resize_handles(&self) -> Vec<ResizeHandle> {
        match self.resizable_bounds() {
            Some(bounds) => resize_handles(bounds, self.config.handle_width).to_vec(),
            None => Vec::new(),
        }
    }

    pub(crate) fn resize_handle_at(&self, point: Point) -> Option<(ResizeHandle, Xywh)> {
        let bounds = self.resizable_bounds()?;
        hit_test_resize_handle(bounds, self.config.handle_width, point).map(|handle| (handle, bounds))
    }

    fn resizable_bounds(&self) -> Option<Xywh> {
        let [id] = self.presence.selection.as_slice() else {
            return None;
        };
        let layer = self.store.get(id)?;
        if layer.layer_type() == LayerType::Path {
            return None;
        }
        Some(layer.bounds())
    }

    /// Topmost layer under a canvas point.
    pub fn layer_at(&self, point: Point) -> Option<LayerId> {
        let tolerance = self.config.path_hit_tolerance;
        self.store
            .layers_ordered()
            .into_iter()
            .rev()
            .find(|(_, layer)| hit_test_layer(layer, point, tolerance))
            .map(|(id, _)| id)
    }

    /// Layers selected by other connections, with their connection color.
    pub fn selection_colors(&self) -> HashMap<LayerId, String> {
        selection_colors(&self.channel.others(), &self.config.palette)
    }

    /// Participants summary for the board header.
    pub fn participants(&self) -> Participants {
        let connection_id = self.channel.connection_id();
        let current = Participant {
            connection_id,
            info: self.channel.user(),
            color: self.config.connection_color(connection_id).map(str::to_string),
        };
        participants(
            current,
            &self.channel.others(),
            &self.config.palette,
            self.config.max_shown_participants,
        )
    }

    /// Restore the layer collection invariants after remote state was
    /// merged: order and records in lock-step, then the layer cap.
    pub fn reconcile_merged(&mut self) -> StoreResult<Vec<LayerId>> {
        let mut removed = logged(self.store.reconcile_order(), "Order reconcile")?;
        removed.extend(logged(self.store.reconcile_capacity(), "Capacity reconcile")?);
        if self.presence.selection.iter().any(|id| removed.contains(id)) {
            self.presence.selection.retain(|id| !removed.contains(id));
            self.publish();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Layer, LayerFrame};
    use crate::presence::{PresenceRoom, RoomConnection, UserInfo};
    use crate::storage::MemoryStorage;

    fn user(name: &str) -> UserInfo {
        UserInfo {
            id: name.to_string(),
            name: Some(name.to_string()),
            picture: None,
        }
    }

    fn open(room: &PresenceRoom) -> Canvas<MemoryStorage, RoomConnection> {
        Canvas::open(room.board_id(), MemoryStorage::new(), room.join(user("me")), CanvasConfig::default())
    }

    fn add(canvas: &mut Canvas<MemoryStorage, RoomConnection>, layer_type: LayerType, x: f64) -> LayerId {
        let frame = LayerFrame::new(Xywh::new(x, 0.0, 10.0, 10.0), Rgb::BLACK);
        let id = canvas.store.insert(Layer::new(layer_type, frame)).unwrap().unwrap();
        canvas.end_action();
        id
    }

    #[test]
    fn test_open_defaults() {
        let room = PresenceRoom::new("board-1");
        let canvas = open(&room);
        assert_eq!(canvas.board_id(), "board-1");
        assert_eq!(canvas.state(), CanvasState::None);
        assert_eq!(canvas.last_used_color(), Rgb::BLACK);
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_set_fill_is_one_step() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let a = add(&mut canvas, LayerType::Rectangle, 0.0);
        let b = add(&mut canvas, LayerType::Ellipse, 20.0);
        canvas.set_selection(vec![a, b], true);
        canvas.end_action();

        let red = Rgb::new(255, 0, 0);
        canvas.set_fill(red).unwrap();
        assert_eq!(canvas.last_used_color(), red);
        assert_eq!(canvas.store().get(&a).unwrap().fill(), red);
        assert_eq!(canvas.store().get(&b).unwrap().fill(), red);

        canvas.undo().unwrap();
        assert_eq!(canvas.store().get(&a).unwrap().fill(), Rgb::BLACK);
        assert_eq!(canvas.store().get(&b).unwrap().fill(), Rgb::BLACK);
        assert_eq!(canvas.selection(), &[a, b]);
        // The remembered color is session state, not history
        assert_eq!(canvas.last_used_color(), red);
    }

    #[test]
    fn test_reorder_selection_and_undo() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let ids: Vec<LayerId> = (0..3).map(|i| add(&mut canvas, LayerType::Rectangle, i as f64)).collect();
        canvas.set_selection(vec![ids[0]], false);

        canvas.move_to_front().unwrap();
        assert_eq!(canvas.store().ids(), vec![ids[1], ids[2], ids[0]]);

        canvas.move_to_back().unwrap();
        assert_eq!(canvas.store().ids(), ids);

        canvas.undo().unwrap();
        assert_eq!(canvas.store().ids(), vec![ids[1], ids[2], ids[0]]);
        canvas.undo().unwrap();
        assert_eq!(canvas.store().ids(), ids);
    }

    #[test]
    fn test_delete_selection_and_undo() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let ids: Vec<LayerId> = (0..4).map(|i| add(&mut canvas, LayerType::Note, i as f64)).collect();
        canvas.set_selection(vec![ids[1], ids[2]], true);
        canvas.end_action();

        canvas.delete_selection().unwrap();
        assert_eq!(canvas.store().ids(), vec![ids[0], ids[3]]);
        assert!(canvas.selection().is_empty());

        canvas.undo().unwrap();
        assert_eq!(canvas.store().ids(), ids);
        assert_eq!(canvas.selection(), &[ids[1], ids[2]]);

        canvas.redo().unwrap();
        assert_eq!(canvas.store().len(), 2);
        assert!(canvas.selection().is_empty());
    }

    #[test]
    fn test_update_layer_value() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let id = add(&mut canvas, LayerType::Text, 0.0);

        canvas.update_layer_value(&id, Some("Hello".into())).unwrap();
        assert_eq!(canvas.store().get(&id).unwrap().frame().value.as_deref(), Some("Hello"));

        canvas.undo().unwrap();
        assert!(canvas.store().get(&id).unwrap().frame().value.is_none());

        // Missing ids are ignored
        canvas.update_layer_value(&uuid::Uuid::new_v4(), Some("x".into())).unwrap();
    }

    #[test]
    fn test_selection_bounds_and_handles() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let a = add(&mut canvas, LayerType::Rectangle, 0.0);
        let b = add(&mut canvas, LayerType::Rectangle, 20.0);
        assert!(canvas.selection_bounds().is_none());

        canvas.set_selection(vec![a, b], false);
        assert_eq!(canvas.selection_bounds(), Some(Xywh::new(0.0, 0.0, 30.0, 10.0)));
        assert!(canvas.resize_handles().is_empty());

        canvas.set_selection(vec![a], false);
        assert_eq!(canvas.resize_handles().len(), 8);
    }

    #[test]
    fn test_no_handles_for_paths() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let id = add(&mut canvas, LayerType::Path, 0.0);
        canvas.set_selection(vec![id], false);
        assert!(canvas.resize_handles().is_empty());
    }

    #[test]
    fn test_layer_at_prefers_topmost() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let _below = add(&mut canvas, LayerType::Rectangle, 0.0);
        let above = add(&mut canvas, LayerType::Rectangle, 5.0);
        assert_eq!(canvas.layer_at(Point::new(7.0, 5.0)), Some(above));
        assert_eq!(canvas.layer_at(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn test_selection_colors_and_participants() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let id = add(&mut canvas, LayerType::Rectangle, 0.0);

        let mut other = room.join(user("other"));
        other.publish(&Presence {
            selection: vec![id],
            ..Default::default()
        });

        let colors = canvas.selection_colors();
        assert_eq!(colors.get(&id).map(String::as_str), Some("#FFB399"));

        let summary = canvas.participants();
        assert_eq!(summary.shown.len(), 1);
        assert_eq!(summary.more, 0);
        assert_eq!(summary.current.info.name.as_deref(), Some("me"));
    }

    #[test]
    fn test_close_leaves_room() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        add(&mut canvas, LayerType::Rectangle, 0.0);
        assert_eq!(room.connection_count(), 1);

        let storage = canvas.close();
        assert_eq!(room.connection_count(), 0);
        assert_eq!(storage.layer_count(), 1);
    }

    #[test]
    fn test_undo_skips_concurrently_deleted_layer() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let id = add(&mut canvas, LayerType::Rectangle, 0.0);
        canvas.store.update(&id, &LayerPatch::position(50.0, 50.0)).unwrap();
        canvas.end_action();

        // Another connection deletes the layer
        canvas.store_mut().storage_mut().delete_layer(&id).unwrap();
        canvas.store_mut().storage_mut().delete_id(0).unwrap();

        canvas.undo().unwrap();
        assert!(canvas.store().get(&id).is_none());
    }

    #[test]
    fn test_reconcile_merged_prunes_selection() {
        let room = PresenceRoom::new("board");
        let mut canvas = open(&room);
        let kept = add(&mut canvas, LayerType::Rectangle, 0.0);
        let gone = add(&mut canvas, LayerType::Note, 20.0);
        canvas.set_selection(vec![kept, gone], false);

        // Record deleted remotely while the order entry survived a merge
        canvas.store_mut().storage_mut().delete_layer(&gone).unwrap();
        assert_eq!(canvas.store().ids(), vec![kept]);

        assert_eq!(canvas.reconcile_merged().unwrap(), vec![gone]);
        assert_eq!(canvas.selection(), &[kept]);
        assert_eq!(canvas.store().storage().layer_ids(), vec![kept]);
        assert!(canvas.reconcile_merged().unwrap().is_empty());
    }
}
