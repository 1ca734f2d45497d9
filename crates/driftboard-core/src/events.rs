//! Pointer and keyboard handling for a [`Canvas`].
//!
//! Handlers take screen coordinates and map them through the camera. Each
//! one finishes by handing its changes to the history, so a handler call is
//! the unit of an undo step unless a gesture holds the history paused.

use crate::canvas::{Canvas, CanvasState, logged};
use crate::geometry::{Side, Xywh, find_intersecting_layers, resize_bounds};
use crate::input::{Modifiers, PointerInput, Shortcut};
use crate::layers::{Layer, LayerFrame, LayerId, LayerPatch, LayerType, PathLayer, StrokePoint};
use crate::presence::PresenceChannel;
use crate::storage::{ReplicatedStorage, StoreResult};
use kurbo::{Point, Vec2};

impl<S: ReplicatedStorage, P: PresenceChannel> Canvas<S, P> {
    /// Pointer pressed on the canvas.
    ///
    /// Resize handles and layers under the pointer take precedence over the
    /// empty canvas, except while drawing or inserting.
    pub fn pointer_down(&mut self, input: PointerInput) {
        let point = self.camera.screen_to_canvas(input.position);
        match self.state {
            CanvasState::Inserting { .. } => return,
            CanvasState::Pencil => {
                self.start_drawing(point, input.pressure);
                return;
            }
            _ => {}
        }

        if let Some((handle, bounds)) = self.resize_handle_at(point) {
            self.resize_handle_pointer_down(handle.corner, bounds);
            return;
        }
        if let Some(id) = self.layer_at(point) {
            self.layer_pointer_down(id, input);
            return;
        }

        self.state = CanvasState::Pressing { origin: point };
    }

    /// Pointer pressed on a layer.
    ///
    /// An unselected layer becomes the selection; either way the selection
    /// starts translating as one gesture.
    pub fn layer_pointer_down(&mut self, id: LayerId, input: PointerInput) {
        if matches!(self.state, CanvasState::Pencil | CanvasState::Inserting { .. }) {
            return;
        }
        if !self.store.contains(&id) {
            return;
        }

        self.history.pause();
        let point = self.camera.screen_to_canvas(input.position);
        if !self.presence.selection.contains(&id) {
            self.set_selection(vec![id], true);
        }
        self.state = CanvasState::Translating { current: point };
        self.end_action();
    }

    /// Pointer pressed on a resize handle of the selection.
    pub fn resize_handle_pointer_down(&mut self, corner: Side, initial_bounds: Xywh) {
        self.history.pause();
        self.state = CanvasState::Resizing {
            initial_bounds,
            corner,
        };
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> StoreResult<()> {
        let current = self.camera.screen_to_canvas(input.position);
        let result = match self.state {
            CanvasState::Pressing { origin } => {
                self.start_multi_selection(current, origin);
                Ok(())
            }
            CanvasState::SelectionNet { origin, .. } => {
                self.update_selection_net(current, origin);
                Ok(())
            }
            CanvasState::Translating { .. } => self.translate_selected_layers(current),
            CanvasState::Resizing { .. } => self.resize_selected_layer(current),
            CanvasState::Pencil => {
                self.continue_drawing(current, input.pressure);
                Ok(())
            }
            CanvasState::None | CanvasState::Inserting { .. } => Ok(()),
        };
        self.end_action();

        self.presence.cursor = Some(current);
        self.publish();
        logged(result, "Pointer move")
    }

    /// Pointer released. Always closes the current gesture's history step.
    pub fn pointer_up(&mut self, input: PointerInput) -> StoreResult<()> {
        let point = self.camera.screen_to_canvas(input.position);
        let result = match self.state {
            CanvasState::None | CanvasState::Pressing { .. } => {
                self.unselect_layers();
                self.state = CanvasState::None;
                Ok(())
            }
            CanvasState::Pencil => self.insert_path(),
            CanvasState::Inserting { layer_type } => self.insert_layer(layer_type, point),
            CanvasState::SelectionNet { .. }
            | CanvasState::Translating { .. }
            | CanvasState::Resizing { .. } => {
                self.state = CanvasState::None;
                Ok(())
            }
        };
        self.end_action();
        self.history.resume();
        logged(result, "Pointer up")
    }

    /// Pointer left the canvas.
    pub fn pointer_leave(&mut self) {
        self.presence.cursor = None;
        self.publish();
    }

    /// Scroll-wheel panning.
    pub fn wheel(&mut self, delta: Vec2) {
        self.camera.wheel(delta);
    }

    /// Handle a key press. Returns whether it was a canvas shortcut.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> StoreResult<bool> {
        match Shortcut::from_key(key, modifiers) {
            Some(Shortcut::Undo) => self.undo().map(|_| true),
            Some(Shortcut::Redo) => self.redo().map(|_| true),
            None => Ok(false),
        }
    }

    fn start_multi_selection(&mut self, current: Point, origin: Point) {
        let distance = (current.x - origin.x).abs() + (current.y - origin.y).abs();
        if distance > self.config.selection_net_threshold {
            self.state = CanvasState::SelectionNet {
                origin,
                current: Some(current),
            };
        }
    }

    /// Select whatever the net touches. Not a history boundary.
    fn update_selection_net(&mut self, current: Point, origin: Point) {
        self.state = CanvasState::SelectionNet {
            origin,
            current: Some(current),
        };
        let layers = self.store.layers_ordered();
        self.presence.selection =
            find_intersecting_layers(layers.iter().map(|(id, layer)| (*id, layer)), origin, current);
    }

    fn translate_selected_layers(&mut self, point: Point) -> StoreResult<()> {
        let CanvasState::Translating { current } = self.state else {
            return Ok(());
        };
        let offset = point - current;

        for id in self.presence.selection.clone() {
            let Some((x, y)) = self.store.get(&id).map(|layer| (layer.frame().x, layer.frame().y)) else {
                continue;
            };
            self.store.update(&id, &LayerPatch::position(x + offset.x, y + offset.y))?;
        }

        self.state = CanvasState::Translating { current: point };
        Ok(())
    }

    /// Resize from the bounds captured when the handle was grabbed, so the
    /// same pointer position always yields the same bounds.
    fn resize_selected_layer(&mut self, point: Point) -> StoreResult<()> {
        let CanvasState::Resizing {
            initial_bounds,
            corner,
        } = self.state
        else {
            return Ok(());
        };

        let bounds = resize_bounds(initial_bounds, corner, point);
        match self.presence.selection.first().copied() {
            Some(id) => self.store.update(&id, &LayerPatch::bounds(bounds)),
            None => Ok(()),
        }
    }

    fn unselect_layers(&mut self) {
        if !self.presence.selection.is_empty() {
            self.set_selection(Vec::new(), true);
        }
    }

    /// Insert a default-sized layer at `point` and select it. The canvas
    /// returns to `None` even when the board is full.
    fn insert_layer(&mut self, layer_type: LayerType, point: Point) -> StoreResult<()> {
        self.state = CanvasState::None;

        let size = self.config.insert_size;
        let frame = LayerFrame::new(Xywh::new(point.x, point.y, size, size), self.last_used_color);
        if let Some(id) = self.store.insert(Layer::new(layer_type, frame))? {
            self.set_selection(vec![id], true);
        }
        Ok(())
    }

    fn start_drawing(&mut self, point: Point, pressure: f64) {
        self.presence.pencil_draft = Some(vec![StrokePoint::new(point.x, point.y, pressure)]);
        self.presence.pen_color = Some(self.last_used_color);
        self.publish();
    }

    /// Extend the draft. A lone first point is not repeated.
    fn continue_drawing(&mut self, point: Point, pressure: f64) {
        let Some(draft) = self.presence.pencil_draft.as_mut() else {
            return;
        };
        if let [only] = draft.as_slice() {
            if only.x == point.x && only.y == point.y {
                return;
            }
        }
        draft.push(StrokePoint::new(point.x, point.y, pressure));
    }

    /// Commit the draft as a path layer, or discard it. Stays in pencil mode.
    fn insert_path(&mut self) -> StoreResult<()> {
        self.state = CanvasState::Pencil;
        let draft = self.presence.pencil_draft.take();

        let result = match draft.and_then(|d| PathLayer::from_draft(&d, self.last_used_color)) {
            Some(_) if self.store.is_full() => {
                log::debug!("Board is full, freehand stroke discarded");
                Ok(())
            }
            Some(path) => self.store.insert(Layer::Path(path)).map(|_| ()),
            None => {
                log::debug!("Freehand draft shorter than two points discarded");
                Ok(())
            }
        };

        self.publish();
        result
    }
}
