//! The layer collection of a board.
//!
//! [`LayerStore`] keeps the record map and the z-order list of a
//! [`ReplicatedStorage`] in lock-step, enforces the layer cap and journals
//! every local mutation as a [`Change`] for the history.

use crate::history::Change;
use crate::layers::{Layer, LayerId, LayerPatch};
use crate::storage::{ReplicatedStorage, StoreResult};
use std::collections::HashSet;
use uuid::Uuid;

/// Direction of a z-order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    ToFront,
    ToBack,
}

/// Layer records plus their paint order.
pub struct LayerStore<S> {
    storage: S,
    max_layers: usize,
    journal: Vec<Change>,
}

impl<S: ReplicatedStorage> LayerStore<S> {
    pub fn new(storage: S, max_layers: usize) -> Self {
        Self {
            storage,
            max_layers,
            journal: Vec::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Direct access to the backend, e.g. to import remote state.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn max_layers(&self) -> usize {
        self.max_layers
    }

    pub fn len(&self) -> usize {
        self.storage.layer_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_layers
    }

    pub fn get(&self, id: &LayerId) -> Option<Layer> {
        self.storage.get_layer(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.storage.get_layer(id).is_some()
    }

    /// Layer ids back to front. Order entries without a record are skipped.
    pub fn ids(&self) -> Vec<LayerId> {
        self.storage
            .layer_ids()
            .into_iter()
            .filter(|id| self.contains(id))
            .collect()
    }

    /// Layers back to front. Ids whose record is missing are skipped.
    pub fn layers_ordered(&self) -> Vec<(LayerId, Layer)> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.get(&id).map(|layer| (id, layer)))
            .collect()
    }

    /// Position of a live layer in the stored order.
    fn index_of(&self, id: &LayerId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.storage.layer_ids().iter().position(|other| other == id)
    }

    /// Insert a layer with a fresh id at the front.
    ///
    /// Returns `None` without touching storage when the board is full.
    pub fn insert(&mut self, layer: Layer) -> StoreResult<Option<LayerId>> {
        self.insert_with_id(Uuid::new_v4(), layer)
    }

    /// Insert a layer under a caller-chosen id. Ids already present are
    /// rejected like a full board.
    pub fn insert_with_id(&mut self, id: LayerId, layer: Layer) -> StoreResult<Option<LayerId>> {
        if self.is_full() {
            log::debug!("Board is at its limit of {} layers, insert rejected", self.max_layers);
            return Ok(None);
        }
        if self.contains(&id) {
            log::warn!("Layer {id} already exists, insert rejected");
            return Ok(None);
        }

        let index = self.storage.layer_ids().len();
        self.storage.insert_id(index, id)?;
        self.storage.set_layer(id, &layer)?;
        self.storage.commit();
        self.journal.push(Change::Insert { id, layer, index });
        Ok(Some(id))
    }

    /// Merge `patch` into an existing layer. Unknown ids are ignored.
    pub fn update(&mut self, id: &LayerId, patch: &LayerPatch) -> StoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let Some(layer) = self.get(id) else {
            return Ok(());
        };

        let before = patch.capture(&layer);
        self.storage.update_layer(id, patch)?;
        self.storage.commit();
        self.journal.push(Change::Fields {
            id: *id,
            before,
            after: patch.clone(),
        });
        Ok(())
    }

    /// Set or clear the text payload of a layer.
    pub fn set_value(&mut self, id: &LayerId, value: Option<String>) -> StoreResult<()> {
        self.update(id, &LayerPatch::value(value))
    }

    /// Delete layers and their order entries. Unknown ids are ignored.
    pub fn remove(&mut self, ids: &[LayerId]) -> StoreResult<()> {
        for id in ids {
            let index = self.index_of(id);
            let layer = self.get(id);

            if let Some(index) = index {
                self.storage.delete_id(index)?;
            }
            if layer.is_some() {
                self.storage.delete_layer(id)?;
            }
            if let (Some(index), Some(layer)) = (index, layer) {
                self.journal.push(Change::Remove { id: *id, layer, index });
            }
        }
        self.storage.commit();
        Ok(())
    }

    /// Move `ids` to the front or back, keeping the relative order of both
    /// the moved layers and the rest. Ids not in the order are skipped.
    pub fn reorder(&mut self, ids: &[LayerId], direction: Reorder) -> StoreResult<()> {
        let order = self.storage.layer_ids();
        let indices: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, id)| ids.contains(id) && self.contains(id))
            .map(|(i, _)| i)
            .collect();

        match direction {
            Reorder::ToFront => {
                let last = order.len().saturating_sub(1);
                for (k, &from) in indices.iter().enumerate().rev() {
                    let to = last - (indices.len() - 1 - k);
                    self.move_journaled(order[from], from, to)?;
                }
            }
            Reorder::ToBack => {
                for (to, &from) in indices.iter().enumerate() {
                    self.move_journaled(order[from], from, to)?;
                }
            }
        }
        self.storage.commit();
        Ok(())
    }

    fn move_journaled(&mut self, id: LayerId, from: usize, to: usize) -> StoreResult<()> {
        if from == to {
            return Ok(());
        }
        self.storage.move_id(from, to)?;
        self.journal.push(Change::Move { id, from, to });
        Ok(())
    }

    /// Drain the changes made since the last call.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.journal)
    }

    /// Apply a change from history without journaling it.
    ///
    /// Positions are re-resolved by id, and targets that no longer exist
    /// are skipped, so remote edits in between never cause failures.
    pub fn apply_change(&mut self, change: &Change) -> StoreResult<()> {
        match change {
            Change::Insert { id, layer, index } => {
                if self.contains(id) {
                    return Ok(());
                }
                if self.is_full() {
                    log::debug!("Board is full, cannot restore layer {id}");
                    return Ok(());
                }
                let index = (*index).min(self.storage.layer_ids().len());
                self.storage.insert_id(index, *id)?;
                self.storage.set_layer(*id, layer)?;
            }
            Change::Remove { id, .. } => {
                if let Some(index) = self.index_of(id) {
                    self.storage.delete_id(index)?;
                }
                self.storage.delete_layer(id)?;
            }
            Change::Fields { id, after, .. } => {
                if self.contains(id) {
                    self.storage.update_layer(id, after)?;
                }
            }
            Change::Move { id, to, .. } => {
                if let Some(from) = self.index_of(id) {
                    let to = (*to).min(self.storage.layer_ids().len().saturating_sub(1));
                    if from != to {
                        self.storage.move_id(from, to)?;
                    }
                }
            }
            Change::Selection { .. } => {}
        }
        self.storage.commit();
        Ok(())
    }

    /// Bring the record map and the order back in lock-step after a merge.
    ///
    /// A concurrent remove and move of the same layer can leave its id in
    /// the order without a record. Such entries, repeated entries and
    /// records missing from the order are deleted. Every replica deletes the
    /// same ones. Not journaled. Returns the ids that were dropped.
    pub fn reconcile_order(&mut self) -> StoreResult<Vec<LayerId>> {
        let order = self.storage.layer_ids();
        let mut seen = HashSet::new();
        let stale: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, id)| !seen.insert(**id) || !self.contains(id))
            .map(|(i, _)| i)
            .collect();
        let orphans: Vec<LayerId> = self
            .storage
            .record_ids()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        if stale.is_empty() && orphans.is_empty() {
            return Ok(Vec::new());
        }

        log::warn!(
            "Layer order out of step after merge, dropping {} order entries and {} records",
            stale.len(),
            orphans.len()
        );
        let mut dropped = Vec::new();
        for &index in stale.iter().rev() {
            self.storage.delete_id(index)?;
            if !self.contains(&order[index]) && !dropped.contains(&order[index]) {
                dropped.push(order[index]);
            }
        }
        for id in &orphans {
            self.storage.delete_layer(id)?;
        }
        dropped.extend(orphans);
        self.storage.commit();
        Ok(dropped)
    }

    /// Whether merged remote inserts pushed the board past its cap.
    pub fn over_capacity(&self) -> bool {
        self.len() > self.max_layers
    }

    /// Remove the front-most layers beyond the cap after a merge.
    ///
    /// Replicas that converged to the same order drop the same layers. The
    /// removal is not journaled: it is not a local user action.
    pub fn reconcile_capacity(&mut self) -> StoreResult<Vec<LayerId>> {
        if !self.over_capacity() {
            return Ok(Vec::new());
        }
        let ids = self.ids();
        let overflow: Vec<LayerId> = ids.iter().skip(self.max_layers).copied().collect();
        log::warn!(
            "Board holds {} layers after merge, dropping {} beyond the limit of {}",
            self.len(),
            overflow.len(),
            self.max_layers
        );
        for id in overflow.iter().rev() {
            if let Some(index) = self.index_of(id) {
                self.storage.delete_id(index)?;
            }
            self.storage.delete_layer(id)?;
        }
        self.storage.commit();
        Ok(overflow)
    }

    /// The ordered layers as a JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.layers_ordered()
                .into_iter()
                .filter_map(|(id, layer)| {
                    let mut value = serde_json::to_value(&layer).ok()?;
                    value
                        .as_object_mut()?
                        .insert("id".into(), serde_json::Value::String(id.to_string()));
                    Some(value)
                })
                .collect(),
        )
    }
}
