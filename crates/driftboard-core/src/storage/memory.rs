//! In-memory storage implementation.

use super::{ReplicatedStorage, StoreResult};
use crate::layers::{Layer, LayerId, LayerPatch};
use std::collections::HashMap;

/// Non-replicated storage for offline boards and testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    layers: HashMap<LayerId, Layer>,
    order: Vec<LayerId>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplicatedStorage for MemoryStorage {
    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn get_layer(&self, id: &LayerId) -> Option<Layer> {
        self.layers.get(id).cloned()
    }

    fn set_layer(&mut self, id: LayerId, layer: &Layer) -> StoreResult<()> {
        self.layers.insert(id, layer.clone());
        Ok(())
    }

    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> StoreResult<()> {
        if let Some(layer) = self.layers.get_mut(id) {
            patch.apply(layer);
        }
        Ok(())
    }

    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<()> {
        self.layers.remove(id);
        Ok(())
    }

    fn record_ids(&self) -> Vec<LayerId> {
        let mut ids: Vec<LayerId> = self.layers.keys().copied().collect();
        ids.sort();
        ids
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        self.order.clone()
    }

    fn insert_id(&mut self, index: usize, id: LayerId) -> StoreResult<()> {
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        Ok(())
    }

    fn move_id(&mut self, from: usize, to: usize) -> StoreResult<()> {
        if from < self.order.len() && to < self.order.len() {
            let id = self.order.remove(from);
            self.order.insert(to, id);
        }
        Ok(())
    }

    fn delete_id(&mut self, index: usize) -> StoreResult<()> {
        if index < self.order.len() {
            self.order.remove(index);
        }
        Ok(())
    }
}
