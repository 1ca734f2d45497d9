//! Loro document schema and operations.

use super::convert::{layer_from_loro, layer_to_loro, patch_to_loro};
use crate::layers::{Layer, LayerId, LayerPatch};
use crate::storage::{ReplicatedStorage, StoreError, StoreResult};
use loro::{
    Container, ExportMode, LoroDoc, LoroMap, LoroMovableList, LoroValue, ValueOrContainer,
    VersionVector,
};
use uuid::Uuid;

/// Key for the layer records map in the document.
pub const LAYERS_KEY: &str = "layers";
/// Key for the z-order list in the document.
pub const LAYER_IDS_KEY: &str = "layerIds";

/// Layer storage backed by a Loro document.
///
/// Each layer is a nested map so that concurrent edits of different fields
/// merge independently.
pub struct LoroStorage {
    doc: LoroDoc,
}

impl Default for LoroStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoroStorage {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self { doc: LoroDoc::new() }
    }

    /// Create a document from a snapshot.
    pub fn from_snapshot(bytes: &[u8]) -> StoreResult<Self> {
        let storage = Self::new();
        storage.doc.import(bytes)?;
        Ok(storage)
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn layers_map(&self) -> LoroMap {
        self.doc.get_map(LAYERS_KEY)
    }

    fn ids_list(&self) -> LoroMovableList {
        self.doc.get_movable_list(LAYER_IDS_KEY)
    }

    fn layer_map(&self, id: &LayerId) -> Option<LoroMap> {
        match self.layers_map().get(&id.to_string())? {
            ValueOrContainer::Container(Container::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Current version, to be passed back to [`Self::export_updates`].
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Export the full document state.
    pub fn export_snapshot(&self) -> StoreResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Export the operations a peer at `since` is missing.
    pub fn export_updates(&self, since: &VersionVector) -> StoreResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(since))
            .map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Merge a snapshot or update blob from another connection.
    pub fn import(&mut self, bytes: &[u8]) -> StoreResult<()> {
        self.doc.import(bytes)?;
        log::debug!("Imported {} bytes of remote layer state", bytes.len());
        Ok(())
    }
}

impl ReplicatedStorage for LoroStorage {
    fn layer_count(&self) -> usize {
        self.layers_map().len()
    }

    fn get_layer(&self, id: &LayerId) -> Option<Layer> {
        match self.layer_map(id)?.get_deep_value() {
            LoroValue::Map(map) => layer_from_loro(&map),
            _ => None,
        }
    }

    fn set_layer(&mut self, id: LayerId, layer: &Layer) -> StoreResult<()> {
        let map = self.layers_map().insert_container(&id.to_string(), LoroMap::new())?;
        layer_to_loro(layer, &map)?;
        Ok(())
    }

    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> StoreResult<()> {
        if let Some(map) = self.layer_map(id) {
            patch_to_loro(patch, &map)?;
        }
        Ok(())
    }

    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<()> {
        self.layers_map().delete(&id.to_string())?;
        Ok(())
    }

    fn record_ids(&self) -> Vec<LayerId> {
        let LoroValue::Map(map) = self.layers_map().get_value() else {
            return Vec::new();
        };
        let mut ids: Vec<LayerId> = map.keys().filter_map(|key| Uuid::parse_str(key).ok()).collect();
        ids.sort();
        ids
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        let list = self.ids_list();
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(s))) = list.get(i) {
                if let Ok(id) = Uuid::parse_str(&s.to_string()) {
                    result.push(id);
                }
            }
        }
        result
    }

    fn insert_id(&mut self, index: usize, id: LayerId) -> StoreResult<()> {
        let list = self.ids_list();
        list.insert(index.min(list.len()), id.to_string())?;
        Ok(())
    }

    fn move_id(&mut self, from: usize, to: usize) -> StoreResult<()> {
        let list = self.ids_list();
        if from < list.len() && to < list.len() && from != to {
            list.mov(from, to)?;
        }
        Ok(())
    }

    fn delete_id(&mut self, index: usize) -> StoreResult<()> {
        let list = self.ids_list();
        if index < list.len() {
            list.delete(index, 1)?;
        }
        Ok(())
    }

    fn commit(&mut self) {
        self.doc.commit();
    }
}
