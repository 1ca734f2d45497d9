//! Replicated storage contract for the layer collection.
//!
//! A board's layers live in two replicated structures: a keyed map of layer
//! records and an ordered list of ids (z-order). Backends provide only the
//! primitive operations below; [`crate::store::LayerStore`] keeps the two in
//! lock-step on top of them.

mod memory;

pub use memory::MemoryStorage;

use crate::layers::{Layer, LayerId, LayerPatch};
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Replication backend error: {0}")]
    Backend(#[from] loro::LoroError),
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Primitive operations of a replicated map plus ordered list.
///
/// Index arguments out of range are ignored by implementations.
pub trait ReplicatedStorage {
    /// Number of layer records.
    fn layer_count(&self) -> usize;

    /// Read one layer record.
    fn get_layer(&self, id: &LayerId) -> Option<Layer>;

    /// Write a whole layer record.
    fn set_layer(&mut self, id: LayerId, layer: &Layer) -> StoreResult<()>;

    /// Write only the fields present in `patch`. Unknown ids are ignored.
    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> StoreResult<()>;

    /// Delete a layer record.
    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<()>;

    /// Ids of every layer record, sorted.
    fn record_ids(&self) -> Vec<LayerId>;

    /// The ordered id list, back to front.
    fn layer_ids(&self) -> Vec<LayerId>;

    /// Insert an id into the order at `index`.
    fn insert_id(&mut self, index: usize, id: LayerId) -> StoreResult<()>;

    /// Move the id at `from` so that it ends up at `to`.
    fn move_id(&mut self, from: usize, to: usize) -> StoreResult<()>;

    /// Remove the id at `index` from the order.
    fn delete_id(&mut self, index: usize) -> StoreResult<()>;

    /// Close the current batch of local operations.
    fn commit(&mut self) {}
}
