//! CRDT integration using Loro for collaborative editing.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "layers": LoroMap<LayerId, LoroMap> (layer records)
//! └── "layerIds": LoroMovableList<String> (layer ids in z-order)
//! ```
//!
//! Each record in "layers" is a LoroMap with:
//! - "type": String ("rectangle", "ellipse", "path", "text", "note")
//! - "x", "y", "width", "height": f64
//! - "fill_r", "fill_g", "fill_b": i64 (0-255)
//! - "value": String (text and note payload, optional)
//! - "points": LoroList of `[x, y, pressure]` lists (paths only)

mod convert;
mod schema;

pub use convert::{layer_from_loro, layer_to_loro};
pub use schema::{LAYER_IDS_KEY, LAYERS_KEY, LoroStorage};

pub use loro::VersionVector;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Xywh;
    use crate::layers::{Layer, LayerFrame, LayerId, LayerPatch, LayerType, PathLayer, Rgb, StrokePoint};
    use crate::storage::ReplicatedStorage;
    use uuid::Uuid;

    fn note() -> Layer {
        let mut frame = LayerFrame::new(Xywh::new(100.0, 200.0, 150.0, 80.0), Rgb::new(255, 0, 128));
        frame.value = Some("hello".into());
        Layer::new(LayerType::Note, frame)
    }

    fn add(storage: &mut LoroStorage, layer: &Layer) -> LayerId {
        let id = Uuid::new_v4();
        let index = storage.layer_ids().len();
        storage.insert_id(index, id).expect("Failed to insert id");
        storage.set_layer(id, layer).expect("Failed to set layer");
        storage.commit();
        id
    }

    #[test]
    fn test_storage_creation() {
        let storage = LoroStorage::new();
        assert_eq!(storage.layer_count(), 0);
        assert!(storage.layer_ids().is_empty());
    }

    #[test]
    fn test_roundtrip_note() {
        let mut storage = LoroStorage::new();
        let layer = note();
        let id = add(&mut storage, &layer);

        let recovered = storage.get_layer(&id).expect("Layer not found");
        assert_eq!(recovered, layer);
        assert_eq!(storage.record_ids(), vec![id]);
    }

    #[test]
    fn test_roundtrip_path() {
        let mut storage = LoroStorage::new();
        let draft = [StrokePoint::new(5.0, 5.0, 0.3), StrokePoint::new(15.0, 25.0, 0.7)];
        let layer = Layer::Path(PathLayer::from_draft(&draft, Rgb::BLACK).unwrap());
        let id = add(&mut storage, &layer);

        match storage.get_layer(&id) {
            Some(Layer::Path(path)) => {
                assert_eq!(path.points.len(), 2);
                assert!((path.points[1].pressure - 0.7).abs() < 1e-9);
                assert!((path.frame.height - 20.0).abs() < 1e-9);
            }
            other => panic!("Expected Path, got {other:?}"),
        }
    }

    #[test]
    fn test_update_fields() {
        let mut storage = LoroStorage::new();
        let id = add(&mut storage, &note());

        storage.update_layer(&id, &LayerPatch::position(1.0, 2.0)).unwrap();
        storage.update_layer(&id, &LayerPatch::value(None)).unwrap();
        storage.commit();

        let layer = storage.get_layer(&id).unwrap();
        assert!((layer.frame().x - 1.0).abs() < 1e-9);
        assert!((layer.frame().width - 150.0).abs() < 1e-9);
        assert!(layer.frame().value.is_none());
    }

    #[test]
    fn test_remove_and_move() {
        let mut storage = LoroStorage::new();
        let a = add(&mut storage, &note());
        let b = add(&mut storage, &note());
        let c = add(&mut storage, &note());

        storage.move_id(0, 2).unwrap();
        assert_eq!(storage.layer_ids(), vec![b, c, a]);

        storage.delete_id(0).unwrap();
        storage.delete_layer(&b).unwrap();
        storage.commit();
        assert_eq!(storage.layer_ids(), vec![c, a]);
        assert_eq!(storage.layer_count(), 2);
        assert!(storage.get_layer(&b).is_none());
    }

    #[test]
    fn test_export_import() {
        let mut storage = LoroStorage::new();
        let id = add(&mut storage, &note());

        let bytes = storage.export_snapshot().expect("Failed to export");
        let other = LoroStorage::from_snapshot(&bytes).expect("Failed to import");

        assert_eq!(other.layer_count(), 1);
        assert_eq!(other.layer_ids(), vec![id]);
    }

    #[test]
    fn test_concurrent_field_edits_merge() {
        let mut a = LoroStorage::new();
        let id = add(&mut a, &note());
        let mut b = LoroStorage::from_snapshot(&a.export_snapshot().unwrap()).unwrap();

        let a_version = a.version();
        let b_version = b.version();
        a.update_layer(&id, &LayerPatch::position(10.0, 10.0)).unwrap();
        a.commit();
        b.update_layer(&id, &LayerPatch::fill(Rgb::WHITE)).unwrap();
        b.commit();

        a.import(&b.export_updates(&a_version).unwrap()).unwrap();
        b.import(&a.export_updates(&b_version).unwrap()).unwrap();

        let from_a = a.get_layer(&id).unwrap();
        assert_eq!(from_a, b.get_layer(&id).unwrap());
        assert!((from_a.frame().x - 10.0).abs() < 1e-9);
        assert_eq!(from_a.fill(), Rgb::WHITE);
    }
}
