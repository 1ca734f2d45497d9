//! Conversion between layer records and Loro values.

use crate::layers::{Layer, LayerFrame, LayerPatch, LayerType, PathLayer, Rgb, StrokePoint};
use loro::{LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue};

// Common keys
const KEY_TYPE: &str = "type";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_VALUE: &str = "value";

// Fill keys
const KEY_FILL_R: &str = "fill_r";
const KEY_FILL_G: &str = "fill_g";
const KEY_FILL_B: &str = "fill_b";

// Path keys
const KEY_POINTS: &str = "points";

fn as_f64(value: &LoroValue) -> Option<f64> {
    match value {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    as_f64(map.get(key)?)
}

fn get_channel(map: &LoroMapValue, key: &str) -> Option<u8> {
    match map.get(key)? {
        LoroValue::I64(i) => Some((*i).clamp(0, 255) as u8),
        LoroValue::Double(d) => Some(d.clamp(0.0, 255.0) as u8),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

/// Write a whole layer into an (empty) Loro map.
pub fn layer_to_loro(layer: &Layer, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_TYPE, layer.layer_type().as_str())?;
    frame_to_loro(layer.frame(), map)?;

    if let Layer::Path(path) = layer {
        let points_list = map.insert_container(KEY_POINTS, LoroList::new())?;
        for point in &path.points {
            let point_list = points_list.insert_container(points_list.len(), LoroList::new())?;
            point_list.push(point.x)?;
            point_list.push(point.y)?;
            point_list.push(point.pressure)?;
        }
    }

    Ok(())
}

fn frame_to_loro(frame: &LayerFrame, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_X, frame.x)?;
    map.insert(KEY_Y, frame.y)?;
    map.insert(KEY_WIDTH, frame.width)?;
    map.insert(KEY_HEIGHT, frame.height)?;
    fill_to_loro(frame.fill, map)?;
    if let Some(value) = &frame.value {
        map.insert(KEY_VALUE, value.as_str())?;
    }
    Ok(())
}

fn fill_to_loro(fill: Rgb, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_FILL_R, fill.r as i64)?;
    map.insert(KEY_FILL_G, fill.g as i64)?;
    map.insert(KEY_FILL_B, fill.b as i64)?;
    Ok(())
}

/// Write the fields present in `patch`, one map key per field.
pub fn patch_to_loro(patch: &LayerPatch, map: &LoroMap) -> LoroResult<()> {
    if let Some(x) = patch.x {
        map.insert(KEY_X, x)?;
    }
    if let Some(y) = patch.y {
        map.insert(KEY_Y, y)?;
    }
    if let Some(width) = patch.width {
        map.insert(KEY_WIDTH, width)?;
    }
    if let Some(height) = patch.height {
        map.insert(KEY_HEIGHT, height)?;
    }
    if let Some(fill) = patch.fill {
        fill_to_loro(fill, map)?;
    }
    match &patch.value {
        Some(Some(value)) => map.insert(KEY_VALUE, value.as_str())?,
        Some(None) => map.delete(KEY_VALUE)?,
        None => {}
    }
    Ok(())
}

/// Read a layer from the deep value of its Loro map.
pub fn layer_from_loro(map: &LoroMapValue) -> Option<Layer> {
    let layer_type = LayerType::parse(&get_string(map, KEY_TYPE)?)?;
    let frame = LayerFrame {
        x: get_double(map, KEY_X)?,
        y: get_double(map, KEY_Y)?,
        width: get_double(map, KEY_WIDTH)?,
        height: get_double(map, KEY_HEIGHT)?,
        fill: Rgb::new(
            get_channel(map, KEY_FILL_R).unwrap_or(0),
            get_channel(map, KEY_FILL_G).unwrap_or(0),
            get_channel(map, KEY_FILL_B).unwrap_or(0),
        ),
        value: get_string(map, KEY_VALUE),
    };

    if layer_type != LayerType::Path {
        return Some(Layer::new(layer_type, frame));
    }

    let points = match map.get(KEY_POINTS) {
        Some(LoroValue::List(points_list)) => points_list
            .iter()
            .filter_map(|p| match p {
                LoroValue::List(coords) if coords.len() >= 3 => Some(StrokePoint::new(
                    as_f64(&coords[0])?,
                    as_f64(&coords[1])?,
                    as_f64(&coords[2])?,
                )),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(Layer::Path(PathLayer { frame, points }))
}
