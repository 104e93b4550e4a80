//! Conversion of visible dataset elements into GeoJSON feature collections.
//!
//! Every feature carries `name`, `ref` and a ready-made `label`; tunnel
//! features also carry `length_km`.

use crate::data::{DatasetKind, Element};
use crate::geo::{format_length_km, line_length_km};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

/// Text shown when a feature is selected: "name (ref)" plus the tunnel length
pub fn display_label(name: &str, reference: &str, length_km: Option<&str>) -> String {
    let mut label = if reference.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({reference})")
    };
    if let Some(length) = length_km {
        label.push_str(&format!(" - Length: {length} km"));
    }
    label
}

/// Convert one element into a LineString feature
pub fn to_feature(kind: DatasetKind, element: &Element) -> Feature {
    let coords = element.lon_lat();
    let name = element.tags.name.as_deref().unwrap_or(kind.default_name());
    let reference = element.tags.reference.as_deref().unwrap_or("");

    let length = match kind {
        DatasetKind::Tunnels => Some(format_length_km(line_length_km(&coords))),
        DatasetKind::Lgv => None,
    };

    let mut properties = JsonObject::new();
    properties.insert("name".into(), JsonValue::from(name));
    properties.insert("ref".into(), JsonValue::from(reference));
    properties.insert(
        "label".into(),
        JsonValue::from(display_label(name, reference, length.as_deref())),
    );
    if let Some(length) = length {
        properties.insert("length_km".into(), JsonValue::from(length));
    }

    let positions = coords.iter().map(|&(lon, lat)| vec![lon, lat]).collect();

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(positions))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert a filtered element list into a feature collection
pub fn to_feature_collection(kind: DatasetKind, elements: &[&Element]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: elements.iter().map(|e| to_feature(kind, e)).collect(),
        foreign_members: None,
    }
}

/// The `label` property of a feature, if present
pub fn feature_label(feature: &Feature) -> Option<&str> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get("label"))
        .and_then(|v| v.as_str())
}

/// Lines of a feature's geometry as (lon, lat) pairs
pub fn feature_lines(feature: &Feature) -> Vec<Vec<(f64, f64)>> {
    let Some(geometry) = feature.geometry.as_ref() else {
        return Vec::new();
    };
    match &geometry.value {
        Value::LineString(coords) => vec![positions_to_line(coords)],
        Value::MultiLineString(lines) => lines.iter().map(|c| positions_to_line(c)).collect(),
        _ => Vec::new(),
    }
}

fn positions_to_line(coords: &[Vec<f64>]) -> Vec<(f64, f64)> {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}
