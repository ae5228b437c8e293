use crate::domain::model::{
    Bounds, FeaturePopup, HexColor, LineStyle, Overlay, OverlayId, OverlayKind, OverlayPair,
};
use geojson::{Feature, FeatureCollection, Geometry, Value};

/// Drops point geometry. Returns `None` when nothing drawable is left.
fn without_points(geometry: &Geometry) -> Option<Geometry> {
    let value = match &geometry.value {
        Value::Point(_) | Value::MultiPoint(_) => return None,
        Value::GeometryCollection(parts) => {
            let kept: Vec<Geometry> = parts.iter().filter_map(without_points).collect();
            if kept.is_empty() {
                return None;
            }
            Value::GeometryCollection(kept)
        }
        other => other.clone(),
    };
    Some(Geometry::new(value))
}

fn extend_bounds(bounds: &mut Option<Bounds>, positions: &[Vec<f64>]) {
    for position in positions {
        if let [lon, lat, ..] = position.as_slice() {
            match bounds {
                Some(b) => b.extend(*lon, *lat),
                None => *bounds = Some(Bounds::from_point(*lon, *lat)),
            }
        }
    }
}

fn geometry_bounds(value: &Value, bounds: &mut Option<Bounds>) {
    match value {
        Value::Point(p) => extend_bounds(bounds, std::slice::from_ref(p)),
        Value::MultiPoint(points) | Value::LineString(points) => extend_bounds(bounds, points),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for line in lines {
                extend_bounds(bounds, line);
            }
        }
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                for ring in polygon {
                    extend_bounds(bounds, ring);
                }
            }
        }
        Value::GeometryCollection(parts) => {
            for part in parts {
                geometry_bounds(&part.value, bounds);
            }
        }
    }
}

/// Bounds of all geometry in the collection.
pub fn collection_bounds(collection: &FeatureCollection) -> Option<Bounds> {
    let mut bounds = None;
    for feature in &collection.features {
        if let Some(geometry) = &feature.geometry {
            geometry_bounds(&geometry.value, &mut bounds);
        }
    }
    bounds
}

/// Features that can be drawn as lines or areas, in source order.
fn renderable_features(collection: &FeatureCollection) -> Vec<Feature> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = without_points(feature.geometry.as_ref()?)?;
            Some(Feature {
                geometry: Some(geometry),
                ..feature.clone()
            })
        })
        .collect()
}

fn feature_name(feature: &Feature) -> Option<String> {
    feature
        .properties
        .as_ref()?
        .get("name")?
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// 由同一份 GeoJSON 產生陰影線與主線兩個圖層
#[derive(Debug, Clone)]
pub struct OverlayFactory {
    style: LineStyle,
}

impl OverlayFactory {
    pub fn new(style: LineStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &LineStyle {
        &self.style
    }

    pub fn build(&self, collection: &FeatureCollection, color: &HexColor) -> OverlayPair {
        let features = renderable_features(collection);
        let drawable = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        let bounds = collection_bounds(&drawable);

        let popups = drawable
            .features
            .iter()
            .enumerate()
            .filter_map(|(feature_index, feature)| {
                feature_name(feature).map(|text| FeaturePopup {
                    feature_index,
                    text,
                })
            })
            .collect();

        let shadow = Overlay {
            id: OverlayId::next(),
            kind: OverlayKind::Shadow,
            features: drawable.clone(),
            style: self.style.shadow_style(false),
            popups: Vec::new(),
            bounds,
        };

        let main = Overlay {
            id: OverlayId::next(),
            kind: OverlayKind::Main,
            features: drawable,
            style: self.style.main_style(color),
            popups,
            bounds,
        };

        OverlayPair { main, shadow }
    }
}
