use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use geojson::{Feature, GeoJson, Geometry, JsonValue};
use tracing::info;

use crate::config::BoundaryConfig;
use crate::error::SurveyError;

/// One-to-one mapping from a boundary feature's zone label to its integer key.
///
/// Built once from the boundary collaborator's feature list and never
/// modified afterwards. Keys are shared with the origin/destination columns of
/// the trip table and serve as the join key for the map renderer.
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    zones: BTreeMap<i64, ZoneEntry>,
}

#[derive(Debug, Clone)]
struct ZoneEntry {
    feature: usize,
    geometry: Option<Geometry>,
}

impl ZoneIndex {
    /// Index every feature by its `property` label.
    ///
    /// A single label that is missing, non-integral or duplicated invalidates
    /// the whole index.
    pub fn from_features(features: &[Feature], property: &str) -> Result<Self, SurveyError> {
        let mut zones = BTreeMap::new();

        for (i, feature) in features.iter().enumerate() {
            let label = feature.property(property);
            let key = label.and_then(zone_key).ok_or_else(|| SurveyError::ZoneKey {
                feature: i,
                label: label.map(describe).unwrap_or_else(|| "<missing>".to_string()),
            })?;

            match zones.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(ZoneEntry {
                        feature: i,
                        geometry: feature.geometry.clone(),
                    });
                }
                Entry::Occupied(_) => {
                    return Err(SurveyError::ZoneKey {
                        feature: i,
                        label: format!("{} (duplicate)", key),
                    })
                }
            }
        }

        Ok(Self { zones })
    }

    /// Index a GeoJSON FeatureCollection (or a single Feature).
    pub fn from_geojson_str(text: &str, property: &str) -> Result<Self, SurveyError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| SurveyError::Config(format!("invalid GeoJSON: {e}")))?;

        match geojson {
            GeoJson::FeatureCollection(collection) => {
                Self::from_features(&collection.features, property)
            }
            GeoJson::Feature(feature) => Self::from_features(&[feature], property),
            GeoJson::Geometry(_) => Err(SurveyError::Config(
                "boundary GeoJSON must contain features".to_string(),
            )),
        }
    }

    pub fn from_file(path: impl AsRef<Path>, property: &str) -> Result<Self, SurveyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SurveyError::load(path, e))?;
        let index = Self::from_geojson_str(&text, property)?;
        info!(path = %path.display(), zones = index.len(), "built zone index");
        Ok(index)
    }

    pub fn from_config(config: &BoundaryConfig) -> Result<Self, SurveyError> {
        Self::from_file(&config.path, &config.zone_property)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn contains(&self, key: i64) -> bool {
        self.zones.contains_key(&key)
    }

    /// All zone keys, ascending.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.zones.keys().copied()
    }

    pub fn geometry(&self, key: i64) -> Option<&Geometry> {
        self.zones.get(&key).and_then(|z| z.geometry.as_ref())
    }

    /// Position of the zone's feature in the source feature list.
    pub fn feature_position(&self, key: i64) -> Option<usize> {
        self.zones.get(&key).map(|z| z.feature)
    }
}

/// Coerce a label to an integer key: integers, integral floats and strings
/// holding an integer are accepted.
fn zone_key(label: &JsonValue) -> Option<i64> {
    match label {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn describe(label: &JsonValue) -> String {
    match label {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(labels: &[&str]) -> String {
        let features: Vec<String> = labels
            .iter()
            .map(|label| {
                format!(
                    r#"{{"type":"Feature","properties":{{"Nueva_Zona":{label}}},"geometry":{{"type":"Point","coordinates":[-75.57,6.23]}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    #[test]
    fn coerces_numeric_and_string_labels() {
        let index =
            ZoneIndex::from_geojson_str(&collection(&["3", "\"12\"", "7.0"]), "Nueva_Zona")
                .unwrap();

        assert_eq!(index.keys().collect::<Vec<_>>(), vec![3, 7, 12]);
        assert_eq!(index.feature_position(12), Some(1));
        assert!(index.geometry(7).is_some());
        assert!(!index.contains(4));
    }

    #[test]
    fn one_bad_label_invalidates_the_index() {
        let err = ZoneIndex::from_geojson_str(&collection(&["1", "\"Zona A\"", "3"]), "Nueva_Zona")
            .unwrap_err();
        assert!(matches!(
            err,
            SurveyError::ZoneKey { feature: 1, ref label } if label == "Zona A"
        ));
    }

    #[test]
    fn missing_property_is_a_zone_key_error() {
        let err = ZoneIndex::from_geojson_str(&collection(&["1"]), "Zona").unwrap_err();
        assert!(matches!(err, SurveyError::ZoneKey { feature: 0, .. }));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let err =
            ZoneIndex::from_geojson_str(&collection(&["5", "\"5\""]), "Nueva_Zona").unwrap_err();
        assert!(matches!(err, SurveyError::ZoneKey { feature: 1, .. }));
    }

    #[test]
    fn fractional_label_is_rejected() {
        let err = ZoneIndex::from_geojson_str(&collection(&["2.5"]), "Nueva_Zona").unwrap_err();
        assert!(matches!(err, SurveyError::ZoneKey { .. }));
    }
}
