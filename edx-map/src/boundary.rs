use crate::error::{MapError, Result};
use edx_core::state::StateName;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;

/// Property holding the first-level administrative name in the boundary file.
pub const NAME_PROPERTY: &str = "NAME_1";

/// State geometries from a GeoJSON FeatureCollection, keyed by title-cased name.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    geometries: HashMap<String, Value>,
}

impl BoundaryIndex {
    pub fn from_geojson_str(text: &str) -> Result<BoundaryIndex> {
        let root: Value = serde_json::from_str(text).map_err(|e| MapError::BoundaryParse(e.to_string()))?;
        let features = root["features"]
            .as_array()
            .ok_or_else(|| MapError::BoundaryParse("missing \"features\" array".to_string()))?;

        let mut geometries = HashMap::new();
        for feature in features {
            let Some(name) = feature["properties"][NAME_PROPERTY].as_str() else {
                warn!("Skipping boundary feature without {}", NAME_PROPERTY);
                continue;
            };
            if feature["geometry"].is_null() {
                warn!("Skipping boundary feature {} without geometry", name);
                continue;
            }
            // First feature wins for a repeated name.
            geometries
                .entry(title_case(name))
                .or_insert_with(|| feature["geometry"].clone());
        }
        debug!("Indexed {} state boundaries", geometries.len());
        Ok(BoundaryIndex { geometries })
    }

    pub fn geometry(&self, state: StateName) -> Option<&Value> {
        self.geometries.get(state.name())
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// "TAMIL nadu" -> "Tamil Nadu".
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../fixtures/boundaries-sample.geojson");

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("TAMIL nadu"), "Tamil Nadu");
        assert_eq!(title_case("kerala"), "Kerala");
    }

    #[test]
    fn test_index_keys_are_title_cased() {
        let index = BoundaryIndex::from_geojson_str(SAMPLE).unwrap();
        assert_eq!(index.len(), 2);
        let kerala = StateName::lookup("Kerala").unwrap();
        assert_eq!(index.geometry(kerala).unwrap()["type"], "Polygon");
        assert!(index.geometry(StateName::lookup("Assam").unwrap()).is_none());
    }

    #[test]
    fn test_not_a_feature_collection() {
        assert!(matches!(
            BoundaryIndex::from_geojson_str("{\"type\": \"Point\"}"),
            Err(MapError::BoundaryParse(_))
        ));
        assert!(BoundaryIndex::from_geojson_str("not json").is_err());
    }
}
