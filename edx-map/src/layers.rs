//! Layer descriptors and the visualization catalog for each metric.

use edx_core::metric::{Metric, LAND_COVER_CLASSES};
use edx_core::state::StateName;
use edx_core::year::Year;
use serde::Serialize;
use serde_json::Value;

pub const SENTINEL2_COLLECTION: &str = "COPERNICUS/S2_HARMONIZED";
pub const DYNAMIC_WORLD_COLLECTION: &str = "GOOGLE/DYNAMICWORLD/V1";
/// Scenes at or above this cloudy pixel percentage are filtered out.
pub const MAX_CLOUDY_PIXEL_PERCENTAGE: u8 = 30;
pub const DEFAULT_ZOOM: u8 = 7;

pub const LAND_COVER_LEGEND_TITLE: &str = "Land Cover Classes";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
}

impl VisParams {
    fn new(min: f64, max: f64, palette: &[&str]) -> VisParams {
        VisParams {
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Image collection query: bounds, calendar-year window, newest first, mosaicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionQuery {
    pub collection: String,
    pub start_date: String,
    pub end_date: String,
    pub max_cloudy_pixel_percentage: Option<u8>,
    pub sort_descending_by: String,
    pub composite: String,
}

impl CollectionQuery {
    fn for_year(collection: &str, year: Year, max_cloud: Option<u8>) -> CollectionQuery {
        CollectionQuery {
            collection: collection.to_string(),
            start_date: year.start_date(),
            end_date: year.end_date(),
            max_cloudy_pixel_percentage: max_cloud,
            sort_descending_by: "system:time_start".to_string(),
            composite: "mosaic".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    /// State outline, clipped imagery sits inside it.
    Boundary {
        name: String,
        geometry: Value,
        color: String,
        width: u8,
    },
    /// Band math over a clipped Sentinel-2 composite.
    SpectralIndex {
        name: String,
        band_name: String,
        source: CollectionQuery,
        expression: String,
        vis: VisParams,
    },
    /// Dynamic World `label` band.
    LandCover {
        name: String,
        band_name: String,
        source: CollectionQuery,
        band: String,
        vis: VisParams,
    },
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Layer::Boundary { name, .. } | Layer::SpectralIndex { name, .. } | Layer::LandCover { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    pub labels: Vec<String>,
    pub colors: Vec<String>,
}

pub fn boundary_layer(state: StateName, geometry: &Value) -> Layer {
    Layer::Boundary {
        name: format!("{} Boundary", state),
        geometry: geometry.clone(),
        color: "black".to_string(),
        width: 2,
    }
}

/// Band expression over Sentinel-2 bands (B2 blue, B3 green, B4 red, B8 NIR, B11/B12 SWIR).
pub fn index_expression(metric: Metric) -> Option<&'static str> {
    match metric {
        Metric::Ndvi => Some("(B8 - B4) / (B8 + B4)"),
        Metric::Nbr => Some("(B8 - B12) / (B8 + B12)"),
        Metric::Evi => Some("2.5 * (B8 - B4) / (B8 + 6 * B4 - 7.5 * B2 + 1)"),
        Metric::Ndmi => Some("(B8 - B11) / (B8 + B11)"),
        Metric::Mndwi => Some("(B3 - B11) / (B3 + B11)"),
        _ => None,
    }
}

pub fn index_vis(metric: Metric) -> Option<VisParams> {
    match metric {
        Metric::Ndvi | Metric::Evi => Some(VisParams::new(0.0, 1.0, &["red", "yellow", "green"])),
        Metric::Nbr => Some(VisParams::new(-1.0, 1.0, &["blue", "white", "red"])),
        Metric::Ndmi | Metric::Mndwi => Some(VisParams::new(-1.0, 1.0, &["brown", "white", "blue"])),
        _ => None,
    }
}

/// Imagery layer for one spectral index, or `None` for a land-cover class.
pub fn index_layer(metric: Metric, state: StateName, year: Year) -> Option<Layer> {
    let expression = index_expression(metric)?;
    let vis = index_vis(metric)?;
    Some(Layer::SpectralIndex {
        name: format!("{} ({}, {})", metric, state, year),
        band_name: format!("{}_{}_{}", metric, band_safe(state), year),
        source: CollectionQuery::for_year(SENTINEL2_COLLECTION, year, Some(MAX_CLOUDY_PIXEL_PERCENTAGE)),
        expression: expression.to_string(),
        vis,
    })
}

pub fn land_cover_layer(state: StateName, year: Year) -> Layer {
    let palette: Vec<&str> = LAND_COVER_CLASSES
        .iter()
        .filter_map(Metric::land_cover_color)
        .collect();
    Layer::LandCover {
        name: format!("Land Cover ({}, {})", state, year),
        band_name: format!("Land_Cover_{}_{}", band_safe(state), year),
        source: CollectionQuery::for_year(DYNAMIC_WORLD_COLLECTION, year, None),
        band: "label".to_string(),
        vis: VisParams::new(0.0, (LAND_COVER_CLASSES.len() - 1) as f64, &palette),
    }
}

pub fn land_cover_legend() -> Legend {
    Legend {
        title: LAND_COVER_LEGEND_TITLE.to_string(),
        labels: LAND_COVER_CLASSES.iter().map(|m| m.label().to_string()).collect(),
        colors: LAND_COVER_CLASSES
            .iter()
            .filter_map(Metric::land_cover_color)
            .map(|c| format!("#{}", c))
            .collect(),
    }
}

pub fn land_cover_caption() -> String {
    const COLOR_NAMES: [&str; 9] = [
        "Blue",
        "Dark Green",
        "Light Green",
        "Purple",
        "Orange",
        "Yellow",
        "Red",
        "Gray",
        "Light Purple",
    ];
    let mut caption = String::from("Land Cover Color Mapping:");
    for (metric, color_name) in LAND_COVER_CLASSES.iter().zip(COLOR_NAMES) {
        caption.push_str(&format!(
            "\n- {} (#{}): {}",
            color_name,
            metric.land_cover_color().unwrap_or_default(),
            metric.label()
        ));
    }
    caption
}

fn band_safe(state: StateName) -> String {
    state.name().replace(' ', "_")
}
