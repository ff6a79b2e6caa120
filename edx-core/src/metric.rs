use serde::{Serialize, Serializer};
use std::fmt;

/// An environmental indicator: a spectral index or a land-cover class proportion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Ndvi,
    Evi,
    Nbr,
    Ndmi,
    Mndwi,
    Water,
    Trees,
    Grass,
    FloodedVegetation,
    Crops,
    ShrubAndScrub,
    Built,
    Bare,
    SnowAndIce,
}

/// Spectral indices in the order single-index detection tests them.
pub const INDEX_PRIORITY: [Metric; 5] = [
    Metric::Ndvi,
    Metric::Nbr,
    Metric::Evi,
    Metric::Ndmi,
    Metric::Mndwi,
];

/// The Dynamic World land-cover classes. A land-cover query always asks for all of them.
pub const LAND_COVER_CLASSES: [Metric; 9] = [
    Metric::Water,
    Metric::Trees,
    Metric::Grass,
    Metric::FloodedVegetation,
    Metric::Crops,
    Metric::ShrubAndScrub,
    Metric::Built,
    Metric::Bare,
    Metric::SnowAndIce,
];

impl Metric {
    /// Name as it appears in model replies ("NDVI", "flooded_vegetation").
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Ndvi => "NDVI",
            Metric::Evi => "EVI",
            Metric::Nbr => "NBR",
            Metric::Ndmi => "NDMI",
            Metric::Mndwi => "MNDWI",
            Metric::Water => "water",
            Metric::Trees => "trees",
            Metric::Grass => "grass",
            Metric::FloodedVegetation => "flooded_vegetation",
            Metric::Crops => "crops",
            Metric::ShrubAndScrub => "shrub_and_scrub",
            Metric::Built => "built",
            Metric::Bare => "bare",
            Metric::SnowAndIce => "snow_and_ice",
        }
    }

    /// Human-readable label for legends.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Ndvi => "NDVI (Vegetation Index)",
            Metric::Evi => "EVI (Enhanced Vegetation Index)",
            Metric::Nbr => "NBR (Burn Ratio)",
            Metric::Ndmi => "NDMI (Moisture Index)",
            Metric::Mndwi => "MNDWI (Water Index)",
            Metric::Water => "Water",
            Metric::Trees => "Trees",
            Metric::Grass => "Grass",
            Metric::FloodedVegetation => "Flooded Vegetation",
            Metric::Crops => "Crops",
            Metric::ShrubAndScrub => "Shrub and Scrub",
            Metric::Built => "Built",
            Metric::Bare => "Bare",
            Metric::SnowAndIce => "Snow and Ice",
        }
    }

    /// Look up a metric by its reply name, ignoring case.
    pub fn from_name(name: &str) -> Option<Metric> {
        INDEX_PRIORITY
            .iter()
            .chain(LAND_COVER_CLASSES.iter())
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    pub fn is_land_cover(&self) -> bool {
        LAND_COVER_CLASSES.contains(self)
    }

    /// Dynamic World palette colour of a land-cover class (hex, no leading '#').
    pub fn land_cover_color(&self) -> Option<&'static str> {
        match self {
            Metric::Water => Some("419BDF"),
            Metric::Trees => Some("397D49"),
            Metric::Grass => Some("88B053"),
            Metric::FloodedVegetation => Some("7A87C6"),
            Metric::Crops => Some("E49635"),
            Metric::ShrubAndScrub => Some("DFC35A"),
            Metric::Built => Some("C4281B"),
            Metric::Bare => Some("A59B8F"),
            Metric::SnowAndIce => Some("B39FE1"),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Join metric names with ", ".
pub fn join_names(metrics: &[Metric]) -> String {
    metrics
        .iter()
        .map(Metric::name)
        .collect::<Vec<_>>()
        .join(", ")
}
