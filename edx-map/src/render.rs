use crate::error::{MapError, Result};
use crate::layers::{
    boundary_layer, index_layer, land_cover_caption, land_cover_layer, land_cover_legend, Layer, Legend,
    DEFAULT_ZOOM,
};
use crate::session::EarthEngineSession;
use async_trait::async_trait;
use edx_core::intent::QueryIntent;
use edx_core::metric::Metric;
use edx_core::state::StateName;
use edx_core::year::Year;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to map: the parsed pieces of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub states: Vec<StateName>,
    pub year_dict: BTreeMap<StateName, Vec<Year>>,
    pub query: String,
    pub metrics: Vec<Metric>,
}

impl MapRequest {
    pub fn from_intent(intent: &QueryIntent, query: &str) -> MapRequest {
        MapRequest {
            states: intent.states.clone(),
            year_dict: intent.year_dict.clone(),
            query: query.to_string(),
            metrics: intent.metrics.clone(),
        }
    }

    fn years_for(&self, state: StateName) -> Vec<Year> {
        match self.year_dict.get(&state) {
            Some(years) if !years.is_empty() => years.clone(),
            _ => vec![Year::current()],
        }
    }

    /// True when any state asks for two or more years.
    pub fn is_comparative(&self) -> bool {
        self.states.iter().any(|state| self.years_for(*state).len() > 1)
    }
}

/// One map: layers to add in order, centered on a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center_on: StateName,
    pub zoom: u8,
    pub layers: Vec<Layer>,
    pub legends: Vec<Legend>,
    pub captions: Vec<String>,
}

impl MapView {
    fn new(center_on: StateName) -> MapView {
        MapView {
            center_on,
            zoom: DEFAULT_ZOOM,
            layers: Vec::new(),
            legends: Vec::new(),
            captions: Vec::new(),
        }
    }

    fn add_state(&mut self, state: StateName, geometry: &Value, year: Year, metrics: &[Metric]) {
        self.layers.push(boundary_layer(state, geometry));
        self.layers
            .extend(metrics.iter().filter_map(|metric| index_layer(*metric, state, year)));
        if metrics.iter().any(Metric::is_land_cover) {
            self.layers.push(land_cover_layer(state, year));
            let legend = land_cover_legend();
            if !self.legends.contains(&legend) {
                self.legends.push(legend);
            }
            self.captions.push(land_cover_caption());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativeMap {
    pub state: StateName,
    pub year: Year,
    pub map: MapView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "maps", rename_all = "snake_case")]
pub enum MapOutput {
    /// All states on one map, each at its first requested year.
    Single(MapView),
    /// One map per (state, year) for states with two or more years.
    Comparative(Vec<ComparativeMap>),
}

impl MapOutput {
    pub fn summary(&self) -> String {
        match self {
            MapOutput::Single(view) => format!(
                "Map centered on {} with {} layers",
                view.center_on,
                view.layers.len()
            ),
            MapOutput::Comparative(maps) => {
                let labels: Vec<String> = maps.iter().map(|m| format!("{} {}", m.state, m.year)).collect();
                format!("{} comparative maps: {}", maps.len(), labels.join(", "))
            }
        }
    }
}

#[async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render(&self, request: &MapRequest) -> Result<MapOutput>;
}

/// Builds layer descriptors from the session's boundary index.
pub struct LayerMapRenderer {
    session: Arc<EarthEngineSession>,
}

impl LayerMapRenderer {
    pub fn new(session: Arc<EarthEngineSession>) -> Self {
        Self { session }
    }

    fn comparative(
        request: &MapRequest,
        geometries: &[(StateName, &Value)],
    ) -> Result<MapOutput> {
        let mut maps = Vec::new();
        for (state, geometry) in geometries {
            let years = request.years_for(*state);
            if years.len() < 2 {
                info!("Skipping comparative map for {}: only {} year(s)", state, years.len());
                continue;
            }
            for year in years {
                let mut view = MapView::new(*state);
                view.add_state(*state, geometry, year, &request.metrics);
                info!("Generated comparative map for {} {}", state, year);
                maps.push(ComparativeMap {
                    state: *state,
                    year,
                    map: view,
                });
            }
        }
        if maps.is_empty() {
            return Err(MapError::NoComparative);
        }
        Ok(MapOutput::Comparative(maps))
    }

    fn single(request: &MapRequest, geometries: &[(StateName, &Value)]) -> Result<MapOutput> {
        let Some((first, _)) = geometries.first() else {
            return Err(MapError::NoGeometry);
        };
        let mut view = MapView::new(*first);
        for (state, geometry) in geometries {
            let year = request.years_for(*state)[0];
            view.add_state(*state, geometry, year, &request.metrics);
        }
        Ok(MapOutput::Single(view))
    }
}

#[async_trait]
impl MapRenderer for LayerMapRenderer {
    async fn render(&self, request: &MapRequest) -> Result<MapOutput> {
        let boundaries = self.session.boundaries().await?;
        let geometries: Vec<(StateName, &Value)> = request
            .states
            .iter()
            .filter_map(|state| match boundaries.geometry(*state) {
                Some(geometry) => Some((*state, geometry)),
                None => {
                    warn!("No geometry found for {}", state);
                    None
                }
            })
            .collect();
        if geometries.is_empty() {
            return Err(MapError::NoGeometry);
        }
        if request.is_comparative() {
            Self::comparative(request, &geometries)
        } else {
            Self::single(request, &geometries)
        }
    }
}
