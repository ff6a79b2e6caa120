//! One conversational turn: a query in, a report, charts and a map out.
//!
//! The map task is spawned once the table is final and runs alongside
//! narration and chart selection. It is awaited through a timeout so a slow
//! imagery platform never holds up the rest of the answer.

use edx_chart::{select, Chart};
use edx_core::extract::extract;
use edx_core::intent::QueryIntent;
use edx_core::service::{
    is_api_error, CorpusContext, CorpusLookup, NarrationService, ValuesRequest, ValuesService,
};
use edx_core::state::StateName;
use edx_core::table::ValueTable;
use edx_core::year::Year;
use edx_data::report::{synthesize, Report};
use edx_data::{gap_fill, normalize};
use edx_map::{MapOutput, MapRenderer, MapRequest};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const MISSING_STATE: &str = "Please include a state name.";
pub const NO_VISUALIZATIONS: &str = "No visualizations generated. Check data and logs.";

/// Everything a turn talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub corpus: Arc<dyn CorpusLookup>,
    pub values: Arc<dyn ValuesService>,
    pub narration: Arc<dyn NarrationService>,
    /// `None` skips map generation.
    pub map: Option<Arc<dyn MapRenderer>>,
    pub map_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum MapStatus {
    Skipped,
    Rendered(MapOutput),
    /// The renderer returned an error or the task panicked.
    Failed(String),
    TimedOut { after_secs: u64 },
    Cancelled,
}

impl MapStatus {
    /// One line for the terminal, or `None` when no map was asked for.
    pub fn describe(&self) -> Option<String> {
        match self {
            MapStatus::Skipped => None,
            MapStatus::Rendered(output) => Some(output.summary()),
            MapStatus::Failed(e) => Some(format!("Map generation failed: {}", e)),
            MapStatus::TimedOut { after_secs } => {
                Some(format!("Map generation timed out after {} seconds", after_secs))
            }
            MapStatus::Cancelled => Some("Map generation was cancelled".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Answer {
    pub intent: QueryIntent,
    pub table: ValueTable,
    /// Cells a repair request was sent for.
    pub repaired: Vec<(StateName, Year)>,
    pub report: Report,
    pub charts: Vec<Chart>,
    pub notice: Option<String>,
    pub map: MapStatus,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// The query could not be acted on; nothing was sent anywhere.
    Rejected(String),
    /// Missing corpus or a failed values request.
    Failed(String),
    Answered(Box<Answer>),
}

impl TurnOutcome {
    /// Text recorded as the assistant's reply in the conversation log.
    pub fn message(&self) -> String {
        match self {
            TurnOutcome::Rejected(message) | TurnOutcome::Failed(message) => message.clone(),
            TurnOutcome::Answered(answer) => answer.report.to_string(),
        }
    }
}

pub async fn run_turn(query: &str, collaborators: &Collaborators) -> TurnOutcome {
    let intent = QueryIntent::parse(query);
    if intent.has_no_states() {
        info!("No state named in query: {}", query);
        return TurnOutcome::Rejected(MISSING_STATE.to_string());
    }

    let context = match CorpusContext::collect(collaborators.corpus.as_ref(), &intent.states)
        .and_then(CorpusContext::require_all)
    {
        Ok(context) => context,
        Err(e) => {
            warn!("Corpus lookup failed: {}", e);
            return TurnOutcome::Failed(e.to_string());
        }
    };

    let request = ValuesRequest {
        corpus: context.text.clone(),
        query: query.to_string(),
        states: intent.states.clone(),
        metrics: Some(intent.metrics.clone()),
    };
    let reply = collaborators.values.values(&request).await;
    if is_api_error(&reply) {
        warn!("Values request failed: {}", reply);
        return TurnOutcome::Failed(reply.trim().to_string());
    }

    let mut table = ValueTable::new(&intent);
    let applied = table.apply(&extract(&reply, &intent.metrics, &intent.states));
    info!("Applied {} values from the first reply", applied);
    let repaired = gap_fill::fill(
        &mut table,
        &intent,
        collaborators.corpus.as_ref(),
        collaborators.values.as_ref(),
    )
    .await;
    normalize::normalize(&mut table, intent.is_land_cover());

    let map_task = collaborators.map.clone().map(|renderer| {
        let request = MapRequest::from_intent(&intent, query);
        tokio::spawn(async move { renderer.render(&request).await })
    });

    let report = synthesize(
        collaborators.narration.as_ref(),
        &context.text,
        query,
        &intent.states,
        &table,
    )
    .await;
    let charts = select(&table, &intent, query);
    let notice = if charts.is_empty() {
        warn!("No charts for query: {}", query);
        Some(NO_VISUALIZATIONS.to_string())
    } else {
        None
    };

    let map = match map_task {
        Some(handle) => await_map(handle, collaborators.map_timeout).await,
        None => MapStatus::Skipped,
    };

    TurnOutcome::Answered(Box::new(Answer {
        intent,
        table,
        repaired,
        report,
        charts,
        notice,
        map,
    }))
}

async fn await_map(
    mut handle: JoinHandle<edx_map::error::Result<MapOutput>>,
    limit: Duration,
) -> MapStatus {
    match timeout(limit, &mut handle).await {
        Ok(Ok(Ok(output))) => {
            info!("{}", output.summary());
            MapStatus::Rendered(output)
        }
        Ok(Ok(Err(e))) => {
            warn!("Map generation failed: {}", e);
            MapStatus::Failed(e.to_string())
        }
        Ok(Err(e)) if e.is_cancelled() => {
            warn!("Map task was cancelled");
            MapStatus::Cancelled
        }
        Ok(Err(e)) => {
            warn!("Map task panicked: {}", e);
            MapStatus::Failed(e.to_string())
        }
        Err(_) => {
            handle.abort();
            warn!("Map generation timed out after {} seconds", limit.as_secs());
            MapStatus::TimedOut {
                after_secs: limit.as_secs(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edx_core::error::Result as EdxResult;
    use edx_core::metric::Metric;
    use edx_core::service::{MemoryCorpus, NarrationRequest};
    use edx_map::MapError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Replies {
        queue: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<ValuesRequest>>,
    }

    impl Replies {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ValuesService for Replies {
        async fn values(&self, request: &ValuesRequest) -> String {
            self.seen.lock().unwrap().push(request.clone());
            self.queue.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    struct Narrator {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl NarrationService for Narrator {
        async fn narrate(&self, _request: &NarrationRequest) -> EdxResult<String> {
            *self.calls.lock().unwrap() += 1;
            Ok("Kerala is mostly forest.".to_string())
        }
    }

    enum FakeMap {
        Slow,
        Broken,
    }

    #[async_trait]
    impl MapRenderer for FakeMap {
        async fn render(&self, _request: &MapRequest) -> edx_map::error::Result<MapOutput> {
            match self {
                FakeMap::Slow => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(MapError::NoGeometry)
                }
                FakeMap::Broken => Err(MapError::NoGeometry),
            }
        }
    }

    fn kerala() -> StateName {
        StateName::lookup("Kerala").unwrap()
    }

    fn collaborators(values: Arc<Replies>, narration: Arc<Narrator>) -> Collaborators {
        Collaborators {
            corpus: Arc::new(MemoryCorpus::new().with(kerala(), "Kerala reference text")),
            values,
            narration,
            map: None,
            map_timeout: Duration::from_millis(50),
        }
    }

    fn narrator() -> Arc<Narrator> {
        Arc::new(Narrator {
            calls: Mutex::new(0),
        })
    }

    fn answered(outcome: TurnOutcome) -> Answer {
        match outcome {
            TurnOutcome::Answered(answer) => *answer,
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_without_state_sends_nothing() {
        let values = Replies::new(&[]);
        let outcome = run_turn("NDVI for 2023", &collaborators(values.clone(), narrator())).await;
        assert!(matches!(&outcome, TurnOutcome::Rejected(m) if m == MISSING_STATE));
        assert_eq!(values.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_corpus() {
        let values = Replies::new(&[]);
        let outcome = run_turn("NDVI for Kerala and Sikkim", &collaborators(values.clone(), narrator())).await;
        assert_eq!(outcome.message(), "No data file for Sikkim.");
        assert_eq!(values.calls(), 0);
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let values = Replies::new(&["API Error: connection refused"]);
        let narration = narrator();
        let outcome = run_turn("NDVI for Kerala 2023", &collaborators(values, narration.clone())).await;
        assert!(matches!(&outcome, TurnOutcome::Failed(m) if m.starts_with("API Error:")));
        assert_eq!(*narration.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_land_cover_turn() {
        let reply = "2023 Kerala\n- DynamicWorld water: 0.2\n- DynamicWorld trees: 0.6\n- DynamicWorld crops: 0.2\n";
        let values = Replies::new(&[reply]);
        let answer = answered(run_turn("Land cover of Kerala 2023", &collaborators(values.clone(), narrator())).await);

        assert_eq!(values.calls(), 1);
        assert!(answer.repaired.is_empty());
        let year = Year::new(2023).unwrap();
        assert_eq!(answer.table.value(kerala(), year, Metric::Trees), Some(0.6));
        assert_eq!(answer.report, Report::Text("Kerala is mostly forest.".to_string()));
        assert!(answer.charts.iter().any(|c| c.kind() == "land_cover_pie"));
        assert!(answer.notice.is_none());
        assert!(matches!(answer.map, MapStatus::Skipped));
    }

    #[tokio::test]
    async fn test_single_cell_turn_has_no_charts() {
        let values = Replies::new(&["2023 Kerala\nNDVI: 0.41"]);
        let answer = answered(run_turn("NDVI for Kerala 2023", &collaborators(values, narrator())).await);
        assert!(answer.charts.is_empty());
        assert_eq!(answer.notice.as_deref(), Some(NO_VISUALIZATIONS));
    }

    #[tokio::test]
    async fn test_empty_year_is_repaired() {
        let values = Replies::new(&["2023 Kerala\nNDVI: 0.41", "NDVI: 0.35"]);
        let answer = answered(
            run_turn("NDVI for Kerala 2022 to 2023", &collaborators(values.clone(), narrator())).await,
        );
        let y2022 = Year::new(2022).unwrap();
        assert_eq!(answer.repaired, vec![(kerala(), y2022)]);
        assert_eq!(answer.table.value(kerala(), y2022, Metric::Ndvi), Some(0.35));
        assert_eq!(values.calls(), 2);
        assert!(!answer.charts.is_empty());
    }

    #[tokio::test]
    async fn test_map_timeout_is_distinct() {
        let values = Replies::new(&["2023 Kerala\nNDVI: 0.41"]);
        let mut collaborators = collaborators(values, narrator());
        collaborators.map = Some(Arc::new(FakeMap::Slow));
        let answer = answered(run_turn("NDVI for Kerala 2023", &collaborators).await);
        assert!(matches!(answer.map, MapStatus::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_map_error_is_reported() {
        let values = Replies::new(&["2023 Kerala\nNDVI: 0.41"]);
        let mut collaborators = collaborators(values, narrator());
        collaborators.map = Some(Arc::new(FakeMap::Broken));
        collaborators.map_timeout = Duration::from_secs(5);
        let answer = answered(run_turn("NDVI for Kerala 2023", &collaborators).await);
        assert_eq!(
            answer.map.describe().as_deref(),
            Some("Map generation failed: No valid state geometries found")
        );
    }

    #[tokio::test]
    async fn test_aborted_map_task_is_cancelled() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err::<MapOutput, MapError>(MapError::NoGeometry)
        });
        handle.abort();
        let status = await_map(handle, Duration::from_secs(5)).await;
        assert!(matches!(status, MapStatus::Cancelled));
    }
}
