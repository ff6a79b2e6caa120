//! Post-extraction processing for environmental value tables.
//!
//! This crate repairs empty cells, normalizes land-cover proportions and
//! turns a finished table into narrated prose.

/// Targeted follow-up requests for cells the first reply left empty.
pub mod gap_fill {
    use edx_core::extract::extract;
    use edx_core::intent::QueryIntent;
    use edx_core::prompt::repair_query;
    use edx_core::service::{is_api_error, CorpusContext, CorpusLookup, ValuesRequest, ValuesService};
    use edx_core::state::StateName;
    use edx_core::table::ValueTable;
    use edx_core::year::Year;
    use log::{info, warn};

    /// Send one repair request per all-zero cell and merge the reply into that cell.
    ///
    /// Returns the cells a request was sent for. Cells whose state has no
    /// corpus are skipped. An `API Error:` reply leaves the cell unchanged.
    pub async fn fill(
        table: &mut ValueTable,
        intent: &QueryIntent,
        corpus: &dyn CorpusLookup,
        values: &dyn ValuesService,
    ) -> Vec<(StateName, Year)> {
        let mut attempted = Vec::new();
        let metrics = table.metrics().to_vec();

        for (state, year) in table.empty_cells() {
            let context = match CorpusContext::collect(corpus, &[state]) {
                Ok(context) if context.missing.is_empty() => context,
                Ok(_) => {
                    warn!("No corpus for {}, skipping repair of {}", state, year);
                    continue;
                }
                Err(e) => {
                    warn!("Corpus lookup failed for {}: {}", state, e);
                    continue;
                }
            };
            info!("Missing data for {} {}, sending a repair request", state, year);
            let request = ValuesRequest {
                corpus: context.text,
                query: repair_query(&metrics, state, year),
                states: vec![state],
                metrics: Some(metrics.clone()),
            };
            attempted.push((state, year));

            let reply = values.values(&request).await;
            if is_api_error(&reply) {
                warn!("Repair request for {} {} failed: {}", state, year, reply);
                continue;
            }
            let observations = extract(&reply, &metrics, &intent.states);
            let applied = table.apply_to_cell(state, year, &observations);
            if applied == 0 {
                info!("Repair reply for {} {} carried no usable values", state, year);
            }
        }
        attempted
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::fakes::ScriptedValues;
        use edx_core::metric::Metric;
        use edx_core::service::MemoryCorpus;

        fn state(name: &str) -> StateName {
            StateName::lookup(name).unwrap()
        }

        fn year(value: u16) -> Year {
            Year::new(value).unwrap()
        }

        #[tokio::test]
        async fn test_no_data_reply_leaves_cell_zero() {
            let intent = QueryIntent::parse("NDVI for Kerala 2023");
            let mut table = ValueTable::new(&intent);
            let corpus = MemoryCorpus::new().with(state("Kerala"), "kerala text");
            let values = ScriptedValues::new(vec!["No relevant data"]);

            let attempted = fill(&mut table, &intent, &corpus, &values).await;

            assert_eq!(attempted, vec![(state("Kerala"), year(2023))]);
            assert_eq!(table.row(state("Kerala"), year(2023)), Some(&[0.0][..]));
            let requests = values.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].query, "Environmental data for NDVI in Kerala 2023");
            assert_eq!(requests[0].states, vec![state("Kerala")]);
        }

        #[tokio::test]
        async fn test_repair_fills_only_the_target_cell() {
            let intent = QueryIntent::parse("NDVI for Kerala and Goa 2023");
            let mut table = ValueTable::new(&intent);
            table.set(state("Goa"), year(2023), Metric::Ndvi, 0.25);
            let corpus = MemoryCorpus::new()
                .with(state("Kerala"), "kerala text")
                .with(state("Goa"), "goa text");
            let values = ScriptedValues::new(vec!["NDVI: 0.41\n2023 Goa\nNDVI: 0.99"]);

            let attempted = fill(&mut table, &intent, &corpus, &values).await;

            assert_eq!(attempted.len(), 1);
            assert_eq!(table.value(state("Kerala"), year(2023), Metric::Ndvi), Some(0.41));
            assert_eq!(table.value(state("Goa"), year(2023), Metric::Ndvi), Some(0.25));
        }

        #[tokio::test]
        async fn test_api_error_and_missing_corpus() {
            let intent = QueryIntent::parse("NDVI for Kerala and Goa 2023");
            let mut table = ValueTable::new(&intent);
            let corpus = MemoryCorpus::new().with(state("Kerala"), "kerala text");
            let values = ScriptedValues::new(vec!["API Error: timed out"]);

            let attempted = fill(&mut table, &intent, &corpus, &values).await;

            assert_eq!(attempted, vec![(state("Kerala"), year(2023))]);
            assert_eq!(table.empty_cells().len(), 2);
        }

        #[tokio::test]
        async fn test_full_table_sends_nothing() {
            let intent = QueryIntent::parse("NDVI for Kerala 2023");
            let mut table = ValueTable::new(&intent);
            table.set(state("Kerala"), year(2023), Metric::Ndvi, 0.4);
            let values = ScriptedValues::new(vec![]);

            let attempted = fill(&mut table, &intent, &MemoryCorpus::new(), &values).await;

            assert!(attempted.is_empty());
            assert!(values.requests().is_empty());
        }
    }
}

/// Land-cover proportion normalization.
pub mod normalize {
    use edx_core::table::ValueTable;
    use log::debug;

    /// Rows whose sum is within this distance of 1 are left as they are.
    pub const SUM_TOLERANCE: f64 = 0.01;

    /// Rescale land-cover rows so each non-zero row sums to 1.
    ///
    /// Does nothing unless `land_cover` is set. Idempotent.
    pub fn normalize(table: &mut ValueTable, land_cover: bool) -> &mut ValueTable {
        if !land_cover {
            return table;
        }
        for row in table.rows_mut() {
            normalize_row(row);
        }
        table
    }

    /// Divide a row by its sum when the sum is positive and off by more than the tolerance.
    pub fn normalize_row(row: &mut [f64]) {
        let total: f64 = row.iter().sum();
        if total > 0.0 && (total - 1.0).abs() > SUM_TOLERANCE {
            debug!("Normalizing row with sum {}", total);
            row.iter_mut().for_each(|v| *v /= total);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use edx_core::intent::QueryIntent;
        use edx_core::metric::Metric;
        use edx_core::state::StateName;
        use edx_core::year::Year;

        #[test]
        fn test_row_within_tolerance_is_unchanged() {
            let mut row = vec![0.5, 0.3, 0.205];
            normalize_row(&mut row);
            assert_eq!(row, vec![0.5, 0.3, 0.205]);
        }

        #[test]
        fn test_row_outside_tolerance_is_rescaled() {
            let mut row = vec![0.2, 0.2, 0.2, 0.2, 0.1, 0.05, 0.03, 0.03, 0.02];
            normalize_row(&mut row);
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!((row[0] - 0.2 / 1.03).abs() < 1e-9);
        }

        #[test]
        fn test_row_is_rescaled() {
            let mut row = vec![1.0, 1.0];
            normalize_row(&mut row);
            assert_eq!(row, vec![0.5, 0.5]);
        }

        #[test]
        fn test_zero_row_is_untouched() {
            let mut row = vec![0.0; 9];
            normalize_row(&mut row);
            assert!(row.iter().all(|v| *v == 0.0));
        }

        #[test]
        fn test_normalize_table_is_idempotent() {
            let intent = QueryIntent::parse("Land cover for Goa 2023");
            let goa = StateName::lookup("Goa").unwrap();
            let year = Year::new(2023).unwrap();
            let mut table = ValueTable::new(&intent);
            table.set(goa, year, Metric::Water, 0.6);
            table.set(goa, year, Metric::Trees, 1.4);
            table.set(goa, year, Metric::Built, 1.0);

            normalize(&mut table, true);
            let once = table.clone();
            normalize(&mut table, true);

            assert_eq!(table, once);
            let sum: f64 = table.row(goa, year).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!((table.value(goa, year, Metric::Water).unwrap() - 0.2).abs() < 1e-9);
        }

        #[test]
        fn test_index_queries_are_not_normalized() {
            let intent = QueryIntent::parse("NDVI for Goa 2023");
            let goa = StateName::lookup("Goa").unwrap();
            let year = Year::new(2023).unwrap();
            let mut table = ValueTable::new(&intent);
            table.set(goa, year, Metric::Ndvi, 3.0);
            normalize(&mut table, false);
            assert_eq!(table.value(goa, year, Metric::Ndvi), Some(3.0));
        }
    }
}

/// Narrated report over a finished value table.
pub mod report {
    use edx_core::extract::clean_response;
    use edx_core::prompt::NO_RELEVANT_DATA;
    use edx_core::service::{NarrationRequest, NarrationService};
    use edx_core::state::StateName;
    use edx_core::table::ValueTable;
    use log::warn;
    use serde::Serialize;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(tag = "status", content = "text", rename_all = "snake_case")]
    pub enum Report {
        Text(String),
        NoRelevantData,
        /// Narration failed; carries the error text.
        Unavailable(String),
    }

    impl fmt::Display for Report {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Report::Text(text) => f.write_str(text),
                Report::NoRelevantData => f.write_str(NO_RELEVANT_DATA),
                Report::Unavailable(e) => write!(f, "Report unavailable: {}", e),
            }
        }
    }

    pub async fn synthesize(
        narration: &dyn NarrationService,
        corpus: &str,
        query: &str,
        states: &[StateName],
        table: &ValueTable,
    ) -> Report {
        let request = NarrationRequest {
            corpus: corpus.to_string(),
            query: query.to_string(),
            states: states.to_vec(),
            values_text: table.to_grammar_text(),
        };
        match narration.narrate(&request).await {
            Ok(text) => {
                let cleaned = clean_response(&text);
                if is_no_relevant_data(&cleaned) {
                    Report::NoRelevantData
                } else {
                    Report::Text(cleaned)
                }
            }
            Err(e) => {
                warn!("Narration failed: {}", e);
                Report::Unavailable(e.to_string())
            }
        }
    }

    fn is_no_relevant_data(text: &str) -> bool {
        text.trim().trim_end_matches('.').eq_ignore_ascii_case(NO_RELEVANT_DATA)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::fakes::ScriptedNarration;
        use edx_core::intent::QueryIntent;

        fn table() -> ValueTable {
            ValueTable::new(&QueryIntent::parse("NDVI for Kerala 2023"))
        }

        #[tokio::test]
        async fn test_report_is_cleaned() {
            let narration = ScriptedNarration::ok("Kerala\nSentinel2 NDVI: 0.41\n");
            let kerala = StateName::lookup("Kerala").unwrap();
            let report = synthesize(&narration, "ctx", "NDVI for Kerala 2023", &[kerala], &table()).await;
            assert_eq!(report, Report::Text("Kerala\nNDVI: 0.41".to_string()));
            let request = narration.last_request().unwrap();
            assert_eq!(request.values_text, "2023 Kerala\nNDVI: 0.000\n");
        }

        #[tokio::test]
        async fn test_no_relevant_data() {
            let narration = ScriptedNarration::ok("No relevant data.");
            let report = synthesize(&narration, "", "q", &[], &table()).await;
            assert_eq!(report, Report::NoRelevantData);
        }

        #[tokio::test]
        async fn test_narration_failure_is_unavailable() {
            let narration = ScriptedNarration::failing("Error generating response");
            let report = synthesize(&narration, "", "q", &[], &table()).await;
            assert_eq!(
                report,
                Report::Unavailable("Failed to parse HTTP response: Error generating response".to_string())
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use async_trait::async_trait;
    use edx_core::error::{EdxError, Result};
    use edx_core::service::{NarrationRequest, NarrationService, ValuesRequest, ValuesService};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies from a fixed script, recording every request.
    pub struct ScriptedValues {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<ValuesRequest>>,
    }

    impl ScriptedValues {
        pub fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<ValuesRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ValuesService for ScriptedValues {
        async fn values(&self, request: &ValuesRequest) -> String {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "No relevant data".to_string())
        }
    }

    pub struct ScriptedNarration {
        reply: std::result::Result<String, String>,
        last: Mutex<Option<NarrationRequest>>,
    }

    impl ScriptedNarration {
        pub fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last: Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                last: Mutex::new(None),
            }
        }

        pub fn last_request(&self) -> Option<NarrationRequest> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NarrationService for ScriptedNarration {
        async fn narrate(&self, request: &NarrationRequest) -> Result<String> {
            *self.last.lock().unwrap() = Some(request.clone());
            self.reply.clone().map_err(EdxError::ResponseParse)
        }
    }
}
