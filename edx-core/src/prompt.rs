//! Prompt text for the values and narration services.

use crate::intent::QueryIntent;
use crate::metric::{join_names, Metric};
use crate::state::StateName;
use crate::year::Year;

/// Sentence every reply is asked to end with.
pub const SOURCE_SENTENCE: &str = "Data sourced from Sentinel-2 and Dynamic World.";

/// Literal reply meaning the corpus had nothing for the query.
pub const NO_RELEVANT_DATA: &str = "No relevant data";

const VALUES_INSTRUCTION: &str = "Provide a response using only numerical values from the corpus. \
List metrics and values (e.g., '2023 NDVI: 0.415 Kerala' or '2023 water: 0.2 Kerala') with corresponding years and states. \
For land cover, include requested Dynamic World classes (water, trees, grass, flooded_vegetation, crops, shrub_and_scrub, built, bare, snow_and_ice) \
with values summing to 1.0 per year and state, prefixed with 'DynamicWorld' (e.g., 'DynamicWorld water: 0.1'). \
If metrics are specified, only include those; otherwise, include all requested data. \
If multiple states or years are requested, provide data for each state-year combination separately. \
If no data, return 'No relevant data'. \
End with: 'Data sourced from Sentinel-2 and Dynamic World.'";

const NARRATION_INSTRUCTION: &str = "Provide a detailed response using only the specific numerical values provided in the values section. \
List metric names and their exact values (e.g., 'NDVI: 0.415', 'trees: 0.654') from the dataset. Don't mention Sentinel or Dynamic World anywhere. \
For each metric, include a paragraph (at least 50 words) explaining its significance, what the value indicates about the state's environment, \
and how it compares to typical ranges or other states if multiple are provided. \
Do not provide theoretical answers or values not present in the values section. \
If multiple states are mentioned, structure the response with clear headings for each state and compare their metrics. \
If no relevant data is found, respond only with 'No relevant data'. \
End the response with: 'Data sourced from Sentinel-2 and Dynamic World.'";

/// System message for a values request.
pub fn values_system_message(metrics: Option<&[Metric]>) -> String {
    let metric_instruction = match metrics {
        Some(metrics) if !metrics.is_empty() => format!("Metrics requested: {}", join_names(metrics)),
        _ => "All available metrics".to_string(),
    };
    format!(
        "You are an AI trained on environmental data. {}\n{}",
        VALUES_INSTRUCTION, metric_instruction
    )
}

/// User message for a values request, including the years asked for per state.
pub fn values_user_message(corpus: &str, query: &str, states: &[StateName]) -> String {
    let year_dict = QueryIntent::parse(query).year_dict;
    let years_requested = states
        .iter()
        .map(|state| {
            let years = year_dict
                .get(state)
                .cloned()
                .unwrap_or_else(|| vec![Year::current()]);
            format!("{}: {}", state, join_years(&years))
        })
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Context: {}\nQuery: {} for {}\nYears requested: {}",
        corpus,
        query,
        join_states(states),
        years_requested
    )
}

/// Full narration prompt.
pub fn narration_prompt(corpus: &str, query: &str, states: &[StateName], values_text: &str) -> String {
    format!(
        "Context: {}\nValues: {}\nQuery: {} for {}\n{}",
        corpus,
        values_text,
        query,
        join_states(states),
        NARRATION_INSTRUCTION
    )
}

/// Query text for a single-cell repair request.
pub fn repair_query(metrics: &[Metric], state: StateName, year: Year) -> String {
    format!(
        "Environmental data for {} in {} {}",
        join_names(metrics),
        state,
        year
    )
}

pub fn join_states(states: &[StateName]) -> String {
    states
        .iter()
        .map(StateName::name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_years(years: &[Year]) -> String {
    years
        .iter()
        .map(Year::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_system_message_lists_metrics() {
        let message = values_system_message(Some(&[Metric::Ndvi]));
        assert!(message.ends_with("Metrics requested: NDVI"));
        assert!(values_system_message(None).ends_with("All available metrics"));
    }

    #[test]
    fn test_values_user_message_carries_years() {
        let kerala = StateName::lookup("Kerala").unwrap();
        let goa = StateName::lookup("Goa").unwrap();
        let message = values_user_message("blob", "NDVI for Kerala2021 and Goa", &[goa, kerala]);
        assert!(message.starts_with("Context: blob\n"));
        assert!(message.contains("for Goa, Kerala"));
        assert!(message.ends_with("Years requested: Goa: 2024; Kerala: 2021"));
    }

    #[test]
    fn test_repair_query() {
        let state = StateName::lookup("Goa").unwrap();
        let year = Year::new(2020).unwrap();
        assert_eq!(
            repair_query(&[Metric::Water, Metric::Trees], state, year),
            "Environmental data for water, trees in Goa 2020"
        );
    }
}
