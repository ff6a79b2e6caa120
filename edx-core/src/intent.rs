//! Query interpretation: free text into states, years and metrics.
//!
//! Year detection runs global rules first ("last N years", explicit ranges,
//! standalone year tokens) so a temporal phrase applies to every mentioned
//! state; only then is a year written next to a single state's name
//! considered, and finally the current year is used.

use crate::metric::{Metric, INDEX_PRIORITY, LAND_COVER_CLASSES};
use crate::state::StateName;
use crate::year::{clipped_span, Year, CURRENT_YEAR};
use edx_utils::text::{contains_ci, contains_word, name_pattern};
use log::debug;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static LAST_N_YEARS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"last\s+(\d+)\s+years?")
        .case_insensitive(true)
        .build()
        .expect("valid last-n-years pattern")
});

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(\d{4})\s*(?:to|-)\s*(\d{4})")
        .case_insensitive(true)
        .build()
        .expect("valid year range pattern")
});

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year token pattern"));

static STATE_PATTERNS: LazyLock<Vec<(StateName, Regex)>> = LazyLock::new(|| {
    StateName::all()
        .filter_map(|state| name_pattern(state.name()).ok().map(|re| (state, re)))
        .collect()
});

/// A state name optionally followed (or glued) by a four-digit year.
static STATE_YEAR_PATTERNS: LazyLock<Vec<(StateName, Regex)>> = LazyLock::new(|| {
    StateName::all()
        .filter_map(|state| {
            let name = state
                .name()
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            RegexBuilder::new(&format!(r"\b{}\s*(\d{{4}})?\b", name))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| (state, re))
        })
        .collect()
});

/// What a query asks for. Built once per query and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryIntent {
    /// Detected states, in catalog order.
    pub states: Vec<StateName>,
    /// Requested years per state, ascending.
    pub year_dict: BTreeMap<StateName, Vec<Year>>,
    /// Requested metrics; never empty.
    pub metrics: Vec<Metric>,
}

impl QueryIntent {
    pub fn parse(query: &str) -> QueryIntent {
        let states = detect_states(query);
        let year_dict = detect_years(query, &states);
        let metrics = detect_metrics(query);
        debug!(
            "Parsed query: states={:?} years={:?} metrics={:?}",
            states, year_dict, metrics
        );
        QueryIntent {
            states,
            year_dict,
            metrics,
        }
    }

    /// True when no catalog state was recognized. Callers report this as an input error.
    pub fn has_no_states(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_land_cover(&self) -> bool {
        self.metrics.iter().any(Metric::is_land_cover)
    }

    pub fn years_for(&self, state: StateName) -> &[Year] {
        self.year_dict.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when any state asks for more than one year.
    pub fn has_multiple_years(&self) -> bool {
        self.year_dict.values().any(|years| years.len() > 1)
    }

    /// Union of all requested years, ascending.
    pub fn union_years(&self) -> BTreeSet<Year> {
        self.year_dict.values().flatten().copied().collect()
    }
}

/// Catalog states named in the query as whole words, in catalog order.
pub fn detect_states(query: &str) -> Vec<StateName> {
    STATE_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(query))
        .map(|(state, _)| *state)
        .collect()
}

/// Requested years for each state. Every state gets at least one year.
pub fn detect_years(query: &str, states: &[StateName]) -> BTreeMap<StateName, Vec<Year>> {
    let global = last_n_years(query)
        .or_else(|| explicit_range(query))
        .or_else(|| standalone_years(query));

    states
        .iter()
        .map(|state| {
            let years = global
                .clone()
                .or_else(|| year_next_to_state(query, *state))
                .unwrap_or_else(|| vec![Year::current()]);
            (*state, years)
        })
        .collect()
}

/// Requested metrics: all land-cover classes, a single unambiguous index, or NDVI.
///
/// Naming two or more indices together falls back to NDVI alone.
pub fn detect_metrics(query: &str) -> Vec<Metric> {
    if contains_ci(query, "land cover") {
        return LAND_COVER_CLASSES.to_vec();
    }
    let named: Vec<Metric> = INDEX_PRIORITY
        .iter()
        .copied()
        .filter(|m| contains_word(query, m.name()))
        .collect();
    match named.as_slice() {
        [only] => vec![*only],
        _ => vec![Metric::Ndvi],
    }
}

fn non_empty(years: Vec<Year>) -> Option<Vec<Year>> {
    (!years.is_empty()).then_some(years)
}

fn last_n_years(query: &str) -> Option<Vec<Year>> {
    let caps = LAST_N_YEARS.captures(query)?;
    let n: i64 = caps.get(1)?.as_str().parse().ok()?;
    let current = CURRENT_YEAR as i64;
    non_empty(clipped_span(current - n + 1, current))
}

fn explicit_range(query: &str) -> Option<Vec<Year>> {
    let caps = YEAR_RANGE.captures(query)?;
    let start: i64 = caps.get(1)?.as_str().parse().ok()?;
    let end: i64 = caps.get(2)?.as_str().parse().ok()?;
    non_empty(clipped_span(start, end))
}

fn standalone_years(query: &str) -> Option<Vec<Year>> {
    let years: BTreeSet<Year> = YEAR_TOKEN
        .captures_iter(query)
        .filter_map(|caps| caps.get(1).and_then(|m| Year::parse(m.as_str())))
        .collect();
    non_empty(years.into_iter().collect())
}

fn year_next_to_state(query: &str, state: StateName) -> Option<Vec<Year>> {
    let (_, re) = STATE_YEAR_PATTERNS.iter().find(|(s, _)| *s == state)?;
    let caps = re.captures(query)?;
    let year = Year::parse(caps.get(1)?.as_str())?;
    Some(vec![year])
}
