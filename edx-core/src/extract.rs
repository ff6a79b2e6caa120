//! Line-oriented parser for values replies.
//!
//! Grammar, one construct per line:
//!
//! ```text
//! header      = YEAR WS STATE                        ; "2023 Kerala"
//! metric-line = [bullet] [YEAR] [namespace] METRIC ":" VALUE [STATE]
//! namespace   = "DynamicWorld" | "Sentinel2"
//! bullet      = "-" | "*" | "•" | "#" | ">"
//! ```
//!
//! A header sets the state/year context used by every following metric line
//! until the next header. A metric line carrying its own year or state binds
//! only that observation. Any other line is ignored.

use crate::metric::Metric;
use crate::state::StateName;
use crate::year::Year;
use log::{debug, warn};
use serde::Serialize;

/// Namespace tokens a reply may put in front of a metric name.
pub const NAMESPACE_TOKENS: [&str; 2] = ["DynamicWorld", "Sentinel2"];

const BULLET_CHARS: &[char] = &['-', '*', '•', '#', '>'];

/// One `metric: value` reading pulled out of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedObservation {
    pub year: Option<Year>,
    pub state: Option<StateName>,
    pub metric: Metric,
    pub value: f64,
}

#[derive(Debug, PartialEq)]
enum Line {
    Header {
        year: Option<Year>,
        state: Option<StateName>,
    },
    Reading {
        year: Option<Year>,
        state: Option<StateName>,
        metric: Metric,
        value: Option<f64>,
        raw_value: String,
    },
    Other,
}

/// Extract observations for `requested` metrics, in text order.
///
/// State names are matched case-insensitively against `known_states` only.
/// Readings for metrics that were not requested, and values that do not
/// parse as numbers, are dropped.
pub fn extract(text: &str, requested: &[Metric], known_states: &[StateName]) -> Vec<ParsedObservation> {
    let mut context: (Option<Year>, Option<StateName>) = (None, None);
    let mut observations = Vec::new();

    for (line_number, raw) in text.lines().enumerate() {
        match parse_line(raw, known_states) {
            Line::Header { year, state } => {
                debug!("Header at line {}: {:?} {:?}", line_number + 1, year, state);
                context = (year, state);
            }
            Line::Reading {
                year,
                state,
                metric,
                value,
                raw_value,
            } => {
                if !requested.contains(&metric) {
                    debug!("Skipping unrequested metric {} at line {}", metric, line_number + 1);
                    continue;
                }
                let Some(value) = value else {
                    warn!(
                        "Invalid value for {} at line {}: {:?}",
                        metric,
                        line_number + 1,
                        raw_value
                    );
                    continue;
                };
                observations.push(ParsedObservation {
                    year: year.or(context.0),
                    state: state.or(context.1),
                    metric,
                    value,
                });
            }
            Line::Other => {}
        }
    }
    observations
}

/// Remove namespace tokens so "DynamicWorld water: 0.2" reads "water: 0.2".
pub fn clean_response(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut cleaned = line.to_string();
            for token in NAMESPACE_TOKENS {
                cleaned = strip_namespace(&cleaned, token);
            }
            cleaned
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn strip_namespace(line: &str, token: &str) -> String {
    let words: Vec<&str> = line.split(' ').collect();
    words
        .iter()
        .enumerate()
        .filter(|(i, word)| {
            let next = words.get(i + 1).copied().unwrap_or("");
            let after = words.get(i + 2).copied().unwrap_or("");
            let followed_by_metric = next.contains(':') || after.starts_with(':');
            !(**word == token && followed_by_metric)
        })
        .map(|(_, word)| *word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_line(raw: &str, known_states: &[StateName]) -> Line {
    let line = raw
        .trim()
        .trim_start_matches(|c: char| BULLET_CHARS.contains(&c) || c.is_whitespace())
        .trim_end();
    if line.is_empty() {
        return Line::Other;
    }
    match line.split_once(':') {
        Some((left, right)) => parse_reading(left, right, known_states),
        None => parse_header(line, known_states),
    }
}

fn parse_header(line: &str, known_states: &[StateName]) -> Line {
    let line = line.trim_matches('*').trim();
    let Some((year_token, rest)) = line.split_once(char::is_whitespace) else {
        return Line::Other;
    };
    let is_year_token = year_token.len() == 4 && year_token.bytes().all(|b| b.is_ascii_digit());
    let rest = rest.trim();
    if !is_year_token || rest.is_empty() || !rest.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return Line::Other;
    }
    Line::Header {
        year: Year::parse(year_token),
        state: match_state(rest, known_states),
    }
}

fn parse_reading(left: &str, right: &str, known_states: &[StateName]) -> Line {
    let mut tokens: Vec<&str> = left
        .split_whitespace()
        .map(|t| t.trim_matches('*'))
        .filter(|t| !t.is_empty())
        .collect();

    let year = match tokens.first() {
        Some(first) if first.len() == 4 && first.bytes().all(|b| b.is_ascii_digit()) => {
            let year = Year::parse(first);
            tokens.remove(0);
            // An out-of-range inline year must not fall back to the header year.
            if year.is_none() {
                return Line::Other;
            }
            year
        }
        _ => None,
    };
    if tokens.first().is_some_and(|t| NAMESPACE_TOKENS.contains(t)) {
        tokens.remove(0);
    }
    let [name] = tokens.as_slice() else {
        return Line::Other;
    };
    let Some(metric) = Metric::from_name(name) else {
        return Line::Other;
    };

    let right = right.trim();
    let (raw_value, trailing) = match right.split_once(char::is_whitespace) {
        Some((value, trailing)) => (value, trailing),
        None => (right, ""),
    };
    let raw_value = raw_value
        .trim_start_matches(|c: char| matches!(c, '*' | '('))
        .trim_end_matches(|c: char| matches!(c, '*' | ',' | ';' | ')' | '.'));
    Line::Reading {
        year,
        state: match_state(trailing, known_states),
        metric,
        value: raw_value.parse::<f64>().ok().filter(|v| v.is_finite()),
        raw_value: raw_value.to_string(),
    }
}

fn match_state(text: &str, known_states: &[StateName]) -> Option<StateName> {
    let candidate = text.trim_matches(|c: char| !c.is_alphabetic());
    if candidate.is_empty() {
        return None;
    }
    StateName::lookup(candidate).filter(|state| known_states.contains(state))
}
