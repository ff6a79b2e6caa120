use crate::extract::ParsedObservation;
use crate::intent::QueryIntent;
use crate::metric::Metric;
use crate::state::StateName;
use crate::year::Year;
use edx_utils::fmt::three_decimals;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Numeric results keyed by state then year.
///
/// Each row is aligned with [`ValueTable::metrics`]. Only the (state, year)
/// cells requested by the intent exist; everything else reads as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTable {
    metrics: Vec<Metric>,
    rows: BTreeMap<StateName, BTreeMap<Year, Vec<f64>>>,
}

impl ValueTable {
    /// All-zero rows for every requested (state, year).
    pub fn new(intent: &QueryIntent) -> ValueTable {
        let width = intent.metrics.len();
        let rows = intent
            .year_dict
            .iter()
            .map(|(state, years)| {
                let by_year = years.iter().map(|year| (*year, vec![0.0; width])).collect();
                (*state, by_year)
            })
            .collect();
        ValueTable {
            metrics: intent.metrics.clone(),
            rows,
        }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn states(&self) -> impl Iterator<Item = StateName> + '_ {
        self.rows.keys().copied()
    }

    /// Years with a row for `state`, ascending.
    pub fn years(&self, state: StateName) -> Vec<Year> {
        self.rows
            .get(&state)
            .map(|by_year| by_year.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn row(&self, state: StateName, year: Year) -> Option<&[f64]> {
        self.rows.get(&state)?.get(&year).map(Vec::as_slice)
    }

    pub fn value(&self, state: StateName, year: Year, metric: Metric) -> Option<f64> {
        let column = self.column(metric)?;
        self.row(state, year)?.get(column).copied()
    }

    /// Set one cell. Returns false when the cell or metric is not part of the table.
    pub fn set(&mut self, state: StateName, year: Year, metric: Metric, value: f64) -> bool {
        let Some(column) = self.column(metric) else {
            return false;
        };
        match self.rows.get_mut(&state).and_then(|by_year| by_year.get_mut(&year)) {
            Some(row) => {
                row[column] = value;
                true
            }
            None => false,
        }
    }

    /// Fold observations in order, last write wins. Returns how many landed.
    ///
    /// Observations without both a state and a year, or bound to a cell that
    /// was not requested, are dropped.
    pub fn apply(&mut self, observations: &[ParsedObservation]) -> usize {
        let mut applied = 0;
        for obs in observations {
            let (Some(state), Some(year)) = (obs.state, obs.year) else {
                debug!("Dropping unbound observation {:?}", obs);
                continue;
            };
            if self.set(state, year, obs.metric, obs.value) {
                applied += 1;
            } else {
                debug!("Dropping observation outside the table: {} {} {}", state, year, obs.metric);
            }
        }
        applied
    }

    /// Fold observations into a single cell.
    ///
    /// Unbound observations apply to the cell; ones bound to another state
    /// or year are ignored.
    pub fn apply_to_cell(&mut self, state: StateName, year: Year, observations: &[ParsedObservation]) -> usize {
        let targeted: Vec<ParsedObservation> = observations
            .iter()
            .filter(|obs| obs.state.map_or(true, |s| s == state) && obs.year.map_or(true, |y| y == year))
            .map(|obs| ParsedObservation {
                state: Some(state),
                year: Some(year),
                ..*obs
            })
            .collect();
        self.apply(&targeted)
    }

    /// Every (state, year, row) in state then year order.
    pub fn cells(&self) -> impl Iterator<Item = (StateName, Year, &[f64])> + '_ {
        self.rows.iter().flat_map(|(state, by_year)| {
            by_year
                .iter()
                .map(move |(year, row)| (*state, *year, row.as_slice()))
        })
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Vec<f64>> + '_ {
        self.rows.values_mut().flat_map(|by_year| by_year.values_mut())
    }

    /// Cells whose row is still all zero.
    pub fn empty_cells(&self) -> Vec<(StateName, Year)> {
        self.cells()
            .filter(|(_, _, row)| row_is_empty(row))
            .map(|(state, year, _)| (state, year))
            .collect()
    }

    /// Largest value in the table, if any cell exists.
    pub fn max_value(&self) -> Option<f64> {
        self.cells()
            .flat_map(|(_, _, row)| row.iter().copied())
            .reduce(f64::max)
    }

    /// Render the table in the reply line grammar: a header per cell, then one
    /// `metric: value` line per metric.
    pub fn to_grammar_text(&self) -> String {
        let mut out = String::new();
        for (state, year, row) in self.cells() {
            out.push_str(&format!("{} {}\n", year, state));
            for (metric, value) in self.metrics.iter().zip(row) {
                out.push_str(&format!("{}: {}\n", metric, three_decimals(*value)));
            }
        }
        out
    }

    fn column(&self, metric: Metric) -> Option<usize> {
        self.metrics.iter().position(|m| *m == metric)
    }
}

/// True when every value in the row is exactly zero.
pub fn row_is_empty(row: &[f64]) -> bool {
    row.iter().all(|v| *v == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    fn state(name: &str) -> StateName {
        StateName::lookup(name).unwrap()
    }

    fn year(value: u16) -> Year {
        Year::new(value).unwrap()
    }

    #[test]
    fn test_new_table_is_all_zero() {
        let intent = QueryIntent::parse("NDVI for Kerala and Goa from 2022 to 2023");
        let table = ValueTable::new(&intent);
        assert_eq!(table.cells().count(), 4);
        assert_eq!(table.empty_cells().len(), 4);
        assert_eq!(table.row(state("Kerala"), year(2022)), Some(&[0.0][..]));
    }

    #[test]
    fn test_missing_cells_read_as_none() {
        let intent = QueryIntent::parse("NDVI for Kerala 2023");
        let table = ValueTable::new(&intent);
        assert!(table.row(state("Kerala"), year(2020)).is_none());
        assert!(table.row(state("Goa"), year(2023)).is_none());
        assert!(table.value(state("Kerala"), year(2023), Metric::Evi).is_none());
    }

    #[test]
    fn test_extract_and_fold_round_trip() {
        let mut intent = QueryIntent::parse("Compare Kerala and Goa 2023");
        intent.metrics = vec![Metric::Ndvi, Metric::Evi];
        let mut table = ValueTable::new(&intent);
        let text = "2023 Kerala\nNDVI: 0.415\nEVI: 0.322\n2023 Goa\nNDVI: 0.250\n";
        let obs = extract(text, &intent.metrics, &intent.states);
        assert_eq!(table.apply(&obs), 3);
        assert_eq!(table.row(state("Kerala"), year(2023)), Some(&[0.415, 0.322][..]));
        assert_eq!(table.row(state("Goa"), year(2023)), Some(&[0.250, 0.0][..]));
    }

    #[test]
    fn test_last_write_wins() {
        let intent = QueryIntent::parse("NDVI for Kerala 2023");
        let mut table = ValueTable::new(&intent);
        let obs = extract("2023 Kerala\nNDVI: 0.1\nNDVI: 0.7", &intent.metrics, &intent.states);
        table.apply(&obs);
        assert_eq!(table.value(state("Kerala"), year(2023), Metric::Ndvi), Some(0.7));
    }

    #[test]
    fn test_observations_outside_table_are_dropped() {
        let intent = QueryIntent::parse("NDVI for Kerala 2023");
        let mut table = ValueTable::new(&intent);
        let obs = extract("2019 Kerala\nNDVI: 0.1\nNDVI: 0.2", &intent.metrics, &intent.states);
        assert_eq!(table.apply(&obs), 0);
        assert_eq!(table.empty_cells().len(), 1);
    }

    #[test]
    fn test_apply_to_cell_ignores_other_bindings() {
        let intent = QueryIntent::parse("NDVI for Kerala and Goa 2023");
        let mut table = ValueTable::new(&intent);
        let obs = extract(
            "NDVI: 0.44\n2023 Goa\nNDVI: 0.9",
            &intent.metrics,
            &intent.states,
        );
        assert_eq!(table.apply_to_cell(state("Kerala"), year(2023), &obs), 1);
        assert_eq!(table.value(state("Kerala"), year(2023), Metric::Ndvi), Some(0.44));
        assert_eq!(table.value(state("Goa"), year(2023), Metric::Ndvi), Some(0.0));
    }

    #[test]
    fn test_grammar_text_reparses() {
        let intent = QueryIntent::parse("NDVI for Kerala 2023");
        let mut table = ValueTable::new(&intent);
        table.set(state("Kerala"), year(2023), Metric::Ndvi, 0.415);
        let text = table.to_grammar_text();
        assert_eq!(text, "2023 Kerala\nNDVI: 0.415\n");
        assert_eq!(table.max_value(), Some(0.415));
    }
}
