//! Chart selection: which charts a finished table supports.
//!
//! Rules run in a fixed order and each contributes zero or more charts.
//! A rule whose preconditions fail is skipped with an `info!` line; the
//! selector itself never fails.

use crate::chart::{
    Axis, BarChart, BarSeries, Chart, LineChart, LineSeries, PieChart, DEFAULT_HEADROOM, PIE_HOLE,
    PIE_TEXT_INFO, SINGLE_BAR_HEADROOM,
};
use edx_core::intent::QueryIntent;
use edx_core::metric::Metric;
use edx_core::state::StateName;
use edx_core::table::{row_is_empty, ValueTable};
use edx_core::year::Year;
use edx_utils::text::contains_ci;
use log::info;
use std::collections::HashSet;

/// Build every chart the table supports, in rule order.
pub fn select(table: &ValueTable, intent: &QueryIntent, query: &str) -> Vec<Chart> {
    let mut charts = Vec::new();
    charts.extend(state_year_comparison(table, intent, query));
    charts.extend(state_year_metrics(table, intent));
    charts.extend(year_comparisons(table, intent));
    charts.extend(land_cover_pies(table, intent));
    charts.extend(state_trend(table, intent));
    charts.extend(metric_comparisons(table, intent));
    info!("Generated {} charts", charts.len());
    charts
}

fn value_title(metrics: &[Metric]) -> &'static str {
    if metrics.iter().any(Metric::is_land_cover) {
        "Proportion"
    } else {
        "Value"
    }
}

fn metric_labels(metrics: &[Metric]) -> Vec<String> {
    metrics.iter().map(|m| m.name().to_string()).collect()
}

fn row_max(row: &[f64]) -> f64 {
    row.iter().copied().fold(0.0, f64::max)
}

fn row_min(row: &[f64]) -> f64 {
    row.iter().copied().fold(0.0, f64::min)
}

fn year_span(years: &[Year]) -> String {
    match (years.first(), years.last()) {
        (Some(first), Some(last)) if first != last => format!("{}-{}", first, last),
        (Some(only), _) => only.to_string(),
        _ => String::new(),
    }
}

/// Rows of `state` that carry data, for the given years.
fn rows_with_data<'a>(
    table: &'a ValueTable,
    state: StateName,
    years: &[Year],
) -> Vec<(Year, &'a [f64])> {
    years
        .iter()
        .filter_map(|year| table.row(state, *year).map(|row| (*year, row)))
        .filter(|(_, row)| !row_is_empty(row))
        .collect()
}

/// Rule 1: grouped bars across "State (Year)" for an explicit multi-state comparison.
fn state_year_comparison(table: &ValueTable, intent: &QueryIntent, query: &str) -> Option<Chart> {
    if intent.states.len() < 2 {
        info!("Skipping state comparison bar: fewer than two states");
        return None;
    }
    if !contains_ci(query, "compare") {
        info!("Skipping state comparison bar: query does not ask to compare");
        return None;
    }
    if intent.is_land_cover() {
        info!("Skipping state comparison bar: land cover query");
        return None;
    }
    let metrics = table.metrics();
    if metrics.len() < 2 {
        info!("Skipping state comparison bar: fewer than two metrics");
        return None;
    }

    let cells: Vec<(String, &[f64])> = table
        .cells()
        .filter(|(_, _, row)| !row_is_empty(row))
        .map(|(state, year, row)| (format!("{} ({})", state, year), row))
        .collect();
    if cells.is_empty() {
        info!("Skipping state comparison bar: no state has data");
        return None;
    }

    let categories: Vec<String> = cells.iter().map(|(label, _)| label.clone()).collect();
    let series = metrics
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            let y = cells.iter().map(|(_, row)| row[i]).collect();
            BarSeries::new(Some(metric.name().to_string()), categories.clone(), y)
        })
        .collect();
    let observed = cells.iter().map(|(_, row)| row_max(row)).fold(0.0, f64::max);

    Some(Chart::StateYearComparison(BarChart {
        title: "Metrics Comparison".to_string(),
        x_axis: Axis::labelled("States and Years"),
        y_axis: Axis::values(value_title(metrics), observed, DEFAULT_HEADROOM),
        grouped: true,
        series,
    }))
}

/// Rule 2: one bar chart per state-year with data.
fn state_year_metrics(table: &ValueTable, intent: &QueryIntent) -> Vec<Chart> {
    let metrics = table.metrics();
    if metrics.len() < 2 {
        info!("Skipping per state-year bars: fewer than two metrics");
        return Vec::new();
    }
    let mut charts = Vec::new();
    for state in &intent.states {
        for year in intent.years_for(*state) {
            let Some(row) = table.row(*state, *year) else {
                continue;
            };
            if row_is_empty(row) {
                info!("Skipping bar for {} {}: no data", state, year);
                continue;
            }
            charts.push(Chart::StateYearMetrics(BarChart {
                title: format!("Metrics for {} ({})", state, year),
                x_axis: Axis::labelled("Metrics"),
                y_axis: Axis::values(value_title(metrics), row_max(row), SINGLE_BAR_HEADROOM),
                grouped: false,
                series: vec![BarSeries::new(None, metric_labels(metrics), row.to_vec())],
            }));
        }
    }
    charts
}

/// Rule 3: per state, grouped bars with one series per year.
fn year_comparisons(table: &ValueTable, intent: &QueryIntent) -> Vec<Chart> {
    let metrics = table.metrics();
    if metrics.len() < 2 {
        info!("Skipping year comparison bars: fewer than two metrics");
        return Vec::new();
    }
    let mut charts = Vec::new();
    for state in &intent.states {
        let years = intent.years_for(*state);
        if years.len() < 2 {
            info!("Skipping year comparison bar for {}: fewer than two years", state);
            continue;
        }
        let rows = rows_with_data(table, *state, years);
        if rows.is_empty() {
            info!("Skipping year comparison bar for {}: no data", state);
            continue;
        }
        let series = rows
            .iter()
            .map(|(year, row)| BarSeries::new(Some(year.to_string()), metric_labels(metrics), row.to_vec()))
            .collect();
        let observed = rows.iter().map(|(_, row)| row_max(row)).fold(0.0, f64::max);
        let plotted: Vec<Year> = rows.iter().map(|(year, _)| *year).collect();
        charts.push(Chart::YearComparison(BarChart {
            title: format!("Metrics Comparison for {} ({})", state, year_span(&plotted)),
            x_axis: Axis::labelled("Metrics"),
            y_axis: Axis::values(value_title(metrics), observed, DEFAULT_HEADROOM),
            grouped: true,
            series,
        }));
    }
    charts
}

/// Rule 4: one pie per state-year of a land-cover query.
fn land_cover_pies(table: &ValueTable, intent: &QueryIntent) -> Vec<Chart> {
    if !intent.is_land_cover() {
        return Vec::new();
    }
    let metrics = table.metrics();
    let mut seen: HashSet<(StateName, Year)> = HashSet::new();
    let mut charts = Vec::new();
    for state in &intent.states {
        for year in intent.years_for(*state) {
            if !seen.insert((*state, *year)) {
                info!("Skipping duplicate pie chart for {} {}", state, year);
                continue;
            }
            let Some(row) = table.row(*state, *year) else {
                continue;
            };
            let slices: Vec<(Metric, f64)> = metrics
                .iter()
                .copied()
                .zip(row.iter().copied())
                .filter(|(_, v)| *v > 0.0)
                .collect();
            if slices.is_empty() {
                info!("No non-zero land cover values for {} {}", state, year);
                continue;
            }
            charts.push(Chart::LandCoverPie(PieChart {
                title: format!("Land Cover Distribution for {} ({})", state, year),
                labels: slices.iter().map(|(m, _)| m.name().to_string()).collect(),
                values: slices.iter().map(|(_, v)| *v).collect(),
                colors: slices
                    .iter()
                    .map(|(m, _)| format!("#{}", m.land_cover_color().unwrap_or("888888")))
                    .collect(),
                text_info: PIE_TEXT_INFO.to_string(),
                hole: PIE_HOLE,
            }));
        }
    }
    charts
}

/// Rule 5: one state's metrics across its years. All-zero years are left off the axis.
fn state_trend(table: &ValueTable, intent: &QueryIntent) -> Option<Chart> {
    let [state] = intent.states.as_slice() else {
        info!("Skipping trend line: needs exactly one state");
        return None;
    };
    let years = intent.years_for(*state);
    if years.len() < 2 {
        info!("Skipping trend line for {}: fewer than two years", state);
        return None;
    }
    let rows = rows_with_data(table, *state, years);
    let plotted: Vec<Year> = rows.iter().map(|(year, _)| *year).collect();
    let x: Vec<u16> = plotted.iter().map(Year::value).collect();

    let series: Vec<LineSeries> = table
        .metrics()
        .iter()
        .enumerate()
        .filter_map(|(i, metric)| {
            let y: Vec<f64> = rows.iter().map(|(_, row)| row[i]).collect();
            y.iter()
                .any(|v| *v != 0.0)
                .then(|| LineSeries::new(metric.name().to_string(), x.clone(), y))
        })
        .collect();
    if series.is_empty() {
        info!("No data for {} across years {}", state, year_span(years));
        return None;
    }
    let observed = rows.iter().map(|(_, row)| row_max(row)).fold(0.0, f64::max);
    let lowest = rows.iter().map(|(_, row)| row_min(row)).fold(0.0, f64::min);

    Some(Chart::StateTrend(LineChart {
        title: format!("Trends for {} ({})", state, year_span(&plotted)),
        x_axis: Axis::labelled("Year"),
        y_axis: Axis::values(value_title(table.metrics()), observed, DEFAULT_HEADROOM)
            .down_to(lowest, DEFAULT_HEADROOM),
        x_ticks: x,
        series,
    }))
}

/// Rule 6: per metric, one line per state over the union of requested years.
fn metric_comparisons(table: &ValueTable, intent: &QueryIntent) -> Vec<Chart> {
    if intent.states.len() < 2 {
        info!("Skipping metric comparison lines: fewer than two states");
        return Vec::new();
    }
    let union: Vec<Year> = intent.union_years().into_iter().collect();
    if union.is_empty() {
        return Vec::new();
    }
    let names = intent
        .states
        .iter()
        .map(StateName::name)
        .collect::<Vec<_>>()
        .join(", ");

    let mut charts = Vec::new();
    for (i, metric) in table.metrics().iter().enumerate() {
        let mut observed: f64 = 0.0;
        let mut lowest: f64 = 0.0;
        let mut series = Vec::new();
        for state in &intent.states {
            let rows = rows_with_data(table, *state, intent.years_for(*state));
            let points: Vec<(u16, f64)> = rows.iter().map(|(year, row)| (year.value(), row[i])).collect();
            if !points.iter().any(|(_, v)| *v != 0.0) {
                continue;
            }
            observed = points.iter().map(|(_, v)| *v).fold(observed, f64::max);
            lowest = points.iter().map(|(_, v)| *v).fold(lowest, f64::min);
            series.push(LineSeries::new(
                format!("{} ({})", state, metric),
                points.iter().map(|(x, _)| *x).collect(),
                points.iter().map(|(_, y)| *y).collect(),
            ));
        }
        if series.is_empty() {
            info!("No data for {} across states {}", metric, names);
            continue;
        }
        charts.push(Chart::MetricComparison(LineChart {
            title: format!("{} Comparison for {} ({})", metric, names, year_span(&union)),
            x_axis: Axis::labelled("Year"),
            y_axis: Axis::values(value_title(table.metrics()), observed, DEFAULT_HEADROOM)
                .down_to(lowest, DEFAULT_HEADROOM),
            x_ticks: union.iter().map(Year::value).collect(),
            series,
        }));
    }
    charts
}
