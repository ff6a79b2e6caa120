use edx_utils::fmt::two_decimals;
use serde::Serialize;

/// Floor for the top of a value axis when every value is zero.
pub const AXIS_FLOOR: f64 = 0.1;
/// Headroom above the tallest bar on a single state-year bar chart.
pub const SINGLE_BAR_HEADROOM: f64 = 1.5;
/// Headroom on every other value axis.
pub const DEFAULT_HEADROOM: f64 = 1.2;

/// Fixed text shown on every pie slice.
pub const PIE_TEXT_INFO: &str = "label+percent";
pub const PIE_HOLE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    /// `[min, max]`, or `None` to let the renderer decide.
    pub range: Option<[f64; 2]>,
}

impl Axis {
    pub fn labelled(title: &str) -> Axis {
        Axis {
            title: title.to_string(),
            range: None,
        }
    }

    /// A value axis from zero to the observed maximum plus headroom.
    pub fn values(title: &str, observed_max: f64, headroom: f64) -> Axis {
        Axis {
            title: title.to_string(),
            range: Some([0.0, observed_max.max(AXIS_FLOOR) * headroom]),
        }
    }

    /// Push the bottom of a value axis below zero when the data goes negative.
    pub fn down_to(mut self, observed_min: f64, headroom: f64) -> Axis {
        if let Some(range) = self.range.as_mut() {
            if observed_min < 0.0 {
                range[0] = observed_min * headroom;
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    /// Legend entry; `None` for a single unnamed series.
    pub name: Option<String>,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    /// Value labels drawn on the bars.
    pub text: Vec<String>,
}

impl BarSeries {
    pub fn new(name: Option<String>, x: Vec<String>, y: Vec<f64>) -> BarSeries {
        let text = y.iter().map(|v| two_decimals(*v)).collect();
        BarSeries { name, x, y, text }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    /// Series are drawn side by side rather than overlaid.
    pub grouped: bool,
    pub series: Vec<BarSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Hex colours with a leading '#', aligned with `labels`.
    pub colors: Vec<String>,
    pub text_info: String,
    pub hole: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub x: Vec<u16>,
    pub y: Vec<f64>,
    pub text: Vec<String>,
}

impl LineSeries {
    pub fn new(name: String, x: Vec<u16>, y: Vec<f64>) -> LineSeries {
        let text = y.iter().map(|v| two_decimals(*v)).collect();
        LineSeries { name, x, y, text }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub x_ticks: Vec<u16>,
    pub series: Vec<LineSeries>,
}

/// One chart produced for a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    /// Grouped bars keyed by "State (Year)", one series per metric.
    StateYearComparison(BarChart),
    /// Metric values for one state and year.
    StateYearMetrics(BarChart),
    /// Grouped bars for one state, one series per year.
    YearComparison(BarChart),
    LandCoverPie(PieChart),
    /// One state's metrics over the years.
    StateTrend(LineChart),
    /// One metric across states over the years.
    MetricComparison(LineChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::StateYearComparison(c) | Chart::StateYearMetrics(c) | Chart::YearComparison(c) => &c.title,
            Chart::LandCoverPie(c) => &c.title,
            Chart::StateTrend(c) | Chart::MetricComparison(c) => &c.title,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Chart::StateYearComparison(_) => "state_year_comparison",
            Chart::StateYearMetrics(_) => "state_year_metrics",
            Chart::YearComparison(_) => "year_comparison",
            Chart::LandCoverPie(_) => "land_cover_pie",
            Chart::StateTrend(_) => "state_trend",
            Chart::MetricComparison(_) => "metric_comparison",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_axis_floor() {
        assert_eq!(Axis::values("Value", 0.0, 1.5).range, Some([0.0, 0.1 * 1.5]));
        assert_eq!(Axis::values("Value", 0.5, 1.2).range, Some([0.0, 0.5 * 1.2]));
    }

    #[test]
    fn test_value_axis_down_to_negative_minimum() {
        let axis = Axis::values("Value", -0.18, 1.2).down_to(-0.22, 1.2);
        assert_eq!(axis.range, Some([-0.22 * 1.2, 0.1 * 1.2]));
        let positive = Axis::values("Value", 0.5, 1.2).down_to(0.3, 1.2);
        assert_eq!(positive.range, Some([0.0, 0.5 * 1.2]));
    }

    #[test]
    fn test_chart_serializes_with_kind_tag() {
        let chart = Chart::StateYearMetrics(BarChart {
            title: "Metrics for Goa (2023)".to_string(),
            x_axis: Axis::labelled("Metrics"),
            y_axis: Axis::values("Value", 0.4, SINGLE_BAR_HEADROOM),
            grouped: false,
            series: vec![BarSeries::new(None, vec!["NDVI".to_string()], vec![0.4])],
        });
        let json: serde_json::Value = serde_json::from_str(&chart.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "state_year_metrics");
        assert_eq!(json["title"], "Metrics for Goa (2023)");
        assert_eq!(json["series"][0]["text"][0], "0.40");
        assert_eq!(chart.kind(), "state_year_metrics");
    }
}
