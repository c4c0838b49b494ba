use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Period granularity for summaries and pattern records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    pub fn all() -> [Granularity; 3] {
        [Granularity::Day, Granularity::Week, Granularity::Month]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" | "1d" => Ok(Granularity::Day),
            "week" | "weekly" | "1w" => Ok(Granularity::Week),
            "month" | "monthly" | "1mo" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

/// One exchange candle, as delivered by an external fetcher. Consumed
/// read-only by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Roll-up of the raw bars falling inside one period.
///
/// `period_end` is inclusive: it equals the next period's start minus one
/// second. Replaced wholesale on re-aggregation, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub symbol: String,
    pub granularity: Granularity,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub point_count: i32,
    pub quality_score: i32,
}

/// Persisted classification for one anchor period, keyed by
/// (symbol, granularity, period_start). Holds the breakout facts that
/// produced the label and references the current and reference summaries
/// by period start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub symbol: String,
    pub granularity: Granularity,
    pub period_start: DateTime<Utc>,
    pub reference_start: DateTime<Utc>,
    pub label: String,
    pub is_breakout_up: bool,
    pub is_breakout_down: bool,
    pub breakout_up_amount: Option<f64>,
    pub breakout_up_percent: Option<f64>,
    pub breakout_down_amount: Option<f64>,
    pub breakout_down_percent: Option<f64>,
    /// Weekly records carry the per-day trend details here; other
    /// granularities store JSON null.
    pub detail: serde_json::Value,
    /// Minimum of the two referenced summaries' quality scores.
    pub quality_score: i32,
}

/// Static symbol configuration. The engine only reads these to scope which
/// store rows to touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub display_name: Option<String>,
    pub exchange: String,
    pub active: bool,
}

/// One data-quality finding, appended by the driver's quality checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityLogEntry {
    pub symbol: String,
    pub check_type: String,
    pub status: String,
    pub message: String,
    pub affected_records: i64,
    pub checked_at: DateTime<Utc>,
}
