use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::models::{
    Granularity, PatternRecord, PeriodSummary, QualityLogEntry, Symbol,
};
use crate::error::StoreError;

/// Abstract period store the engine is specified against.
///
/// Keys are (symbol, granularity, period_start) throughout. Upserts must be
/// atomic per record: a crash mid-batch leaves previously committed records
/// valid. `period_starts` returns ascending order; the driver relies on it
/// to process each stream in strictly increasing period-start order.
#[async_trait]
pub trait PeriodStore: Send + Sync {
    async fn active_symbols(&self) -> Result<Vec<Symbol>, StoreError>;

    async fn upsert_symbol(&self, symbol: &Symbol) -> Result<(), StoreError>;

    /// Distinct summary period starts for a stream, ascending, optionally
    /// restricted to starts at or after `since`.
    async fn period_starts(
        &self,
        symbol: &str,
        granularity: Granularity,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    async fn summary(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError>;

    /// Nearest summary strictly before `before`, if any. This is how the
    /// driver tolerates gaps: the reference is the nearest available prior
    /// period, not necessarily the calendar-adjacent one.
    async fn summary_before(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError>;

    async fn upsert_summary(&self, summary: &PeriodSummary) -> Result<(), StoreError>;

    async fn pattern_record(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PatternRecord>, StoreError>;

    async fn upsert_pattern_records(&self, records: &[PatternRecord]) -> Result<(), StoreError>;

    async fn count_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError>;

    async fn count_pattern_records(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError>;

    async fn count_low_quality_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
        threshold: i32,
    ) -> Result<u64, StoreError>;

    async fn append_quality_log(&self, entry: &QualityLogEntry) -> Result<(), StoreError>;
}
