use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::database::models::{
    Granularity, PatternRecord, PeriodSummary, QualityLogEntry, Symbol,
};
use crate::database::store::PeriodStore;
use crate::error::StoreError;

type StreamKey = (String, Granularity, DateTime<Utc>);

#[derive(Default)]
struct Inner {
    symbols: BTreeMap<String, Symbol>,
    summaries: BTreeMap<StreamKey, PeriodSummary>,
    patterns: BTreeMap<StreamKey, PatternRecord>,
    quality_logs: Vec<QualityLogEntry>,
}

/// In-memory period store for tests and dry runs. Mirrors the PostgreSQL
/// store's key space with ordered maps so range scans behave identically.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pattern records of one stream, ascending by period start.
    pub fn pattern_records_for(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Vec<PatternRecord> {
        let inner = self.inner.read();
        inner
            .patterns
            .values()
            .filter(|r| r.symbol == symbol && r.granularity == granularity)
            .cloned()
            .collect()
    }

    pub fn quality_logs(&self) -> Vec<QualityLogEntry> {
        self.inner.read().quality_logs.clone()
    }
}

#[async_trait]
impl PeriodStore for MemoryStore {
    async fn active_symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.symbols.values().filter(|s| s.active).cloned().collect())
    }

    async fn upsert_symbol(&self, symbol: &Symbol) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.symbols.insert(symbol.name.clone(), symbol.clone());
        Ok(())
    }

    async fn period_starts(
        &self,
        symbol: &str,
        granularity: Granularity,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .summaries
            .values()
            .filter(|s| s.symbol == symbol && s.granularity == granularity)
            .filter(|s| since.map_or(true, |cutoff| s.period_start >= cutoff))
            .map(|s| s.period_start)
            .collect())
    }

    async fn summary(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .summaries
            .get(&(symbol.to_string(), granularity, period_start))
            .cloned())
    }

    async fn summary_before(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError> {
        let inner = self.inner.read();
        let lower: StreamKey = (symbol.to_string(), granularity, DateTime::<Utc>::MIN_UTC);
        let upper: StreamKey = (symbol.to_string(), granularity, before);
        Ok(inner
            .summaries
            .range((Included(lower), Excluded(upper)))
            .next_back()
            .map(|(_, summary)| summary.clone()))
    }

    async fn upsert_summary(&self, summary: &PeriodSummary) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.summaries.insert(
            (
                summary.symbol.clone(),
                summary.granularity,
                summary.period_start,
            ),
            summary.clone(),
        );
        Ok(())
    }

    async fn pattern_record(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PatternRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .patterns
            .get(&(symbol.to_string(), granularity, period_start))
            .cloned())
    }

    async fn upsert_pattern_records(&self, records: &[PatternRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        for record in records {
            inner.patterns.insert(
                (
                    record.symbol.clone(),
                    record.granularity,
                    record.period_start,
                ),
                record.clone(),
            );
        }
        Ok(())
    }

    async fn count_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .summaries
            .values()
            .filter(|s| s.symbol == symbol && s.granularity == granularity)
            .count() as u64)
    }

    async fn count_pattern_records(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .patterns
            .values()
            .filter(|r| r.symbol == symbol && r.granularity == granularity)
            .count() as u64)
    }

    async fn count_low_quality_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
        threshold: i32,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .summaries
            .values()
            .filter(|s| {
                s.symbol == symbol && s.granularity == granularity && s.quality_score < threshold
            })
            .count() as u64)
    }

    async fn append_quality_log(&self, entry: &QualityLogEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.quality_logs.push(entry.clone());
        Ok(())
    }
}
