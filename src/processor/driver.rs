use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::calendar::Calendar;
use crate::config::EngineConfig;
use crate::database::models::{Granularity, PatternRecord, QualityLogEntry, RawBar};
use crate::database::store::PeriodStore;
use crate::error::{EngineError, StoreError};
use crate::patterns::{compare, BreakoutFact, MonthLabel, TrendDetail, WeekLabel};
use crate::processor::job::RecomputeJob;

/// Counts reported by one recompute run. On a store failure the counts
/// committed before the failure travel inside the error, so partial
/// progress is never silently lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl RecomputeOutcome {
    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

fn store_ctx(completed: RecomputeOutcome) -> impl FnOnce(StoreError) -> EngineError {
    move |source| EngineError::Store { completed, source }
}

/// Orchestrates aligner, aggregator, comparator and classifier over the
/// period store for one symbol at a time. The only component with side
/// effects; everything it calls is pure.
///
/// Reruns over the same input are idempotent: every record is fully
/// replaced on conflict, never accumulated into.
pub struct RecomputeDriver<'a, S: PeriodStore> {
    store: &'a S,
    calendar: Calendar,
    config: EngineConfig,
}

/// Staged pattern records not yet flushed to the store, split into rows
/// that will insert and rows that will overwrite an existing key.
#[derive(Default)]
struct PendingBatch {
    records: Vec<PatternRecord>,
    new_rows: u64,
    existing_rows: u64,
}

impl<'a, S: PeriodStore> RecomputeDriver<'a, S> {
    pub fn new(store: &'a S, calendar: Calendar, config: EngineConfig) -> Self {
        Self {
            store,
            calendar,
            config,
        }
    }

    /// Aggregate raw bars into period summaries for every period the bar
    /// range covers, upserting each summary wholesale. Returns the number
    /// of summaries written.
    pub async fn ingest_bars(
        &self,
        symbol: &str,
        granularity: Granularity,
        bars: &[RawBar],
    ) -> Result<u64, EngineError> {
        let (Some(first), Some(last)) = (
            bars.iter().map(|b| b.open_time).min(),
            bars.iter().map(|b| b.open_time).max(),
        ) else {
            return Ok(0);
        };

        let expected = self.config.expected_bars(granularity);
        let mut written = 0u64;

        for (start, end) in aggregate::periods_covering(&self.calendar, granularity, first, last) {
            let Some(summary) = aggregate::aggregate(symbol, granularity, bars, start, end, expected)
            else {
                continue;
            };

            if summary.quality_score < self.config.quality_warn_threshold {
                warn!(
                    symbol,
                    %granularity,
                    period_start = %start,
                    points = summary.point_count,
                    score = summary.quality_score,
                    "low data quality for period"
                );
            }

            self.store.upsert_summary(&summary).await.map_err(store_ctx(
                RecomputeOutcome {
                    inserted: written,
                    ..Default::default()
                },
            ))?;
            written += 1;
        }

        info!(symbol, %granularity, summaries = written, "ingested raw bars");
        Ok(written)
    }

    pub async fn run(&self, job: &RecomputeJob) -> Result<RecomputeOutcome, EngineError> {
        self.recompute_all(&job.symbol, job.granularity, job.since)
            .await
    }

    /// Recompute pattern records for all anchors at/after `since`, or the
    /// whole history when absent. Anchors without a current summary or
    /// without any prior reference are skipped, not errors.
    pub async fn recompute_all(
        &self,
        symbol: &str,
        granularity: Granularity,
        since: Option<DateTime<Utc>>,
    ) -> Result<RecomputeOutcome, EngineError> {
        let outcome = match granularity {
            Granularity::Day => self.recompute_days(symbol, since).await?,
            Granularity::Week => self.recompute_weeks(symbol, since).await?,
            Granularity::Month => self.recompute_months(symbol, since).await?,
        };

        info!(
            symbol,
            %granularity,
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "recompute finished"
        );
        Ok(outcome)
    }

    /// Each day against the nearest available prior day. Gaps in the daily
    /// stream widen the comparison window rather than aborting it.
    async fn recompute_days(
        &self,
        symbol: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<RecomputeOutcome, EngineError> {
        let mut outcome = RecomputeOutcome::default();
        let mut batch = PendingBatch::default();

        let starts = self
            .store
            .period_starts(symbol, Granularity::Day, since)
            .await
            .map_err(store_ctx(outcome))?;

        for start in starts {
            let Some(current) = self
                .store
                .summary(symbol, Granularity::Day, start)
                .await
                .map_err(store_ctx(outcome))?
            else {
                outcome.skipped += 1;
                continue;
            };

            let Some(reference) = self
                .store
                .summary_before(symbol, Granularity::Day, start)
                .await
                .map_err(store_ctx(outcome))?
            else {
                // First period in history; insufficient history, no record.
                outcome.skipped += 1;
                continue;
            };

            let fact = compare(&current, &reference);
            let label = TrendDetail::from_fact(&fact);
            let record = build_record(
                symbol,
                Granularity::Day,
                start,
                reference.period_start,
                label.as_str().to_string(),
                &fact,
                Value::Null,
                current.quality_score.min(reference.quality_score),
            );

            self.stage(&mut batch, &mut outcome, record).await?;
        }

        self.flush(&mut batch, &mut outcome).await?;
        Ok(outcome)
    }

    /// Each week is anchored at its opening weekday and labeled by the
    /// opening day's bar against the previous calendar day's bar; the
    /// remaining days contribute stored trend details. Either side of the
    /// opening comparison missing skips the week.
    async fn recompute_weeks(
        &self,
        symbol: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<RecomputeOutcome, EngineError> {
        let mut outcome = RecomputeOutcome::default();
        let mut batch = PendingBatch::default();

        let day_starts = self
            .store
            .period_starts(symbol, Granularity::Day, None)
            .await
            .map_err(store_ctx(outcome))?;

        for day_start in day_starts {
            let date = self.calendar.local_date(day_start);
            if date.weekday() != self.calendar.week_start_day() {
                continue;
            }

            let anchor = self.calendar.week_start_on(date);
            if since.map_or(false, |cutoff| anchor < cutoff) {
                continue;
            }

            let Some(opening_day) = self
                .store
                .summary(symbol, Granularity::Day, day_start)
                .await
                .map_err(store_ctx(outcome))?
            else {
                outcome.skipped += 1;
                continue;
            };

            let prev_day_start = self.calendar.prev_day(day_start);
            let Some(prev_day) = self
                .store
                .summary(symbol, Granularity::Day, prev_day_start)
                .await
                .map_err(store_ctx(outcome))?
            else {
                // The weekly opening comparison needs the actual previous
                // calendar day, not the nearest earlier one.
                outcome.skipped += 1;
                continue;
            };

            let fact = compare(&opening_day, &prev_day);
            let label = WeekLabel::from_fact(&fact);
            let detail = self
                .week_detail(symbol, day_start, label, &fact, &mut outcome)
                .await?;

            let record = build_record(
                symbol,
                Granularity::Week,
                anchor,
                prev_day.period_start,
                label.as_str().to_string(),
                &fact,
                detail,
                opening_day.quality_score.min(prev_day.quality_score),
            );

            self.stage(&mut batch, &mut outcome, record).await?;
        }

        self.flush(&mut batch, &mut outcome).await?;
        Ok(outcome)
    }

    /// Per-day trend details for one week, opening day first. Days with a
    /// missing summary on either side of their comparison stay null.
    async fn week_detail(
        &self,
        symbol: &str,
        opening_day_start: DateTime<Utc>,
        label: WeekLabel,
        opening_fact: &BreakoutFact,
        outcome: &mut RecomputeOutcome,
    ) -> Result<Value, EngineError> {
        let opening_date = self.calendar.local_date(opening_day_start);
        let mut days = Vec::with_capacity(7);
        days.push(day_detail_entry(
            weekday_name(opening_date.weekday()),
            label.day_letter(0).as_char(),
            opening_fact,
        ));

        for index in 1..7 {
            let today_start = opening_day_start + Duration::days(index as i64);
            let yesterday_start = opening_day_start + Duration::days(index as i64 - 1);

            let today = self
                .store
                .summary(symbol, Granularity::Day, today_start)
                .await
                .map_err(store_ctx(*outcome))?;
            let yesterday = self
                .store
                .summary(symbol, Granularity::Day, yesterday_start)
                .await
                .map_err(store_ctx(*outcome))?;

            match (today, yesterday) {
                (Some(today), Some(yesterday)) => {
                    let fact = compare(&today, &yesterday);
                    let date = opening_date + Duration::days(index as i64);
                    days.push(day_detail_entry(
                        weekday_name(date.weekday()),
                        label.day_letter(index).as_char(),
                        &fact,
                    ));
                }
                _ => days.push(Value::Null),
            }
        }

        Ok(json!({
            "opening_day_start": opening_day_start,
            "days": days,
        }))
    }

    /// One record per month, anchored at the month's first week (or the
    /// earliest week on file when the first week produced no summary),
    /// compared against the nearest prior week on record.
    async fn recompute_months(
        &self,
        symbol: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<RecomputeOutcome, EngineError> {
        let mut outcome = RecomputeOutcome::default();
        let mut batch = PendingBatch::default();

        let week_starts = self
            .store
            .period_starts(symbol, Granularity::Week, None)
            .await
            .map_err(store_ctx(outcome))?;

        let mut months: BTreeMap<(i32, u32), Vec<DateTime<Utc>>> = BTreeMap::new();
        for start in week_starts {
            months
                .entry(self.calendar.year_month(start))
                .or_default()
                .push(start);
        }

        for ((year, month), starts) in months {
            let first_week = self.calendar.first_week_of_month(year, month);
            let anchor = if starts.contains(&first_week) {
                first_week
            } else {
                starts[0]
            };

            if since.map_or(false, |cutoff| anchor < cutoff) {
                continue;
            }

            let Some(current) = self
                .store
                .summary(symbol, Granularity::Week, anchor)
                .await
                .map_err(store_ctx(outcome))?
            else {
                outcome.skipped += 1;
                continue;
            };

            let Some(reference) = self
                .store
                .summary_before(symbol, Granularity::Week, anchor)
                .await
                .map_err(store_ctx(outcome))?
            else {
                outcome.skipped += 1;
                continue;
            };

            let fact = compare(&current, &reference);
            let label = MonthLabel::from_fact(&fact);
            let week_of_month = self.calendar.week_of_month(anchor);
            let record = build_record(
                symbol,
                Granularity::Month,
                anchor,
                reference.period_start,
                label.as_str().to_string(),
                &fact,
                json!({
                    "year": year,
                    "month": month,
                    "week_of_month": week_of_month,
                    "letter": label.week_letter(week_of_month).map(|l| l.to_string()),
                }),
                current.quality_score.min(reference.quality_score),
            );

            debug!(symbol, year, month, label = label.as_str(), "month classified");
            self.stage(&mut batch, &mut outcome, record).await?;
        }

        self.flush(&mut batch, &mut outcome).await?;
        Ok(outcome)
    }

    /// Count summaries below the configured quality threshold and append a
    /// log entry per affected granularity. Returns the total affected.
    pub async fn run_quality_checks(&self, symbol: &str) -> Result<u64, EngineError> {
        let threshold = self.config.quality_warn_threshold;
        let mut total = 0u64;

        for granularity in Granularity::all() {
            let affected = self
                .store
                .count_low_quality_summaries(symbol, granularity, threshold)
                .await
                .map_err(store_ctx(RecomputeOutcome::default()))?;

            if affected == 0 {
                continue;
            }

            warn!(symbol, %granularity, affected, threshold, "low quality summaries");
            self.store
                .append_quality_log(&QualityLogEntry {
                    symbol: symbol.to_string(),
                    check_type: "LOW_QUALITY_DATA".to_string(),
                    status: "WARN".to_string(),
                    message: format!(
                        "{affected} {granularity} summaries below quality score {threshold}"
                    ),
                    affected_records: affected as i64,
                    checked_at: Utc::now(),
                })
                .await
                .map_err(store_ctx(RecomputeOutcome::default()))?;
            total += affected;
        }

        Ok(total)
    }

    async fn stage(
        &self,
        batch: &mut PendingBatch,
        outcome: &mut RecomputeOutcome,
        record: PatternRecord,
    ) -> Result<(), EngineError> {
        let exists = self
            .store
            .pattern_record(&record.symbol, record.granularity, record.period_start)
            .await
            .map_err(store_ctx(*outcome))?
            .is_some();

        if exists {
            batch.existing_rows += 1;
        } else {
            batch.new_rows += 1;
        }
        batch.records.push(record);

        if batch.records.len() >= self.config.batch_size {
            self.flush(batch, outcome).await?;
        }
        Ok(())
    }

    async fn flush(
        &self,
        batch: &mut PendingBatch,
        outcome: &mut RecomputeOutcome,
    ) -> Result<(), EngineError> {
        if batch.records.is_empty() {
            return Ok(());
        }

        self.store
            .upsert_pattern_records(&batch.records)
            .await
            .map_err(store_ctx(*outcome))?;

        outcome.inserted += batch.new_rows;
        outcome.updated += batch.existing_rows;
        debug!(records = batch.records.len(), "flushed pattern batch");
        *batch = PendingBatch::default();
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    symbol: &str,
    granularity: Granularity,
    period_start: DateTime<Utc>,
    reference_start: DateTime<Utc>,
    label: String,
    fact: &BreakoutFact,
    detail: Value,
    quality_score: i32,
) -> PatternRecord {
    PatternRecord {
        symbol: symbol.to_string(),
        granularity,
        period_start,
        reference_start,
        label,
        is_breakout_up: fact.is_breakout_up,
        is_breakout_down: fact.is_breakout_down,
        breakout_up_amount: fact.breakout_up_amount,
        breakout_up_percent: fact.breakout_up_percent,
        breakout_down_amount: fact.breakout_down_amount,
        breakout_down_percent: fact.breakout_down_percent,
        detail,
        quality_score,
    }
}

fn day_detail_entry(weekday: &str, letter: char, fact: &BreakoutFact) -> Value {
    json!({
        "weekday": weekday,
        "letter": letter.to_string(),
        "trend": TrendDetail::from_fact(fact).as_str(),
        "breakout_up_percent": fact.breakout_up_percent,
        "breakout_down_percent": fact.breakout_down_percent,
    })
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PeriodSummary;
    use crate::database::MemoryStore;
    use chrono::{FixedOffset, TimeZone};

    fn utc9(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day_summary(y: i32, m: u32, d: u32, high: f64, low: f64) -> PeriodSummary {
        PeriodSummary {
            symbol: "BTCUSDT".into(),
            granularity: Granularity::Day,
            period_start: utc9(y, m, d, 0),
            period_end: utc9(y, m, d, 0) + Duration::days(1) - Duration::seconds(1),
            open: low + 1.0,
            high,
            low,
            close: high - 1.0,
            point_count: 24,
            quality_score: 100,
        }
    }

    fn week_summary(y: i32, m: u32, d: u32, high: f64, low: f64, quality: i32) -> PeriodSummary {
        PeriodSummary {
            symbol: "BTCUSDT".into(),
            granularity: Granularity::Week,
            period_start: utc9(y, m, d, 8),
            period_end: utc9(y, m, d, 8) + Duration::days(7) - Duration::seconds(1),
            open: low + 1.0,
            high,
            low,
            close: high - 1.0,
            point_count: 168,
            quality_score: quality,
        }
    }

    fn driver(store: &MemoryStore) -> RecomputeDriver<'_, MemoryStore> {
        let config = EngineConfig::default();
        let calendar = Calendar::new(&config).unwrap();
        RecomputeDriver::new(store, calendar, config)
    }

    async fn seed(store: &MemoryStore, summaries: &[PeriodSummary]) {
        for summary in summaries {
            store.upsert_summary(summary).await.unwrap();
        }
    }

    #[tokio::test]
    async fn first_period_in_history_is_skipped_without_error() {
        let store = MemoryStore::new();
        seed(&store, &[day_summary(2024, 1, 1, 100.0, 90.0)]).await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Day, None)
            .await
            .unwrap();

        assert_eq!(outcome.written(), 0);
        assert_eq!(outcome.skipped, 1);
        assert!(store
            .pattern_records_for("BTCUSDT", Granularity::Day)
            .is_empty());
    }

    #[tokio::test]
    async fn daily_reference_is_nearest_prior_across_gaps() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                day_summary(2024, 1, 1, 100.0, 90.0),
                day_summary(2024, 1, 2, 105.0, 92.0),
                // Jan 3-4 missing: an exchange outage.
                day_summary(2024, 1, 5, 104.0, 91.0),
            ],
        )
        .await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Day, None)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.skipped, 1);

        let records = store.pattern_records_for("BTCUSDT", Granularity::Day);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "breakout up");
        assert_eq!(records[0].breakout_up_amount, Some(5.0));
        // Jan 5 compares against Jan 2, the nearest available prior day.
        assert_eq!(records[1].period_start, utc9(2024, 1, 5, 0));
        assert_eq!(records[1].reference_start, utc9(2024, 1, 2, 0));
        assert_eq!(records[1].label, "inside range");
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                day_summary(2024, 1, 1, 100.0, 90.0),
                day_summary(2024, 1, 2, 105.0, 92.0),
                day_summary(2024, 1, 3, 99.0, 89.0),
            ],
        )
        .await;

        let d = driver(&store);
        let first = d
            .recompute_all("BTCUSDT", Granularity::Day, None)
            .await
            .unwrap();
        let records_first = store.pattern_records_for("BTCUSDT", Granularity::Day);

        let second = d
            .recompute_all("BTCUSDT", Granularity::Day, None)
            .await
            .unwrap();
        let records_second = store.pattern_records_for("BTCUSDT", Granularity::Day);

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(records_first, records_second);
    }

    #[tokio::test]
    async fn since_restricts_recompute_to_later_anchors() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                day_summary(2024, 1, 1, 100.0, 90.0),
                day_summary(2024, 1, 2, 101.0, 91.0),
                day_summary(2024, 1, 3, 102.0, 92.0),
                day_summary(2024, 1, 4, 103.0, 93.0),
            ],
        )
        .await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Day, Some(utc9(2024, 1, 3, 0)))
            .await
            .unwrap();

        assert_eq!(outcome.inserted, 2);
        let records = store.pattern_records_for("BTCUSDT", Granularity::Day);
        assert_eq!(records[0].period_start, utc9(2024, 1, 3, 0));
    }

    #[tokio::test]
    async fn weekly_label_opens_at_x_on_breakout_and_details_cover_the_week() {
        let store = MemoryStore::new();
        // 2023-12-31 is the Sunday before; 2024-01-01 is a Monday.
        let mut summaries = vec![day_summary(2023, 12, 31, 100.0, 90.0)];
        let highs = [105.0, 106.0, 104.0, 103.0, 102.0, 101.0, 100.0];
        for (i, high) in highs.iter().enumerate() {
            summaries.push(day_summary(2024, 1, 1 + i as u32, *high, 90.0));
        }
        // Knock Wednesday out to simulate a missing day.
        summaries.remove(3);
        seed(&store, &summaries).await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Week, None)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);

        let records = store.pattern_records_for("BTCUSDT", Granularity::Week);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        // Monday high 105 > Sunday high 100: the week opens with a breakout.
        assert_eq!(record.label, "XAMDXAM");
        assert_eq!(record.period_start, utc9(2024, 1, 1, 8));
        assert_eq!(record.reference_start, utc9(2023, 12, 31, 0));

        let days = record.detail["days"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0]["trend"], "breakout up");
        assert_eq!(days[0]["letter"], "X");
        // Wednesday and Thursday comparisons both involve the missing day.
        assert!(days[2].is_null());
        assert!(days[3].is_null());
        assert_eq!(days[1]["letter"], "A");
    }

    #[tokio::test]
    async fn weekly_requires_the_actual_previous_sunday() {
        let store = MemoryStore::new();
        // Monday summary exists but the previous day is absent entirely.
        seed(&store, &[day_summary(2024, 1, 1, 100.0, 90.0)]).await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Week, None)
            .await
            .unwrap();
        assert_eq!(outcome.written(), 0);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn monthly_anchors_on_first_week_and_nearest_prior_reference() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                week_summary(2024, 2, 26, 100.0, 90.0, 100),
                // 2024-03-04 is the first week of March (the 1st is a Friday).
                week_summary(2024, 3, 4, 105.0, 92.0, 80),
                week_summary(2024, 3, 11, 104.0, 91.0, 100),
            ],
        )
        .await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Month, None)
            .await
            .unwrap();
        // February has no prior week on file and is skipped.
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.skipped, 1);

        let records = store.pattern_records_for("BTCUSDT", Granularity::Month);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.label, "XAMD");
        assert_eq!(record.period_start, utc9(2024, 3, 4, 8));
        assert_eq!(record.reference_start, utc9(2024, 2, 26, 8));
        assert_eq!(record.breakout_up_amount, Some(5.0));
        assert_eq!(record.breakout_up_percent, Some(5.0));
        // Quality is the minimum of the two referenced summaries.
        assert_eq!(record.quality_score, 80);
    }

    #[tokio::test]
    async fn monthly_falls_back_to_earliest_week_when_first_week_is_missing() {
        let store = MemoryStore::new();
        seed(
            &store,
            &[
                week_summary(2024, 2, 26, 100.0, 90.0, 100),
                // First week of March (03-04) produced no summary.
                week_summary(2024, 3, 11, 100.0, 90.0, 100),
            ],
        )
        .await;

        let outcome = driver(&store)
            .recompute_all("BTCUSDT", Granularity::Month, None)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);

        let records = store.pattern_records_for("BTCUSDT", Granularity::Month);
        assert_eq!(records[0].period_start, utc9(2024, 3, 11, 8));
        // Exact equality on both extremes is not a breakout.
        assert_eq!(records[0].label, "AMDX");
    }

    #[tokio::test]
    async fn ingest_builds_summaries_for_covered_periods_only() {
        let store = MemoryStore::new();
        let d = driver(&store);

        let mut bars = Vec::new();
        for day in 1..=3u32 {
            for hour in [1u32, 9, 17] {
                bars.push(RawBar {
                    symbol: "BTCUSDT".into(),
                    open_time: utc9(2024, 1, day, hour),
                    open: 100.0,
                    high: 100.0 + f64::from(day),
                    low: 90.0,
                    close: 99.0,
                    volume: 1.0,
                });
            }
        }

        let written = d.ingest_bars("BTCUSDT", Granularity::Day, &bars).await.unwrap();
        assert_eq!(written, 3);

        let starts = store
            .period_starts("BTCUSDT", Granularity::Day, None)
            .await
            .unwrap();
        assert_eq!(starts, vec![utc9(2024, 1, 1, 0), utc9(2024, 1, 2, 0), utc9(2024, 1, 3, 0)]);

        let summary = store
            .summary("BTCUSDT", Granularity::Day, utc9(2024, 1, 2, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.high, 102.0);
        assert_eq!(summary.point_count, 3);
        // 3 of 24 expected hourly bars lands in the lowest quality band.
        assert_eq!(summary.quality_score, 20);
    }

    #[tokio::test]
    async fn quality_checks_log_low_quality_streams() {
        let store = MemoryStore::new();
        let mut bad_week = week_summary(2024, 3, 4, 105.0, 92.0, 40);
        bad_week.quality_score = 40;
        seed(&store, &[bad_week, week_summary(2024, 3, 11, 104.0, 91.0, 100)]).await;

        let affected = driver(&store).run_quality_checks("BTCUSDT").await.unwrap();
        assert_eq!(affected, 1);

        let logs = store.quality_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].check_type, "LOW_QUALITY_DATA");
        assert_eq!(logs[0].affected_records, 1);
    }
}
