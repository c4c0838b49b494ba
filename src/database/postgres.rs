use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::database::models::{
    Granularity, PatternRecord, PeriodSummary, QualityLogEntry, Symbol,
};
use crate::database::schema;
use crate::database::store::PeriodStore;
use crate::error::StoreError;

/// Period store backed by PostgreSQL.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indices if they don't exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in schema::ALL_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema initialized");
        Ok(())
    }
}

fn summary_from_row(row: &PgRow) -> Result<PeriodSummary, StoreError> {
    let granularity: String = row.try_get("granularity")?;
    Ok(PeriodSummary {
        symbol: row.try_get("symbol")?,
        granularity: granularity.parse().map_err(StoreError::CorruptRow)?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        close: row.try_get("close")?,
        point_count: row.try_get("point_count")?,
        quality_score: row.try_get("quality_score")?,
    })
}

fn pattern_from_row(row: &PgRow) -> Result<PatternRecord, StoreError> {
    let granularity: String = row.try_get("granularity")?;
    Ok(PatternRecord {
        symbol: row.try_get("symbol")?,
        granularity: granularity.parse().map_err(StoreError::CorruptRow)?,
        period_start: row.try_get("period_start")?,
        reference_start: row.try_get("reference_start")?,
        label: row.try_get("label")?,
        is_breakout_up: row.try_get("is_breakout_up")?,
        is_breakout_down: row.try_get("is_breakout_down")?,
        breakout_up_amount: row.try_get("breakout_up_amount")?,
        breakout_up_percent: row.try_get("breakout_up_percent")?,
        breakout_down_amount: row.try_get("breakout_down_amount")?,
        breakout_down_percent: row.try_get("breakout_down_percent")?,
        detail: row.try_get("detail")?,
        quality_score: row.try_get("quality_score")?,
    })
}

#[async_trait]
impl PeriodStore for PostgresStore {
    async fn active_symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, display_name, exchange, active
             FROM symbols
             WHERE active = TRUE
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Symbol {
                    name: row.try_get("name")?,
                    display_name: row.try_get("display_name")?,
                    exchange: row.try_get("exchange")?,
                    active: row.try_get("active")?,
                })
            })
            .collect()
    }

    async fn upsert_symbol(&self, symbol: &Symbol) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO symbols (name, display_name, exchange, active)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name)
             DO UPDATE SET display_name = EXCLUDED.display_name,
                           exchange = EXCLUDED.exchange,
                           active = EXCLUDED.active",
        )
        .bind(&symbol.name)
        .bind(&symbol.display_name)
        .bind(&symbol.exchange)
        .bind(symbol.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn period_starts(
        &self,
        symbol: &str,
        granularity: Granularity,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let rows = sqlx::query(
            "SELECT period_start
             FROM period_summaries
             WHERE symbol = $1 AND granularity = $2
               AND ($3::timestamptz IS NULL OR period_start >= $3)
             ORDER BY period_start ASC",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(row.try_get("period_start")?))
            .collect()
    }

    async fn summary(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError> {
        let row = sqlx::query(
            "SELECT symbol, granularity, period_start, period_end,
                    open, high, low, close, point_count, quality_score
             FROM period_summaries
             WHERE symbol = $1 AND granularity = $2 AND period_start = $3",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    async fn summary_before(
        &self,
        symbol: &str,
        granularity: Granularity,
        before: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, StoreError> {
        let row = sqlx::query(
            "SELECT symbol, granularity, period_start, period_end,
                    open, high, low, close, point_count, quality_score
             FROM period_summaries
             WHERE symbol = $1 AND granularity = $2 AND period_start < $3
             ORDER BY period_start DESC
             LIMIT 1",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .bind(before)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    async fn upsert_summary(&self, summary: &PeriodSummary) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO period_summaries
             (symbol, granularity, period_start, period_end,
              open, high, low, close, point_count, quality_score, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
             ON CONFLICT (symbol, granularity, period_start)
             DO UPDATE SET period_end = EXCLUDED.period_end,
                           open = EXCLUDED.open,
                           high = EXCLUDED.high,
                           low = EXCLUDED.low,
                           close = EXCLUDED.close,
                           point_count = EXCLUDED.point_count,
                           quality_score = EXCLUDED.quality_score,
                           updated_at = NOW()",
        )
        .bind(&summary.symbol)
        .bind(summary.granularity.as_str())
        .bind(summary.period_start)
        .bind(summary.period_end)
        .bind(summary.open)
        .bind(summary.high)
        .bind(summary.low)
        .bind(summary.close)
        .bind(summary.point_count)
        .bind(summary.quality_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pattern_record(
        &self,
        symbol: &str,
        granularity: Granularity,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PatternRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT symbol, granularity, period_start, reference_start, label,
                    is_breakout_up, is_breakout_down,
                    breakout_up_amount, breakout_up_percent,
                    breakout_down_amount, breakout_down_percent,
                    detail, quality_score
             FROM pattern_records
             WHERE symbol = $1 AND granularity = $2 AND period_start = $3",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(pattern_from_row).transpose()
    }

    async fn upsert_pattern_records(&self, records: &[PatternRecord]) -> Result<(), StoreError> {
        // One statement per record keeps each upsert atomic; a failure in
        // the middle of a batch cannot corrupt rows already written.
        for record in records {
            sqlx::query(
                "INSERT INTO pattern_records
                 (symbol, granularity, period_start, reference_start, label,
                  is_breakout_up, is_breakout_down,
                  breakout_up_amount, breakout_up_percent,
                  breakout_down_amount, breakout_down_percent,
                  detail, quality_score, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
                 ON CONFLICT (symbol, granularity, period_start)
                 DO UPDATE SET reference_start = EXCLUDED.reference_start,
                               label = EXCLUDED.label,
                               is_breakout_up = EXCLUDED.is_breakout_up,
                               is_breakout_down = EXCLUDED.is_breakout_down,
                               breakout_up_amount = EXCLUDED.breakout_up_amount,
                               breakout_up_percent = EXCLUDED.breakout_up_percent,
                               breakout_down_amount = EXCLUDED.breakout_down_amount,
                               breakout_down_percent = EXCLUDED.breakout_down_percent,
                               detail = EXCLUDED.detail,
                               quality_score = EXCLUDED.quality_score,
                               updated_at = NOW()",
            )
            .bind(&record.symbol)
            .bind(record.granularity.as_str())
            .bind(record.period_start)
            .bind(record.reference_start)
            .bind(&record.label)
            .bind(record.is_breakout_up)
            .bind(record.is_breakout_down)
            .bind(record.breakout_up_amount)
            .bind(record.breakout_up_percent)
            .bind(record.breakout_down_amount)
            .bind(record.breakout_down_percent)
            .bind(&record.detail)
            .bind(record.quality_score)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn count_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM period_summaries
             WHERE symbol = $1 AND granularity = $2",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    async fn count_pattern_records(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM pattern_records
             WHERE symbol = $1 AND granularity = $2",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    async fn count_low_quality_summaries(
        &self,
        symbol: &str,
        granularity: Granularity,
        threshold: i32,
    ) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM period_summaries
             WHERE symbol = $1 AND granularity = $2 AND quality_score < $3",
        )
        .bind(symbol)
        .bind(granularity.as_str())
        .bind(threshold)
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    async fn append_quality_log(&self, entry: &QualityLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quality_logs
             (symbol, check_type, status, message, affected_records, checked_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&entry.symbol)
        .bind(&entry.check_type)
        .bind(&entry.status)
        .bind(&entry.message)
        .bind(entry.affected_records)
        .bind(entry.checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
