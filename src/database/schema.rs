// SQL schema definitions executed by PostgresStore::init_schema.

pub const CREATE_SYMBOLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    name VARCHAR PRIMARY KEY,
    display_name VARCHAR,
    exchange VARCHAR NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

pub const CREATE_PERIOD_SUMMARIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS period_summaries (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR NOT NULL,
    granularity VARCHAR NOT NULL,
    period_start TIMESTAMPTZ NOT NULL,
    period_end TIMESTAMPTZ NOT NULL,
    open DOUBLE PRECISION NOT NULL,
    high DOUBLE PRECISION NOT NULL,
    low DOUBLE PRECISION NOT NULL,
    close DOUBLE PRECISION NOT NULL,
    point_count INTEGER NOT NULL,
    quality_score INTEGER NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(symbol, granularity, period_start)
);
"#;

pub const CREATE_PATTERN_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pattern_records (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR NOT NULL,
    granularity VARCHAR NOT NULL,
    period_start TIMESTAMPTZ NOT NULL,
    reference_start TIMESTAMPTZ NOT NULL,
    label VARCHAR NOT NULL,
    is_breakout_up BOOLEAN NOT NULL,
    is_breakout_down BOOLEAN NOT NULL,
    breakout_up_amount DOUBLE PRECISION,
    breakout_up_percent DOUBLE PRECISION,
    breakout_down_amount DOUBLE PRECISION,
    breakout_down_percent DOUBLE PRECISION,
    detail JSONB NOT NULL DEFAULT 'null',
    quality_score INTEGER NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(symbol, granularity, period_start)
);
"#;

pub const CREATE_QUALITY_LOGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quality_logs (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR NOT NULL,
    check_type VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    message VARCHAR NOT NULL,
    affected_records BIGINT NOT NULL,
    checked_at TIMESTAMPTZ NOT NULL
);
"#;

pub const CREATE_SUMMARY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_period_summaries_stream
    ON period_summaries(symbol, granularity, period_start);
"#;

pub const CREATE_PATTERN_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_pattern_records_stream
    ON pattern_records(symbol, granularity, period_start);
"#;

pub const CREATE_QUALITY_LOG_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_quality_logs_symbol
    ON quality_logs(symbol, checked_at DESC);
"#;

pub const ALL_STATEMENTS: [&str; 7] = [
    CREATE_SYMBOLS_TABLE,
    CREATE_PERIOD_SUMMARIES_TABLE,
    CREATE_PATTERN_RECORDS_TABLE,
    CREATE_QUALITY_LOGS_TABLE,
    CREATE_SUMMARY_INDEX,
    CREATE_PATTERN_INDEX,
    CREATE_QUALITY_LOG_INDEX,
];
