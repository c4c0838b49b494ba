use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::models::Granularity;

/// One unit of recompute work: a (symbol, granularity) stream, optionally
/// restricted to anchors at or after `since`. Partial and full recompute
/// share this one shape; full history is simply `since: None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeJob {
    pub symbol: String,
    pub granularity: Granularity,
    pub since: Option<DateTime<Utc>>,
}

impl RecomputeJob {
    pub fn new(symbol: String, granularity: Granularity, since: Option<DateTime<Utc>>) -> Self {
        Self {
            symbol,
            granularity,
            since,
        }
    }
}

impl fmt::Display for RecomputeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.since {
            Some(since) => write!(
                f,
                "{}/{} since {}",
                self.symbol,
                self.granularity,
                since.format("%Y-%m-%d %H:%M:%S")
            ),
            None => write!(f, "{}/{} full history", self.symbol, self.granularity),
        }
    }
}
