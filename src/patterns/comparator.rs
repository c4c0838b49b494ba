use serde::{Deserialize, Serialize};

use crate::database::models::PeriodSummary;

/// Directional breakout facts for one (current, reference) period pair.
///
/// Amounts are positive magnitudes and present exactly when the matching
/// flag is set; percents are relative to the reference extreme. When a
/// reference extreme is zero or negative the percent stays `None` while
/// flag and amount remain set, so a degenerate denominator never divides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BreakoutFact {
    pub is_breakout_up: bool,
    pub is_breakout_down: bool,
    pub breakout_up_amount: Option<f64>,
    pub breakout_up_percent: Option<f64>,
    pub breakout_down_amount: Option<f64>,
    pub breakout_down_percent: Option<f64>,
}

impl BreakoutFact {
    pub fn any(&self) -> bool {
        self.is_breakout_up || self.is_breakout_down
    }

    pub fn both(&self) -> bool {
        self.is_breakout_up && self.is_breakout_down
    }
}

/// Compare two period summaries. Strict inequalities on both sides:
/// matching the reference extreme exactly is not a breakout.
pub fn compare(current: &PeriodSummary, reference: &PeriodSummary) -> BreakoutFact {
    compare_extremes(current.high, current.low, reference.high, reference.low)
}

pub fn compare_extremes(
    current_high: f64,
    current_low: f64,
    reference_high: f64,
    reference_low: f64,
) -> BreakoutFact {
    let mut fact = BreakoutFact::default();

    if current_high > reference_high {
        let amount = current_high - reference_high;
        fact.is_breakout_up = true;
        fact.breakout_up_amount = Some(amount);
        if reference_high > 0.0 {
            fact.breakout_up_percent = Some(amount / reference_high * 100.0);
        }
    }

    if current_low < reference_low {
        let amount = reference_low - current_low;
        fact.is_breakout_down = true;
        fact.breakout_down_amount = Some(amount);
        if reference_low > 0.0 {
            fact.breakout_down_percent = Some(amount / reference_low * 100.0);
        }
    }

    fact
}
