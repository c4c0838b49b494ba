use chrono::{DateTime, Duration, Utc};

use crate::calendar::Calendar;
use crate::database::models::{Granularity, PeriodSummary, RawBar};

/// Roll raw bars up into a summary for one period.
///
/// Bars with an open time outside `[period_start, period_end]` are ignored.
/// Returns `None` when no bar falls inside the period; callers treat the
/// gap as a normal condition, not an error. Input order is not trusted,
/// the bars are sorted by open time before open/close selection.
pub fn aggregate(
    symbol: &str,
    granularity: Granularity,
    bars: &[RawBar],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    expected_count: u32,
) -> Option<PeriodSummary> {
    let mut inside: Vec<&RawBar> = bars
        .iter()
        .filter(|b| b.open_time >= period_start && b.open_time <= period_end)
        .collect();

    if inside.is_empty() {
        return None;
    }

    inside.sort_by_key(|b| b.open_time);

    let open = inside.first().map(|b| b.open)?;
    let close = inside.last().map(|b| b.close)?;
    let high = inside.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = inside.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let point_count = inside.len() as i32;

    Some(PeriodSummary {
        symbol: symbol.to_string(),
        granularity,
        period_start,
        period_end,
        open,
        high,
        low,
        close,
        point_count,
        quality_score: quality_score(inside.len() as u32, expected_count),
    })
}

/// Step-function completeness score against the expected bar count for the
/// granularity: >=95% -> 100, >=80% -> 80, >=50% -> 60, >=30% -> 40,
/// otherwise 20.
pub fn quality_score(point_count: u32, expected_count: u32) -> i32 {
    let points = u64::from(point_count) * 100;
    let expected = u64::from(expected_count);

    if points >= expected * 95 {
        100
    } else if points >= expected * 80 {
        80
    } else if points >= expected * 50 {
        60
    } else if points >= expected * 30 {
        40
    } else {
        20
    }
}

/// All period boundaries of the given granularity overlapping the closed
/// instant range `[first, last]`, in ascending order.
pub fn periods_covering(
    calendar: &Calendar,
    granularity: Granularity,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut periods = Vec::new();
    let (mut start, mut end) = calendar.boundaries(granularity, first);

    while start <= last {
        periods.push((start, end));
        let next = calendar.boundaries(granularity, end + Duration::seconds(1));
        start = next.0;
        end = next.1;
    }

    periods
}
