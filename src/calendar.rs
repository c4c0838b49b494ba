use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};

use crate::config::EngineConfig;
use crate::database::models::Granularity;
use crate::error::EngineError;

/// Calendar alignment under a fixed UTC offset and a configurable
/// week-start rule (default: Monday 08:00 at UTC+9).
///
/// All boundary math happens in the fixed offset; inputs and outputs are
/// UTC instants. Days open at local midnight, weeks at the configured
/// weekday and time of day, months on the 1st at local midnight. Period
/// ends are inclusive: one second before the next period opens.
#[derive(Debug, Clone)]
pub struct Calendar {
    offset: FixedOffset,
    week_start_day: Weekday,
    week_start_time: NaiveTime,
}

impl Calendar {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let offset = FixedOffset::east_opt(config.utc_offset_secs)
            .ok_or_else(|| EngineError::Config(format!(
                "utc_offset_secs out of range: {}",
                config.utc_offset_secs
            )))?;

        let week_start_day: Weekday = config
            .week_start_day
            .parse()
            .map_err(|_| EngineError::Config(format!(
                "unparseable week_start_day: {}",
                config.week_start_day
            )))?;

        let week_start_time =
            NaiveTime::from_hms_opt(config.week_start_hour, config.week_start_minute, 0)
                .ok_or_else(|| EngineError::Config(format!(
                    "invalid week start time {:02}:{:02}",
                    config.week_start_hour, config.week_start_minute
                )))?;

        Ok(Self {
            offset,
            week_start_day,
            week_start_time,
        })
    }

    /// Local calendar date of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Local (year, month) of an instant.
    pub fn year_month(&self, instant: DateTime<Utc>) -> (i32, u32) {
        let local = instant.with_timezone(&self.offset);
        (local.year(), local.month())
    }

    pub fn boundaries(
        &self,
        granularity: Granularity,
        instant: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        match granularity {
            Granularity::Day => self.day_boundaries(instant),
            Granularity::Week => self.week_boundaries(instant),
            Granularity::Month => self.month_boundaries(instant),
        }
    }

    /// Enclosing calendar day: local midnight through 23:59:59.
    pub fn day_boundaries(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.at_local(self.local_date(instant), NaiveTime::MIN);
        (start, start + Duration::days(1) - Duration::seconds(1))
    }

    /// Enclosing week: the most recent occurrence of the configured
    /// weekday and time of day at or before `instant`, through seven days
    /// minus one second later. An instant earlier on the start weekday
    /// than the start time still belongs to the previous week.
    pub fn week_boundaries(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let local = instant.with_timezone(&self.offset);
        let days_back = (local.weekday().num_days_from_monday() + 7
            - self.week_start_day.num_days_from_monday())
            % 7;
        let date = local.date_naive() - Duration::days(i64::from(days_back));

        let mut start = self.at_local(date, self.week_start_time);
        if start > instant {
            start -= Duration::days(7);
        }
        (start, start + Duration::days(7) - Duration::seconds(1))
    }

    /// Enclosing calendar month at local midnight boundaries.
    pub fn month_boundaries(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let (year, month) = self.year_month(instant);
        let start = self.at_local(first_of_month(year, month), NaiveTime::MIN);
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let end = self.at_local(first_of_month(next_year, next_month), NaiveTime::MIN)
            - Duration::seconds(1);
        (start, end)
    }

    /// Start of the month's first week: the 1st itself when it falls on
    /// the week-start weekday, otherwise the next occurrence of that
    /// weekday, at the configured time of day.
    pub fn first_week_of_month(&self, year: i32, month: u32) -> DateTime<Utc> {
        let first = first_of_month(year, month);
        let days_ahead = (self.week_start_day.num_days_from_monday() + 7
            - first.weekday().num_days_from_monday())
            % 7;
        let date = first + Duration::days(i64::from(days_ahead));
        self.at_local(date, self.week_start_time)
    }

    /// 1-based index of a week within its month, counted from the month's
    /// first week. Returns 0 for a week start preceding the first week;
    /// that does not occur for correctly generated week sequences.
    pub fn week_of_month(&self, week_start: DateTime<Utc>) -> u32 {
        let (year, month) = self.year_month(week_start);
        let first_week = self.first_week_of_month(year, month);
        if week_start < first_week {
            return 0;
        }
        ((week_start - first_week).num_days() / 7 + 1) as u32
    }

    /// Week start falling on the given local date.
    pub fn week_start_on(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at_local(date, self.week_start_time)
    }

    /// Start of the calendar day on the given local date.
    pub fn day_start_on(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at_local(date, NaiveTime::MIN)
    }

    /// Start of the calendar day immediately before the given day start.
    pub fn prev_day(&self, day_start: DateTime<Utc>) -> DateTime<Utc> {
        day_start - Duration::days(1)
    }

    /// Offset of a local date's weekday from the configured week start,
    /// 0..=6 with 0 being the week-start weekday itself.
    pub fn weekday_index(&self, date: NaiveDate) -> usize {
        ((date.weekday().num_days_from_monday() + 7
            - self.week_start_day.num_days_from_monday())
            % 7) as usize
    }

    pub fn week_start_day(&self) -> Weekday {
        self.week_start_day
    }

    fn at_local(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        // A fixed offset never produces ambiguous or skipped local times.
        self.offset
            .from_local_datetime(&date.and_time(time))
            .unwrap()
            .with_timezone(&Utc)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("month out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> Calendar {
        Calendar::new(&EngineConfig::default()).unwrap()
    }

    fn utc9(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn week_opens_monday_morning() {
        let cal = calendar();
        // 2024-01-03 is a Wednesday.
        let (start, end) = cal.week_boundaries(utc9(2024, 1, 3, 12, 0));
        assert_eq!(start, utc9(2024, 1, 1, 8, 0));
        assert_eq!(end, utc9(2024, 1, 8, 8, 0) - Duration::seconds(1));
    }

    #[test]
    fn monday_before_opening_bell_belongs_to_previous_week() {
        let cal = calendar();
        let (start, _) = cal.week_boundaries(utc9(2024, 1, 8, 3, 0));
        assert_eq!(start, utc9(2024, 1, 1, 8, 0));

        let (start, _) = cal.week_boundaries(utc9(2024, 1, 8, 8, 0));
        assert_eq!(start, utc9(2024, 1, 8, 8, 0));
    }

    #[test]
    fn day_boundaries_are_local_midnight() {
        let cal = calendar();
        let (start, end) = cal.day_boundaries(utc9(2024, 1, 1, 5, 30));
        assert_eq!(start, utc9(2024, 1, 1, 0, 0));
        assert_eq!(end, utc9(2024, 1, 2, 0, 0) - Duration::seconds(1));
    }

    #[test]
    fn month_boundaries_cover_december_rollover() {
        let cal = calendar();
        let (start, end) = cal.month_boundaries(utc9(2023, 12, 15, 10, 0));
        assert_eq!(start, utc9(2023, 12, 1, 0, 0));
        assert_eq!(end, utc9(2024, 1, 1, 0, 0) - Duration::seconds(1));
    }

    #[test]
    fn first_week_is_the_first_when_it_opens_on_monday() {
        let cal = calendar();
        // 2024-01-01 is a Monday.
        assert_eq!(cal.first_week_of_month(2024, 1), utc9(2024, 1, 1, 8, 0));
        // 2024-03-01 is a Friday; the first Monday is the 4th.
        assert_eq!(cal.first_week_of_month(2024, 3), utc9(2024, 3, 4, 8, 0));
    }

    #[test]
    fn week_of_month_counts_from_first_week() {
        let cal = calendar();
        assert_eq!(cal.week_of_month(utc9(2024, 3, 4, 8, 0)), 1);
        assert_eq!(cal.week_of_month(utc9(2024, 3, 11, 8, 0)), 2);
        assert_eq!(cal.week_of_month(utc9(2024, 3, 25, 8, 0)), 4);
    }

    #[test]
    fn week_before_first_week_reports_zero() {
        let cal = calendar();
        // 2024-02-01 is a Thursday; the month's first week opens Feb 5.
        assert_eq!(cal.week_of_month(utc9(2024, 2, 1, 8, 0)), 0);
    }

    #[test]
    fn weekday_index_is_relative_to_week_start() {
        let cal = calendar();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(cal.weekday_index(monday), 0);
        assert_eq!(cal.weekday_index(monday + Duration::days(6)), 6);
    }
}
