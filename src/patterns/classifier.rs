use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::comparator::BreakoutFact;

/// One state of the cyclic A -> M -> D -> X -> A vocabulary.
///
/// Every persisted label string is a walk of this cycle: `AMDX` and `XAMD`
/// are four consecutive states, `AMDXAMD` and `XAMDXAM` are seven. A week
/// or month label is therefore fully determined by its starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleLetter {
    A,
    M,
    D,
    X,
}

impl CycleLetter {
    pub fn next(self) -> Self {
        match self {
            CycleLetter::A => CycleLetter::M,
            CycleLetter::M => CycleLetter::D,
            CycleLetter::D => CycleLetter::X,
            CycleLetter::X => CycleLetter::A,
        }
    }

    pub fn advance(self, steps: usize) -> Self {
        let mut letter = self;
        for _ in 0..steps % 4 {
            letter = letter.next();
        }
        letter
    }

    pub fn as_char(self) -> char {
        match self {
            CycleLetter::A => 'A',
            CycleLetter::M => 'M',
            CycleLetter::D => 'D',
            CycleLetter::X => 'X',
        }
    }
}

impl fmt::Display for CycleLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Day-versus-previous-day trend classification, one of four mutually
/// exclusive outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDetail {
    BreakoutBoth,
    BreakoutUp,
    BreakoutDown,
    InsideRange,
}

impl TrendDetail {
    pub fn from_fact(fact: &BreakoutFact) -> Self {
        match (fact.is_breakout_up, fact.is_breakout_down) {
            (true, true) => TrendDetail::BreakoutBoth,
            (true, false) => TrendDetail::BreakoutUp,
            (false, true) => TrendDetail::BreakoutDown,
            (false, false) => TrendDetail::InsideRange,
        }
    }

    /// Exact persisted vocabulary; consumers match on these literals.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDetail::BreakoutBoth => "breakout both directions",
            TrendDetail::BreakoutUp => "breakout up",
            TrendDetail::BreakoutDown => "breakout down",
            TrendDetail::InsideRange => "inside range",
        }
    }
}

impl fmt::Display for TrendDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weekly 2-way label, decided solely by the Monday bar against the
/// previous Sunday bar: any breakout opens the week at X, otherwise at A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekLabel {
    Xamdxam,
    Amdxamd,
}

impl WeekLabel {
    pub fn from_fact(monday_vs_prev_sunday: &BreakoutFact) -> Self {
        if monday_vs_prev_sunday.any() {
            WeekLabel::Xamdxam
        } else {
            WeekLabel::Amdxamd
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeekLabel::Xamdxam => "XAMDXAM",
            WeekLabel::Amdxamd => "AMDXAMD",
        }
    }

    pub fn start_letter(&self) -> CycleLetter {
        match self {
            WeekLabel::Xamdxam => CycleLetter::X,
            WeekLabel::Amdxamd => CycleLetter::A,
        }
    }

    /// Positional letter for a day of the week, 0 = the week-start day.
    /// Position 0 carries the Monday-versus-Sunday comparison result; the
    /// remaining positions follow the cycle.
    pub fn day_letter(&self, day_index: usize) -> CycleLetter {
        self.start_letter().advance(day_index)
    }
}

impl fmt::Display for WeekLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "XAMDXAM" => Ok(WeekLabel::Xamdxam),
            "AMDXAMD" => Ok(WeekLabel::Amdxamd),
            other => Err(format!("unknown week label: {other}")),
        }
    }
}

/// Monthly 2-way label for the first week of a month against the previous
/// week: inside the reference range (equality included) is AMDX, any
/// breakout is XAMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthLabel {
    Amdx,
    Xamd,
}

impl MonthLabel {
    pub fn from_fact(first_week_vs_prev_week: &BreakoutFact) -> Self {
        if first_week_vs_prev_week.any() {
            MonthLabel::Xamd
        } else {
            MonthLabel::Amdx
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonthLabel::Amdx => "AMDX",
            MonthLabel::Xamd => "XAMD",
        }
    }

    pub fn start_letter(&self) -> CycleLetter {
        match self {
            MonthLabel::Amdx => CycleLetter::A,
            MonthLabel::Xamd => CycleLetter::X,
        }
    }

    /// Positional letter for a week of the month. Weeks beyond the fourth
    /// have no letter and report absent rather than an index error.
    pub fn week_letter(&self, week_of_month: u32) -> Option<CycleLetter> {
        if (1..=4).contains(&week_of_month) {
            Some(self.start_letter().advance(week_of_month as usize - 1))
        } else {
            None
        }
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonthLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AMDX" => Ok(MonthLabel::Amdx),
            "XAMD" => Ok(MonthLabel::Xamd),
            other => Err(format!("unknown month label: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(up: bool, down: bool) -> BreakoutFact {
        BreakoutFact {
            is_breakout_up: up,
            is_breakout_down: down,
            ..Default::default()
        }
    }

    #[test]
    fn cycle_rotation_has_period_four() {
        let mut letter = CycleLetter::A;
        for _ in 0..4 {
            letter = letter.next();
        }
        assert_eq!(letter, CycleLetter::A);
        assert_eq!(CycleLetter::M.advance(6), CycleLetter::A);
    }

    #[test]
    fn trend_detail_outcomes_are_exhaustive_and_exact() {
        assert_eq!(TrendDetail::from_fact(&fact(true, true)).as_str(), "breakout both directions");
        assert_eq!(TrendDetail::from_fact(&fact(true, false)).as_str(), "breakout up");
        assert_eq!(TrendDetail::from_fact(&fact(false, true)).as_str(), "breakout down");
        assert_eq!(TrendDetail::from_fact(&fact(false, false)).as_str(), "inside range");
    }

    #[test]
    fn week_label_is_total_over_facts() {
        for up in [false, true] {
            for down in [false, true] {
                let label = WeekLabel::from_fact(&fact(up, down));
                let expected = if up || down { WeekLabel::Xamdxam } else { WeekLabel::Amdxamd };
                assert_eq!(label, expected);
            }
        }
    }

    #[test]
    fn week_positional_letters_spell_the_label() {
        for label in [WeekLabel::Xamdxam, WeekLabel::Amdxamd] {
            let spelled: String = (0..7).map(|i| label.day_letter(i).as_char()).collect();
            assert_eq!(spelled, label.as_str());
        }
    }

    #[test]
    fn month_positional_letters_spell_the_label() {
        for label in [MonthLabel::Amdx, MonthLabel::Xamd] {
            let spelled: String = (1..=4)
                .map(|w| label.week_letter(w).unwrap().as_char())
                .collect();
            assert_eq!(spelled, label.as_str());
        }
    }

    #[test]
    fn fifth_week_of_month_has_no_letter() {
        assert_eq!(MonthLabel::Amdx.week_letter(5), None);
        assert_eq!(MonthLabel::Xamd.week_letter(0), None);
    }

    #[test]
    fn month_label_matches_breakout_rule() {
        assert_eq!(MonthLabel::from_fact(&fact(false, false)), MonthLabel::Amdx);
        assert_eq!(MonthLabel::from_fact(&fact(true, false)), MonthLabel::Xamd);
        assert_eq!(MonthLabel::from_fact(&fact(false, true)), MonthLabel::Xamd);
        assert_eq!(MonthLabel::from_fact(&fact(true, true)), MonthLabel::Xamd);
    }

    #[test]
    fn labels_parse_back_from_persisted_strings() {
        assert_eq!("XAMDXAM".parse::<WeekLabel>().unwrap(), WeekLabel::Xamdxam);
        assert_eq!("AMDX".parse::<MonthLabel>().unwrap(), MonthLabel::Amdx);
        assert!("MDXA".parse::<MonthLabel>().is_err());
    }
}
