//! Date/time fields and their relative coarseness.
//!
//! Every semantic instruction targets one [`Granularity`]. Fields that describe
//! the same "slot" of a calendar (for example day-of-week and day-of-month)
//! share a rank, which is what the merge and resolution heuristics compare.

use std::fmt;
use std::str::FromStr;

/// A date/time field, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    Minute,
    HourOfHalfDay,
    AmPm,
    HourOfDay,
    /// Part of day: morning, afternoon, evening, night.
    TimeOfDay,
    DayOfWeek,
    DayOfMonth,
    WeekOfYear,
    Month,
    YearOfCentury,
    Year,
    Century,
}

impl Granularity {
    pub const ALL: [Granularity; 12] = [
        Granularity::Minute,
        Granularity::HourOfHalfDay,
        Granularity::AmPm,
        Granularity::HourOfDay,
        Granularity::TimeOfDay,
        Granularity::DayOfWeek,
        Granularity::DayOfMonth,
        Granularity::WeekOfYear,
        Granularity::Month,
        Granularity::YearOfCentury,
        Granularity::Year,
        Granularity::Century,
    ];

    /// Coarse rank used for cross-granularity comparison. Larger is coarser.
    pub fn rank(self) -> u8 {
        match self {
            Granularity::Minute => 1,
            Granularity::HourOfHalfDay | Granularity::AmPm | Granularity::HourOfDay => 2,
            Granularity::TimeOfDay => 3,
            Granularity::DayOfWeek | Granularity::DayOfMonth => 4,
            Granularity::WeekOfYear => 5,
            Granularity::Month => 6,
            Granularity::YearOfCentury | Granularity::Year => 7,
            Granularity::Century => 8,
        }
    }

    /// True when `self` is strictly coarser than `other`.
    pub fn is_coarser_than(self, other: Granularity) -> bool {
        self.rank() > other.rank()
    }

    /// ISO-8601 duration designator for this field, if it has one.
    pub fn duration_unit(self) -> Option<DurationUnit> {
        match self {
            Granularity::Minute => Some(DurationUnit::Minute),
            Granularity::HourOfHalfDay | Granularity::HourOfDay => Some(DurationUnit::Hour),
            Granularity::AmPm | Granularity::TimeOfDay => None,
            Granularity::DayOfWeek | Granularity::DayOfMonth => Some(DurationUnit::Day),
            Granularity::WeekOfYear => Some(DurationUnit::Week),
            Granularity::Month => Some(DurationUnit::Month),
            Granularity::YearOfCentury | Granularity::Year => Some(DurationUnit::Year),
            Granularity::Century => Some(DurationUnit::Century),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Minute => "MINUTE",
            Granularity::HourOfHalfDay => "HOUR_OF_HALF_DAY",
            Granularity::AmPm => "AM_PM",
            Granularity::HourOfDay => "HOUR_OF_DAY",
            Granularity::TimeOfDay => "TIME",
            Granularity::DayOfWeek => "DAY_OF_WEEK",
            Granularity::DayOfMonth => "DAY_OF_MONTH",
            Granularity::WeekOfYear => "WEEK_OF_YEAR",
            Granularity::Month => "MONTH",
            Granularity::YearOfCentury => "YEAR_OF_CENTURY",
            Granularity::Year => "YEAR",
            Granularity::Century => "CENTURY_OF_ERA",
        }
    }

    fn flag(self) -> GranularitySet {
        match self {
            Granularity::Minute => GranularitySet::MINUTE,
            Granularity::HourOfHalfDay => GranularitySet::HOUR_OF_HALF_DAY,
            Granularity::AmPm => GranularitySet::AM_PM,
            Granularity::HourOfDay => GranularitySet::HOUR_OF_DAY,
            Granularity::TimeOfDay => GranularitySet::TIME_OF_DAY,
            Granularity::DayOfWeek => GranularitySet::DAY_OF_WEEK,
            Granularity::DayOfMonth => GranularitySet::DAY_OF_MONTH,
            Granularity::WeekOfYear => GranularitySet::WEEK_OF_YEAR,
            Granularity::Month => GranularitySet::MONTH,
            Granularity::YearOfCentury => GranularitySet::YEAR_OF_CENTURY,
            Granularity::Year => GranularitySet::YEAR,
            Granularity::Century => GranularitySet::CENTURY,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown granularity '{s}'"))
    }
}

/// ISO-8601 duration units, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DurationUnit {
    Century,
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
}

impl DurationUnit {
    pub fn designator(self) -> &'static str {
        match self {
            DurationUnit::Century => "CE",
            DurationUnit::Year => "Y",
            DurationUnit::Month => "M",
            DurationUnit::Week => "W",
            DurationUnit::Day => "D",
            DurationUnit::Hour => "H",
            DurationUnit::Minute => "M",
        }
    }

    /// Units written after the `T` separator.
    pub fn is_time_part(self) -> bool {
        matches!(self, DurationUnit::Hour | DurationUnit::Minute)
    }
}

bitflags::bitflags! {
    /// A set of granularities, e.g. every field a candidate's instructions touch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GranularitySet: u16 {
        const MINUTE           = 1 << 0;
        const HOUR_OF_HALF_DAY = 1 << 1;
        const AM_PM            = 1 << 2;
        const HOUR_OF_DAY      = 1 << 3;
        const TIME_OF_DAY      = 1 << 4;
        const DAY_OF_WEEK      = 1 << 5;
        const DAY_OF_MONTH     = 1 << 6;
        const WEEK_OF_YEAR     = 1 << 7;
        const MONTH            = 1 << 8;
        const YEAR_OF_CENTURY  = 1 << 9;
        const YEAR             = 1 << 10;
        const CENTURY          = 1 << 11;
    }
}

impl GranularitySet {
    pub fn of(granularity: Granularity) -> Self {
        granularity.flag()
    }

    pub fn insert_granularity(&mut self, granularity: Granularity) {
        self.insert(granularity.flag());
    }

    pub fn remove_granularity(&mut self, granularity: Granularity) {
        self.remove(granularity.flag());
    }

    pub fn has(&self, granularity: Granularity) -> bool {
        self.contains(granularity.flag())
    }

    /// True when some member of the set shares `granularity`'s coarse rank.
    pub fn has_rank_of(&self, granularity: Granularity) -> bool {
        self.iter_granularities().any(|g| g.rank() == granularity.rank())
    }

    pub fn iter_granularities(&self) -> impl Iterator<Item = Granularity> + '_ {
        Granularity::ALL.iter().copied().filter(move |g| self.has(*g))
    }

    /// Finest member of the set.
    pub fn finest(&self) -> Option<Granularity> {
        self.iter_granularities().min_by_key(|g| g.rank())
    }

    /// Coarsest member of the set.
    pub fn coarsest(&self) -> Option<Granularity> {
        self.iter_granularities().max_by_key(|g| g.rank())
    }
}
