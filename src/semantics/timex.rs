//! Resolved temporal values and their TIMEX attributes.

use crate::granularity::{DurationUnit, Granularity, GranularitySet};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Internal TIMEX identifier. `0` is the reference time; real ids start at 1
/// and are renumbered densely on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimexId(pub u32);

impl TimexId {
    pub const REFERENCE: TimexId = TimexId(0);
}

impl fmt::Display for TimexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Hands out fresh ids during one document run.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 1 }
    }

    pub fn fresh(&mut self) -> TimexId {
        let id = TimexId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// What an `anchorTimeID` points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRef {
    ReferenceTime,
    Timex(TimexId),
    /// An anchor was found but never resolved; rendered as `??`.
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfDay {
    Morning,
    Midday,
    Afternoon,
    Evening,
    Night,
    Daytime,
}

impl PartOfDay {
    pub fn code(self) -> &'static str {
        match self {
            PartOfDay::Morning => "MO",
            PartOfDay::Midday => "MI",
            PartOfDay::Afternoon => "AF",
            PartOfDay::Evening => "EV",
            PartOfDay::Night => "NI",
            PartOfDay::Daytime => "DT",
        }
    }
}

impl FromStr for PartOfDay {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MO" => Ok(PartOfDay::Morning),
            "MI" => Ok(PartOfDay::Midday),
            "AF" => Ok(PartOfDay::Afternoon),
            "EV" => Ok(PartOfDay::Evening),
            "NI" => Ok(PartOfDay::Night),
            "DT" => Ok(PartOfDay::Daytime),
            _ => Err(()),
        }
    }
}

/// A calendar point: a concrete datetime plus bookkeeping about which fields
/// were actually specified.
///
/// The concrete `datetime` always exists so that arithmetic works; `touched`
/// decides the precision of the written value and `unknown` which fields are
/// rendered as `X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePoint {
    pub datetime: NaiveDateTime,
    pub touched: GranularitySet,
    /// Unknown fields, keyed by `Year`, `Month`, `DayOfMonth`, `HourOfDay`, `Minute`.
    pub unknown: GranularitySet,
    pub part_of_day: Option<PartOfDay>,
    /// The value was computed relative to its seed (ADD, SEEK, ...).
    pub relative: bool,
}

impl TimePoint {
    pub fn new(datetime: NaiveDateTime, unknown: GranularitySet) -> Self {
        TimePoint { datetime, touched: GranularitySet::empty(), unknown, part_of_day: None, relative: false }
    }

    /// Finest field written in the value.
    pub fn precision(&self) -> Option<Granularity> {
        self.touched.finest()
    }

    /// Value inherits its year from the seed.
    pub fn depends_on_seed(&self) -> bool {
        self.relative || !self.touched.intersects(GranularitySet::YEAR | GranularitySet::CENTURY)
    }

    fn field(&self, granularity: Granularity, width: usize, value: i64) -> String {
        if self.unknown.has(granularity) { "X".repeat(width) } else { format!("{:0width$}", value, width = width) }
    }

    /// TIMEX3 `value` of the point at its own precision.
    pub fn format(&self) -> String {
        let dt = self.datetime;
        let year = self.field(Granularity::Year, 4, dt.year() as i64);
        let month = self.field(Granularity::Month, 2, dt.month() as i64);
        let day = self.field(Granularity::DayOfMonth, 2, dt.day() as i64);
        let hour = self.field(Granularity::HourOfDay, 2, dt.hour() as i64);
        let minute = self.field(Granularity::Minute, 2, dt.minute() as i64);

        let Some(precision) = self.precision() else {
            return "PRESENT_REF".to_string();
        };
        match precision {
            Granularity::Minute | Granularity::HourOfHalfDay | Granularity::AmPm | Granularity::HourOfDay => {
                format!("{year}-{month}-{day}T{hour}:{minute}")
            }
            Granularity::TimeOfDay => match self.part_of_day {
                Some(pod) => format!("{year}-{month}-{day}T{}", pod.code()),
                None => format!("{year}-{month}-{day}"),
            },
            Granularity::DayOfWeek | Granularity::DayOfMonth => format!("{year}-{month}-{day}"),
            Granularity::WeekOfYear => {
                let iso = dt.iso_week();
                let year = self.field(Granularity::Year, 4, iso.year() as i64);
                let week = self.field(Granularity::DayOfMonth, 2, iso.week() as i64);
                format!("{year}-W{week}")
            }
            Granularity::Month => format!("{year}-{month}"),
            Granularity::YearOfCentury | Granularity::Year => year,
            Granularity::Century => self.field(Granularity::Year, 2, (dt.year() / 100) as i64),
        }
    }
}

/// Amount of one duration unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Count(f64),
    Unknown,
}

impl Amount {
    pub fn parse(text: &str) -> Option<Amount> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("X") {
            return Some(Amount::Unknown);
        }
        text.replace(',', ".").parse::<f64>().ok().map(Amount::Count)
    }

    fn plus(self, other: Amount) -> Amount {
        match (self, other) {
            (Amount::Count(a), Amount::Count(b)) => Amount::Count(a + b),
            _ => Amount::Unknown,
        }
    }

    fn render(self) -> String {
        match self {
            Amount::Count(v) if v.fract() == 0.0 => format!("{}", v as i64),
            Amount::Count(v) => format!("{}", v),
            Amount::Unknown => "X".to_string(),
        }
    }
}

/// An ISO-8601 duration as a bag of unit amounts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DurationValue {
    amounts: BTreeMap<DurationUnit, Amount>,
}

impl DurationValue {
    pub fn set(&mut self, unit: DurationUnit, amount: Amount) {
        self.amounts.insert(unit, amount);
    }

    pub fn add(&mut self, unit: DurationUnit, amount: Amount) {
        let next = match self.amounts.get(&unit) {
            Some(current) => current.plus(amount),
            None => amount,
        };
        self.amounts.insert(unit, next);
    }

    pub fn get(&self, unit: DurationUnit) -> Option<Amount> {
        self.amounts.get(&unit).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn format(&self) -> String {
        if self.amounts.is_empty() {
            return "PX".to_string();
        }
        let mut out = String::from("P");
        let mut in_time = false;
        for (unit, amount) in &self.amounts {
            if unit.is_time_part() && !in_time {
                out.push('T');
                in_time = true;
            }
            out.push_str(&amount.render());
            out.push_str(unit.designator());
        }
        out
    }
}

/// The three kinds of temporal values.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalValue {
    Point(TimePoint),
    Duration(DurationValue),
    Recurrence(DurationValue),
}

/// TIMEX3 `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimexType {
    Date,
    Time,
    Duration,
    Set,
}

impl TimexType {
    pub fn as_str(self) -> &'static str {
        match self {
            TimexType::Date => "DATE",
            TimexType::Time => "TIME",
            TimexType::Duration => "DURATION",
            TimexType::Set => "SET",
        }
    }
}

impl FromStr for TimexType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DATE" => Ok(TimexType::Date),
            "TIME" => Ok(TimexType::Time),
            "DURATION" => Ok(TimexType::Duration),
            "SET" => Ok(TimexType::Set),
            _ => Err(()),
        }
    }
}

/// A resolved temporal expression with its TIMEX attributes and related
/// objects.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalObject {
    pub id: TimexId,
    pub value: TemporalValue,
    pub timex_type: Option<TimexType>,
    pub value_override: Option<String>,
    pub modifier: Option<String>,
    pub function_in_document: Option<String>,
    pub temporal_function: bool,
    pub anchor: Option<AnchorRef>,
    pub begin_point: Option<TimexId>,
    pub end_point: Option<TimexId>,
    pub quant: Option<String>,
    pub freq: Option<String>,
    /// Endpoints of a textually realized interval: always zero or two.
    pub explicit: Vec<TemporalObject>,
    /// Synthesized objects without a span of their own.
    pub implicit: Vec<TemporalObject>,
}

impl TemporalObject {
    pub fn new(id: TimexId, value: TemporalValue) -> Self {
        TemporalObject {
            id,
            value,
            timex_type: None,
            value_override: None,
            modifier: None,
            function_in_document: None,
            temporal_function: false,
            anchor: None,
            begin_point: None,
            end_point: None,
            quant: None,
            freq: None,
            explicit: Vec::new(),
            implicit: Vec::new(),
        }
    }

    pub fn point(&self) -> Option<&TimePoint> {
        match &self.value {
            TemporalValue::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn kind_type(&self) -> TimexType {
        if let Some(t) = self.timex_type {
            return t;
        }
        match &self.value {
            TemporalValue::Point(p) => match p.precision() {
                Some(g) if g.rank() <= Granularity::TimeOfDay.rank() => TimexType::Time,
                _ => TimexType::Date,
            },
            TemporalValue::Duration(_) => TimexType::Duration,
            TemporalValue::Recurrence(_) => TimexType::Set,
        }
    }

    pub fn value_string(&self) -> String {
        if let Some(v) = &self.value_override {
            return v.clone();
        }
        match &self.value {
            TemporalValue::Point(p) => p.format(),
            TemporalValue::Duration(d) | TemporalValue::Recurrence(d) => d.format(),
        }
    }

    pub fn is_explicit_interval(&self) -> bool {
        self.explicit.len() == 2
    }

    /// Bind two endpoint objects into an explicit interval owned by `id`.
    pub fn interval(id: TimexId, begin: TemporalObject, end: TemporalObject) -> Self {
        let mut duration = DurationValue::default();
        if let (Some(b), Some(e)) = (begin.point(), end.point()) {
            if let Some(unit) = common_unit(b, e) {
                let delta = unit_distance(b.datetime, e.datetime, unit);
                duration.set(unit, Amount::Count(delta as f64));
            }
        }
        let mut object = TemporalObject::new(id, TemporalValue::Duration(duration));
        object.begin_point = Some(begin.id);
        object.end_point = Some(end.id);
        object.explicit = vec![begin, end];
        object
    }
}

fn common_unit(a: &TimePoint, b: &TimePoint) -> Option<DurationUnit> {
    let pa = a.precision()?;
    let pb = b.precision()?;
    if pa.rank() != pb.rank() {
        return None;
    }
    pa.duration_unit()
}

fn unit_distance(a: NaiveDateTime, b: NaiveDateTime, unit: DurationUnit) -> i64 {
    let delta = b - a;
    match unit {
        DurationUnit::Minute => delta.num_minutes(),
        DurationUnit::Hour => delta.num_hours(),
        DurationUnit::Day => delta.num_days(),
        DurationUnit::Week => delta.num_weeks(),
        DurationUnit::Month => (b.year() as i64 * 12 + b.month() as i64) - (a.year() as i64 * 12 + a.month() as i64),
        DurationUnit::Year => (b.year() - a.year()) as i64,
        DurationUnit::Century => ((b.year() / 100) - (a.year() / 100)) as i64,
    }
}
