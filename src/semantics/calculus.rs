//! Field arithmetic on [`TimePoint`]s and [`DurationValue`]s.
//!
//! Every operation returns `None` when the result would be an impossible
//! calendar value (30 February, hour 25, ...). Callers decide whether that
//! aborts the whole evaluation or only the instruction.

use crate::granularity::{DurationUnit, Granularity};
use crate::semantics::definition::Direction;
use crate::semantics::timex::{Amount, DurationValue, PartOfDay, TimePoint};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub fn shift_datetime(dt: NaiveDateTime, amount: i64, unit: DurationUnit) -> Option<NaiveDateTime> {
    match unit {
        DurationUnit::Minute => dt.checked_add_signed(Duration::try_minutes(amount)?),
        DurationUnit::Hour => dt.checked_add_signed(Duration::try_hours(amount)?),
        DurationUnit::Day => dt.checked_add_signed(Duration::try_days(amount)?),
        DurationUnit::Week => dt.checked_add_signed(Duration::try_weeks(amount)?),
        DurationUnit::Month => add_months(dt, i32::try_from(amount).ok()?),
        DurationUnit::Year => add_months(dt, i32::try_from(amount.checked_mul(12)?).ok()?),
        DurationUnit::Century => add_months(dt, i32::try_from(amount.checked_mul(1200)?).ok()?),
    }
}

/// Month arithmetic clamping the day to the target month's length.
pub fn add_months(dt: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    let zero_based = dt.month() as i32 - 1 + months;
    let year = dt.year() + zero_based.div_euclid(12);
    let month = (zero_based.rem_euclid(12) + 1) as u32;
    let day = dt.day().min(days_in_month(year, month)?);
    Some(NaiveDateTime::new(NaiveDate::from_ymd_opt(year, month, day)?, dt.time()))
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_next - Duration::days(1)).day())
}

/// Move the hour into the part of day it belongs to ("kell 8 õhtul" is 20:00).
pub fn adjust_hour_for_part_of_day(hour: u32, part: PartOfDay) -> u32 {
    match part {
        PartOfDay::Morning => {
            if hour == 12 {
                0
            } else {
                hour
            }
        }
        PartOfDay::Midday | PartOfDay::Daytime => {
            if hour < 6 {
                hour + 12
            } else {
                hour
            }
        }
        PartOfDay::Afternoon | PartOfDay::Evening => {
            if hour < 12 {
                hour + 12
            } else {
                hour
            }
        }
        // "kell 2 öösel" stays at 02:00, "kell 11 öösel" is 23:00.
        PartOfDay::Night => {
            if (6..12).contains(&hour) {
                hour + 12
            } else {
                hour
            }
        }
    }
}

/// Current value of a calendar field.
pub fn field_value(dt: NaiveDateTime, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Minute => dt.minute() as i64,
        Granularity::HourOfHalfDay => match dt.hour() % 12 {
            0 => 12,
            h => h as i64,
        },
        Granularity::AmPm => (dt.hour() >= 12) as i64,
        Granularity::HourOfDay => dt.hour() as i64,
        Granularity::TimeOfDay => dt.hour() as i64,
        Granularity::DayOfWeek => dt.weekday().number_from_monday() as i64,
        Granularity::DayOfMonth => dt.day() as i64,
        Granularity::WeekOfYear => dt.iso_week().week() as i64,
        Granularity::Month => dt.month() as i64,
        Granularity::YearOfCentury => dt.year().rem_euclid(100) as i64,
        Granularity::Year => dt.year() as i64,
        Granularity::Century => dt.year().div_euclid(100) as i64,
    }
}

fn with_ymd(dt: NaiveDateTime, year: i32, month: u32, day: u32, clamp: bool) -> Option<NaiveDateTime> {
    let day = if clamp { day.min(days_in_month(year, month)?) } else { day };
    Some(NaiveDateTime::new(NaiveDate::from_ymd_opt(year, month, day)?, dt.time()))
}

fn with_hm(dt: NaiveDateTime, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(dt.date(), NaiveTime::from_hms_opt(hour, minute, 0)?))
}

/// Set one field, keeping the others. `clamp_day` allows month/year changes
/// to pull an inherited day back into range instead of failing.
pub fn set_field(dt: NaiveDateTime, granularity: Granularity, value: i64, clamp_day: bool) -> Option<NaiveDateTime> {
    let v = u32::try_from(value).ok();
    match granularity {
        Granularity::Minute => with_hm(dt, dt.hour(), v.filter(|m| *m < 60)?),
        Granularity::HourOfDay => match v? {
            24 => shift_datetime(with_hm(dt, 0, dt.minute())?, 1, DurationUnit::Day),
            h => with_hm(dt, h, dt.minute()),
        },
        Granularity::HourOfHalfDay => {
            let h = v.filter(|h| (1..=12).contains(h))? % 12;
            let pm = if dt.hour() >= 12 { 12 } else { 0 };
            with_hm(dt, h + pm, dt.minute())
        }
        Granularity::AmPm => {
            let pm = v.filter(|p| *p <= 1)?;
            with_hm(dt, dt.hour() % 12 + 12 * pm, dt.minute())
        }
        Granularity::TimeOfDay => None,
        Granularity::DayOfWeek => {
            let target = v.filter(|d| (1..=7).contains(d))? as i64;
            let current = dt.weekday().number_from_monday() as i64;
            shift_datetime(dt, target - current, DurationUnit::Day)
        }
        Granularity::DayOfMonth => with_ymd(dt, dt.year(), dt.month(), v?, false),
        Granularity::WeekOfYear => {
            let iso = dt.iso_week();
            let date = NaiveDate::from_isoywd_opt(iso.year(), v?, dt.weekday())?;
            Some(NaiveDateTime::new(date, dt.time()))
        }
        Granularity::Month => with_ymd(dt, dt.year(), v.filter(|m| (1..=12).contains(m))?, dt.day(), clamp_day),
        Granularity::YearOfCentury => {
            let yy = v.filter(|y| *y < 100)? as i32;
            with_ymd(dt, dt.year().div_euclid(100) * 100 + yy, dt.month(), dt.day(), clamp_day)
        }
        Granularity::Year => with_ymd(dt, i32::try_from(value).ok()?, dt.month(), dt.day(), clamp_day),
        Granularity::Century => {
            let century = i32::try_from(value).ok()?;
            with_ymd(dt, century * 100 + dt.year().rem_euclid(100), dt.month(), dt.day(), clamp_day)
        }
    }
}

/// Unit a field steps by when seeking.
fn seek_unit(granularity: Granularity) -> Option<(DurationUnit, i64)> {
    match granularity {
        Granularity::Minute => Some((DurationUnit::Minute, 60 * 2)),
        Granularity::HourOfHalfDay | Granularity::AmPm | Granularity::HourOfDay => Some((DurationUnit::Hour, 48)),
        Granularity::DayOfWeek | Granularity::DayOfMonth => Some((DurationUnit::Day, 400)),
        Granularity::WeekOfYear => Some((DurationUnit::Week, 106)),
        Granularity::Month => Some((DurationUnit::Month, 24)),
        Granularity::YearOfCentury => Some((DurationUnit::Year, 200)),
        Granularity::TimeOfDay | Granularity::Year | Granularity::Century => None,
    }
}

/// Step from `dt` until `granularity` has `value`. The current position only
/// counts when `inclusive`.
pub fn seek_field(
    dt: NaiveDateTime,
    granularity: Granularity,
    value: i64,
    direction: Direction,
    inclusive: bool,
) -> Option<NaiveDateTime> {
    if direction == Direction::Current {
        return set_field(dt, granularity, value, true);
    }
    let Some((unit, bound)) = seek_unit(granularity) else {
        return set_field(dt, granularity, value, true);
    };
    if inclusive && field_value(dt, granularity) == value {
        return Some(dt);
    }
    let mut cursor = dt;
    for _ in 0..bound {
        cursor = shift_datetime(cursor, direction.sign(), unit)?;
        if field_value(cursor, granularity) == value {
            return Some(cursor);
        }
    }
    None
}

/// Unknown-field key for a granularity.
fn unknown_key(granularity: Granularity) -> Granularity {
    match granularity {
        Granularity::Minute => Granularity::Minute,
        Granularity::HourOfHalfDay | Granularity::AmPm | Granularity::HourOfDay | Granularity::TimeOfDay => {
            Granularity::HourOfDay
        }
        Granularity::DayOfWeek | Granularity::DayOfMonth | Granularity::WeekOfYear => Granularity::DayOfMonth,
        Granularity::Month => Granularity::Month,
        Granularity::YearOfCentury | Granularity::Year | Granularity::Century => Granularity::Year,
    }
}

pub fn is_unknown_marker(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == 'X' || c == 'x')
}

/// Parse an integer field value, accepting `"AM"`/`"PM"` and decimals with
/// an integral value.
pub fn parse_field_value(text: &str) -> Option<i64> {
    let text = text.trim();
    match text.to_ascii_uppercase().as_str() {
        "AM" => return Some(0),
        "PM" => return Some(1),
        _ => {}
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let f = text.replace(',', ".").parse::<f64>().ok()?;
    if f.fract() == 0.0 { Some(f as i64) } else { None }
}

impl TimePoint {
    fn mark(&mut self, granularity: Granularity) {
        self.touched.insert_granularity(granularity);
    }

    fn reapply_part_of_day(&mut self) -> Option<()> {
        let Some(part) = self.part_of_day else {
            return Some(());
        };
        if !self.touched.has_rank_of(Granularity::HourOfDay) {
            return Some(());
        }
        let hour = adjust_hour_for_part_of_day(self.datetime.hour(), part);
        self.datetime = with_hm(self.datetime, hour, self.datetime.minute())?;
        Some(())
    }

    /// SET: fix a field to a value; `X` makes the field unknown.
    pub fn set(&mut self, granularity: Granularity, text: &str) -> Option<()> {
        if is_unknown_marker(text) {
            self.unknown.insert_granularity(unknown_key(granularity));
            self.mark(granularity);
            return Some(());
        }
        if granularity == Granularity::TimeOfDay {
            self.part_of_day = Some(text.parse::<PartOfDay>().ok()?);
            self.mark(granularity);
            return self.reapply_part_of_day();
        }
        let value = parse_field_value(text)?;
        let clamp = !self.touched.has(Granularity::DayOfMonth);
        self.datetime = set_field(self.datetime, granularity, value, clamp)?;
        self.unknown.remove_granularity(unknown_key(granularity));
        self.mark(granularity);
        if granularity.rank() == Granularity::HourOfDay.rank() {
            self.reapply_part_of_day()?;
        }
        Some(())
    }

    /// ADD/SUBTRACT: move by `amount` units of the field.
    pub fn shift(&mut self, granularity: Granularity, amount: i64) -> Option<()> {
        let unit = granularity.duration_unit()?;
        self.datetime = shift_datetime(self.datetime, amount, unit)?;
        self.mark(granularity);
        self.relative = true;
        Some(())
    }

    /// SEEK/SEEK_IN: move to the nearest occurrence of a field value.
    pub fn seek(&mut self, granularity: Granularity, text: &str, direction: Direction, inclusive: bool) -> Option<()> {
        if direction == Direction::Current || granularity == Granularity::TimeOfDay {
            return self.set(granularity, text);
        }
        let value = parse_field_value(text)?;
        self.datetime = seek_field(self.datetime, granularity, value, direction, inclusive)?;
        self.mark(granularity);
        self.relative = true;
        Some(())
    }
}

impl DurationValue {
    /// SET on a duration: fix the amount of the unit.
    pub fn set_unit(&mut self, granularity: Granularity, text: &str) -> Option<()> {
        let unit = granularity.duration_unit()?;
        self.set(unit, Amount::parse(text)?);
        Some(())
    }

    /// ADD on a duration: accumulate onto the unit.
    pub fn add_unit(&mut self, granularity: Granularity, text: &str, sign: f64) -> Option<()> {
        let unit = granularity.duration_unit()?;
        let amount = match Amount::parse(text)? {
            Amount::Count(v) => Amount::Count(v * sign),
            Amount::Unknown => Amount::Unknown,
        };
        self.add(unit, amount);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::GranularitySet;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn point(y: i32, m: u32, d: u32) -> TimePoint {
        TimePoint::new(dt(y, m, d, 10, 30), GranularitySet::empty())
    }

    #[test]
    fn month_shift_clamps_day() {
        assert_eq!(shift_datetime(dt(2024, 1, 31, 8, 0), 1, DurationUnit::Month), Some(dt(2024, 2, 29, 8, 0)));
        assert_eq!(shift_datetime(dt(2023, 11, 15, 0, 0), 1, DurationUnit::Year), Some(dt(2024, 11, 15, 0, 0)));
    }

    #[test]
    fn setting_month_clamps_only_inherited_days() {
        let mut p = point(2009, 7, 31);
        p.set(Granularity::Month, "2").unwrap();
        assert_eq!(p.datetime.date(), NaiveDate::from_ymd_opt(2009, 2, 28).unwrap());

        let mut p = point(2009, 7, 1);
        p.set(Granularity::DayOfMonth, "31").unwrap();
        assert!(p.set(Granularity::Month, "2").is_none());
    }

    #[test]
    fn seek_excludes_current_position_unless_inclusive() {
        // 2009-07-23 is a Thursday.
        let mut p = point(2009, 7, 23);
        p.seek(Granularity::DayOfWeek, "4", Direction::Forward, false).unwrap();
        assert_eq!(p.datetime.date(), NaiveDate::from_ymd_opt(2009, 7, 30).unwrap());

        let mut p = point(2009, 7, 23);
        p.seek(Granularity::DayOfWeek, "4", Direction::Forward, true).unwrap();
        assert_eq!(p.datetime.date(), NaiveDate::from_ymd_opt(2009, 7, 23).unwrap());

        let mut p = point(2009, 7, 23);
        p.seek(Granularity::DayOfWeek, "1", Direction::Backward, false).unwrap();
        assert_eq!(p.datetime.date(), NaiveDate::from_ymd_opt(2009, 7, 20).unwrap());
        assert!(p.relative);
    }

    #[test]
    fn part_of_day_moves_clock_hours() {
        let mut p = point(2009, 7, 23);
        p.set(Granularity::TimeOfDay, "EV").unwrap();
        p.set(Granularity::HourOfDay, "8").unwrap();
        p.set(Granularity::Minute, "0").unwrap();
        assert_eq!(p.format(), "2009-07-23T20:00");

        assert_eq!(adjust_hour_for_part_of_day(2, PartOfDay::Night), 2);
        assert_eq!(adjust_hour_for_part_of_day(11, PartOfDay::Night), 23);
        assert_eq!(adjust_hour_for_part_of_day(12, PartOfDay::Morning), 0);
    }

    #[test]
    fn unknown_marker_hides_field() {
        let mut p = point(2009, 7, 23);
        p.set(Granularity::Year, "XXXX").unwrap();
        p.set(Granularity::Month, "5").unwrap();
        assert_eq!(p.format(), "XXXX-05");
    }

    #[test]
    fn impossible_values_fail() {
        let mut p = point(2009, 7, 23);
        assert!(p.set(Granularity::HourOfDay, "25").is_none());
        assert!(p.set(Granularity::Month, "13").is_none());
        assert!(p.shift(Granularity::TimeOfDay, 1).is_none());
        assert_eq!(set_field(dt(2009, 7, 23, 10, 0), Granularity::HourOfDay, 24, true), Some(dt(2009, 7, 24, 0, 0)));
    }

    #[test]
    fn duration_units_accumulate() {
        let mut d = DurationValue::default();
        d.set_unit(Granularity::DayOfMonth, "3").unwrap();
        d.add_unit(Granularity::DayOfMonth, "2", 1.0).unwrap();
        d.add_unit(Granularity::HourOfDay, "X", 1.0).unwrap();
        assert_eq!(d.format(), "P5DTXH");
        assert!(d.set_unit(Granularity::TimeOfDay, "1").is_none());
    }
}
