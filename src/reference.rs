//! The externally supplied reference (document creation) time.

use crate::error::{Error, Result};
use crate::granularity::{Granularity, GranularitySet};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::str::FromStr;

/// Sentinel for an unspecified reference field.
pub const UNKNOWN: &str = "XX";

/// Fields of the reference time, coarsest first.
pub const FIELDS: [Granularity; 5] =
    [Granularity::Year, Granularity::Month, Granularity::DayOfMonth, Granularity::HourOfDay, Granularity::Minute];

/// Reference time given as `[year, month, day, hour, minute]`, any of which
/// may be unknown. Once a field is unknown every finer field is unknown too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTime {
    pub datetime: NaiveDateTime,
    pub unknown: GranularitySet,
}

impl ReferenceTime {
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        ReferenceTime { datetime, unknown: GranularitySet::empty() }
    }

    /// Build from up to five textual fields; missing trailing fields are unknown.
    ///
    /// ```
    /// use ajamuster::ReferenceTime;
    ///
    /// let r = ReferenceTime::from_fields(&["2009", "07", "XX", "10", "30"]).unwrap();
    /// assert_eq!(r.fields(), ["2009", "07", "XX", "XX", "XX"]);
    /// ```
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        if fields.len() > FIELDS.len() {
            return Err(Error::Reference(fields.join(",")));
        }
        let mut values = [2000i64, 1, 1, 0, 0];
        let mut unknown = GranularitySet::empty();
        let mut seen_unknown = false;

        for (idx, granularity) in FIELDS.iter().enumerate() {
            let raw = fields.get(idx).map(|s| s.trim()).unwrap_or(UNKNOWN);
            if seen_unknown || raw.is_empty() || raw.chars().all(|c| c == 'X' || c == 'x') {
                seen_unknown = true;
                unknown.insert_granularity(*granularity);
                continue;
            }
            values[idx] = raw.parse::<i64>().map_err(|_| Error::Reference(fields.join(",")))?;
        }

        let invalid = || Error::Reference(fields.join(","));
        let year = i32::try_from(values[0]).map_err(|_| invalid())?;
        let field = |value: i64| u32::try_from(value).map_err(|_| invalid());
        let (month, day, hour, minute) = (field(values[1])?, field(values[2])?, field(values[3])?, field(values[4])?);
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)?;
        Ok(ReferenceTime { datetime: NaiveDateTime::new(date, time), unknown })
    }

    pub fn is_unknown(&self, granularity: Granularity) -> bool {
        self.unknown.has(granularity)
    }

    /// The five fields as text, unknown ones as `XX`.
    pub fn fields(&self) -> [String; 5] {
        let dt = self.datetime;
        let raw = [
            format!("{:04}", dt.year()),
            format!("{:02}", dt.month()),
            format!("{:02}", dt.day()),
            format!("{:02}", dt.hour()),
            format!("{:02}", dt.minute()),
        ];
        let mut out: [String; 5] = Default::default();
        for (idx, value) in raw.into_iter().enumerate() {
            out[idx] = if self.unknown.has(FIELDS[idx]) { UNKNOWN.to_string() } else { value };
        }
        out
    }

    /// TIMEX value of the reference itself (`t0`).
    pub fn value(&self) -> String {
        let f = self.fields();
        if self.unknown.has(Granularity::HourOfDay) {
            format!("{}-{}-{}", f[0], f[1], f[2])
        } else {
            format!("{}-{}-{}T{}:{}", f[0], f[1], f[2], f[3], f[4])
        }
    }
}

impl FromStr for ReferenceTime {
    type Err = Error;

    /// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` and the
    /// same shapes with `XX` placeholders.
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(['-', 'T', ':', ' ']).filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            return Err(Error::Reference(s.to_string()));
        }
        ReferenceTime::from_fields(&fields[..fields.len().min(FIELDS.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_propagate_to_finer_ones() {
        let r = ReferenceTime::from_fields(&["2009", "XX", "23", "10", "00"]).unwrap();
        assert!(r.is_unknown(Granularity::Month));
        assert!(r.is_unknown(Granularity::DayOfMonth));
        assert!(r.is_unknown(Granularity::Minute));
        assert!(!r.is_unknown(Granularity::Year));
        assert_eq!(r.value(), "2009-XX-XX");
    }

    #[test]
    fn parses_iso_like_strings() {
        let r: ReferenceTime = "2009-07-23T10:30".parse().unwrap();
        assert_eq!(r.fields(), ["2009", "07", "23", "10", "30"]);
        assert_eq!(r.value(), "2009-07-23T10:30");

        let r: ReferenceTime = "2009-07".parse().unwrap();
        assert_eq!(r.fields(), ["2009", "07", "XX", "XX", "XX"]);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(ReferenceTime::from_fields(&["2009", "02", "31"]).is_err());
        assert!("eile".parse::<ReferenceTime>().is_err());
    }

    #[test]
    fn out_of_range_fields_do_not_wrap() {
        assert!(ReferenceTime::from_fields(&["2009", "4294967303", "23", "10", "30"]).is_err());
        assert!(ReferenceTime::from_fields(&["4294969305", "07", "23", "10", "30"]).is_err());
        assert!(ReferenceTime::from_fields(&["2009", "-1", "23", "10", "30"]).is_err());
    }
}
