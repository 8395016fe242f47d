//! Human-relative periods.
//!
//! A period is written as an optional count followed by a unit word, e.g. `"90 days"`,
//! `"2 weeks"` or just `"month"`. Parsing only splits the text, the unit word is kept as
//! written. Consumers resolve it into one of the normalized forms:
//!
//! - [`CronPeriod`] for crontab cadences (see [`schedule`]);
//! - [`DurationPeriod`] for file-age thresholds (see [`age`]).
//!
//! ```rust
//! use garbagetruck::period::{CronPeriod, DurationPeriod, Period, YearPolicy};
//!
//! let period: Period = "2 weeks".parse().unwrap();
//! assert_eq!(period.count(), 2);
//! assert_eq!(period.unit(), "week");
//!
//! let cron = CronPeriod::from_period(&period, YearPolicy::Strict).unwrap();
//! assert_eq!(cron.to_string(), "14 day");
//!
//! let age = DurationPeriod::from_period(&"month".parse().unwrap()).unwrap();
//! assert_eq!(age.to_string(), "30 day");
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{InvalidPeriod, InvalidPeriodReason};

pub mod age;
pub mod schedule;

pub use age::{AgeUnit, DurationPeriod};
pub use schedule::{CronField, CronPeriod, CronSchedule, CronUnit, YearPolicy};

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]*)\s*([A-Za-z]+?)s?\s*$").expect("period regex is valid")
});

/// Parsed period: a count and a unit word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    count: u32,
    unit: String,
}

impl Period {
    /// Parse period from text.
    ///
    /// Count is optional and defaults to 1. A single trailing `s` of the unit word is dropped,
    /// so `"day"`, `"days"`, `"2 day"` and `"2 days"` are all accepted. The unit is not checked
    /// against known units here.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriod`] if the text has no unit word, or the count is 0 or does not fit
    /// into `u32`.
    pub fn parse(text: &str) -> Result<Self, InvalidPeriod> {
        let captures = PERIOD_RE
            .captures(text)
            .ok_or_else(|| InvalidPeriod::new(text, InvalidPeriodReason::Syntax))?;
        let digits = &captures[1];
        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| InvalidPeriod::new(text, InvalidPeriodReason::Overflow))?
        };
        if count == 0 {
            return Err(InvalidPeriod::new(text, InvalidPeriodReason::ZeroCount));
        }
        Ok(Self {
            count,
            unit: captures[2].to_string(),
        })
    }

    pub(crate) fn new(count: u32, unit: impl Into<String>) -> Self {
        Self {
            count,
            unit: unit.into(),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Singular unit word, as written.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Multiply the count, failing instead of wrapping.
    pub(crate) fn scaled(&self, factor: u32, unit: &str) -> Result<Self, InvalidPeriod> {
        let count = self
            .count
            .checked_mul(factor)
            .ok_or_else(|| InvalidPeriod::new(self.to_string(), InvalidPeriodReason::Overflow))?;
        Ok(Self::new(count, unit))
    }
}

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("day", 1, "day")]
    #[case("days", 1, "day")]
    #[case("2 day", 2, "day")]
    #[case("90 days", 90, "day")]
    #[case("  14   days  ", 14, "day")]
    #[case("3weeks", 3, "week")]
    #[case("month", 1, "month")]
    #[case("\t1 year\n", 1, "year")]
    #[case("5 fortnights", 5, "fortnight")]
    #[case("Day", 1, "Day")]
    fn test_parse(#[case] text: &str, #[case] count: u32, #[case] unit: &str) {
        let period = Period::parse(text).expect("parse period");
        assert_eq!(period.count(), count);
        assert_eq!(period.unit(), unit);
        assert!(period.count() >= 1);
    }

    #[rstest]
    #[case("", InvalidPeriodReason::Syntax)]
    #[case("   ", InvalidPeriodReason::Syntax)]
    #[case("42", InvalidPeriodReason::Syntax)]
    #[case("7 days ago", InvalidPeriodReason::Syntax)]
    #[case("-3 days", InvalidPeriodReason::Syntax)]
    #[case("1.5 days", InvalidPeriodReason::Syntax)]
    #[case("٣ days", InvalidPeriodReason::Syntax)]
    #[case("２ weeks", InvalidPeriodReason::Syntax)]
    #[case("0 days", InvalidPeriodReason::ZeroCount)]
    #[case("99999999999 days", InvalidPeriodReason::Overflow)]
    fn test_parse_invalid(#[case] text: &str, #[case] reason: InvalidPeriodReason) {
        let err = Period::parse(text).expect_err("reject period");
        assert_eq!(err.text, text);
        assert_eq!(err.reason, reason);
    }

    #[test]
    fn test_only_one_plural_s_is_stripped() {
        let period: Period = "2 dayss".parse().unwrap();
        assert_eq!(period.unit(), "days");
    }

    #[test]
    fn test_display() {
        assert_eq!(Period::parse("week").unwrap().to_string(), "1 week");
        assert_eq!(Period::parse("10 hours").unwrap().to_string(), "10 hour");
    }
}
