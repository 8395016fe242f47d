//! File-age thresholds.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use super::Period;
use crate::errors::{InvalidPeriod, InvalidPeriodReason};

/// Approximate length of a month.
pub const DAYS_PER_MONTH: u32 = 30;

/// Approximate length of a year.
pub const DAYS_PER_YEAR: u32 = 365;

/// Unit of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl AgeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

/// Period with calendar units resolved into days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPeriod {
    count: u32,
    unit: AgeUnit,
}

impl DurationPeriod {
    /// Resolve parsed period into elapsed time.
    ///
    /// Months are taken as [`DAYS_PER_MONTH`] days and years as [`DAYS_PER_YEAR`] days. These
    /// are approximations and stay that way: stored thresholds are compared with them.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriod`] for unknown units.
    pub fn from_period(period: &Period) -> Result<Self, InvalidPeriod> {
        let (count, unit) = match period.unit() {
            "minute" => (period.count(), AgeUnit::Minute),
            "hour" => (period.count(), AgeUnit::Hour),
            "day" => (period.count(), AgeUnit::Day),
            "week" => (period.count(), AgeUnit::Week),
            "month" => (period.scaled(DAYS_PER_MONTH, "day")?.count(), AgeUnit::Day),
            "year" => (period.scaled(DAYS_PER_YEAR, "day")?.count(), AgeUnit::Day),
            other => {
                return Err(InvalidPeriod::new(
                    period.to_string(),
                    InvalidPeriodReason::UnknownUnit(other.to_string()),
                ));
            }
        };
        Ok(Self { count, unit })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> AgeUnit {
        self.unit
    }

    pub fn as_time_delta(&self) -> TimeDelta {
        let count = i64::from(self.count);
        match self.unit {
            AgeUnit::Minute => TimeDelta::minutes(count),
            AgeUnit::Hour => TimeDelta::hours(count),
            AgeUnit::Day => TimeDelta::days(count),
            AgeUnit::Week => TimeDelta::weeks(count),
        }
    }

    /// Point in time this long before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriod`] with [`InvalidPeriodReason::Overflow`] if the result is out of
    /// the representable date range.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, InvalidPeriod> {
        now.checked_sub_signed(self.as_time_delta())
            .ok_or_else(|| InvalidPeriod::new(self.to_string(), InvalidPeriodReason::Overflow))
    }
}

impl fmt::Display for DurationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn duration_of(text: &str) -> DurationPeriod {
        DurationPeriod::from_period(&text.parse().unwrap()).expect("resolve duration")
    }

    #[rstest]
    #[case("1 month", 30, AgeUnit::Day)]
    #[case("3 months", 90, AgeUnit::Day)]
    #[case("1 year", 365, AgeUnit::Day)]
    #[case("90 days", 90, AgeUnit::Day)]
    #[case("2 weeks", 2, AgeUnit::Week)]
    #[case("12 hours", 12, AgeUnit::Hour)]
    #[case("minute", 1, AgeUnit::Minute)]
    fn test_from_period(#[case] text: &str, #[case] count: u32, #[case] unit: AgeUnit) {
        let duration = duration_of(text);
        assert_eq!(duration.count(), count);
        assert_eq!(duration.unit(), unit);
    }

    #[test]
    fn test_time_delta() {
        assert_eq!(duration_of("month").as_time_delta(), TimeDelta::days(30));
        assert_eq!(duration_of("year").as_time_delta(), TimeDelta::days(365));
        assert_eq!(duration_of("2 weeks").as_time_delta(), TimeDelta::days(14));
        assert_eq!(duration_of("90 minutes").as_time_delta(), TimeDelta::minutes(90));
    }

    #[test]
    fn test_cutoff() {
        let now = Utc::now();
        assert_eq!(
            duration_of("2 weeks").cutoff(now).unwrap(),
            now - TimeDelta::days(14)
        );

        let err = duration_of("1000000 years")
            .cutoff(now)
            .expect_err("reject cutoff before the supported date range");
        assert_eq!(err.reason, InvalidPeriodReason::Overflow);
        assert_eq!(err.text, "365000000 day");
    }

    #[test]
    fn test_unknown_unit() {
        let err = DurationPeriod::from_period(&"3 sprints".parse().unwrap())
            .expect_err("reject unknown unit");
        assert_eq!(
            err.reason,
            InvalidPeriodReason::UnknownUnit("sprint".to_string())
        );
        assert_eq!(err.text, "3 sprint");
    }

    #[test]
    fn test_overflow() {
        let err = DurationPeriod::from_period(&Period::new(u32::MAX, "year"))
            .expect_err("reject overflow");
        assert_eq!(err.reason, InvalidPeriodReason::Overflow);
    }
}
