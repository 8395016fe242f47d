//! Crontab cadences.
//!
//! [`CronPeriod`] is a [`Period`] restricted to units crontab can repeat on, and
//! [`CronSchedule`] is the five time fields of a crontab line built from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use tracing::debug;

use super::Period;
use crate::errors::{InvalidPeriod, InvalidPeriodReason};

/// How a yearly check cadence is handled.
///
/// Crontab has no year field, so a job cannot be checked less often than monthly-based steps
/// allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearPolicy {
    /// Reject "year" outright.
    #[default]
    Strict,

    /// Treat a year as 12 months.
    Lenient,
}

/// Time field of a crontab line which a job may repeat on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CronUnit {
    Minute,
    Hour,
    /// Day of month.
    Day,
    Month,
}

impl CronUnit {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
        }
    }

    /// Next finer field, if any.
    pub fn smaller(&self) -> Option<Self> {
        match self {
            Self::Minute => None,
            Self::Hour => Some(Self::Minute),
            Self::Day => Some(Self::Hour),
            Self::Month => Some(Self::Day),
        }
    }

    /// First value of the field's range.
    pub fn first_tick(&self) -> u32 {
        match self {
            Self::Minute | Self::Hour => 0,
            Self::Day | Self::Month => 1,
        }
    }

    /// Largest step crontab accepts for the field.
    fn max_step(&self) -> u32 {
        match self {
            Self::Minute => 59,
            Self::Hour => 23,
            Self::Day => 31,
            Self::Month => 12,
        }
    }
}

impl fmt::Display for CronUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period which crontab is able to repeat on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronPeriod {
    count: u32,
    unit: CronUnit,
}

impl CronPeriod {
    /// Normalize parsed period for crontab.
    ///
    /// Weeks become 7 days. Years are rejected or become 12 months, depending on `years`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriod`] for unknown units, for years under [`YearPolicy::Strict`] and
    /// for counts crontab cannot step by.
    pub fn from_period(period: &Period, years: YearPolicy) -> Result<Self, InvalidPeriod> {
        let period = match (period.unit(), years) {
            ("week", _) => period.scaled(7, "day")?,
            ("year", YearPolicy::Strict) => {
                return Err(InvalidPeriod::new(
                    period.to_string(),
                    InvalidPeriodReason::YearNotSchedulable,
                ));
            }
            ("year", YearPolicy::Lenient) => period.scaled(12, "month")?,
            _ => period.clone(),
        };
        let unit = CronUnit::from_word(period.unit()).ok_or_else(|| {
            InvalidPeriod::new(
                period.to_string(),
                InvalidPeriodReason::UnknownUnit(period.unit().to_string()),
            )
        })?;
        if period.count() > unit.max_step() {
            return Err(InvalidPeriod::new(
                period.to_string(),
                InvalidPeriodReason::StepOutOfRange {
                    count: period.count(),
                    unit: unit.as_str(),
                },
            ));
        }
        Ok(Self {
            count: period.count(),
            unit,
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> CronUnit {
        self.unit
    }
}

impl fmt::Display for CronPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

/// Single time field of a crontab line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CronField {
    /// `*`
    #[default]
    Any,

    /// `*/n`
    Every(u32),

    /// `n`
    On(u32),
}

impl CronField {
    /// Trigger every `n` units. Every single unit is just `*`.
    pub fn every(&mut self, n: u32) {
        *self = if n == 1 { Self::Any } else { Self::Every(n) };
    }

    /// Trigger only when the field equals `n`.
    pub fn on(&mut self, n: u32) {
        *self = Self::On(n);
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Every(n) => write!(f, "*/{n}"),
            Self::On(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for CronField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(Self::Any)
        } else if let Some(step) = s.strip_prefix("*/") {
            step.parse().map(Self::Every).map_err(|_| ())
        } else {
            s.parse().map(Self::On).map_err(|_| ())
        }
    }
}

/// Time fields of a crontab line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CronSchedule {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    pub day_of_week: CronField,
}

impl CronSchedule {
    /// Field for the given unit.
    pub fn field_mut(&mut self, unit: CronUnit) -> &mut CronField {
        match unit {
            CronUnit::Minute => &mut self.minute,
            CronUnit::Hour => &mut self.hour,
            CronUnit::Day => &mut self.day_of_month,
            CronUnit::Month => &mut self.month,
        }
    }

    /// Next time the schedule triggers after `after`.
    ///
    /// Fields are read in the time zone of `after`. Crontab runs in the host's local time, so
    /// pass a [`chrono::Local`] time to get the real next run.
    ///
    /// Returns `None` if the fields do not form a schedule `cron` understands.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        // `cron` expects a leading seconds field
        let expression = format!("0 {self}");
        match cron::Schedule::from_str(&expression) {
            Ok(schedule) => schedule.after(after).next(),
            Err(err) => {
                debug!("cannot evaluate schedule '{}': {}", self, err);
                None
            }
        }
    }
}

impl From<CronPeriod> for CronSchedule {
    /// Single months, days and hours are anchored to the first tick of the next finer field
    /// ("1 month" runs on the first of the month), anything else steps by the count.
    /// Fields finer than the anchor are pinned to their first tick.
    fn from(period: CronPeriod) -> Self {
        let mut schedule = Self::default();
        let anchor = match period.unit.smaller() {
            Some(smaller) if period.count == 1 => {
                schedule.field_mut(smaller).on(smaller.first_tick());
                smaller
            }
            _ => {
                schedule.field_mut(period.unit).every(period.count);
                period.unit
            }
        };
        let mut finer = anchor.smaller();
        while let Some(unit) = finer {
            schedule.field_mut(unit).on(unit.first_tick());
            finer = unit.smaller();
        }
        schedule
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

impl FromStr for CronSchedule {
    type Err = ();

    /// Parse exactly five whitespace separated fields.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split_whitespace().collect::<Vec<_>>();
        let [minute, hour, day_of_month, month, day_of_week] = fields[..] else {
            return Err(());
        };
        Ok(Self {
            minute: minute.parse()?,
            hour: hour.parse()?,
            day_of_month: day_of_month.parse()?,
            month: month.parse()?,
            day_of_week: day_of_week.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use rstest::rstest;

    use super::*;

    fn schedule_for(text: &str) -> String {
        let period = CronPeriod::from_period(&text.parse().unwrap(), YearPolicy::Strict).unwrap();
        CronSchedule::from(period).to_string()
    }

    #[rstest]
    #[case("week", 7, CronUnit::Day)]
    #[case("2 weeks", 14, CronUnit::Day)]
    #[case("3 days", 3, CronUnit::Day)]
    #[case("hour", 1, CronUnit::Hour)]
    #[case("month", 1, CronUnit::Month)]
    #[case("45 minutes", 45, CronUnit::Minute)]
    fn test_cron_period(#[case] text: &str, #[case] count: u32, #[case] unit: CronUnit) {
        let period = CronPeriod::from_period(&text.parse().unwrap(), YearPolicy::Strict).unwrap();
        assert_eq!(period.count(), count);
        assert_eq!(period.unit(), unit);
    }

    #[test]
    fn test_strict_year_is_rejected() {
        let err = CronPeriod::from_period(&"year".parse().unwrap(), YearPolicy::Strict)
            .expect_err("reject year");
        assert_eq!(err.reason, InvalidPeriodReason::YearNotSchedulable);
    }

    #[test]
    fn test_lenient_year_becomes_months() {
        let period = CronPeriod::from_period(&"1 year".parse().unwrap(), YearPolicy::Lenient)
            .expect("coarsen year");
        assert_eq!(period.count(), 12);
        assert_eq!(period.unit(), CronUnit::Month);
        assert_eq!(CronSchedule::from(period).to_string(), "0 0 1 */12 *");
    }

    #[rstest]
    #[case("fortnight", InvalidPeriodReason::UnknownUnit("fortnight".to_string()))]
    #[case("Day", InvalidPeriodReason::UnknownUnit("Day".to_string()))]
    #[case("90 minutes", InvalidPeriodReason::StepOutOfRange { count: 90, unit: "minute" })]
    #[case("5 weeks", InvalidPeriodReason::StepOutOfRange { count: 35, unit: "day" })]
    #[case("2 years", InvalidPeriodReason::YearNotSchedulable)]
    fn test_cron_period_invalid(#[case] text: &str, #[case] reason: InvalidPeriodReason) {
        let err = CronPeriod::from_period(&text.parse().unwrap(), YearPolicy::Strict)
            .expect_err("reject period");
        assert_eq!(err.reason, reason);
    }

    #[rstest]
    #[case("1 month", "0 0 1 * *")]
    #[case("day", "0 0 * * *")]
    #[case("hour", "0 * * * *")]
    #[case("minute", "* * * * *")]
    #[case("week", "0 0 */7 * *")]
    #[case("2 days", "0 0 */2 * *")]
    #[case("6 hours", "0 */6 * * *")]
    #[case("15 minutes", "*/15 * * * *")]
    #[case("3 months", "0 0 1 */3 *")]
    fn test_schedule(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(schedule_for(text), expected);
    }

    #[test]
    fn test_field_accessors() {
        let mut schedule = CronSchedule::default();
        schedule.field_mut(CronUnit::Day).every(7);
        schedule.field_mut(CronUnit::Hour).on(4);
        schedule.field_mut(CronUnit::Minute).every(1);
        assert_eq!(schedule.to_string(), "* 4 */7 * *");
    }

    #[test]
    fn test_parse_schedule() {
        let schedule: CronSchedule = "0 0 */7 * *".parse().unwrap();
        assert_eq!(schedule.day_of_month, CronField::Every(7));
        assert_eq!(schedule.hour, CronField::On(0));
        assert_eq!(schedule.month, CronField::Any);
        assert!("0 0 */7 *".parse::<CronSchedule>().is_err());
        assert!("0 0 1-5 * *".parse::<CronSchedule>().is_err());
    }

    #[test]
    fn test_next_after() {
        let schedule: CronSchedule = "0 0 1 * *".parse().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        assert_eq!(
            schedule.next_after(&now),
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_next_after_uses_time_zone_of_now() {
        let schedule: CronSchedule = "0 0 * * *".parse().unwrap();
        let berlin = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = berlin.with_ymd_and_hms(2026, 10, 17, 12, 30, 0).unwrap();

        let next = schedule.next_after(&now).expect("next run");

        assert_eq!(next, berlin.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 10, 17, 22, 0, 0).unwrap()
        );
    }
}
