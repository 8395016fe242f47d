//! Scheduler store.
//!
//! Jobs are triggered by entries of a cron-like scheduler. Entries are correlated with jobs by
//! their tag (a comment on the crontab line), never by position or scheduler-assigned IDs.
//!
//! Changes are staged in memory until [`Scheduler::commit`] is called.

use std::fmt;

use crate::errors::SchedulerError;
use crate::period::{CronField, CronSchedule, CronUnit};

mod crontab;

pub use crontab::{Crontab, CrontabSource};

/// Prefix of the tag of every entry managed by garbagetruck.
///
/// Entries whose tag does not start with this prefix belong to someone else and are never
/// touched.
pub const TAG_PREFIX: &str = "garbagetruck: ";

/// Single scheduler entry: when to run, what to run and the tag it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    pub schedule: CronSchedule,
    pub command: String,
    pub tag: String,
}

impl CronEntry {
    /// Create an entry which runs every minute until its fields are set.
    pub fn new(command: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            schedule: CronSchedule::default(),
            command: command.into(),
            tag: tag.into(),
        }
    }

    /// Field for the given unit, use [`CronField::every`] or [`CronField::on`] on it.
    pub fn field_mut(&mut self, unit: CronUnit) -> &mut CronField {
        self.schedule.field_mut(unit)
    }
}

impl fmt::Display for CronEntry {
    /// Crontab line of the entry.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} # {}", self.schedule, self.command, self.tag)
    }
}

/// Store of scheduler entries.
pub trait Scheduler {
    /// Stage new entry.
    fn new_entry(&mut self, command: &str, tag: &str) -> &mut CronEntry;

    /// Entries with the given tag.
    fn find_entries(&self, tag: &str) -> Vec<&CronEntry>;

    /// Unstage all entries with the given tag. Returns the number of removed entries.
    fn remove_entries(&mut self, tag: &str) -> usize;

    /// Write staged entries to the persistent store.
    fn commit(&mut self) -> Result<(), SchedulerError>;

    /// Restore the persistent store to its content before the last [`Self::commit`].
    ///
    /// Staged entries are kept, so a later commit writes them again. Does nothing if nothing
    /// was committed.
    fn rollback(&mut self) -> Result<(), SchedulerError>;
}
