//! Error types.

use std::io::Error as IoError;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Period text could not be parsed or is not usable where it was given.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid period '{text}': {reason}")]
pub struct InvalidPeriod {
    /// Offending period, as written by the user or as normalized so far.
    pub text: String,

    pub reason: InvalidPeriodReason,
}

impl InvalidPeriod {
    pub(crate) fn new(text: impl Into<String>, reason: InvalidPeriodReason) -> Self {
        Self {
            text: text.into(),
            reason,
        }
    }
}

/// Reason why a period was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPeriodReason {
    #[error("expected '[count] <unit>'")]
    Syntax,

    #[error("count must be at least 1")]
    ZeroCount,

    #[error("count is too large")]
    Overflow,

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("check schedule must be less than a year")]
    YearNotSchedulable,

    #[error("crontab cannot step every {count} {unit}")]
    StepOutOfRange { count: u32, unit: &'static str },
}

/// Scheduler store errors.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    #[error("`crontab {args}` failed ({status}): {stderr}")]
    CrontabCommand {
        args: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("crontab content is not valid UTF-8")]
    NonUtf8Crontab,
}

/// Jobs config file errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    #[error("failed to parse '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("section '{0}' is not a table")]
    NotATable(String),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("failed to replace '{path}': {source}")]
    PersistError {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// Failure to make staged changes durable.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Failure to move a single file into the trash.
#[derive(thiserror::Error, Debug)]
pub enum TrashError {
    #[error(transparent)]
    Platform(#[from] trash::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

/// Non UTF-8 symbol in path.
#[derive(thiserror::Error, Debug)]
#[error("non-UTF-8 symbol in path")]
pub struct NonUtf8PathError;

/// Garbagetruck error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidPeriod(#[from] InvalidPeriod),

    #[error("invalid job name {0:?}: must be non-empty and fit on one line")]
    InvalidName(String),

    #[error("job {id} is missing '{key}'")]
    MalformedJob { id: String, key: &'static str },

    #[error("failed to persist jobs")]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    NonUtf8PathError(#[from] NonUtf8PathError),
}

impl From<SchedulerError> for Error {
    fn from(value: SchedulerError) -> Self {
        Self::Persistence(value.into())
    }
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Self::Persistence(value.into())
    }
}
