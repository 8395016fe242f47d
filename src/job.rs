//! Job identity and summaries.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::scheduler::TAG_PREFIX;

/// Job identifier derived from the job name.
///
/// SHA256 hex digest of the name. The ID is how the config section and the scheduled command
/// refer to a job, so the scheduler can run it without knowing its name. The hash function is
/// an implementation detail and may change between major versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn for_name(name: &str) -> Self {
        Self(sha256::digest(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tag of the scheduler entry of the job named `name`.
pub fn tag_for(name: &str) -> String {
    format!("{TAG_PREFIX}{name}")
}

/// Config key of the `n`-th (1-based) directory of a job.
pub(crate) fn dir_key(n: usize) -> String {
    format!("dir{n}")
}

/// Job as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub files_older_than: String,
    pub check_every: String,
    pub dirs: Vec<PathBuf>,

    /// Crontab line of the job's scheduler entry, if there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Next time the scheduler entry triggers, in local time like crontab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Local>>,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs = self
            .dirs
            .iter()
            .map(|dir| format!("{:?}", dir.display().to_string()))
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "Job {}: name={:?} files_older_than={:?} check_every={:?} dirs=[{}]",
            self.id, self.name, self.files_older_than, self.check_every, dirs
        )
    }
}
