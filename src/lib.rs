//! # garbagetruck
//!
//! Periodically move old files into the platform trash.
//!
//! A job watches a set of directories. Every `check_every` the user's crontab runs the job,
//! which sends every file not modified for `files_older_than` to the trash.
//!
//! Jobs live in two places which [`JobStore`] keeps in step:
//!
//! - the **jobs config** ([`config::JobConfig`]), one section per job keyed by its [`JobId`];
//! - the **scheduler** ([`scheduler::Scheduler`]), one crontab entry per job tagged with the
//!   job name and running the job by its ID.
//!
//! ## Example
//!
//! ```rust
//! use garbagetruck::scheduler::Crontab;
//! use garbagetruck::{JobRunner, JobStore, StoreOptions, SystemTrash};
//!
//! # fn test(config_path: &std::path::Path) -> Result<(), garbagetruck::errors::Error> {
//! let span = tracing::info_span!("garbagetruck");
//! let mut store = JobStore::open(
//!     Crontab::parse(""),
//!     config_path,
//!     StoreOptions::default(),
//!     span.clone(),
//! )?;
//!
//! // Check every week, trash everything older than two weeks
//! let job = store.set("downloads", &["/home/me/Downloads"], "14 days", "week")?;
//! store.save()?;
//!
//! // This is what the crontab entry runs
//! let mut runner = JobRunner::new(store.config(), SystemTrash, span);
//! runner.run(&job.id)?;
//! # Ok(())
//! # }
//! ```

mod job;
mod runner;
mod store;

pub mod config;
pub mod errors;
pub mod logging;
pub mod period;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use job::{tag_for, JobId, JobSummary};
pub use runner::{JobRunner, RunReport, SystemTrash, Trash};
pub use store::{JobStore, StoreOptions, StoreOptionsBuilder, JOB_ID_PLACEHOLDER};

// Re-exports of public API arguments from extern crates
#[doc(no_inline)]
pub use chrono::{DateTime, Local, Utc};
