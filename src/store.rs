//! Job store.
//!
//! Keeps the jobs config and the scheduler entries in step: every job in the config has exactly
//! one scheduler entry tagged with [`tag_for`] its name, and every tagged entry has a config
//! section. All changes are staged in memory until [`JobStore::save`].

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use derive_builder::Builder;
use tracing::{debug, error, warn, Span};

use crate::config::JobConfig;
use crate::errors::{Error, NonUtf8PathError};
use crate::job::{dir_key, tag_for, JobId, JobSummary};
use crate::period::{CronPeriod, CronSchedule, DurationPeriod, Period, YearPolicy};
use crate::scheduler::{Crontab, Scheduler};

/// Placeholder replaced with the job ID in [`StoreOptionsBuilder::run_command`].
pub const JOB_ID_PLACEHOLDER: &str = "{id}";

/// Job store options. Use [`StoreOptionsBuilder`] to create.
#[derive(Builder, Clone, Debug)]
#[builder(setter(into))]
#[builder(default)]
pub struct StoreOptions {
    /// Command run by the scheduler entry of each job.
    ///
    /// [`JOB_ID_PLACEHOLDER`] is replaced with the job ID.
    run_command: String,

    /// How yearly check cadences are handled.
    year_policy: YearPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            run_command: format!("garbagetruck run {JOB_ID_PLACEHOLDER}"),
            year_policy: YearPolicy::default(),
        }
    }
}

impl StoreOptions {
    /// Create new builder for store options.
    pub fn builder() -> StoreOptionsBuilder {
        StoreOptionsBuilder::default()
    }
}

/// Store of cleanup jobs.
pub struct JobStore<S: Scheduler = Crontab> {
    scheduler: S,
    config: JobConfig,
    opts: StoreOptions,
    span: Span,
}

impl<S: Scheduler> JobStore<S> {
    /// Create store over already loaded scheduler and config.
    ///
    /// Log records of the store are emitted inside `span`.
    pub fn new(scheduler: S, config: JobConfig, opts: StoreOptions, span: Span) -> Self {
        Self {
            scheduler,
            config,
            opts,
            span,
        }
    }

    /// Create store, reading config from `config_path` if it exists.
    pub fn open(
        scheduler: S,
        config_path: impl Into<PathBuf>,
        opts: StoreOptions,
        span: Span,
    ) -> Result<Self, Error> {
        let config = span.in_scope(|| JobConfig::load(config_path))?;
        Ok(Self::new(scheduler, config, opts, span))
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Add job or replace the job with the same name.
    ///
    /// Both periods are checked before anything is touched: `files_older_than` must resolve to
    /// an age reaching no further back than the supported date range, and `check_every` to a
    /// crontab cadence.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`], [`Error::InvalidPeriod`] or [`Error::NonUtf8PathError`]. The
    /// store is unchanged on error.
    pub fn set<P: AsRef<Path>>(
        &mut self,
        name: &str,
        dirs: &[P],
        files_older_than: &str,
        check_every: &str,
    ) -> Result<JobSummary, Error> {
        let _enter = self.span.clone().entered();

        if name.trim().is_empty() || name.contains(['\n', '\r']) {
            return Err(Error::InvalidName(name.to_string()));
        }
        DurationPeriod::from_period(&Period::parse(files_older_than)?)?.cutoff(Utc::now())?;
        let cadence =
            CronPeriod::from_period(&Period::parse(check_every)?, self.opts.year_policy)?;
        let dirs = dirs
            .iter()
            .map(|dir| dir.as_ref().to_str().ok_or(NonUtf8PathError))
            .collect::<Result<Vec<_>, _>>()?;

        let id = JobId::for_name(name);
        debug!("setting job: {} ({})", name, id);
        self.remove(name);

        let command = self
            .opts
            .run_command
            .replace(JOB_ID_PLACEHOLDER, id.as_str());
        let entry = self.scheduler.new_entry(&command, &tag_for(name));
        entry.schedule = CronSchedule::from(cadence);
        debug!("scheduled: {}", entry);

        let section = id.as_str();
        self.config.add_section(section);
        self.config.set(section, "name", name);
        self.config.set(section, "files_older_than", files_older_than);
        self.config.set(section, "check_every", check_every);
        for (n, dir) in dirs.into_iter().enumerate() {
            self.config.set(section, &dir_key(n + 1), dir);
        }

        self.summary(section).ok_or_else(|| Error::MalformedJob {
            id: id.to_string(),
            key: "name",
        })
    }

    /// Remove job and its scheduler entries.
    ///
    /// Returns whether there was anything to remove. Unknown names are not an error.
    pub fn remove(&mut self, name: &str) -> bool {
        let _enter = self.span.clone().entered();
        let id = JobId::for_name(name);
        debug!("removing job: {} ({})", name, id);
        let entries = self.scheduler.remove_entries(&tag_for(name));
        let section = self.config.remove_section(id.as_str());
        if entries > 1 {
            warn!("removed {} scheduler entries of job '{}'", entries, name);
        }
        entries > 0 || section
    }

    /// Summary of the job named `name`.
    pub fn get(&self, name: &str) -> Option<JobSummary> {
        self.summary(JobId::for_name(name).as_str())
    }

    /// Summaries of all jobs in config order.
    pub fn list(&self) -> impl Iterator<Item = JobSummary> + '_ {
        self.config.sections().filter_map(move |section| {
            let summary = self.summary(section);
            if summary.is_none() {
                let _enter = self.span.enter();
                warn!("skipping config section {}: no job name", section);
            }
            summary
        })
    }

    /// Commit scheduler entries and write config.
    ///
    /// Config is staged into a temporary file first, then the scheduler is committed and
    /// then the config file is replaced. If replacing the config fails, the scheduler commit
    /// is rolled back on disk. In memory both stores keep their changes, so `save` can be
    /// retried.
    ///
    /// # Errors
    ///
    /// [`Error::Persistence`] if either store can't be written.
    pub fn save(&mut self) -> Result<(), Error> {
        let _enter = self.span.clone().entered();
        debug!("saving: {}", self.config.path().display());
        let staged = self.config.stage()?;
        self.scheduler.commit()?;
        if let Err(err) = staged.commit() {
            error!("failed to write config, restoring scheduler: {}", err);
            if let Err(rollback_err) = self.scheduler.rollback() {
                error!("failed to restore scheduler: {}", rollback_err);
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn summary(&self, section: &str) -> Option<JobSummary> {
        let name = self.config.get(section, "name")?;
        let field = |key: &str| self.config.get(section, key).unwrap_or_default().to_string();
        let dirs = (1..)
            .map_while(|n| self.config.get(section, &dir_key(n)))
            .map(PathBuf::from)
            .collect();
        let entry = self.scheduler.find_entries(&tag_for(name)).into_iter().next();
        Some(JobSummary {
            id: JobId::from(section),
            name: name.to_string(),
            files_older_than: field("files_older_than"),
            check_every: field("check_every"),
            dirs,
            entry: entry.map(ToString::to_string),
            next_run: entry.and_then(|entry| entry.schedule.next_after(&Local::now())),
        })
    }
}
