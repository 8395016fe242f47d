use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn, Span};
use walkdir::WalkDir;

use crate::config::JobConfig;
use crate::errors::{Error, TrashError};
use crate::job::{dir_key, JobId};
use crate::period::{DurationPeriod, Period};

/// Recoverable removal of files.
pub trait Trash {
    /// Move file at `path` to the trash.
    fn send_to_trash(&mut self, path: &Path) -> Result<(), TrashError>;
}

/// Platform trash (freedesktop.org trash, macOS Finder trash, Windows recycle bin).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn send_to_trash(&mut self, path: &Path) -> Result<(), TrashError> {
        trash::delete(path)?;
        Ok(())
    }
}

/// Outcome of a single job run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files sent to the trash.
    pub trashed: Vec<PathBuf>,

    /// Files which were old enough but could not be trashed.
    pub failed: Vec<(PathBuf, TrashError)>,

    /// Job directories which don't exist (or are not directories).
    pub missing_dirs: Vec<PathBuf>,
}

/// Job runner.
///
/// Trashes files which were not modified for longer than the job's `files_older_than`.
/// Cleanup is best-effort: missing directories, unreadable entries and files which can't be
/// trashed are logged and skipped.
pub struct JobRunner<'c, T: Trash> {
    config: &'c JobConfig,
    trash: T,
    span: Span,
}

impl<'c, T: Trash> JobRunner<'c, T> {
    /// Create new job runner. Log records of the runner are emitted inside `span`.
    pub fn new(config: &'c JobConfig, trash: T, span: Span) -> Self {
        Self {
            config,
            trash,
            span,
        }
    }

    pub fn trash(&self) -> &T {
        &self.trash
    }

    /// Run job once.
    ///
    /// Returns `None` if there is no such job. This is not an error: a scheduler entry may
    /// outlive its config section and other scheduled jobs should keep running.
    pub fn run(&mut self, id: &JobId) -> Result<Option<RunReport>, Error> {
        self.run_at(id, Utc::now())
    }

    /// Run job once as if it was `now`.
    pub fn run_at(&mut self, id: &JobId, now: DateTime<Utc>) -> Result<Option<RunReport>, Error> {
        let _enter = self.span.clone().entered();
        let section = id.as_str();
        if !self.config.has_section(section) {
            warn!("unable to run job {}: does not exist", id);
            return Ok(None);
        }
        let name = self.config.get(section, "name").unwrap_or_default();
        debug!("running: {} ({})", name, id);

        let files_older_than =
            self.config
                .get(section, "files_older_than")
                .ok_or_else(|| Error::MalformedJob {
                    id: id.to_string(),
                    key: "files_older_than",
                })?;
        let cutoff = DurationPeriod::from_period(&Period::parse(files_older_than)?)?.cutoff(now)?;

        let mut report = RunReport::default();
        let dirs = (1..)
            .map_while(|n| self.config.get(section, &dir_key(n)))
            .map(PathBuf::from)
            .collect::<Vec<_>>();
        for dir in dirs {
            self.sweep(&dir, cutoff, &mut report);
        }
        Ok(Some(report))
    }

    /// Trash files under `dir` last modified before `cutoff`.
    fn sweep(&mut self, dir: &Path, cutoff: DateTime<Utc>, report: &mut RunReport) {
        if !dir.is_dir() {
            warn!("ignoring {}: does not exist", dir.display());
            report.missing_dirs.push(dir.to_path_buf());
            return;
        }
        debug!("checking {} for files older than {}", dir.display(), cutoff);

        let mut count = 0;
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("failed to read entry under {}: {}", dir.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let modified = match entry.metadata().map(|metadata| metadata.modified()) {
                Ok(Ok(modified)) => DateTime::<Utc>::from(modified),
                Ok(Err(err)) => {
                    warn!("failed to get mtime of {}: {}", entry.path().display(), err);
                    continue;
                }
                Err(err) => {
                    warn!("failed to stat {}: {}", entry.path().display(), err);
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            let path = entry.into_path();
            debug!("trashing: {}", path.display());
            match self.trash.send_to_trash(&path) {
                Ok(()) => {
                    count += 1;
                    report.trashed.push(path);
                }
                Err(err) => {
                    warn!("failed to trash {}: {}", path.display(), err);
                    report.failed.push((path, err));
                }
            }
        }
        if count > 0 {
            info!("cleaned up {} files in {}", count, dir.display());
        }
    }
}
