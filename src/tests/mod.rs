//! Job store and runner tests.


/// Fixtures for job related tests.
pub(crate) mod fixtures {
    use std::collections::HashSet;
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;

    use chrono::{DateTime, TimeDelta, Utc};
    use rstest::fixture;
    use tempfile::TempDir;
    use tracing::Span;

    use crate::errors::TrashError;
    use crate::scheduler::{Crontab, CrontabSource};
    use crate::{JobStore, StoreOptions, Trash};

    type Error = Box<dyn std::error::Error>;

    /// Crontab content not managed by garbagetruck.
    pub const FOREIGN_CRONTAB: &str = "MAILTO=\"\"\n15 3 * * * /usr/bin/updatedb\n";

    pub const RUN_COMMAND: &str = "/usr/local/bin/garbagetruck run {id}";

    /// Job store over a crontab file and a config file in a temp directory.
    pub struct JobsFixture {
        /// Holds temp directory and destroys it on drop.
        pub tmp: TempDir,

        pub config_path: PathBuf,
        pub crontab_path: PathBuf,
        pub store: JobStore<Crontab>,
    }

    impl JobsFixture {
        pub fn new() -> Result<Self, Error> {
            let tmp = TempDir::new()?;
            let config_path = tmp.path().join("jobs.toml");
            let crontab_path = tmp.path().join("crontab");
            fs::write(&crontab_path, FOREIGN_CRONTAB)?;
            let store = Self::open(&config_path, &crontab_path)?;
            Ok(Self {
                tmp,
                config_path,
                crontab_path,
                store,
            })
        }

        /// Open another store over the same files.
        pub fn reopen(&self) -> Result<JobStore<Crontab>, Error> {
            Self::open(&self.config_path, &self.crontab_path)
        }

        /// Current content of the crontab file.
        pub fn crontab(&self) -> String {
            fs::read_to_string(&self.crontab_path).unwrap_or_default()
        }

        fn open(config_path: &Path, crontab_path: &Path) -> Result<JobStore<Crontab>, Error> {
            let crontab = Crontab::load(CrontabSource::File(crontab_path.to_path_buf()))?;
            let opts = StoreOptions::builder().run_command(RUN_COMMAND).build()?;
            Ok(JobStore::open(crontab, config_path, opts, Span::none())?)
        }
    }

    #[fixture]
    pub fn jobs() -> JobsFixture {
        JobsFixture::new().unwrap()
    }

    /// Trash which only records what it was asked to trash.
    #[derive(Debug, Default)]
    pub struct RecordingTrash {
        pub sent: Vec<PathBuf>,

        /// File names which fail to be trashed.
        pub locked: HashSet<String>,
    }

    impl RecordingTrash {
        pub fn locking(names: &[&str]) -> Self {
            Self {
                sent: Vec::new(),
                locked: names.iter().map(ToString::to_string).collect(),
            }
        }
    }

    impl Trash for RecordingTrash {
        fn send_to_trash(&mut self, path: &Path) -> Result<(), TrashError> {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.locked.contains(&name) {
                return Err(TrashError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "file is locked",
                )));
            }
            self.sent.push(path.to_path_buf());
            Ok(())
        }
    }

    /// Create file at `path` last modified `age` before `now`.
    pub fn aged_file(path: &Path, age: TimeDelta, now: DateTime<Utc>) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::from(now - age)).unwrap();
        path.to_path_buf()
    }
}
