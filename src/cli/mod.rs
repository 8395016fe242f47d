use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{info_span, warn, Dispatch, Level};

use garbagetruck::config::{default_config_path, JobConfig};
use garbagetruck::errors::NonUtf8PathError;
use garbagetruck::logging;
use garbagetruck::scheduler::{Crontab, CrontabSource};
use garbagetruck::{JobId, JobRunner, JobStore, StoreOptions, SystemTrash, JOB_ID_PLACEHOLDER};

/// Log level names accepted on the command line.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

/// CLI interface of garbagetruck.
#[derive(Parser, Clone, Debug)]
#[command(version, about = "Periodically move old files into the trash")]
pub struct Cli {
    /// Path to jobs config file.
    #[arg(
        short = 'c',
        long,
        value_name = "PATH",
        default_value = default_config_path().into_os_string(),
    )]
    config: PathBuf,

    /// Schedule jobs in this crontab file instead of the user's crontab.
    #[arg(long, value_name = "PATH")]
    crontab: Option<PathBuf>,

    /// Set logging level.
    #[arg(short = 'l', long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Write logs to FILENAME instead of stderr.
    #[arg(long, value_name = "FILENAME")]
    log_file: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Log dispatcher configured by the command line.
    pub fn dispatch(&self) -> anyhow::Result<Dispatch> {
        logging::dispatch(self.log_level.into(), self.log_file.as_deref())
            .context("failed to open log file")
    }

    pub fn execute(&self) -> anyhow::Result<()> {
        self.command.execute(self)
    }

    /// Run job by its ID.
    fn run_job(&self, job_id: &str) -> anyhow::Result<()> {
        let config = JobConfig::load(&self.config).context("failed to read jobs config")?;
        let mut runner = JobRunner::new(&config, SystemTrash, info_span!("run"));
        runner
            .run(&JobId::from(job_id))
            .with_context(|| format!("failed to run job {job_id}"))?;
        Ok(())
    }

    /// Open job store over the configured crontab and config file.
    fn open_store(&self) -> anyhow::Result<JobStore> {
        let source = match &self.crontab {
            Some(path) => CrontabSource::File(path.clone()),
            None => CrontabSource::User,
        };
        let scheduler = Crontab::load(source).context("failed to read crontab")?;
        let opts = StoreOptions::builder()
            .run_command(self.run_command()?)
            .build()?;
        JobStore::open(scheduler, &self.config, opts, info_span!("store"))
            .context("failed to open job store")
    }

    /// Command the crontab runs, pointing at the same stores as this invocation.
    fn run_command(&self) -> anyhow::Result<String> {
        let exe = std::env::current_exe().context("failed to locate own executable")?;
        let config = std::path::absolute(&self.config)?;
        let mut words = vec![
            crontab_word(&exe)?,
            "--config".to_string(),
            crontab_word(&config)?,
        ];
        if let Some(crontab) = &self.crontab {
            words.push("--crontab".to_string());
            words.push(crontab_word(&std::path::absolute(crontab)?)?);
        }
        if let Some(log_file) = &self.log_file {
            words.push("--log-file".to_string());
            words.push(crontab_word(&std::path::absolute(log_file)?)?);
        }
        words.push("run".to_string());
        words.push(JOB_ID_PLACEHOLDER.to_string());
        Ok(words.join(" "))
    }
}

/// Quote path for a crontab command: shell quoting plus escaped `%`.
fn crontab_word(path: &Path) -> anyhow::Result<String> {
    let text = path.to_str().ok_or(NonUtf8PathError)?;
    let safe = |c: char| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c);
    let word = if text.chars().all(safe) {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    };
    Ok(word.replace('%', r"\%"))
}

/// garbagetruck commands.
#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Add a job, or replace the job with the same name.
    Set {
        /// Unique name of the job.
        name: String,

        /// Directories to look for old files in.
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Files not modified for this long are trashed, e.g. "90 days".
        #[arg(long, value_name = "PERIOD", default_value = "90 days")]
        older_than: String,

        /// How often to look for old files, e.g. "week".
        #[arg(long, value_name = "PERIOD", default_value = "week")]
        check_every: String,
    },

    /// List all jobs.
    ///
    /// With debug logging, the crontab entry and the next run of each job are shown too.
    List {
        /// Print jobs as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove jobs.
    Remove {
        /// Names of jobs to remove.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run a job once.
    ///
    /// This is what the crontab entries call.
    Run {
        /// Job ID (not its name).
        job_id: String,
    },
}

impl Command {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        match self {
            Self::Set {
                name,
                dirs,
                older_than,
                check_every,
            } => {
                let dirs = dirs
                    .iter()
                    .map(std::path::absolute)
                    .collect::<Result<Vec<_>, _>>()
                    .context("failed to resolve directories")?;
                let mut store = cli.open_store()?;
                let job = store.set(name, &dirs, older_than, check_every)?;
                store.save()?;
                println!("{job}");
            }
            Self::List { json } => {
                let store = cli.open_store()?;
                if *json {
                    let jobs = store.list().collect::<Vec<_>>();
                    println!("{}", serde_json::to_string_pretty(&jobs)?);
                    return Ok(());
                }
                let verbose = tracing::enabled!(Level::DEBUG);
                for job in store.list() {
                    println!("{job}");
                    if verbose {
                        match (&job.entry, job.next_run) {
                            (Some(entry), Some(next_run)) => {
                                println!("  {entry}");
                                println!("  next run: {next_run}");
                            }
                            (Some(entry), None) => println!("  {entry}"),
                            (None, _) => println!("  no crontab entry"),
                        }
                    }
                }
            }
            Self::Remove { names } => {
                let mut store = cli.open_store()?;
                for name in names {
                    if !store.remove(name) {
                        warn!("job '{}' does not exist", name);
                    }
                }
                store.save()?;
            }
            Self::Run { job_id } => cli.run_job(job_id)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from(["garbagetruck", "set", "tmp", "/tmp/a", "/tmp/b"])
            .expect("parse set");
        match cli.command {
            Command::Set {
                name,
                dirs,
                older_than,
                check_every,
            } => {
                assert_eq!(name, "tmp");
                assert_eq!(dirs, [PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
                assert_eq!(older_than, "90 days");
                assert_eq!(check_every, "week");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_set_requires_dirs() {
        assert!(Cli::try_parse_from(["garbagetruck", "set", "tmp"]).is_err());
        assert!(Cli::try_parse_from(["garbagetruck", "remove"]).is_err());
    }

    #[test]
    fn test_crontab_word() {
        assert_eq!(
            crontab_word(Path::new("/usr/local/bin/garbagetruck")).unwrap(),
            "/usr/local/bin/garbagetruck"
        );
        assert_eq!(
            crontab_word(Path::new("/home/me/my jobs.toml")).unwrap(),
            "'/home/me/my jobs.toml'"
        );
        assert_eq!(
            crontab_word(Path::new("/tmp/it's 100%")).unwrap(),
            r"'/tmp/it'\''s 100\%'"
        );
    }
}
