use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;
use tracing::{debug, trace};

use super::{CronEntry, Scheduler, TAG_PREFIX};
use crate::errors::SchedulerError;

const CRONTAB_BIN: &str = "crontab";

/// Where the crontab lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrontabSource {
    /// Crontab of the current user, accessed through the `crontab` binary.
    User,

    /// Plain file in crontab format.
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum Line {
    /// Line not parsed into an entry, kept byte for byte.
    Foreign(String),
    Entry(CronEntry),
}

impl Line {
    /// Tag of a managed line, parsed or not.
    fn tag(&self) -> Option<&str> {
        match self {
            Self::Entry(entry) => Some(entry.tag.as_str()),
            Self::Foreign(text) => split_tag(text).map(|(_, tag)| tag),
        }
    }
}

/// Crontab scheduler store.
///
/// Only lines whose comment starts with [`TAG_PREFIX`] are parsed into entries, every other
/// line (comments, environment settings, other people's jobs) is written back untouched.
#[derive(Debug)]
pub struct Crontab {
    /// `None` for detached crontabs which never leave memory.
    source: Option<CrontabSource>,
    lines: Vec<Line>,
    /// Content of the source as of the last read or commit.
    committed: String,
    /// Content of the source before the last commit.
    previous: Option<String>,
}

impl Crontab {
    /// Read crontab from `source`.
    ///
    /// Missing crontab is treated as an empty one.
    pub fn load(source: CrontabSource) -> Result<Self, SchedulerError> {
        let content = read_source(&source)?;
        let mut crontab = Self::parse(&content);
        crontab.source = Some(source);
        Ok(crontab)
    }

    /// Crontab from content, not backed by any source.
    ///
    /// Commits only update the in-memory state.
    pub fn parse(content: &str) -> Self {
        Self {
            source: None,
            lines: content.lines().map(parse_line).collect(),
            committed: content.to_string(),
            previous: None,
        }
    }

    pub fn source(&self) -> Option<&CrontabSource> {
        self.source.as_ref()
    }

    /// Managed entries in crontab order.
    pub fn entries(&self) -> impl Iterator<Item = &CronEntry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            Line::Foreign(_) => None,
        })
    }

    /// Render crontab content.
    pub fn render(&self) -> String {
        let mut content = String::new();
        for line in &self.lines {
            match line {
                Line::Foreign(text) => content.push_str(text),
                Line::Entry(entry) => content.push_str(&entry.to_string()),
            }
            content.push('\n');
        }
        content
    }

    fn write(&self, content: &str) -> Result<(), SchedulerError> {
        match &self.source {
            Some(source) => write_source(source, content),
            None => Ok(()),
        }
    }
}

impl Scheduler for Crontab {
    fn new_entry(&mut self, command: &str, tag: &str) -> &mut CronEntry {
        self.lines.push(Line::Entry(CronEntry::new(command, tag)));
        match self.lines.last_mut() {
            Some(Line::Entry(entry)) => entry,
            _ => unreachable!("entry was just pushed"),
        }
    }

    fn find_entries(&self, tag: &str) -> Vec<&CronEntry> {
        self.entries().filter(|entry| entry.tag == tag).collect()
    }

    /// Tagged lines which could not be parsed (e.g. edited by hand) are removed too.
    fn remove_entries(&mut self, tag: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| line.tag() != Some(tag));
        before - self.lines.len()
    }

    fn commit(&mut self) -> Result<(), SchedulerError> {
        let content = self.render();
        debug!("committing crontab ({} lines)", self.lines.len());
        trace!("crontab content:\n{}", content);
        self.write(&content)?;
        self.previous = Some(std::mem::replace(&mut self.committed, content));
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SchedulerError> {
        let Some(previous) = self.previous.take() else {
            return Ok(());
        };
        debug!("restoring crontab content before last commit");
        self.write(&previous)?;
        self.committed = previous;
        Ok(())
    }
}

/// Split managed line into its schedule and command part and its tag.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let index = line.find(&format!(" # {TAG_PREFIX}"))?;
    let (body, comment) = line.split_at(index);
    Some((body, &comment[" # ".len()..]))
}

/// Parse managed line, anything else is foreign.
fn parse_line(line: &str) -> Line {
    let Some((body, tag)) = split_tag(line) else {
        return Line::Foreign(line.to_string());
    };

    let mut rest = body.trim_start();
    let mut fields = Vec::with_capacity(5);
    for _ in 0..5 {
        let Some(end) = rest.find(char::is_whitespace) else {
            return Line::Foreign(line.to_string());
        };
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    let command = rest.trim_end();

    match fields.join(" ").parse() {
        Ok(schedule) if !command.is_empty() => Line::Entry(CronEntry {
            schedule,
            command: command.to_string(),
            tag: tag.to_string(),
        }),
        _ => {
            debug!("keeping unrecognized tagged line as is: {}", line);
            Line::Foreign(line.to_string())
        }
    }
}

fn read_source(source: &CrontabSource) -> Result<String, SchedulerError> {
    match source {
        CrontabSource::File(path) => {
            debug!("reading crontab file {}", path.display());
            match fs::read_to_string(path) {
                Ok(content) => Ok(content),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
                Err(err) => Err(err.into()),
            }
        }
        CrontabSource::User => {
            debug!("reading user crontab");
            let output = Command::new(CRONTAB_BIN).arg("-l").output()?;
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.status.success() {
                String::from_utf8(output.stdout).map_err(|_| SchedulerError::NonUtf8Crontab)
            } else if stderr.contains("no crontab") {
                Ok(String::new())
            } else {
                Err(SchedulerError::CrontabCommand {
                    args: "-l".to_string(),
                    status: output.status,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }
}

fn write_source(source: &CrontabSource, content: &str) -> Result<(), SchedulerError> {
    match source {
        CrontabSource::File(path) => {
            debug!("writing crontab file {}", path.display());
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let mut file = NamedTempFile::new_in(dir)?;
            file.write_all(content.as_bytes())?;
            file.persist(path).map_err(|err| SchedulerError::IoError(err.error))?;
            Ok(())
        }
        CrontabSource::User => {
            debug!("installing user crontab");
            let mut child = Command::new(CRONTAB_BIN)
                .arg("-")
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(content.as_bytes())?;
            }
            let output = child.wait_with_output()?;
            if output.status.success() {
                Ok(())
            } else {
                Err(SchedulerError::CrontabCommand {
                    args: "-".to_string(),
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        }
    }
}
