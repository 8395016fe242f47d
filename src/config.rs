//! Jobs config file.
//!
//! Section based key/value store persisted as TOML: one table per job, keyed by the job ID,
//! holding only string values.
//!
//! ```toml
//! [2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824]
//! name = "downloads-cleanup"
//! files_older_than = "14 days"
//! check_every = "week"
//! dir1 = "/home/me/Downloads"
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use toml::{Table, Value};
use tracing::{debug, trace};

use crate::errors::ConfigError;

/// Default path of the jobs config file.
pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "garbagetruck") {
        proj_dirs.config_dir().join("jobs.toml")
    } else {
        PathBuf::from(".garbagetruck.toml")
    }
}

/// In-memory jobs config, bound to a file path.
#[derive(Debug, Clone)]
pub struct JobConfig {
    path: PathBuf,
    sections: Table,
}

impl JobConfig {
    /// Empty config which will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sections: Table::new(),
        }
    }

    /// Read config from `path`. Missing file gives an empty config.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        debug!("reading config {}", path.display());
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("config does not exist yet");
                return Ok(Self::new(path));
            }
            Err(err) => return Err(err.into()),
        };
        let sections = content
            .parse::<Table>()
            .map_err(|source| ConfigError::ParseError {
                path: path.clone(),
                source,
            })?;
        if let Some((name, _)) = sections.iter().find(|(_, value)| !value.is_table()) {
            return Err(ConfigError::NotATable(name.clone()));
        }
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section names in file order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Add empty section. Existing section is left as is.
    pub fn add_section(&mut self, section: &str) {
        if !self.has_section(section) {
            self.sections
                .insert(section.to_string(), Value::Table(Table::new()));
        }
    }

    /// Returns whether the section existed.
    pub fn remove_section(&mut self, section: &str) -> bool {
        self.sections.remove(section).is_some()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.table(section)?.get(key)?.as_str()
    }

    /// Set key in section, adding the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.add_section(section);
        if let Some(Value::Table(table)) = self.sections.get_mut(section) {
            table.insert(key.to_string(), Value::String(value.into()));
        }
    }

    /// String items of a section in file order.
    pub fn items<'a>(&'a self, section: &str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.table(section)
            .into_iter()
            .flat_map(|table| table.iter())
            .filter_map(|(key, value)| Some((key.as_str(), value.as_str()?)))
    }

    /// Write config to its path, replacing the file at once.
    pub fn write(&self) -> Result<(), ConfigError> {
        self.stage()?.commit()
    }

    /// Write config into a temporary file beside the target, see [`StagedConfig::commit`].
    pub fn stage(&self) -> Result<StagedConfig, ConfigError> {
        let content = toml::to_string(&self.sections)?;
        trace!("config content:\n{}", content);
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        Ok(StagedConfig {
            file,
            path: self.path.clone(),
        })
    }

    fn table(&self, section: &str) -> Option<&Table> {
        self.sections.get(section)?.as_table()
    }
}

/// Config written to a temporary file, not yet in place.
///
/// Dropping it discards the temporary file.
#[derive(Debug)]
pub struct StagedConfig {
    file: NamedTempFile,
    path: PathBuf,
}

impl StagedConfig {
    /// Move the temporary file over the config path.
    pub fn commit(self) -> Result<(), ConfigError> {
        debug!("writing config {}", self.path.display());
        self.file
            .persist(&self.path)
            .map_err(|source| ConfigError::PersistError {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}
