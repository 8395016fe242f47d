//! Log sink setup.
//!
//! The subscriber is returned as a [`Dispatch`] which the caller installs for the scope of the
//! program, nothing is registered globally.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Build log dispatcher.
///
/// Records at `level` and above go to stderr, or are appended to `log_file`. `RUST_LOG`
/// directives take precedence over `level`.
pub fn dispatch(level: LevelFilter, log_file: Option<&Path>) -> io::Result<Dispatch> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .finish();
    Ok(Dispatch::new(subscriber))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tracing::{debug, info};

    use super::*;

    #[test]
    fn test_log_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("garbagetruck.log");
        let dispatcher =
            dispatch(LevelFilter::INFO, Some(path.as_path())).expect("create dispatcher");

        tracing::dispatcher::with_default(&dispatcher, || {
            info!("cleaned up 3 files");
            debug!("hidden detail");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("cleaned up 3 files"));
        assert!(!content.contains("hidden detail"));
    }
}
