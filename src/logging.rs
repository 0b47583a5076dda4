use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SOOPUP_LOG";
const DEFAULT_DIRECTIVE: &str = "soopup=info";

pub enum Sink {
    /// The terminal belongs to the UI; write to a file instead.
    File(PathBuf),
    Stderr,
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("soopup").join("soopup.log"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber. Safe to call more than once.
pub fn init(sink: Sink) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter());
    let installed = match sink {
        Sink::Stderr => builder.with_writer(std::io::stderr).try_init(),
        Sink::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("logging: failed to create directory {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("logging: failed to open {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("logging: subscriber already installed");
    }
    Ok(())
}
