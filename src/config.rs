//! Runtime configuration read from the environment.

use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::service::DEFAULT_ACTOR;

/// Default tracing filter when neither `RUST_LOG` nor `LAWDOC_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "lawdoc=info";

/// Settings for the `lawdoc` binary.
///
/// # Environment Variables
///
/// - `LAWDOC_DATABASE_PATH`: database file (default `{data_dir}/lawdoc/lawdoc.db`)
/// - `LAWDOC_LOG`: tracing filter directive (default `lawdoc=info`)
/// - `LAWDOC_ACTOR`: name recorded in audit columns (default `System`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_filter: String,
    pub actor: String,
}

impl Config {
    /// Loads a `.env` file if present, then reads the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Reads the environment, falling back to defaults for unset or empty values.
    pub fn from_env() -> Result<Self> {
        let database_path = match non_empty_var("LAWDOC_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };
        let log_filter =
            non_empty_var("LAWDOC_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let actor = non_empty_var("LAWDOC_ACTOR").unwrap_or_else(|| DEFAULT_ACTOR.to_string());

        Ok(Self {
            database_path,
            log_filter,
            actor,
        })
    }
}

/// Returns `{data_dir}/lawdoc/lawdoc.db`, where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
pub fn default_database_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("Failed to determine data directory"))?;
    Ok(data_dir.join("lawdoc").join("lawdoc.db"))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
