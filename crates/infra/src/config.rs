//! Storage configuration.
//!
//! The database location comes from `TECHPASSPORT_DB_PATH` when set (the value
//! `:memory:` selects a throwaway in-memory database), otherwise from the OS
//! data directory: `{data_dir}/techpassport/passport.db`.

use std::path::{Path, PathBuf};

use anyhow::Context;

pub const DB_PATH_ENV: &str = "TECHPASSPORT_DB_PATH";

const IN_MEMORY_MARKER: &str = ":memory:";

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

impl DatabaseLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DatabaseLocation::File(path) => Some(path),
            DatabaseLocation::InMemory => None,
        }
    }
}

impl core::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
            DatabaseLocation::InMemory => f.write_str(IN_MEMORY_MARKER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub location: DatabaseLocation,
}

impl StorageConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::File(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::InMemory,
        }
    }

    /// Resolve with `explicit` (a command-line value) taking precedence over the environment.
    pub fn resolve(explicit: Option<&str>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| explicit.map(str::to_string).or_else(|| std::env::var(key).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        match lookup(DB_PATH_ENV).map(|v| v.trim().to_string()) {
            Some(value) if value == IN_MEMORY_MARKER => Ok(Self::in_memory()),
            Some(value) if !value.is_empty() => Ok(Self::file(value)),
            _ => Ok(Self::file(default_database_path()?)),
        }
    }
}

/// `{data_dir}/techpassport/passport.db`, falling back to `~/.local/share`.
pub fn default_database_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("techpassport").join("passport.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = StorageConfig::from_lookup(|key| {
            (key == DB_PATH_ENV).then(|| " /tmp/p.db ".to_string())
        })
        .unwrap();
        assert_eq!(config, StorageConfig::file("/tmp/p.db"));
        assert_eq!(config.location.path(), Some(Path::new("/tmp/p.db")));
    }

    #[test]
    fn memory_marker_selects_in_memory() {
        let config = StorageConfig::from_lookup(|_| Some(":memory:".to_string())).unwrap();
        assert_eq!(config.location, DatabaseLocation::InMemory);
        assert_eq!(config.location.to_string(), ":memory:");
        assert_eq!(config.location.path(), None);
    }

    #[test]
    fn explicit_value_overrides_environment() {
        let config = StorageConfig::resolve(Some(":memory:")).unwrap();
        assert_eq!(config, StorageConfig::in_memory());
    }

    #[test]
    fn blank_or_missing_falls_back_to_data_dir() {
        for value in [None, Some("   ".to_string())] {
            let config = StorageConfig::from_lookup(|_| value.clone()).unwrap();
            let path = config.location.path().unwrap().to_path_buf();
            assert!(path.ends_with("techpassport/passport.db"), "{path:?}");
        }
    }
}
