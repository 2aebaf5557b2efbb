//! Sequentially numbered JSON configuration snapshots (`modelo1.json`, ...)

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::errors::ConfigError;
use crate::params::{ParamUpdate, ParameterStore, PipelineParams};

/// Default snapshot file prefix
pub const DEFAULT_PREFIX: &str = "modelo";
/// Highest snapshot number
pub const MAX_SLOTS: u32 = 100;

/// Snapshot directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    prefix: String,
    max_slots: u32,
}

impl ConfigStore {
    /// Store writing `modeloN.json` files into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            max_slots: MAX_SLOTS,
        }
    }

    /// Use `prefix` instead of `modelo`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of snapshot number `n`
    pub fn slot_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, n))
    }

    /// First unused slot in `1..=MAX_SLOTS`
    pub fn next_slot(&self) -> Result<PathBuf, ConfigError> {
        (1..=self.max_slots)
            .map(|n| self.slot_path(n))
            .find(|p| !p.exists())
            .ok_or(ConfigError::LimitReached(self.max_slots))
    }

    /// Write `params` to the next free slot and return its path
    pub fn save(&self, params: &PipelineParams) -> Result<PathBuf, ConfigError> {
        let path = self.next_slot()?;
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        params
            .serialize(&mut ser)
            .map_err(|e| io_err(std::io::Error::from(e)))?;
        buf.push(b'\n');

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(&buf).map_err(io_err)?;

        log::info!("configuration saved to {}", path.display());
        Ok(path)
    }

    /// Lexicographically last `<prefix>*.json` file in the directory
    pub fn latest(&self) -> Result<PathBuf, ConfigError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.dir.clone()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&self.prefix) && name.ends_with(".json"))
            .max()
            .map(|name| self.dir.join(name))
            .ok_or_else(|| ConfigError::NotFound(self.dir.clone()))
    }

    /// Parse and validate a snapshot file.
    ///
    /// Every recognised key must have a valid type and value; unknown keys
    /// are ignored. Missing keys produce no update.
    pub fn read(&self, path: &Path) -> Result<Vec<ParamUpdate>, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(map) = value else {
            return Err(ConfigError::InvalidStructure {
                path: path.to_path_buf(),
                reason: "top level is not a key/value mapping".to_string(),
            });
        };

        let mut updates = Vec::new();
        for (key, value) in &map {
            if !PipelineParams::FIELDS.contains(&key.as_str()) {
                log::debug!("ignoring unknown key {:?} in {}", key, path.display());
                continue;
            }
            let update = ParamUpdate::from_named(key, value).map_err(|e| {
                let reason = format!("{} = {} rejected: {}", key, value, e);
                log::warn!("{}: {}", path.display(), reason);
                ConfigError::InvalidStructure {
                    path: path.to_path_buf(),
                    reason,
                }
            })?;
            updates.push(update);
        }
        Ok(updates)
    }

    /// Load the latest snapshot into `store`, all or nothing
    pub fn load_into(&self, store: &ParameterStore) -> Result<PathBuf, ConfigError> {
        let path = self.latest()?;
        let updates = self.read(&path)?;
        if !updates.is_empty() {
            store
                .set_all(&updates)
                .map_err(|e| ConfigError::InvalidStructure {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
        }
        log::info!(
            "configuration loaded from {} ({} value(s))",
            path.display(),
            updates.len()
        );
        Ok(path)
    }
}
