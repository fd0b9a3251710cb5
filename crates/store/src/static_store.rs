//! The static variable store.
//!
//! A single JSON object on disk mapping sanitized variable names to values.
//! The file is parsed once on first access and cached; every mutation
//! rewrites the whole file atomically.
//!
//! There is no locking: concurrent processes writing the same store follow
//! last-writer-wins.

use clibars_core::vars::sanitize_name;
use clibars_core::{AppError, AppResult, VarMap};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::atomic::atomic_write;

/// Result of a successful `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The name was not stored before.
    Inserted,
    /// The name was stored with a different value and was overwritten.
    Updated,
    /// The name was already stored with the same value; nothing was written.
    Unchanged,
}

/// Persisted name/value store backed by a JSON file.
#[derive(Debug)]
pub struct StaticStore {
    path: PathBuf,
    stored: Option<VarMap>,
}

impl StaticStore {
    /// Create a store backed by `path`. Nothing is read until first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stored: None,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored variables, read from disk on first call.
    ///
    /// A missing file is created as `{}`. A file that is not a JSON object
    /// yields `AppError::StoreCorrupt`.
    pub fn load(&mut self) -> AppResult<&VarMap> {
        Ok(&*self.ensure_loaded()?)
    }

    /// Owned copy of the stored variables.
    pub fn snapshot(&mut self) -> AppResult<VarMap> {
        Ok(self.load()?.clone())
    }

    /// Stored entries, sorted by name.
    ///
    /// With a pattern, only names containing a regex match are returned.
    pub fn list(&mut self, pattern: Option<&str>) -> AppResult<Vec<(String, Value)>> {
        let regex = pattern
            .map(Regex::new)
            .transpose()
            .map_err(|e| AppError::Other(format!("Invalid pattern: {}", e)))?;

        let entries = self
            .load()?
            .iter()
            .filter(|(name, _)| regex.as_ref().map_or(true, |re| re.is_match(name)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(entries)
    }

    /// Store `value` under `name`.
    ///
    /// Fails with `InvalidName` if `name` is not an identifier, and with
    /// `DuplicateName` if it is stored with a different value and `force` is
    /// false. Storing an identical value is a no-op.
    pub fn add(&mut self, name: &str, value: Value, force: bool) -> AppResult<AddOutcome> {
        let name = sanitize_name(name)?;
        let stored = self.ensure_loaded()?;

        let outcome = match stored.get(&name) {
            Some(existing) if *existing == value => {
                tracing::debug!("\"{}\" already stored with the same value", name);
                return Ok(AddOutcome::Unchanged);
            }
            Some(existing) if !force => {
                return Err(AppError::DuplicateName {
                    name,
                    existing: existing.to_string(),
                    requested: value.to_string(),
                });
            }
            Some(_) => AddOutcome::Updated,
            None => AddOutcome::Inserted,
        };

        let mut updated = stored.clone();
        updated.insert(name.clone(), value);
        self.commit(updated)?;

        tracing::info!("Stored \"{}\" ({:?})", name, outcome);
        Ok(outcome)
    }

    /// Remove `name` and return its value.
    ///
    /// Fails with `NotFound` if it is not stored; the file is left untouched.
    pub fn remove(&mut self, name: &str) -> AppResult<Value> {
        let name = sanitize_name(name)?;
        let stored = self.ensure_loaded()?;

        if !stored.contains_key(&name) {
            return Err(AppError::NotFound(name));
        }

        let mut updated = stored.clone();
        let removed = updated.remove(&name).unwrap_or(Value::Null);
        self.commit(updated)?;

        tracing::info!("Removed \"{}\"", name);
        Ok(removed)
    }

    fn ensure_loaded(&mut self) -> AppResult<&mut VarMap> {
        if self.stored.is_none() {
            self.stored = Some(read_store(&self.path)?);
        }
        Ok(self.stored.get_or_insert_with(VarMap::new))
    }

    /// Write `updated` to disk, then make it the cached state.
    fn commit(&mut self, updated: VarMap) -> AppResult<()> {
        write_store(&self.path, &updated)?;
        self.stored = Some(updated);
        Ok(())
    }
}

fn read_store(path: &Path) -> AppResult<VarMap> {
    if !path.exists() {
        tracing::debug!("Creating empty static store at {:?}", path);
        let empty = VarMap::new();
        write_store(path, &empty)?;
        return Ok(empty);
    }

    let contents = std::fs::read_to_string(path)?;
    let corrupt = |reason: String| AppError::StoreCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => {
            tracing::debug!("Loaded {} stored variable(s) from {:?}", map.len(), path);
            Ok(map.into_iter().collect())
        }
        Ok(other) => Err(corrupt(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(corrupt(e.to_string())),
    }
}

fn write_store(path: &Path, vars: &VarMap) -> AppResult<()> {
    let mut contents = serde_json::to_string_pretty(vars)?;
    contents.push('\n');
    atomic_write(path, contents.as_bytes())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
