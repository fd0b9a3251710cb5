//! Dynamic evaluation context.
//!
//! The context is what a dynamic unit gets to see: the template and
//! destination paths (absolute, or none for standard streams), the working
//! directory of the run, and a copy of the static variables. It is built
//! fresh for every run and never persisted.

use clibars_core::{AppResult, VarMap};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Inputs handed to a dynamic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicContext {
    template: Option<PathBuf>,
    destination: Option<PathBuf>,
    run_cwd: PathBuf,
    static_vars: VarMap,
}

/// Wire form of the context, one key per binding.
#[derive(Debug, Serialize)]
pub struct ContextPayload<'a> {
    #[serde(rename = "TEMPLATE")]
    pub template: Option<&'a Path>,
    #[serde(rename = "DESTINATION")]
    pub destination: Option<&'a Path>,
    #[serde(rename = "RUN_CWD")]
    pub run_cwd: &'a Path,
    #[serde(rename = "STATIC_VARS")]
    pub static_vars: &'a VarMap,
    #[serde(rename = "DYNAMIC_VARS")]
    pub dynamic_vars: VarMap,
}

impl DynamicContext {
    /// Build a context, resolving every path to absolute form.
    ///
    /// `None` stands for a standard stream (stdin template, stdout
    /// destination).
    pub fn new(
        template: Option<&Path>,
        destination: Option<&Path>,
        run_cwd: &Path,
        static_vars: VarMap,
    ) -> AppResult<Self> {
        Ok(Self {
            template: template.map(resolve_path).transpose()?,
            destination: destination.map(resolve_path).transpose()?,
            run_cwd: resolve_path(run_cwd)?,
            static_vars,
        })
    }

    /// Build a context for a live run from the process working directory.
    pub fn live(
        template: Option<&Path>,
        destination: Option<&Path>,
        static_vars: VarMap,
    ) -> AppResult<Self> {
        let run_cwd = std::env::current_dir()?;
        Self::new(template, destination, &run_cwd, static_vars)
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn run_cwd(&self) -> &Path {
        &self.run_cwd
    }

    pub fn static_vars(&self) -> &VarMap {
        &self.static_vars
    }

    /// Serializable bindings, with an empty `DYNAMIC_VARS`.
    pub fn payload(&self) -> ContextPayload<'_> {
        ContextPayload {
            template: self.template(),
            destination: self.destination(),
            run_cwd: self.run_cwd(),
            static_vars: &self.static_vars,
            dynamic_vars: VarMap::new(),
        }
    }
}

/// Make `path` absolute.
///
/// Existing paths are canonicalized. For paths that do not exist, the
/// longest existing ancestor is canonicalized and the rest is appended with
/// `.` and `..` removed lexically.
pub fn resolve_path(path: &Path) -> AppResult<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let normalized = normalize(&absolute);

    for ancestor in normalized.ancestors().skip(1) {
        if let Ok(canonical) = ancestor.canonicalize() {
            if let Ok(rest) = normalized.strip_prefix(ancestor) {
                return Ok(canonical.join(rest));
            }
        }
    }

    Ok(normalized)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
