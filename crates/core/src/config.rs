//! Configuration management for clibars.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - The config file (`<config dir>/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The config directory also holds the static store and the dynamic unit,
//! both created with placeholder contents on first use.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Name of the application directory inside the platform config dir.
pub const APP_DIR_NAME: &str = "clibars";

/// File name of the static store.
pub const STATIC_FILE_NAME: &str = "static.json";

/// Default file name of the dynamic unit.
pub const DYNAMIC_FILE_NAME: &str = "dynamic.sh";

/// File name of the optional YAML config.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default command used to run the dynamic unit.
pub const DEFAULT_INTERPRETER: &str = "sh";

/// Initial contents of the static store.
pub const STATIC_FILE_INIT: &str = "{}\n";

/// Initial contents of the dynamic unit.
pub const DYNAMIC_FILE_INIT: &str = "\
# This is the clibars dynamic variables file.
# It runs on every `clibars run` and `clibars test`.
#
# The run context is available as environment variables and, as a single
# JSON object with the same keys, on stdin:
#
# TEMPLATE: absolute path of the template, unset when reading stdin.
# DESTINATION: absolute path of the destination, unset when writing stdout.
# RUN_CWD: directory clibars was run from.
# STATIC_VARS: JSON object of the stored variable names and values.
# DYNAMIC_VARS: always {} on input.
#
# Print a JSON object on stdout; its entries become the dynamic variables
# and take precedence over the stored ones. Printing nothing adds none.
#
# Example:
# printf '{\"template_name\": \"%s\"}' \"$(basename \"${TEMPLATE:-stdin}\")\"
";

/// When to prompt for variable values during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPolicy {
    /// Prompt for every variable the template references.
    #[default]
    Always,
    /// Prompt only for variables without a static or dynamic value.
    Missing,
    /// Never prompt; fail if any variable is missing.
    Never,
}

impl PromptPolicy {
    /// All accepted spellings, in CLI order.
    pub const VARIANTS: [&'static str; 3] = ["always", "missing", "never"];
}

impl FromStr for PromptPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(PromptPolicy::Always),
            "missing" => Ok(PromptPolicy::Missing),
            "never" => Ok(PromptPolicy::Never),
            other => Err(AppError::Config(format!(
                "Unknown prompt policy: {}. Supported: {}",
                other,
                Self::VARIANTS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for PromptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptPolicy::Always => "always",
            PromptPolicy::Missing => "missing",
            PromptPolicy::Never => "never",
        };
        f.write_str(name)
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the static store, dynamic unit and config file
    pub config_dir: PathBuf,

    /// Command line used to run the dynamic unit (shell-words syntax)
    pub interpreter: String,

    /// File name of the dynamic unit inside `config_dir`
    pub dynamic_file_name: String,

    /// Default prompt policy for `run`
    pub prompt: PromptPolicy,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    dynamic: Option<DynamicSection>,
    run: Option<RunSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct DynamicSection {
    interpreter: Option<String>,
    file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RunSection {
    prompt: Option<PromptPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl AppConfig {
    /// Defaults rooted at the given config directory.
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            dynamic_file_name: DYNAMIC_FILE_NAME.to_string(),
            prompt: PromptPolicy::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }

    /// Load configuration from defaults, the config file and the environment.
    ///
    /// `config_dir` takes precedence over `CLIBARS_CONFIG_DIR`, which takes
    /// precedence over the platform default (`~/.config/clibars` on Linux).
    ///
    /// Environment variables:
    /// - `CLIBARS_CONFIG_DIR`: Override the config directory
    /// - `CLIBARS_INTERPRETER`: Command used to run the dynamic unit
    /// - `CLIBARS_PROMPT`: Default prompt policy
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load(config_dir: Option<PathBuf>) -> AppResult<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => match std::env::var_os("CLIBARS_CONFIG_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => default_config_dir()?,
            },
        };

        let mut config = Self::with_dir(config_dir);

        let config_path = config.config_file();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(interpreter) = std::env::var("CLIBARS_INTERPRETER") {
            config.interpreter = interpreter;
        }

        if let Ok(prompt) = std::env::var("CLIBARS_PROMPT") {
            config.prompt = prompt.parse()?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        let mut result = self.clone();

        if let Some(dynamic) = config_file.dynamic {
            if let Some(interpreter) = dynamic.interpreter {
                result.interpreter = interpreter;
            }
            if let Some(file) = dynamic.file {
                result.dynamic_file_name = file;
            }
        }

        if let Some(prompt) = config_file.run.and_then(|run| run.prompt) {
            result.prompt = prompt;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(mut self, log_level: Option<String>, verbose: bool, no_color: bool) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            self.log_level = Some("debug".to_string());
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path of the static store.
    pub fn static_file(&self) -> PathBuf {
        self.config_dir.join(STATIC_FILE_NAME)
    }

    /// Path of the dynamic unit.
    pub fn dynamic_file(&self) -> PathBuf {
        self.config_dir.join(&self.dynamic_file_name)
    }

    /// Path of the YAML config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Create the config directory and the placeholder files it should hold.
    ///
    /// Existing files are never touched.
    pub fn ensure_config_dir(&self) -> AppResult<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create config directory {:?}: {}",
                    self.config_dir, e
                ))
            })?;
            tracing::debug!("Created config directory {:?}", self.config_dir);
        }

        for (path, contents) in [
            (self.static_file(), STATIC_FILE_INIT),
            (self.dynamic_file(), DYNAMIC_FILE_INIT),
        ] {
            if !path.exists() {
                std::fs::write(&path, contents).map_err(|e| {
                    AppError::Config(format!("Failed to create {:?}: {}", path, e))
                })?;
                tracing::debug!("Created placeholder {:?}", path);
            }
        }

        Ok(())
    }
}

fn default_config_dir() -> AppResult<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not determine config directory".to_string()))?;
    Ok(base.join(APP_DIR_NAME))
}
