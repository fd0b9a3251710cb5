//! Subprocess script evaluator.
//!
//! The dynamic unit is a script run as `<interpreter...> <script>`. The
//! context is written to its stdin as one JSON object and also exported as
//! environment variables. The script prints its output mapping to stdout as
//! a JSON object.

use crate::context::DynamicContext;
use crate::evaluator::DynamicEvaluator;
use clibars_core::{AppError, AppResult, VarMap};
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Runs a dynamic unit file through an interpreter.
#[derive(Debug, Clone)]
pub struct ScriptEvaluator {
    /// Path of the unit file
    script: PathBuf,

    /// Program and leading arguments; empty runs the script directly
    interpreter: Vec<String>,
}

impl ScriptEvaluator {
    /// Create an evaluator from an interpreter command line.
    ///
    /// The command line is split with shell quoting rules, so
    /// `python3 -X utf8` or `"/opt/my tools/node"` work as expected.
    ///
    /// # Example
    /// ```
    /// use clibars_dynamic::ScriptEvaluator;
    ///
    /// let evaluator = ScriptEvaluator::new("dynamic.py", "python3 -u").unwrap();
    /// assert_eq!(evaluator.interpreter(), ["python3", "-u"]);
    /// ```
    pub fn new(script: impl Into<PathBuf>, interpreter: &str) -> AppResult<Self> {
        let interpreter = shell_words::split(interpreter).map_err(|e| {
            AppError::Config(format!("Invalid interpreter {:?}: {}", interpreter, e))
        })?;
        Ok(Self {
            script: script.into(),
            interpreter,
        })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    fn command(&self, context: &DynamicContext) -> AppResult<Command> {
        let mut command = match self.interpreter.split_first() {
            Some((program, args)) => {
                let mut command = Command::new(program);
                command.args(args).arg(&self.script);
                command
            }
            None => Command::new(&self.script),
        };

        let static_vars = serde_json::to_string(context.static_vars())?;
        command
            .env("RUN_CWD", context.run_cwd())
            .env("STATIC_VARS", static_vars)
            .env("DYNAMIC_VARS", "{}");
        set_optional_env(&mut command, "TEMPLATE", context.template());
        set_optional_env(&mut command, "DESTINATION", context.destination());

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(command)
    }

    fn run(&self, context: &DynamicContext) -> AppResult<Output> {
        let payload = serde_json::to_vec(&context.payload())?;
        let mut child = self.command(context)?.spawn().map_err(|e| {
            AppError::DynamicEvaluation(format!(
                "failed to start {:?} for {:?}: {}",
                self.interpreter, self.script, e
            ))
        })?;

        let stdin = child.stdin.take();
        // Feed stdin from a separate thread so a unit that writes a lot
        // before reading cannot deadlock against us.
        let output = std::thread::scope(|scope| {
            let feeder = scope.spawn(move || match stdin {
                Some(mut stdin) => match stdin.write_all(&payload) {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                    _ => Ok(()),
                },
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            output.and_then(|output| fed.map(|_| output))
        });

        output.map_err(|e| {
            AppError::DynamicEvaluation(format!("failed to run {:?}: {}", self.script, e))
        })
    }
}

impl DynamicEvaluator for ScriptEvaluator {
    fn name(&self) -> &str {
        "script"
    }

    fn evaluate(&self, context: &DynamicContext) -> AppResult<VarMap> {
        if !self.script.is_file() {
            return Err(AppError::DynamicEvaluation(format!(
                "dynamic file {:?} not found",
                self.script
            )));
        }

        tracing::debug!("Running dynamic unit {:?} with {:?}", self.script, self.interpreter);
        let output = self.run(context)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(AppError::DynamicEvaluation(format!(
                "{:?} exited with {}: {}",
                self.script,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            tracing::debug!("Dynamic unit stderr: {}", stderr.trim());
        }

        let vars = parse_output(&output.stdout)?;
        tracing::debug!("Dynamic unit produced {} variable(s)", vars.len());
        Ok(vars)
    }
}

fn set_optional_env(command: &mut Command, key: &str, value: Option<&Path>) {
    match value {
        Some(path) => command.env(key, path),
        None => command.env_remove(key),
    };
}

/// Parse the unit's stdout. Blank output is an empty mapping.
fn parse_output(stdout: &[u8]) -> AppResult<VarMap> {
    let text = std::str::from_utf8(stdout).map_err(|e| {
        AppError::DynamicEvaluation(format!("output is not valid UTF-8: {}", e))
    })?;

    if text.trim().is_empty() {
        return Ok(VarMap::new());
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
        Ok(_) => Err(AppError::DynamicEvaluation(
            "output must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::DynamicEvaluation(format!(
            "output is not valid JSON: {}",
            e
        ))),
    }
}
