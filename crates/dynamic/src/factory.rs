//! Dynamic evaluator factory.
//!
//! Builds the evaluator configured for the current config directory.

use crate::evaluator::DynamicEvaluator;
use crate::providers::ScriptEvaluator;
use clibars_core::{AppConfig, AppResult};

/// Create the dynamic evaluator described by `config`.
///
/// The unit file is `<config_dir>/<dynamic file name>`, run with the
/// configured interpreter command line.
///
/// # Errors
/// Returns `AppError::Config` if the interpreter line cannot be split.
pub fn create_evaluator(config: &AppConfig) -> AppResult<Box<dyn DynamicEvaluator>> {
    let evaluator = ScriptEvaluator::new(config.dynamic_file(), &config.interpreter)?;
    tracing::debug!(
        "Dynamic evaluator: {:?} via {:?}",
        evaluator.script(),
        evaluator.interpreter()
    );
    Ok(Box::new(evaluator))
}
