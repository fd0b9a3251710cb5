//! Dynamic evaluator abstraction.

use crate::context::DynamicContext;
use clibars_core::{AppResult, VarMap};

/// Trait for dynamic variable sources.
///
/// An evaluator runs a user-authored unit against a [`DynamicContext`] and
/// returns the mapping the unit produced. Every call is independent: no
/// state is carried from one run to the next, and a failed run returns no
/// partial output.
pub trait DynamicEvaluator {
    /// Short description of the evaluator, for logs.
    fn name(&self) -> &str;

    /// Run the unit and return its output mapping.
    ///
    /// Any fault of the unit yields `AppError::DynamicEvaluation`.
    fn evaluate(&self, context: &DynamicContext) -> AppResult<VarMap>;
}
