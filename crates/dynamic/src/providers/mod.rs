//! Dynamic evaluator implementations.

pub mod script;

pub use script::ScriptEvaluator;
