//! Variable resolution for clibars.
//!
//! The [`Resolver`] ties the pieces together: it scans a template, loads
//! the static store, runs the dynamic unit, reconciles the sources under a
//! [`PromptPolicy`](clibars_core::PromptPolicy), persists newly supplied
//! values and renders the result.
//!
//! Precedence, lowest first: static store, dynamic output, prompted values.

pub mod pipeline;
pub mod prompter;

pub use pipeline::{merge, missing_names, Resolution, Resolver, RunOutcome, RunRequest, RunStage};
pub use prompter::{ConsolePrompter, LinePrompter, Prompter};
