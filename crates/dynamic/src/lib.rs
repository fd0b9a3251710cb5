//! Dynamic variable evaluation for clibars.
//!
//! A dynamic unit is a user-authored script in the config directory. It is
//! run once per `run` or `test` with a [`DynamicContext`] and returns a
//! mapping of variables computed at that moment.
//!
//! # Example
//! ```no_run
//! use clibars_core::AppConfig;
//! use clibars_dynamic::{create_evaluator, DynamicContext};
//!
//! # fn example() -> clibars_core::AppResult<()> {
//! let config = AppConfig::load(None)?;
//! let evaluator = create_evaluator(&config)?;
//! let context = DynamicContext::live(None, None, Default::default())?;
//! let vars = evaluator.evaluate(&context)?;
//! println!("{:?}", vars);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod evaluator;
pub mod factory;
pub mod providers;

pub use context::DynamicContext;
pub use evaluator::DynamicEvaluator;
pub use factory::create_evaluator;
pub use providers::ScriptEvaluator;
