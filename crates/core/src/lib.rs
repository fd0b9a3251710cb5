//! clibars core library
//!
//! This crate provides the foundations shared by every clibars crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management and the config directory layout
//! - Variable name sanitizing and literal coercion

pub mod config;
pub mod error;
pub mod logging;
pub mod vars;

// Re-export commonly used types
pub use config::{AppConfig, PromptPolicy};
pub use error::{AppError, AppResult};
pub use vars::VarMap;
