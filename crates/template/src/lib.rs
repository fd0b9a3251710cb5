//! Template handling for clibars.
//!
//! This crate wraps Handlebars as a black box templating engine:
//! - Scanning a template for its free variable names
//! - Loading template files
//! - Rendering a template against a variable mapping

pub mod document;
pub mod loader;
pub mod render;
pub mod scanner;

// Re-export main types
pub use document::TemplateDocument;
pub use loader::read_template_source;
pub use render::render;
pub use scanner::scan;
