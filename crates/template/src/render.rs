//! Template rendering.

use clibars_core::{AppError, AppResult, VarMap};
use handlebars::Handlebars;

const TEMPLATE_NAME: &str = "template";

/// Render a Handlebars template with variables.
///
/// HTML escaping is disabled: templates produce plain text files.
pub fn render(source: &str, variables: &VarMap) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(TEMPLATE_NAME, source)
        .map_err(|e| AppError::TemplateSyntax(e.to_string()))?;

    let rendered = handlebars
        .render(TEMPLATE_NAME, variables)
        .map_err(|e| AppError::Render(e.to_string()))?;

    tracing::debug!("Rendered {} byte(s)", rendered.len());
    Ok(rendered)
}
