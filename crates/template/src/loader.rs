//! Template loading from files.

use clibars_core::{AppError, AppResult};
use std::path::Path;

/// Read the raw text of a template file.
///
/// Scanning happens later, as the first stage of a run.
///
/// # Example
/// ```no_run
/// use clibars_template::{read_template_source, TemplateDocument};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let path = Path::new("letter.hbs");
/// let source = read_template_source(path)?;
/// let template = TemplateDocument::parse(source, Some(path.to_path_buf()))?;
/// println!("Variables: {:?}", template.variables());
/// # Ok(())
/// # }
/// ```
pub fn read_template_source(path: &Path) -> AppResult<String> {
    tracing::debug!("Loading template from: {:?}", path);

    std::fs::read_to_string(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read template {:?}: {}", path, e),
        ))
    })
}
