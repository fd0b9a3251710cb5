//! Scanned template documents.

use clibars_core::{AppResult, VarMap};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::render::render;
use crate::scanner::scan;

/// A template and its free variable names.
///
/// Immutable once scanned; created for a single run.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    source: String,
    path: Option<PathBuf>,
    variables: BTreeSet<String>,
}

impl TemplateDocument {
    /// Scan `source`. `path` is where it was read from, `None` for stdin.
    pub fn parse(source: impl Into<String>, path: Option<PathBuf>) -> AppResult<Self> {
        let source = source.into();
        let variables = scan(&source)?;
        tracing::debug!(
            "Template {:?} references {} variable(s)",
            path,
            variables.len()
        );
        Ok(Self {
            source,
            path,
            variables,
        })
    }

    /// File the template was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Free variable names, sorted.
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// Render against a variable mapping.
    pub fn render(&self, variables: &VarMap) -> AppResult<String> {
        render(&self.source, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clibars_core::AppError;
    use serde_json::json;

    #[test]
    fn test_parse_and_render() {
        let doc = TemplateDocument::parse("{{a}}-{{b}}", Some(PathBuf::from("/tmp/t"))).unwrap();
        assert_eq!(doc.path(), Some(Path::new("/tmp/t")));
        assert_eq!(
            doc.variables().iter().cloned().collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let mut vars = VarMap::new();
        vars.insert("a".to_string(), json!(1));
        vars.insert("b".to_string(), json!("two"));
        assert_eq!(doc.render(&vars).unwrap(), "1-two");
    }

    #[test]
    fn test_parse_rejects_bad_syntax() {
        assert!(matches!(
            TemplateDocument::parse("{{#with x}}{{/if}}", None),
            Err(AppError::TemplateSyntax(_))
        ));
    }
}
