//! Free variable scanner.
//!
//! Handlebars is used as a black box parser: the template is compiled with
//! `Template::compile` and the resulting element tree is walked to collect
//! every name that is looked up in the root context.

use clibars_core::{AppError, AppResult};
use handlebars::template::{
    BlockParam, DecoratorTemplate, HelperTemplate, Parameter, Template, TemplateElement,
};
use std::collections::{BTreeSet, HashMap};

/// Helpers registered by default in a `Handlebars` registry.
///
/// A name-only expression with one of these names is a helper call, not a
/// variable lookup.
pub const BUILTIN_HELPERS: &[&str] = &[
    "if", "unless", "each", "with", "lookup", "log", "raw", "eq", "ne", "gt", "gte", "lt", "lte",
    "and", "or", "not", "len",
];

/// Collect the free variable names of a template.
///
/// A malformed template yields `AppError::TemplateSyntax`.
///
/// # Example
/// ```
/// use clibars_template::scan;
///
/// let names = scan("{{greeting}}, {{#each people as |p|}}{{p.name}} {{/each}}").unwrap();
/// assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["greeting", "people"]);
/// ```
pub fn scan(source: &str) -> AppResult<BTreeSet<String>> {
    let template =
        Template::compile(source).map_err(|e| AppError::TemplateSyntax(e.to_string()))?;

    let mut scanner = Scanner::default();
    scanner.walk(&template, &Scope::default());

    tracing::trace!("Scanned {} free variable(s)", scanner.names.len());
    Ok(scanner.names)
}

/// Lookup context at a point of the template.
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Number of enclosing blocks that replaced the context.
    depth: usize,
    /// Block params declared by enclosing blocks.
    locals: Vec<String>,
}

impl Scope {
    fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            locals: self.locals.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Scanner {
    names: BTreeSet<String>,
}

impl Scanner {
    fn walk(&mut self, template: &Template, scope: &Scope) {
        for element in &template.elements {
            self.element(element, scope);
        }
    }

    fn element(&mut self, element: &TemplateElement, scope: &Scope) {
        match element {
            TemplateElement::Expression(ht) | TemplateElement::HtmlExpression(ht) => {
                self.expression(ht, scope)
            }
            TemplateElement::HelperBlock(ht) => self.block(ht, scope),
            TemplateElement::DecoratorExpression(dt)
            | TemplateElement::DecoratorBlock(dt)
            | TemplateElement::PartialExpression(dt)
            | TemplateElement::PartialBlock(dt) => self.decorator(dt, scope),
            _ => {}
        }
    }

    fn expression(&mut self, ht: &HelperTemplate, scope: &Scope) {
        if is_lookup(&ht.name, &ht.params, &ht.hash) {
            self.parameter(&ht.name, scope);
        } else {
            self.arguments(&ht.params, &ht.hash, scope);
        }
    }

    fn block(&mut self, ht: &HelperTemplate, scope: &Scope) {
        self.arguments(&ht.params, &ht.hash, scope);

        let changes_context = match ht.name.as_name().filter(|n| is_helper(n)) {
            Some("each") | Some("with") => true,
            Some(_) => false,
            // `{{#section}}...{{/section}}` iterates or descends into `section`
            None if ht.params.is_empty() && ht.hash.is_empty() => {
                self.parameter(&ht.name, scope);
                true
            }
            None => false,
        };

        if let Some(body) = &ht.template {
            let mut inner = if changes_context {
                scope.nested()
            } else {
                scope.clone()
            };
            if let Some(block_param) = &ht.block_param {
                inner.locals.extend(block_param_names(block_param));
            }
            self.walk(body, &inner);
        }

        if let Some(inverse) = &ht.inverse {
            self.walk(inverse, scope);
        }
    }

    fn decorator(&mut self, dt: &DecoratorTemplate, scope: &Scope) {
        self.arguments(&dt.params, &dt.hash, scope);
        if let Some(body) = &dt.template {
            self.walk(body, scope);
        }
    }

    fn arguments(&mut self, params: &[Parameter], hash: &HashMap<String, Parameter>, scope: &Scope) {
        for param in params {
            self.parameter(param, scope);
        }
        for value in hash.values() {
            self.parameter(value, scope);
        }
    }

    fn parameter(&mut self, param: &Parameter, scope: &Scope) {
        match param {
            Parameter::Subexpression(sub) => self.element(sub.as_element(), scope),
            Parameter::Literal(_) => {}
            other => {
                if let Some(name) = other.as_name().and_then(|raw| root_name(raw, scope)) {
                    self.names.insert(name);
                }
            }
        }
    }
}

fn is_helper(name: &str) -> bool {
    BUILTIN_HELPERS.contains(&name)
}

fn is_lookup(name: &Parameter, params: &[Parameter], hash: &HashMap<String, Parameter>) -> bool {
    params.is_empty() && hash.is_empty() && !name.as_name().is_some_and(is_helper)
}

fn block_param_names(block_param: &BlockParam) -> Vec<String> {
    let params = match block_param {
        BlockParam::Single(p) => vec![p],
        BlockParam::Pair((a, b)) => vec![a, b],
        _ => Vec::new(),
    };
    params
        .into_iter()
        .filter_map(|p| p.as_name())
        .map(str::to_string)
        .collect()
}

/// Resolve a raw path to the root variable it reads, if any.
fn root_name(raw: &str, scope: &Scope) -> Option<String> {
    let raw = raw.trim();

    let (rest, explicit) = if let Some(rest) = raw.strip_prefix("@root") {
        (rest.trim_start_matches(['.', '/']), true)
    } else if raw.starts_with('@') {
        // @index, @key, @first, ...
        return None;
    } else {
        let mut rest = raw;
        let mut hops = 0;
        while let Some(r) = rest.strip_prefix("../") {
            hops += 1;
            rest = r;
        }
        if hops < scope.depth {
            return None;
        }
        (rest, hops > 0)
    };

    let rest = strip_this(rest);
    let segment = rest.split(['.', '/']).next().unwrap_or_default();
    let segment = segment.trim_start_matches('[').trim_end_matches(']');

    if segment.is_empty() {
        return None;
    }
    if !explicit && scope.locals.iter().any(|local| local == segment) {
        return None;
    }
    Some(segment.to_string())
}

fn strip_this(path: &str) -> &str {
    if path == "this" || path == "." {
        return "";
    }
    for prefix in ["this.", "this/", "./"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return rest;
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        scan(source).unwrap().into_iter().collect()
    }

    #[test]
    fn test_simple_expressions() {
        assert_eq!(names("{{ aa }}\n{{bb}}\n{{{cc}}}"), vec!["aa", "bb", "cc"]);
    }

    #[test]
    fn test_empty_template() {
        assert!(scan("").unwrap().is_empty());
        assert!(scan("plain text only").unwrap().is_empty());
    }

    #[test]
    fn test_dotted_paths_use_first_segment() {
        assert_eq!(names("{{user.name}} {{user/email}} {{this.site}}"), vec!["site", "user"]);
    }

    #[test]
    fn test_helpers_are_not_variables() {
        let source = "{{#if var2}}something{{else}}{{other}}{{/if}}{{#unless flag}}x{{/unless}}";
        assert_eq!(names(source), vec!["flag", "other", "var2"]);
    }

    #[test]
    fn test_each_body_is_not_root() {
        let source = "{{var1}}{{#each var3}}{{this}} {{name}} {{@index}}{{/each}}";
        assert_eq!(names(source), vec!["var1", "var3"]);
    }

    #[test]
    fn test_block_params_are_declared() {
        let source = "{{#each var3 as |f|}}{{f}}{{f.size}}{{/each}}";
        assert_eq!(names(source), vec!["var3"]);
    }

    #[test]
    fn test_block_param_pairs_are_declared() {
        let source = "{{#each table as |value key|}}{{key}}={{value}} {{sep}}{{/each}}";
        assert_eq!(names(source), vec!["table"]);
    }

    #[test]
    fn test_parent_and_root_references() {
        let source = "{{#each items}}{{../title}}{{@root.footer}}{{label}}{{/each}}";
        assert_eq!(names(source), vec!["footer", "items", "title"]);
    }

    #[test]
    fn test_helper_params_and_subexpressions() {
        let source = "{{#if (eq kind \"a\")}}{{lookup table key}}{{/if}}";
        assert_eq!(names(source), vec!["key", "kind", "table"]);
    }

    #[test]
    fn test_literals_ignored() {
        assert_eq!(names("{{#if true}}{{x}}{{/if}}"), vec!["x"]);
    }

    #[test]
    fn test_syntax_error_propagates() {
        match scan("{{#if x}}body{{/each}}") {
            Err(AppError::TemplateSyntax(_)) => {}
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(matches!(scan("<p>{{abc</p>"), Err(AppError::TemplateSyntax(_))));
    }
}
