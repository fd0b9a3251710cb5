//! The variable resolution pipeline.
//!
//! A run is a single linear pass:
//! `Scanning → Loading → Evaluating → Reconciling → Rendering → Done`.
//! Any failure moves the run to `Failed` and aborts it. Values persisted
//! while reconciling stay persisted; there is no rollback.

use clibars_core::{AppError, AppResult, PromptPolicy, VarMap};
use clibars_dynamic::{DynamicContext, DynamicEvaluator};
use clibars_store::{AddOutcome, StaticStore};
use clibars_template::TemplateDocument;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::prompter::Prompter;

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Scanning,
    Loading,
    Evaluating,
    Reconciling,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Scanning => "scanning",
            RunStage::Loading => "loading",
            RunStage::Evaluating => "evaluating",
            RunStage::Reconciling => "reconciling",
            RunStage::Rendering => "rendering",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs of a single run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Raw template text
    pub source: String,

    /// Template file, `None` when read from stdin
    pub template_path: Option<PathBuf>,

    /// Destination file, `None` for stdout
    pub destination: Option<PathBuf>,

    /// Working directory exposed to the dynamic unit; process cwd if unset
    pub run_cwd: Option<PathBuf>,

    /// Prompt policy
    pub policy: PromptPolicy,

    /// Resolve without persisting anything
    pub dry_run: bool,
}

impl RunRequest {
    /// Request with the default policy and no paths.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            template_path: None,
            destination: None,
            run_cwd: None,
            policy: PromptPolicy::default(),
            dry_run: false,
        }
    }

    /// Set the template path.
    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        self.template_path = path;
        self
    }

    /// Set the destination path.
    pub fn with_destination(mut self, path: Option<PathBuf>) -> Self {
        self.destination = path;
        self
    }

    /// Set the working directory seen by the dynamic unit.
    pub fn with_run_cwd(mut self, run_cwd: impl Into<PathBuf>) -> Self {
        self.run_cwd = Some(run_cwd.into());
        self
    }

    /// Set the prompt policy.
    pub fn with_policy(mut self, policy: PromptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable or disable dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Everything the pipeline learned while resolving.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Free variables of the template
    pub required: BTreeSet<String>,

    /// Store snapshot at load time
    pub static_vars: VarMap,

    /// Output of the dynamic unit
    pub dynamic_vars: VarMap,

    /// Required names with neither a static nor a dynamic value
    pub missing: BTreeSet<String>,

    /// Names prompted for, in prompt order
    pub prompted: Vec<String>,

    /// Names written to the store
    pub persisted: Vec<String>,

    /// Final mapping used to render
    pub variables: VarMap,
}

/// A completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub resolution: Resolution,
    pub rendered: String,
}

/// Orchestrates the store, the dynamic evaluator and the prompter.
pub struct Resolver<'a> {
    store: &'a mut StaticStore,
    evaluator: &'a dyn DynamicEvaluator,
    prompter: &'a mut dyn Prompter,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a mut StaticStore,
        evaluator: &'a dyn DynamicEvaluator,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            store,
            evaluator,
            prompter,
        }
    }

    /// Resolve the variables of a template and render it.
    pub fn run(&mut self, request: &RunRequest) -> AppResult<RunOutcome> {
        let mut stage = RunStage::Scanning;
        let result = self.run_stages(request, &mut stage);

        match &result {
            Ok(_) => advance(&mut stage, RunStage::Done),
            Err(e) => {
                tracing::debug!(stage = %stage, "Run failed: {}", e);
                advance(&mut stage, RunStage::Failed);
            }
        }
        result
    }

    fn run_stages(&mut self, request: &RunRequest, stage: &mut RunStage) -> AppResult<RunOutcome> {
        tracing::debug!(stage = %stage, "Scanning template");
        let template = TemplateDocument::parse(request.source.clone(), request.template_path.clone())?;

        let resolution = self.resolve_stages(&template, request, stage)?;

        advance(stage, RunStage::Rendering);
        let rendered = template.render(&resolution.variables)?;

        Ok(RunOutcome {
            resolution,
            rendered,
        })
    }

    fn resolve_stages(
        &mut self,
        template: &TemplateDocument,
        request: &RunRequest,
        stage: &mut RunStage,
    ) -> AppResult<Resolution> {
        let required = template.variables().clone();
        tracing::debug!("Template requires {:?}", required);

        advance(stage, RunStage::Loading);
        let static_vars = self.store.snapshot()?;

        advance(stage, RunStage::Evaluating);
        let context = match &request.run_cwd {
            Some(run_cwd) => DynamicContext::new(
                template.path(),
                request.destination.as_deref(),
                run_cwd,
                static_vars.clone(),
            )?,
            None => DynamicContext::live(
                template.path(),
                request.destination.as_deref(),
                static_vars.clone(),
            )?,
        };
        tracing::debug!("Evaluating dynamic variables with {}", self.evaluator.name());
        let dynamic_vars = self.evaluator.evaluate(&context)?;

        advance(stage, RunStage::Reconciling);
        let mut variables = merge(&static_vars, &dynamic_vars);
        let missing = missing_names(&required, &static_vars, &dynamic_vars);

        let mut resolution = Resolution {
            required,
            static_vars,
            dynamic_vars,
            missing,
            ..Default::default()
        };

        let to_prompt: Vec<String> = match request.policy {
            PromptPolicy::Always => resolution.required.iter().cloned().collect(),
            PromptPolicy::Missing => resolution.missing.iter().cloned().collect(),
            PromptPolicy::Never => {
                if !resolution.missing.is_empty() {
                    return Err(AppError::missing(resolution.missing.iter().cloned()));
                }
                Vec::new()
            }
        };

        for name in to_prompt {
            let value = self.prompter.ask(&name, variables.get(&name))?;

            if resolution.dynamic_vars.contains_key(&name) {
                tracing::debug!("\"{}\" is dynamic, not persisting", name);
            } else if request.dry_run {
                tracing::debug!("Dry run, not persisting \"{}\"", name);
            } else if self.persist(&name, &value)? {
                resolution.persisted.push(name.clone());
            }

            variables.insert(name.clone(), value);
            resolution.prompted.push(name);
        }

        resolution.variables = variables;
        Ok(resolution)
    }

    /// Write a prompted value to the store. Returns true if the store changed.
    fn persist(&mut self, name: &str, value: &Value) -> AppResult<bool> {
        match self.store.add(name, value.clone(), false) {
            Ok(AddOutcome::Unchanged) => Ok(false),
            Ok(_) => Ok(true),
            Err(AppError::DuplicateName {
                name,
                existing,
                requested,
            }) => {
                let question = format!(
                    "Overwrite stored \"{}\" ({}) with {}?",
                    name, existing, requested
                );
                if self.prompter.confirm(&question)? {
                    self.store.add(&name, value.clone(), true)?;
                    Ok(true)
                } else {
                    tracing::info!("Keeping stored value of \"{}\"", name);
                    Ok(false)
                }
            }
            Err(AppError::InvalidName(name)) => {
                tracing::warn!("\"{}\" is not a valid variable name, not persisting it", name);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn advance(stage: &mut RunStage, next: RunStage) {
    tracing::debug!(from = %stage, to = %next, "Run stage");
    *stage = next;
}

/// Static values overridden by dynamic ones.
pub fn merge(static_vars: &VarMap, dynamic_vars: &VarMap) -> VarMap {
    let mut merged = static_vars.clone();
    merged.extend(dynamic_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Required names with neither a static nor a dynamic value.
pub fn missing_names(
    required: &BTreeSet<String>,
    static_vars: &VarMap,
    dynamic_vars: &VarMap,
) -> BTreeSet<String> {
    required
        .iter()
        .filter(|name| !static_vars.contains_key(*name) && !dynamic_vars.contains_key(*name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompter::LinePrompter;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Evaluator returning a fixed mapping and recording its context.
    struct FixedEvaluator {
        output: VarMap,
        seen: RefCell<Option<DynamicContext>>,
    }

    impl FixedEvaluator {
        fn new(output: Value) -> Self {
            let output = match output {
                Value::Object(map) => map.into_iter().collect(),
                _ => VarMap::new(),
            };
            Self {
                output,
                seen: RefCell::new(None),
            }
        }
    }

    impl DynamicEvaluator for FixedEvaluator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, context: &DynamicContext) -> AppResult<VarMap> {
            *self.seen.borrow_mut() = Some(context.clone());
            Ok(self.output.clone())
        }
    }

    struct FailingEvaluator;

    impl DynamicEvaluator for FailingEvaluator {
        fn name(&self) -> &str {
            "failing"
        }

        fn evaluate(&self, _context: &DynamicContext) -> AppResult<VarMap> {
            Err(AppError::DynamicEvaluation("KeyError: 'name'".to_string()))
        }
    }

    type TestPrompter = LinePrompter<Cursor<Vec<u8>>, Vec<u8>>;

    fn prompter(input: &str) -> TestPrompter {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    struct Fixture {
        temp: TempDir,
        store: StaticStore,
    }

    impl Fixture {
        fn new(stored: &str) -> Self {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("static.json");
            fs::write(&path, stored).unwrap();
            Self {
                store: StaticStore::new(path),
                temp,
            }
        }

        fn request(&self, source: &str, policy: PromptPolicy) -> RunRequest {
            RunRequest::new(source)
                .with_policy(policy)
                .with_run_cwd(self.temp.path())
        }

        fn on_disk(&self) -> Value {
            serde_json::from_str(&fs::read_to_string(self.store.path()).unwrap()).unwrap()
        }

        fn run(
            &mut self,
            evaluator: &dyn DynamicEvaluator,
            prompter: &mut TestPrompter,
            request: &RunRequest,
        ) -> AppResult<RunOutcome> {
            Resolver::new(&mut self.store, evaluator, prompter).run(request)
        }
    }

    #[test]
    fn test_dynamic_overrides_static() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({"a": 2, "b": 3}));
        let request = fixture.request("{{a}} {{b}}", PromptPolicy::Never);

        let outcome = fixture.run(&evaluator, &mut prompter(""), &request).unwrap();

        assert_eq!(outcome.rendered, "2 3");
        assert_eq!(outcome.resolution.variables["a"], json!(2));
        assert_eq!(outcome.resolution.variables["b"], json!(3));
        assert!(outcome.resolution.prompted.is_empty());
    }

    #[test]
    fn test_never_mode_reports_missing() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({"b": 2}));
        let request = fixture.request("{{a}}{{b}}{{c}}{{d}}", PromptPolicy::Never);

        match fixture.run(&evaluator, &mut prompter(""), &request) {
            Err(AppError::MissingVariables(names)) => assert_eq!(names, vec!["c", "d"]),
            other => panic!("expected missing variables, got {other:?}"),
        }
        assert_eq!(fixture.on_disk(), json!({"a": 1}));
    }

    #[test]
    fn test_missing_mode_prompts_only_missing() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({"b": 2}));
        let request = fixture.request("{{a}}{{b}}{{c}}", PromptPolicy::Missing);
        let mut input = prompter("3\n");

        let outcome = fixture.run(&evaluator, &mut input, &request).unwrap();

        assert_eq!(outcome.rendered, "123");
        assert_eq!(outcome.resolution.missing.iter().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(outcome.resolution.prompted, vec!["c"]);
        assert_eq!(outcome.resolution.persisted, vec!["c"]);
        assert_eq!(fixture.on_disk(), json!({"a": 1, "c": 3}));
        assert_eq!(String::from_utf8(input.into_output()).unwrap(), "c: ");
    }

    #[test]
    fn test_missing_mode_without_missing_skips_prompting() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("{{a}}", PromptPolicy::Missing);
        let mut input = prompter("");

        let outcome = fixture.run(&evaluator, &mut input, &request).unwrap();
        assert_eq!(outcome.rendered, "1");
        assert!(input.into_output().is_empty());
    }

    #[test]
    fn test_always_mode_offers_defaults() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({"b": 2}));
        let request = fixture.request("{{a}}{{b}}{{c}}", PromptPolicy::Always);
        let mut input = prompter("\n\nz\n");

        let outcome = fixture.run(&evaluator, &mut input, &request).unwrap();

        assert_eq!(outcome.rendered, "12z");
        assert_eq!(outcome.resolution.prompted, vec!["a", "b", "c"]);
        assert_eq!(outcome.resolution.persisted, vec!["c"]);
        assert_eq!(fixture.on_disk(), json!({"a": 1, "c": "z"}));
        assert_eq!(
            String::from_utf8(input.into_output()).unwrap(),
            "a [1]: b [2]: c: "
        );
    }

    #[test]
    fn test_dynamic_values_are_not_persisted() {
        let mut fixture = Fixture::new("{}");
        let evaluator = FixedEvaluator::new(json!({"today": "monday"}));
        let request = fixture.request("{{today}}", PromptPolicy::Always);

        let outcome = fixture
            .run(&evaluator, &mut prompter("friday\n"), &request)
            .unwrap();

        assert_eq!(outcome.rendered, "friday");
        assert!(outcome.resolution.persisted.is_empty());
        assert_eq!(fixture.on_disk(), json!({}));
    }

    #[test]
    fn test_overwrite_confirmed() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("{{a}}", PromptPolicy::Always);

        let outcome = fixture
            .run(&evaluator, &mut prompter("5\ny\n"), &request)
            .unwrap();

        assert_eq!(outcome.rendered, "5");
        assert_eq!(outcome.resolution.persisted, vec!["a"]);
        assert_eq!(fixture.on_disk(), json!({"a": 5}));
    }

    #[test]
    fn test_overwrite_declined_still_renders_new_value() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("{{a}}", PromptPolicy::Always);

        let outcome = fixture
            .run(&evaluator, &mut prompter("5\nn\n"), &request)
            .unwrap();

        assert_eq!(outcome.rendered, "5");
        assert!(outcome.resolution.persisted.is_empty());
        assert_eq!(fixture.on_disk(), json!({"a": 1}));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut fixture = Fixture::new("{}");
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture
            .request("Hi {{name}}", PromptPolicy::Missing)
            .with_dry_run(true);

        let outcome = fixture
            .run(&evaluator, &mut prompter("Jane\n"), &request)
            .unwrap();

        assert_eq!(outcome.rendered, "Hi Jane");
        assert!(outcome.resolution.persisted.is_empty());
        assert_eq!(fixture.on_disk(), json!({}));
    }

    #[test]
    fn test_evaluator_sees_snapshot_and_context() {
        let mut fixture = Fixture::new(r#"{"aa": 1}"#);
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("{{aa}}", PromptPolicy::Never);

        fixture.run(&evaluator, &mut prompter(""), &request).unwrap();

        let seen = evaluator.seen.borrow();
        let context = seen.as_ref().unwrap();
        assert_eq!(context.template(), None);
        assert_eq!(context.destination(), None);
        assert_eq!(context.run_cwd(), fixture.temp.path().canonicalize().unwrap());
        assert_eq!(context.static_vars()["aa"], json!(1));
    }

    #[test]
    fn test_dynamic_failure_aborts() {
        let mut fixture = Fixture::new(r#"{"a": 1}"#);
        let request = fixture.request("{{a}}{{b}}", PromptPolicy::Missing);
        let mut input = prompter("2\n");

        let result = fixture.run(&FailingEvaluator, &mut input, &request);

        assert!(matches!(result, Err(AppError::DynamicEvaluation(_))));
        assert!(input.into_output().is_empty());
        assert_eq!(fixture.on_disk(), json!({"a": 1}));
    }

    #[test]
    fn test_bad_template_fails_before_loading() {
        let temp = TempDir::new().unwrap();
        let mut store = StaticStore::new(temp.path().join("static.json"));
        let evaluator = FixedEvaluator::new(json!({}));
        let mut input = prompter("");
        let request = RunRequest::new("{{#if x}}{{/each}}");

        let result = Resolver::new(&mut store, &evaluator, &mut input).run(&request);

        assert!(matches!(result, Err(AppError::TemplateSyntax(_))));
        assert!(evaluator.seen.borrow().is_none());
        assert!(!temp.path().join("static.json").exists());
    }

    #[test]
    fn test_corrupt_store_fails() {
        let mut fixture = Fixture::new("[1, 2]");
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("{{a}}", PromptPolicy::Never);

        let result = fixture.run(&evaluator, &mut prompter(""), &request);
        assert!(matches!(result, Err(AppError::StoreCorrupt { .. })));
        assert!(evaluator.seen.borrow().is_none());
    }

    #[test]
    fn test_non_identifier_names_are_used_but_not_persisted() {
        let mut fixture = Fixture::new("{}");
        let evaluator = FixedEvaluator::new(json!({}));
        let request = fixture.request("Hi {{first-name}}", PromptPolicy::Missing);

        let outcome = fixture
            .run(&evaluator, &mut prompter("Jane\n"), &request)
            .unwrap();

        assert_eq!(outcome.rendered, "Hi Jane");
        assert_eq!(outcome.resolution.prompted, vec!["first-name"]);
        assert!(outcome.resolution.persisted.is_empty());
        assert_eq!(fixture.on_disk(), json!({}));
    }

    #[test]
    fn test_template_path_reaches_evaluator() {
        let mut fixture = Fixture::new(r#"{"a": [1, 2]}"#);
        let template = fixture.temp.path().join("letter");
        fs::write(&template, "{{a}}").unwrap();
        let evaluator = FixedEvaluator::new(json!({"b": true}));
        let request = fixture
            .request("{{a}}{{b}}", PromptPolicy::Never)
            .with_template_path(Some(template.clone()));

        let outcome = fixture.run(&evaluator, &mut prompter(""), &request).unwrap();

        assert_eq!(outcome.resolution.required.len(), 2);
        assert!(outcome.resolution.missing.is_empty());
        let seen = evaluator.seen.borrow();
        assert_eq!(
            seen.as_ref().unwrap().template(),
            Some(template.canonicalize().unwrap().as_path())
        );
    }

    #[test]
    fn test_missing_names_uses_union() {
        let required: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let static_vars: VarMap = [("a".to_string(), json!(1))].into_iter().collect();
        let dynamic_vars: VarMap = [("b".to_string(), json!(2))].into_iter().collect();

        let missing = missing_names(&required, &static_vars, &dynamic_vars);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["c"]);

        let merged = merge(&static_vars, &dynamic_vars);
        assert_eq!(merged.len(), 2);
    }
}
