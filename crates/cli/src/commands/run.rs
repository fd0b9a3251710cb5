//! Run command handler.
//!
//! Resolves the variables of a template and renders it.

use clap::Args;
use clibars_core::{config::AppConfig, AppError, AppResult, PromptPolicy};
use clibars_dynamic::create_evaluator;
use clibars_resolver::{ConsolePrompter, Resolver, RunRequest};
use clibars_store::StaticStore;
use clibars_template::read_template_source;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::stream_path;

/// Render a template, resolving its variables
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Template file (default: stdin)
    pub template: Option<PathBuf>,

    /// Destination file (default: stdout)
    pub destination: Option<PathBuf>,

    /// When to prompt for variable values
    #[arg(long, value_parser = PromptPolicy::VARIANTS)]
    pub prompt: Option<String>,

    /// Resolve and print to stdout without writing the destination or the store
    #[arg(long)]
    pub dry_run: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing run command");
        tracing::debug!("Run command options: {:?}", self);

        let policy = match &self.prompt {
            Some(prompt) => prompt.parse()?,
            None => config.prompt,
        };

        let template_path = stream_path(self.template.as_ref()).map(Path::to_path_buf);
        let destination = stream_path(self.destination.as_ref()).map(Path::to_path_buf);

        let source = match &template_path {
            Some(path) => read_template_source(path)?,
            None => {
                tracing::debug!("Reading template from stdin");
                std::io::read_to_string(std::io::stdin())?
            }
        };

        let request = RunRequest::new(source)
            .with_template_path(template_path.clone())
            .with_destination(destination.clone())
            .with_policy(policy)
            .with_dry_run(self.dry_run);

        let mut store = StaticStore::new(config.static_file());
        let evaluator = create_evaluator(config)?;
        let mut prompter = ConsolePrompter::console(template_path.is_none());

        let outcome =
            Resolver::new(&mut store, evaluator.as_ref(), &mut prompter).run(&request)?;

        tracing::debug!(
            "Prompted {:?}, persisted {:?}",
            outcome.resolution.prompted,
            outcome.resolution.persisted
        );

        match destination {
            Some(path) if !self.dry_run => {
                std::fs::write(&path, &outcome.rendered).map_err(|e| {
                    AppError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to write {:?}: {}", path, e),
                    ))
                })?;
                tracing::info!("Wrote {:?}", path);
            }
            _ => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(outcome.rendered.as_bytes())?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}
