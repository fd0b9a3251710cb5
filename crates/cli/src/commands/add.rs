//! Add command handler.

use clap::Args;
use clibars_core::vars::{parse_literal, sanitize_name};
use clibars_core::{config::AppConfig, AppError, AppResult};
use clibars_resolver::{ConsolePrompter, Prompter};
use clibars_store::StaticStore;

/// Add a variable name/value to the store
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Variable name (prompted for when omitted)
    pub name: Option<String>,

    /// Value; words are joined with spaces (prompted for when omitted)
    pub value: Vec<String>,

    /// Overwrite an existing value without asking
    #[arg(short, long)]
    pub force: bool,
}

impl AddCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing add command");
        tracing::debug!("Add command options: {:?}", self);

        let mut prompter = ConsolePrompter::console(false);

        let name = match &self.name {
            Some(name) => name.clone(),
            None => prompter.ask_text("variable_name")?,
        };
        let name = sanitize_name(&name)?;

        let value = if self.value.is_empty() {
            prompter.ask("value", None)?
        } else {
            parse_literal(&self.value.join(" "))
        };

        let mut store = StaticStore::new(config.static_file());
        match store.add(&name, value.clone(), self.force) {
            Ok(outcome) => {
                tracing::info!("\"{}\": {:?}", name, outcome);
                Ok(())
            }
            Err(AppError::DuplicateName {
                existing,
                requested,
                ..
            }) => {
                let question = format!(
                    "\"{}\" is stored as {}, overwrite with {}?",
                    name, existing, requested
                );
                if prompter.confirm(&question)? {
                    store.add(&name, value, true)?;
                } else {
                    tracing::info!("Kept stored value of \"{}\"", name);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
