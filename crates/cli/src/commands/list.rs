//! List command handler.

use clap::Args;
use clibars_core::{config::AppConfig, vars::display_value, AppResult};
use clibars_store::StaticStore;

/// List stored variable names and values
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Only list names matching this regex
    pub pattern: Option<String>,
}

impl ListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing list command");

        let mut store = StaticStore::new(config.static_file());
        for (name, value) in store.list(self.pattern.as_deref())? {
            println!("{}: {}", name, display_value(&value));
        }

        Ok(())
    }
}
