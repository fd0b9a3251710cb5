//! Remove command handler.
//!
//! Every name is attempted; failures are reported one by one and make the
//! command fail at the end.

use clap::Args;
use clibars_core::{config::AppConfig, AppError, AppResult};
use clibars_store::StaticStore;

/// Remove stored variables
#[derive(Args, Debug)]
pub struct RemoveCommand {
    /// Names to remove
    #[arg(required = true)]
    pub names: Vec<String>,
}

impl RemoveCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing remove command");

        let mut store = StaticStore::new(config.static_file());
        let mut failed = 0;

        for name in &self.names {
            match store.remove(name) {
                Ok(value) => tracing::debug!("Removed \"{}\" = {}", name, value),
                Err(e) => {
                    eprintln!("{}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(AppError::Other(format!(
                "{} of {} variable(s) could not be removed",
                failed,
                self.names.len()
            )));
        }
        Ok(())
    }
}
