//! Completion command handler.

use clap::{Args, ValueEnum};
use clap_complete::Shell;
use clibars_core::AppResult;

/// Shells with completion support.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
        }
    }
}

/// Print a shell completion script
#[derive(Args, Debug)]
pub struct CompletionCommand {
    /// Target shell
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

impl CompletionCommand {
    pub fn execute(&self, command: &mut clap::Command) -> AppResult<()> {
        tracing::info!("Generating {:?} completion", self.shell);

        let name = command.get_name().to_string();
        clap_complete::generate(
            Shell::from(self.shell),
            command,
            name,
            &mut std::io::stdout(),
        );
        Ok(())
    }
}
