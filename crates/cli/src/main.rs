//! clibars CLI
//!
//! Main entry point for the clibars command-line tool.
//! Renders Handlebars templates with variables taken from a persistent
//! store, a user-defined dynamic script and interactive prompts.

mod commands;

use clap::error::ErrorKind;
use clap::{Arg, CommandFactory, Parser, Subcommand};
use clibars_core::error::EXIT_SUCCESS;
use clibars_core::{config::AppConfig, logging, AppResult};
use commands::{
    AddCommand, CompletionCommand, ListCommand, RemoveCommand, RunCommand, TestCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

/// clibars - fill in Handlebars templates from stored, computed and prompted variables
#[derive(Parser, Debug)]
#[command(name = "clibars")]
#[command(about = "Fill in Handlebars templates from stored, computed and prompted variables", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding static.json, the dynamic script and config.yaml
    #[arg(long, global = true, env = "CLIBARS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template, resolving its variables
    Run(RunCommand),

    /// List stored variable names and values
    List(ListCommand),

    /// Remove stored variables
    Remove(RemoveCommand),

    /// Add a variable name/value to the store
    Add(AddCommand),

    /// Run the dynamic script with mock inputs and print its variables
    Test(TestCommand),

    /// Print a shell completion script
    Completion(CompletionCommand),
}

fn main() -> ExitCode {
    // Parse command-line arguments first (needed for logging config)
    let args = expand_command_alias(std::env::args_os().collect()).unwrap_or_else(|e| e.exit());
    let cli = Cli::parse_from(args);

    match execute(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Expand an abbreviated subcommand name.
///
/// A name that is not a subcommand selects the subcommands containing its
/// characters in order, so `rm` runs `remove` and `ls` runs `list`. More
/// than one match is a usage error; no match is left for clap to reject.
fn expand_command_alias(mut args: Vec<OsString>) -> Result<Vec<OsString>, clap::Error> {
    let mut command = Cli::command();
    command.build();

    let Some(position) = command_position(&command, &args) else {
        return Ok(args);
    };
    let Some(name) = args[position].to_str().map(str::to_string) else {
        return Ok(args);
    };

    let exact = command
        .get_subcommands()
        .any(|sub| sub.get_name() == name || sub.get_all_aliases().any(|alias| alias == name));
    if exact {
        return Ok(args);
    }

    let mut matches: Vec<String> = command
        .get_subcommands()
        .map(|sub| sub.get_name().to_string())
        .filter(|candidate| is_subsequence(&name, candidate))
        .collect();
    matches.sort_unstable();

    match matches.as_slice() {
        [] => Ok(args),
        [single] => {
            args[position] = OsString::from(single);
            Ok(args)
        }
        _ => {
            let message = format!("Too many matches: {}", matches.join(", "));
            Err(command.error(ErrorKind::InvalidSubcommand, message))
        }
    }
}

/// Index of the subcommand name, skipping global options and their values.
fn command_position(command: &clap::Command, args: &[OsString]) -> Option<usize> {
    let mut index = 1;
    while index < args.len() {
        let arg = args[index].to_string_lossy();
        if arg == "--" {
            return None;
        }
        if let Some(long) = arg.strip_prefix("--") {
            if !long.contains('=') && takes_value(command, |a| a.get_long() == Some(long)) {
                index += 1;
            }
        } else if let Some(short) = arg.strip_prefix('-').filter(|s| s.chars().count() == 1) {
            let short = short.chars().next();
            if takes_value(command, |a| a.get_short() == short) {
                index += 1;
            }
        } else if !arg.starts_with('-') {
            return Some(index);
        }
        index += 1;
    }
    None
}

fn takes_value(command: &clap::Command, matches: impl Fn(&Arg) -> bool) -> bool {
    command
        .get_arguments()
        .any(|arg| matches(arg) && arg.get_action().takes_values())
}

fn is_subsequence(abbreviation: &str, name: &str) -> bool {
    let mut chars = name.chars();
    abbreviation.chars().all(|c| chars.any(|n| n == c))
}

fn execute(cli: Cli) -> AppResult<()> {
    // Load base configuration from config file and environment
    let config = AppConfig::load(cli.config_dir)?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.log_level, cli.verbose, cli.no_color);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("clibars starting");
    tracing::debug!("Config directory: {:?}", config.config_dir);
    tracing::debug!("Interpreter: {}", config.interpreter);
    tracing::debug!("Prompt policy: {}", config.prompt);

    let command_name = match &cli.command {
        Commands::Run(_) => "run",
        Commands::List(_) => "list",
        Commands::Remove(_) => "remove",
        Commands::Add(_) => "add",
        Commands::Test(_) => "test",
        Commands::Completion(_) => "completion",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Completion scripts must not create the config directory
    if !matches!(cli.command, Commands::Completion(_)) {
        config.ensure_config_dir()?;
    }

    // Route to command handlers
    let result = match cli.command {
        Commands::Run(cmd) => cmd.execute(&config),
        Commands::List(cmd) => cmd.execute(&config),
        Commands::Remove(cmd) => cmd.execute(&config),
        Commands::Add(cmd) => cmd.execute(&config),
        Commands::Test(cmd) => cmd.execute(&config),
        Commands::Completion(cmd) => cmd.execute(&mut Cli::command()),
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::debug!("Command failed: {}", e),
    }

    result
}
