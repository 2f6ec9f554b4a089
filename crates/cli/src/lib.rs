pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use pantry_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "pantry",
    about = "Pantry operator CLI",
    long_about = "Run the grocery agent pipeline, inspect configuration, and check reference data readiness.",
    after_help = "Examples:\n  pantry plan \"vegetarian week\" --meals 4\n  pantry config\n  pantry doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the full plan/inventory/budget/shopping pipeline for a request")]
    Plan {
        #[arg(help = "Free-text meal request, e.g. \"gluten free Diwali dinner\"")]
        description: String,
        #[arg(long, help = "Number of meals to plan")]
        meals: Option<u32>,
        #[arg(long, help = "Budget ceiling for this request, e.g. 45.50")]
        budget: Option<String>,
        #[arg(long, help = "Comma-separated dietary preferences")]
        prefs: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config and reference data readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(Default::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Plan { description, meals, budget, prefs } => {
            commands::plan::run(&description, meals, budget.as_deref(), prefs.as_deref())
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
