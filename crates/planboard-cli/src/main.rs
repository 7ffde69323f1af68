use clap::{Parser, Subcommand};
use planboard_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "planboard", version, about = "Calendar conflicts and deadline alerts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calendar event management
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Check who is busy in a time range
    Conflicts(commands::conflicts::ConflictsArgs),
    /// Task and milestone deadlines
    Target {
        #[command(subcommand)]
        action: commands::target::TargetAction,
    },
    /// Deadline scanning
    Deadline {
        #[command(subcommand)]
        action: commands::deadline::DeadlineAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays machine-readable.
/// `RUST_LOG` wins over `logging.filter` from the config file.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(Config::load_or_default().logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Event { action } => commands::event::run(action),
        Commands::Conflicts(args) => commands::conflicts::run(args),
        Commands::Target { action } => commands::target::run(action),
        Commands::Deadline { action } => commands::deadline::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
