use clap::{Parser, Subcommand};

mod commands;
mod indicator;
mod logging;

#[derive(Parser)]
#[command(name = "lookalive", version, about = "LookAlive 20-20-20 eye break assistant")]
struct Cli {
    /// Log filter, e.g. "info" or "lookalive_core=debug" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a landmark stream and remind about breaks
    Run(commands::run::RunArgs),
    /// Screen usage statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Screen-bounds calibration
    Calibrate {
        #[command(subcommand)]
        action: commands::calibrate::CalibrateAction,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Calibrate { action } => commands::calibrate::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
