use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mindtap-cli", version, about = "MindTap CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Focus points balance
    Points,
    /// Completion log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Distracting-site classification
    Sites {
        #[command(subcommand)]
        action: commands::sites::SitesAction,
    },
    /// Run the coordinator in the foreground
    Run,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Points => commands::points::run(),
        Commands::Log { action } => commands::log::run(action),
        Commands::Sites { action } => commands::sites::run(action),
        Commands::Run => commands::run::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
