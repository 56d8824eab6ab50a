use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod audio_out;
mod commands;
mod speech;

#[derive(Parser)]
#[command(name = "repcue", version, about = "RepCue workout player")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a project from a workout library
    Play(commands::play::PlayArgs),
    /// Show the playlist a project expands to
    Playlist(commands::playlist::PlaylistArgs),
    /// Compile (and optionally play) a beep pattern
    Pattern(commands::pattern::PatternArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Completed session log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Print a shell completion script
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("REPCUE_LOG").unwrap_or_else(|_| "warn,repcue=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Playlist(args) => commands::playlist::run(args),
        Commands::Pattern(args) => commands::pattern::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Log { action } => commands::log::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "repcue", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
