use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use focusdesk_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusdesk", version, about = "Focusdesk focus timer CLI")]
struct Cli {
    /// User id (defaults to `user_id` from the config file)
    #[arg(long, global = true)]
    user: Option<String>,

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
    /// Focus and break durations
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Today's goal
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Productivity statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a motivational quote
    Quote,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("FOCUSDESK_LOG")
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: {e}; using defaults");
            Config::default()
        }
    };
    init_tracing(&config);

    let ctx = commands::Context::new(config, cli.user);
    tracing::debug!(user = %ctx.user_id, "focusdesk starting");
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(&ctx, action),
        Commands::Settings { action } => commands::settings::run(&ctx, action),
        Commands::Goal { action } => commands::goal::run(&ctx, action),
        Commands::Stats { action } => commands::stats::run(&ctx, action),
        Commands::Task { action } => commands::task::run(&ctx, action),
        Commands::Config { action } => commands::config::run(&ctx, action),
        Commands::Quote => commands::quote::run(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "focusdesk", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
