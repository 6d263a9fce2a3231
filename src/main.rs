use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragweave::cli::Output;
use ragweave::cli::commands::build::BuildOptions;

#[derive(Parser)]
#[command(name = "ragweave")]
#[command(
    version,
    about = "Summarize a codebase and its dependencies into retrieval indexes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root
    #[arg(long, short = 'C', global = true, default_value = ".")]
    workspace: PathBuf,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ragweave in the workspace
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Summarize the codebase and/or new dependencies into their indexes
    Build {
        #[arg(long, help = "Only build the codebase index")]
        code: bool,
        #[arg(long, help = "Only build the dependency index")]
        deps: bool,
    },

    /// Show index and dependency snapshot status
    Status {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mragweave encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::new().error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let workspace = cli.workspace.as_path();

    match cli.command {
        Commands::Init { force } => {
            ragweave::cli::commands::init::run(workspace, force)?;
        }
        Commands::Build { code, deps } => {
            ragweave::cli::commands::build::run(workspace, BuildOptions { code, deps })?;
        }
        Commands::Status { format } => {
            ragweave::cli::commands::status::run(workspace, &format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                ragweave::cli::commands::config::show(workspace, global, &format)?;
            }
            ConfigAction::Path => {
                ragweave::cli::commands::config::path(workspace)?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    ragweave::cli::commands::config::init_global(force)?;
                } else {
                    ragweave::cli::commands::config::init_project(workspace, force)?;
                }
            }
        },
    }

    Ok(())
}
