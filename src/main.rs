use clap::{Parser, Subcommand};
use pantrack_core::GeminiClient;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod session;

use commands::{
    connect, login, logout, print_tags, signup, watch, ConfigCommand, CredentialArgs,
    ItemCommand, OutputFormat, RecipeCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "pantrack")]
#[command(version)]
#[command(about = "Track your pantry and generate recipes from it", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login(CredentialArgs),

    /// Create an account
    Signup(CredentialArgs),

    /// Forget the stored session
    Logout,

    /// Manage pantry items
    Item(ItemCommand),

    /// Manage and generate recipes
    Recipe(RecipeCommand),

    /// List every tag used in the pantry
    Tags {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Follow pantry and recipe changes live
    Watch,

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pantrack=debug,pantrack_core=debug"
    } else {
        "pantrack=info,pantrack_core=info"
    };

    // Logs go to stderr so stdout stays clean for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Login(args)) => {
            login(&config, &args).await?;
        }
        Some(Commands::Signup(args)) => {
            signup(&config, &args).await?;
        }
        Some(Commands::Logout) => {
            logout(&config)?;
        }
        Some(Commands::Item(cmd)) => {
            let mut connection = connect(&config).await?;
            cmd.run(&mut connection.store).await?;
        }
        Some(Commands::Recipe(cmd)) => {
            let generator = if cmd.needs_generator() {
                Some(
                    GeminiClient::new(config.gemini_key()?)
                        .with_model(config.gemini_model.value.as_str()),
                )
            } else {
                None
            };
            let mut connection = connect(&config).await?;
            cmd.run(&mut connection.store, generator.as_ref(), &config.generation)
                .await?;
        }
        Some(Commands::Tags { format }) => {
            let connection = connect(&config).await?;
            print_tags(&connection.store, &format)?;
        }
        Some(Commands::Watch) => {
            watch(&config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
