use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::app;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uploader_core::config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::CreateConfig { force } => {
            app::create_config(&app::example_config_path(cli.config.as_deref()), force)
        }
        Commands::Upload { file } => {
            let boot = app::bootstrap(load_config(cli.config.as_deref())?).await?;
            app::upload_one(&boot, &file).await
        }
        Commands::Watch => {
            let boot = app::bootstrap(load_config(cli.config.as_deref())?).await?;
            app::watch(boot).await
        }
    }
}

fn load_config(path: Option<&str>) -> Result<config::AppConfig> {
    config::load(path).context("failed to load configuration")
}

#[derive(Parser)]
#[command(name = "paperless-uploader")]
#[command(about = "Watches a folder and uploads new documents to Paperless-ngx", long_about = None)]
struct Cli {
    /// Path to config file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the configured folder and upload new files (default)
    Watch,
    /// Upload a single document and exit
    Upload {
        /// The path to the document to upload
        file: PathBuf,
    },
    /// Write an example config file and exit
    CreateConfig {
        /// Overwrite an existing config file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}
