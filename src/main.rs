// SPDX-License-Identifier: MIT

//! Platescan CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use platescan::config::{api_key_from_env, AppConfig};
use platescan::encoder::stage_image;
use platescan::gemini::{GeminiClient, Recognition};
use platescan::web::start_server;
use platescan::Result;

/// Platescan CLI - AI factory equipment inventory
#[derive(Parser, Debug)]
#[command(name = "platescan")]
#[command(version = "0.1.0")]
#[command(about = "Factory equipment inventory via Gemini vision and data-plate OCR", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server and UI
    Serve {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze a single local image file and print the recognized fields
    Analyze {
        /// Image file to analyze (PNG, JPEG, or WEBP)
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Check Gemini API reachability and the configured model
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Serve { host, port }) => run_serve(config, host, port).await,
        Some(Commands::Analyze { path, format }) => run_analyze(config, path, &format).await,
        Some(Commands::Config { action }) => run_config_command(config, action),
        Some(Commands::Status) => run_status(config).await,
        None => run_serve(config, None, None).await,
    }
}

fn build_client(config: &AppConfig) -> Result<GeminiClient> {
    // Missing credential is a hard startup failure, before anything binds
    let api_key = api_key_from_env()?;
    Ok(GeminiClient::new(
        &config.gemini,
        api_key,
        config.prompt.clone(),
    ))
}

/// Run the web server
async fn run_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let client = build_client(&config)?;

    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    info!("Platescan v0.1.0 - model: {}", config.gemini.model);
    start_server(config, client).await
}

/// One-shot analysis of a local image file
async fn run_analyze(config: AppConfig, path: PathBuf, format: &str) -> Result<()> {
    let client = build_client(&config)?;

    let bytes = std::fs::read(&path)?;
    let staged = stage_image(&bytes)?;
    info!("Analyzing {:?} ({})", path, staged.mime_type);

    let recognition = client.analyze(&staged.data, &staged.mime_type).await?;
    print_recognition(&recognition, format)?;

    Ok(())
}

fn print_recognition(recognition: &Recognition, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(recognition)?);
        }
        _ => {
            println!("Item:         {}", recognition.item_name);
            println!(
                "Manufacturer: {}",
                recognition.manufacturer.as_deref().unwrap_or("-")
            );
            println!(
                "Model no.:    {}",
                recognition.model_number.as_deref().unwrap_or("-")
            );
            println!(
                "Serial no.:   {}",
                recognition.serial_number.as_deref().unwrap_or("-")
            );
            println!("Description:  {}", recognition.description);
        }
    }
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    let client = build_client(&config)?;

    println!("Platescan v0.1.0 Status");
    println!("=======================");
    println!("Endpoint: {}", config.gemini.base_url);
    println!("Model:    {}", config.gemini.model);

    match client.list_models().await {
        Ok(models) => {
            println!("\nGemini API reachable. Available models:");
            for m in &models {
                let marker = if m == client.model() { "→" } else { " " };
                println!("  {} {}", marker, m);
            }
            if !models.iter().any(|m| m == client.model()) {
                println!(
                    "\nWarning: configured model '{}' not in the listing",
                    client.model()
                );
            }
        }
        Err(e) => println!("\nGemini API error: {}", e),
    }

    Ok(())
}
