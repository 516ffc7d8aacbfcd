//! DCCF - Doctoral research operating system
//!
//! Serves the research API and its AI assistant, or answers a single
//! question from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dccf::{
    assistant::{ChatRequest, ClientMode},
    config::{resolve_api_keys_from_env, DccfConfig, ProviderKind, StoreBackend},
    server::AppServices,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dccf")]
#[command(author = "DCCF Team")]
#[command(version)]
#[command(about = "Doctoral research operating system with an offline-first AI assistant")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DCCF_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask the assistant one question and print the reply
    Ask {
        /// Message to send
        message: String,

        /// online, offline, hybrid or auto
        #[arg(short, long, default_value = "auto")]
        mode: String,

        /// Short reply
        #[arg(long)]
        rapid: bool,

        /// User id used for artifact lookup
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Check provider credentials and store reachability
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("dccf={},tower_http={}", log_level, log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => DccfConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DccfConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Ask {
            message,
            mode,
            rapid,
            user,
        } => {
            ask(config, message, &mode, rapid, user).await?;
        }
        Commands::Doctor => {
            run_doctor(config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(mut config: DccfConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting DCCF server");
    let services = AppServices::from_config(config).await?;
    services.serve().await?;
    Ok(())
}

async fn ask(config: DccfConfig, message: String, mode: &str, rapid: bool, user: Option<String>) -> Result<()> {
    let services = AppServices::from_config(config).await?;
    let response = services
        .orchestrator()
        .handle_chat(ChatRequest {
            message,
            user_id: user,
            mode: ClientMode::parse_lenient(Some(mode)),
            rapid,
            ..Default::default()
        })
        .await;

    println!("{}", response.response);
    println!();
    println!("[provider: {}]", response.provider);
    for action in &response.recommendations {
        println!("  → {}", action);
    }
    Ok(())
}

async fn run_doctor(config: DccfConfig) -> Result<()> {
    println!("DCCF Doctor");
    println!();

    println!("Checking cloud providers...");
    let keys = resolve_api_keys_from_env(&config.providers);
    for kind in [ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Gemini] {
        let in_order = config.providers.order.contains(&kind);
        match (keys.contains_key(&kind), in_order) {
            (true, true) => println!("  ✓ {} credential found", kind),
            (true, false) => println!("  ℹ {} credential found but not in provider order", kind),
            (false, _) => println!(
                "  ✗ {} credential missing (set {})",
                kind,
                config.providers.get(kind).api_key_ref.to_uppercase()
            ),
        }
    }
    if keys.is_empty() {
        println!("  ℹ No cloud providers available; replies will come from offline mode");
    }

    println!();
    println!("Checking knowledge store...");
    match config.store.backend {
        StoreBackend::File => println!("  Backend: file ({})", config.store.data_dir.display()),
        StoreBackend::Rest => println!(
            "  Backend: rest ({})",
            config.store.rest_url.as_deref().unwrap_or("no URL configured")
        ),
    }
    let services = AppServices::from_config(config).await?;
    match services.store() {
        Some(store) => match store.recent_artifacts(None, 1).await {
            Ok(_) => println!("  ✓ Store reachable"),
            Err(e) => println!("  ✗ Store query failed: {}", e),
        },
        None => println!("  ✗ No store configured; Compass will serve its fallback"),
    }

    println!();
    println!("Doctor check complete!");
    Ok(())
}

fn show_config(config: Option<&DccfConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
