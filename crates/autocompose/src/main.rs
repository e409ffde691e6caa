//! autocompose - natural-language music composition to MIDI files
//!
//! Subcommands:
//! - `autocompose serve` - Run the HTTP API
//! - `autocompose render <description.json>` - Write MIDI files from a
//!   saved description, no model and no server

mod config;
mod web;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use composer::{Composer, LlmComposer};
use score::{generate_separate, MusicDescription};
use soundfonts::catalog::Catalog;

#[derive(Parser)]
#[command(name = "autocompose")]
#[command(about = "Natural-language music composition to MIDI files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (host:port)
        #[arg(short, long)]
        listen_addr: Option<String>,

        /// Directory compositions are written under
        #[arg(short, long)]
        output_root: Option<PathBuf>,

        /// Path to a config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write MIDI files from a music description JSON file
    Render {
        /// Path to the description JSON
        description: PathBuf,

        /// Directory compositions are written under
        #[arg(short, long, default_value = "./output")]
        output_root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            listen_addr,
            output_root,
            config,
        } => serve(listen_addr, output_root, config.as_deref()).await,
        Commands::Render {
            description,
            output_root,
        } => render(&description, &output_root),
    }
}

async fn serve(
    listen_addr: Option<String>,
    output_root: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let (mut config, sources) =
        config::AppConfig::load(config_path).context("Failed to load config")?;
    if let Some(addr) = listen_addr {
        config.listen_addr = addr;
    }
    if let Some(root) = output_root {
        config.output_root = root;
    }

    if let Some(file) = &sources.file {
        tracing::info!("Loaded config from {}", file.display());
    }
    for var in &sources.env_overrides {
        tracing::info!("Config override from ${}", var);
    }

    std::fs::create_dir_all(&config.output_root).context("Failed to create output directory")?;

    let catalog = Arc::new(Catalog::general_midi());
    let soundfont_names: Vec<String> = catalog.all().iter().map(|e| e.name.clone()).collect();

    if config.composer.api_key.is_empty() {
        tracing::warn!(
            "No API key configured; /api/generate/music will fail (set AUTOCOMPOSE_API_KEY)"
        );
    }
    let llm = LlmComposer::new(&config.composer.api_url, &config.composer.api_key)
        .with_model(&config.composer.model)
        .with_soundfont_hints(&soundfont_names);
    let composer: Arc<dyn Composer> = Arc::new(llm);

    let state = web::AppState {
        output_root: config.output_root.clone(),
        composer,
        catalog,
    };
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("🎼 AutoCompose starting on http://{}", addr);
    tracing::info!("   Generate: POST http://{}/api/generate/music", addr);
    tracing::info!("   Render: POST http://{}/api/render", addr);
    tracing::info!("   Soundfonts: GET http://{}/api/soundfonts", addr);
    tracing::info!("   Health: GET http://{}/health", addr);
    tracing::info!("   Output: {}", config.output_root.display());
    tracing::info!("   Model: {} via {}", config.composer.model, config.composer.api_url);

    let shutdown_token = CancellationToken::new();
    let shutdown_token_srv = shutdown_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_token_srv.cancelled().await;
        tracing::info!("Server shutdown signal received");
    });

    tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("Server shutdown with error: {:?}", e);
        }
    });

    // Handle both SIGINT (Ctrl+C) and SIGTERM (systemd, containers)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            shutdown_token.cancel();
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
            shutdown_token.cancel();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn render(description_path: &Path, output_root: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(description_path)
        .with_context(|| format!("Failed to read {}", description_path.display()))?;
    let description: MusicDescription =
        serde_json::from_str(&contents).context("Description is not valid JSON")?;

    std::fs::create_dir_all(output_root).context("Failed to create output directory")?;
    let results = generate_separate(&description, output_root)?;

    if results.is_empty() {
        println!("No instruments in {:?}; nothing written", description.title);
        return Ok(());
    }
    println!("Wrote {} file(s) for {:?}:", results.len(), description.title);
    for result in &results {
        println!("  {} ({})", result.file_path.display(), result.soundfont_name);
    }
    Ok(())
}
