//! eldj-synth - mood and prompt driven playlist service
//!
//! Serves the playlist API on `[server] host:port` (default 127.0.0.1:5000).
//! Requires a Groq API key and Spotify application credentials, from the
//! environment or the TOML config.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eldj_synth::analysis::{RecoveryPolicy, SemanticAnalyzer};
use eldj_synth::auth::SpotifyOAuth;
use eldj_synth::catalog::SpotifyClient;
use eldj_synth::config::SynthesisConfig;
use eldj_synth::llm::ChatCompletionsClient;
use eldj_synth::{AppState, SynthesisEngine};

#[derive(Debug, Parser)]
#[command(name = "eldj-synth", version, about = "Mood and prompt driven playlist service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Bind address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(long, env = "ELDJ_PORT")]
    port: Option<u16>,

    /// Log level filter when RUST_LOG is unset (overrides [logging] level)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = eldj_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let level = args.log_level.as_deref().unwrap_or(&toml_config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("Starting eldj-synth");
    info!(
        "Version: {} ({}, {} build, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("ELDJ_GIT_REV"),
        env!("ELDJ_BUILD_PROFILE"),
        env!("ELDJ_BUILT_AT")
    );

    let synthesis = Arc::new(SynthesisConfig::new(toml_config.synthesis.clone()));

    let api_key = toml_config.llm.resolve_api_key().context("Groq API key is required")?;
    let model = ChatCompletionsClient::new(&toml_config.llm, api_key).context("Failed to build LLM client")?;
    info!(model = %toml_config.llm.model, "Language model configured");
    let analyzer = Arc::new(SemanticAnalyzer::new(
        model,
        RecoveryPolicy::default(),
        synthesis.markets.clone(),
        toml_config.llm.temperature,
    ));

    let credentials = toml_config
        .spotify
        .resolve()
        .context("Spotify client credentials are required")?;
    let spotify = Arc::new(
        SpotifyClient::new(synthesis.settings.catalog_min_interval_ms)
            .context("Failed to build Spotify client")?,
    );
    let oauth = Arc::new(SpotifyOAuth::new(credentials, spotify.clone()).context("Failed to build OAuth client")?);
    info!(redirect_uri = %oauth.redirect_uri(), "Spotify OAuth configured");

    let engine = Arc::new(SynthesisEngine::new(
        synthesis,
        analyzer,
        spotify.clone(),
        spotify,
        oauth.clone(),
    ));

    let app = eldj_synth::build_router(AppState::new(engine, oauth));

    let host = args.host.unwrap_or(toml_config.server.host);
    let port = args.port.unwrap_or(toml_config.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
