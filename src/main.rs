use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_relay::{
    create_engine, create_router, AppState, AudioFile, Config, RegistrySettings, SessionRegistry,
};

#[derive(Parser)]
#[command(
    name = "voice-relay",
    version,
    about = "Relay streamed audio to real-time recognition and archive it as MP3"
)]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/voice-relay")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Stream a 16kHz mono WAV file through one session
    Replay {
        /// WAV file to replay
        path: PathBuf,

        /// Chunk length in milliseconds
        #[arg(long, default_value_t = 500)]
        chunk_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Recognition engine: {:?} ({})",
        cfg.recognition.engine, cfg.recognition.model
    );
    info!("Recordings directory: {}", cfg.recordings.dir().display());

    let engine = create_engine(&cfg.recognition)?;
    let registry = Arc::new(SessionRegistry::new(
        engine,
        RegistrySettings::from_config(&cfg),
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, registry).await,
        Command::Replay { path, chunk_ms } => replay(registry, path, chunk_ms).await,
    }
}

async fn serve(cfg: &Config, registry: Arc<SessionRegistry>) -> Result<()> {
    let app = create_router(AppState::new(
        Arc::clone(&registry),
        cfg.service.http.max_upload_bytes,
    ));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    let finished = registry.shutdown().await;
    info!("Shut down ({} open sessions finished)", finished);

    Ok(())
}

async fn replay(registry: Arc<SessionRegistry>, path: PathBuf, chunk_ms: u64) -> Result<()> {
    let audio = AudioFile::open(&path)?;
    let chunks = audio.pcm_chunks(chunk_ms)?;

    let session_id = registry.create().await?;
    info!(
        "Replaying {} ({} chunks) into session {}",
        audio.path,
        chunks.len(),
        session_id
    );

    for chunk in &chunks {
        for result in registry.ingest(&session_id, chunk).await? {
            println!("{}", result);
        }
        // Pace the upload like a live client
        tokio::time::sleep(std::time::Duration::from_millis(chunk_ms)).await;
    }

    let finished = registry.finish(&session_id).await?;
    for result in &finished.results {
        println!("{}", result);
    }

    info!(
        "Saved {} ({} bytes, {:.1}s)",
        finished.artifact.display(),
        finished.audio_bytes,
        finished.duration_secs
    );

    Ok(())
}
