//! `threshold`: generate an explorable world from a theme and report how it
//! would be presented.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use threshold_net::ReqwestTransport;
use threshold_session::{
    GenerationEvent, Presentation, SessionError, SessionEvent, WORLD_THEMES, WorldSession,
};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, WORLDLABS_KEY_VAR, config_path};

#[derive(Debug, Parser)]
#[command(name = "threshold", version, about = "Step through a threshold into a generated world")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a world and load its best presentation.
    Generate(GenerateArgs),
    /// List the built-in themes.
    Themes,
    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Theme to generate; a random built-in theme when omitted.
    #[arg(long)]
    theme: Option<String>,
    /// Skip the concept image and condition on text only.
    #[arg(long)]
    text_only: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with keys masked.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a default configuration file if none exists.
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,threshold=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("threshold error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => generate(args).await,
        Command::Themes => {
            for theme in WORLD_THEMES {
                println!("{theme}");
            }
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let config = AppConfig::load()?;
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", config_path()?.display());
                Ok(())
            }
            ConfigAction::Init => {
                let path = config_path()?;
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                AppConfig::default().save_to(&path)?;
                println!("{}", path.display());
                Ok(())
            }
        },
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let mut config = AppConfig::load()?;
    if config.pipeline.worldgen.api_key.is_empty() {
        bail!(
            "no world service API key; set {WORLDLABS_KEY_VAR} or add it to {}",
            config_path()?.display()
        );
    }
    if args.text_only {
        config.pipeline.orchestrator.use_concept_image = false;
    }

    let transport = ReqwestTransport::new(config.request_timeout())
        .context("failed to build HTTP client")?;
    let session = config.pipeline.build_session(Arc::new(transport));
    let printer = spawn_printer(&session).await;

    session.enter_staging().await?;
    let outcome = session.generate(args.theme.as_deref()).await;
    let snapshot = session.snapshot().await;
    let world = session.active_world().await;
    drop(session);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match outcome {
        Ok(asset) => {
            println!("world:     {}", asset.id);
            println!("theme:     {}", asset.theme);
            match world.map(|w| w.presentation) {
                Some(Presentation::Loaded { mode, asset: loaded }) => {
                    println!("mode:      {}", mode.label());
                    println!("source:    {}", loaded.url);
                    println!("bytes:     {}", loaded.len());
                }
                Some(Presentation::Degraded {
                    preview_url: Some(url),
                }) => println!("mode:      degraded (preview {url})"),
                _ => println!("mode:      unstable"),
            }
            if let Some(viewer) = &asset.external_viewer_url {
                println!("viewer:    {viewer}");
            }
            Ok(())
        }
        Err(SessionError::Generation(e)) => {
            tracing::debug!(error = %e, "generation failed");
            bail!("{}", snapshot.status_message)
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints status changes to stderr until the session is dropped.
async fn spawn_printer(session: &WorldSession) -> Option<tokio::task::JoinHandle<()>> {
    let mut events = session.take_events().await?;
    Some(tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::StatusChanged(message) => eprintln!("> {message}"),
                SessionEvent::Generation(GenerationEvent::StateChanged { state, .. }) => {
                    tracing::debug!(?state, "attempt state");
                }
                SessionEvent::Failed { message, .. } => eprintln!("! {message}"),
                _ => {}
            }
        }
    }))
}
