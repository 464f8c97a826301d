//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use bidcraft_core::{ProposalPipeline, ResearchPipeline};
use bidcraft_provider::{AnthropicProvider, ModelProvider};
use bidcraft_shared::{AppConfig, Credentials, init_config, load_config, load_config_from};

use crate::routes;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Bidcraft: RFP analysis, proposal drafting, and BD research over an LLM.
#[derive(Parser)]
#[command(
    name = "bidcraft",
    version,
    about = "Proposal and BD-research backends for government contracting.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.bidcraft/bidcraft.toml.
    #[arg(long, global = true, env = "BIDCRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which backend a process serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Domain {
    /// RFP analysis and proposal drafts.
    Proposal,
    /// Opportunity research and BD briefs.
    Research,
}

impl Domain {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::Research => "research",
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve one of the two HTTP backends.
    Serve {
        /// Backend to serve.
        domain: Domain,

        /// Port to listen on (defaults to the domain's configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bidcraft=info",
        1 => "bidcraft=debug",
        _ => "bidcraft=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { domain, port, host } => {
            cmd_serve(domain, port, host, cli.config.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_serve(
    domain: Domain,
    port: Option<u16>,
    host: Option<String>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let credentials = Credentials::from_env(&config)?;

    let anthropic = AnthropicProvider::new(&config.anthropic, credentials.anthropic_api_key.clone())?;
    let model = anthropic.model().to_string();
    let provider: Arc<dyn ModelProvider> = Arc::new(anthropic);
    let max_tokens = config.anthropic.max_tokens.clone();

    let (router, default_port) = match domain {
        Domain::Proposal => (
            routes::proposal_router(Arc::new(ProposalPipeline::new(provider, max_tokens))),
            config.server.proposal_port,
        ),
        Domain::Research => (
            routes::research_router(Arc::new(ResearchPipeline::new(
                provider,
                &config.feeds,
                credentials.sam_api_key.clone(),
                max_tokens,
            )?)),
            config.server.research_port,
        ),
    };

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let addr: SocketAddr = format!("{host}:{}", port.unwrap_or(default_port))
        .parse()
        .wrap_err_with(|| format!("invalid listen address {host}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    info!(
        domain = domain.as_str(),
        %addr,
        %model,
        sam_configured = credentials.sam_api_key.is_some(),
        "bidcraft listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
