//! Main entry point for CLI command to start the relay.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::axum_factory::make_router;
use crate::axum_factory::serve;
use crate::configuration::Configuration;
use crate::configuration::Upstream;
use crate::configuration::generate_config_schema;
use crate::services::UpstreamExecutor;

/// Options for the relay
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    about = "Single and batched GraphQL endpoints in front of an upstream GraphQL server"
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(long = "log", default_value = "info", alias = "log-level", env = "RELAY_LOG")]
    log_level: String,

    /// Configuration location relative to the current directory.
    #[arg(short, long = "config", env = "RELAY_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Upstream GraphQL endpoint. Takes precedence over `upstream.url` in the configuration.
    #[arg(long = "upstream", env = "RELAY_UPSTREAM_URL")]
    upstream_url: Option<Url>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

/// This is the main relay entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("RELAY_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.version {
        println!("{}", std::env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    init_tracing(&opt.log_level)?;

    let configuration = configure(&opt)?;
    let upstream = configuration.upstream.as_ref().ok_or_else(|| {
        anyhow!(
            "no upstream GraphQL server configured, set `upstream.url` in the configuration file or pass --upstream"
        )
    })?;
    let executor =
        UpstreamExecutor::new(upstream).context("could not create the upstream client")?;
    tracing::info!(upstream = %executor.url(), timeout = ?upstream.timeout, "forwarding operations");

    let router = make_router(Arc::new(executor), &configuration);
    let handle = serve(router, configuration.server.listen)
        .await
        .with_context(|| format!("could not listen on {}", configuration.server.listen))?;

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for ctrl-c")?;
    tracing::info!("received ctrl-c, shutting down");
    handle.shutdown().await?;
    tracing::info!("stopped");
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(log_level).context("could not parse log configuration")?,
    );

    let result = if std::io::stdout().is_terminal() {
        builder.try_init()
    } else {
        builder.json().try_init()
    };
    result.map_err(|err| anyhow!("could not set up logging: {err}"))
}

/// Load the configuration file, if any, then apply command line overrides.
fn configure(opt: &Opt) -> Result<Configuration> {
    let mut configuration = match &opt.config_path {
        Some(path) => {
            let path = if path.is_relative() {
                std::env::current_dir()?.join(path)
            } else {
                path.clone()
            };
            Configuration::from_file(&path)
                .with_context(|| format!("could not load configuration from {}", path.display()))?
        }
        None => Configuration::default(),
    };

    if let Some(url) = &opt.upstream_url {
        match configuration.upstream.as_mut() {
            Some(upstream) => upstream.url = url.clone(),
            None => configuration.upstream = Some(Upstream::new(url.clone())),
        }
    }
    Ok(configuration)
}
