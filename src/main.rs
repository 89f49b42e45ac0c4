// calcd: line-oriented calculator server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calcd::config::Config;
use calcd::dispatcher::Dispatcher;
use calcd::evaluator::AngleUnit;
use calcd::server::Server;

/// Calculator backend speaking a line-oriented TCP protocol
///
/// Clients send commands such as `EVAL 2+2` and receive one
/// `STATUS|EXPRESSION|RESULT|ERROR` line per command.
#[derive(Parser, Debug)]
#[command(name = "calcd", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CALCD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "CALCD_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "CALCD_PORT")]
    port: Option<u16>,

    /// History file used by SAVE_HISTORY / LOAD_HISTORY
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Clients served at the same time
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Unit for SIN, COS and TAN (degrees or radians)
    #[arg(long)]
    angle_unit: Option<AngleUnit>,

    /// Do not load the history file at startup
    #[arg(long)]
    no_autoload: bool,

    /// Do not save the history file on EXIT or shutdown
    #[arg(long)]
    no_autosave: bool,

    /// Log filter (trace, debug, info, warn, error or a full RUST_LOG directive)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load the config file (if any) and apply flag overrides
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.history_file {
            config.history.path = path.clone();
        }
        if let Some(max_sessions) = self.max_sessions {
            config.server.max_sessions = max_sessions;
        }
        if let Some(angle_unit) = self.angle_unit {
            config.evaluator.angle_unit = angle_unit;
        }
        if self.no_autoload {
            config.history.autoload = false;
        }
        if self.no_autosave {
            config.history.autosave = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("calcd=info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let config = cli.config()?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config));

    if config.history.autoload {
        let loaded = dispatcher.load_history().with_context(|| {
            "cannot load history at startup (fix the file or pass --no-autoload)".to_string()
        })?;
        info!(
            path = %config.history.path.display(),
            entries = loaded,
            "history loaded"
        );
    }

    let server = Server::bind(&config.server, Arc::clone(&dispatcher)).await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    server.run(shutdown).await;

    if config.history.autosave {
        let saver = Arc::clone(&dispatcher);
        let saved = tokio::task::spawn_blocking(move || saver.save_history())
            .await
            .context("history save task failed")?
            .context("cannot save history at shutdown")?;
        info!(
            path = %config.history.path.display(),
            entries = saved,
            "history saved"
        );
    }

    Ok(())
}
