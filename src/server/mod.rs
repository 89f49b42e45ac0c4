//! TCP front end
//!
//! [`Server`] accepts connections and hands each one to [`serve_session`].
//! A semaphore with `max_sessions` permits is acquired *before* `accept`,
//! so with the default of one session later clients simply wait in the
//! listen backlog until the current one leaves.

mod session;

pub use session::{serve_session, SessionError, SessionSettings, REQUEST_TOO_LONG};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

impl From<&ServerConfig> for SessionSettings {
    fn from(config: &ServerConfig) -> Self {
        SessionSettings {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            write_timeout: Duration::from_secs(config.write_timeout_secs),
            max_line_length: config.max_line_length,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
    sessions: Arc<Semaphore>,
}

impl Server {
    /// Bind the listening socket. Port 0 picks a free port; see
    /// [`Server::local_addr`].
    pub async fn bind(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<Self, ServerError> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        Ok(Server {
            listener,
            local_addr,
            dispatcher,
            settings: SessionSettings::from(config),
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve clients until `shutdown` is cancelled, then wait for
    /// open sessions to finish their current command.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(address = %self.local_addr, "calculator server listening");
        let mut tasks = JoinSet::new();

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&self.sessions).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        continue;
                    }
                },
            };

            info!(peer = %peer, "session opened");
            let dispatcher = Arc::clone(&self.dispatcher);
            let settings = self.settings;
            let token = shutdown.child_token();
            tasks.spawn(async move {
                match serve_session(stream, dispatcher, settings, token).await {
                    Ok(()) => info!(peer = %peer, "session closed"),
                    Err(err) => warn!(peer = %peer, error = %err, "session ended"),
                }
                drop(permit);
            });

            // Reap finished sessions so the set does not grow unbounded
            while tasks.try_join_next().is_some() {}
        }

        debug!(open = tasks.len(), "waiting for sessions to finish");
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "session task failed");
            }
        }
        info!("calculator server stopped");
    }
}
