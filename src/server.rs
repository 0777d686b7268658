//! ChatServer accept loop and shared state
//!
//! The listener accepts sequentially and hands each connection to its own
//! task. Every task shares one [`ServerContext`], which owns the registry,
//! the clock and the runtime configuration.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::handler::handle_connection;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::types::RoomName;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Room every client starts in
pub const DEFAULT_ROOM: &str = "general";

/// Outbound queue size per client
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How long a finished session waits for its writer to flush
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen: SocketAddr,
    /// Name of the room that always exists
    pub default_room: String,
    /// Drop clients that send nothing for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Lines buffered per client before broadcasts to it are dropped
    pub queue_capacity: usize,
    /// Pending output still unwritten after this long is discarded
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_room: DEFAULT_ROOM.to_string(),
            idle_timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// State shared by every session task
pub struct ServerContext {
    pub registry: Registry,
    pub config: ServerConfig,
    clock: Box<dyn Clock>,
}

impl ServerContext {
    pub fn new(config: ServerConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            registry: Registry::new(RoomName::new(config.default_room.clone())),
            config,
            clock,
        }
    }

    /// Render a message stamped with the current time
    pub fn render(&self, msg: &ServerMessage) -> String {
        msg.render(&self.clock.now())
    }
}

/// The relay server
pub struct ChatServer {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl ChatServer {
    /// Bind to `config.listen` using the system clock
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;
        let context = ServerContext::new(config, Box::new(SystemClock));
        Ok(Self::new(listener, Arc::new(context)))
    }

    pub fn new(listener: TcpListener, context: Arc<ServerContext>) -> Self {
        Self { listener, context }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Finished sessions are reaped as they end. On shutdown the remaining
    /// sessions are cancelled and awaited before this returns.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let ChatServer { listener, context } = self;
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        info!(
            default_room = %context.registry.default_room(),
            "ChatServer started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => {
                    spawn_session(&mut sessions, accepted, &context);
                }
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        warn!("Session task failed: {}", e);
                    }
                }
            }
        }

        info!("ChatServer shutting down ({} active sessions)", sessions.len());
        sessions.shutdown().await;
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install ctrl-c handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

fn spawn_session(
    sessions: &mut JoinSet<()>,
    accepted: std::io::Result<(TcpStream, SocketAddr)>,
    context: &Arc<ServerContext>,
) {
    match accepted {
        Ok((stream, addr)) => {
            debug!("New connection from {}", addr);
            let context = Arc::clone(context);
            sessions.spawn(async move {
                if let Err(e) = handle_connection(stream, context).await {
                    warn!(peer = %addr, "Connection handler error: {}", e);
                }
            });
        }
        Err(e) => warn!("Failed to accept connection: {}", e),
    }
}
