//! Per-connection session handler
//!
//! Drives one client through name negotiation, the command loop and
//! cleanup. Reads happen on the handler's task; writes go through the
//! session's outbound queue to a dedicated writer task, so nothing else
//! ever touches the socket.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::client::Outbox;
use crate::command::{CommandProcessor, Flow};
use crate::error::{AppError, Disconnected};
use crate::line_reader::LineReader;
use crate::message::ServerMessage;
use crate::registry::{Admitted, Departed};
use crate::server::ServerContext;
use crate::types::{ClientId, RoomName};

/// Handler-side view of an admitted session
#[derive(Debug)]
pub struct Session {
    pub id: ClientId,
    pub username: String,
    /// Mirrors the registry; only this session's own `/join` changes it
    pub room: RoomName,
    outbox: Outbox,
}

impl Session {
    pub fn new(id: ClientId, admitted: Admitted, outbox: Outbox) -> Self {
        Self {
            id,
            username: admitted.username,
            room: admitted.room,
            outbox,
        }
    }

    /// Send a message to this session's own client
    pub async fn reply(&self, ctx: &ServerContext, msg: ServerMessage) -> Result<(), AppError> {
        self.outbox
            .send(ctx.render(&msg))
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

/// Handle an accepted connection until it ends
///
/// Returns once the session is cleaned up and every queued line has been
/// written, the write side has failed, or `drain_timeout` has passed.
pub async fn handle_connection<S>(stream: S, ctx: Arc<ServerContext>) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let client_id = ClientId::new();
    let drain_timeout = ctx.config.drain_timeout;
    info!(%client_id, "Client connected");

    let (read_half, write_half) = tokio::io::split(stream);
    let (outbox, inbox) = mpsc::channel::<String>(ctx.config.queue_capacity);

    // Spawn write task (outbound queue -> stream)
    let mut write_task = tokio::spawn(write_loop(client_id, write_half, inbox));

    let handler = SessionHandler {
        ctx,
        client_id,
        reader: LineReader::new(read_half),
        outbox,
    };
    let result = handler.run().await;

    // All senders are gone once the handler is dropped and the registry
    // entry removed, so the writer drains what is left and exits.
    match tokio::time::timeout(drain_timeout, &mut write_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(%client_id, "Write task failed: {}", e),
        Err(_) => {
            warn!(%client_id, "Writer still blocked after {:?}, dropping output", drain_timeout);
            write_task.abort();
        }
    }

    info!(%client_id, "Client disconnected");
    result
}

async fn write_loop<W>(client_id: ClientId, mut writer: W, mut inbox: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = inbox.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!(%client_id, "Write failed, ending write task: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!(%client_id, "Flush failed, ending write task: {}", e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!(%client_id, "Write task ended");
}

/// Name negotiation → active command loop → cleanup
struct SessionHandler<R> {
    ctx: Arc<ServerContext>,
    client_id: ClientId,
    reader: LineReader<R>,
    outbox: Outbox,
}

impl<R: AsyncRead + Unpin> SessionHandler<R> {
    async fn run(mut self) -> Result<(), AppError> {
        let Some(mut session) = self.negotiate_name().await? else {
            return Ok(());
        };

        let result = self.run_active(&mut session).await;
        self.terminate(session).await;
        result
    }

    /// Prompt until a name is accepted. `None` means the client went away
    /// first, in which case nothing was registered.
    async fn negotiate_name(&mut self) -> Result<Option<Session>, AppError> {
        loop {
            self.send(ServerMessage::UsernamePrompt).await?;

            let line = match self.next_line().await {
                Ok(line) => line,
                Err(reason) => {
                    self.on_disconnect(&reason).await;
                    return Ok(None);
                }
            };

            let desired = line.trim();
            match self
                .ctx
                .registry
                .try_register(self.client_id, desired, self.outbox.clone())
                .await
            {
                Ok(admitted) => {
                    info!(
                        client_id = %self.client_id,
                        username = %admitted.username,
                        room = %admitted.room,
                        "Client admitted"
                    );
                    return Ok(Some(Session::new(
                        self.client_id,
                        admitted,
                        self.outbox.clone(),
                    )));
                }
                Err(reason) => {
                    debug!(client_id = %self.client_id, "Name rejected: {}", reason);
                    self.send(reason.into()).await?;
                }
            }
        }
    }

    /// Announce, greet, then dispatch lines until `/quit` or disconnect
    async fn run_active(&mut self, session: &mut Session) -> Result<(), AppError> {
        let joined = self.ctx.render(&ServerMessage::UserJoined {
            username: session.username.clone(),
            room: session.room.clone(),
        });
        Broadcaster::broadcast(&self.ctx.registry, &joined, &session.room, Some(session.id)).await;

        session
            .reply(
                &self.ctx,
                ServerMessage::Welcome {
                    username: session.username.clone(),
                    room: session.room.clone(),
                },
            )
            .await?;
        session.reply(&self.ctx, ServerMessage::Help).await?;

        loop {
            let line = match self.next_line().await {
                Ok(line) => line,
                Err(reason) => {
                    self.on_disconnect(&reason).await;
                    return Ok(());
                }
            };

            if CommandProcessor::execute(&self.ctx, session, &line).await? == Flow::Quit {
                debug!(username = %session.username, "Client quit");
                return Ok(());
            }
        }
    }

    /// Remove the session and tell its room. Runs once per admitted session.
    async fn terminate(&self, session: Session) {
        let Some(Departed { username, room }) = self.ctx.registry.unregister(session.id).await
        else {
            return;
        };

        info!(client_id = %session.id, %username, %room, "Client left");

        let left = self.ctx.render(&ServerMessage::UserLeft {
            username,
            room: room.clone(),
        });
        Broadcaster::broadcast(&self.ctx.registry, &left, &room, Some(session.id)).await;
    }

    async fn next_line(&mut self) -> Result<String, Disconnected> {
        match self.ctx.config.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.reader.read_line()).await {
                Ok(result) => result,
                Err(_) => Err(Disconnected::Idle(limit)),
            },
            None => self.reader.read_line().await,
        }
    }

    async fn on_disconnect(&self, reason: &Disconnected) {
        debug!(client_id = %self.client_id, "Read side ended: {}", reason);
        if let Disconnected::Idle(_) = reason {
            let _ = self.send(ServerMessage::IdleTimeout).await;
        }
    }

    async fn send(&self, msg: ServerMessage) -> Result<(), AppError> {
        self.outbox
            .send(self.ctx.render(&msg))
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}
