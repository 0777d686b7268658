//! In-band command parsing and execution
//!
//! Every line an admitted client sends is parsed into a [`Command`] and run
//! against the registry. Lines that are not one of the known commands are
//! public chat for the sender's current room.

use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::error::AppError;
use crate::handler::Session;
use crate::message::{ServerMessage, MSG_USAGE};
use crate::registry::RoomChanged;
use crate::server::ServerContext;

/// A parsed client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/quit`
    Quit,
    /// `/list`
    List,
    /// `/help`
    Help,
    /// `/join <room>`; the room may be empty, which is a no-op
    Join(&'a str),
    /// `/msg <user> <text>`
    Msg { to: &'a str, text: &'a str },
    /// A known command with missing arguments
    Invalid(&'static str),
    /// Anything else that is not blank
    Chat(&'a str),
    /// Blank line
    Empty,
}

impl<'a> Command<'a> {
    /// Parse a line. Command tokens are whitespace-delimited.
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (trimmed, ""),
        };

        match head {
            "/quit" => Command::Quit,
            "/list" => Command::List,
            "/help" => Command::Help,
            "/join" => Command::Join(rest.split_whitespace().next().unwrap_or("")),
            "/msg" => match rest.split_once(char::is_whitespace) {
                Some((to, text)) if !text.trim().is_empty() => Command::Msg {
                    to,
                    text: text.trim(),
                },
                _ => Command::Invalid(MSG_USAGE),
            },
            _ => Command::Chat(line),
        }
    }
}

/// What the session loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs parsed commands on behalf of a session
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProcessor;

impl CommandProcessor {
    /// Parse and execute one line from `session`
    ///
    /// Errors only when the session's own outbound queue is gone.
    pub async fn execute(
        ctx: &ServerContext,
        session: &mut Session,
        line: &str,
    ) -> Result<Flow, AppError> {
        let command = Command::parse(line);
        debug!(client_id = %session.id, ?command, "command");

        match command {
            Command::Empty => {}
            Command::Quit => {
                session.reply(ctx, ServerMessage::Goodbye).await?;
                return Ok(Flow::Quit);
            }
            Command::Help => session.reply(ctx, ServerMessage::Help).await?,
            Command::List => {
                let members = ctx.registry.members(&session.room).await;
                session
                    .reply(
                        ctx,
                        ServerMessage::RoomList {
                            room: session.room.clone(),
                            members,
                        },
                    )
                    .await?;
            }
            Command::Join(room) => Self::join(ctx, session, room).await?,
            Command::Msg { to, text } => Self::private_message(ctx, session, to, text).await?,
            Command::Invalid(usage) => session.reply(ctx, ServerMessage::Usage(usage)).await?,
            Command::Chat(text) => {
                let line = ctx.render(&ServerMessage::Chat {
                    from: session.username.clone(),
                    text: text.to_string(),
                });
                Broadcaster::broadcast(&ctx.registry, &line, &session.room, Some(session.id))
                    .await;
            }
        }

        Ok(Flow::Continue)
    }

    async fn join(ctx: &ServerContext, session: &mut Session, room: &str) -> Result<(), AppError> {
        let RoomChanged { old_room, new_room } =
            match ctx.registry.change_room(session.id, room).await {
                Ok(changed) => changed,
                Err(noop) => {
                    debug!(client_id = %session.id, room, "join ignored: {}", noop);
                    return Ok(());
                }
            };

        session.room = new_room.clone();
        info!(
            username = %session.username,
            from = %old_room,
            to = %new_room,
            "changed room"
        );

        let left = ctx.render(&ServerMessage::UserLeft {
            username: session.username.clone(),
            room: old_room.clone(),
        });
        Broadcaster::broadcast(&ctx.registry, &left, &old_room, Some(session.id)).await;

        let joined = ctx.render(&ServerMessage::UserJoined {
            username: session.username.clone(),
            room: new_room.clone(),
        });
        Broadcaster::broadcast(&ctx.registry, &joined, &new_room, None).await;

        session
            .reply(ctx, ServerMessage::RoomChanged { room: new_room })
            .await
    }

    async fn private_message(
        ctx: &ServerContext,
        session: &Session,
        to: &str,
        text: &str,
    ) -> Result<(), AppError> {
        let Some(recipient) = ctx.registry.find_by_username(to).await else {
            return session
                .reply(
                    ctx,
                    ServerMessage::UserNotFound {
                        username: to.to_string(),
                    },
                )
                .await;
        };

        let line = ctx.render(&ServerMessage::Private {
            from: session.username.clone(),
            text: text.to_string(),
        });
        let reply = match recipient.try_send(line) {
            Ok(()) => ServerMessage::PrivateSent { to: to.to_string() },
            Err(e) => {
                warn!(username = %recipient.username, "dropping private message: {}", e);
                ServerMessage::Undelivered { to: to.to_string() }
            }
        };
        session.reply(ctx, reply).await
    }
}
