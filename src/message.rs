//! Server → client text protocol
//!
//! Every line the relay sends is built here. Notices carry a `[Server]:`
//! prefix, chat lines a `[username]:` prefix, and timestamped lines start
//! with `[HH:MM]`. Rendered output is always newline-terminated.

use std::fmt::Write as _;

use crate::error::NameRejected;
use crate::types::{DisplayTimestamp, RoomName};

/// Static command summary sent after admission and on `/help`
pub const HELP_TEXT: &str = "\
[Server]: Available commands:
  /list               - show who is in your room
  /join <room>        - move to another room (created if needed)
  /msg <user> <text>  - send a private message
  /help               - show this help
  /quit               - leave the chat
";

/// Usage hint for a malformed `/msg`
pub const MSG_USAGE: &str = "/msg <user> <message>";

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Ask for a username
    UsernamePrompt,
    /// Desired username was refused
    Rejected(NameRejected),
    /// Sent to a newly admitted client
    Welcome { username: String, room: RoomName },
    /// Command summary
    Help,
    /// Someone entered a room
    UserJoined { username: String, room: RoomName },
    /// Someone left a room
    UserLeft { username: String, room: RoomName },
    /// `/list` reply
    RoomList { room: RoomName, members: Vec<String> },
    /// `/join` confirmation to the mover
    RoomChanged { room: RoomName },
    /// Public chat line
    Chat { from: String, text: String },
    /// Private message, as the recipient sees it
    Private { from: String, text: String },
    /// Private message confirmation, as the sender sees it
    PrivateSent { to: String },
    /// `/msg` recipient is not connected
    UserNotFound { username: String },
    /// `/msg` recipient is connected but its queue refused the line
    Undelivered { to: String },
    /// Command was malformed
    Usage(&'static str),
    /// Reply to `/quit`
    Goodbye,
    /// Connection closed for inactivity
    IdleTimeout,
}

impl ServerMessage {
    /// Render as wire text, stamping timestamped variants with `ts`
    pub fn render(&self, ts: &DisplayTimestamp) -> String {
        match self {
            ServerMessage::UsernamePrompt => "[Server]: Enter your username:\n".to_string(),
            ServerMessage::Rejected(reason) => format!("[Server]: {}\n", reason),
            ServerMessage::Welcome { username, room } => format!(
                "{} [Server]: Welcome, {}! You are in room '{}'.\n",
                ts, username, room
            ),
            ServerMessage::Help => HELP_TEXT.to_string(),
            ServerMessage::UserJoined { username, room } => {
                format!("{} [Server]: {} has joined room '{}'.\n", ts, username, room)
            }
            ServerMessage::UserLeft { username, room } => {
                format!("{} [Server]: {} has left room '{}'.\n", ts, username, room)
            }
            ServerMessage::RoomList { room, members } => {
                let mut out = format!("{} [Server]: Users in room '{}':\n", ts, room);
                for member in members {
                    let _ = writeln!(out, "  {}", member);
                }
                out
            }
            ServerMessage::RoomChanged { room } => {
                format!("{} [Server]: You are now in room '{}'.\n", ts, room)
            }
            ServerMessage::Chat { from, text } => format!("{} [{}]: {}\n", ts, from, text),
            ServerMessage::Private { from, text } => {
                format!("{} [PM from {}]: {}\n", ts, from, text)
            }
            ServerMessage::PrivateSent { to } => {
                format!("{} [Server]: Private message sent to {}.\n", ts, to)
            }
            ServerMessage::UserNotFound { username } => {
                format!("{} [Server]: User '{}' not found.\n", ts, username)
            }
            ServerMessage::Undelivered { to } => {
                format!("{} [Server]: Message to {} could not be delivered.\n", ts, to)
            }
            ServerMessage::Usage(usage) => format!("[Server]: Usage: {}\n", usage),
            ServerMessage::Goodbye => "[Server]: Goodbye!\n".to_string(),
            ServerMessage::IdleTimeout => {
                "[Server]: Disconnected after being idle too long.\n".to_string()
            }
        }
    }
}

/// Convert a name rejection into the message shown to the client
impl From<NameRejected> for ServerMessage {
    fn from(reason: NameRejected) -> Self {
        ServerMessage::Rejected(reason)
    }
}
