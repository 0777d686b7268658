//! Error types for the chat relay
//!
//! Defines per-connection errors, name negotiation rejections, read-side
//! disconnects and per-recipient delivery failures.
//! Uses thiserror for ergonomic error definitions.

use std::time::Duration;

use thiserror::Error;

/// Application-level errors
///
/// Fatal for the connection they occur on, never for any other session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Channel send error (fatal - the session's own writer is gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Reasons a desired username is refused during negotiation
///
/// Recoverable: the client is told why and prompted again.
/// The Display text is what the client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameRejected {
    #[error("Username cannot be empty.")]
    Empty,

    #[error("Username '{0}' cannot contain spaces.")]
    Whitespace(String),

    #[error("Username '{0}' is reserved.")]
    Reserved(String),

    #[error("Username '{0}' is already taken.")]
    Taken(String),
}

/// Why a room change did nothing
///
/// Not an error from the client's point of view; silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomChangeNoOp {
    #[error("room name is empty")]
    EmptyName,

    #[error("already in that room")]
    AlreadyThere,

    #[error("connection is not registered")]
    NotRegistered,
}

/// The read side of a connection ended
#[derive(Debug, Error)]
pub enum Disconnected {
    /// Peer closed the stream before sending anything more
    #[error("peer closed the connection")]
    Closed,

    /// Read failed
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    /// No line arrived within the configured idle timeout
    #[error("idle for longer than {0:?}")]
    Idle(Duration),
}

/// Message send errors
///
/// Occurs when a recipient's outbound queue cannot take a message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The recipient is not draining its queue fast enough
    #[error("Outbound queue full")]
    QueueFull,
}
