//! Room-partitioned TCP Chat Relay Library
//!
//! A line-oriented chat relay: clients pick a unique name, land in a
//! default room and exchange public and private messages with a small
//! set of slash commands.
//!
//! # Features
//! - Username negotiation with reserved and duplicate name checks
//! - Rooms created on first `/join`, removed when their last member leaves
//! - Room-scoped chat, `/list`, `/msg`, `/help`, `/quit`
//! - Backspace/delete line editing for raw terminal clients
//! - Optional idle timeout
//!
//! # Architecture
//! - `Registry` owns all session and room state behind a single mutex
//! - Each connection runs in its own task (`handler`) with a writer task
//!   draining a bounded outbound queue
//! - `Broadcaster` snapshots recipients under the lock and queues lines
//!   after releasing it
//!
//! # Example
//! ```ignore
//! use chat_relay::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = ChatServer::bind(ServerConfig::default()).await?;
//!     server.run_until_ctrl_c().await;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod cli;
pub mod client;
pub mod clock;
pub mod command;
pub mod error;
pub mod handler;
pub mod line_reader;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use client::Client;
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{Command, CommandProcessor, Flow};
pub use error::{AppError, Disconnected, NameRejected, RoomChangeNoOp, SendError};
pub use handler::{handle_connection, Session};
pub use line_reader::LineReader;
pub use message::ServerMessage;
pub use registry::{Admitted, Departed, Registry, RoomChanged};
pub use room::Room;
pub use server::{ChatServer, ServerConfig, ServerContext};
pub use types::{ClientId, DisplayTimestamp, RoomName};
