//! Command line interface

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::server::{
    ServerConfig, DEFAULT_ADDR, DEFAULT_DRAIN_TIMEOUT, DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOM,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub listen: SocketAddr,

    /// Room every client is placed in after choosing a name.
    #[arg(long, default_value = DEFAULT_ROOM, value_parser = non_empty)]
    pub default_room: String,

    /// Disconnect clients that send nothing for this many seconds.
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Lines buffered per client before broadcasts to it are dropped.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Seconds a closing session may spend flushing queued output.
    #[arg(long, default_value_t = DEFAULT_DRAIN_TIMEOUT.as_secs())]
    pub drain_timeout: u64,
}

impl Cli {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            listen: self.listen,
            default_room: self.default_room,
            idle_timeout: self.idle_timeout.map(Duration::from_secs),
            queue_capacity: self.queue_capacity.max(1),
            drain_timeout: Duration::from_secs(self.drain_timeout),
        }
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("room name cannot be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}
