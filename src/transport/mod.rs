//! Transport module - Delivers complete command messages to the service
//!
//! Provides:
//! - [`MessageSource`], the one capability both transports implement
//! - [`UdpChannel`] for datagrams and [`send_command`] for sending them
//! - [`SerialChannel`] for RS232 links

mod serial;
mod udp;

pub use serial::*;
pub use udp::*;

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Bind failed: {0}")]
    BindFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Where a message came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Serial { port: String },
    Udp { addr: SocketAddr },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Serial { port } => write!(f, "serial:{}", port),
            Origin::Udp { addr } => write!(f, "udp:{}", addr),
        }
    }
}

/// One complete message as delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub text: String,
    pub origin: Origin,
}

impl Inbound {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// A transport that yields complete command messages
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message.
    /// Returns `Ok(None)` once the source is exhausted.
    async fn next_message(&mut self) -> TransportResult<Option<Inbound>>;

    /// Drop per-message state after a malformed message
    fn reset(&mut self) {}

    /// Short name for logs
    fn name(&self) -> String;
}
