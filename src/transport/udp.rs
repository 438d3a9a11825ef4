//! UDP transport
//!
//! Each datagram is one command. Datagrams are received into a single shared
//! buffer that is zero-filled before every receive, so a short message never
//! picks up the tail of a longer one.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use super::{Inbound, MessageSource, Origin, TransportError, TransportResult};

/// Receives commands over UDP
pub struct UdpChannel {
    socket: UdpSocket,
    scratch: Vec<u8>,
}

impl UdpChannel {
    /// Bind to `addr` with a receive buffer of `buffer_size` bytes
    pub async fn bind(addr: SocketAddr, buffer_size: usize) -> TransportResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("UDP listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            scratch: vec![0; buffer_size.max(1)],
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive one datagram, returning its text and sender
    pub async fn receive(&mut self) -> TransportResult<(String, SocketAddr)> {
        self.scratch.fill(0);
        let (len, addr) = self.socket.recv_from(&mut self.scratch).await?;
        Ok((payload_text(&self.scratch[..len]), addr))
    }
}

/// Text up to the first NUL, without a trailing line terminator
fn payload_text(payload: &[u8]) -> String {
    let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end])
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

#[async_trait]
impl MessageSource for UdpChannel {
    async fn next_message(&mut self) -> TransportResult<Option<Inbound>> {
        let (text, addr) = self.receive().await?;
        tracing::debug!("UDP message from {} port {}: {:?}", addr.ip(), addr.port(), text);
        Ok(Some(Inbound::new(text, Origin::Udp { addr })))
    }

    fn reset(&mut self) {
        self.scratch.fill(0);
    }

    fn name(&self) -> String {
        match self.local_addr() {
            Ok(addr) => format!("udp:{}", addr),
            Err(_) => "udp".to_string(),
        }
    }
}

/// Send one command datagram to a listening service
pub async fn send_command(target: SocketAddr, text: &str) -> TransportResult<usize> {
    let bind_addr: SocketAddr = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };

    let socket = UdpSocket::bind(bind_addr).await?;
    let sent = socket.send_to(text.as_bytes(), target).await?;
    tracing::debug!("Sent {:?} to {}", text, target);
    Ok(sent)
}
