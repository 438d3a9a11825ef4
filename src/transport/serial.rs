//! Serial (RS232) transport
//!
//! A blocking reader thread pulls bytes off the port, frames them into lines
//! and forwards each complete line in order. Lines already buffered when a
//! read returns are all forwarded before the next read.

use async_trait::async_trait;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Inbound, MessageSource, Origin, TransportResult};
use crate::protocol::LineDecoder;

/// How long a blocking read waits before checking for shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Receives commands from a serial port
pub struct SerialChannel {
    port_name: String,
    line_rx: mpsc::Receiver<String>,
}

impl SerialChannel {
    /// Open `port_name` at `baud_rate` (8N1) and start the reader thread
    pub fn open(port_name: &str, baud_rate: u32) -> TransportResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        tracing::info!("Serial port {} open at {} baud", port_name, baud_rate);
        Ok(Self::from_reader(port_name, port))
    }

    /// Serve lines from any byte reader. The reader should time out
    /// periodically so the thread notices when the channel is dropped.
    pub fn from_reader<R>(port_name: &str, reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::channel(64);
        let name = port_name.to_string();

        let spawned = std::thread::Builder::new()
            .name(format!("serial-{}", name))
            .spawn(move || read_lines(reader, line_tx, &name));
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn serial reader: {}", e);
        }

        Self {
            port_name: port_name.to_string(),
            line_rx,
        }
    }
}

/// Reader thread body: runs until EOF, a hard IO error, or the receiver is dropped
fn read_lines<R: Read>(mut reader: R, line_tx: mpsc::Sender<String>, port_name: &str) {
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; 256];

    loop {
        if line_tx.is_closed() {
            break;
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => {
                tracing::info!("Serial port {} reached end of input", port_name);
                break;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => {
                tracing::error!("Serial read error on {}: {}", port_name, e);
                break;
            }
        };

        decoder.extend(&buf[..n]);

        while let Some((line, remaining)) = decoder.read_line() {
            tracing::trace!("Serial line {:?}, {} bytes still buffered", line, remaining);
            if line_tx.blocking_send(line).is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl MessageSource for SerialChannel {
    async fn next_message(&mut self) -> TransportResult<Option<Inbound>> {
        let Some(text) = self.line_rx.recv().await else {
            return Ok(None);
        };

        tracing::debug!("Serial message from {}: {:?}", self.port_name, text);
        Ok(Some(Inbound::new(
            text,
            Origin::Serial {
                port: self.port_name.clone(),
            },
        )))
    }

    fn name(&self) -> String {
        format!("serial:{}", self.port_name)
    }
}
