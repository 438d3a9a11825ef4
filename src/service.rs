//! Command service
//!
//! Pulls messages from the enabled transports and routes each one to
//! completion before taking the next. A malformed message resets the source
//! it came from; the loop itself only ends on shutdown or when every source
//! is exhausted.

use std::future::Future;
use thiserror::Error;

use crate::dispatch::{CycleOutcome, Supervisor};
use crate::engine::ShowEngine;
use crate::transport::{Inbound, MessageSource, TransportError, TransportResult};

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A transport failed outside of a single receive
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// `run` was called with neither transport attached
    #[error("No transport enabled")]
    NoSources,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Which source delivered a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Udp,
    Serial,
}

/// The command service.
///
/// Holds at most one UDP and one serial source. Messages from either are
/// handled one at a time by the same supervisor, so commands never overlap.
pub struct Service<E: ShowEngine> {
    /// Routes messages and counts outcomes
    supervisor: Supervisor<E>,
    /// Datagram source, `None` when disabled or closed
    udp: Option<Box<dyn MessageSource>>,
    /// Serial source, `None` when disabled or closed
    serial: Option<Box<dyn MessageSource>>,
}

impl<E: ShowEngine> Service<E> {
    /// Create a service with no transports attached
    pub fn new(supervisor: Supervisor<E>) -> Self {
        Self {
            supervisor,
            udp: None,
            serial: None,
        }
    }

    /// Attach the UDP source, replacing any previous one
    pub fn with_udp(mut self, source: impl MessageSource + 'static) -> Self {
        self.udp = Some(Box::new(source));
        self
    }

    /// Attach the serial source, replacing any previous one
    pub fn with_serial(mut self, source: impl MessageSource + 'static) -> Self {
        self.serial = Some(Box::new(source));
        self
    }

    /// Run until `shutdown` resolves or every source is exhausted.
    /// Returns the supervisor so its engine and counters can be inspected.
    pub async fn run<F>(mut self, shutdown: F) -> ServiceResult<Supervisor<E>>
    where
        F: Future<Output = ()>,
    {
        if self.udp.is_none() && self.serial.is_none() {
            return Err(ServiceError::NoSources);
        }

        for source in self.udp.iter().chain(self.serial.iter()) {
            tracing::info!("Accepting commands on {}", source.name());
        }

        tokio::pin!(shutdown);

        loop {
            let (slot, received) = tokio::select! {
                result = next_from(&mut self.udp) => (Slot::Udp, result),
                result = next_from(&mut self.serial) => (Slot::Serial, result),
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
            };

            match received {
                Ok(Some(inbound)) => self.process(slot, &inbound),
                Ok(None) => {
                    let source = self.slot_mut(slot).take();
                    if let Some(source) = source {
                        tracing::info!("{} closed", source.name());
                    }
                    if self.udp.is_none() && self.serial.is_none() {
                        tracing::info!("All transports closed");
                        break;
                    }
                }
                Err(e) => {
                    // A failed receive loses one message, not the listener
                    tracing::error!("Receive error on {:?} transport: {}", slot, e);
                }
            }
        }

        let stats = self.supervisor.stats();
        tracing::info!(
            "Service stopped: {} processed, {} unrecognized, {} restarts",
            stats.processed,
            stats.unrecognized,
            stats.restarts
        );

        Ok(self.supervisor)
    }

    /// Route one message and reset its source if it was malformed
    fn process(&mut self, slot: Slot, inbound: &Inbound) {
        match self.supervisor.handle(inbound) {
            CycleOutcome::Processed(opcode) => {
                tracing::trace!("{} done on {:?} transport", opcode, slot);
            }
            CycleOutcome::Unrecognized => {}
            CycleOutcome::Restarted(err) => {
                tracing::debug!("Resetting {:?} transport after: {}", slot, err);
                if let Some(source) = self.slot_mut(slot).as_mut() {
                    source.reset();
                }
            }
        }
    }

    /// The source stored for `slot`
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Box<dyn MessageSource>> {
        match slot {
            Slot::Udp => &mut self.udp,
            Slot::Serial => &mut self.serial,
        }
    }
}

/// Next message from an optional source; never resolves when absent
async fn next_from(
    source: &mut Option<Box<dyn MessageSource>>,
) -> TransportResult<Option<Inbound>> {
    match source {
        Some(source) => source.next_message().await,
        None => std::future::pending().await,
    }
}
