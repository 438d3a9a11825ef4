//! Recovery from malformed messages
//!
//! A message that is too short, or carries a non-numeric parameter, aborts
//! only itself. The supervisor reports it, counts a restart and hands
//! control back so the caller can reset the source and keep listening.

use crate::engine::ShowEngine;
use crate::protocol::{Opcode, ProtocolError};
use crate::transport::Inbound;

use super::Dispatcher;

/// Result of one receive-then-route cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A handler ran to completion
    Processed(Opcode),
    /// The opcode matched no handler; nothing was executed
    Unrecognized,
    /// The message was malformed and the cycle was abandoned
    Restarted(ProtocolError),
}

/// Counters kept across cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub processed: u64,
    pub unrecognized: u64,
    pub restarts: u64,
}

/// Runs the dispatcher and absorbs malformed-message failures
pub struct Supervisor<E: ShowEngine> {
    dispatcher: Dispatcher<E>,
    stats: SupervisorStats,
}

impl<E: ShowEngine> Supervisor<E> {
    pub fn new(dispatcher: Dispatcher<E>) -> Self {
        Self {
            dispatcher,
            stats: SupervisorStats::default(),
        }
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        self.dispatcher.engine()
    }

    /// Route one inbound message to completion
    pub fn handle(&mut self, inbound: &Inbound) -> CycleOutcome {
        match self.dispatcher.route(&inbound.text) {
            Ok(report) => match report.opcode {
                Some(opcode) if report.command_processed => {
                    self.stats.processed += 1;
                    tracing::debug!("Processed {} from {}", report.message, inbound.origin);
                    CycleOutcome::Processed(opcode)
                }
                _ => {
                    self.stats.unrecognized += 1;
                    CycleOutcome::Unrecognized
                }
            },
            Err(err) => {
                self.stats.restarts += 1;
                tracing::warn!(
                    "Invalid message received from {}: {} ({:?})",
                    inbound.origin,
                    err,
                    inbound.text
                );
                tracing::info!("Dispatcher reset, restart #{}", self.stats.restarts);
                CycleOutcome::Restarted(err)
            }
        }
    }
}
