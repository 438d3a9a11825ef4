//! Dispatch module - Routes protocol messages to command handlers
//!
//! Provides:
//! - [`Dispatcher`], which normalizes a message and looks its opcode up in a
//!   handler table
//! - The nine command handlers and the mutex group navigator
//! - [`Supervisor`], which turns malformed messages into a reset instead of a
//!   dead listener

pub mod handlers;
pub mod mutex;
mod recovery;

pub use recovery::*;

use std::collections::HashMap;

use crate::engine::ShowEngine;
use crate::protocol::{Message, Opcode, ProtocolResult};

/// A command handler: reads its parameters and drives the engine
pub type Handler = fn(&mut dyn ShowEngine, &Message) -> ProtocolResult<()>;

/// Opcode to handler lookup table
#[derive(Clone)]
pub struct HandlerTable {
    handlers: HashMap<Opcode, Handler>,
}

impl HandlerTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with a handler for every protocol opcode
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(Opcode::PlayCuelist, handlers::play_cuelist);
        table.register(Opcode::PlayCue, handlers::play_cue);
        table.register(Opcode::SetLevel, handlers::set_level);
        table.register(Opcode::Stop, handlers::stop);
        table.register(Opcode::TogglePlay, handlers::toggle_play);
        table.register(Opcode::TogglePause, handlers::toggle_pause);
        table.register(Opcode::AutoFade, handlers::auto_fade);
        table.register(Opcode::NextMutex, handlers::next_mutex);
        table.register(Opcode::PrevMutex, handlers::prev_mutex);
        table
    }

    /// Install a handler, returning the one it replaces
    pub fn register(&mut self, opcode: Opcode, handler: Handler) -> Option<Handler> {
        self.handlers.insert(opcode, handler)
    }

    /// Find the handler for a wire code. Matching is exact.
    pub fn lookup(&self, code: &str) -> Option<(Opcode, Handler)> {
        let opcode = Opcode::from_code(code)?;
        self.handlers.get(&opcode).map(|handler| (opcode, *handler))
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// What happened to one routed message.
///
/// Built fresh by every [`Dispatcher::route`] call, so nothing carries over
/// from the previous message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// The normalized message text
    pub message: String,
    /// Opcode that handled the message
    pub opcode: Option<Opcode>,
    /// Whether a handler ran to completion
    pub command_processed: bool,
}

/// Routes messages to handlers and owns the engine they drive
pub struct Dispatcher<E: ShowEngine> {
    engine: E,
    handlers: HandlerTable,
}

impl<E: ShowEngine> Dispatcher<E> {
    pub fn new(engine: E) -> Self {
        Self::with_handlers(engine, HandlerTable::standard())
    }

    pub fn with_handlers(engine: E, handlers: HandlerTable) -> Self {
        Self { engine, handlers }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Route one raw message.
    ///
    /// A message too short for its opcode or parameters, or with a
    /// non-numeric parameter, is an error. An unknown opcode is not: the
    /// report comes back with `command_processed == false`.
    pub fn route(&mut self, raw: &str) -> ProtocolResult<RouteReport> {
        let mut report = RouteReport::default();

        let message = Message::new(raw);
        tracing::trace!("Routing {:?}", message.raw());
        report.message = message.text().to_string();

        let code = message.opcode_str()?;
        if let Some((opcode, handler)) = self.handlers.lookup(code) {
            handler(&mut self.engine, &message)?;
            report.opcode = Some(opcode);
            report.command_processed = true;
        }

        if !report.command_processed {
            tracing::warn!("Command was not recognized: {:?}", message.text());
        }

        Ok(report)
    }
}
