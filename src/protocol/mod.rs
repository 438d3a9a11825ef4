//! Protocol module - Defines the text wire protocol shared by serial and UDP
//!
//! Every command is plain text with no delimiters:
//! - 2 character opcode (case-insensitive)
//! - N parameters, each exactly 3 zero-padded decimal digits
//!
//! Framing is the transport's job; the protocol itself has no terminator.

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// Length of the opcode prefix
pub const OPCODE_LEN: usize = 2;

/// Width of every numeric parameter field
pub const PARAM_WIDTH: usize = 3;

/// Highest cuelist index the mutex navigator will scan
pub const MAX_CUELIST: u16 = 100;

/// Cuelist id that stands for "all cuelists" in the stop command
pub const ALL_CUELISTS: u16 = 0;

/// Default UDP port for incoming commands
pub const DEFAULT_UDP_PORT: u16 = 7000;

/// Size of the shared UDP receive buffer
pub const DEFAULT_BUFFER_SIZE: usize = 500;
