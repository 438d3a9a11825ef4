//! Protocol message definitions
//!
//! A [`Message`] is one command as delivered by a transport. It is normalized
//! to uppercase once, then parameters are pulled out of it by position.

use std::fmt;
use thiserror::Error;

use super::{OPCODE_LEN, PARAM_WIDTH};

/// Errors raised while reading a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("ERR_LENGTH {actual}, {required}")]
    Length { actual: usize, required: usize },

    #[error("parameter {index} is not a 3 digit number: {field:?}")]
    InvalidParameter { index: usize, field: String },

    #[error("unknown opcode: {0:?}")]
    UnknownOpcode(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// All recognized command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Start a cuelist
    PlayCuelist,
    /// Jump a cuelist to a specific cue
    PlayCue,
    /// Set a versatile master level immediately
    SetLevel,
    /// Stop one cuelist, or all of them for cuelist 0
    Stop,
    /// Start the cuelist if stopped, stop it otherwise
    TogglePlay,
    /// Pause the cuelist if running, resume it if paused
    TogglePause,
    /// Fade a versatile master over a number of seconds
    AutoFade,
    /// Play the next cuelist of a mutex group
    NextMutex,
    /// Play the previous cuelist of a mutex group
    PrevMutex,
}

impl Opcode {
    /// Every opcode, in protocol documentation order
    pub const ALL: [Opcode; 9] = [
        Opcode::PlayCuelist,
        Opcode::PlayCue,
        Opcode::SetLevel,
        Opcode::Stop,
        Opcode::TogglePlay,
        Opcode::TogglePause,
        Opcode::AutoFade,
        Opcode::NextMutex,
        Opcode::PrevMutex,
    ];

    /// The two-letter wire code
    pub fn code(&self) -> &'static str {
        match self {
            Opcode::PlayCuelist => "PC",
            Opcode::PlayCue => "PQ",
            Opcode::SetLevel => "IN",
            Opcode::Stop => "ST",
            Opcode::TogglePlay => "TP",
            Opcode::TogglePause => "PP",
            Opcode::AutoFade => "AF",
            Opcode::NextMutex => "NX",
            Opcode::PrevMutex => "PX",
        }
    }

    /// Look up an opcode by its exact (already uppercased) wire code
    pub fn from_code(code: &str) -> Option<Opcode> {
        Self::ALL.iter().copied().find(|op| op.code() == code)
    }

    /// Number of 3 digit parameters the command carries
    pub fn param_count(&self) -> usize {
        match self {
            Opcode::PlayCue | Opcode::SetLevel => 2,
            Opcode::AutoFade => 3,
            _ => 1,
        }
    }

    /// Minimum message length for a complete command
    pub fn required_len(&self) -> usize {
        OPCODE_LEN + self.param_count() * PARAM_WIDTH
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single command message, normalized to uppercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    raw: String,
    text: String,
}

impl Message {
    /// Normalize a raw message. Only ASCII letters are case-folded, so the
    /// raw and normalized text line up character for character.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let text = raw.to_ascii_uppercase();
        Self { raw, text }
    }

    /// The text as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Fail with [`ProtocolError::Length`] if the message is shorter than `required`
    pub fn require_len(&self, required: usize) -> ProtocolResult<()> {
        let actual = self.len();
        if actual < required {
            return Err(ProtocolError::Length { actual, required });
        }
        Ok(())
    }

    /// The opcode field: the first [`OPCODE_LEN`] characters
    pub fn opcode_str(&self) -> ProtocolResult<&str> {
        self.require_len(OPCODE_LEN)?;
        Ok(char_span(&self.text, 0, OPCODE_LEN).unwrap_or_default())
    }

    /// Extract the zero-based parameter `index`.
    ///
    /// The field starts at character `2 + index * 3` and is exactly three
    /// ASCII digits.
    pub fn param(&self, index: usize) -> ProtocolResult<u16> {
        let start = OPCODE_LEN + index * PARAM_WIDTH;
        let end = start + PARAM_WIDTH;
        self.require_len(end)?;

        let invalid = || ProtocolError::InvalidParameter {
            index,
            field: char_span(&self.raw, start, end)
                .unwrap_or_default()
                .to_string(),
        };

        let field = char_span(&self.text, start, end).ok_or_else(invalid)?;
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        field.parse().map_err(|_| invalid())
    }

    /// Check that the message is a complete, well-formed command.
    ///
    /// The router never calls this; unknown opcodes are a soft condition
    /// there. It is used before sending a command.
    pub fn validate(&self) -> ProtocolResult<(Opcode, Vec<u16>)> {
        let code = self.opcode_str()?;
        let opcode =
            Opcode::from_code(code).ok_or_else(|| ProtocolError::UnknownOpcode(code.to_string()))?;
        let params = (0..opcode.param_count())
            .map(|i| self.param(i))
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok((opcode, params))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Characters `start..end` of `text`, or `None` if it is too short
fn char_span(text: &str, start: usize, end: usize) -> Option<&str> {
    let offset = |n: usize| {
        text.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .nth(n)
    };
    text.get(offset(start)?..offset(end)?)
}

/// Build the wire text for a command. Values above 999 do not fit the
/// field width and are clamped.
pub fn compose(opcode: Opcode, params: &[u16]) -> String {
    let mut text = String::with_capacity(OPCODE_LEN + params.len() * PARAM_WIDTH);
    text.push_str(opcode.code());
    for value in params {
        text.push_str(&format!("{:03}", (*value).min(999)));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_lookup_is_exact() {
        assert_eq!(Opcode::from_code("PC"), Some(Opcode::PlayCuelist));
        assert_eq!(Opcode::from_code("PX"), Some(Opcode::PrevMutex));
        assert_eq!(Opcode::from_code("pc"), None);
        assert_eq!(Opcode::from_code("P"), None);
        assert_eq!(Opcode::from_code("ZZ"), None);
    }

    #[test]
    fn test_required_lengths() {
        assert_eq!(Opcode::PlayCuelist.required_len(), 5);
        assert_eq!(Opcode::PlayCue.required_len(), 8);
        assert_eq!(Opcode::SetLevel.required_len(), 8);
        assert_eq!(Opcode::AutoFade.required_len(), 11);
        assert_eq!(Opcode::NextMutex.required_len(), 5);
    }

    #[test]
    fn test_normalizes_case() {
        let msg = Message::new("pq001002");
        assert_eq!(msg.text(), "PQ001002");
        assert_eq!(msg.raw(), "pq001002");
        assert_eq!(msg.opcode_str().unwrap(), "PQ");
    }

    #[test]
    fn test_param_offsets() {
        let msg = Message::new("AF003050010");
        assert_eq!(msg.param(0).unwrap(), 3);
        assert_eq!(msg.param(1).unwrap(), 50);
        assert_eq!(msg.param(2).unwrap(), 10);
    }

    #[test]
    fn test_param_length_violation() {
        let msg = Message::new("PC0");
        assert_eq!(
            msg.param(0),
            Err(ProtocolError::Length {
                actual: 3,
                required: 5
            })
        );
        assert_eq!(
            ProtocolError::Length {
                actual: 3,
                required: 5
            }
            .to_string(),
            "ERR_LENGTH 3, 5"
        );
    }

    #[test]
    fn test_param_rejects_non_digits() {
        let msg = Message::new("PC0x5");
        assert!(matches!(
            msg.param(0),
            Err(ProtocolError::InvalidParameter { index: 0, .. })
        ));

        let msg = Message::new("PC 05");
        assert!(msg.param(0).is_err());
    }

    #[test]
    fn test_param_rejects_non_ascii() {
        let msg = Message::new("PCé12");
        assert!(matches!(
            msg.param(0),
            Err(ProtocolError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(
            Message::new("é").opcode_str(),
            Err(ProtocolError::Length {
                actual: 1,
                required: 2
            })
        );
        assert_eq!(
            Message::new("PCé").param(0),
            Err(ProtocolError::Length {
                actual: 3,
                required: 5
            })
        );

        let msg = Message::new("PQé12003");
        assert_eq!(msg.len(), 8);
        assert!(matches!(
            msg.param(0),
            Err(ProtocolError::InvalidParameter { index: 0, ref field }) if field == "é12"
        ));
        assert_eq!(msg.param(1).unwrap(), 3);
    }

    #[test]
    fn test_non_ascii_opcode_is_unknown() {
        let msg = Message::new("éA001");
        assert_eq!(msg.opcode_str().unwrap(), "éA");
        assert_eq!(Opcode::from_code(msg.opcode_str().unwrap()), None);
    }

    #[test]
    fn test_trailing_text_ignored() {
        let msg = Message::new("PC005 trailing");
        assert_eq!(msg.param(0).unwrap(), 5);
    }

    #[test]
    fn test_validate() {
        let (op, params) = Message::new("in003050").validate().unwrap();
        assert_eq!(op, Opcode::SetLevel);
        assert_eq!(params, vec![3, 50]);

        assert!(matches!(
            Message::new("ZZ000").validate(),
            Err(ProtocolError::UnknownOpcode(_))
        ));
        assert!(matches!(
            Message::new("PQ001").validate(),
            Err(ProtocolError::Length { actual: 5, required: 8 })
        ));
    }

    #[test]
    fn test_compose() {
        assert_eq!(compose(Opcode::AutoFade, &[3, 50, 10]), "AF003050010");
        assert_eq!(compose(Opcode::Stop, &[0]), "ST000");
        assert_eq!(compose(Opcode::PlayCuelist, &[1500]), "PC999");
    }
}
