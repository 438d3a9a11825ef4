//! Engine module - The show-control engine the dispatcher drives
//!
//! This module provides:
//! - The [`ShowEngine`] trait every backend implements
//! - [`VirtualEngine`], an in-memory backend for dry runs and tests

mod virtual_engine;

pub use virtual_engine::*;

use std::fmt;

/// Fade used when jumping to a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeSpec {
    /// The cue's own programmed fade
    Default,
}

impl fmt::Display for FadeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FadeSpec::Default => f.write_str("default fade"),
        }
    }
}

/// Named cuelist properties that can be read from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuelistProperty {
    /// The mutex group the cuelist belongs to
    MutualExcludeGroup,
}

/// Operations the dispatcher needs from a show-control engine.
///
/// Ids are plain protocol values. Queries that can report "nothing" use
/// negative numbers the way the engine does: a current cue below zero means
/// the cuelist is not running.
pub trait ShowEngine: Send {
    fn start_cuelist(&mut self, cuelist: u16);

    fn stop_cuelist(&mut self, cuelist: u16);

    fn stop_all_cuelists(&mut self);

    fn goto_cue(&mut self, cuelist: u16, cue: u16, fade: FadeSpec);

    /// Index of the active cue, negative when stopped
    fn current_cue(&self, cuelist: u16) -> i32;

    fn is_paused(&self, cuelist: u16) -> bool;

    /// Pause a running cuelist. Pausing twice leaves it paused.
    fn pause_cuelist(&mut self, cuelist: u16);

    fn set_vm_level(&mut self, vm: u16, level: u16, fade_ms: u32);

    /// Number of cues programmed in the cuelist, 0 if it does not exist
    fn cue_count(&self, cuelist: u16) -> u32;

    /// Read a numeric cuelist property, negative if unset
    fn cuelist_property(&self, cuelist: u16, property: CuelistProperty) -> i32;

    /// The cuelist the group currently points at, negative if none
    fn mutex_group_current(&self, group: u16) -> i32;

    /// Move the group forward before the next member is played
    fn advance_mutex_group(&mut self, group: u16);

    /// Move the group backward before the previous member is played
    fn retreat_mutex_group(&mut self, group: u16);
}
