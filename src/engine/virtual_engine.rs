//! In-memory show engine
//!
//! Tracks cuelist playback, pause state, mutex groups and versatile master
//! levels well enough to exercise every protocol command without a console
//! attached. Every state-changing call is logged; tests can also ask for an
//! in-order record of them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::{CuelistProperty, FadeSpec, ShowEngine};

/// A state-changing call received by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    StartCuelist(u16),
    StopCuelist(u16),
    StopAllCuelists,
    GotoCue { cuelist: u16, cue: u16, fade: FadeSpec },
    PauseCuelist(u16),
    SetVmLevel { vm: u16, level: u16, fade_ms: u32 },
    AdvanceMutexGroup(u16),
    RetreatMutexGroup(u16),
}

impl fmt::Display for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCall::StartCuelist(id) => write!(f, "start cuelist {}", id),
            EngineCall::StopCuelist(id) => write!(f, "stop cuelist {}", id),
            EngineCall::StopAllCuelists => f.write_str("stop all cuelists"),
            EngineCall::GotoCue { cuelist, cue, fade } => {
                write!(f, "goto cuelist {} cue {} with {}", cuelist, cue, fade)
            }
            EngineCall::PauseCuelist(id) => write!(f, "pause cuelist {}", id),
            EngineCall::SetVmLevel { vm, level, fade_ms } => {
                write!(f, "set VM {} to {} over {} ms", vm, level, fade_ms)
            }
            EngineCall::AdvanceMutexGroup(group) => write!(f, "advance mutex group {}", group),
            EngineCall::RetreatMutexGroup(group) => write!(f, "retreat mutex group {}", group),
        }
    }
}

/// Playback state of one cuelist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuelistState {
    /// Number of programmed cues
    pub cue_count: u32,
    /// Mutex group membership
    pub mutex_group: Option<u16>,
    /// Active cue, negative when stopped
    pub current_cue: i32,
    pub paused: bool,
}

impl CuelistState {
    pub fn new(cue_count: u32, mutex_group: Option<u16>) -> Self {
        Self {
            cue_count,
            mutex_group,
            current_cue: -1,
            paused: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current_cue >= 0
    }
}

/// Level of a versatile master after its last fade request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmLevel {
    pub level: u16,
    pub fade_ms: u32,
}

/// In-memory [`ShowEngine`]
#[derive(Debug, Default)]
pub struct VirtualEngine {
    cuelists: BTreeMap<u16, CuelistState>,
    masters: HashMap<u16, VmLevel>,
    /// Last cuelist played in each mutex group
    group_pointers: HashMap<u16, u16>,
    /// Only kept when recording was asked for
    calls: Option<Vec<EngineCall>>,
}

impl VirtualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a cuelist
    pub fn add_cuelist(&mut self, id: u16, cue_count: u32, mutex_group: Option<u16>) {
        self.cuelists
            .insert(id, CuelistState::new(cue_count, mutex_group));
    }

    pub fn cuelist_count(&self) -> usize {
        self.cuelists.len()
    }

    fn record(&mut self, call: EngineCall) {
        tracing::debug!("Engine: {}", call);
        if let Some(calls) = self.calls.as_mut() {
            calls.push(call);
        }
    }

    /// Mark `id` as the active member of its group, stopping the others
    fn claim_group(&mut self, id: u16) {
        let Some(group) = self.cuelists.get(&id).and_then(|c| c.mutex_group) else {
            return;
        };

        for (other_id, other) in self.cuelists.iter_mut() {
            if *other_id != id && other.mutex_group == Some(group) {
                other.current_cue = -1;
                other.paused = false;
            }
        }
        self.group_pointers.insert(group, id);
    }

    /// Stop whichever member of the group is playing
    fn release_group(&mut self, group: u16) {
        for state in self.cuelists.values_mut() {
            if state.mutex_group == Some(group) {
                state.current_cue = -1;
                state.paused = false;
            }
        }
    }
}

#[cfg(test)]
impl VirtualEngine {
    /// Keep an in-order record of every state-changing call
    pub fn recording(mut self) -> Self {
        self.calls = Some(Vec::new());
        self
    }

    /// Builder form of [`VirtualEngine::add_cuelist`]
    pub fn with_cuelist(mut self, id: u16, cue_count: u32, mutex_group: Option<u16>) -> Self {
        self.add_cuelist(id, cue_count, mutex_group);
        self
    }

    pub fn cuelist(&self, id: u16) -> Option<&CuelistState> {
        self.cuelists.get(&id)
    }

    pub fn is_running(&self, id: u16) -> bool {
        self.cuelist(id).map(|c| c.is_running()).unwrap_or(false)
    }

    pub fn vm_level(&self, vm: u16) -> Option<VmLevel> {
        self.masters.get(&vm).copied()
    }

    /// Calls recorded so far, oldest first. Empty unless recording.
    pub fn calls(&self) -> &[EngineCall] {
        self.calls.as_deref().unwrap_or_default()
    }

    /// Forget the recorded calls, keeping playback state
    pub fn clear_calls(&mut self) {
        if let Some(calls) = self.calls.as_mut() {
            calls.clear();
        }
    }
}

impl ShowEngine for VirtualEngine {
    fn start_cuelist(&mut self, cuelist: u16) {
        self.record(EngineCall::StartCuelist(cuelist));

        let Some(state) = self.cuelists.get_mut(&cuelist) else {
            tracing::debug!("Start ignored, cuelist {} does not exist", cuelist);
            return;
        };
        if state.cue_count == 0 {
            return;
        }

        if state.paused {
            state.paused = false;
        } else if state.current_cue < 0 {
            state.current_cue = 0;
        } else {
            state.current_cue = (state.current_cue + 1) % state.cue_count as i32;
        }
        self.claim_group(cuelist);
    }

    fn stop_cuelist(&mut self, cuelist: u16) {
        self.record(EngineCall::StopCuelist(cuelist));

        if let Some(state) = self.cuelists.get_mut(&cuelist) {
            state.current_cue = -1;
            state.paused = false;
        }
    }

    fn stop_all_cuelists(&mut self) {
        self.record(EngineCall::StopAllCuelists);

        for state in self.cuelists.values_mut() {
            state.current_cue = -1;
            state.paused = false;
        }
    }

    fn goto_cue(&mut self, cuelist: u16, cue: u16, fade: FadeSpec) {
        self.record(EngineCall::GotoCue { cuelist, cue, fade });

        let Some(state) = self.cuelists.get_mut(&cuelist) else {
            return;
        };
        if u32::from(cue) >= state.cue_count {
            tracing::debug!("Cuelist {} has no cue {}", cuelist, cue);
            return;
        }

        state.current_cue = i32::from(cue);
        state.paused = false;
        self.claim_group(cuelist);
    }

    fn current_cue(&self, cuelist: u16) -> i32 {
        self.cuelists
            .get(&cuelist)
            .map(|c| c.current_cue)
            .unwrap_or(-1)
    }

    fn is_paused(&self, cuelist: u16) -> bool {
        self.cuelists
            .get(&cuelist)
            .map(|c| c.paused)
            .unwrap_or(false)
    }

    fn pause_cuelist(&mut self, cuelist: u16) {
        self.record(EngineCall::PauseCuelist(cuelist));

        if let Some(state) = self.cuelists.get_mut(&cuelist) {
            if state.is_running() {
                state.paused = true;
            }
        }
    }

    fn set_vm_level(&mut self, vm: u16, level: u16, fade_ms: u32) {
        self.record(EngineCall::SetVmLevel { vm, level, fade_ms });
        if let Some(previous) = self.masters.insert(vm, VmLevel { level, fade_ms }) {
            tracing::trace!(
                "VM {} was at {} after a {} ms fade",
                vm,
                previous.level,
                previous.fade_ms
            );
        }
    }

    fn cue_count(&self, cuelist: u16) -> u32 {
        self.cuelists
            .get(&cuelist)
            .map(|c| c.cue_count)
            .unwrap_or(0)
    }

    fn cuelist_property(&self, cuelist: u16, property: CuelistProperty) -> i32 {
        match property {
            CuelistProperty::MutualExcludeGroup => self
                .cuelists
                .get(&cuelist)
                .and_then(|c| c.mutex_group)
                .map(i32::from)
                .unwrap_or(-1),
        }
    }

    fn mutex_group_current(&self, group: u16) -> i32 {
        self.group_pointers
            .get(&group)
            .map(|id| i32::from(*id))
            .unwrap_or(-1)
    }

    fn advance_mutex_group(&mut self, group: u16) {
        self.record(EngineCall::AdvanceMutexGroup(group));
        self.release_group(group);
    }

    fn retreat_mutex_group(&mut self, group: u16) {
        self.record(EngineCall::RetreatMutexGroup(group));
        self.release_group(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_stop() {
        let mut engine = VirtualEngine::new().with_cuelist(1, 3, None);
        assert_eq!(engine.current_cue(1), -1);

        engine.start_cuelist(1);
        assert_eq!(engine.current_cue(1), 0);

        engine.start_cuelist(1);
        assert_eq!(engine.current_cue(1), 1);

        engine.stop_cuelist(1);
        assert!(!engine.is_running(1));
    }

    #[test]
    fn test_pause_is_not_a_toggle() {
        let mut engine = VirtualEngine::new().with_cuelist(2, 1, None);
        engine.start_cuelist(2);

        engine.pause_cuelist(2);
        engine.pause_cuelist(2);
        assert!(engine.is_paused(2));

        engine.start_cuelist(2);
        assert!(!engine.is_paused(2));
        assert_eq!(engine.current_cue(2), 0);
    }

    #[test]
    fn test_group_members_are_exclusive() {
        let mut engine = VirtualEngine::new()
            .with_cuelist(3, 1, Some(9))
            .with_cuelist(7, 1, Some(9))
            .with_cuelist(8, 1, None);

        engine.start_cuelist(8);
        engine.start_cuelist(3);
        engine.start_cuelist(7);

        assert!(!engine.is_running(3));
        assert!(engine.is_running(7));
        assert!(engine.is_running(8));
        assert_eq!(engine.mutex_group_current(9), 7);
        assert_eq!(engine.mutex_group_current(4), -1);
    }

    #[test]
    fn test_vm_levels() {
        let mut engine = VirtualEngine::new();
        assert_eq!(engine.vm_level(3), None);

        engine.set_vm_level(3, 80, 2000);
        assert_eq!(
            engine.vm_level(3),
            Some(VmLevel {
                level: 80,
                fade_ms: 2000
            })
        );
    }

    #[test]
    fn test_missing_cuelist_queries() {
        let engine = VirtualEngine::new();
        assert_eq!(engine.cue_count(42), 0);
        assert_eq!(
            engine.cuelist_property(42, CuelistProperty::MutualExcludeGroup),
            -1
        );
        assert!(!engine.is_paused(42));
    }

    #[test]
    fn test_goto_cue_out_of_range() {
        let mut engine = VirtualEngine::new().recording().with_cuelist(1, 2, None);
        engine.goto_cue(1, 5, FadeSpec::Default);
        assert!(!engine.is_running(1));

        engine.goto_cue(1, 1, FadeSpec::Default);
        assert_eq!(engine.current_cue(1), 1);
        assert_eq!(engine.calls().len(), 2);
    }

    #[test]
    fn test_calls_not_kept_unless_recording() {
        let mut engine = VirtualEngine::new().with_cuelist(1, 2, None);
        for _ in 0..10_000 {
            engine.start_cuelist(1);
            engine.stop_cuelist(1);
        }
        assert!(engine.calls.is_none());
        assert!(engine.calls().is_empty());

        let mut engine = VirtualEngine::new().recording().with_cuelist(1, 2, None);
        engine.start_cuelist(1);
        assert_eq!(engine.calls(), &[EngineCall::StartCuelist(1)]);
    }

    #[test]
    fn test_call_display() {
        assert_eq!(EngineCall::StopAllCuelists.to_string(), "stop all cuelists");
        assert_eq!(
            EngineCall::SetVmLevel {
                vm: 3,
                level: 50,
                fade_ms: 10_000
            }
            .to_string(),
            "set VM 3 to 50 over 10000 ms"
        );
        assert_eq!(
            EngineCall::GotoCue {
                cuelist: 5,
                cue: 2,
                fade: FadeSpec::Default
            }
            .to_string(),
            "goto cuelist 5 cue 2 with default fade"
        );
    }
}
