//! Command handlers
//!
//! One function per opcode. Each reads its parameters from the message first,
//! so a malformed message fails before the engine is touched, then makes its
//! engine calls. Returning `Ok` marks the command as processed.

use crate::engine::{FadeSpec, ShowEngine};
use crate::protocol::{Message, ProtocolResult, ALL_CUELISTS};

use super::mutex;

/// `PC` - start cuelist `[0]`
pub fn play_cuelist(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let cuelist = message.param(0)?;
    engine.start_cuelist(cuelist);
    Ok(())
}

/// `PQ` - jump cuelist `[0]` to cue `[1]` with the default fade
pub fn play_cue(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let cuelist = message.param(0)?;
    let cue = message.param(1)?;
    engine.goto_cue(cuelist, cue, FadeSpec::Default);
    Ok(())
}

/// `IN` - set versatile master `[0]` to level `[1]` immediately
pub fn set_level(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let vm = message.param(0)?;
    let level = message.param(1)?;
    engine.set_vm_level(vm, level, 0);
    Ok(())
}

/// `AF` - fade versatile master `[0]` to level `[1]` over `[2]` seconds
pub fn auto_fade(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let vm = message.param(0)?;
    let level = message.param(1)?;
    let fade_ms = u32::from(message.param(2)?) * 1000;
    engine.set_vm_level(vm, level, fade_ms);
    Ok(())
}

/// `ST` - stop cuelist `[0]`, or every cuelist for 0
pub fn stop(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let cuelist = message.param(0)?;
    if cuelist == ALL_CUELISTS {
        engine.stop_all_cuelists();
    } else {
        engine.stop_cuelist(cuelist);
    }
    Ok(())
}

/// `TP` - start cuelist `[0]` if it is stopped, stop it otherwise
pub fn toggle_play(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let cuelist = message.param(0)?;
    if engine.current_cue(cuelist) < 0 {
        engine.start_cuelist(cuelist);
    } else {
        engine.stop_cuelist(cuelist);
    }
    Ok(())
}

/// `PP` - toggle pause on cuelist `[0]`.
///
/// Pause is always sent once. The state read before that call then decides
/// the second call: a paused cuelist is resumed, a running one paused again.
pub fn toggle_pause(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let cuelist = message.param(0)?;
    let was_paused = engine.is_paused(cuelist);

    engine.pause_cuelist(cuelist);

    if was_paused {
        engine.start_cuelist(cuelist);
    } else {
        engine.pause_cuelist(cuelist);
    }
    Ok(())
}

/// `NX` - play the next cuelist of mutex group `[0]`
pub fn next_mutex(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let group = message.param(0)?;
    engine.advance_mutex_group(group);

    match mutex::find_next(&*engine, group) {
        Some(cuelist) => engine.start_cuelist(cuelist),
        None => tracing::debug!("Mutex group {} has no next cuelist", group),
    }
    Ok(())
}

/// `PX` - play the previous cuelist of mutex group `[0]`
pub fn prev_mutex(engine: &mut dyn ShowEngine, message: &Message) -> ProtocolResult<()> {
    let group = message.param(0)?;
    engine.retreat_mutex_group(group);

    match mutex::find_prev(&*engine, group) {
        Some(cuelist) => engine.start_cuelist(cuelist),
        None => tracing::debug!("Mutex group {} has no previous cuelist", group),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, VirtualEngine};

    #[test]
    fn test_toggle_pause_from_running() {
        let mut engine = VirtualEngine::new().recording().with_cuelist(4, 2, None);
        engine.start_cuelist(4);
        engine.clear_calls();

        toggle_pause(&mut engine, &Message::new("PP004")).unwrap();

        assert_eq!(
            engine.calls(),
            &[EngineCall::PauseCuelist(4), EngineCall::PauseCuelist(4)]
        );
        assert!(engine.is_paused(4));
    }

    #[test]
    fn test_toggle_pause_from_paused() {
        let mut engine = VirtualEngine::new().recording().with_cuelist(4, 2, None);
        engine.start_cuelist(4);
        engine.pause_cuelist(4);
        engine.clear_calls();

        toggle_pause(&mut engine, &Message::new("PP004")).unwrap();

        assert_eq!(
            engine.calls(),
            &[EngineCall::PauseCuelist(4), EngineCall::StartCuelist(4)]
        );
        assert!(!engine.is_paused(4));
        assert!(engine.is_running(4));
    }

    #[test]
    fn test_params_read_before_engine_calls() {
        let mut engine = VirtualEngine::new().recording();
        let result = play_cue(&mut engine, &Message::new("PQ001"));
        assert!(result.is_err());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_next_mutex_without_members() {
        let mut engine = VirtualEngine::new().recording();
        next_mutex(&mut engine, &Message::new("NX003")).unwrap();
        assert_eq!(engine.calls(), &[EngineCall::AdvanceMutexGroup(3)]);
    }

    #[test]
    fn test_prev_mutex_plays_previous_member() {
        let mut engine = VirtualEngine::new().recording()
            .with_cuelist(2, 1, Some(1))
            .with_cuelist(6, 1, Some(1));
        engine.start_cuelist(6);
        engine.clear_calls();

        prev_mutex(&mut engine, &Message::new("PX001")).unwrap();

        assert_eq!(
            engine.calls(),
            &[EngineCall::RetreatMutexGroup(1), EngineCall::StartCuelist(2)]
        );
        assert!(engine.is_running(2));
        assert!(!engine.is_running(6));
    }
}
