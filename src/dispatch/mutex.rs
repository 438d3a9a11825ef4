//! Mutex group navigation
//!
//! Finds the neighbouring member of a mutex group relative to the cuelist the
//! engine reports as the group's current one. Group membership is read from
//! the engine for every candidate; nothing is cached here.

use crate::engine::{CuelistProperty, ShowEngine};
use crate::protocol::MAX_CUELIST;

/// Next cuelist after the group's current one, wrapping past [`MAX_CUELIST`].
pub fn find_next(engine: &dyn ShowEngine, group: u16) -> Option<u16> {
    let current = engine.mutex_group_current(group);
    let max = i32::from(MAX_CUELIST);

    let ahead = (current + 1).max(0)..=max;
    let behind = 0..=(current - 1).min(max);

    ahead
        .chain(behind)
        .find(|index| is_member(engine, *index, group))
        .and_then(to_index)
}

/// Previous cuelist before the group's current one, wrapping below zero.
pub fn find_prev(engine: &dyn ShowEngine, group: u16) -> Option<u16> {
    let current = engine.mutex_group_current(group);
    let max = i32::from(MAX_CUELIST);

    let behind = (0..=(current - 1).min(max)).rev();
    let ahead = ((current + 1).max(0)..=max).rev();

    behind
        .chain(ahead)
        .find(|index| is_member(engine, *index, group))
        .and_then(to_index)
}

/// A cuelist exists when it has at least one cue; only then is its group read
fn is_member(engine: &dyn ShowEngine, index: i32, group: u16) -> bool {
    let Some(cuelist) = to_index(index) else {
        return false;
    };
    engine.cue_count(cuelist) > 0
        && engine.cuelist_property(cuelist, CuelistProperty::MutualExcludeGroup)
            == i32::from(group)
}

fn to_index(index: i32) -> Option<u16> {
    u16::try_from(index).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VirtualEngine;

    const GROUP: u16 = 4;

    fn engine_with_group() -> VirtualEngine {
        VirtualEngine::new()
            .with_cuelist(3, 2, Some(GROUP))
            .with_cuelist(5, 2, Some(8))
            .with_cuelist(7, 1, Some(GROUP))
            .with_cuelist(12, 4, Some(GROUP))
            .with_cuelist(20, 0, Some(GROUP))
    }

    fn point_at(engine: &mut VirtualEngine, cuelist: u16) {
        engine.start_cuelist(cuelist);
        assert_eq!(engine.mutex_group_current(GROUP), i32::from(cuelist));
    }

    #[test]
    fn test_next_from_first_member() {
        let mut engine = engine_with_group();
        point_at(&mut engine, 3);
        assert_eq!(find_next(&engine, GROUP), Some(7));
    }

    #[test]
    fn test_next_wraps_to_lowest() {
        let mut engine = engine_with_group();
        point_at(&mut engine, 12);
        // 20 has no cues, so it does not count as a member
        assert_eq!(find_next(&engine, GROUP), Some(3));
    }

    #[test]
    fn test_prev_walks_down_and_wraps() {
        let mut engine = engine_with_group();
        point_at(&mut engine, 7);
        assert_eq!(find_prev(&engine, GROUP), Some(3));

        point_at(&mut engine, 3);
        assert_eq!(find_prev(&engine, GROUP), Some(12));
    }

    #[test]
    fn test_no_current_pointer() {
        let engine = engine_with_group();
        assert_eq!(find_next(&engine, GROUP), Some(3));
        assert_eq!(find_prev(&engine, GROUP), Some(12));
    }

    #[test]
    fn test_single_member_is_never_its_own_neighbour() {
        let mut engine = VirtualEngine::new().with_cuelist(6, 1, Some(GROUP));
        point_at(&mut engine, 6);
        assert_eq!(find_next(&engine, GROUP), None);
        assert_eq!(find_prev(&engine, GROUP), None);
    }

    #[test]
    fn test_empty_group() {
        let engine = engine_with_group();
        assert_eq!(find_next(&engine, 99), None);
        assert_eq!(find_prev(&engine, 99), None);
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        let mut engine = VirtualEngine::new()
            .with_cuelist(0, 1, Some(GROUP))
            .with_cuelist(MAX_CUELIST, 1, Some(GROUP))
            .with_cuelist(MAX_CUELIST + 1, 1, Some(GROUP));
        point_at(&mut engine, 0);
        assert_eq!(find_next(&engine, GROUP), Some(MAX_CUELIST));
        assert_eq!(find_prev(&engine, GROUP), Some(MAX_CUELIST));
    }
}
