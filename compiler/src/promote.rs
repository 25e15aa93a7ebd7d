// promote.rs — Promotion of kernel region markers into active regions
//
// Moves a marker's template relations (and any extra fields) into its
// routine's `activeParallelRegions` container, creating the container if
// propagation did not already, then discards the marker. Promotion is
// idempotent: a consumed marker slot is empty, so a second run does nothing.

use crate::id::{RegionId, RoutineId};
use crate::program::{ActiveRegions, Program};

/// Promote one region marker. Returns false if it was already consumed.
pub fn promote_region(program: &mut Program, region: RegionId) -> bool {
    let Some(marker) = program
        .regions
        .get_mut(region.index())
        .and_then(Option::take)
    else {
        return false;
    };
    let Some(routine) = program.routine_mut(marker.owner) else {
        return false;
    };
    let active = routine.active.get_or_insert_with(ActiveRegions::default);
    active.templates.merge(&marker.templates);
    for (key, value) in marker.extra {
        active.extra.entry(key).or_insert(value);
    }
    true
}

/// Promote every live marker owned by `routine`. Returns how many moved.
pub fn promote_routine(program: &mut Program, routine: RoutineId) -> usize {
    program
        .regions_of(routine)
        .into_iter()
        .filter(|&region| promote_region(program, region))
        .count()
}
