// propagate.rs — Transitive position and template propagation from a kernel
//
// Upward: every transitive caller of a kernel routine becomes `outside`.
// Downward: every routine reached from inside the kernel region becomes
// `inside`. Out of the kernel itself only "surround" call edges are
// followed; below that every call edge is followed. Each visited routine
// receives the template relations of the routine it was reached from.
//
// Preconditions: the origin routine exists; `index` was built from
//                `program.calls`.
// Postconditions: on success, every reached routine carries the propagated
//                 position and a superset of the relations flowing into it.
// Failure modes: a reached routine already carries a different position
//                → `AnalysisError::ConflictingPosition` (assignments made
//                before the conflict are kept); index corruption
//                → `AnalysisError::MalformedEdge`.
// Side effects: mutates routine positions and active template sets.

use std::collections::HashSet;

use tracing::debug;

use crate::call_index::CallGraphIndex;
use crate::error::{AnalysisError, Direction};
use crate::id::RoutineId;
use crate::program::{ActiveRegions, Position, Program, TemplateSet};

/// Position assigned to routines reached in `direction`.
pub fn propagated_position(direction: Direction) -> Position {
    match direction {
        Direction::Upward => Position::Outside,
        Direction::Downward => Position::Inside,
        Direction::Kernel => Position::Within,
    }
}

/// Mark all transitive callers of `origin` as `outside`.
/// Returns the number of assignments made.
pub fn propagate_to_ancestors(
    program: &mut Program,
    index: &CallGraphIndex,
    origin: RoutineId,
) -> Result<usize, AnalysisError> {
    propagate(program, index, origin, Direction::Upward)
}

/// Mark all routines called from inside `origin`'s kernel region as `inside`.
/// Returns the number of assignments made.
pub fn propagate_to_descendants(
    program: &mut Program,
    index: &CallGraphIndex,
    origin: RoutineId,
) -> Result<usize, AnalysisError> {
    propagate(program, index, origin, Direction::Downward)
}

fn propagate(
    program: &mut Program,
    index: &CallGraphIndex,
    origin: RoutineId,
    direction: Direction,
) -> Result<usize, AnalysisError> {
    let mut walker = Walker {
        program,
        index,
        direction,
        value: propagated_position(direction),
        visited: HashSet::from([origin]),
    };
    walker.walk(origin)
}

struct Walker<'a> {
    program: &'a mut Program,
    index: &'a CallGraphIndex,
    direction: Direction,
    value: Position,
    /// Routines reached by this traversal, origin included. Re-entry is a
    /// no-op when the position matches and a conflict otherwise.
    visited: HashSet<RoutineId>,
}

impl Walker<'_> {
    fn walk(&mut self, from: RoutineId) -> Result<usize, AnalysisError> {
        let Some(routine) = self.program.routine(from) else {
            return Ok(0);
        };
        let name = routine.name.clone();
        let surround_only = routine.position == Position::Within;
        let relations = self.program.relations_of(from);

        let next: Vec<String> = match self.direction {
            Direction::Upward => self
                .index
                .callers_of(&self.program.calls, &name)?
                .into_iter()
                .map(|call| call.caller.clone())
                .collect(),
            _ => self
                .index
                .callees_of(&self.program.calls, &name)?
                .into_iter()
                .filter(|call| !surround_only || call.is_surround())
                .map(|call| call.callee.clone())
                .collect(),
        };

        let mut assigned = 0;
        for target_name in next {
            let Some(target) = self.program.routine_id(&target_name) else {
                debug!(routine = %target_name, "call edge names an unknown routine; skipped");
                continue;
            };
            if !self.visited.insert(target) {
                self.check(target)?;
                continue;
            }
            self.assign(target, &relations)?;
            assigned += 1 + self.walk(target)?;
        }
        Ok(assigned)
    }

    fn check(&self, target: RoutineId) -> Result<(), AnalysisError> {
        match self.program.routine(target) {
            Some(routine) if !routine.position.accepts(self.value) => {
                Err(AnalysisError::ConflictingPosition {
                    routine: routine.name.clone(),
                    existing: routine.position,
                    requested: self.value,
                    direction: self.direction,
                })
            }
            _ => Ok(()),
        }
    }

    fn assign(&mut self, target: RoutineId, relations: &TemplateSet) -> Result<(), AnalysisError> {
        self.check(target)?;
        let Some(routine) = self.program.routine_mut(target) else {
            return Ok(());
        };
        routine.position = self.value;
        if !relations.is_empty() {
            routine
                .active
                .get_or_insert_with(ActiveRegions::default)
                .templates
                .merge(relations);
        }
        debug!(routine = %routine.name, position = %self.value, "propagated");
        Ok(())
    }
}
