// program_query.rs — Read-only queries over an analysed program
//
// Helpers a code generator uses to pick launch and declaration strategies
// from the final positions and merged template sets.

use crate::program::{Position, Program, Routine};

/// How a call into a routine must be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStrategy {
    /// The callee hosts a kernel region: wrap it in region begin/end.
    KernelLaunch,
    /// The callee runs inside a kernel: a device-resident call.
    DeviceCall,
    /// The callee eventually reaches a kernel: an ordinary host-side call.
    HostCall,
    /// The callee is unrelated to any kernel.
    Plain,
}

impl CallStrategy {
    pub fn for_position(position: Position) -> Self {
        match position {
            Position::Within => CallStrategy::KernelLaunch,
            Position::Inside => CallStrategy::DeviceCall,
            Position::Outside => CallStrategy::HostCall,
            Position::Unset => CallStrategy::Plain,
        }
    }
}

/// Routines hosting a kernel region, in document order.
pub fn kernel_routines(program: &Program) -> impl Iterator<Item = &Routine> {
    program
        .routines
        .iter()
        .filter(|routine| routine.position == Position::Within)
}

/// Merged template ids of the routine named `name` (empty if unknown).
pub fn template_ids<'a>(program: &'a Program, name: &str) -> Vec<&'a str> {
    program
        .routine_named(name)
        .and_then(|routine| routine.active.as_ref())
        .map(|active| active.templates.iter().collect())
        .unwrap_or_default()
}

/// Strategy for a call to `callee`; unknown routines are `Plain`.
pub fn call_strategy(program: &Program, callee: &str) -> CallStrategy {
    program
        .routine_named(callee)
        .map(|routine| CallStrategy::for_position(routine.position))
        .unwrap_or(CallStrategy::Plain)
}
