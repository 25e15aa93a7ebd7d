// dot.rs — Graphviz DOT output for annotated call graphs
//
// Renders routines as nodes coloured by position and call edges coloured
// by the call strategy the code generator will use for the callee.
//
// Preconditions: `program` is a lowered (usually analysed) Program.
// Postconditions: returns a valid DOT string representing the call graph.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::program::{Position, Program, Routine};
use crate::program_query::{call_strategy, CallStrategy};

/// Emit the program's call graph as a Graphviz DOT string.
pub fn emit_dot(program: &Program) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph callgraph {{").unwrap();
    writeln!(buf, "    rankdir=TB;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    if !program.routines.is_empty() {
        writeln!(buf).unwrap();
    }
    for routine in &program.routines {
        writeln!(buf, "    r{} [{}];", routine.id.0, node_attrs(routine)).unwrap();
    }

    let mut wrote_header = false;
    for call in &program.calls {
        let (Some(caller), Some(callee)) =
            (program.routine_id(&call.caller), program.routine_id(&call.callee))
        else {
            continue;
        };
        if !wrote_header {
            writeln!(buf).unwrap();
            wrote_header = true;
        }
        let color = edge_color(call_strategy(program, &call.callee));
        let style = if call.is_surround() { "bold" } else { "solid" };
        writeln!(
            buf,
            "    r{} -> r{} [color={color}, style={style}];",
            caller.0, callee.0
        )
        .unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Escape a label for use inside a double-quoted DOT string.
fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_attrs(routine: &Routine) -> String {
    let (shape, color) = match routine.position {
        Position::Within => ("box", "lightcoral"),
        Position::Inside => ("ellipse", "palegreen"),
        Position::Outside => ("ellipse", "lightblue"),
        Position::Unset => ("ellipse", "white"),
    };
    let mut label = escape(&routine.name);
    if !routine.position.is_unset() {
        write!(label, "\\n{}", routine.position).unwrap();
    }
    if let Some(active) = routine.active.as_ref().filter(|a| !a.templates.is_empty()) {
        write!(label, "\\n{}", escape(&active.templates.to_string())).unwrap();
    }
    format!("shape={shape}, style=filled, fillcolor={color}, label=\"{label}\"")
}

fn edge_color(strategy: CallStrategy) -> &'static str {
    match strategy {
        CallStrategy::KernelLaunch => "red",
        CallStrategy::DeviceCall => "darkgreen",
        CallStrategy::HostCall => "blue",
        CallStrategy::Plain => "gray50",
    }
}
