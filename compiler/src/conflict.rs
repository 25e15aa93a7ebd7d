// conflict.rs — Kernel vs. kernel-wrapper call-site diagnostics (GPU only)
//
// A routine that calls a kernel directly and also calls a kernel wrapper
// (a routine whose own callees host a kernel region) mixes device
// attribute requirements at one call depth. This is advisory: findings are
// warnings and never abort the pass.
//
// The wrapper search looks exactly one level below the kernel's caller.
//
// Preconditions: `catalog` holds every kernel region surviving filtering.
// Postconditions: each offending caller is reported at most once per
//                 detector; only the first report carries the full text.
// Failure modes: index corruption → `AnalysisError::MalformedEdge`.
// Side effects: none (diagnostics are returned).

use std::collections::HashSet;

use crate::call_index::CallGraphIndex;
use crate::catalog::RegionCatalog;
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::error::AnalysisError;
use crate::program::{CallEdge, Program};

/// Tracks which callers have already been reported across one pass.
#[derive(Debug, Default)]
pub struct ConflictDetector {
    warned: HashSet<String>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the direct callers of kernel routine `kernel`.
    pub fn check_kernel(
        &mut self,
        program: &Program,
        index: &CallGraphIndex,
        catalog: &RegionCatalog,
        kernel: &str,
    ) -> Result<Vec<Diagnostic>, AnalysisError> {
        let mut diags = Vec::new();
        for call in index.callers_of(&program.calls, kernel)? {
            let caller = call.caller.as_str();
            let Some(wrapper_call) = first_kernel_wrapper_call(program, index, catalog, caller)?
            else {
                continue;
            };
            if self.warned.contains(caller) {
                continue;
            }
            let wrapper = wrapper_call.callee.as_str();
            let diag = if self.warned.is_empty() {
                Diagnostic::new(
                    DiagLevel::Warning,
                    format!(
                        "routine '{}' calls at least one kernel ('{}') and at least one kernel wrapper ('{}'); this may cause device attribute mismatch compiler errors",
                        caller, kernel, wrapper
                    ),
                )
                .with_code(codes::W0700)
                .with_hint(format!(
                    "wrap all kernels called by '{}' so that it does not call a mix of kernel wrappers and kernels",
                    caller
                ))
            } else {
                Diagnostic::new(
                    DiagLevel::Warning,
                    format!(
                        "...same for '{}': calls kernel '{}', kernel wrapper '{}'",
                        caller, kernel, wrapper
                    ),
                )
                .with_code(codes::W0701)
            };
            self.warned.insert(caller.to_string());
            diags.push(diag.with_subject(caller));
        }
        Ok(diags)
    }

    pub fn warned_callers(&self) -> usize {
        self.warned.len()
    }
}

/// First call from `caller` to a routine that itself calls a kernel.
fn first_kernel_wrapper_call<'a>(
    program: &'a Program,
    index: &CallGraphIndex,
    catalog: &RegionCatalog,
    caller: &str,
) -> Result<Option<&'a CallEdge>, AnalysisError> {
    for call in index.callees_of(&program.calls, caller)? {
        for sub_call in index.callees_of(&program.calls, &call.callee)? {
            if catalog.hosts_kernel(&sub_call.callee) {
                return Ok(Some(call));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::read_document;
    use crate::template_filter::Platform;

    fn setup(json: &str) -> (Program, CallGraphIndex, RegionCatalog) {
        let p = Program::from_document(read_document(json).unwrap()).unwrap();
        let index = CallGraphIndex::build(&p.calls);
        let catalog = RegionCatalog::build(&p, &Platform::parse("GPU")).unwrap();
        (p, index, catalog)
    }

    const MIXED: &str = r#"{
        "routines": [
            {"name": "a", "parallelRegions": [{"templateRelations": [{"id": "t"}]}]},
            {"name": "e", "parallelRegions": [{"templateRelations": [{"id": "t"}]}]},
            {"name": "b"}, {"name": "c"}, {"name": "d"}, {"name": "f"}, {"name": "g"}
        ],
        "calls": [
            {"caller": "b", "callee": "a"},
            {"caller": "c", "callee": "b"},
            {"caller": "c", "callee": "d"},
            {"caller": "d", "callee": "e"},
            {"caller": "c", "callee": "e"},
            {"caller": "f", "callee": "e"},
            {"caller": "f", "callee": "g"},
            {"caller": "g", "callee": "a"}
        ]
    }"#;

    #[test]
    fn clean_caller_has_no_warning() {
        let (p, index, catalog) = setup(MIXED);
        let mut detector = ConflictDetector::new();
        let diags = detector.check_kernel(&p, &index, &catalog, "a").unwrap();
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn first_conflict_is_full_then_abbreviated() {
        let (p, index, catalog) = setup(MIXED);
        let mut detector = ConflictDetector::new();
        let diags = detector.check_kernel(&p, &index, &catalog, "e").unwrap();
        assert_eq!(diags.len(), 2, "{diags:?}");

        assert_eq!(diags[0].code, Some(codes::W0700));
        assert_eq!(diags[0].subject.as_deref(), Some("c"));
        assert!(diags[0].message.contains("'c'"));
        assert!(diags[0].message.contains("('e')"));
        assert!(diags[0].message.contains("('b')"));
        assert!(diags[0].hint.is_some());

        assert_eq!(diags[1].code, Some(codes::W0701));
        assert_eq!(diags[1].subject.as_deref(), Some("f"));
        assert!(diags[1].message.starts_with("...same for 'f'"));
    }

    #[test]
    fn caller_is_never_warned_twice() {
        let (p, index, catalog) = setup(MIXED);
        let mut detector = ConflictDetector::new();
        detector.check_kernel(&p, &index, &catalog, "e").unwrap();
        let again = detector.check_kernel(&p, &index, &catalog, "e").unwrap();
        assert!(again.is_empty());
        assert_eq!(detector.warned_callers(), 2);
    }
}
