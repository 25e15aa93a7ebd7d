// pass.rs — Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the analysis passes (document load is outside the runner),
// their dependency edges, and the artifacts they produce. Used by the
// pipeline runner to compute minimal pass subsets for each --emit target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each analysis pass (document load happens before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    FilterTemplates,
    IndexCalls,
    CatalogRegions,
    AnalyzeRegions,
}

/// Machine-readable artifact identifiers. Each maps to a concrete value
/// in the analysis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Filtered,  // Program with narrowed region markers
    CallIndex, // CallGraphIndex
    Catalog,   // RegionCatalog
    Annotated, // Program with final positions + AnalysisReport
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about an analysis pass.
pub struct PassDescriptor {
    /// Human-readable name for verbose output.
    pub name: &'static str,
    /// Pass dependencies (other passes whose outputs this pass consumes).
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces.
    pub outputs: &'static [ArtifactId],
    /// Pre/post conditions (documentation only).
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::FilterTemplates => PassDescriptor {
            name: "filter_templates",
            inputs: &[],
            outputs: &[ArtifactId::Filtered],
            invariants: "every live region holds only templates applying to the platform",
        },
        PassId::IndexCalls => PassDescriptor {
            name: "index_calls",
            inputs: &[],
            outputs: &[ArtifactId::CallIndex],
            invariants: "callers/callees indexed in edge-list order",
        },
        PassId::CatalogRegions => PassDescriptor {
            name: "catalog_regions",
            inputs: &[PassId::FilterTemplates],
            outputs: &[ArtifactId::Catalog],
            invariants: "every region attached and named; one GPU region per routine",
        },
        PassId::AnalyzeRegions => PassDescriptor {
            name: "analyze_regions",
            inputs: &[PassId::IndexCalls, PassId::CatalogRegions],
            outputs: &[ArtifactId::Annotated],
            invariants: "positions consistent, all surviving regions promoted",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order (used for iteration).
pub const ALL_PASSES: [PassId; 4] = [
    PassId::FilterTemplates,
    PassId::IndexCalls,
    PassId::CatalogRegions,
    PassId::AnalyzeRegions,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_only_is_minimal() {
        assert_eq!(
            required_passes(PassId::FilterTemplates),
            vec![PassId::FilterTemplates]
        );
    }

    #[test]
    fn analyze_includes_all_in_order() {
        assert_eq!(
            required_passes(PassId::AnalyzeRegions),
            vec![
                PassId::IndexCalls,
                PassId::FilterTemplates,
                PassId::CatalogRegions,
                PassId::AnalyzeRegions,
            ]
        );
    }

    #[test]
    fn catalog_skips_call_index() {
        let passes = required_passes(PassId::CatalogRegions);
        assert!(!passes.contains(&PassId::IndexCalls));
        assert_eq!(passes.last(), Some(&PassId::CatalogRegions));
    }

    #[test]
    fn all_descriptors_have_outputs() {
        for pass in &ALL_PASSES {
            let desc = descriptor(*pass);
            assert!(
                !desc.outputs.is_empty(),
                "pass {:?} has no outputs declared",
                pass
            );
        }
    }

    #[test]
    fn dependencies_precede_dependents() {
        for pass in &ALL_PASSES {
            let order = required_passes(*pass);
            let self_pos = order.iter().position(|p| p == pass).unwrap();
            for dep in descriptor(*pass).inputs {
                let dep_pos = order.iter().position(|p| p == dep).unwrap();
                assert!(
                    dep_pos < self_pos,
                    "{:?} depends on {:?} but it comes later in topological order",
                    pass,
                    dep
                );
            }
        }
    }
}
