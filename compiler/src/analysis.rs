// analysis.rs — Parallel region analysis over the whole call graph
//
// For every kernel region in catalog order: mark its routine `within`,
// propagate `outside` to all transitive callers and `inside` to everything
// called from inside the region, promote the region marker, and (GPU only)
// check the kernel's callers for mixed kernel/kernel-wrapper calls.
//
// Preconditions: `program` has been filtered for `platform`; `index` and
//                `catalog` were built from the filtered program.
// Postconditions: every surviving region marker is promoted; positions and
//                 active template sets are final.
// Failure modes: any `AnalysisError`; the first one aborts the pass and
//                leaves assignments made so far in place.
// Side effects: mutates `program`; logs progress through `tracing`.

use tracing::{debug, info};

use crate::call_index::CallGraphIndex;
use crate::catalog::RegionCatalog;
use crate::conflict::ConflictDetector;
use crate::diag::Diagnostic;
use crate::error::{AnalysisError, Direction};
use crate::program::{Position, Program};
use crate::promote::promote_region;
use crate::propagate::{propagate_to_ancestors, propagate_to_descendants};
use crate::template_filter::{filter_all, Platform};

/// Library-level configuration of one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub platform: Platform,
}

impl AnalysisOptions {
    pub fn for_platform(raw: &str) -> Self {
        Self {
            platform: Platform::parse(raw),
        }
    }
}

/// Summary of a completed region analysis.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Kernel regions processed.
    pub kernels: usize,
    /// Position assignments made by propagation.
    pub assignments: usize,
    /// Advisory warnings (kernel/kernel-wrapper mixes).
    pub diagnostics: Vec<Diagnostic>,
}

/// Filter, index, catalog, and analyse in one call.
pub fn analyse_parallel_regions(
    program: &mut Program,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    info!("filtering parallel regions for {}", options.platform);
    filter_all(program, &options.platform)?;
    let index = CallGraphIndex::build(&program.calls);
    info!("populating parallel region cache");
    let catalog = RegionCatalog::build(program, &options.platform)?;
    analyse_regions(program, &index, &catalog, &options.platform)
}

/// Analyse every catalogued kernel region once, in catalog order.
pub fn analyse_regions(
    program: &mut Program,
    index: &CallGraphIndex,
    catalog: &RegionCatalog,
    platform: &Platform,
) -> Result<AnalysisReport, AnalysisError> {
    info!(kernels = catalog.len(), "parallel region analysis");
    let mut detector = ConflictDetector::new();
    let mut report = AnalysisReport::default();

    for (n, entry) in catalog.entries().iter().enumerate() {
        let Some(marker) = program.region(entry.region) else {
            continue;
        };
        if marker.templates.is_empty() {
            return Err(AnalysisError::MissingTemplate {
                routine: program
                    .routine(entry.routine)
                    .map(|routine| routine.name.clone())
                    .unwrap_or_default(),
            });
        }
        let routine = program
            .routine_mut(entry.routine)
            .ok_or(AnalysisError::DetachedRegion {
                region: entry.region.0,
            })?;
        if !routine.position.accepts(Position::Within) {
            return Err(AnalysisError::ConflictingPosition {
                routine: routine.name.clone(),
                existing: routine.position,
                requested: Position::Within,
                direction: Direction::Kernel,
            });
        }
        routine.position = Position::Within;
        let name = routine.name.clone();

        let upward = propagate_to_ancestors(program, index, entry.routine)?;
        let downward = propagate_to_descendants(program, index, entry.routine)?;
        promote_region(program, entry.region);
        debug!(
            kernel = %name,
            upward,
            downward,
            "region {}/{} analysed",
            n + 1,
            catalog.len()
        );
        report.kernels += 1;
        report.assignments += upward + downward;

        if platform.is_gpu() {
            let warnings = detector.check_kernel(program, index, catalog, &name)?;
            report.diagnostics.extend(warnings);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::read_document;

    fn program(json: &str) -> Program {
        Program::from_document(read_document(json).unwrap()).unwrap()
    }

    #[test]
    fn kernel_is_marked_within_and_promoted() {
        let mut p = program(
            r#"{"routines": [
                {"name": "k", "parallelRegions": [{"templateRelations": [{"id": "t"}]}]},
                {"name": "main"}
            ],
            "calls": [{"caller": "main", "callee": "k"}],
            "parallelRegionTemplates": [{"id": "t"}]}"#,
        );
        let report = analyse_parallel_regions(&mut p, &AnalysisOptions::default()).unwrap();
        assert_eq!(report.kernels, 1);
        assert_eq!(report.assignments, 1);
        let k = p.routine_named("k").unwrap();
        assert_eq!(k.position, Position::Within);
        assert_eq!(k.active.as_ref().unwrap().templates.to_string(), "[t]");
        assert!(p.live_regions().next().is_none());
        assert_eq!(p.routine_named("main").unwrap().position, Position::Outside);
    }

    #[test]
    fn kernel_already_propagated_to_conflicts() {
        let mut p = program(
            r#"{"routines": [
                {"name": "k", "parallelRegionPosition": "inside",
                 "parallelRegions": [{"templateRelations": [{"id": "t"}]}]}
            ],
            "parallelRegionTemplates": [{"id": "t"}]}"#,
        );
        let err = analyse_parallel_regions(&mut p, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ConflictingPosition {
                direction: Direction::Kernel,
                existing: Position::Inside,
                ..
            }
        ));
    }

    #[test]
    fn region_without_templates_is_fatal() {
        let mut p = program(r#"{"routines": [{"name": "k", "parallelRegions": [{}]}]}"#);
        let err = analyse_parallel_regions(&mut p, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTemplate { routine } if routine == "k"));
    }

    #[test]
    fn regions_filtered_away_do_not_participate() {
        let mut p = program(
            r#"{"routines": [
                {"name": "k", "parallelRegions": [{"templateRelations": [{"id": "gpu"}]}]},
                {"name": "main"}
            ],
            "calls": [{"caller": "main", "callee": "k"}],
            "parallelRegionTemplates": [{"id": "gpu", "appliesTo": ["GPU"]}]}"#,
        );
        let report = analyse_parallel_regions(&mut p, &AnalysisOptions::for_platform("cpu")).unwrap();
        assert_eq!(report.kernels, 0);
        assert_eq!(p.routine_named("k").unwrap().position, Position::Unset);
        assert_eq!(p.routine_named("main").unwrap().position, Position::Unset);
    }
}
