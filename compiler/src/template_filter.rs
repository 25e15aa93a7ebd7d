// template_filter.rs — Platform applicability filtering of kernel regions
//
// Narrows each region marker's template relations to the templates that
// apply to the target platform, and drops markers left without any.
//
// Preconditions: every template relation names a template in the program.
// Postconditions: every live marker holds only applicable relations; a
//                 marker emptied by filtering is removed.
// Failure modes: unresolved template id → `AnalysisError::UnknownTemplate`.
// Side effects: mutates `Program::regions`.

use std::fmt;

use tracing::debug;

use crate::error::AnalysisError;
use crate::id::{RegionId, RoutineId};
use crate::program::{Program, Template};

// ── Platform ────────────────────────────────────────────────────────────────

/// Target platform for which regions are analysed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Platform {
    /// CPU or unspecified.
    #[default]
    Cpu,
    /// Any other platform, stored upper-cased and trimmed.
    Named(String),
}

impl Platform {
    /// Normalize a user-supplied platform string. Empty and "CPU" (any case)
    /// both mean the CPU platform.
    pub fn parse(raw: &str) -> Platform {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() || normalized == "CPU" {
            Platform::Cpu
        } else {
            Platform::Named(normalized)
        }
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Platform::Named(name) if name == "GPU")
    }

    pub fn is_cpu(&self) -> bool {
        *self == Platform::Cpu
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Cpu => f.write_str("CPU"),
            Platform::Named(name) => f.write_str(name),
        }
    }
}

/// True if `template` applies to `platform`.
///
/// An entry matches when it equals the platform case-insensitively. An
/// empty applicability list, or an empty/"CPU" entry, applies to the CPU
/// platform.
pub fn applies_to(template: &Template, platform: &Platform) -> bool {
    if template.applies_to.is_empty() {
        return platform.is_cpu();
    }
    template.applies_to.iter().any(|entry| {
        let entry = entry.trim().to_ascii_uppercase();
        match platform {
            Platform::Cpu => entry.is_empty() || entry == "CPU",
            Platform::Named(name) => entry == *name,
        }
    })
}

// ── Filtering ───────────────────────────────────────────────────────────────

/// Filter the region markers owned by one routine.
pub fn filter_routine(
    program: &mut Program,
    routine: RoutineId,
    platform: &Platform,
) -> Result<(), AnalysisError> {
    for region in program.regions_of(routine) {
        filter_region(program, region, platform)?;
    }
    Ok(())
}

/// Filter every routine's region markers, in routine order.
pub fn filter_all(program: &mut Program, platform: &Platform) -> Result<(), AnalysisError> {
    let total = program.routines.len();
    for i in 0..total {
        filter_routine(program, RoutineId(i as u32), platform)?;
        debug!("filtered routine {}/{}", i + 1, total);
    }
    Ok(())
}

fn filter_region(
    program: &mut Program,
    region: RegionId,
    platform: &Platform,
) -> Result<(), AnalysisError> {
    let Some(marker) = program.region(region) else {
        return Ok(());
    };
    if marker.templates.is_empty() {
        // Nothing to narrow; analysis reports the missing template.
        return Ok(());
    }

    let owner = marker.owner;
    let mut keep = Vec::new();
    for id in marker.templates.iter() {
        let template = program
            .template(id)
            .ok_or_else(|| AnalysisError::UnknownTemplate {
                id: id.to_string(),
                routine: owner_name(program, owner),
            })?;
        if applies_to(template, platform) {
            keep.push(id.to_string());
        } else {
            debug!(
                "dropping template '{}' from routine '{}' for {}",
                id,
                owner_name(program, owner),
                platform
            );
        }
    }

    let slot = &mut program.regions[region.index()];
    if keep.is_empty() {
        *slot = None;
    } else if let Some(marker) = slot {
        marker.templates.retain(|id| keep.contains(id));
    }
    Ok(())
}

fn owner_name(program: &Program, owner: RoutineId) -> String {
    program
        .routine(owner)
        .map(|routine| routine.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::read_document;
    use serde_json::Map;

    fn template(applies: &[&str]) -> Template {
        Template {
            id: "t".into(),
            applies_to: applies.iter().map(|s| s.to_string()).collect(),
            extra: Map::new(),
        }
    }

    fn program(json: &str) -> Program {
        Program::from_document(read_document(json).unwrap()).unwrap()
    }

    #[test]
    fn platform_normalization() {
        assert_eq!(Platform::parse(""), Platform::Cpu);
        assert_eq!(Platform::parse(" cpu "), Platform::Cpu);
        assert_eq!(Platform::parse("gpu"), Platform::Named("GPU".into()));
        assert!(Platform::parse("Gpu").is_gpu());
        assert!(!Platform::parse("XeonPhi").is_gpu());
    }

    #[test]
    fn gpu_template_applies_only_to_gpu() {
        let t = template(&["GPU"]);
        assert!(applies_to(&t, &Platform::parse("GPU")));
        assert!(applies_to(&t, &Platform::parse("gpu")));
        assert!(!applies_to(&t, &Platform::parse("")));
        assert!(!applies_to(&t, &Platform::parse("CPU")));
    }

    #[test]
    fn cpu_or_empty_template_applies_only_to_cpu() {
        for t in [template(&[]), template(&["CPU"]), template(&[" cpu"]), template(&[""])] {
            assert!(applies_to(&t, &Platform::parse("")));
            assert!(applies_to(&t, &Platform::parse("CPU")));
            assert!(!applies_to(&t, &Platform::parse("GPU")));
        }
    }

    #[test]
    fn mixed_template_applies_to_each_listed_platform() {
        let t = template(&["CPU", "GPU"]);
        assert!(applies_to(&t, &Platform::Cpu));
        assert!(applies_to(&t, &Platform::parse("GPU")));
        assert!(!applies_to(&t, &Platform::parse("FPGA")));
    }

    #[test]
    fn filtering_narrows_then_drops_markers() {
        let mut p = program(
            r#"{"routines": [
                {"name": "both", "parallelRegions": [{"templateRelations": [{"id": "g"}, {"id": "c"}]}]},
                {"name": "cpu_only", "parallelRegions": [{"templateRelations": [{"id": "c"}]}]}
            ],
            "parallelRegionTemplates": [
                {"id": "g", "appliesTo": ["GPU"]},
                {"id": "c", "appliesTo": ["CPU"]}
            ]}"#,
        );
        filter_all(&mut p, &Platform::parse("GPU")).unwrap();
        let both = p.region(RegionId(0)).unwrap();
        assert_eq!(both.templates.to_string(), "[g]");
        assert!(p.region(RegionId(1)).is_none());
        assert!(p.regions_of(RoutineId(1)).is_empty());
    }

    #[test]
    fn unknown_template_is_fatal() {
        let mut p = program(
            r#"{"routines": [
                {"name": "k", "parallelRegions": [{"templateRelations": [{"id": "missing"}]}]}
            ]}"#,
        );
        let err = filter_all(&mut p, &Platform::Cpu).unwrap_err();
        assert!(
            matches!(err, AnalysisError::UnknownTemplate { ref id, ref routine } if id == "missing" && routine == "k")
        );
    }
}
