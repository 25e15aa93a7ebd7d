// catalog.rs — Kernel region catalog: routine → hosted region marker
//
// Preconditions: template filtering has run for the chosen platform.
// Postconditions: `entries` lists every live marker in document order;
//                 `by_name` maps each kernel routine name to its last marker.
// Failure modes: marker owner outside the routine arena → `DetachedRegion`;
//                kernel routine with an empty name → `UnnamedKernel`;
//                a second marker on one routine for GPU → `DuplicateKernelRegion`.
// Side effects: none.

use std::collections::HashMap;

use crate::error::AnalysisError;
use crate::id::{RegionId, RoutineId};
use crate::program::Program;
use crate::template_filter::Platform;

/// One live kernel region and the routine hosting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub region: RegionId,
    pub routine: RoutineId,
}

#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, RegionId>,
}

impl RegionCatalog {
    pub fn build(program: &Program, platform: &Platform) -> Result<Self, AnalysisError> {
        let mut catalog = RegionCatalog::default();
        for (region, marker) in program.live_regions() {
            let routine = program
                .routine(marker.owner)
                .ok_or(AnalysisError::DetachedRegion { region: region.0 })?;
            if routine.name.is_empty() {
                return Err(AnalysisError::UnnamedKernel);
            }
            let previous = catalog.by_name.insert(routine.name.clone(), region);
            if platform.is_gpu() && previous.is_some() {
                return Err(AnalysisError::DuplicateKernelRegion {
                    routine: routine.name.clone(),
                });
            }
            catalog.entries.push(CatalogEntry {
                region,
                routine: routine.id,
            });
        }
        Ok(catalog)
    }

    /// Live kernel regions in discovery order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn hosts_kernel(&self, routine: &str) -> bool {
        self.by_name.contains_key(routine)
    }

    pub fn region_of(&self, routine: &str) -> Option<RegionId> {
        self.by_name.get(routine).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
