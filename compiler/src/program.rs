// program.rs — Arena representation of the call graph under analysis
//
// Lowers a `CallGraphDocument` into flat vectors of routines, call edges,
// templates, and kernel region markers addressed by integer IDs, so the
// upward and downward propagators can share one mutable program without
// nested ownership. Converts back into a document after analysis.
//
// Preconditions: routine names are unique (empty names excepted).
// Postconditions: `Program::names` maps every non-empty routine name to its ID;
//                 region markers appear in document order.
// Failure modes: duplicated routine name → `AnalysisError::DuplicateRoutine`.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{
    CallGraphDocument, CallNode, RegionNode, RoutineNode, TemplateNode, TemplateRelationNode,
};
use crate::error::AnalysisError;
use crate::id::{EdgeId, IdAllocator, RegionId, RoutineId};

// ── Position ────────────────────────────────────────────────────────────────

/// Classification of a routine relative to kernel regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Unrelated to any kernel.
    #[default]
    #[serde(rename = "", alias = "unset")]
    Unset,
    /// Hosts a kernel region.
    Within,
    /// Transitively called from inside a kernel region.
    Inside,
    /// Transitively calls into a kernel.
    Outside,
}

impl Position {
    pub fn is_unset(&self) -> bool {
        *self == Position::Unset
    }

    /// True if `self` may be overwritten with `value` without conflict.
    pub fn accepts(self, value: Position) -> bool {
        self == Position::Unset || self == value
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Unset => "unset",
            Position::Within => "within",
            Position::Inside => "inside",
            Position::Outside => "outside",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Template relation sets ──────────────────────────────────────────────────

/// Insertion-ordered set of template ids. Duplicates are dropped by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet(Vec<String>);

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`; returns false if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id.to_string());
        true
    }

    /// Merge every id of `other`; returns how many were new.
    pub fn merge(&mut self, other: &TemplateSet) -> usize {
        other.iter().filter(|id| self.insert(id)).count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|existing| existing == id)
    }

    pub fn retain(&mut self, keep: impl FnMut(&String) -> bool) {
        self.0.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TemplateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TemplateSet::new();
        for id in iter {
            set.insert(id.as_ref());
        }
        set
    }
}

impl fmt::Display for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ── Arena records ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Routine {
    pub id: RoutineId,
    pub name: String,
    pub position: Position,
    /// The promoted/propagated `activeParallelRegions` container.
    pub active: Option<ActiveRegions>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveRegions {
    pub templates: TemplateSet,
    pub extra: Map<String, Value>,
}

/// A not-yet-promoted kernel region directive attached to one routine.
#[derive(Debug, Clone)]
pub struct RegionMarker {
    pub id: RegionId,
    pub owner: RoutineId,
    pub templates: TemplateSet,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct CallEdge {
    pub id: EdgeId,
    pub caller: String,
    pub callee: String,
    pub site: Option<String>,
    pub extra: Map<String, Value>,
}

impl CallEdge {
    /// True when the call site lies inside the caller's own kernel region.
    pub fn is_surround(&self) -> bool {
        self.site.as_deref() == Some("surround")
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub applies_to: Vec<String>,
    pub extra: Map<String, Value>,
}

// ── Program ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub routines: Vec<Routine>,
    pub calls: Vec<CallEdge>,
    pub templates: Vec<Template>,
    /// Kernel region markers; a slot becomes `None` once the marker is
    /// dropped by filtering or consumed by promotion.
    pub regions: Vec<Option<RegionMarker>>,
    pub names: HashMap<String, RoutineId>,
    pub extra: Map<String, Value>,
}

impl Program {
    /// Lower a parsed document into the arena.
    pub fn from_document(doc: CallGraphDocument) -> Result<Program, AnalysisError> {
        let mut ids = IdAllocator::new();
        let mut program = Program {
            extra: doc.extra,
            ..Program::default()
        };

        for node in doc.routines {
            let id = ids.alloc_routine();
            if !node.name.is_empty() && program.names.insert(node.name.clone(), id).is_some() {
                return Err(AnalysisError::DuplicateRoutine { name: node.name });
            }
            for region in node.parallel_regions {
                program.regions.push(Some(RegionMarker {
                    id: ids.alloc_region(),
                    owner: id,
                    templates: relation_set(&region.template_relations),
                    extra: region.extra,
                }));
            }
            program.routines.push(Routine {
                id,
                name: node.name,
                position: node.parallel_region_position,
                active: node.active_parallel_regions.map(|active| ActiveRegions {
                    templates: relation_set(&active.template_relations),
                    extra: active.extra,
                }),
                extra: node.extra,
            });
        }

        for node in doc.calls {
            program.calls.push(CallEdge {
                id: ids.alloc_edge(),
                caller: node.caller,
                callee: node.callee,
                site: node.parallel_region_position,
                extra: node.extra,
            });
        }

        program.templates = doc
            .parallel_region_templates
            .into_iter()
            .map(|node| Template {
                id: node.id,
                applies_to: node.applies_to,
                extra: node.extra,
            })
            .collect();

        Ok(program)
    }

    /// Raise the arena back into a document. Live region markers are
    /// written back under their owning routine.
    pub fn to_document(&self) -> CallGraphDocument {
        let mut routines: Vec<RoutineNode> = self
            .routines
            .iter()
            .map(|routine| RoutineNode {
                name: routine.name.clone(),
                parallel_region_position: routine.position,
                parallel_regions: Vec::new(),
                active_parallel_regions: routine.active.as_ref().map(|active| RegionNode {
                    template_relations: relation_nodes(&active.templates),
                    extra: active.extra.clone(),
                }),
                extra: routine.extra.clone(),
            })
            .collect();

        for marker in self.regions.iter().flatten() {
            if let Some(node) = routines.get_mut(marker.owner.index()) {
                node.parallel_regions.push(RegionNode {
                    template_relations: relation_nodes(&marker.templates),
                    extra: marker.extra.clone(),
                });
            }
        }

        CallGraphDocument {
            routines,
            calls: self
                .calls
                .iter()
                .map(|call| CallNode {
                    caller: call.caller.clone(),
                    callee: call.callee.clone(),
                    parallel_region_position: call.site.clone(),
                    extra: call.extra.clone(),
                })
                .collect(),
            parallel_region_templates: self
                .templates
                .iter()
                .map(|template| TemplateNode {
                    id: template.id.clone(),
                    applies_to: template.applies_to.clone(),
                    extra: template.extra.clone(),
                })
                .collect(),
            extra: self.extra.clone(),
        }
    }

    pub fn routine_id(&self, name: &str) -> Option<RoutineId> {
        self.names.get(name).copied()
    }

    pub fn routine(&self, id: RoutineId) -> Option<&Routine> {
        self.routines.get(id.index())
    }

    pub fn routine_mut(&mut self, id: RoutineId) -> Option<&mut Routine> {
        self.routines.get_mut(id.index())
    }

    pub fn routine_named(&self, name: &str) -> Option<&Routine> {
        self.routine_id(name).and_then(|id| self.routine(id))
    }

    /// First template with the given id.
    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.id == id)
    }

    pub fn region(&self, id: RegionId) -> Option<&RegionMarker> {
        self.regions.get(id.index()).and_then(Option::as_ref)
    }

    /// Live region markers in document order.
    pub fn live_regions(&self) -> impl Iterator<Item = (RegionId, &RegionMarker)> {
        self.regions
            .iter()
            .flatten()
            .map(|marker| (marker.id, marker))
    }

    /// IDs of live region markers owned by `owner`.
    pub fn regions_of(&self, owner: RoutineId) -> Vec<RegionId> {
        self.live_regions()
            .filter(|(_, marker)| marker.owner == owner)
            .map(|(id, _)| id)
            .collect()
    }

    /// Template relations a routine currently contributes to propagation:
    /// those of its live markers if it hosts any, else its active set.
    pub fn relations_of(&self, id: RoutineId) -> TemplateSet {
        let mut relations = TemplateSet::new();
        let mut has_marker = false;
        for (_, marker) in self.live_regions() {
            if marker.owner == id {
                has_marker = true;
                relations.merge(&marker.templates);
            }
        }
        if !has_marker {
            if let Some(active) = self.routine(id).and_then(|r| r.active.as_ref()) {
                relations.merge(&active.templates);
            }
        }
        relations
    }
}

fn relation_set(nodes: &[TemplateRelationNode]) -> TemplateSet {
    nodes.iter().map(|node| node.id.as_str()).collect()
}

fn relation_nodes(set: &TemplateSet) -> Vec<TemplateRelationNode> {
    set.iter()
        .map(|id| TemplateRelationNode { id: id.to_string() })
        .collect()
}

// ── Display ─────────────────────────────────────────────────────────────────

/// One line per routine: name, position, and merged templates.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for routine in &self.routines {
            write!(f, "{}: {}", routine.name, routine.position)?;
            if let Some(active) = &routine.active {
                write!(f, " {}", active.templates)?;
            }
            let pending = self.regions_of(routine.id).len();
            if pending > 0 {
                write!(f, " ({} unpromoted region(s))", pending)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
