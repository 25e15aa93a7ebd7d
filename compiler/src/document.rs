// document.rs — JSON call-graph document (input and annotated output)
//
// Serde model of the interchange document. Field names follow the
// directive vocabulary (`parallelRegions`, `activeParallelRegions`,
// `templateRelations`, ...). Fields this pass does not interpret are kept
// in flattened `extra` maps and written back unchanged.
//
// Preconditions: none.
// Postconditions: `write_document(read_document(x))` preserves every field.
// Failure modes: I/O errors and malformed JSON → `DocumentError`.
// Side effects: filesystem reads/writes in `load`/`store` only.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentError;
use crate::program::Position;

/// The whole call-graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphDocument {
    #[serde(default)]
    pub routines: Vec<RoutineNode>,
    #[serde(default)]
    pub calls: Vec<CallNode>,
    #[serde(default)]
    pub parallel_region_templates: Vec<TemplateNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineNode {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Position::is_unset")]
    pub parallel_region_position: Position,
    /// Kernel region markers, consumed by the analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel_regions: Vec<RegionNode>,
    /// Merged, promoted regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_parallel_regions: Option<RegionNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A region container: a marker or the active-regions annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionNode {
    #[serde(default)]
    pub template_relations: Vec<TemplateRelationNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRelationNode {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNode {
    pub caller: String,
    pub callee: String,
    /// Call-site marker; `"surround"` means the call lies inside the
    /// caller's own parallel region body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_region_position: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Reading and writing ─────────────────────────────────────────────────────

pub fn read_document(text: &str) -> Result<CallGraphDocument, DocumentError> {
    Ok(serde_json::from_str(text)?)
}

pub fn write_document(doc: &CallGraphDocument, pretty: bool) -> Result<String, DocumentError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(doc)?
    } else {
        serde_json::to_string(doc)?
    };
    text.push('\n');
    Ok(text)
}

pub fn load(path: &Path) -> Result<(String, CallGraphDocument), DocumentError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = read_document(&text)?;
    Ok((text, doc))
}

pub fn store(path: &Path, text: &str) -> Result<(), DocumentError> {
    std::fs::write(path, text).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "routines": [
            {"name": "kernel", "sourceFile": "kernel.h90",
             "parallelRegions": [{"templateRelations": [{"id": "t1"}]}]},
            {"name": "driver", "parallelRegionPosition": ""}
        ],
        "calls": [{"caller": "driver", "callee": "kernel", "line": 12}],
        "parallelRegionTemplates": [{"id": "t1", "appliesTo": ["GPU"], "domName": ["x"]}],
        "modules": []
    }"#;

    #[test]
    fn reads_known_and_unknown_fields() {
        let doc = read_document(SAMPLE).unwrap();
        assert_eq!(doc.routines.len(), 2);
        assert_eq!(doc.routines[0].parallel_regions.len(), 1);
        assert_eq!(doc.routines[0].extra["sourceFile"], "kernel.h90");
        assert!(doc.routines[1].parallel_region_position.is_unset());
        assert_eq!(doc.calls[0].extra["line"], 12);
        assert_eq!(doc.parallel_region_templates[0].applies_to, vec!["GPU"]);
        assert!(doc.extra.contains_key("modules"));
    }

    #[test]
    fn unknown_fields_survive_a_write() {
        let doc = read_document(SAMPLE).unwrap();
        let text = write_document(&doc, false).unwrap();
        assert!(text.contains("\"sourceFile\":\"kernel.h90\""), "{text}");
        assert!(text.contains("\"domName\":[\"x\"]"), "{text}");
        assert!(!text.contains("parallelRegionPosition"), "{text}");
        assert_eq!(read_document(&text).unwrap(), doc);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = read_document("{\"routines\": [").unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }

    #[test]
    fn missing_file_names_path() {
        let err = load(Path::new("/nonexistent/prac/graph.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/prac/graph.json"));
    }
}
