// call_index.rs — Caller/callee adjacency over the flat call-edge list
//
// Preconditions: none.
// Postconditions: every edge appears once under its caller and once under
//                 its callee, in edge-list order.
// Failure modes: lookups verify that an indexed edge really has the queried
//                endpoint → `AnalysisError::MalformedEdge` otherwise.
// Side effects: none.

use std::collections::HashMap;

use crate::error::AnalysisError;
use crate::id::EdgeId;
use crate::program::CallEdge;

#[derive(Debug, Clone, Default)]
pub struct CallGraphIndex {
    callees_by_caller: HashMap<String, Vec<EdgeId>>,
    callers_by_callee: HashMap<String, Vec<EdgeId>>,
}

impl CallGraphIndex {
    pub fn build(calls: &[CallEdge]) -> Self {
        let mut index = CallGraphIndex::default();
        for (i, call) in calls.iter().enumerate() {
            let id = EdgeId(i as u32);
            index
                .callees_by_caller
                .entry(call.caller.clone())
                .or_default()
                .push(id);
            index
                .callers_by_callee
                .entry(call.callee.clone())
                .or_default()
                .push(id);
        }
        index
    }

    /// Edges whose caller is `caller`, in edge-list order.
    pub fn callees_of<'a>(
        &self,
        calls: &'a [CallEdge],
        caller: &str,
    ) -> Result<Vec<&'a CallEdge>, AnalysisError> {
        resolve(&self.callees_by_caller, calls, caller, "caller", |call| {
            &call.caller
        })
    }

    /// Edges whose callee is `callee`, in edge-list order.
    pub fn callers_of<'a>(
        &self,
        calls: &'a [CallEdge],
        callee: &str,
    ) -> Result<Vec<&'a CallEdge>, AnalysisError> {
        resolve(&self.callers_by_callee, calls, callee, "callee", |call| {
            &call.callee
        })
    }

    pub fn calls_anything(&self, caller: &str) -> bool {
        self.callees_by_caller.contains_key(caller)
    }
}

fn resolve<'a>(
    map: &HashMap<String, Vec<EdgeId>>,
    calls: &'a [CallEdge],
    key: &str,
    role: &'static str,
    endpoint: impl Fn(&CallEdge) -> &String,
) -> Result<Vec<&'a CallEdge>, AnalysisError> {
    let Some(ids) = map.get(key) else {
        return Ok(Vec::new());
    };
    ids.iter()
        .map(|id| {
            let found = calls.get(id.index()).map(|call| (call, endpoint(call)));
            match found {
                Some((call, name)) if name == key => Ok(call),
                other => Err(AnalysisError::MalformedEdge {
                    edge: id.0,
                    key: key.to_string(),
                    role,
                    found: other.map(|(_, name)| name.clone()).unwrap_or_default(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn edge(i: u32, caller: &str, callee: &str) -> CallEdge {
        CallEdge {
            id: EdgeId(i),
            caller: caller.into(),
            callee: callee.into(),
            site: None,
            extra: Map::new(),
        }
    }

    fn names(edges: &[&CallEdge], f: impl Fn(&CallEdge) -> &str) -> Vec<String> {
        edges.iter().map(|e| f(e).to_string()).collect()
    }

    #[test]
    fn preserves_edge_order_per_key() {
        let calls = vec![
            edge(0, "main", "b"),
            edge(1, "x", "b"),
            edge(2, "main", "a"),
            edge(3, "main", "c"),
        ];
        let index = CallGraphIndex::build(&calls);
        let callees = index.callees_of(&calls, "main").unwrap();
        assert_eq!(names(&callees, |e| e.callee.as_str()), vec!["b", "a", "c"]);
        let callers = index.callers_of(&calls, "b").unwrap();
        assert_eq!(names(&callers, |e| e.caller.as_str()), vec!["main", "x"]);
    }

    #[test]
    fn unknown_key_has_no_edges() {
        let calls = vec![edge(0, "main", "b")];
        let index = CallGraphIndex::build(&calls);
        assert!(index.callers_of(&calls, "main").unwrap().is_empty());
        assert!(index.calls_anything("main"));
        assert!(!index.calls_anything("b"));
    }

    #[test]
    fn stale_index_is_malformed() {
        let original = vec![edge(0, "main", "b")];
        let index = CallGraphIndex::build(&original);
        let rewired = vec![edge(0, "main", "c")];
        let err = index.callers_of(&rewired, "b").unwrap_err();
        match err {
            AnalysisError::MalformedEdge {
                edge, key, found, ..
            } => {
                assert_eq!(edge, 0);
                assert_eq!(key, "b");
                assert_eq!(found, "c");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn index_past_edge_list_is_malformed() {
        let original = vec![edge(0, "main", "b"), edge(1, "main", "c")];
        let index = CallGraphIndex::build(&original);
        let err = index.callees_of(&original[..1], "main").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedEdge { edge: 1, .. }));
    }
}
