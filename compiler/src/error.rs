// error.rs — Fatal error types for document loading and region analysis
//
// Every `AnalysisError` aborts the run; none is recoverable. Each variant
// maps to a stable diagnostic code so the CLI can render it through the
// unified `Diagnostic` model.

use std::path::PathBuf;

use thiserror::Error;

use crate::diag::{codes, DiagCode, DiagLevel, Diagnostic};
use crate::program::Position;

/// Which way a propagation was walking when it hit a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Walking callers (ancestors) of a kernel.
    Upward,
    /// Walking callees (descendants) of a kernel.
    Downward,
    /// Marking the kernel routine itself as `within`.
    Kernel,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("call edge {edge} is indexed under '{key}' but its {role} is '{found}'")]
    MalformedEdge {
        edge: u32,
        key: String,
        role: &'static str,
        found: String,
    },

    #[error("multiple GPU parallel regions in routine '{routine}'")]
    DuplicateKernelRegion { routine: String },

    #[error("parallel region template id '{id}' referenced by routine '{routine}' cannot be matched")]
    UnknownTemplate { id: String, routine: String },

    #[error("{}", conflict_message(routine, *existing, *requested, *direction))]
    ConflictingPosition {
        routine: String,
        existing: Position,
        requested: Position,
        direction: Direction,
    },

    #[error("parallel region {region} is not attached to a routine")]
    DetachedRegion { region: u32 },

    #[error("kernel routine without name")]
    UnnamedKernel,

    #[error("routine '{routine}' hosts a parallel region but has no template applying to this platform")]
    MissingTemplate { routine: String },

    #[error("routine '{name}' is declared more than once")]
    DuplicateRoutine { name: String },
}

fn conflict_message(
    routine: &str,
    existing: Position,
    requested: Position,
    direction: Direction,
) -> String {
    let what = match direction {
        Direction::Upward => "contains one or more kernels and at the same time has one or more kernels in its inner call graph",
        Direction::Downward => "contains one or more kernels and at the same time is being called inside a kernel",
        Direction::Kernel => "contains one or more kernels and at the same time is either called by or calls one or more other kernels",
    };
    format!(
        "routine '{}' {} (position '{}', requested '{}')",
        routine, what, existing, requested
    )
}

impl AnalysisError {
    pub fn code(&self) -> DiagCode {
        match self {
            AnalysisError::MalformedEdge { .. } => codes::E0700,
            AnalysisError::DuplicateKernelRegion { .. } => codes::E0701,
            AnalysisError::UnknownTemplate { .. } => codes::E0702,
            AnalysisError::ConflictingPosition { .. } => codes::E0703,
            AnalysisError::DetachedRegion { .. } => codes::E0704,
            AnalysisError::UnnamedKernel => codes::E0705,
            AnalysisError::MissingTemplate { .. } => codes::E0706,
            AnalysisError::DuplicateRoutine { .. } => codes::E0707,
        }
    }

    /// Routine the error is about, if it names one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            AnalysisError::DuplicateKernelRegion { routine }
            | AnalysisError::UnknownTemplate { routine, .. }
            | AnalysisError::ConflictingPosition { routine, .. }
            | AnalysisError::MissingTemplate { routine } => Some(routine.as_str()),
            AnalysisError::DuplicateRoutine { name } => Some(name.as_str()),
            _ => None,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            AnalysisError::DuplicateKernelRegion { .. } => {
                Some("move each parallel region into its own routine")
            }
            AnalysisError::ConflictingPosition {
                direction: Direction::Upward,
                ..
            } => Some(
                "turn this routine into a kernel wrapper, putting its own parallel regions into separate routines",
            ),
            AnalysisError::ConflictingPosition {
                direction: Direction::Downward,
                ..
            } => Some(
                "call this routine from a wrapper instead, moving the other kernel into its own routine",
            ),
            AnalysisError::ConflictingPosition {
                direction: Direction::Kernel,
                ..
            } => Some("separate kernel routines from wrapper and inner routines"),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::new(DiagLevel::Error, self.to_string()).with_code(self.code());
        if let Some(routine) = self.subject() {
            diag = diag.with_subject(routine);
        }
        if let Some(hint) = self.hint() {
            diag = diag.with_hint(hint);
        }
        diag
    }
}

/// Failure to read, parse, or write a call-graph document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed call-graph document: {0}")]
    Json(#[from] serde_json::Error),
}
