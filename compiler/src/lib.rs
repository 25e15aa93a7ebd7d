// prac — Parallel Region Analysis for Call graphs
//
// Library root. Classifies every routine of a directive-annotated program
// relative to its kernel regions and propagates region templates along
// the call graph for the downstream code generator.

pub mod analysis;
pub mod call_index;
pub mod catalog;
pub mod conflict;
pub mod diag;
pub mod document;
pub mod dot;
pub mod error;
pub mod id;
pub mod pass;
pub mod pipeline;
pub mod program;
pub mod program_query;
pub mod promote;
pub mod propagate;
pub mod template_filter;

pub use analysis::{analyse_parallel_regions, AnalysisOptions, AnalysisReport};
pub use error::{AnalysisError, DocumentError};
pub use program::{Position, Program};
pub use template_filter::Platform;
