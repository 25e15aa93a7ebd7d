// pipeline.rs — Analysis state and pass orchestration
//
// Holds the program and all pass artifacts, and runs the minimal set of
// passes for a given terminal PassId.
//
// Preconditions: the program has been lowered from its document.
// Postconditions: artifacts for all required passes are populated, or has_error is set.
// Failure modes: any pass returning an `AnalysisError` (converted to an
//                error-level diagnostic).
// Side effects: calls on_pass_complete callback after each pass for immediate display.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::analysis::{analyse_regions, AnalysisReport};
use crate::call_index::CallGraphIndex;
use crate::catalog::RegionCatalog;
use crate::diag::{has_errors, DiagLevel, Diagnostic};
use crate::error::AnalysisError;
use crate::pass::{descriptor, required_passes, PassId};
use crate::program::Program;
use crate::template_filter::{filter_all, Platform};

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for `--emit build-info`.
///
/// `source_hash`: SHA-256 of the raw input document text.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    compiler_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.source_hash {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
        }
        s
    }

    /// Serialize provenance as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let info = BuildInfo {
            source_hash: self.source_hash_hex(),
            compiler_version: self.compiler_version,
        };
        let mut text = serde_json::to_string_pretty(&info)?;
        text.push('\n');
        Ok(text)
    }
}

/// Compute provenance from the raw document text.
pub fn compute_provenance(source: &str) -> Provenance {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let mut source_hash = [0u8; 32];
    source_hash.copy_from_slice(&hasher.finalize());

    Provenance {
        source_hash,
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Analysis state ─────────────────────────────────────────────────────────

/// Holds the program, pass artifacts, and accumulated diagnostics.
pub struct AnalysisState {
    pub program: Program,
    pub platform: Platform,
    pub index: Option<CallGraphIndex>,
    pub catalog: Option<RegionCatalog>,
    pub report: Option<AnalysisReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl AnalysisState {
    pub fn new(program: Program, platform: Platform) -> Self {
        Self {
            program,
            platform,
            index: None,
            catalog: None,
            report: None,
            diagnostics: Vec::new(),
            has_error: false,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The specific diagnostics are available in `AnalysisState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
}

/// Per-pass post-processing: callback, accumulate, verbose, error check.
fn finish_pass(
    state: &mut AnalysisState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    verbose: bool,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_errors(&diags);
    state.diagnostics.extend(diags);
    if verbose {
        info!(
            "{} complete, {:.1}ms",
            descriptor(pass_id).name,
            elapsed.as_secs_f64() * 1000.0
        );
    }
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

fn error_diags(err: AnalysisError) -> Vec<Diagnostic> {
    vec![err.to_diagnostic()]
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → verbose → error check.
pub fn run_pipeline(
    state: &mut AnalysisState,
    terminal: PassId,
    verbose: bool,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let diags = match pass_id {
            PassId::FilterTemplates => {
                info!("filtering parallel regions for {}", state.platform);
                match filter_all(&mut state.program, &state.platform) {
                    Ok(()) => Vec::new(),
                    Err(err) => error_diags(err),
                }
            }
            PassId::IndexCalls => {
                state.index = Some(CallGraphIndex::build(&state.program.calls));
                Vec::new()
            }
            PassId::CatalogRegions => {
                info!("populating parallel region cache");
                match RegionCatalog::build(&state.program, &state.platform) {
                    Ok(catalog) => {
                        state.catalog = Some(catalog);
                        Vec::new()
                    }
                    Err(err) => error_diags(err),
                }
            }
            PassId::AnalyzeRegions => match (&state.index, &state.catalog) {
                (Some(index), Some(catalog)) => {
                    match analyse_regions(&mut state.program, index, catalog, &state.platform) {
                        Ok(mut report) => {
                            let warnings = std::mem::take(&mut report.diagnostics);
                            state.report = Some(report);
                            warnings
                        }
                        Err(err) => error_diags(err),
                    }
                }
                _ => vec![Diagnostic::new(
                    DiagLevel::Error,
                    "region analysis ran without call index or region catalog",
                )],
            },
        };
        finish_pass(
            state,
            pass_id,
            diags,
            t.elapsed(),
            verbose,
            &mut on_pass_complete,
        )?;
    }
    Ok(())
}
