// Snapshot tests: lock the summary and DOT renderings of analysed call graphs.
//
// Uses the library API (load → lower → pipeline → display) directly.
// Snapshots are managed by `insta` and stored under `compiler/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::{Path, PathBuf};

use prac::pass::PassId;
use prac::pipeline::{run_pipeline, AnalysisState};
use prac::{Platform, Program};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(name: &str, platform: &str, terminal: PassId) -> Program {
    let (_, doc) = prac::document::load(&fixture_path(name))
        .unwrap_or_else(|e| panic!("cannot load {}: {}", name, e));
    let program = Program::from_document(doc).unwrap();
    let mut state = AnalysisState::new(program, Platform::parse(platform));
    run_pipeline(&mut state, terminal, false, |_, _| {})
        .unwrap_or_else(|e| panic!("{} failed in {:?}", name, e.failing_pass));
    state.program
}

#[test]
fn summary_stencil_cpu() {
    let program = run("stencil.json", "", PassId::AnalyzeRegions);
    insta::assert_snapshot!("summary_stencil_cpu", program.to_string());
}

#[test]
fn summary_stencil_gpu_filtered() {
    let program = run("stencil.json", "GPU", PassId::FilterTemplates);
    insta::assert_snapshot!("summary_stencil_gpu_filtered", program.to_string());
}

#[test]
fn summary_mixed_wrappers_gpu() {
    let program = run("mixed_wrappers.json", "GPU", PassId::AnalyzeRegions);
    insta::assert_snapshot!("summary_mixed_wrappers_gpu", program.to_string());
}

#[test]
fn dot_stencil_cpu() {
    let program = run("stencil.json", "", PassId::AnalyzeRegions);
    insta::assert_snapshot!("dot_stencil_cpu", prac::dot::emit_dot(&program));
}
