use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{debug, error, info, warn, Level};

use prac::diag::{DiagLevel, Diagnostic};
use prac::document;
use prac::pass::PassId;
use prac::pipeline::{compute_provenance, run_pipeline, AnalysisState};
use prac::{Platform, Program};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    /// Fully analysed call-graph document (JSON)
    Annotated,
    /// Document after template filtering only (JSON)
    Filtered,
    /// One line per routine: position and templates
    Summary,
    /// Graphviz rendering of the analysed call graph
    Dot,
    /// Input hash and tool version (JSON)
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "prac",
    version,
    about = "Parallel Region Analysis for Call graphs: annotates routines relative to kernel regions"
)]
struct Cli {
    /// Input call-graph document (JSON)
    source: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target platform as named in template `appliesTo` lists ("CPU" or empty for CPU)
    #[arg(short = 'a', long, default_value = "")]
    applies_to: String,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Annotated)]
    emit: EmitStage,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print pass timing
    #[arg(long)]
    verbose: bool,
}

fn init_logging(debug: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn report(diag: &Diagnostic) {
    match diag.level {
        DiagLevel::Error => error!("{}", diag),
        DiagLevel::Warning => warn!("{}", diag),
    }
}

fn emit(cli: &Cli, text: &str) -> ExitCode {
    match &cli.output {
        Some(path) => {
            if let Err(e) = document::store(path, text) {
                error!("{}", e);
                return ExitCode::from(2);
            }
        }
        None => print!("{}", text),
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.log_file.as_deref()) {
        eprintln!("prac: error: cannot open log file: {}", e);
        return ExitCode::from(2);
    }

    let platform = Platform::parse(&cli.applies_to);
    if cli.verbose {
        info!("source   = {}", cli.source.display());
        info!("platform = {}", platform);
        info!("emit     = {:?}", cli.emit);
    }

    // ── Read codebase meta information ──
    let (source, doc) = match document::load(&cli.source) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let provenance = compute_provenance(&source);
    debug!(source_hash = %provenance.source_hash_hex(), "document loaded");
    if let EmitStage::BuildInfo = cli.emit {
        return match provenance.to_json() {
            Ok(text) => emit(&cli, &text),
            Err(e) => {
                error!("{}", e);
                ExitCode::from(2)
            }
        };
    }

    let program = match Program::from_document(doc) {
        Ok(p) => p,
        Err(e) => {
            report(&e.to_diagnostic());
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        info!(
            "loaded {} routines, {} calls, {} templates",
            program.routines.len(),
            program.calls.len(),
            program.templates.len()
        );
    }

    // ── Analysis passes ──
    let terminal = match cli.emit {
        EmitStage::Filtered => PassId::FilterTemplates,
        _ => PassId::AnalyzeRegions,
    };
    let mut state = AnalysisState::new(program, platform);
    let result = run_pipeline(&mut state, terminal, cli.verbose, |_, diags| {
        for diag in diags {
            report(diag);
        }
    });
    if let Err(e) = result {
        debug!("aborted in pass {:?}", e.failing_pass);
        return ExitCode::FAILURE;
    }

    if let Some(analysis) = &state.report {
        if cli.verbose {
            info!(
                "{} kernel regions analysed, {} positions propagated",
                analysis.kernels, analysis.assignments
            );
        }
    }

    // ── Output ──
    let text = match cli.emit {
        EmitStage::Annotated | EmitStage::Filtered => {
            match document::write_document(&state.program.to_document(), cli.pretty) {
                Ok(text) => text,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::from(2);
                }
            }
        }
        EmitStage::Summary => state.program.to_string(),
        EmitStage::Dot => prac::dot::emit_dot(&state.program),
        EmitStage::BuildInfo => unreachable!("build-info is emitted before analysis"),
    };
    emit(&cli, &text)
}
