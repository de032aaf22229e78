use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sleepbands::{io::write_feature_csv, run_batch, PipelineConfig, SleepCassette, SubjectOutcome};

/// Exit status when no subject produced a feature row.
const EMPTY_RESULT: u8 = 2;

#[derive(Parser)]
#[command(name = "sleep-features", about = "Band-power features from Sleep-EDF recordings")]
struct Args {
    /// Directory holding *-PSG.edf and *-Hypnogram.edf files
    #[arg(long)]
    data_dir: PathBuf,

    /// Subject id, e.g. SC4001E0 (repeatable; default: every PSG in --data-dir)
    #[arg(long = "subject")]
    subjects: Vec<String>,

    /// JSON file overriding PipelineConfig defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV output path
    #[arg(long, default_value = "features.csv")]
    output: PathBuf,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let cfg = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    cfg.validate().context("invalid configuration")?;

    let ds = SleepCassette::new(&args.data_dir);
    let ids = if args.subjects.is_empty() {
        ds.discover()
            .with_context(|| format!("scanning {}", args.data_dir.display()))?
    } else {
        args.subjects.clone()
    };
    println!("{} subject(s) in {}", ids.len(), args.data_dir.display());

    // Subjects whose files cannot be located are reported alongside pipeline failures.
    let mut unresolved = Vec::new();
    let mut subjects = Vec::new();
    for id in &ids {
        match ds.resolve(id) {
            Ok(files) => subjects.push(files),
            Err(e) => {
                log::warn!("{id}: skipped ({}): {e}", e.kind());
                unresolved.push(SubjectOutcome { subject_id: id.clone(), result: Err(e) });
            }
        }
    }

    let mut report = run_batch(&subjects, &cfg, args.workers)?;
    report.outcomes.extend(unresolved);

    for (id, err) in report.failures() {
        println!("  skipped {id}: [{}] {err}", err.kind());
    }
    if report.is_empty_result() {
        eprintln!("no subject produced feature rows");
        return Ok(ExitCode::from(EMPTY_RESULT));
    }

    let tables = report.tables();
    let n = write_feature_csv(&tables, &args.output)?;
    println!("Written {n} rows from {} subject(s) → {}", tables.len(), args.output.display());
    Ok(ExitCode::SUCCESS)
}
