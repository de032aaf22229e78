//! Per-subject feature pipeline and the batch runner.
//!
//! ```text
//! SubjectFiles ─ load_subject ─→ SubjectRecording
//!   ├─ pick channels
//!   ├─ band_pass            zero-phase FIR, l_freq..h_freq
//!   ├─ events + epochs      stage-anchored windows, drop-not-clip
//!   ├─ to_microvolts        explicit V → µV step
//!   ├─ estimate_psd         Welch, fmin..fmax
//!   └─ aggregate_bands      → FeatureTable
//! ```
//!
//! Subjects share nothing but the read-only [`PipelineConfig`]; [`run_batch`]
//! runs them on a rayon pool and keeps one [`SubjectOutcome`] per subject.
use std::path::PathBuf;

use rayon::prelude::*;

use crate::annotations::{events_from_annotations, AnnotationSet};
use crate::bands::aggregate_bands;
use crate::config::PipelineConfig;
use crate::demographics::parse_age;
use crate::edf::{open_raw, read_annotations};
use crate::epoch::epoch_events;
use crate::error::{PipelineError, Result};
use crate::features::FeatureTable;
use crate::filter::band_pass;
use crate::psd::estimate_psd;
use crate::scale::to_microvolts;
use crate::signal::{ChannelSelection, SignalSource};

/// Already-resolved input files of one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFiles {
    pub subject_id: String,
    pub psg: PathBuf,
    pub hypnogram: PathBuf,
}

/// Decoded inputs of one subject.
#[derive(Debug, Clone)]
pub struct SubjectRecording {
    pub subject_id: String,
    pub signal: SignalSource,
    pub annotations: AnnotationSet,
    pub age: Option<u32>,
}

/// Decode the PSG channels chosen by `selection`, the hypnogram, and the age.
pub fn load_subject(files: &SubjectFiles, selection: &ChannelSelection) -> Result<SubjectRecording> {
    let psg = files.psg.display().to_string();
    let raw = open_raw(&files.psg).map_err(|e| classify(&psg, e))?;
    let signal = raw.to_signal_source(selection).map_err(|e| classify(&psg, e))?;

    let hyp = files.hypnogram.display().to_string();
    let annotations = read_annotations(&files.hypnogram).map_err(|e| classify(&hyp, e))?;

    let age = parse_age(&raw.header.patient_id);
    if age.is_none() {
        log::debug!("{}: no age in patient field '{}'", files.subject_id, raw.header.patient_id);
    }

    Ok(SubjectRecording { subject_id: files.subject_id.clone(), signal, annotations, age })
}

/// Keep a pipeline error raised under the decoder, otherwise report the resource as unreadable.
fn classify(resource: &str, err: anyhow::Error) -> PipelineError {
    match err.downcast::<PipelineError>() {
        Ok(e) => e,
        Err(err) => PipelineError::unreadable(resource, &err),
    }
}

fn ensure_same_channels(stage: &str, expected: &[String], got: &[String]) -> Result<()> {
    if expected != got {
        return Err(PipelineError::InconsistentChannelSet(format!(
            "{stage}: expected {expected:?}, got {got:?}"
        )));
    }
    Ok(())
}

/// Run every stage on one decoded subject.
pub fn process_subject(rec: &SubjectRecording, cfg: &PipelineConfig) -> Result<FeatureTable> {
    cfg.validate()?;
    let signal = rec.signal.pick(&cfg.channels)?;
    // Rate-dependent PSD checks before the expensive filter.
    cfg.psd.validate(signal.sfreq())?;

    let filtered = band_pass(&signal, cfg.l_freq, cfg.h_freq)?;
    ensure_same_channels("filter", signal.ch_names(), filtered.ch_names())?;
    if filtered.n_times() != signal.n_times() {
        return Err(PipelineError::InconsistentChannelSet(format!(
            "filter changed length {} → {}",
            signal.n_times(),
            filtered.n_times()
        )));
    }

    let events = events_from_annotations(
        &rec.annotations,
        filtered.sfreq(),
        filtered.n_times(),
        &cfg.label_map,
        cfg.chunk_duration,
    );
    let epochs = epoch_events(&filtered, &events, cfg.epoch_dur)?;
    if epochs.is_empty() {
        return Err(PipelineError::NoEpochsProduced(rec.subject_id.clone()));
    }
    log::debug!(
        "{}: {} events → {} epochs of {} samples, by code {:?}",
        rec.subject_id,
        events.len(),
        epochs.len(),
        epochs.epoch_len(),
        epochs.counts_by_code()
    );

    let epochs = to_microvolts(epochs, cfg.data_scale);
    let estimate = estimate_psd(&epochs, &cfg.psd)?;
    ensure_same_channels("psd", epochs.ch_names(), estimate.ch_names())?;

    let bands = aggregate_bands(&estimate, &cfg.bands, cfg.aggregation)?;
    Ok(FeatureTable::new(rec.subject_id.clone(), rec.age, bands))
}

/// Result of one subject within a batch.
#[derive(Debug, Clone)]
pub struct SubjectOutcome {
    pub subject_id: String,
    pub result: Result<FeatureTable>,
}

/// Per-subject outcomes of a batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<SubjectOutcome>,
}

impl RunReport {
    /// Tables of the subjects that produced at least one row.
    pub fn tables(&self) -> Vec<&FeatureTable> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.subject_id.as_str(), e)))
            .collect()
    }

    /// No subject produced a feature row.
    pub fn is_empty_result(&self) -> bool {
        self.tables().is_empty()
    }
}

/// Load and process one subject, logging its outcome.
pub fn run_subject(files: &SubjectFiles, cfg: &PipelineConfig) -> SubjectOutcome {
    log::info!("{}: start", files.subject_id);
    let result = load_subject(files, &cfg.channels).and_then(|rec| process_subject(&rec, cfg));
    match &result {
        Ok(t) => log::info!("{}: {} rows, age {:?}", files.subject_id, t.n_rows(), t.age()),
        Err(e) => log::warn!("{}: skipped ({}): {e}", files.subject_id, e.kind()),
    }
    SubjectOutcome { subject_id: files.subject_id.clone(), result }
}

/// Run every subject on `workers` threads (`0` = one per core).
///
/// A failing subject never affects the others. Configuration errors are
/// returned before any subject starts.
pub fn run_batch(subjects: &[SubjectFiles], cfg: &PipelineConfig, workers: usize) -> Result<RunReport> {
    cfg.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sleepbands-worker-{i}"))
        .build()
        .map_err(|e| PipelineError::InvalidParameter(format!("worker pool: {e}")))?;

    let outcomes: Vec<SubjectOutcome> =
        pool.install(|| subjects.par_iter().map(|s| run_subject(s, cfg)).collect());

    let report = RunReport { outcomes };
    log::info!(
        "run finished: {} subject(s), {} with features, {} skipped",
        report.outcomes.len(),
        report.tables().len(),
        report.failures().len()
    );
    Ok(report)
}
