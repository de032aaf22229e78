//! EDF+ annotation decoding (time-stamped annotation lists, TALs).
//!
//! Each data record of an "EDF Annotations" signal holds NUL-separated TALs:
//! ```text
//! +Onset[\x15Duration]\x14Text\x14[Text\x14...]\x00
//! ```
//! The first TAL of every record only keeps time (empty text) and is skipped.
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::raw::open_raw;
use crate::annotations::{Annotation, AnnotationSet};

const TAL_END: u8 = 0x00;
const TEXT_SEP: u8 = 0x14;
const DURATION_SEP: u8 = 0x15;

/// Read every annotation of an EDF+ file (e.g. a Sleep-EDF hypnogram).
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<AnnotationSet> {
    let path = path.as_ref();
    let raw = open_raw(path)?;
    let ann_signals = raw.header.annotation_signals();
    if ann_signals.is_empty() {
        bail!("{} has no 'EDF Annotations' signal", path.display());
    }

    let bytes = raw.read_records()?;
    let record_bytes = raw.header.record_bytes();
    let mut items = Vec::new();
    for r in 0..raw.n_records {
        for &s in &ann_signals {
            let start = r * record_bytes + raw.header.signal_offset(s);
            let len = raw.header.signals[s].samples_per_record * 2;
            let tals = parse_tals(&bytes[start..start + len])
                .with_context(|| format!("record {r} of {}", path.display()))?;
            items.extend(tals);
        }
    }
    log::debug!("{}: {} annotations", path.display(), items.len());
    Ok(AnnotationSet::new(items))
}

/// Decode the TALs of one annotation-signal record.
pub fn parse_tals(bytes: &[u8]) -> Result<Vec<Annotation>> {
    let mut out = Vec::new();
    for tal in bytes.split(|&b| b == TAL_END).filter(|t| !t.is_empty()) {
        let mut parts = tal.split(|&b| b == TEXT_SEP);
        let stamp = parts.next().unwrap_or_default();
        let (onset, duration) = parse_stamp(stamp)?;
        for text in parts.filter(|p| !p.is_empty()) {
            let description = String::from_utf8_lossy(text).trim().to_string();
            out.push(Annotation { onset, duration, description });
        }
    }
    Ok(out)
}

fn parse_stamp(stamp: &[u8]) -> Result<(f64, f64)> {
    let stamp = std::str::from_utf8(stamp).context("TAL time stamp is not ASCII")?;
    let (onset_s, duration_s) = match stamp.split_once(DURATION_SEP as char) {
        Some((o, d)) => (o, Some(d)),
        None => (stamp, None),
    };
    if !onset_s.starts_with(['+', '-']) {
        bail!("TAL onset '{onset_s}' lacks a sign");
    }
    let onset: f64 = onset_s.parse().with_context(|| format!("invalid TAL onset '{onset_s}'"))?;
    let duration: f64 = match duration_s {
        Some(d) if !d.is_empty() => {
            d.parse().with_context(|| format!("invalid TAL duration '{d}'"))?
        }
        _ => 0.0,
    };
    if !onset.is_finite() || !duration.is_finite() || duration < 0.0 {
        bail!("TAL time stamp '{stamp}' is not a finite time");
    }
    Ok((onset, duration))
}
