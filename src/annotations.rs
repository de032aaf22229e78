//! Sleep-stage annotations and their conversion to sample-aligned events.
//!
//! Mirrors `mne.events_from_annotations`: each annotation whose description
//! is in the label map becomes one event at `round(onset × sfreq)`, or, with a
//! chunk duration, one event per complete chunk. Rounding is half-to-even, as
//! numpy's. Non-finite onsets never produce an event.
use std::collections::BTreeMap;

/// Raw annotation label → stage code. Several labels may share one code.
pub type LabelMap = BTreeMap<String, u8>;

/// One `(onset, duration, label)` marker, times in seconds from recording start.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub onset: f64,
    pub duration: f64,
    pub description: String,
}

impl Annotation {
    pub fn new(onset: f64, duration: f64, description: impl Into<String>) -> Self {
        Self { onset, duration, description: description.into() }
    }
}

/// Annotations ordered by onset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    items: Vec<Annotation>,
}

impl AnnotationSet {
    /// Stable-sorts by onset so the set is always non-decreasing.
    pub fn new(mut items: Vec<Annotation>) -> Self {
        items.sort_by(|a, b| a.onset.total_cmp(&b.onset));
        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of annotations per description, for logging and diagnostics.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut out = BTreeMap::new();
        for a in &self.items {
            *out.entry(a.description.as_str()).or_insert(0) += 1;
        }
        out
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        AnnotationSet::new(iter.into_iter().collect())
    }
}

/// A sample-aligned stage marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub sample: usize,
    pub code: u8,
}

/// Convert annotations to events on a `n_times`-sample timeline at `sfreq`.
///
/// Labels absent from `label_map` are skipped. Onsets that are not finite,
/// negative or at/after `n_times` are skipped. Output is in onset order.
pub fn events_from_annotations(
    annotations: &AnnotationSet,
    sfreq: f64,
    n_times: usize,
    label_map: &LabelMap,
    chunk_duration: Option<f64>,
) -> Vec<Event> {
    let mut events = Vec::new();
    for ann in annotations.iter() {
        let Some(&code) = label_map.get(&ann.description) else {
            continue;
        };
        for onset in chunk_onsets(ann, chunk_duration) {
            let sample = (onset * sfreq).round_ties_even();
            if !sample.is_finite() || sample < 0.0 || sample >= n_times as f64 {
                continue;
            }
            events.push(Event { sample: sample as usize, code });
        }
    }
    // Chunking can interleave onsets of overlapping annotations.
    events.sort_by_key(|e| e.sample);
    events
}

fn chunk_onsets(ann: &Annotation, chunk: Option<f64>) -> Vec<f64> {
    match chunk {
        Some(d) if d > 0.0 && ann.duration.is_finite() && ann.duration >= d => {
            // Tolerance keeps 30.0 / 30.0 from losing its last chunk to rounding.
            let n = ((ann.duration + 1e-9) / d).floor() as usize;
            (0..n).map(|k| ann.onset + k as f64 * d).collect()
        }
        _ => vec![ann.onset],
    }
}
