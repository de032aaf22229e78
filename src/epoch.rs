//! Event-anchored fixed-length epoching.
//!
//! Each event opens one window of `round(epoch_dur × sfreq) + 1` samples,
//! rounding half to even, starting at the event sample (MNE `Epochs(tmin=0, tmax=epoch_dur)`, both
//! ends inclusive). A window that would run past the end of the recording is
//! dropped, never clipped or padded. No baseline correction is applied.
use std::collections::BTreeMap;

use ndarray::{s, Array3, ArrayView2};

use crate::annotations::{events_from_annotations, AnnotationSet, Event, LabelMap};
use crate::error::{PipelineError, Result};
use crate::signal::SignalSource;

/// Samples per epoch for a duration in seconds (inclusive end point).
pub fn epoch_length(epoch_dur: f64, sfreq: f64) -> usize {
    (epoch_dur * sfreq).round_ties_even() as usize + 1
}

/// A single epoch borrowed from [`Epochs`].
#[derive(Debug, Clone, Copy)]
pub struct Epoch<'a> {
    pub label_code: u8,
    pub start_sample: usize,
    /// `[C, epoch_len]`
    pub data: ArrayView2<'a, f64>,
}

/// All retained epochs of one recording, in onset order.
#[derive(Debug, Clone, PartialEq)]
pub struct Epochs {
    ch_names: Vec<String>,
    sfreq: f64,
    codes: Vec<u8>,
    starts: Vec<usize>,
    /// `[E, C, epoch_len]`
    data: Array3<f64>,
}

impl Epochs {
    /// Assemble epochs from raw parts; `codes`/`starts` must have one entry per epoch.
    pub fn from_parts(
        ch_names: Vec<String>,
        sfreq: f64,
        codes: Vec<u8>,
        starts: Vec<usize>,
        data: Array3<f64>,
    ) -> Result<Self> {
        let (n_e, n_c, _) = data.dim();
        if ch_names.is_empty() {
            return Err(PipelineError::InconsistentChannelSet("epochs have no channels".into()));
        }
        if n_c != ch_names.len() {
            return Err(PipelineError::InconsistentChannelSet(format!(
                "{} channel names for {n_c} epoch rows",
                ch_names.len()
            )));
        }
        if codes.len() != n_e || starts.len() != n_e {
            return Err(PipelineError::InvalidParameter(format!(
                "{n_e} epochs but {} codes and {} starts",
                codes.len(),
                starts.len()
            )));
        }
        Ok(Self { ch_names, sfreq, codes, starts, data })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    #[inline]
    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    #[inline]
    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    /// Samples per epoch.
    #[inline]
    pub fn epoch_len(&self) -> usize {
        self.data.dim().2
    }

    /// Stage code of every epoch.
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Start sample of every epoch.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// `[E, C, epoch_len]`
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    pub fn get(&self, i: usize) -> Option<Epoch<'_>> {
        (i < self.len()).then(|| Epoch {
            label_code: self.codes[i],
            start_sample: self.starts[i],
            data: self.data.slice(s![i, .., ..]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Epoch<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Epoch count per stage code.
    pub fn counts_by_code(&self) -> BTreeMap<u8, usize> {
        let mut out = BTreeMap::new();
        for &c in &self.codes {
            *out.entry(c).or_insert(0) += 1;
        }
        out
    }
}

/// Epoch `signal` at every annotation whose label is in `label_map`.
///
/// Returns an empty [`Epochs`] (not an error) when nothing is usable.
pub fn epoch(
    signal: &SignalSource,
    annotations: &AnnotationSet,
    label_map: &LabelMap,
    epoch_dur: f64,
) -> Result<Epochs> {
    let events =
        events_from_annotations(annotations, signal.sfreq(), signal.n_times(), label_map, None);
    epoch_events(signal, &events, epoch_dur)
}

/// Cut one window per event. `events` must be in onset order.
pub fn epoch_events(signal: &SignalSource, events: &[Event], epoch_dur: f64) -> Result<Epochs> {
    if !(epoch_dur.is_finite() && epoch_dur > 0.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "epoch duration must be positive, got {epoch_dur}"
        )));
    }
    let n_t = signal.n_times();
    let len = epoch_length(epoch_dur, signal.sfreq());

    let kept: Vec<&Event> = events.iter().filter(|e| e.sample + len <= n_t).collect();
    let dropped = events.len() - kept.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} epoch(s) extending past sample {n_t}");
    }

    let mut data = Array3::<f64>::zeros((kept.len(), signal.n_chan(), len));
    for (e, ev) in kept.iter().enumerate() {
        data.slice_mut(s![e, .., ..])
            .assign(&signal.data().slice(s![.., ev.sample..ev.sample + len]));
    }

    Epochs::from_parts(
        signal.ch_names().to_vec(),
        signal.sfreq(),
        kept.iter().map(|e| e.code).collect(),
        kept.iter().map(|e| e.sample).collect(),
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotation;
    use ndarray::Array2;

    fn ramp(n_ch: usize, n_t: usize, sfreq: f64) -> SignalSource {
        let names = (0..n_ch).map(|c| format!("EEG {c}")).collect();
        let data = Array2::from_shape_fn((n_ch, n_t), |(c, t)| (c * 1_000_000 + t) as f64);
        SignalSource::new(names, sfreq, data).unwrap()
    }

    fn map() -> LabelMap {
        [("W", 1u8), ("N3", 4), ("N4", 4)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn epoch_length_is_inclusive() {
        assert_eq!(epoch_length(30.0, 100.0), 3001);
        assert_eq!(epoch_length(5.0, 256.0), 1281);
    }

    #[test]
    fn windows_start_at_event_sample() {
        let sig = ramp(2, 10_000, 100.0);
        let ann = AnnotationSet::new(vec![Annotation::new(12.34, 30.0, "W")]);
        let ep = epoch(&sig, &ann, &map(), 30.0).unwrap();
        assert_eq!(ep.len(), 1);
        let e0 = ep.get(0).unwrap();
        assert_eq!(e0.start_sample, 1234);
        assert_eq!(e0.data.dim(), (2, 3001));
        assert_eq!(e0.data[[0, 0]], 1234.0);
        assert_eq!(e0.data[[1, 3000]], 1_004_234.0);
    }

    #[test]
    fn trailing_window_dropped_not_clipped() {
        // 9000 samples: onsets 0 and 30 s fit (end 3000, 6000), 60 s needs 9001.
        let sig = ramp(1, 9000, 100.0);
        let ann: AnnotationSet = (0..3).map(|i| Annotation::new(i as f64 * 30.0, 30.0, "W")).collect();
        let ep = epoch(&sig, &ann, &map(), 30.0).unwrap();
        assert_eq!(ep.starts(), &[0, 3000]);
    }

    #[test]
    fn no_recognised_labels_gives_empty() {
        let sig = ramp(1, 9000, 100.0);
        let ann = AnnotationSet::new(vec![Annotation::new(0.0, 30.0, "Movement time")]);
        let ep = epoch(&sig, &ann, &map(), 30.0).unwrap();
        assert!(ep.is_empty());
        assert_eq!(ep.data().dim(), (0, 1, 3001));
    }

    #[test]
    fn merged_labels_share_a_code() {
        let sig = ramp(1, 100_000, 100.0);
        let labels = ["N3", "N4", "N3", "W", "N4"];
        let ann: AnnotationSet = labels
            .iter()
            .enumerate()
            .map(|(i, l)| Annotation::new(i as f64 * 30.0, 30.0, *l))
            .collect();
        let counts = epoch(&sig, &ann, &map(), 30.0).unwrap().counts_by_code();
        assert_eq!(counts[&4], 4);
        assert_eq!(counts[&1], 1);
    }

    #[test]
    fn epochs_need_a_channel() {
        let err = Epochs::from_parts(vec![], 100.0, vec![1], vec![0], Array3::zeros((1, 0, 11)))
            .unwrap_err();
        assert_eq!(err.kind(), "InconsistentChannelSet");
    }

    #[test]
    fn rejects_non_positive_duration() {
        let sig = ramp(1, 100, 100.0);
        assert!(epoch_events(&sig, &[], 0.0).is_err());
    }
}
