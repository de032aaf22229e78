//! Decoded multichannel recording.
//!
//! [`SignalSource`] is immutable: channel selection and filtering return new
//! instances, the original samples are never touched.
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Which channels of a recording enter the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    /// Every channel.
    All,
    /// Channels whose name starts with the given prefix (e.g. `"EEG"`).
    Prefix(String),
    /// Exactly these channels, in this order.
    Names(Vec<String>),
}

impl Default for ChannelSelection {
    fn default() -> Self {
        ChannelSelection::Prefix("EEG".into())
    }
}

impl ChannelSelection {
    /// Indices into `ch_names` selected by this rule, in output order.
    pub fn resolve(&self, ch_names: &[String]) -> Result<Vec<usize>> {
        let picks: Vec<usize> = match self {
            ChannelSelection::All => (0..ch_names.len()).collect(),
            ChannelSelection::Prefix(p) => ch_names
                .iter()
                .enumerate()
                .filter(|(_, n)| n.starts_with(p.as_str()))
                .map(|(i, _)| i)
                .collect(),
            ChannelSelection::Names(wanted) => wanted
                .iter()
                .map(|w| {
                    ch_names.iter().position(|n| n == w).ok_or_else(|| {
                        PipelineError::InconsistentChannelSet(format!(
                            "channel '{w}' not in recording"
                        ))
                    })
                })
                .collect::<Result<_>>()?,
        };
        if picks.is_empty() {
            return Err(PipelineError::InconsistentChannelSet(format!(
                "selection {self:?} matched none of {ch_names:?}"
            )));
        }
        Ok(picks)
    }
}

/// A `[C, T]` recording with channel names and a single sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSource {
    ch_names: Vec<String>,
    sfreq: f64,
    data: Array2<f64>,
}

impl SignalSource {
    /// Build a source, checking the shape invariants.
    pub fn new(ch_names: Vec<String>, sfreq: f64, data: Array2<f64>) -> Result<Self> {
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "sampling rate must be positive, got {sfreq}"
            )));
        }
        if ch_names.is_empty() {
            return Err(PipelineError::InconsistentChannelSet(
                "signal has no channels".into(),
            ));
        }
        if data.nrows() != ch_names.len() {
            return Err(PipelineError::InconsistentChannelSet(format!(
                "{} channel names for {} data rows",
                ch_names.len(),
                data.nrows()
            )));
        }
        for (i, name) in ch_names.iter().enumerate() {
            if ch_names[..i].contains(name) {
                return Err(PipelineError::InconsistentChannelSet(format!(
                    "duplicate channel name '{name}'"
                )));
            }
        }
        if data.ncols() == 0 {
            return Err(PipelineError::InsufficientSamples { required: 1, available: 0 });
        }
        Ok(Self { ch_names, sfreq, data })
    }

    #[inline]
    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    #[inline]
    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    /// `[C, T]` samples.
    #[inline]
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    #[inline]
    pub fn n_chan(&self) -> usize {
        self.ch_names.len()
    }

    #[inline]
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.n_times() as f64 / self.sfreq
    }

    #[inline]
    pub fn nyquist(&self) -> f64 {
        self.sfreq / 2.0
    }

    /// New source holding only the channels picked by `selection`.
    pub fn pick(&self, selection: &ChannelSelection) -> Result<SignalSource> {
        let picks = selection.resolve(&self.ch_names)?;
        let names = picks.iter().map(|&i| self.ch_names[i].clone()).collect();
        let data = self.data.select(Axis(0), &picks);
        SignalSource::new(names, self.sfreq, data)
    }

    /// Derived copy with the same channels and rate but new samples.
    ///
    /// The row count must match the channel count; the sample count may differ.
    pub fn with_data(&self, data: Array2<f64>) -> Result<SignalSource> {
        SignalSource::new(self.ch_names.clone(), self.sfreq, data)
    }
}
