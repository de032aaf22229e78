//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the per-subject
//! feature pipeline. All fields have defaults matching the Sleep-EDF
//! cassette analysis (100 Hz EEG, 30 s stage epochs).
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::annotations::LabelMap;
use crate::bands::{default_bands, validate_bands, AggregationMode, FrequencyBand};
use crate::error::{PipelineError, Result};
use crate::psd::WelchParams;
use crate::scale::VOLTS_TO_MICROVOLTS;
use crate::signal::ChannelSelection;

/// Configuration for the sleep-EEG feature pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use sleepbands::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     h_freq:    30.0,   // narrower band-pass
///     epoch_dur: 20.0,
///     ..PipelineConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
///
/// Or load partial overrides from JSON with [`PipelineConfig::from_json_file`];
/// missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Channels that enter the pipeline.
    ///
    /// Default: every channel whose label starts with `"EEG"`.
    pub channels: ChannelSelection,

    /// Lower band-pass edge in Hz. `0.0` turns the filter into a lowpass.
    ///
    /// Default: `0.3` Hz.
    pub l_freq: f64,

    /// Upper band-pass edge in Hz; must be below Nyquist.
    ///
    /// The FIR length follows from the narrower of the two automatic
    /// transition bands (see [`crate::filter::design`]). At 0.3–35 Hz and
    /// 100 Hz this is a 1 101-tap kernel.
    ///
    /// Default: `35.0` Hz.
    pub h_freq: f64,

    /// Hypnogram label → stage code.
    ///
    /// Default: W→1, 1→2, 2→3, 3→4, 4→4, R→5 (`"Sleep stage <x>"`); stages
    /// 3 and 4 share code 4.
    pub label_map: LabelMap,

    /// Epoch duration in seconds; each epoch has
    /// `round(epoch_dur × sfreq) + 1` samples, rounding half to even.
    ///
    /// Default: `30.0` s.
    pub epoch_dur: f64,

    /// Split long annotations into events every `chunk_duration` seconds.
    ///
    /// Default: `None` (one event per annotation, at its onset).
    pub chunk_duration: Option<f64>,

    /// Factor applied to epochs before the PSD.
    ///
    /// Default: `1e6` (V → µV, PSD in µV²/Hz).
    pub data_scale: f64,

    /// Welch estimator settings.
    ///
    /// Default: 0.3–35 Hz, `n_fft = 2048`, no overlap.
    pub psd: WelchParams,

    /// Named frequency bands, in output column order.
    ///
    /// Default: Delta 0.3–4, Theta 4–8, Alpha 8–13, Beta 13–30 Hz.
    pub bands: Vec<FrequencyBand>,

    /// Per-epoch rows (default) or per-frequency-bin rows.
    pub aggregation: AggregationMode,
}

/// Hypnogram labels used by the Sleep-EDF database.
pub fn sleep_edf_label_map() -> LabelMap {
    [
        ("Sleep stage W", 1),
        ("Sleep stage 1", 2),
        ("Sleep stage 2", 3),
        ("Sleep stage 3", 4),
        ("Sleep stage 4", 4),
        ("Sleep stage R", 5),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: ChannelSelection::default(),
            l_freq: 0.3,
            h_freq: 35.0,
            label_map: sleep_edf_label_map(),
            epoch_dur: 30.0,
            chunk_duration: None,
            data_scale: VOLTS_TO_MICROVOLTS,
            psd: WelchParams::default(),
            bands: default_bands(),
            aggregation: AggregationMode::PerEpoch,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON file of overrides on top of [`PipelineConfig::default`].
    pub fn from_json_file(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// Check every parameter that does not depend on a recording's sampling
    /// rate. Rate-dependent limits (Nyquist) are checked per subject.
    pub fn validate(&self) -> Result<()> {
        if !(self.l_freq >= 0.0 && self.l_freq < self.h_freq) {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "band-pass needs 0 <= l_freq < h_freq, got {}..{} Hz",
                self.l_freq, self.h_freq
            )));
        }
        if !(self.epoch_dur.is_finite() && self.epoch_dur > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "epoch_dur must be positive, got {}",
                self.epoch_dur
            )));
        }
        if let Some(d) = self.chunk_duration {
            if !(d.is_finite() && d > 0.0) {
                return Err(PipelineError::InvalidParameter(format!(
                    "chunk_duration must be positive, got {d}"
                )));
            }
        }
        if !(self.data_scale.is_finite() && self.data_scale > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "data_scale must be positive, got {}",
                self.data_scale
            )));
        }
        if self.label_map.is_empty() {
            return Err(PipelineError::InvalidParameter("label_map is empty".into()));
        }
        // Nyquist is checked per recording; pass an unbounded rate here.
        self.psd.validate(f64::INFINITY)?;
        validate_bands(&self.bands)
    }

    /// Samples per epoch at `sfreq`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sleepbands::PipelineConfig;
    /// let cfg = PipelineConfig::default();
    /// assert_eq!(cfg.epoch_samples(100.0), 3001);
    /// ```
    pub fn epoch_samples(&self, sfreq: f64) -> usize {
        crate::epoch::epoch_length(self.epoch_dur, sfreq)
    }
}
