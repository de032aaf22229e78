//! Welch power spectral density, per epoch and per channel.
//!
//! Matches `mne.time_frequency.psd_array_welch` with its defaults
//! (`window='hamming'`, `average='mean'`, `remove_dc=True`):
//!
//! ```text
//! for each [epoch, channel] row:
//!     split into segments of n_per_seg with n_overlap overlap
//!     subtract segment mean, multiply by periodic Hamming window
//!     |FFT(n_fft)|² · 1/(sfreq · Σw²), doubled except at DC / Nyquist
//!     mean over segments, keep bins with fmin ≤ f ≤ fmax
//! ```
//!
//! Short epochs (fewer samples than `n_per_seg`) use a single segment of the
//! whole epoch, zero-padded to `n_fft`, so the frequency grid never changes.
//! `n_overlap` is ignored for them.
use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array3, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::epoch::Epochs;
use crate::error::{PipelineError, Result};

/// Welch estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchParams {
    pub fmin: f64,
    pub fmax: f64,
    /// FFT length; bin spacing is `sfreq / n_fft`.
    pub n_fft: usize,
    /// Segment length; `None` means `n_fft`.
    pub n_per_seg: Option<usize>,
    pub n_overlap: usize,
}

impl Default for WelchParams {
    fn default() -> Self {
        Self { fmin: 0.3, fmax: 35.0, n_fft: 2048, n_per_seg: None, n_overlap: 0 }
    }
}

impl WelchParams {
    /// Check the settings against a sampling rate.
    pub fn validate(&self, sfreq: f64) -> Result<()> {
        let nyq = sfreq / 2.0;
        if !(self.fmin >= 0.0 && self.fmin < self.fmax) {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "PSD range needs 0 <= fmin < fmax, got {}..{} Hz",
                self.fmin, self.fmax
            )));
        }
        if self.fmax > nyq {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "PSD fmax {} Hz above Nyquist ({nyq} Hz)",
                self.fmax
            )));
        }
        if self.n_fft == 0 {
            return Err(PipelineError::InvalidParameter("n_fft must be > 0".into()));
        }
        let n_per_seg = self.n_per_seg.unwrap_or(self.n_fft);
        if n_per_seg == 0 || n_per_seg > self.n_fft {
            return Err(PipelineError::InvalidParameter(format!(
                "n_per_seg ({n_per_seg}) must be in 1..={}",
                self.n_fft
            )));
        }
        if self.n_overlap >= n_per_seg {
            return Err(PipelineError::InvalidParameter(format!(
                "n_overlap ({}) must be smaller than n_per_seg ({n_per_seg})",
                self.n_overlap
            )));
        }
        Ok(())
    }
}

/// PSD of every epoch and channel over a shared frequency grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralEstimate {
    ch_names: Vec<String>,
    /// `[E, C, F]`, µV²/Hz when the input was in µV.
    power: Array3<f64>,
    freqs: Vec<f64>,
}

impl SpectralEstimate {
    /// Wrap a precomputed power array. `freqs` must be strictly increasing and
    /// match the last axis of `power`.
    pub fn new(ch_names: Vec<String>, power: Array3<f64>, freqs: Vec<f64>) -> Result<Self> {
        let (_, n_c, n_f) = power.dim();
        if ch_names.is_empty() {
            return Err(PipelineError::InconsistentChannelSet("PSD has no channels".into()));
        }
        if n_c != ch_names.len() {
            return Err(PipelineError::InconsistentChannelSet(format!(
                "{} channel names for {n_c} PSD rows",
                ch_names.len()
            )));
        }
        if n_f != freqs.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "{} frequencies for {n_f} PSD bins",
                freqs.len()
            )));
        }
        if freqs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidFrequencyRange(
                "frequency grid is not strictly increasing".into(),
            ));
        }
        Ok(Self { ch_names, power, freqs })
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    /// `[E, C, F]`
    pub fn power(&self) -> &Array3<f64> {
        &self.power
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn n_epochs(&self) -> usize {
        self.power.dim().0
    }
}

/// Frequencies `k · sfreq / n_fft` for the one-sided spectrum.
pub fn rfft_freqs(n_fft: usize, sfreq: f64) -> Vec<f64> {
    (0..=n_fft / 2).map(|k| k as f64 * sfreq / n_fft as f64).collect()
}

/// Periodic Hamming window (`scipy.signal.get_window('hamming', n)`).
pub fn hamming_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Welch PSD of every epoch in `epochs`.
pub fn estimate_psd(epochs: &Epochs, params: &WelchParams) -> Result<SpectralEstimate> {
    let (power, freqs) = psd_array_welch(epochs.data(), epochs.sfreq(), params)?;
    SpectralEstimate::new(epochs.ch_names().to_vec(), power, freqs)
}

/// Welch PSD of an `[E, C, T]` array; returns `([E, C, F], freqs)`.
pub fn psd_array_welch(
    data: &Array3<f64>,
    sfreq: f64,
    params: &WelchParams,
) -> Result<(Array3<f64>, Vec<f64>)> {
    params.validate(sfreq)?;
    let (n_e, n_c, n_t) = data.dim();
    let welch = Welch::new(sfreq, n_t, params)?;

    log::debug!(
        "welch: {n_e} epochs × {n_c} ch, {n_t} samples, n_fft={}, n_per_seg={}, {} segment(s), {} bins",
        params.n_fft,
        welch.n_per_seg,
        welch.n_segments(n_t),
        welch.bins.len()
    );

    let mut power = Array3::<f64>::zeros((n_e, n_c, welch.bins.len()));
    for e in 0..n_e {
        for c in 0..n_c {
            let psd = welch.estimate(data.slice(s![e, c, ..]));
            power
                .slice_mut(s![e, c, ..])
                .assign(&ArrayView1::from(&psd[..]));
        }
    }
    Ok((power, welch.freqs))
}

/// Plan, window and bin selection reused for every row of one call.
struct Welch {
    n_fft: usize,
    n_per_seg: usize,
    step: usize,
    window: Vec<f64>,
    scale: f64,
    /// Indices of retained one-sided bins.
    bins: Vec<usize>,
    freqs: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl Welch {
    fn new(sfreq: f64, n_t: usize, params: &WelchParams) -> Result<Self> {
        let n_fft = params.n_fft;
        let requested = params.n_per_seg.unwrap_or(n_fft);
        let n_per_seg = requested.min(n_t.max(1));
        // An epoch shorter than one segment is a single segment: overlap does not apply.
        let n_overlap = if n_per_seg < requested { 0 } else { params.n_overlap };
        if n_overlap >= n_per_seg {
            return Err(PipelineError::InvalidParameter(format!(
                "n_overlap ({}) must be smaller than the {n_per_seg}-sample segment",
                params.n_overlap
            )));
        }

        let all = rfft_freqs(n_fft, sfreq);
        let bins: Vec<usize> = (0..all.len())
            .filter(|&k| all[k] >= params.fmin && all[k] <= params.fmax)
            .collect();
        if bins.is_empty() {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "no frequency bin in {}..{} Hz at {} Hz resolution",
                params.fmin,
                params.fmax,
                sfreq / n_fft as f64
            )));
        }
        let freqs = bins.iter().map(|&k| all[k]).collect();

        let window = hamming_periodic(n_per_seg);
        let scale = 1.0 / (sfreq * window.iter().map(|w| w * w).sum::<f64>());
        let fft = FftPlanner::<f64>::new().plan_fft_forward(n_fft);

        Ok(Self {
            n_fft,
            n_per_seg,
            step: n_per_seg - n_overlap,
            window,
            scale,
            bins,
            freqs,
            fft,
        })
    }

    fn n_segments(&self, n_t: usize) -> usize {
        if n_t < self.n_per_seg {
            return 0;
        }
        (n_t - self.n_per_seg) / self.step + 1
    }

    /// One-sided density factor for bin `k`.
    fn one_sided(&self, k: usize) -> f64 {
        let nyquist_bin = self.n_fft % 2 == 0 && k == self.n_fft / 2;
        if k == 0 || nyquist_bin { 1.0 } else { 2.0 }
    }

    fn estimate(&self, x: ArrayView1<'_, f64>) -> Vec<f64> {
        let n_seg = self.n_segments(x.len());
        let mut acc = vec![0.0_f64; self.bins.len()];
        if n_seg == 0 {
            return acc;
        }

        let mut buf = vec![Complex::<f64>::default(); self.n_fft];
        for seg in 0..n_seg {
            let start = seg * self.step;
            let segment = x.slice(s![start..start + self.n_per_seg]);
            let mean = segment.sum() / self.n_per_seg as f64;

            buf.iter_mut().for_each(|b| *b = Complex::default());
            for (b, (&v, &w)) in buf.iter_mut().zip(segment.iter().zip(&self.window)) {
                b.re = (v - mean) * w;
            }
            self.fft.process(&mut buf);

            for (a, &k) in acc.iter_mut().zip(&self.bins) {
                *a += buf[k].norm_sqr() * self.scale * self.one_sided(k);
            }
        }

        let inv = 1.0 / n_seg as f64;
        acc.iter_mut().for_each(|a| *a *= inv);
        acc
    }
}
