//! FIR band-pass design matching MNE's `fir_design='firwin'`.
//!
//! For a band-pass `[l_freq, h_freq]` at sampling rate `sfreq`:
//!   • l_trans = min(max(0.25 · l_freq, 2), l_freq)
//!   • h_trans = min(max(0.25 · h_freq, 2), sfreq/2 − h_freq)
//!   • filter length N = ceil(3.3 · sfreq / min(l_trans, h_trans)), rounded to odd
//!   • kernel = lowpass(h_freq + h_trans/2) − lowpass(l_freq − l_trans/2),
//!     each Hamming-windowed sinc sized for its own transition band and
//!     centred inside the N-tap kernel (MNE's `_firwin_design`).
//!
//! `l_freq == 0` designs a pure lowpass.
use std::f64::consts::PI;

use crate::error::{PipelineError, Result};

/// Hamming window main-lobe factor (MNE `_length_factors['hamming']`).
const HAMMING_LENGTH_FACTOR: f64 = 3.3;

/// MNE-compatible transition bandwidth below the passband.
///
/// Rule: `min(max(0.25 * l_freq, 2.0), l_freq)`
pub fn auto_l_trans_bandwidth(l_freq: f64) -> f64 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// MNE-compatible transition bandwidth above the passband.
///
/// Rule: `min(max(0.25 * h_freq, 2.0), sfreq / 2 - h_freq)`
pub fn auto_h_trans_bandwidth(h_freq: f64, sfreq: f64) -> f64 {
    (0.25 * h_freq).max(2.0).min(sfreq / 2.0 - h_freq)
}

/// Number of FIR taps for the narrowest transition band.
/// Returns an odd integer (required for zero-phase linear-phase FIR).
///
/// Formula: `ceil(3.3 / trans_bw * sfreq)` rounded up to odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    make_odd((HAMMING_LENGTH_FACTOR / trans_bw * sfreq).ceil() as usize)
}

/// Taps of the lowpass covering one transition band (`round`, not `ceil`).
fn transition_length(trans_bw: f64, sfreq: f64) -> usize {
    make_odd((HAMMING_LENGTH_FACTOR / (trans_bw / sfreq)).round() as usize)
}

#[inline]
fn make_odd(n: usize) -> usize {
    if n % 2 == 0 { n + 1 } else { n }
}

/// Validate `0 ≤ l_freq < h_freq < sfreq/2`.
pub fn check_band(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<()> {
    let nyq = sfreq / 2.0;
    if !(l_freq.is_finite() && h_freq.is_finite()) {
        return Err(PipelineError::InvalidFrequencyRange(format!(
            "non-finite cutoffs {l_freq}..{h_freq} Hz"
        )));
    }
    if l_freq < 0.0 || l_freq >= h_freq {
        return Err(PipelineError::InvalidFrequencyRange(format!(
            "need 0 <= l_freq < h_freq, got {l_freq}..{h_freq} Hz"
        )));
    }
    if h_freq >= nyq {
        return Err(PipelineError::InvalidFrequencyRange(format!(
            "h_freq {h_freq} Hz must be below Nyquist ({nyq} Hz)"
        )));
    }
    Ok(())
}

/// Length of the kernel [`design_bandpass`] would return, without building it.
pub fn bandpass_length(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<usize> {
    check_band(l_freq, h_freq, sfreq)?;
    let h_trans = auto_h_trans_bandwidth(h_freq, sfreq);
    let min_trans = if l_freq > 0.0 {
        auto_l_trans_bandwidth(l_freq).min(h_trans)
    } else {
        h_trans
    };
    Ok(auto_filter_length(min_trans, sfreq))
}

/// Design a zero-phase band-pass FIR (Hamming-windowed sinc).
///
/// Matches `mne.filter.create_filter(data, sfreq, l_freq, h_freq,
///   filter_length='auto', fir_window='hamming', fir_design='firwin', phase='zero')`.
pub fn design_bandpass(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<Vec<f64>> {
    let n = bandpass_length(l_freq, h_freq, sfreq)?;
    let mut h = vec![0.0_f64; n];

    // Upper edge: gain steps 0 → 1 going down from Nyquist.
    let h_trans = auto_h_trans_bandwidth(h_freq, sfreq);
    let lp_high = firwin(
        transition_length(h_trans, sfreq).min(n),
        h_freq + h_trans / 2.0,
        sfreq,
        true,
    );
    add_centered(&mut h, &lp_high, 1.0);

    // Lower edge: gain steps 1 → 0.
    if l_freq > 0.0 {
        let l_trans = auto_l_trans_bandwidth(l_freq);
        let lp_low = firwin(
            transition_length(l_trans, sfreq).min(n),
            l_freq - l_trans / 2.0,
            sfreq,
            true,
        );
        add_centered(&mut h, &lp_low, -1.0);
    }

    Ok(h)
}

fn add_centered(h: &mut [f64], part: &[f64], sign: f64) {
    let offset = (h.len() - part.len()) / 2;
    for (dst, &v) in h[offset..offset + part.len()].iter_mut().zip(part) {
        *dst += sign * v;
    }
}

/// Design a lowpass FIR filter using a Hamming-windowed sinc.
///
/// `pass_zero=true` means the DC component passes (lowpass).
/// `cutoff_hz` is the -6 dB point.
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64, pass_zero: bool) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0); // normalised [0, 1]

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // f(x) = sin(π·fc·x) / (π·x);  lim_{x→0} f(x) = fc
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    // Unit DC gain.
    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);

    if !pass_zero {
        h.iter_mut().for_each(|v| *v = -*v);
        h[n / 2] += 1.0;
    }

    h
}

/// Symmetric Hamming window of length `n` (filter design).
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Magnitude of the frequency response of `h` at `freq` Hz.
pub fn gain_at(h: &[f64], freq: f64, sfreq: f64) -> f64 {
    let w = 2.0 * PI * freq / sfreq;
    let (re, im) = h.iter().enumerate().fold((0.0, 0.0), |(re, im), (k, &v)| {
        (re + v * (w * k as f64).cos(), im - v * (w * k as f64).sin())
    });
    (re * re + im * im).sqrt()
}
