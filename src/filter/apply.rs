//! Overlap-add zero-phase FIR convolution.
//!
//! Matches MNE's `_overlap_add_filter` + `_1d_overlap_filter`.
//!
//! Zero-phase is achieved by shifting the output left by `(N-1)/2` samples,
//! NOT by running filtfilt. Edge policy: each channel is extended by `N-1`
//! samples of reflect-limited padding (`2·x[0] − x[i]` on the left,
//! `2·x[-1] − x[-1-i]` on the right) before convolution and the padding is
//! stripped afterwards. Epochs within `(N-1)/2` samples of either end of the
//! recording still carry some of that edge transient.
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{PipelineError, Result};
use crate::filter::design::design_bandpass;
use crate::signal::SignalSource;

/// Band-pass every channel of `signal`, returning a new source of the same shape.
///
/// Fails with `InvalidFrequencyRange` for bad cutoffs and with
/// `InsufficientSamples` when the recording is shorter than the kernel.
pub fn band_pass(signal: &SignalSource, l_freq: f64, h_freq: f64) -> Result<SignalSource> {
    let h = design_bandpass(l_freq, h_freq, signal.sfreq())?;
    if signal.n_times() < h.len() {
        return Err(PipelineError::InsufficientSamples {
            required: h.len(),
            available: signal.n_times(),
        });
    }
    log::debug!(
        "band-pass {l_freq}-{h_freq} Hz: {} taps over {} ch × {} samples",
        h.len(),
        signal.n_chan(),
        signal.n_times()
    );
    let filtered = apply_fir_zero_phase(signal.data(), &h);
    signal.with_data(filtered)
}

/// Apply a zero-phase FIR filter to each channel of `data` ([C, T]).
///
/// `h` must have odd length (guaranteed by `design_bandpass`).
pub fn apply_fir_zero_phase(data: &Array2<f64>, h: &[f64]) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros(data.raw_dim());
    if data.ncols() == 0 {
        return out;
    }
    let ola = OverlapAdd::new(h, data.ncols());
    for (src, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
        let row = src.to_vec();
        let filtered = ola.filter(&row);
        dst.assign(&ArrayView1::from(&filtered[..]));
    }
    out
}

/// Filter a single 1-D signal with the overlap-add algorithm.
///
/// Returns a vector of the same length as `x`.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return vec![];
    }
    OverlapAdd::new(h, x.len()).filter(x)
}

/// Precomputed kernel spectrum and FFT plans, shared by every channel of a recording.
struct OverlapAdd {
    n_h: usize,
    n_fft: usize,
    h_fft: Vec<Complex<f64>>,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
}

impl OverlapAdd {
    fn new(h: &[f64], n_x: usize) -> Self {
        let n_h = h.len();
        let n_ext = n_x + 2 * (n_h - 1);
        let n_fft = choose_fft_len(n_h, n_ext);

        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let fwd = planner.plan_fft_forward(n_fft);
        let inv = planner.plan_fft_inverse(n_fft);

        let mut h_fft = zero_padded(h, n_fft);
        fwd.process(&mut h_fft);

        Self { n_h, n_fft, h_fft, fwd, inv }
    }

    fn filter(&self, x: &[f64]) -> Vec<f64> {
        let n_x = x.len();
        let n_h = self.n_h;
        let n_fft = self.n_fft;

        // Shift for zero-phase: (N-1)/2  (N must be odd).
        let shift = (n_h - 1) / 2;
        let n_edge = n_h - 1;

        let x_ext = reflect_limited_pad(x, n_edge, n_edge);
        let n_ext = x_ext.len();

        let n_seg = n_fft - n_h + 1;
        let n_segments = n_ext.div_ceil(n_seg);
        let mut x_filtered = vec![0.0_f64; n_ext];
        let inv_scale = 1.0 / n_fft as f64;

        for seg_idx in 0..n_segments {
            let start = seg_idx * n_seg;
            let stop = (start + n_seg).min(n_ext);

            let mut buf = zero_padded(&x_ext[start..stop], n_fft);
            self.fwd.process(&mut buf);
            for (b, &hf) in buf.iter_mut().zip(self.h_fft.iter()) {
                *b *= hf;
            }
            self.inv.process(&mut buf);

            // Product index p lands at output index start + p - shift.
            let out_start = start.saturating_sub(shift);
            let out_end = (out_start + n_fft).min(n_ext);
            let prod_start = shift.saturating_sub(start);

            for (o, p) in (out_start..out_end).zip(prod_start..n_fft) {
                x_filtered[o] += buf[p].re * inv_scale;
            }
        }

        x_filtered[n_edge..n_edge + n_x].to_vec()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn zero_padded(x: &[f64], n: usize) -> Vec<Complex<f64>> {
    x.iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n)
        .collect()
}

/// Reflect-limited padding (matches MNE's `_smart_pad`).
///
/// Left:  `pad[i] = 2*x[0] - x[n_l-i]`  for i in 1..=n_l
/// Right: `pad[i] = 2*x[-1] - x[-(i+1)]` for i in 1..=n_r
/// Padding beyond the signal length is filled with zeros.
fn reflect_limited_pad(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    let actual_l = n_l.min(n - 1);
    let actual_r = n_r.min(n - 1);

    let mut out = Vec::with_capacity(n_l + n + n_r);
    out.extend(std::iter::repeat(0.0).take(n_l - actual_l));
    out.extend((1..=actual_l).rev().map(|i| 2.0 * x[0] - x[i]));
    out.extend_from_slice(x);
    let last = x[n - 1];
    out.extend((1..=actual_r).map(|i| 2.0 * last - x[n - 1 - i]));
    out.extend(std::iter::repeat(0.0).take(n_r - actual_r));
    out
}

/// Choose the optimal FFT block size (power of 2 minimising operation count).
///
/// Matches MNE's cost function:
///   `cost = ceil(n_x / (N - n_h + 1)) * N * (log2(N) + 1) + 4e-5 * N * n_x`
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;
    let max_pow = (n_x as f64).log2().ceil() as u32 + 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;

    let mut best_n = 1_usize << max_pow.max(min_pow);
    let mut best_cost = f64::INFINITY;

    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0)
            + 4e-5 * n as f64 * n_x as f64;
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_zero_phase(x: &[f64], h: &[f64]) -> Vec<f64> {
        // Same padding, plain time-domain convolution.
        let n_edge = h.len() - 1;
        let shift = n_edge / 2;
        let ext = reflect_limited_pad(x, n_edge, n_edge);
        (0..x.len())
            .map(|i| {
                let c = i + n_edge + shift;
                h.iter().enumerate().map(|(k, &hk)| hk * ext[c - k]).sum()
            })
            .collect()
    }

    #[test]
    fn filter_preserves_length() {
        let x: Vec<f64> = (0..2048).map(|i| (i as f64 / 64.0).sin()).collect();
        let h = design_bandpass(0.3, 35.0, 100.0).unwrap();
        assert_eq!(filter_1d(&x, &h).len(), x.len());
    }

    #[test]
    fn overlap_add_matches_direct_convolution() {
        let x: Vec<f64> = (0..700)
            .map(|i| (i as f64 * 0.37).sin() + 0.2 * (i as f64 * 0.05).cos())
            .collect();
        let h = design_bandpass(2.0, 20.0, 100.0).unwrap();
        let fast = filter_1d(&x, &h);
        let slow = direct_zero_phase(&x, &h);
        for (a, b) in fast.iter().zip(&slow) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn filter_removes_dc() {
        let x = vec![1.0_f64; 8000];
        let h = design_bandpass(0.3, 35.0, 100.0).unwrap();
        let y = filter_1d(&x, &h);
        let max_val = y.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
        assert!(max_val < 1e-6, "DC not removed: max={max_val}");
    }

    #[test]
    fn reflect_limited_left_pad() {
        let x = [1.0_f64, 2.0, 3.0, 4.0, 5.0];
        let padded = reflect_limited_pad(&x, 3, 0);
        // left pad: 2*1 - x[3]=4 → -2, 2*1 - x[2]=3 → -1, 2*1 - x[1]=2 → 0
        assert_eq!(&padded[..3], &[-2.0_f64, -1.0, 0.0]);
        assert_eq!(&padded[3..], &x[..]);
    }

    #[test]
    fn reflect_limited_right_pad_zero_fills_overflow() {
        let x = [1.0_f64, 2.0, 3.0];
        let padded = reflect_limited_pad(&x, 0, 4);
        // 2*3 - 2 = 4, 2*3 - 1 = 5, then zeros
        assert_eq!(&padded[3..], &[4.0_f64, 5.0, 0.0, 0.0]);
    }
}
