use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array2, Array3};
use sleepbands::{
    aggregate_bands, band_pass, default_bands, estimate_psd, psd_array_welch, AggregationMode,
    Epochs, SignalSource, WelchParams,
};

const SFREQ: f64 = 100.0;

/// Two channels, one hour at 100 Hz.
fn night_hour() -> SignalSource {
    let n = 3600 * SFREQ as usize;
    let data = Array2::from_shape_fn((2, n), |(c, t)| {
        let x = t as f64 / SFREQ;
        30e-6 * (2.0 * PI * (2.0 + 4.0 * c as f64) * x).sin() + 5e-6 * (2.0 * PI * 11.0 * x).sin()
    });
    SignalSource::new(vec!["EEG Fpz-Cz".into(), "EEG Pz-Oz".into()], SFREQ, data).unwrap()
}

/// 120 stage epochs of 3001 samples.
fn stage_epochs() -> Epochs {
    let data = Array3::from_shape_fn((120, 2, 3001), |(e, c, t)| {
        (2.0 * PI * (1.0 + e as f64 % 20.0 + c as f64) * t as f64 / SFREQ).sin()
    });
    Epochs::from_parts(
        vec!["EEG Fpz-Cz".into(), "EEG Pz-Oz".into()],
        SFREQ,
        vec![3; 120],
        (0..120).map(|e| e * 3000).collect(),
        data,
    )
    .unwrap()
}

fn bench_band_pass(c: &mut Criterion) {
    let sig = night_hour();
    c.bench_function("band_pass 0.3-35 Hz [2×360000]", |b| {
        b.iter(|| band_pass(black_box(&sig), 0.3, 35.0).unwrap())
    });
}

fn bench_welch(c: &mut Criterion) {
    let ep = stage_epochs();
    let p = WelchParams::default();
    c.bench_function("psd_array_welch [120×2×3001] n_fft=2048", |b| {
        b.iter(|| psd_array_welch(black_box(ep.data()), SFREQ, &p).unwrap())
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let est = estimate_psd(&stage_epochs(), &WelchParams::default()).unwrap();
    let bands = default_bands();
    c.bench_function("aggregate_bands per epoch", |b| {
        b.iter(|| aggregate_bands(black_box(&est), &bands, AggregationMode::PerEpoch).unwrap())
    });
}

criterion_group!(benches, bench_band_pass, bench_welch, bench_aggregate);
criterion_main!(benches);
