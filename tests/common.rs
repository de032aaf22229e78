/// Shared helpers: synthetic signals and a minimal EDF/EDF+ writer.
use std::f64::consts::PI;
use std::path::Path;

use ndarray::Array2;
use sleepbands::{Annotation, AnnotationSet, SignalSource};

/// `[C, n]` sum of sines; `components[c]` lists `(freq_hz, amplitude)` of channel `c`.
#[allow(unused)]
pub fn sines(components: &[Vec<(f64, f64)>], sfreq: f64, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((components.len(), n), |(c, t)| {
        let x = t as f64 / sfreq;
        components[c]
            .iter()
            .map(|&(f, a)| a * (2.0 * PI * f * x).sin())
            .sum()
    })
}

#[allow(unused)]
pub fn source(data: Array2<f64>, sfreq: f64) -> SignalSource {
    let names = (0..data.nrows()).map(|i| format!("EEG {i}")).collect();
    SignalSource::new(names, sfreq, data).unwrap()
}

/// Back-to-back 30 s stage annotations starting at 0.
#[allow(unused)]
pub fn hypnogram(labels: &[&str]) -> AnnotationSet {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| Annotation::new(i as f64 * 30.0, 30.0, *l))
        .collect()
}

#[allow(unused)]
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

// ── EDF writer ───────────────────────────────────────────────────────────────

const PHYS_RANGE_UV: f64 = 500.0;
const DIG_MIN: i64 = -32768;
const DIG_MAX: i64 = 32767;

fn field(out: &mut Vec<u8>, s: &str, n: usize) {
    let mut v = s.as_bytes().to_vec();
    assert!(v.len() <= n, "field '{s}' wider than {n}");
    v.resize(n, b' ');
    out.extend(v);
}

struct Sig {
    label: String,
    dim: String,
    pmin: f64,
    pmax: f64,
    spr: usize,
    /// Encoded bytes of each record, `spr * 2` long.
    records: Vec<Vec<u8>>,
}

fn write_edf(path: &Path, patient: &str, record_dur: f64, n_records_field: i64, signals: &[Sig]) {
    let ns = signals.len();
    let mut h = Vec::new();
    field(&mut h, "0", 8);
    field(&mut h, patient, 80);
    field(&mut h, "Startdate 24-APR-1989 X X X", 80);
    field(&mut h, "24.04.89", 8);
    field(&mut h, "16.13.00", 8);
    field(&mut h, &(256 * (ns + 1)).to_string(), 8);
    field(&mut h, "EDF+C", 44);
    field(&mut h, &n_records_field.to_string(), 8);
    field(&mut h, &record_dur.to_string(), 8);
    field(&mut h, &ns.to_string(), 4);
    for s in signals { field(&mut h, &s.label, 16); }
    for _ in signals { field(&mut h, "", 80); }
    for s in signals { field(&mut h, &s.dim, 8); }
    for s in signals { field(&mut h, &s.pmin.to_string(), 8); }
    for s in signals { field(&mut h, &s.pmax.to_string(), 8); }
    for _ in signals { field(&mut h, &DIG_MIN.to_string(), 8); }
    for _ in signals { field(&mut h, &DIG_MAX.to_string(), 8); }
    for _ in signals { field(&mut h, "", 80); }
    for s in signals { field(&mut h, &s.spr.to_string(), 8); }
    for _ in signals { field(&mut h, "", 32); }

    let n_records = signals.iter().map(|s| s.records.len()).max().unwrap_or(0);
    for r in 0..n_records {
        for s in signals {
            h.extend(&s.records[r]);
        }
    }
    std::fs::write(path, h).unwrap();
}

fn encode_uv(values: &[f64]) -> Vec<u8> {
    let gain = 2.0 * PHYS_RANGE_UV / (DIG_MAX - DIG_MIN) as f64;
    let offset = PHYS_RANGE_UV - gain * DIG_MAX as f64;
    values
        .iter()
        .flat_map(|&v| {
            let d = ((v - offset) / gain).round().clamp(DIG_MIN as f64, DIG_MAX as f64) as i16;
            d.to_le_bytes()
        })
        .collect()
}

fn tal_bytes(annotations: &[(f64, f64, &str)]) -> Vec<u8> {
    let mut b = b"+0\x14\x14\x00".to_vec();
    for (onset, dur, text) in annotations {
        b.extend(format!("+{onset}\x15{dur}\x14{text}\x14\x00").into_bytes());
    }
    b
}

/// PSG with 1 s records. `channels` hold `(label, samples in µV)`; samples
/// beyond the last full record are dropped.
#[allow(unused)]
pub fn write_psg(path: &Path, patient: &str, sfreq: usize, channels: &[(&str, Vec<f64>)]) {
    let n_records = channels[0].1.len() / sfreq;
    let signals: Vec<Sig> = channels
        .iter()
        .map(|(label, data)| Sig {
            label: label.to_string(),
            dim: "uV".into(),
            pmin: -PHYS_RANGE_UV,
            pmax: PHYS_RANGE_UV,
            spr: sfreq,
            records: (0..n_records)
                .map(|r| encode_uv(&data[r * sfreq..(r + 1) * sfreq]))
                .collect(),
        })
        .collect();
    write_edf(path, patient, 1.0, n_records as i64, &signals);
}

/// Single-record EDF+ file holding only an annotation signal.
#[allow(unused)]
pub fn write_hypnogram(path: &Path, annotations: &[(f64, f64, &str)]) {
    let mut tal = tal_bytes(annotations);
    let spr = tal.len().div_ceil(2);
    tal.resize(spr * 2, 0);
    let sig = Sig {
        label: "EDF Annotations".into(),
        dim: "".into(),
        pmin: -1.0,
        pmax: 1.0,
        spr,
        records: vec![tal],
    };
    write_edf(path, "X X X X", 0.0, 1, &[sig]);
}

/// Write a PSG plus matching hypnogram for `id` under `dir`, Sleep-EDF style.
#[allow(unused)]
pub fn write_subject(
    dir: &Path,
    id: &str,
    age: u32,
    sfreq: usize,
    channels: &[(&str, Vec<f64>)],
    stages: &[&str],
) {
    write_psg(
        &dir.join(format!("{id}-PSG.edf")),
        &format!("X F X Female_{age}yr"),
        sfreq,
        channels,
    );
    let anns: Vec<(f64, f64, &str)> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64 * 30.0, 30.0, *s))
        .collect();
    let stem = &id[..id.len() - 1];
    write_hypnogram(&dir.join(format!("{stem}C-Hypnogram.edf")), &anns);
}

/// Rewrite the "number of data records" field of an EDF file.
#[allow(unused)]
pub fn set_n_records_field(path: &Path, value: i64) {
    let mut bytes = std::fs::read(path).unwrap();
    let mut f = Vec::new();
    field(&mut f, &value.to_string(), 8);
    bytes[236..244].copy_from_slice(&f);
    std::fs::write(path, bytes).unwrap();
}
