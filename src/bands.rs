//! Band power aggregation.
//!
//! A band keeps every PSD bin with `fmin ≤ f ≤ fmax`. Both ends are
//! inclusive, so a bin sitting exactly on a shared edge (4, 8 or 13 Hz when
//! the grid hits them) is counted in both neighbouring bands.
//!
//! After aggregation every band column is truncated to the shortest one so
//! all columns have the same length.
use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::psd::SpectralEstimate;

/// A named `[fmin, fmax]` range in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub fmin: f64,
    pub fmax: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, fmin: f64, fmax: f64) -> Self {
        Self { name: name.into(), fmin, fmax }
    }

    /// Indices of `freqs` inside this band (inclusive on both ends).
    pub fn mask(&self, freqs: &[f64]) -> Vec<usize> {
        freqs
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f >= self.fmin && f <= self.fmax)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Delta 0.3–4, Theta 4–8, Alpha 8–13, Beta 13–30 Hz.
pub fn default_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("Delta", 0.3, 4.0),
        FrequencyBand::new("Theta", 4.0, 8.0),
        FrequencyBand::new("Alpha", 8.0, 13.0),
        FrequencyBand::new("Beta", 13.0, 30.0),
    ]
}

/// What one band value averages over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One value per epoch: mean over channels and in-band bins.
    #[default]
    PerEpoch,
    /// One value per in-band bin: mean over epochs and channels.
    PerFrequency,
}

/// Equal-length band columns, in band order.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPowers {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl BandPowers {
    /// Truncate every column to the shortest one.
    pub fn reconcile(named: Vec<(String, Vec<f64>)>) -> Self {
        let min_len = named.iter().map(|(_, c)| c.len()).min().unwrap_or(0);
        let (names, columns) = named
            .into_iter()
            .map(|(n, mut c)| {
                c.truncate(min_len);
                (n, c)
            })
            .unzip();
        Self { names, columns }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Rows shared by every column.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Values of row `i`, one per band.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }
}

/// Check band definitions independently of any PSD grid.
pub fn validate_bands(bands: &[FrequencyBand]) -> Result<()> {
    if bands.is_empty() {
        return Err(PipelineError::InvalidParameter("no frequency bands configured".into()));
    }
    for (i, b) in bands.iter().enumerate() {
        if !(b.fmin >= 0.0 && b.fmin <= b.fmax) {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "band {} has range {}..{} Hz",
                b.name, b.fmin, b.fmax
            )));
        }
        if bands[..i].iter().any(|o| o.name == b.name) {
            return Err(PipelineError::InvalidParameter(format!(
                "duplicate band name '{}'",
                b.name
            )));
        }
    }
    Ok(())
}

/// Average `estimate` within each band.
pub fn aggregate_bands(
    estimate: &SpectralEstimate,
    bands: &[FrequencyBand],
    mode: AggregationMode,
) -> Result<BandPowers> {
    validate_bands(bands)?;
    let power = estimate.power();
    let (n_e, n_c, _) = power.dim();

    let mut named = Vec::with_capacity(bands.len());
    for band in bands {
        let mask = band.mask(estimate.freqs());
        if mask.is_empty() {
            return Err(PipelineError::InvalidFrequencyRange(format!(
                "band {} ({}..{} Hz) contains no PSD bin",
                band.name, band.fmin, band.fmax
            )));
        }
        let column: Vec<f64> = match mode {
            AggregationMode::PerEpoch => {
                let denom = (n_c * mask.len()) as f64;
                (0..n_e)
                    .map(|e| {
                        let ep = power.slice(s![e, .., ..]);
                        mask.iter().map(|&k| ep.column(k).sum()).sum::<f64>() / denom
                    })
                    .collect()
            }
            AggregationMode::PerFrequency if n_e == 0 => Vec::new(),
            AggregationMode::PerFrequency => {
                let denom = (n_e * n_c) as f64;
                mask.iter()
                    .map(|&k| power.slice(s![.., .., k]).sum() / denom)
                    .collect()
            }
        };
        log::debug!("band {}: {} bins, {} values", band.name, mask.len(), column.len());
        named.push((band.name.clone(), column));
    }
    Ok(BandPowers::reconcile(named))
}
