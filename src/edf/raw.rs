//! Raw EDF signal reader.
//!
//! # Algorithm
//! 1. Parse the header ([`EdfHeader::read`]).
//! 2. Derive the record count (header value, or file size when it is `-1`).
//! 3. For each requested signal, walk every data record and convert the
//!    little-endian `i16` samples to physical units, then to volts:
//!
//! ```text
//! volts[ch, t] = (gain · digital + offset) × unit_to_volts
//! ```
//!
//! All signals read together must share one sampling rate.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::Array2;

use super::header::EdfHeader;
use crate::error::PipelineError;
use crate::signal::{ChannelSelection, SignalSource};

/// An opened EDF/EDF+ file (header only; samples are read on demand).
#[derive(Debug, Clone)]
pub struct RawEdf {
    pub header: EdfHeader,
    pub path: PathBuf,
    /// Complete data records present in the file.
    pub n_records: usize,
}

/// Open an EDF file and parse its header.
pub fn open_raw<P: AsRef<Path>>(path: P) -> Result<RawEdf> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let file_len = file.metadata()?.len() as usize;
    let mut reader = BufReader::new(file);
    let header = EdfHeader::read(&mut reader)
        .with_context(|| format!("parse EDF header of {}", path.display()))?;

    let record_bytes = header.record_bytes();
    if record_bytes == 0 {
        bail!("{}: data records are empty", path.display());
    }
    let available = file_len.saturating_sub(header.header_bytes) / record_bytes;
    let n_records = if header.n_records < 0 {
        available
    } else {
        let declared = header.n_records as usize;
        if declared > available {
            log::warn!(
                "{}: header declares {declared} records, file holds {available}",
                path.display()
            );
        }
        declared.min(available)
    };

    Ok(RawEdf { header, path: path.to_path_buf(), n_records })
}

impl RawEdf {
    /// Labels of the ordinary (non-annotation) signals.
    pub fn ch_names(&self) -> Vec<String> {
        self.header
            .data_signals()
            .into_iter()
            .map(|i| self.header.signals[i].label.clone())
            .collect()
    }

    /// Recording length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.n_records as f64 * self.header.record_duration
    }

    /// Raw bytes of every complete data record.
    pub(crate) fn read_records(&self) -> Result<Vec<u8>> {
        let file = File::open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let mut reader = BufReader::new(file);
        let mut skip = vec![0u8; self.header.header_bytes];
        reader.read_exact(&mut skip)?;
        let mut bytes = vec![0u8; self.n_records * self.header.record_bytes()];
        reader
            .read_exact(&mut bytes)
            .with_context(|| format!("read data records of {}", self.path.display()))?;
        Ok(bytes)
    }

    /// Read signals `picks` (header indices) as `[C, T]` volts plus their sampling rate.
    pub fn read_signals(&self, picks: &[usize]) -> Result<(Array2<f64>, f64)> {
        let Some(&first) = picks.first() else {
            bail!("no signals requested");
        };
        let spr = self.header.signals[first].samples_per_record;
        for &p in picks {
            let s = &self.header.signals[p];
            if s.samples_per_record != spr {
                return Err(PipelineError::InconsistentChannelSet(format!(
                    "'{}' has {} samples/record, '{}' has {spr}",
                    s.label, s.samples_per_record, self.header.signals[first].label
                ))
                .into());
            }
        }

        let bytes = self.read_records()?;
        let record_bytes = self.header.record_bytes();
        let mut out = Array2::<f64>::zeros((picks.len(), self.n_records * spr));

        for (row, &p) in picks.iter().enumerate() {
            let sig = &self.header.signals[p];
            let (gain, offset, unit) = (sig.gain(), sig.offset(), sig.to_volts());
            let sig_off = self.header.signal_offset(p);
            for r in 0..self.n_records {
                let base = r * record_bytes + sig_off;
                let chunk = &bytes[base..base + spr * 2];
                for (i, b) in chunk.chunks_exact(2).enumerate() {
                    let digital = i16::from_le_bytes([b[0], b[1]]) as f64;
                    out[[row, r * spr + i]] = (gain * digital + offset) * unit;
                }
            }
        }

        let sfreq = self.header.signals[first].sfreq(self.header.record_duration);
        Ok((out, sfreq))
    }

    /// Decode the channels chosen by `selection` into a [`SignalSource`].
    ///
    /// Channel-selection failures surface as [`PipelineError`] inside the
    /// returned `anyhow::Error`.
    pub fn to_signal_source(&self, selection: &ChannelSelection) -> Result<SignalSource> {
        let data_idx = self.header.data_signals();
        let names = self.ch_names();
        let local = selection.resolve(&names)?;
        let picks: Vec<usize> = local.iter().map(|&i| data_idx[i]).collect();
        let (data, sfreq) = self.read_signals(&picks)?;
        let picked = local.iter().map(|&i| names[i].clone()).collect();
        Ok(SignalSource::new(picked, sfreq, data)?)
    }
}
