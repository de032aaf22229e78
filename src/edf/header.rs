//! EDF / EDF+ header records.
//!
//! Layout (ASCII, space-padded):
//! ```text
//!   8  version            80  patient id        80  recording id
//!   8  start date          8  start time         8  header bytes
//!  44  reserved ("EDF+C" / "EDF+D" for EDF+)     8  number of records
//!   8  record duration (s) 4  number of signals (ns)
//! then, field by field for all ns signals:
//!  16  label   80 transducer   8 physical dimension
//!   8  phys min  8 phys max    8 dig min   8 dig max
//!  80  prefiltering   8 samples per record   32 reserved
//! ```
use std::io::Read;

use anyhow::{bail, Context, Result};

/// Label of the EDF+ annotation pseudo-signal.
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// Per-signal header.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i64,
    pub digital_max: i64,
    pub prefiltering: String,
    pub samples_per_record: usize,
}

impl SignalHeader {
    #[inline]
    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATION_LABEL
    }

    /// Physical units per digital step.
    pub fn gain(&self) -> f64 {
        (self.physical_max - self.physical_min) / (self.digital_max - self.digital_min) as f64
    }

    pub fn offset(&self) -> f64 {
        self.physical_max - self.gain() * self.digital_max as f64
    }

    pub fn sfreq(&self, record_duration: f64) -> f64 {
        self.samples_per_record as f64 / record_duration
    }

    /// Factor converting this signal's physical unit to volts.
    ///
    /// Unknown or empty dimensions are taken as already being in volts.
    pub fn to_volts(&self) -> f64 {
        match self.physical_dimension.trim() {
            "uV" | "µV" | "μV" => 1e-6,
            "mV" => 1e-3,
            "nV" => 1e-9,
            _ => 1.0,
        }
    }
}

/// Main header plus one [`SignalHeader`] per signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EdfHeader {
    pub version: String,
    pub patient_id: String,
    pub recording_id: String,
    pub start_date: String,
    pub start_time: String,
    pub header_bytes: usize,
    pub reserved: String,
    /// `-1` when the writer did not finalise the file.
    pub n_records: i64,
    pub record_duration: f64,
    pub signals: Vec<SignalHeader>,
}

impl EdfHeader {
    /// Parse the full header from the start of a file.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let version = read_field(reader, 8)?;
        let patient_id = read_field(reader, 80)?;
        let recording_id = read_field(reader, 80)?;
        let start_date = read_field(reader, 8)?;
        let start_time = read_field(reader, 8)?;
        let header_bytes: usize = parse_field(reader, 8, "header bytes")?;
        let reserved = read_field(reader, 44)?;
        let n_records: i64 = parse_field(reader, 8, "number of data records")?;
        let record_duration: f64 = parse_field(reader, 8, "data record duration")?;
        let ns: usize = parse_field(reader, 4, "number of signals")?;

        if header_bytes != 256 * (ns + 1) {
            bail!("header size {header_bytes} does not match {ns} signals");
        }

        let labels = read_many(reader, ns, 16)?;
        let transducers = read_many(reader, ns, 80)?;
        let dims = read_many(reader, ns, 8)?;
        let phys_min: Vec<f64> = parse_many(reader, ns, 8, "physical minimum")?;
        let phys_max: Vec<f64> = parse_many(reader, ns, 8, "physical maximum")?;
        let dig_min: Vec<i64> = parse_many(reader, ns, 8, "digital minimum")?;
        let dig_max: Vec<i64> = parse_many(reader, ns, 8, "digital maximum")?;
        let prefilters = read_many(reader, ns, 80)?;
        let spr: Vec<usize> = parse_many(reader, ns, 8, "samples per record")?;
        let _reserved = read_many(reader, ns, 32)?;

        let signals: Vec<SignalHeader> = (0..ns)
            .map(|i| SignalHeader {
                label: labels[i].clone(),
                transducer: transducers[i].clone(),
                physical_dimension: dims[i].clone(),
                physical_min: phys_min[i],
                physical_max: phys_max[i],
                digital_min: dig_min[i],
                digital_max: dig_max[i],
                prefiltering: prefilters[i].clone(),
                samples_per_record: spr[i],
            })
            .collect();

        for s in &signals {
            if s.digital_max <= s.digital_min {
                bail!("signal '{}' has empty digital range", s.label);
            }
        }
        if record_duration < 0.0 {
            bail!("negative data record duration {record_duration}");
        }

        log::debug!(
            "EDF header: {ns} signals, {n_records} records × {record_duration} s, reserved='{reserved}'"
        );

        Ok(EdfHeader {
            version,
            patient_id,
            recording_id,
            start_date,
            start_time,
            header_bytes,
            reserved,
            n_records,
            record_duration,
            signals,
        })
    }

    #[inline]
    pub fn is_edf_plus(&self) -> bool {
        self.reserved.starts_with("EDF+")
    }

    /// Bytes in one data record (2 bytes per sample, all signals).
    pub fn record_bytes(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record * 2).sum()
    }

    /// Byte offset of signal `idx` inside a data record.
    pub fn signal_offset(&self, idx: usize) -> usize {
        self.signals[..idx].iter().map(|s| s.samples_per_record * 2).sum()
    }

    /// Indices of ordinary (non-annotation) signals.
    pub fn data_signals(&self) -> Vec<usize> {
        (0..self.signals.len())
            .filter(|&i| !self.signals[i].is_annotation())
            .collect()
    }

    /// Indices of "EDF Annotations" signals.
    pub fn annotation_signals(&self) -> Vec<usize> {
        (0..self.signals.len())
            .filter(|&i| self.signals[i].is_annotation())
            .collect()
    }

    /// EDF+ patient subfields: code, sex, birthdate, name (space separated).
    pub fn patient_subfields(&self) -> Vec<&str> {
        self.patient_id.split_whitespace().collect()
    }
}

/// Fixed-width ASCII field, decoded as Latin-1 and trimmed.
fn read_field<R: Read>(reader: &mut R, size: usize) -> Result<String> {
    let mut buf = vec![0u8; size];
    reader
        .read_exact(&mut buf)
        .with_context(|| format!("truncated EDF header (reading {size}-byte field)"))?;
    Ok(buf.iter().map(|&b| b as char).collect::<String>().trim().to_string())
}

fn parse_field<R: Read, T>(reader: &mut R, size: usize, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s = read_field(reader, size)?;
    s.parse::<T>().with_context(|| format!("invalid {what} '{s}'"))
}

fn read_many<R: Read>(reader: &mut R, n: usize, size: usize) -> Result<Vec<String>> {
    (0..n).map(|_| read_field(reader, size)).collect()
}

fn parse_many<R: Read, T>(reader: &mut R, n: usize, size: usize, what: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    (0..n).map(|_| parse_field(reader, size, what)).collect()
}
