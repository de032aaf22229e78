//! # sleepbands — spectral band features from sleep EEG
//!
//! `sleepbands` turns Sleep-EDF style polysomnograms and hypnograms into a
//! per-subject table of band powers. The DSP steps follow
//! [MNE-Python](https://mne.tools) (`filter`, `events_from_annotations`,
//! `Epochs`, `psd_array_welch`) with its defaults.
//!
//! ## Pipeline overview
//!
//! ```text
//! SC4001E0-PSG.edf + SC4001EC-Hypnogram.edf
//!   │
//!   ├─ edf::open_raw()          native EDF/EDF+ reader, volts
//!   ├─ edf::read_annotations()  EDF+ TAL → AnnotationSet
//!   ├─ filter::band_pass()      firwin + overlap-add, 0.3–35 Hz
//!   ├─ epoch                    one 30 s window per recognised stage
//!   ├─ scale::to_microvolts()   V → µV
//!   ├─ psd::estimate_psd()      Welch, n_fft = 2048, 0.3–35 Hz
//!   └─ bands::aggregate_bands() Delta / Theta / Alpha / Beta means
//!        │
//!        └─→ FeatureTable  (one row per epoch + User_ID + Age)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use sleepbands::{run_batch, write_feature_csv, PipelineConfig, SleepCassette};
//!
//! let ds = SleepCassette::new("data/sleep-cassette");
//! let subjects: Vec<_> = ds
//!     .discover()
//!     .unwrap()
//!     .iter()
//!     .filter_map(|id| ds.resolve(id).ok())
//!     .collect();
//!
//! let report = run_batch(&subjects, &PipelineConfig::default(), 4).unwrap();
//! for (id, err) in report.failures() {
//!     eprintln!("{id}: {err}");
//! }
//! write_feature_csv(&report.tables(), "features.csv".as_ref()).unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use sleepbands::{
//!     aggregate_bands, band_pass, default_bands, epoch, estimate_psd, open_raw,
//!     read_annotations, sleep_edf_label_map, to_microvolts, AggregationMode,
//!     ChannelSelection, WelchParams, VOLTS_TO_MICROVOLTS,
//! };
//!
//! let raw = open_raw("SC4001E0-PSG.edf").unwrap();
//! let eeg = raw.to_signal_source(&ChannelSelection::default()).unwrap();
//! let hyp = read_annotations("SC4001EC-Hypnogram.edf").unwrap();
//!
//! let filtered = band_pass(&eeg, 0.3, 35.0).unwrap();
//! let epochs = epoch(&filtered, &hyp, &sleep_edf_label_map(), 30.0).unwrap();
//! let epochs = to_microvolts(epochs, VOLTS_TO_MICROVOLTS);
//! let psd = estimate_psd(&epochs, &WelchParams::default()).unwrap();
//! let bands = aggregate_bands(&psd, &default_bands(), AggregationMode::PerEpoch).unwrap();
//! println!("{:?}", bands.column("Delta"));
//! ```

pub mod annotations;
pub mod bands;
pub mod config;
pub mod dataset;
pub mod demographics;
pub mod edf;
pub mod epoch;
pub mod error;
pub mod features;
pub mod filter;
pub mod io;
pub mod pipeline;
pub mod psd;
pub mod scale;
pub mod signal;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{sleep_edf_label_map, PipelineConfig};

// error
pub use error::{PipelineError, Result};

// signal + annotations
pub use annotations::{events_from_annotations, Annotation, AnnotationSet, Event, LabelMap};
pub use signal::{ChannelSelection, SignalSource};

// edf
pub use edf::{open_raw, read_annotations, EdfHeader, RawEdf, SignalHeader};

// filter
pub use filter::{apply_fir_zero_phase, band_pass, design_bandpass, filter_1d, firwin};

// epoch + scaling
pub use epoch::{epoch, epoch_events, epoch_length, Epoch, Epochs};
pub use scale::{to_microvolts, VOLTS_TO_MICROVOLTS};

// spectra + bands
pub use bands::{aggregate_bands, default_bands, AggregationMode, BandPowers, FrequencyBand};
pub use psd::{estimate_psd, psd_array_welch, SpectralEstimate, WelchParams};

// output
pub use features::{FeatureRow, FeatureTable};
pub use io::write_feature_csv;

// batch
pub use dataset::SleepCassette;
pub use demographics::parse_age;
pub use pipeline::{
    load_subject, process_subject, run_batch, run_subject, RunReport, SubjectFiles,
    SubjectOutcome, SubjectRecording,
};
