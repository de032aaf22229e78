//! EDF / EDF+ file reader.
//!
//! Reads polysomnography recordings and hypnograms such as those of the
//! PhysioNet Sleep-EDF database.
//!
//! # Quick start
//! ```no_run
//! use sleepbands::edf::{open_raw, read_annotations};
//! use sleepbands::ChannelSelection;
//!
//! let raw = open_raw("data/SC4001E0-PSG.edf").unwrap();
//! println!("{:?} over {} s", raw.ch_names(), raw.duration_secs());
//! let eeg = raw.to_signal_source(&ChannelSelection::Prefix("EEG".into())).unwrap();
//! let hyp = read_annotations("data/SC4001EC-Hypnogram.edf").unwrap();
//! println!("{} ch, {} annotations", eeg.n_chan(), hyp.len());
//! ```
pub mod annotations;
pub mod header;
pub mod raw;

pub use annotations::{parse_tals, read_annotations};
pub use header::{EdfHeader, SignalHeader, ANNOTATION_LABEL};
pub use raw::{open_raw, RawEdf};
