//! Local layout of the Sleep-EDF "sleep cassette" recordings.
//!
//! ```text
//! <root>/SC4001E0-PSG.edf          polysomnogram
//! <root>/SC4001EC-Hypnogram.edf    scorer-suffixed hypnogram
//! ```
//! The hypnogram replaces the last character of the subject id with the
//! scorer letter, which is not known in advance and is looked up.
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pipeline::SubjectFiles;

/// Scorer letters used by the cassette hypnograms, in lookup order.
pub const HYPNOGRAM_SUFFIXES: [char; 4] = ['C', 'J', 'P', 'H'];

const PSG_SUFFIX: &str = "-PSG.edf";

#[derive(Debug, Clone)]
pub struct SleepCassette {
    root: PathBuf,
}

impl SleepCassette {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn psg_path(&self, subject_id: &str) -> PathBuf {
        self.root.join(format!("{subject_id}{PSG_SUFFIX}"))
    }

    /// Every hypnogram path that may belong to `subject_id`.
    pub fn hypnogram_candidates(&self, subject_id: &str) -> Vec<PathBuf> {
        let mut stem = subject_id.to_string();
        stem.pop();
        HYPNOGRAM_SUFFIXES
            .iter()
            .map(|c| self.root.join(format!("{stem}{c}-Hypnogram.edf")))
            .collect()
    }

    /// Locate the PSG and hypnogram files of one subject.
    pub fn resolve(&self, subject_id: &str) -> Result<SubjectFiles> {
        let psg = self.psg_path(subject_id);
        if !psg.is_file() {
            return Err(PipelineError::ResourceUnreadable {
                resource: psg.display().to_string(),
                reason: "file not found".into(),
            });
        }
        let hypnogram = self
            .hypnogram_candidates(subject_id)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| PipelineError::ResourceUnreadable {
                resource: format!("hypnogram of {subject_id}"),
                reason: format!(
                    "none of the scorer suffixes {HYPNOGRAM_SUFFIXES:?} exist in {}",
                    self.root.display()
                ),
            })?;
        log::debug!("{subject_id}: hypnogram {}", hypnogram.display());
        Ok(SubjectFiles { subject_id: subject_id.to_string(), psg, hypnogram })
    }

    /// Subject ids of every `*-PSG.edf` under the root, sorted.
    pub fn discover(&self) -> anyhow::Result<Vec<String>> {
        let pattern = self.root.join(format!("*{PSG_SUFFIX}"));
        let pattern = pattern.to_string_lossy();
        let mut ids = Vec::new();
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => {
                    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                    if let Some(id) = name.as_deref().and_then(|n| n.strip_suffix(PSG_SUFFIX)) {
                        ids.push(id.to_string());
                    }
                }
                Err(e) => log::warn!("glob error: {e}"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypnogram_lookup_order() {
        let ds = SleepCassette::new("/data");
        let c = ds.hypnogram_candidates("SC4001E0");
        assert_eq!(c[0], PathBuf::from("/data/SC4001EC-Hypnogram.edf"));
        assert_eq!(c[3], PathBuf::from("/data/SC4001EH-Hypnogram.edf"));
        assert_eq!(ds.psg_path("SC4001E0"), PathBuf::from("/data/SC4001E0-PSG.edf"));
    }

    #[test]
    fn resolve_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["SC4001E0-PSG.edf", "SC4001EJ-Hypnogram.edf", "SC4002E0-PSG.edf", "notes.txt"] {
            std::fs::write(dir.path().join(f), b"").unwrap();
        }
        let ds = SleepCassette::new(dir.path());
        assert_eq!(ds.discover().unwrap(), vec!["SC4001E0", "SC4002E0"]);

        let files = ds.resolve("SC4001E0").unwrap();
        assert!(files.hypnogram.ends_with("SC4001EJ-Hypnogram.edf"));

        let err = ds.resolve("SC4002E0").unwrap_err();
        assert_eq!(err.kind(), "ResourceUnreadable");
        let err = ds.resolve("SC4999E0").unwrap_err();
        assert_eq!(err.kind(), "ResourceUnreadable");
    }
}
