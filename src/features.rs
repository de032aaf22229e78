//! Per-subject feature table: band columns plus subject id and age.
use crate::bands::BandPowers;

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<'a> {
    pub subject_id: &'a str,
    pub age: Option<u32>,
    /// One value per band, in [`FeatureTable::band_names`] order.
    pub values: Vec<f64>,
}

/// Feature rows of one subject. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    subject_id: String,
    age: Option<u32>,
    bands: BandPowers,
}

impl FeatureTable {
    pub fn new(subject_id: impl Into<String>, age: Option<u32>, bands: BandPowers) -> Self {
        Self { subject_id: subject_id.into(), age, bands }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn band_names(&self) -> &[String] {
        self.bands.names()
    }

    pub fn bands(&self) -> &BandPowers {
        &self.bands
    }

    pub fn n_rows(&self) -> usize {
        self.bands.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureRow<'_>> + '_ {
        (0..self.n_rows()).map(move |i| FeatureRow {
            subject_id: &self.subject_id,
            age: self.age,
            values: self.bands.row(i),
        })
    }
}
