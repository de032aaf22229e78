//! CSV output of per-subject feature tables.
//!
//! Tables are concatenated in the order given; the columns are the band
//! names followed by `User_ID` and `Age` (empty when unknown):
//!
//! ```text
//! Delta,Theta,Alpha,Beta,User_ID,Age
//! 812.4,96.1,21.7,3.9,SC4001E0,33
//! ```
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::features::FeatureTable;

pub const SUBJECT_COLUMN: &str = "User_ID";
pub const AGE_COLUMN: &str = "Age";

/// Column names shared by every table, or an error if the band sets differ.
pub fn combined_header(tables: &[&FeatureTable]) -> Result<Vec<String>> {
    let Some(first) = tables.first() else {
        bail!("no feature tables to write");
    };
    for t in &tables[1..] {
        if t.band_names() != first.band_names() {
            bail!(
                "subject {} has bands {:?}, subject {} has {:?}",
                t.subject_id(),
                t.band_names(),
                first.subject_id(),
                first.band_names()
            );
        }
    }
    let mut header = first.band_names().to_vec();
    header.push(SUBJECT_COLUMN.into());
    header.push(AGE_COLUMN.into());
    Ok(header)
}

/// Write all rows of `tables` as CSV into `writer`; returns the row count.
pub fn write_feature_csv_to<W: Write>(tables: &[&FeatureTable], writer: W) -> Result<usize> {
    let header = combined_header(tables)?;
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&header)?;

    let mut n_rows = 0;
    for table in tables {
        for row in table.rows() {
            let mut record: Vec<String> = row.values.iter().map(f64::to_string).collect();
            record.push(row.subject_id.to_string());
            record.push(row.age.map(|a| a.to_string()).unwrap_or_default());
            wtr.write_record(&record)?;
            n_rows += 1;
        }
    }
    wtr.flush()?;
    Ok(n_rows)
}

/// Write all rows of `tables` to the CSV file at `path`.
pub fn write_feature_csv(tables: &[&FeatureTable], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("create {}", path.display()))?;
    let n = write_feature_csv_to(tables, file)
        .with_context(|| format!("write {}", path.display()))?;
    log::info!("wrote {n} rows from {} subject(s) → {}", tables.len(), path.display());
    Ok(n)
}
