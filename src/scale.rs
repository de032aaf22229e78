//! Unit scaling between epoching and spectral estimation.
//!
//! The EDF reader yields volts; PSDs are reported in µV²/Hz, so epochs are
//! multiplied by [`VOLTS_TO_MICROVOLTS`] before Welch.
use crate::epoch::Epochs;

pub const VOLTS_TO_MICROVOLTS: f64 = 1e6;

/// Multiply every sample of every epoch by `factor`, in place.
pub fn scale_inplace(epochs: &mut Epochs, factor: f64) {
    epochs.data_mut().mapv_inplace(|v| v * factor);
}

/// Consume `epochs` and return them scaled by `factor` (usually [`VOLTS_TO_MICROVOLTS`]).
pub fn to_microvolts(mut epochs: Epochs, factor: f64) -> Epochs {
    scale_inplace(&mut epochs, factor);
    epochs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn volts_become_microvolts() {
        let data = Array3::from_elem((2, 1, 4), 25e-6);
        let ep = Epochs::from_parts(vec!["EEG".into()], 100.0, vec![1, 2], vec![0, 4], data)
            .unwrap();
        let ep = to_microvolts(ep, VOLTS_TO_MICROVOLTS);
        for &v in ep.data().iter() {
            approx::assert_abs_diff_eq!(v, 25.0, epsilon = 1e-9);
        }
        assert_eq!(ep.codes(), &[1, 2]);
    }
}
