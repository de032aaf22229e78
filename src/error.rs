//! Error taxonomy for the per-subject feature pipeline.
//!
//! Every failure a subject can hit is classified into one of these variants,
//! so a batch run can report *why* each skipped subject was skipped.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The raw signal or annotation resource could not be decoded.
    #[error("cannot read {resource}: {reason}")]
    ResourceUnreadable { resource: String, reason: String },

    /// The signal is shorter than the configured FIR kernel.
    #[error("signal has {available} samples, filter needs at least {required}")]
    InsufficientSamples { required: usize, available: usize },

    #[error("invalid frequency range: {0}")]
    InvalidFrequencyRange(String),

    #[error("no epochs produced for subject {0}")]
    NoEpochsProduced(String),

    /// Channel count or order differs between two stages.
    #[error("inconsistent channel set: {0}")]
    InconsistentChannelSet(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PipelineError {
    /// Wrap any decode error, keeping its full context chain.
    pub fn unreadable(resource: impl Into<String>, err: &anyhow::Error) -> Self {
        PipelineError::ResourceUnreadable {
            resource: resource.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Short, stable name of the variant (used in logs and run summaries).
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ResourceUnreadable { .. } => "ResourceUnreadable",
            PipelineError::InsufficientSamples { .. } => "InsufficientSamples",
            PipelineError::InvalidFrequencyRange(_) => "InvalidFrequencyRange",
            PipelineError::NoEpochsProduced(_) => "NoEpochsProduced",
            PipelineError::InconsistentChannelSet(_) => "InconsistentChannelSet",
            PipelineError::InvalidParameter(_) => "InvalidParameter",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn unreadable_keeps_context_chain() {
        let inner: anyhow::Result<()> = Err(anyhow::anyhow!("bad header"));
        let err = inner.context("open SC4001E0-PSG.edf").unwrap_err();
        let e = PipelineError::unreadable("SC4001E0-PSG.edf", &err);
        let msg = e.to_string();
        assert!(msg.contains("open SC4001E0-PSG.edf"), "{msg}");
        assert!(msg.contains("bad header"), "{msg}");
        assert_eq!(e.kind(), "ResourceUnreadable");
    }
}
