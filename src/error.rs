//! Domain errors surfaced by the library.
//!
//! Library entry points return `anyhow::Result`; these variants are the typed
//! causes underneath, so callers can `downcast_ref::<QcError>()` when they need
//! to tell a bad parameter apart from an IO failure.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QcError {
    #[error("unsupported input file: {} (allowed: .fastq/.fq, .fasta/.fa/.fna, optionally .gz; .sam; .bam)", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{option} requires per-base qualities but read `{read}` has none")]
    MissingQualities { option: &'static str, read: String },

    #[error("unknown adapter set: {0}. Use `longqc list-adapters` to see valid names.")]
    UnknownAdapterSet(String),

    #[error("unknown aligner: {0} (expected edlib, myers or acmyers)")]
    UnknownAligner(String),
}

impl QcError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        QcError::InvalidParameter { name, reason: reason.into() }
    }
}
