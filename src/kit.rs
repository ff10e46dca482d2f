//! Core types for **adapter sequences**, **adapter sets** and **provenance**.
//!
//! Every sequence lives in the binary as a `&'static str` constant; an
//! [`AdapterSet`] ties the sequence found at the *start* of a read to the one
//! found at its *end* for a given library chemistry.
//!
//! # Provenance
//! Every [`SequenceRecord`] carries a [`Provenance`] entry that records the
//! original source for the sequence (e.g. the *Chemistry Technical Document*).
use core::fmt;

/// What role a sequence plays in the library.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SeqKind {
    AdapterTop,
    AdapterBottom,
    /// cDNA primer (SSP, VNP).
    Primer,
}

impl fmt::Display for SeqKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeqKind::AdapterTop => "adapter_top",
            SeqKind::AdapterBottom => "adapter_bottom",
            SeqKind::Primer => "primer",
        };
        f.write_str(s)
    }
}

/// Citation for a sequence.
#[derive(Clone, Copy, Debug)]
pub struct Provenance {
    pub source: &'static str,
    /// Appendix or file within `source`.
    pub reference: &'static str,
    /// Any helpful notes (ambiguity, legacy status, etc.).
    pub notes: &'static str,
}

/// A named adapter or primer sequence.
#[derive(Clone, Copy, Debug)]
pub struct SequenceRecord {
    /// Short stable name (e.g. `"LA_top"`, `"VNP"`).
    pub name: &'static str,
    pub kind: SeqKind,
    /// Uppercase DNA string.
    pub sequence: &'static str,
    pub provenance: Provenance,
}

/// Adapters expected on reads from one library chemistry.
///
/// `start` is searched near the 5' end of a read, `end` near the 3' end. Rapid
/// chemistries attach an adapter to one end only, so either side may be absent.
#[derive(Clone, Copy, Debug)]
pub struct AdapterSet {
    /// Identifier such as `"LSK114"` or `"PCS111"`.
    pub name: &'static str,
    /// One-line description (chemistry family and kits covered).
    pub description: &'static str,
    /// Sequence found at read starts.
    pub start: Option<&'static SequenceRecord>,
    /// Sequence found at read ends.
    pub end: Option<&'static SequenceRecord>,
}

impl AdapterSet {
    /// Legacy sets describe superseded chemistries (kept to trim historical data).
    pub fn is_legacy(&self) -> bool {
        [self.start, self.end]
            .iter()
            .flatten()
            .any(|r| r.provenance.notes.contains("legacy"))
    }
}

impl fmt::Display for AdapterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name) }
}
