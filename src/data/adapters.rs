//! Adapter & primer sequences for **current kits** (CHTD Appendix 15).
//!
//! Source: Chemistry Technical Document (CHTD_500_v1_revAR_25Nov2024) →
//! Appendix 15: *Adapter sequences*.
//!
//! - LA/NA/RA top/bottom sequences
//!
//! The top strand is what a trimmer sees at the start of a read, the bottom
//! strand what it sees at the end.

use crate::kit::{Provenance, SeqKind, SequenceRecord};

const CHTD_A15: Provenance = Provenance {
    source: "https://nanoporetech.com/document/chemistry-technical-document",
    reference: "Appendix 15: Adapter sequences",
    notes: "Sequences transcribed verbatim from ONT documentation.",
};

/// Ligation Adapter (LA) top strand. 5'-TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT-3'
pub const LA_TOP: SequenceRecord = SequenceRecord {
    name: "LA_top",
    kind: SeqKind::AdapterTop,
    sequence: "TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT",
    provenance: CHTD_A15,
};

/// Ligation Adapter (LA) bottom strand. 5'-GCAATACGTAACTGAACGAAGTACAGG-3'
pub const LA_BOTTOM: SequenceRecord = SequenceRecord {
    name: "LA_bottom",
    kind: SeqKind::AdapterBottom,
    sequence: "GCAATACGTAACTGAACGAAGTACAGG",
    provenance: CHTD_A15,
};

/// Native Adapter (NA) top strand (same top as LA).
pub const NA_TOP: SequenceRecord = SequenceRecord {
    name: "NA_top",
    kind: SeqKind::AdapterTop,
    sequence: "TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT",
    provenance: CHTD_A15,
};

/// Native Adapter (NA) bottom strand. 5'-ACGTAACTGAACGAAGTACAGG-3'
pub const NA_BOTTOM: SequenceRecord = SequenceRecord {
    name: "NA_bottom",
    kind: SeqKind::AdapterBottom,
    sequence: "ACGTAACTGAACGAAGTACAGG",
    provenance: CHTD_A15,
};

/// Rapid Adapter (RA) top strand. Rapid chemistry only leaves adapter at read starts.
pub const RA_TOP: SequenceRecord = SequenceRecord {
    name: "RA_top",
    kind: SeqKind::AdapterTop,
    sequence: "TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT",
    provenance: CHTD_A15,
};
