//! Adapters of superseded ligation chemistries (Y-adapter, 1D²).
//!
//! Reads from R9.4 runs of SQK-LSK108/LSK109 still turn up in archives; these
//! fragments are what the trimmer needs to clean them. Sequences as listed in
//! the adapter table of the Poresnip fork of Porechop.
use crate::kit::{Provenance, SeqKind, SequenceRecord};

const PORECHOP_FORK: Provenance = Provenance {
    source: "https://github.com/Sn0flingan/Poresnip/blob/master/porechop/adapters.py",
    reference: "adapters.py (kit_adapters)",
    notes: "legacy chemistry; motor-binding regions are omitted, only trunk fragments are listed.",
};

/// Y-adapter trunk seen at read starts (NSK007, LSK108, LSK109).
pub const NSK007_Y_TOP_TRUNK: SequenceRecord = SequenceRecord {
    name: "SQK-NSK007_Y_Top_trunk",
    kind: SeqKind::AdapterTop,
    sequence: "AATGTACTTCGTTCAGTTACGTATTGCT",
    provenance: PORECHOP_FORK,
};

/// Y-adapter bottom strand, seen at read ends.
pub const NSK007_Y_BOTTOM: SequenceRecord = SequenceRecord {
    name: "SQK-NSK007_Y_Bottom",
    kind: SeqKind::AdapterBottom,
    sequence: "GCAATACGTAACTGAACGAAGT",
    provenance: PORECHOP_FORK,
};

/// LSK308 1D² adapter, start of read.
pub const LSK308_1D2_TOP: SequenceRecord = SequenceRecord {
    name: "SQK-LSK308_1D2_Top",
    kind: SeqKind::AdapterTop,
    sequence: "GTCAGAGAGGTTCCAAGTCAGAGAGGTTCCT",
    provenance: PORECHOP_FORK,
};

/// LSK308 1D² adapter, end of read.
pub const LSK308_1D2_BOTTOM: SequenceRecord = SequenceRecord {
    name: "SQK-LSK308_1D2_Bottom",
    kind: SeqKind::AdapterBottom,
    sequence: "GGCGTCTGCTTGGGTGTTTAACCTTTTTGTCAGAGAGGTTCCAAGTCAGAGAGGTTCCT",
    provenance: PORECHOP_FORK,
};
