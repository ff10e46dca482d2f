//! PCR-cDNA primers (PCS109/PCS111).
//!
//! A full-length cDNA read starts with the strand-switching primer (SSP) and
//! ends with the reverse complement of the oligo-dT VN primer (VNP). Sequences
//! from pychopper's `primer_data/cDNA_SSP_VNP.fas`.

use crate::kit::{Provenance, SeqKind, SequenceRecord};

const PYCHOPPER_DEFAULTS: Provenance = Provenance {
    source: "https://github.com/epi2me-labs/pychopper/blob/master/pychopper/primer_data/cDNA_SSP_VNP.fas",
    reference: "primer_data/cDNA_SSP_VNP.fas",
    notes: "legacy PCR-cDNA primers (community primer file).",
};

/// Strand-switching primer.
pub const SSP: SequenceRecord = SequenceRecord {
    name: "SSP",
    kind: SeqKind::Primer,
    sequence: "TTTCTGTTGGTGCTGATATTGCTGGG",
    provenance: PYCHOPPER_DEFAULTS,
};

/// Oligo-dT VN primer, as synthesised.
pub const VNP: SequenceRecord = SequenceRecord {
    name: "VNP",
    kind: SeqKind::Primer,
    sequence: "ACTTGCCTGTCGCTCTATCTTCTTTTTTTTT",
    provenance: PYCHOPPER_DEFAULTS,
};

/// VNP as it appears at the 3' end of a full-length read (reverse complement of [`VNP`]).
pub const VNP_RC: SequenceRecord = SequenceRecord {
    name: "VNP_rc",
    kind: SeqKind::Primer,
    sequence: "AAAAAAAAAGAAGATAGAGCGACAGGCAAGT",
    provenance: PYCHOPPER_DEFAULTS,
};
