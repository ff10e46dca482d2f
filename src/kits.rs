//! Registry of adapter sets, keyed by library chemistry.
//!
//! This includes current **Kit 14** ligation/native/rapid chemistry and selected
//! legacy sets to help trim older datasets.
use crate::data::adapters::{LA_BOTTOM, LA_TOP, NA_BOTTOM, NA_TOP, RA_TOP};
use crate::data::cdna_legacy::{SSP, VNP_RC};
use crate::data::legacy::{LSK308_1D2_BOTTOM, LSK308_1D2_TOP, NSK007_Y_BOTTOM, NSK007_Y_TOP_TRUNK};
use crate::kit::AdapterSet;

pub const ADAPTER_SETS: &[AdapterSet] = &[
    // Current ligation chemistry (Kit 14)
    AdapterSet {
        name: "LSK114",
        description: "Ligation Sequencing Kit V14 (LSK114, LSK114-XL). LA adapter at both ends.",
        start: Some(&LA_TOP),
        end: Some(&LA_BOTTOM),
    },
    // Native barcoding (Kit 14)
    AdapterSet {
        name: "NBD114",
        description: "Native Barcoding Kits V14 (NBD114.24/.96). NA adapter at both ends.",
        start: Some(&NA_TOP),
        end: Some(&NA_BOTTOM),
    },
    // Rapid chemistry attaches via transposase; adapter on read starts only
    AdapterSet {
        name: "RAPID",
        description: "Rapid and rapid barcoding kits (RAD114, RBK114, RPB114, MAB114). RA adapter at read starts.",
        start: Some(&RA_TOP),
        end: None,
    },
    AdapterSet {
        name: "LSK109",
        description: "Ligation Sequencing Kits LSK108/LSK109 and NSK007 (legacy). Y-adapter trunk.",
        start: Some(&NSK007_Y_TOP_TRUNK),
        end: Some(&NSK007_Y_BOTTOM),
    },
    AdapterSet {
        name: "LSK308",
        description: "1D^2 kit LSK308 (legacy). 1D^2 adapter fragments.",
        start: Some(&LSK308_1D2_TOP),
        end: Some(&LSK308_1D2_BOTTOM),
    },
    AdapterSet {
        name: "PCS111",
        description: "PCR-cDNA kits PCS109/PCS111 (legacy). SSP at read starts, VNP at read ends.",
        start: Some(&SSP),
        end: Some(&VNP_RC),
    },
];

/// Return the static registry of adapter sets.
pub fn list_adapter_sets() -> &'static [AdapterSet] { ADAPTER_SETS }

/// Look up an adapter set by name (case-insensitive).
///
/// # Examples
/// ```
/// let set = longqc::kits::get_adapter_set("lsk114").unwrap();
/// assert_eq!(set.start.unwrap().name, "LA_top");
/// ```
pub fn get_adapter_set(name: &str) -> Option<&'static AdapterSet> {
    ADAPTER_SETS.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Resolve a list of names, failing on the first unknown one.
pub fn resolve_adapter_sets<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static AdapterSet>, crate::QcError> {
    names
        .iter()
        .map(|n| get_adapter_set(n.as_ref()).ok_or_else(|| crate::QcError::UnknownAdapterSet(n.as_ref().to_string())))
        .collect()
}

/// Rows describing each set (for CLI/UX): `(name, description, legacy, start, end)`.
pub fn adapter_set_rows() -> Vec<(String, String, bool, String, String)> {
    ADAPTER_SETS
        .iter()
        .map(|s| {
            (
                s.name.to_string(),
                s.description.to_string(),
                s.is_legacy(),
                s.start.map(|r| r.sequence).unwrap_or("-").to_string(),
                s.end.map(|r| r.sequence).unwrap_or("-").to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cdna_legacy::VNP;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(get_adapter_set("nbd114").is_some());
        assert!(get_adapter_set("Rapid").is_some());
        assert!(get_adapter_set("XYZ").is_none());
    }

    #[test]
    fn rapid_has_no_end_adapter() {
        let s = get_adapter_set("RAPID").unwrap();
        assert!(s.start.is_some());
        assert!(s.end.is_none());
    }

    #[test]
    fn legacy_flag_follows_provenance() {
        assert!(get_adapter_set("LSK109").unwrap().is_legacy());
        assert!(get_adapter_set("PCS111").unwrap().is_legacy());
        assert!(!get_adapter_set("LSK114").unwrap().is_legacy());
    }

    #[test]
    fn resolve_reports_unknown_name() {
        let err = resolve_adapter_sets(&["LSK114", "nope"]).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert_eq!(resolve_adapter_sets(&["lsk114", "rapid"]).unwrap().len(), 2);
    }

    #[test]
    fn vnp_read_end_form_is_reverse_complement() {
        let rc = bio::alphabets::dna::revcomp(VNP.sequence.as_bytes());
        assert_eq!(rc, VNP_RC.sequence.as_bytes());
    }

    #[test]
    fn rows_cover_every_set() {
        let rows = adapter_set_rows();
        assert_eq!(rows.len(), ADAPTER_SETS.len());
        let rapid = rows.iter().find(|r| r.0 == "RAPID").unwrap();
        assert_eq!(rapid.4, "-");
    }
}
