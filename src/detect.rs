//! Adapter alignment: semi-global (infix) search of a short motif in a read.
//!
//! Three interchangeable back ends, all reporting the same [`Hit`]:
//! - `Edlib` (edlib_rs, `EDLIB_MODE_HW` + `EDLIB_TASK_LOC`)
//! - `Myers` (bit-parallel, `bio` crate; motifs up to 64 nt, longer ones go to Edlib)
//! - `AcMyers` (exact Aho–Corasick hit first, Myers otherwise)
//!
//! Motifs are upper-cased; callers are expected to pass upper-case reads.
//!
//! # Examples
//! ```
//! use longqc::detect::{locate, Aligner};
//! let hit = locate(Aligner::Edlib, b"ACGTTGCA", b"NNNNACGTTGCANNNN", 1).unwrap();
//! assert_eq!((hit.start, hit.end, hit.edits), (4, 12, 0));
//! ```

use aho_corasick::AhoCorasick;
use bio::pattern_matching::myers::Myers;

use crate::error::QcError;

/// Alignment back end used to search adapters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aligner {
    #[default]
    Edlib,
    Myers,
    AcMyers,
}

impl std::str::FromStr for Aligner {
    type Err = QcError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edlib" => Ok(Self::Edlib),
            "myers" => Ok(Self::Myers),
            "acmyers" | "ac-myers" | "aho-myers" => Ok(Self::AcMyers),
            other => Err(QcError::UnknownAligner(other.to_string())),
        }
    }
}

impl Aligner {
    pub fn as_str(self) -> &'static str {
        match self {
            Aligner::Edlib => "edlib",
            Aligner::Myers => "myers",
            Aligner::AcMyers => "acmyers",
        }
    }
}

/// Best occurrence of a motif within a text. `end` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub start: usize,
    pub end: usize,
    pub edits: usize,
}

impl Hit {
    pub fn span(&self) -> usize { self.end - self.start }

    /// Percent identity of the hit relative to a motif of `pattern_len`.
    pub fn identity(&self, pattern_len: usize) -> f64 { identity(self.edits, pattern_len) }

    /// Shift coordinates found in a sub-slice back onto the full read.
    pub fn offset(self, by: usize) -> Hit {
        Hit { start: self.start + by, end: self.end + by, edits: self.edits }
    }
}

/// `100·(1 − edits/len)`, floored at 0.
pub fn identity(edits: usize, pattern_len: usize) -> f64 {
    if pattern_len == 0 { return 0.0; }
    (100.0 * (1.0 - edits as f64 / pattern_len as f64)).max(0.0)
}

/// Largest edit count that still reaches `min_identity` for a motif of `len`.
pub fn max_edits_for(len: usize, min_identity: f64) -> usize {
    let allowed = len as f64 * (1.0 - min_identity / 100.0);
    allowed.max(0.0).floor() as usize
}

mod edwrap {
    use edlib_rs::edlibrs::{edlibAlignRs, EdlibAlignConfigRs, EdlibAlignModeRs, EdlibAlignTaskRs, EdlibEqualityPairRs};

    use super::Hit;

    pub fn locate(pattern: &[u8], text: &[u8], max_edits: usize) -> Option<Hit> {
        let empty: &[EdlibEqualityPairRs] = &[];
        let cfg = EdlibAlignConfigRs {
            k: max_edits as i32,
            mode: EdlibAlignModeRs::EDLIB_MODE_HW,
            task: EdlibAlignTaskRs::EDLIB_TASK_LOC,
            additionalequalities: empty,
        };
        let res = edlibAlignRs(pattern, text, &cfg);
        if res.editDistance < 0 { return None; }
        let start = res.startLocations.as_ref()?.first().copied()?;
        let end = res.endLocations.as_ref()?.first().copied()?;
        Some(Hit { start: start as usize, end: end as usize + 1, edits: res.editDistance as usize })
    }

    /// `pattern` aligned in full against a prefix of `text` (`EDLIB_MODE_SHW`).
    pub fn prefix(pattern: &[u8], text: &[u8], max_edits: usize) -> Option<Hit> {
        let empty: &[EdlibEqualityPairRs] = &[];
        let cfg = EdlibAlignConfigRs {
            k: max_edits as i32,
            mode: EdlibAlignModeRs::EDLIB_MODE_SHW,
            task: EdlibAlignTaskRs::EDLIB_TASK_LOC,
            additionalequalities: empty,
        };
        let res = edlibAlignRs(pattern, text, &cfg);
        if res.editDistance < 0 { return None; }
        let end = res.endLocations.as_ref()?.first().copied()?;
        Some(Hit { start: 0, end: end as usize + 1, edits: res.editDistance as usize })
    }
}

fn myers_locate(pattern: &[u8], text: &[u8], max_edits: usize) -> Option<Hit> {
    let mut m: Myers<u64> = Myers::new(pattern);
    let k = max_edits.min(u8::MAX as usize) as u8;
    let mut best: Option<Hit> = None;
    for (start, end, dist) in m.find_all(text, k) {
        let hit = Hit { start, end, edits: dist as usize };
        // lowest distance wins; on ties prefer the longer span, then the leftmost
        if best.map_or(true, |b| hit.edits < b.edits || (hit.edits == b.edits && hit.span() > b.span())) {
            best = Some(hit);
        }
    }
    best
}

/// A motif prepared for repeated searches with one aligner.
///
/// The Aho–Corasick automaton is built once; Myers state is rebuilt per search
/// because its search API needs `&mut self`, which would otherwise serialise
/// the rayon workers sharing a `Searcher`.
#[derive(Clone, Debug)]
pub struct Searcher {
    aligner: Aligner,
    pattern: Vec<u8>,
    ac: Option<AhoCorasick>,
}

impl Searcher {
    pub fn new(aligner: Aligner, pattern: &[u8]) -> Self {
        let pattern = pattern.to_ascii_uppercase();
        let aligner = if pattern.len() > 64 { Aligner::Edlib } else { aligner };
        let ac = match aligner {
            Aligner::AcMyers => AhoCorasick::new([&pattern]).ok(),
            _ => None,
        };
        Searcher { aligner, pattern, ac }
    }

    pub fn pattern(&self) -> &[u8] { &self.pattern }

    pub fn len(&self) -> usize { self.pattern.len() }

    pub fn is_empty(&self) -> bool { self.pattern.is_empty() }

    /// Best hit of the motif in `text` with at most `max_edits` edits.
    pub fn find(&self, text: &[u8], max_edits: usize) -> Option<Hit> {
        if self.pattern.is_empty() || text.is_empty() { return None; }
        match self.aligner {
            Aligner::Edlib => edwrap::locate(&self.pattern, text, max_edits),
            Aligner::Myers => myers_locate(&self.pattern, text, max_edits),
            Aligner::AcMyers => {
                let exact = self.ac.as_ref().and_then(|ac| ac.find(text));
                match exact {
                    Some(m) => Some(Hit { start: m.start(), end: m.end(), edits: 0 }),
                    None => myers_locate(&self.pattern, text, max_edits),
                }
            }
        }
    }
}

/// Longest part of a motif hanging off a read edge.
///
/// At the read start the read can only hold a *suffix* of the motif, at the
/// read end only a *prefix*. Part lengths from `len - 1` down to `min_len` are
/// tried and the first whose identity (over the part) reaches `min_identity`
/// wins. Always aligned with Edlib.
fn edge_hit(pattern: &[u8], window: &[u8], at_start: bool, min_identity: f64, min_len: usize) -> Option<Hit> {
    if pattern.len() < 2 || window.is_empty() { return None; }
    let min_len = min_len.max(1);
    if at_start {
        (min_len..pattern.len()).rev().find_map(|l| {
            let part = &pattern[pattern.len() - l..];
            edwrap::prefix(part, window, max_edits_for(l, min_identity))
        })
    } else {
        let rwin: Vec<u8> = window.iter().rev().copied().collect();
        (min_len..pattern.len()).rev().find_map(|l| {
            let part: Vec<u8> = pattern[..l].iter().rev().copied().collect();
            edwrap::prefix(&part, &rwin, max_edits_for(l, min_identity))
                .map(|h| Hit { start: window.len() - h.end, end: window.len(), edits: h.edits })
        })
    }
}

impl Searcher {
    /// Partial motif at the start of `window` (a motif suffix); see [`edge_hit`].
    pub fn find_at_start(&self, window: &[u8], min_identity: f64, min_len: usize) -> Option<Hit> {
        edge_hit(&self.pattern, window, true, min_identity, min_len)
    }

    /// Partial motif at the end of `window` (a motif prefix); see [`edge_hit`].
    pub fn find_at_end(&self, window: &[u8], min_identity: f64, min_len: usize) -> Option<Hit> {
        edge_hit(&self.pattern, window, false, min_identity, min_len)
    }
}

/// Locate `pattern` in `text` allowing up to `max_edits` edits.
pub fn locate(aligner: Aligner, pattern: &[u8], text: &[u8], max_edits: usize) -> Option<Hit> {
    Searcher::new(aligner, pattern).find(text, max_edits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LA_TOP: &[u8] = b"TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT";

    fn read_with_adapter(adapter: &[u8]) -> Vec<u8> {
        let mut r = b"GATTACA".repeat(3);
        r.extend_from_slice(adapter);
        r.extend(b"CCGGAATT".repeat(4));
        r
    }

    #[test]
    fn all_aligners_agree_on_exact_hit() {
        let read = read_with_adapter(LA_TOP);
        for a in [Aligner::Edlib, Aligner::Myers, Aligner::AcMyers] {
            let h = locate(a, LA_TOP, &read, 4).unwrap_or_else(|| panic!("{a:?} missed"));
            assert_eq!(h.edits, 0, "{a:?}");
            assert_eq!(h.start, 21, "{a:?}");
            assert_eq!(h.end, 21 + LA_TOP.len(), "{a:?}");
        }
    }

    #[test]
    fn tolerates_edits_within_budget() {
        let mut mutated = LA_TOP.to_vec();
        mutated[10] = b'A';
        mutated.remove(20);
        let read = read_with_adapter(&mutated);
        for a in [Aligner::Edlib, Aligner::Myers, Aligner::AcMyers] {
            let h = locate(a, LA_TOP, &read, 3).unwrap();
            assert_eq!(h.edits, 2, "{a:?}");
            assert!(h.identity(LA_TOP.len()) > 94.0);
        }
        assert!(locate(Aligner::Edlib, LA_TOP, &read, 1).is_none());
    }

    #[test]
    fn long_patterns_fall_back_to_edlib() {
        let long = b"ACGT".repeat(20);
        let mut read = b"TTTTT".to_vec();
        read.extend_from_slice(&long);
        let h = locate(Aligner::Myers, &long, &read, 2).unwrap();
        assert_eq!(h.edits, 0);
    }

    #[test]
    fn partial_motif_at_read_edges() {
        // last 20 nt of the motif open the read
        let mut read = LA_TOP[16..].to_vec();
        read.extend(b"GGGGGGGGGGCCGGAATT".repeat(3));
        let s = Searcher::new(Aligner::Edlib, LA_TOP);
        let h = s.find_at_start(&read, 75.0, 4).unwrap();
        assert_eq!((h.start, h.end), (0, 20));
        assert!(s.find(&read, max_edits_for(LA_TOP.len(), 75.0)).is_none());

        // first 20 nt of the motif close the read
        let mut read = b"CCGGAATTAAAAAAAAAAAA".repeat(3);
        read.extend_from_slice(&LA_TOP[..20]);
        let h = s.find_at_end(&read, 75.0, 4).unwrap();
        assert_eq!((h.start, h.end), (read.len() - 20, read.len()));
    }

    #[test]
    fn edge_hits_respect_minimum_length() {
        // only "GCT" of the motif is present; too short for min_len 4
        let read = b"GCTGGGGGGGGGGGG";
        let s = Searcher::new(Aligner::Edlib, LA_TOP);
        if let Some(h) = s.find_at_start(read, 75.0, 4) {
            assert!(h.span() < 4, "{h:?}");
        }
        let h = s.find_at_start(read, 75.0, 3).unwrap();
        assert_eq!(h.end, 3);
    }

    #[test]
    fn identity_and_edit_budget() {
        assert_eq!(identity(0, 20), 100.0);
        assert_eq!(identity(5, 20), 75.0);
        assert_eq!(identity(30, 20), 0.0);
        assert_eq!(max_edits_for(20, 75.0), 5);
        assert_eq!(max_edits_for(36, 90.0), 3);
        assert_eq!(max_edits_for(10, 100.0), 0);
    }

    #[test]
    fn parses_aligner_names() {
        assert_eq!("EDLIB".parse::<Aligner>().unwrap(), Aligner::Edlib);
        assert_eq!("ac-myers".parse::<Aligner>().unwrap(), Aligner::AcMyers);
        assert!("parasail".parse::<Aligner>().is_err());
    }
}
