//! Phred arithmetic over ASCII (Phred+33) quality strings.
//!
//! Two scales are used across the crate:
//! - **average Phred** (`-10·log10(mean error)`), the per-read quality shown in reports;
//! - **accuracy** (`100·(1 - mean error)`), the 0–100 scale the read filter thresholds on.
//!
//! Both average error *probabilities*, never raw Phred values.

use std::sync::OnceLock;

/// ASCII offset of Sanger / Illumina 1.8+ / nanopore FASTQ.
pub const PHRED_OFFSET: u8 = 33;

fn error_table() -> &'static [f64; 256] {
    static TABLE: OnceLock<[f64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [1.0f64; 256];
        for (b, e) in t.iter_mut().enumerate() {
            let q = (b as u8).saturating_sub(PHRED_OFFSET);
            *e = 10f64.powf(-(q as f64) / 10.0);
        }
        t
    })
}

/// Error probability for one ASCII quality byte.
#[inline]
pub fn phred_to_error(ascii: u8) -> f64 { error_table()[ascii as usize] }

/// Mean per-base error probability (0.0 for an empty string).
pub fn mean_error(qual: &[u8]) -> f64 {
    if qual.is_empty() { return 0.0; }
    let table = error_table();
    qual.iter().map(|&b| table[b as usize]).sum::<f64>() / qual.len() as f64
}

/// Read quality as reported by nanopore QC tools: `-10·log10(mean error)`.
///
/// # Examples
/// ```
/// let q = longqc::quality::average_phred(b"++++"); // Q10 everywhere
/// assert!((q - 10.0).abs() < 1e-9);
/// ```
pub fn average_phred(qual: &[u8]) -> f64 {
    if qual.is_empty() { return 0.0; }
    let e = mean_error(qual);
    if e <= 0.0 { return 0.0; }
    -10.0 * e.log10()
}

/// Mean base accuracy on a 0–100 scale.
pub fn mean_accuracy(qual: &[u8]) -> f64 {
    if qual.is_empty() { return 0.0; }
    100.0 * (1.0 - mean_error(qual))
}

/// Lowest accuracy of any `window`-sized stretch of the read.
///
/// Reads shorter than `window` are scored as a single window.
pub fn min_window_accuracy(qual: &[u8], window: usize) -> f64 {
    if qual.is_empty() { return 0.0; }
    if window == 0 || qual.len() <= window { return mean_accuracy(qual); }
    let table = error_table();
    let mut sum: f64 = qual[..window].iter().map(|&b| table[b as usize]).sum();
    let mut worst = sum;
    for i in window..qual.len() {
        sum += table[qual[i] as usize] - table[qual[i - window] as usize];
        if sum > worst { worst = sum; }
    }
    100.0 * (1.0 - worst / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(phred: u8, n: usize) -> Vec<u8> { vec![phred + PHRED_OFFSET; n] }

    #[test]
    fn error_lookup_matches_definition() {
        assert!((phred_to_error(b'!') - 1.0).abs() < 1e-12);
        assert!((phred_to_error(b'+') - 0.1).abs() < 1e-12);
        assert!((phred_to_error(b'5') - 0.01).abs() < 1e-12);
        // below the offset clamps to Q0
        assert!((phred_to_error(b' ') - 1.0).abs() < 1e-12);
    }

    #[test]
    fn average_phred_averages_probabilities() {
        // half Q10 (0.1) and half Q20 (0.01) -> mean 0.055 -> ~Q12.6, not Q15
        let mut qual = q(10, 2);
        qual.extend(q(20, 2));
        let avg = average_phred(&qual);
        assert!((avg - 12.596).abs() < 1e-3, "{avg}");
    }

    #[test]
    fn accuracy_scale() {
        assert!((mean_accuracy(&q(10, 8)) - 90.0).abs() < 1e-9);
        assert!((mean_accuracy(&q(20, 8)) - 99.0).abs() < 1e-9);
        assert_eq!(mean_accuracy(b""), 0.0);
        assert_eq!(average_phred(b""), 0.0);
    }

    #[test]
    fn window_finds_the_worst_stretch() {
        let mut qual = q(20, 50);
        qual.extend(q(0, 10));
        qual.extend(q(20, 50));
        let w = min_window_accuracy(&qual, 10);
        assert!(w.abs() < 1e-9, "{w}");
        // whole-read window when shorter than the window size
        assert!((min_window_accuracy(&q(10, 5), 250) - 90.0).abs() < 1e-9);
        assert!(min_window_accuracy(&qual, 20) < mean_accuracy(&qual));
    }
}
