#![forbid(unsafe_code)]
//! # longqc
//!
//! Quality control and preprocessing for long-read (Oxford Nanopore) sequencing data.
//! One pipeline, four stages, each also usable on its own:
//!
//! 1. **Report** ([`stats`]): read count, bases, length/quality summaries, N50,
//!    reads above Q cutoffs and histograms for the raw reads (`<sample>_prefilt`).
//! 2. **Trim** ([`trim`]): detect the library's adapter set from the first reads,
//!    trim adapters from read ends and split chimeras on middle adapters.
//! 3. **Filter** ([`filter`]): hard length/quality thresholds plus optional
//!    score-ranked subsampling (`keep_percent`, `target_bases`).
//! 4. **Report** again on the filtered reads (`<sample>_postfilt`).
//!
//! Inputs may be FASTQ/FASTA (optionally gzipped), SAM or BAM ([`seqio`]).
//!
//! ## Examples
//! ```rust
//! // Discover adapter sets:
//! for s in longqc::kits::list_adapter_sets() { println!("{} - {}", s.name, s.description); }
//! // Average Phred of a read's quality string:
//! assert!((longqc::quality::average_phred(b"++++") - 10.0).abs() < 1e-9);
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod kit;
pub mod kits;
pub mod pipeline;
pub mod quality;
pub mod seqio;
pub mod stats;
pub mod trim;
pub mod data { pub mod adapters; pub mod legacy; pub mod cdna_legacy; }

pub use error::QcError;

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of worker threads for `threads` (`None` or 0 = all cores).
pub fn worker_count(threads: Option<usize>) -> usize {
    threads.filter(|&t| t > 0).unwrap_or_else(num_cpus::get).max(1)
}

pub(crate) fn thread_pool(threads: Option<usize>) -> anyhow::Result<rayon::ThreadPool> {
    let n = worker_count(threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build()
        .map_err(|e| anyhow::anyhow!("building thread pool with {n} threads: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_defaults_to_all_cores() {
        assert_eq!(worker_count(Some(3)), 3);
        assert_eq!(worker_count(Some(0)), num_cpus::get().max(1));
        assert_eq!(worker_count(None), num_cpus::get().max(1));
    }

    #[test]
    fn thread_pool_has_requested_size() {
        assert_eq!(thread_pool(Some(2)).unwrap().current_num_threads(), 2);
    }
}
