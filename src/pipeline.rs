//! The four-stage QC workflow for one sample:
//! report (`_prefilt`) → trim (`_porechop`) → filter (`_trim`) → report (`_postfilt`).
//!
//! Stages run strictly in that order, each reading the previous stage's output.
//! A failing stage aborts the run; the error carries the stage and sample name.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use crate::config::PipelineConfig;
use crate::filter::{self, FilterOpts, FilterReport};
use crate::seqio::InputFormat;
use crate::stats::{self, SummaryStats};
use crate::trim::{self, TrimReport};

/// Paths produced by [`run`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutputs {
    pub prefilt: PathBuf,
    /// Adapter-trimmed reads; `None` when trimming was skipped.
    pub porechop: Option<PathBuf>,
    /// Final filtered reads.
    pub trimmed: PathBuf,
    pub postfilt: PathBuf,
    pub summary: PathBuf,
}

/// Contents of `<sample>_summary.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub sample_name: String,
    pub version: String,
    pub input: PathBuf,
    pub prefilt: SummaryStats,
    pub trim: Option<TrimReport>,
    pub filter: FilterReport,
    pub postfilt: SummaryStats,
    pub outputs: PipelineOutputs,
}

/// Whether the reads carry base qualities: FASTA never does, SAM/BAM records may
/// lack them (`QUAL` of `*`), so the pre-filter report decides once it has seen reads.
fn reads_have_qualities(format: InputFormat, prefilt: &SummaryStats) -> bool {
    if prefilt.number_of_reads == 0 { format.has_qualities() } else { prefilt.mean_qual.is_some() }
}

/// Quality thresholds cannot apply to reads without qualities; keep the length ones.
fn effective_filter(opts: &FilterOpts, qualities: bool) -> FilterOpts {
    if qualities || !opts.needs_quality() {
        return opts.clone();
    }
    log::warn!("input has no base qualities; applying length thresholds only");
    FilterOpts { min_mean_q: None, min_window_q: None, keep_percent: None, target_bases: None, ..opts.clone() }
}

/// Run every stage for `cfg` and return the output paths.
pub fn run(cfg: &PipelineConfig) -> Result<PipelineOutputs> {
    cfg.validate()?;
    let sample = cfg.sample_name.as_str();
    let format = InputFormat::detect(&cfg.read)?;
    std::fs::create_dir_all(&cfg.out_dir).with_context(|| format!("creating output directory {}", cfg.out_dir.display()))?;
    log::info!(
        "pipeline: sample={sample} | input={} ({format:?}) | out={} | threads={}",
        cfg.read.display(),
        cfg.out_dir.display(),
        crate::worker_count(cfg.threads)
    );

    let prefilt_dir = cfg.prefilt_dir();
    let (prefilt, _) = stats::run(&cfg.read, &prefilt_dir, &cfg.stats, cfg.threads)
        .with_context(|| format!("pre-filter report failed for sample {sample}"))?;

    let qualities = reads_have_qualities(format, &prefilt);
    let outputs = PipelineOutputs {
        prefilt: prefilt_dir,
        porechop: (!cfg.skip_trim).then(|| cfg.porechop_path(qualities)),
        trimmed: cfg.trimmed_path(qualities),
        postfilt: cfg.postfilt_dir(),
        summary: cfg.summary_path(),
    };

    let (filter_input, trim_report) = match &outputs.porechop {
        Some(path) => {
            let report = trim::run(&cfg.read, path, &cfg.trim, cfg.threads)
                .with_context(|| format!("adapter trimming failed for sample {sample}"))?;
            (path.clone(), Some(report))
        }
        None => {
            log::info!("pipeline: adapter trimming skipped");
            (cfg.read.clone(), None)
        }
    };

    let filter_opts = effective_filter(&cfg.filter, qualities);
    let filter_report = filter::run(&filter_input, &outputs.trimmed, &filter_opts, cfg.threads)
        .with_context(|| format!("read filtering failed for sample {sample}"))?;

    let (postfilt, _) = stats::run(&outputs.trimmed, &outputs.postfilt, &cfg.stats, cfg.threads)
        .with_context(|| format!("post-filter report failed for sample {sample}"))?;

    let summary = PipelineSummary {
        sample_name: sample.to_string(),
        version: crate::VERSION.to_string(),
        input: cfg.read.clone(),
        prefilt,
        trim: trim_report,
        filter: filter_report,
        postfilt,
        outputs: outputs.clone(),
    };
    let f = File::create(&outputs.summary).with_context(|| format!("creating {}", outputs.summary.display()))?;
    serde_json::to_writer_pretty(f, &summary).with_context(|| format!("writing {}", outputs.summary.display()))?;

    log::info!(
        "pipeline: {sample} done; {} → {} reads, N50 {} → {}",
        summary.prefilt.number_of_reads,
        summary.postfilt.number_of_reads,
        summary.prefilt.n50,
        summary.postfilt.n50
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_without_qualities_drop_quality_thresholds() {
        let opts = FilterOpts { min_length: Some(500), min_mean_q: Some(25.0), keep_percent: Some(90.0), ..Default::default() };
        let eff = effective_filter(&opts, false);
        assert_eq!(eff.min_length, Some(500));
        assert!(!eff.needs_quality());
        assert_eq!(effective_filter(&opts, true), opts);
    }

    #[test]
    fn observed_qualities_decide_over_the_format() {
        use crate::seqio::LongRead;
        use crate::stats::ReadSummary;
        let fastq = LongRead { id: "q".into(), seq: b"ACGT".to_vec(), qual: Some(b"5555".to_vec()) };
        let bare = LongRead { qual: None, ..fastq.clone() };
        let with_q = SummaryStats::from_reads(&[ReadSummary::of(&fastq)]);
        let without_q = SummaryStats::from_reads(&[ReadSummary::of(&bare)]);
        let empty = SummaryStats::from_reads(&[]);
        assert!(!reads_have_qualities(InputFormat::Bam, &without_q));
        assert!(reads_have_qualities(InputFormat::Bam, &with_q));
        assert!(reads_have_qualities(InputFormat::Sam, &empty));
        assert!(!reads_have_qualities(InputFormat::Fasta, &empty));
    }

    #[test]
    fn invalid_sample_name_fails_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = PipelineConfig::new(dir.path().join("missing.fastq"), "a/b");
        cfg.out_dir = dir.path().join("out");
        let err = run(&cfg).unwrap_err();
        assert!(err.to_string().contains("sample_name"), "{err:#}");
        assert!(!cfg.out_dir.exists());
    }

    #[test]
    fn missing_input_names_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = PipelineConfig::new(dir.path().join("missing.fastq"), "s1");
        cfg.out_dir = dir.path().to_path_buf();
        let err = run(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("pre-filter report failed for sample s1"), "{err:#}");
    }
}
