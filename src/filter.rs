//! Length/quality filtering that keeps the *best* long reads.
//!
//! Two passes over the input:
//! 1. every read is scored and checked against the hard thresholds;
//! 2. the best surviving reads (by score) are selected up to the base budget
//!    and the input is streamed again, writing the kept reads in input order.
//!
//! Quality measures use the 0–100 accuracy scale from [`crate::quality`], so a
//! `min_mean_q` of 90 means "at most 10% expected errors".

use std::cmp::Ordering;
use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::QcError;
use crate::quality::{mean_accuracy, min_window_accuracy};
use crate::seqio::{self, FastqWriter, LongRead};

/// Parameters for [`run`]. Every threshold is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOpts {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_mean_q: Option<f64>,
    pub min_window_q: Option<f64>,
    /// Keep only this percentage of the best reads, measured by bases.
    pub keep_percent: Option<f64>,
    /// Keep only the best reads up to this many bases.
    pub target_bases: Option<u64>,
    pub window_size: usize,
    pub length_weight: f64,
    pub mean_q_weight: f64,
    pub window_q_weight: f64,
}

impl Default for FilterOpts {
    fn default() -> Self {
        FilterOpts {
            min_length: None,
            max_length: None,
            min_mean_q: None,
            min_window_q: None,
            keep_percent: None,
            target_bases: None,
            window_size: 250,
            length_weight: 1.0,
            mean_q_weight: 1.0,
            window_q_weight: 1.0,
        }
    }
}

impl FilterOpts {
    pub fn validate(&self) -> Result<(), QcError> {
        if let (Some(lo), Some(hi)) = (self.min_length, self.max_length) {
            if lo > hi {
                return Err(QcError::invalid("min_length", format!("{lo} is greater than max_length {hi}")));
            }
        }
        for (name, v) in [("min_mean_q", self.min_mean_q), ("min_window_q", self.min_window_q)] {
            if let Some(v) = v {
                if !(0.0..=100.0).contains(&v) {
                    return Err(QcError::invalid(name, format!("{v} is outside 0-100")));
                }
            }
        }
        if let Some(p) = self.keep_percent {
            if !(p > 0.0 && p <= 100.0) {
                return Err(QcError::invalid("keep_percent", format!("{p} is outside (0, 100]")));
            }
        }
        if self.window_size == 0 {
            return Err(QcError::invalid("window_size", "must be at least 1"));
        }
        for (name, w) in [
            ("length_weight", self.length_weight),
            ("mean_q_weight", self.mean_q_weight),
            ("window_q_weight", self.window_q_weight),
        ] {
            if !(w >= 0.0) {
                return Err(QcError::invalid(name, format!("{w} must be non-negative")));
            }
        }
        Ok(())
    }

    /// `true` when any option needs per-base qualities.
    pub fn needs_quality(&self) -> bool {
        self.min_mean_q.is_some() || self.min_window_q.is_some() || self.keep_percent.is_some() || self.target_bases.is_some()
    }

    fn quality_option(&self) -> &'static str {
        if self.min_mean_q.is_some() { "min_mean_q" }
        else if self.min_window_q.is_some() { "min_window_q" }
        else if self.keep_percent.is_some() { "keep_percent" }
        else { "target_bases" }
    }
}

/// Why a read failed a hard threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection { Empty, TooShort, TooLong, LowMeanQuality, LowWindowQuality }

/// Scored read from the first pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadScore {
    pub length: usize,
    pub mean_q: f64,
    pub window_q: f64,
    pub rejection: Option<Rejection>,
}

fn measure(read: &LongRead, opts: &FilterOpts) -> Result<ReadScore, QcError> {
    let (mean_q, window_q) = match &read.qual {
        Some(q) => (mean_accuracy(q), min_window_accuracy(q, opts.window_size)),
        None if opts.needs_quality() => {
            return Err(QcError::MissingQualities { option: opts.quality_option(), read: read.id.clone() });
        }
        None => (100.0, 100.0),
    };
    let length = read.len();
    let rejection = if length == 0 {
        Some(Rejection::Empty)
    } else if opts.min_length.is_some_and(|m| length < m) {
        Some(Rejection::TooShort)
    } else if opts.max_length.is_some_and(|m| length > m) {
        Some(Rejection::TooLong)
    } else if opts.min_mean_q.is_some_and(|m| mean_q < m) {
        Some(Rejection::LowMeanQuality)
    } else if opts.min_window_q.is_some_and(|m| window_q < m) {
        Some(Rejection::LowWindowQuality)
    } else {
        None
    };
    Ok(ReadScore { length, mean_q, window_q, rejection })
}

/// Log-scaled length score relative to the longest read (0–100).
pub fn length_score(length: usize, longest: usize) -> f64 {
    if length == 0 { return 0.0; }
    if longest <= 1 { return 100.0; }
    100.0 * (length as f64).ln() / (longest as f64).ln()
}

/// Combined score: weighted geometric mean of length and mean quality, scaled
/// down when the worst window is worse than the read average.
pub fn final_score(s: &ReadScore, longest: usize, opts: &FilterOpts) -> f64 {
    let l = length_score(s.length, longest);
    let q = s.mean_q;
    let wsum = opts.length_weight + opts.mean_q_weight;
    let mut score = if wsum <= 0.0 || l <= 0.0 || q <= 0.0 {
        0.0
    } else {
        ((opts.length_weight * l.ln() + opts.mean_q_weight * q.ln()) / wsum).exp()
    };
    if s.window_q < s.mean_q && s.mean_q > 0.0 {
        score *= (s.window_q / s.mean_q).powf(opts.window_q_weight);
    }
    score
}

/// Decide which reads to keep. Returns one flag per input read.
pub fn select(scores: &[ReadScore], opts: &FilterOpts) -> Vec<bool> {
    let mut keep: Vec<bool> = scores.iter().map(|s| s.rejection.is_none()).collect();
    if opts.keep_percent.is_none() && opts.target_bases.is_none() {
        return keep;
    }
    let survivors: Vec<usize> = (0..scores.len()).filter(|&i| keep[i]).collect();
    let surviving_bases: u64 = survivors.iter().map(|&i| scores[i].length as u64).sum();
    let mut limit = u64::MAX;
    if let Some(p) = opts.keep_percent {
        limit = limit.min((surviving_bases as f64 * p / 100.0).round() as u64);
    }
    if let Some(t) = opts.target_bases {
        limit = limit.min(t);
    }
    if limit >= surviving_bases {
        return keep;
    }

    let longest = survivors.iter().map(|&i| scores[i].length).max().unwrap_or(0);
    let mut ranked: Vec<(usize, f64)> = survivors.iter().map(|&i| (i, final_score(&scores[i], longest, opts))).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));

    let mut kept_bases = 0u64;
    for (i, _) in ranked {
        if kept_bases < limit {
            kept_bases += scores[i].length as u64;
        } else {
            keep[i] = false;
        }
    }
    keep
}

/// Counts from a filtering run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    pub reads_in: u64,
    pub bases_in: u64,
    pub too_short: u64,
    pub too_long: u64,
    pub low_mean_q: u64,
    pub low_window_q: u64,
    pub empty: u64,
    /// Passed every hard threshold but fell outside `keep_percent`/`target_bases`.
    pub below_target: u64,
    pub reads_out: u64,
    pub bases_out: u64,
}

impl FilterReport {
    fn tally(scores: &[ReadScore], keep: &[bool]) -> Self {
        let mut r = FilterReport::default();
        for (s, &k) in scores.iter().zip(keep) {
            r.reads_in += 1;
            r.bases_in += s.length as u64;
            match s.rejection {
                Some(Rejection::Empty) => r.empty += 1,
                Some(Rejection::TooShort) => r.too_short += 1,
                Some(Rejection::TooLong) => r.too_long += 1,
                Some(Rejection::LowMeanQuality) => r.low_mean_q += 1,
                Some(Rejection::LowWindowQuality) => r.low_window_q += 1,
                None if !k => r.below_target += 1,
                None => {}
            }
            if k {
                r.reads_out += 1;
                r.bases_out += s.length as u64;
            }
        }
        r
    }
}

/// Score every read of `input` (first pass).
pub fn score_file(input: &Path, opts: &FilterOpts, pool: &rayon::ThreadPool) -> Result<Vec<ReadScore>> {
    let mut scores = Vec::new();
    seqio::for_each_chunk(input, seqio::CHUNK, |chunk| {
        let scored: Result<Vec<ReadScore>, QcError> = pool.install(|| chunk.par_iter().map(|r| measure(r, opts)).collect());
        scores.extend(scored?);
        Ok(())
    })?;
    Ok(scores)
}

/// Filter `input` into `output` (FASTQ, gz by extension), preserving read order.
pub fn run(input: &Path, output: &Path, opts: &FilterOpts, threads: Option<usize>) -> Result<FilterReport> {
    opts.validate()?;
    let pool = crate::thread_pool(threads)?;
    log::info!("filter: input={} | output={}", input.display(), output.display());

    let scores = score_file(input, opts, &pool)?;
    let keep = select(&scores, opts);
    let report = FilterReport::tally(&scores, &keep);

    let mut writer = FastqWriter::create(output)?;
    let mut idx = 0usize;
    seqio::for_each_chunk(input, seqio::CHUNK, |chunk| {
        for read in &chunk {
            // the second pass must see the same reads as the first
            anyhow::ensure!(idx < keep.len(), "{} changed between filter passes", input.display());
            if keep[idx] {
                writer.write(read)?;
            }
            idx += 1;
        }
        Ok(())
    })?;
    writer.finish()?;
    log::info!(
        "filter: {} of {} reads kept ({} of {} bases); rejected: {} short, {} long, {} low mean q, {} low window q, {} below target",
        report.reads_out, report.reads_in, report.bases_out, report.bases_in,
        report.too_short, report.too_long, report.low_mean_q, report.low_window_q, report.below_target
    );
    Ok(report)
}
