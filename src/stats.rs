//! Read-level QC report: length/quality summaries, N50, quality cutoffs and histograms.
//!
//! Per-read quality is the *average Phred* of the read (error probabilities are
//! averaged, then converted back), and the dataset mean quality is the mean of
//! those per-read values.
//!
//! [`write_report`] lays a report directory out as:
//! - `NanoStats.txt`: tab-separated `metric\tvalue` lines
//! - `NanoStats.json`: the same summary as JSON
//! - `reads.tsv`: one row per read
//! - `length_histogram.tsv`, `quality_histogram.tsv`

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::quality::average_phred;
use crate::seqio::{self, LongRead};

/// Quality cutoffs reported as "reads above Q".
pub const Q_CUTOFFS: [u32; 5] = [5, 7, 10, 12, 15];

/// Report options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOpts {
    /// Number of equal-width bins in the length histogram.
    pub bins: usize,
    /// Add input path and tool version to the head of `NanoStats.txt`.
    pub info_in_report: bool,
}

impl Default for StatsOpts {
    fn default() -> Self { StatsOpts { bins: 50, info_in_report: true } }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadSummary {
    pub id: String,
    pub length: usize,
    pub quality: Option<f64>,
    pub gc: f64,
}

impl ReadSummary {
    pub fn of(read: &LongRead) -> Self {
        let gc = if read.is_empty() {
            0.0
        } else {
            read.seq.iter().filter(|b| matches!(b, b'G' | b'C' | b'g' | b'c')).count() as f64 / read.len() as f64
        };
        ReadSummary {
            id: read.id.split_whitespace().next().unwrap_or("").to_string(),
            length: read.len(),
            quality: read.qual.as_deref().map(average_phred),
            gc,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityCutoff {
    pub cutoff: u32,
    pub reads: u64,
    pub percent: f64,
    pub megabases: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub number_of_reads: u64,
    pub number_of_bases: u64,
    pub mean_read_length: f64,
    pub median_read_length: f64,
    pub read_length_stdev: f64,
    pub n50: u64,
    pub mean_qual: Option<f64>,
    pub median_qual: Option<f64>,
    pub gc_content: f64,
    /// Five longest reads as `(length, quality)`.
    pub longest_reads: Vec<(u64, Option<f64>)>,
    /// Five best reads as `(quality, length)`.
    pub highest_q_reads: Vec<(f64, u64)>,
    pub quality_cutoffs: Vec<QualityCutoff>,
}

fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// N50 of a set of lengths: reads at least this long hold half of all bases.
pub fn n50(lengths: &[u64]) -> u64 {
    let total: u64 = lengths.iter().sum();
    if total == 0 { return 0; }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut acc = 0u64;
    for l in sorted {
        acc += l;
        if acc * 2 >= total { return l; }
    }
    0
}

impl SummaryStats {
    pub fn from_reads(reads: &[ReadSummary]) -> Self {
        let n = reads.len();
        if n == 0 {
            return SummaryStats::default();
        }
        let lengths: Vec<u64> = reads.iter().map(|r| r.length as u64).collect();
        let total: u64 = lengths.iter().sum();
        let mean_len = total as f64 / n as f64;
        let var = lengths.iter().map(|&l| (l as f64 - mean_len).powi(2)).sum::<f64>() / n as f64;
        let mut sorted_len: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
        sorted_len.sort_by(f64::total_cmp);

        let mut quals: Vec<f64> = reads.iter().filter_map(|r| r.quality).collect();
        let (mean_qual, median_qual) = if quals.is_empty() {
            (None, None)
        } else {
            let m = quals.iter().sum::<f64>() / quals.len() as f64;
            quals.sort_by(f64::total_cmp);
            (Some(m), Some(median(&quals)))
        };

        let gc_bases: f64 = reads.iter().map(|r| r.gc * r.length as f64).sum();
        let gc_content = if total > 0 { gc_bases / total as f64 } else { 0.0 };

        let mut by_len: Vec<&ReadSummary> = reads.iter().collect();
        by_len.sort_by(|a, b| b.length.cmp(&a.length));
        let longest_reads = by_len.iter().take(5).map(|r| (r.length as u64, r.quality)).collect();

        let mut by_q: Vec<(f64, u64)> = reads.iter().filter_map(|r| r.quality.map(|q| (q, r.length as u64))).collect();
        by_q.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
        by_q.truncate(5);

        let quality_cutoffs = if mean_qual.is_some() {
            Q_CUTOFFS
                .iter()
                .map(|&c| {
                    let above: Vec<&ReadSummary> = reads.iter().filter(|r| r.quality.is_some_and(|q| q > c as f64)).collect();
                    let bases: u64 = above.iter().map(|r| r.length as u64).sum();
                    QualityCutoff {
                        cutoff: c,
                        reads: above.len() as u64,
                        percent: 100.0 * above.len() as f64 / n as f64,
                        megabases: bases as f64 / 1e6,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        SummaryStats {
            number_of_reads: n as u64,
            number_of_bases: total,
            mean_read_length: mean_len,
            median_read_length: median(&sorted_len),
            read_length_stdev: var.sqrt(),
            n50: n50(&lengths),
            mean_qual,
            median_qual,
            gc_content,
            longest_reads,
            highest_q_reads: by_q,
            quality_cutoffs,
        }
    }

    /// `(metric, value)` rows in report order.
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("number_of_reads".to_string(), self.number_of_reads.to_string()),
            ("number_of_bases".to_string(), self.number_of_bases.to_string()),
            ("median_read_length".to_string(), format!("{:.1}", self.median_read_length)),
            ("mean_read_length".to_string(), format!("{:.1}", self.mean_read_length)),
            ("read_length_stdev".to_string(), format!("{:.1}", self.read_length_stdev)),
            ("n50".to_string(), self.n50.to_string()),
            ("gc_content".to_string(), format!("{:.4}", self.gc_content)),
        ];
        if let (Some(mean), Some(med)) = (self.mean_qual, self.median_qual) {
            rows.push(("mean_qual".to_string(), format!("{mean:.1}")));
            rows.push(("median_qual".to_string(), format!("{med:.1}")));
        }
        for (i, (len, q)) in self.longest_reads.iter().enumerate() {
            let q = q.map(|q| format!("{q:.1}")).unwrap_or_else(|| "NA".to_string());
            rows.push((format!("longest_read_(with_Q):{}", i + 1), format!("{len} ({q})")));
        }
        for (i, (q, len)) in self.highest_q_reads.iter().enumerate() {
            rows.push((format!("highest_Q_read_(with_length):{}", i + 1), format!("{q:.1} ({len})")));
        }
        for c in &self.quality_cutoffs {
            rows.push((
                format!(">Q{}", c.cutoff),
                format!("{} ({:.1}%) {:.1}Mb", c.reads, c.percent, c.megabases),
            ));
        }
        rows
    }
}

/// Summarise every read of `input`, in input order.
pub fn collect(input: &Path, threads: Option<usize>) -> Result<Vec<ReadSummary>> {
    let pool = crate::thread_pool(threads)?;
    let mut out = Vec::new();
    seqio::for_each_chunk(input, seqio::CHUNK, |chunk| {
        let summaries: Vec<ReadSummary> = pool.install(|| chunk.par_iter().map(ReadSummary::of).collect());
        out.extend(summaries);
        Ok(())
    })?;
    Ok(out)
}

/// Equal-width histogram over `[0, max]`: rows of `(bin_start, bin_end, count)`.
pub fn histogram(values: &[f64], bins: usize, width: Option<f64>) -> Vec<(f64, f64, u64)> {
    let max = values.iter().copied().fold(0.0f64, f64::max);
    let (bins, width) = match width {
        Some(w) if w > 0.0 => (((max / w).floor() as usize + 1).max(1), w),
        _ => {
            let bins = bins.max(1);
            let w = if max > 0.0 { max / bins as f64 } else { 1.0 };
            (bins, w)
        }
    };
    let mut counts = vec![0u64; bins];
    for &v in values {
        let i = ((v / width).floor() as usize).min(bins - 1);
        counts[i] += 1;
    }
    counts.into_iter().enumerate().map(|(i, c)| (i as f64 * width, (i + 1) as f64 * width, c)).collect()
}

fn histogram_df(rows: &[(f64, f64, u64)]) -> PolarsResult<DataFrame> {
    df!(
        "bin_start" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "bin_end"   => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "count"     => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
    )
}

/// Per-read table (id, length, quality, gc).
pub fn reads_df(reads: &[ReadSummary]) -> PolarsResult<DataFrame> {
    df!(
        "read_id" => reads.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        "length"  => reads.iter().map(|r| r.length as u64).collect::<Vec<_>>(),
        "quality" => reads.iter().map(|r| r.quality).collect::<Vec<_>>(),
        "gc"      => reads.iter().map(|r| r.gc).collect::<Vec<_>>(),
    )
}

fn write_tsv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(f)
        .include_header(true)
        .with_separator(b'\t')
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Files written by [`write_report`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportFiles {
    pub dir: PathBuf,
    pub stats_tsv: PathBuf,
    pub stats_json: PathBuf,
    pub reads_tsv: PathBuf,
    pub length_histogram: PathBuf,
    pub quality_histogram: PathBuf,
}

/// Write a report for `reads` (summarised from `input`) into `dir`.
pub fn write_report(input: &Path, reads: &[ReadSummary], stats: &SummaryStats, dir: &Path, opts: &StatsOpts) -> Result<ReportFiles> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let files = ReportFiles {
        dir: dir.to_path_buf(),
        stats_tsv: dir.join("NanoStats.txt"),
        stats_json: dir.join("NanoStats.json"),
        reads_tsv: dir.join("reads.tsv"),
        length_histogram: dir.join("length_histogram.tsv"),
        quality_histogram: dir.join("quality_histogram.tsv"),
    };

    let mut w = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(&files.stats_tsv)
        .with_context(|| format!("creating {}", files.stats_tsv.display()))?;
    if opts.info_in_report {
        w.write_record(["#input", &input.display().to_string()])?;
        w.write_record(["#longqc_version", crate::VERSION])?;
    }
    w.write_record(["Metrics", "dataset"])?;
    for (k, v) in stats.rows() {
        w.write_record([k, v])?;
    }
    w.flush()?;

    let json = File::create(&files.stats_json).with_context(|| format!("creating {}", files.stats_json.display()))?;
    serde_json::to_writer_pretty(json, stats)?;

    write_tsv(&mut reads_df(reads)?, &files.reads_tsv)?;

    let lengths: Vec<f64> = reads.iter().map(|r| r.length as f64).collect();
    write_tsv(&mut histogram_df(&histogram(&lengths, opts.bins, None))?, &files.length_histogram)?;
    let quals: Vec<f64> = reads.iter().filter_map(|r| r.quality).collect();
    write_tsv(&mut histogram_df(&histogram(&quals, 0, Some(1.0)))?, &files.quality_histogram)?;

    Ok(files)
}

/// Summarise `input` and write its report into `dir`.
pub fn run(input: &Path, dir: &Path, opts: &StatsOpts, threads: Option<usize>) -> Result<(SummaryStats, ReportFiles)> {
    log::info!("stats: input={} | report={}", input.display(), dir.display());
    let reads = collect(input, threads)?;
    let stats = SummaryStats::from_reads(&reads);
    let files = write_report(input, &reads, &stats, dir, opts)?;
    log::info!(
        "stats: {} reads, {} bases, N50 {}, mean quality {}",
        stats.number_of_reads,
        stats.number_of_bases,
        stats.n50,
        stats.mean_qual.map(|q| format!("{q:.1}")).unwrap_or_else(|| "NA".into())
    );
    Ok((stats, files))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(len: usize, q: Option<f64>) -> ReadSummary {
        ReadSummary { id: format!("r{len}"), length: len, quality: q, gc: 0.5 }
    }

    #[test]
    fn n50_matches_definition() {
        assert_eq!(n50(&[2, 3, 4, 5, 6, 7, 8, 9, 10]), 8);
        assert_eq!(n50(&[100]), 100);
        assert_eq!(n50(&[]), 0);
        assert_eq!(n50(&[10, 10]), 10);
    }

    #[test]
    fn summary_of_known_set() {
        let reads = vec![summary(1000, Some(10.0)), summary(3000, Some(20.0)), summary(2000, Some(6.0))];
        let s = SummaryStats::from_reads(&reads);
        assert_eq!(s.number_of_reads, 3);
        assert_eq!(s.number_of_bases, 6000);
        assert_eq!(s.mean_read_length, 2000.0);
        assert_eq!(s.median_read_length, 2000.0);
        assert_eq!(s.n50, 2000);
        assert!((s.mean_qual.unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(s.median_qual, Some(10.0));
        assert_eq!(s.longest_reads[0], (3000, Some(20.0)));
        assert_eq!(s.highest_q_reads[0], (20.0, 3000));
        let q10 = s.quality_cutoffs.iter().find(|c| c.cutoff == 10).unwrap();
        // strictly greater than the cutoff
        assert_eq!(q10.reads, 1);
        assert!((q10.megabases - 0.003).abs() < 1e-12);
        let q5 = s.quality_cutoffs.iter().find(|c| c.cutoff == 5).unwrap();
        assert_eq!(q5.reads, 3);
        assert_eq!(q5.percent, 100.0);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let s = SummaryStats::from_reads(&[]);
        assert_eq!(s.number_of_reads, 0);
        assert_eq!(s.n50, 0);
        assert!(s.mean_qual.is_none());
        assert!(s.longest_reads.is_empty());
    }

    #[test]
    fn fasta_reads_have_no_quality_rows() {
        let s = SummaryStats::from_reads(&[summary(10, None), summary(20, None)]);
        assert!(s.quality_cutoffs.is_empty());
        assert!(!s.rows().iter().any(|(k, _)| k == "mean_qual"));
        assert_eq!(s.longest_reads[0], (20, None));
    }

    #[test]
    fn read_summary_from_read() {
        let r = LongRead { id: "abc runid=1".into(), seq: b"GGCCAATT".to_vec(), qual: Some(b"++++++++".to_vec()) };
        let s = ReadSummary::of(&r);
        assert_eq!(s.id, "abc");
        assert_eq!(s.length, 8);
        assert_eq!(s.gc, 0.5);
        assert!((s.quality.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_bins() {
        let h = histogram(&[0.0, 5.0, 10.0], 2, None);
        assert_eq!(h.len(), 2);
        assert_eq!(h[0], (0.0, 5.0, 1));
        assert_eq!(h[1], (5.0, 10.0, 2));
        let q = histogram(&[7.2, 7.9, 12.1], 0, Some(1.0));
        assert_eq!(q.len(), 13);
        assert_eq!(q[7].2, 2);
        assert_eq!(q[12].2, 1);
        assert_eq!(histogram(&[], 3, None).iter().map(|r| r.2).sum::<u64>(), 0);
    }

    #[test]
    fn report_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        let reads = vec![summary(1000, Some(10.0)), summary(3000, Some(20.0))];
        let stats = SummaryStats::from_reads(&reads);
        let out = dir.path().join("sample_prefilt");
        let files = write_report(Path::new("in.fastq"), &reads, &stats, &out, &StatsOpts::default()).unwrap();
        let txt = std::fs::read_to_string(&files.stats_tsv).unwrap();
        assert!(txt.starts_with("#input\tin.fastq\n"));
        assert!(txt.contains("number_of_reads\t2\n"));
        assert!(txt.contains("n50\t3000\n"));
        let json: SummaryStats = serde_json::from_reader(File::open(&files.stats_json).unwrap()).unwrap();
        assert_eq!(json, stats);
        let tsv = std::fs::read_to_string(&files.reads_tsv).unwrap();
        assert_eq!(tsv.lines().next().unwrap(), "read_id\tlength\tquality\tgc");
        assert_eq!(tsv.lines().count(), 3);
        assert!(files.length_histogram.exists() && files.quality_histogram.exists());
    }
}
