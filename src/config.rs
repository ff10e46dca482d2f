//! Pipeline configuration, loadable from TOML.
//!
//! ```toml
//! read = "reads.fastq.gz"
//! sample_name = "sample1"
//! out_dir = "results"
//!
//! [filter]
//! min_mean_q = 25.0
//! min_length = 1000
//!
//! [trim]
//! adapter_sets = ["LSK114"]
//! ```
//!
//! Every key is optional in the file; the CLI fills `read` and `sample_name`
//! and its explicit flags override file values. `[filter]` keeps the workflow's
//! `min_mean_q = 25.0` unless the table sets it (`0.0` turns it off).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QcError;
use crate::filter::FilterOpts;
use crate::stats::StatsOpts;
use crate::trim::TrimOpts;

/// Mean quality threshold the workflow applies when nothing else is configured.
pub const DEFAULT_MIN_MEAN_Q: f64 = 25.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub read: PathBuf,
    pub sample_name: String,
    pub out_dir: PathBuf,
    /// Worker threads; `None` or 0 uses every core.
    pub threads: Option<usize>,
    pub skip_trim: bool,
    /// Gzip the trimmed and filtered FASTQ outputs.
    pub gzip: bool,
    pub stats: StatsOpts,
    pub trim: TrimOpts,
    #[serde(deserialize_with = "filter_with_workflow_defaults")]
    pub filter: FilterOpts,
}

fn workflow_min_mean_q() -> Option<f64> { Some(DEFAULT_MIN_MEAN_Q) }

/// `[filter]` as written in a config file; `min_mean_q` keeps the workflow default unless given.
#[derive(Deserialize)]
struct FilterTable {
    #[serde(default = "workflow_min_mean_q")]
    min_mean_q: Option<f64>,
    #[serde(flatten)]
    rest: FilterOpts,
}

fn filter_with_workflow_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<FilterOpts, D::Error> {
    let t = FilterTable::deserialize(d)?;
    Ok(FilterOpts { min_mean_q: t.min_mean_q, ..t.rest })
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            read: PathBuf::new(),
            sample_name: String::new(),
            out_dir: PathBuf::from("."),
            threads: None,
            skip_trim: false,
            gzip: false,
            stats: StatsOpts::default(),
            trim: TrimOpts::default(),
            filter: FilterOpts { min_mean_q: Some(DEFAULT_MIN_MEAN_Q), ..FilterOpts::default() },
        }
    }
}

impl PipelineConfig {
    pub fn new(read: impl Into<PathBuf>, sample_name: impl Into<String>) -> Self {
        PipelineConfig { read: read.into(), sample_name: sample_name.into(), ..Default::default() }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pipeline config")
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serialising pipeline config")
    }

    pub fn validate(&self) -> Result<(), QcError> {
        if self.read.as_os_str().is_empty() {
            return Err(QcError::invalid("read", "no input file given"));
        }
        validate_sample_name(&self.sample_name)?;
        self.trim.validate()?;
        self.filter.validate()?;
        if self.stats.bins == 0 {
            return Err(QcError::invalid("stats.bins", "must be at least 1"));
        }
        Ok(())
    }

    /// Read file extension: FASTA when the input carries no qualities.
    fn ext(&self, qualities: bool) -> &'static str {
        match (qualities, self.gzip) {
            (true, false) => "fastq",
            (true, true) => "fastq.gz",
            (false, false) => "fasta",
            (false, true) => "fasta.gz",
        }
    }

    pub fn prefilt_dir(&self) -> PathBuf { self.out_dir.join(format!("{}_prefilt", self.sample_name)) }

    pub fn porechop_path(&self, qualities: bool) -> PathBuf {
        self.out_dir.join(format!("{}_porechop.{}", self.sample_name, self.ext(qualities)))
    }

    pub fn trimmed_path(&self, qualities: bool) -> PathBuf {
        self.out_dir.join(format!("{}_trim.{}", self.sample_name, self.ext(qualities)))
    }

    pub fn postfilt_dir(&self) -> PathBuf { self.out_dir.join(format!("{}_postfilt", self.sample_name)) }

    pub fn summary_path(&self) -> PathBuf { self.out_dir.join(format!("{}_summary.json", self.sample_name)) }
}

/// Sample names become file name prefixes, so they may not be empty or contain separators.
pub fn validate_sample_name(name: &str) -> Result<(), QcError> {
    if name.trim().is_empty() {
        return Err(QcError::invalid("sample_name", "must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(QcError::invalid("sample_name", format!("`{name}` must not contain path separators")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_mean_quality_only() {
        let c = PipelineConfig::new("reads.fastq", "s1");
        assert_eq!(c.filter.min_mean_q, Some(25.0));
        assert!(c.filter.min_length.is_none() && c.filter.max_length.is_none() && c.filter.min_window_q.is_none());
        assert!(!c.skip_trim);
        c.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml() {
        let c = PipelineConfig::from_toml_str(
            r#"
            read = "in.fq.gz"
            sample_name = "barcode01"
            gzip = true

            [filter]
            min_length = 1000
            keep_percent = 90.0

            [trim]
            adapter_sets = ["LSK114"]
            aligner = "myers"
            "#,
        )
        .unwrap();
        assert_eq!(c.read, PathBuf::from("in.fq.gz"));
        assert_eq!(c.filter.min_length, Some(1000));
        assert_eq!(c.filter.keep_percent, Some(90.0));
        assert_eq!(c.filter.min_mean_q, Some(DEFAULT_MIN_MEAN_Q));
        assert_eq!(c.filter.window_size, 250);
        assert_eq!(c.trim.aligner, crate::detect::Aligner::Myers);
        assert_eq!(c.trimmed_path(true), PathBuf::from("./barcode01_trim.fastq.gz"));
        assert_eq!(c.porechop_path(true), PathBuf::from("./barcode01_porechop.fastq.gz"));
    }

    #[test]
    fn filter_table_can_override_mean_quality() {
        let c = PipelineConfig::from_toml_str("[filter]\nmin_mean_q = 90.0\n").unwrap();
        assert_eq!(c.filter.min_mean_q, Some(90.0));
        let c = PipelineConfig::from_toml_str("[filter]\n").unwrap();
        assert_eq!(c.filter, PipelineConfig::default().filter);
        assert!(PipelineConfig::from_toml_str("[filter]\nmin_mean_q = \"high\"\n").is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_bad_names() {
        assert!(PipelineConfig::from_toml_str("sampel_name = \"x\"").is_err());
        for bad in ["", "  ", "a/b", "..", r"a\b"] {
            assert!(validate_sample_name(bad).is_err(), "{bad:?}");
        }
        assert!(validate_sample_name("sample_01.run2").is_ok());
        let mut c = PipelineConfig::new("r.fq", "ok");
        c.filter.min_length = Some(10);
        c.filter.max_length = Some(5);
        assert!(c.validate().is_err());
    }

    #[test]
    fn output_layout() {
        let mut c = PipelineConfig::new("r.fq", "s");
        c.out_dir = PathBuf::from("out");
        assert_eq!(c.prefilt_dir(), PathBuf::from("out/s_prefilt"));
        assert_eq!(c.trimmed_path(true), PathBuf::from("out/s_trim.fastq"));
        assert_eq!(c.trimmed_path(false), PathBuf::from("out/s_trim.fasta"));
        c.gzip = true;
        assert_eq!(c.porechop_path(false), PathBuf::from("out/s_porechop.fasta.gz"));
        assert_eq!(c.postfilt_dir(), PathBuf::from("out/s_postfilt"));
        assert_eq!(c.summary_path(), PathBuf::from("out/s_summary.json"));
    }

    #[test]
    fn toml_round_trip() {
        let mut c = PipelineConfig::new("r.fq", "s");
        c.filter.target_bases = Some(500_000_000);
        let back = PipelineConfig::from_toml_str(&c.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, c);
    }
}
