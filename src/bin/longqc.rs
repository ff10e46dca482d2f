use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;

use longqc::config::PipelineConfig;
use longqc::detect::Aligner;
use longqc::filter::{self, FilterOpts};
use longqc::stats::{self, StatsOpts};
use longqc::trim::{self, TrimOpts};
use longqc::{kits, pipeline};

/// longqc CLI
#[derive(Parser)]
#[command(name = "longqc")]
#[command(version)]
#[command(about = "Long-read QC: read reports, adapter trimming and quality filtering", long_about = None)]
struct Cli {
    /// Threads (0/unset = all)
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

/// Filter thresholds shared by `run` and `filter`.
#[derive(Args, Clone, Debug, Default)]
struct FilterArgs {
    /// Minimum read length
    #[arg(long)]
    min_length: Option<usize>,
    /// Maximum read length
    #[arg(long)]
    max_length: Option<usize>,
    /// Minimum mean read accuracy (0-100)
    #[arg(long)]
    min_mean_q: Option<f64>,
    /// Minimum accuracy of the worst window (0-100)
    #[arg(long)]
    min_window_q: Option<f64>,
    /// Keep this percentage of the best bases
    #[arg(long)]
    keep_percent: Option<f64>,
    /// Keep the best reads up to this many bases
    #[arg(long)]
    target_bases: Option<u64>,
    /// Window size for --min-window-q
    #[arg(long)]
    window_size: Option<usize>,
}

impl FilterArgs {
    /// Overlay explicitly given flags onto `base`.
    fn apply(&self, base: &mut FilterOpts) {
        if self.min_length.is_some() { base.min_length = self.min_length; }
        if self.max_length.is_some() { base.max_length = self.max_length; }
        if self.min_mean_q.is_some() { base.min_mean_q = self.min_mean_q; }
        if self.min_window_q.is_some() { base.min_window_q = self.min_window_q; }
        if self.keep_percent.is_some() { base.keep_percent = self.keep_percent; }
        if self.target_bases.is_some() { base.target_bases = self.target_bases; }
        if let Some(w) = self.window_size { base.window_size = w; }
    }
}

/// Trimming options shared by `run` and `trim`.
#[derive(Args, Clone, Debug, Default)]
struct TrimArgs {
    /// Comma-separated adapter sets (default: detect from the data)
    #[arg(long, value_delimiter = ',')]
    adapters: Vec<String>,
    /// Discard reads with middle adapters instead of splitting them
    #[arg(long)]
    discard_middle: bool,
    /// Do not search for middle adapters
    #[arg(long)]
    no_split: bool,
    /// Aligner (edlib, myers, acmyers)
    #[arg(long)]
    aligner: Option<Aligner>,
}

impl TrimArgs {
    fn apply(&self, base: &mut TrimOpts) {
        if !self.adapters.is_empty() { base.adapter_sets = self.adapters.clone(); }
        if self.discard_middle { base.discard_middle = true; }
        if self.no_split { base.no_split = true; }
        if let Some(a) = self.aligner { base.aligner = a; }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full workflow: report, trim, filter, report
    Run {
        /// Input reads (FASTQ/FASTA[.gz]/SAM/BAM)
        read: PathBuf,
        /// Sample name used to prefix every output
        #[arg(long)]
        sample_name: String,
        /// Output directory
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
        /// TOML config; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip adapter trimming
        #[arg(long)]
        skip_trim: bool,
        /// Gzip FASTQ outputs
        #[arg(long)]
        gzip: bool,
        #[command(flatten)]
        trim: TrimArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write a read report (NanoStats, per-read table, histograms)
    Stats {
        /// Input reads
        read: PathBuf,
        /// Report directory
        #[arg(long, short = 'o')]
        out_dir: PathBuf,
        /// Length histogram bins
        #[arg(long, default_value_t = 50)]
        bins: usize,
    },

    /// Trim adapters and split chimeric reads
    Trim {
        /// Input reads
        read: PathBuf,
        /// Output FASTQ (.gz to compress)
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[command(flatten)]
        trim: TrimArgs,
    },

    /// Filter reads by length and quality
    Filter {
        /// Input reads
        read: PathBuf,
        /// Output FASTQ (.gz to compress)
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List all known adapter sets
    ListAdapters,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let threads = cli.threads;
    match cli.command {
        Commands::Run { read, sample_name, out_dir, config, skip_trim, gzip, trim, filter } => {
            let mut cfg = match &config {
                Some(path) => PipelineConfig::load(path)?,
                None => PipelineConfig::default(),
            };
            cfg.read = read;
            cfg.sample_name = sample_name;
            if let Some(d) = out_dir { cfg.out_dir = d; }
            if threads.is_some() { cfg.threads = threads; }
            if skip_trim { cfg.skip_trim = true; }
            if gzip { cfg.gzip = true; }
            trim.apply(&mut cfg.trim);
            filter.apply(&mut cfg.filter);

            let out = pipeline::run(&cfg)?;
            println!("prefilt\t{}", out.prefilt.display());
            if let Some(p) = &out.porechop {
                println!("porechop\t{}", p.display());
            }
            println!("trimmed\t{}", out.trimmed.display());
            println!("postfilt\t{}", out.postfilt.display());
            println!("summary\t{}", out.summary.display());
        }

        Commands::Stats { read, out_dir, bins } => {
            let opts = StatsOpts { bins, ..Default::default() };
            let (s, files) = stats::run(&read, &out_dir, &opts, threads)?;
            for (k, v) in s.rows() {
                println!("{k}\t{v}");
            }
            log::info!("report written to {}", files.dir.display());
        }

        Commands::Trim { read, output, trim } => {
            let mut opts = TrimOpts::default();
            trim.apply(&mut opts);
            let r = trim::run(&read, &output, &opts, threads)?;
            println!("{}", serde_json::to_string_pretty(&r).context("serialising trim report")?);
        }

        Commands::Filter { read, output, filter } => {
            let mut opts = FilterOpts::default();
            filter.apply(&mut opts);
            let r = filter::run(&read, &output, &opts, threads)?;
            println!("{}", serde_json::to_string_pretty(&r).context("serialising filter report")?);
        }

        Commands::ListAdapters => {
            cmd_list_adapters()?;
        }
    }
    Ok(())
}

fn cmd_list_adapters() -> Result<()> {
    let rows = kits::adapter_set_rows();
    let df = df!(
        "adapter_set" => rows.iter().map(|r| r.0.clone()).collect::<Vec<_>>(),
        "description" => rows.iter().map(|r| r.1.clone()).collect::<Vec<_>>(),
        "legacy"      => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "start"       => rows.iter().map(|r| r.3.clone()).collect::<Vec<_>>(),
        "end"         => rows.iter().map(|r| r.4.clone()).collect::<Vec<_>>(),
    )?;

    // Read by polars' pretty-printer; show every row and full cell width.
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");

    println!("{}", df);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::try_parse_from([
            "longqc", "run", "r.fq", "--sample-name", "s", "--min-length", "500", "--adapters", "LSK114,NBD114", "--threads", "4",
        ])
        .unwrap();
        assert_eq!(cli.threads, Some(4));
        let Commands::Run { trim, filter, .. } = cli.command else { panic!("expected run") };
        let mut f = PipelineConfig::default().filter;
        filter.apply(&mut f);
        assert_eq!(f.min_length, Some(500));
        assert_eq!(f.min_mean_q, Some(25.0));
        let mut t = TrimOpts::default();
        trim.apply(&mut t);
        assert_eq!(t.adapter_sets, ["LSK114", "NBD114"]);
    }
}
