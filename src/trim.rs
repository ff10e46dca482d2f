//! Adapter trimming for long reads.
//!
//! Three steps, all driven by the adapter sets in [`crate::kits`]:
//! 1. **Detection**: the first `check_reads` reads are scanned for every known
//!    set; sets whose best end-alignment identity reaches `adapter_threshold` are used.
//! 2. **End trimming**: start adapters are removed from the first `end_size`
//!    bases, end adapters from the last `end_size` bases.
//! 3. **Middle adapters**: adapters found inside the remaining read mark
//!    chimeras, which are split (default), kept whole (`no_split`) or discarded.
//!
//! Reads from the reverse strand carry the reverse complement of the *other*
//! end's adapter, so both orientations are searched at each end.

use std::path::Path;

use anyhow::{Context, Result};
use bio::alphabets::dna::revcomp;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detect::{max_edits_for, Aligner, Hit, Searcher};
use crate::error::QcError;
use crate::kit::AdapterSet;
use crate::kits;
use crate::seqio::{self, FastqWriter, LongRead};

/// Parameters for [`run`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimOpts {
    /// Adapter set names to trim; empty means detect from the data.
    pub adapter_sets: Vec<String>,
    pub check_reads: usize,
    pub adapter_threshold: f64,
    pub end_size: usize,
    pub end_threshold: f64,
    pub min_trim_size: usize,
    pub extra_end_trim: usize,
    pub middle_threshold: f64,
    pub extra_middle_trim_good_side: usize,
    pub extra_middle_trim_bad_side: usize,
    pub min_split_read_size: usize,
    pub discard_middle: bool,
    pub no_split: bool,
    pub aligner: Aligner,
}

impl Default for TrimOpts {
    fn default() -> Self {
        TrimOpts {
            adapter_sets: Vec::new(),
            check_reads: 10_000,
            adapter_threshold: 90.0,
            end_size: 150,
            end_threshold: 75.0,
            min_trim_size: 4,
            extra_end_trim: 2,
            middle_threshold: 85.0,
            extra_middle_trim_good_side: 10,
            extra_middle_trim_bad_side: 100,
            min_split_read_size: 1000,
            discard_middle: false,
            no_split: false,
            aligner: Aligner::Edlib,
        }
    }
}

impl TrimOpts {
    pub fn validate(&self) -> Result<(), QcError> {
        for (name, v) in [
            ("adapter_threshold", self.adapter_threshold),
            ("end_threshold", self.end_threshold),
            ("middle_threshold", self.middle_threshold),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(QcError::invalid(name, format!("{v} is outside 0-100")));
            }
        }
        if self.end_size == 0 {
            return Err(QcError::invalid("end_size", "must be at least 1"));
        }
        if self.discard_middle && self.no_split {
            return Err(QcError::invalid("discard_middle", "cannot be combined with no_split"));
        }
        kits::resolve_adapter_sets(&self.adapter_sets)?;
        Ok(())
    }
}

/// Which side of an insert an adapter hit borders; decides the asymmetric middle trim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side { Start, End }

#[derive(Clone, Debug)]
struct Motif {
    name: String,
    side: Side,
    searcher: Searcher,
}

impl Motif {
    fn new(name: String, side: Side, seq: &[u8], aligner: Aligner) -> Self {
        Motif { name, side, searcher: Searcher::new(aligner, seq) }
    }

    fn best(&self, text: &[u8], min_identity: f64) -> Option<Hit> {
        let len = self.searcher.len();
        self.searcher
            .find(text, max_edits_for(len, min_identity))
            .filter(|h| h.identity(len) >= min_identity)
    }

    /// Non-overlapping hits anywhere in `text`, sorted by position.
    ///
    /// The best hit of a range splits it in two and both sides are searched
    /// again, so a weaker hit left of a stronger one is still found.
    fn all(&self, text: &[u8], min_identity: f64) -> Vec<Hit> {
        let mut out = Vec::new();
        let mut ranges = vec![(0usize, text.len())];
        while let Some((lo, hi)) = ranges.pop() {
            if hi - lo < self.searcher.len() / 2 { continue; }
            if let Some(h) = self.best(&text[lo..hi], min_identity).filter(|h| h.end > h.start) {
                let h = h.offset(lo);
                ranges.push((lo, h.start));
                ranges.push((h.end, hi));
                out.push(h);
            }
        }
        out.sort_unstable_by_key(|h| h.start);
        out
    }
}

fn rc_str(s: &str) -> Vec<u8> { revcomp(s.as_bytes()) }

/// Best identity per adapter set seen while scanning sample reads.
#[derive(Clone, Debug, Serialize)]
pub struct AdapterSetScore {
    pub name: &'static str,
    pub start_identity: f64,
    pub end_identity: f64,
}

impl AdapterSetScore {
    pub fn best(&self) -> f64 { self.start_identity.max(self.end_identity) }
}

fn upper(seq: &[u8]) -> Vec<u8> { seq.to_ascii_uppercase() }

fn end_windows(seq: &[u8], end_size: usize) -> (&[u8], &[u8], usize) {
    let w = end_size.min(seq.len());
    let off = seq.len() - w;
    (&seq[..w], &seq[off..], off)
}

/// Score every adapter set against the given reads.
pub fn score_adapter_sets(reads: &[LongRead], opts: &TrimOpts) -> Vec<AdapterSetScore> {
    kits::list_adapter_sets()
        .iter()
        .map(|set| {
            // start window: forward start adapter or, on the reverse strand, rc(end)
            let mut starts = Vec::new();
            let mut ends = Vec::new();
            if let Some(s) = set.start {
                starts.push(Searcher::new(opts.aligner, s.sequence.as_bytes()));
                ends.push(Searcher::new(opts.aligner, &rc_str(s.sequence)));
            }
            if let Some(e) = set.end {
                ends.push(Searcher::new(opts.aligner, e.sequence.as_bytes()));
                starts.push(Searcher::new(opts.aligner, &rc_str(e.sequence)));
            }
            let best_in = |searchers: &[Searcher], text: &[u8]| -> f64 {
                searchers
                    .iter()
                    .filter_map(|s| s.find(text, s.len() / 2).map(|h| h.identity(s.len())))
                    .fold(0.0f64, f64::max)
            };
            let (start_identity, end_identity) = reads
                .par_iter()
                .map(|r| {
                    let seq = upper(&r.seq);
                    let (head, tail, _) = end_windows(&seq, opts.end_size);
                    (best_in(&starts, head), best_in(&ends, tail))
                })
                .reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1.max(b.1)));
            AdapterSetScore { name: set.name, start_identity, end_identity }
        })
        .collect()
}

/// Mean identity over the ends `set` has adapters for.
fn set_score(score: &AdapterSetScore, set: &AdapterSet) -> f64 {
    let sides: Vec<f64> = [set.start.map(|_| score.start_identity), set.end.map(|_| score.end_identity)]
        .into_iter()
        .flatten()
        .collect();
    if sides.is_empty() { 0.0 } else { sides.iter().sum::<f64>() / sides.len() as f64 }
}

/// Sets whose best identity reaches `threshold`.
///
/// Sets sharing a start adapter (the Kit 14 LA, NA and RA top strands are the
/// same sequence) collapse to the one scoring best over both ends; ties go to
/// the earlier registry entry.
pub fn choose_adapter_sets(scores: &[AdapterSetScore], threshold: f64) -> Vec<&'static AdapterSet> {
    let mut chosen: Vec<(&'static AdapterSet, f64)> = Vec::new();
    for sc in scores.iter().filter(|s| s.best() >= threshold) {
        let Some(set) = kits::get_adapter_set(sc.name) else { continue };
        let score = set_score(sc, set);
        let key = set.start.map(|r| r.sequence);
        let slot = chosen.iter_mut().find(|(c, _)| key.is_some() && c.start.map(|r| r.sequence) == key);
        match slot {
            Some(slot) if score > slot.1 => *slot = (set, score),
            Some(_) => {}
            None => chosen.push((set, score)),
        }
    }
    chosen.into_iter().map(|(set, _)| set).collect()
}

/// Pick the adapter sets to trim: explicit names, or those detected in the first reads.
pub fn select_adapter_sets(input: &Path, opts: &TrimOpts) -> Result<Vec<&'static AdapterSet>> {
    if !opts.adapter_sets.is_empty() {
        return Ok(kits::resolve_adapter_sets(&opts.adapter_sets)?);
    }
    let sample = seqio::head(input, opts.check_reads)
        .with_context(|| format!("sampling {} for adapter detection", input.display()))?;
    let scores = score_adapter_sets(&sample, opts);
    for s in &scores {
        log::debug!("adapter set {}: start {:.1}% end {:.1}%", s.name, s.start_identity, s.end_identity);
    }
    let chosen = choose_adapter_sets(&scores, opts.adapter_threshold);
    if chosen.is_empty() {
        log::warn!("no adapter set reached {:.1}% identity in {} reads; reads will not be trimmed", opts.adapter_threshold, sample.len());
    }
    Ok(chosen)
}

/// Per-read trimming outcome.
#[derive(Clone, Debug, Default)]
pub struct ReadTrim {
    pub start_trimmed: usize,
    pub end_trimmed: usize,
    pub middle_hits: usize,
    /// The read was cut around middle adapters; `pieces` are its surviving parts.
    pub split: bool,
    pub discarded: bool,
    pub pieces: Vec<LongRead>,
}

/// Adapter trimmer for a fixed choice of adapter sets.
#[derive(Clone, Debug)]
pub struct Trimmer {
    start_motifs: Vec<Motif>,
    end_motifs: Vec<Motif>,
    middle_motifs: Vec<Motif>,
    opts: TrimOpts,
}

impl Trimmer {
    pub fn new(sets: &[&AdapterSet], opts: &TrimOpts) -> Self {
        let mut start_motifs: Vec<Motif> = Vec::new();
        let mut end_motifs: Vec<Motif> = Vec::new();
        let mut middle_motifs: Vec<Motif> = Vec::new();
        let push = |v: &mut Vec<Motif>, m: Motif| {
            if !v.iter().any(|o| o.searcher.pattern() == m.searcher.pattern()) { v.push(m); }
        };
        let a = opts.aligner;
        for set in sets {
            if let Some(s) = set.start {
                let fwd = s.sequence.as_bytes();
                let rc = rc_str(s.sequence);
                push(&mut start_motifs, Motif::new(s.name.to_string(), Side::Start, fwd, a));
                push(&mut end_motifs, Motif::new(format!("{}_rc", s.name), Side::End, &rc, a));
                push(&mut middle_motifs, Motif::new(s.name.to_string(), Side::Start, fwd, a));
                push(&mut middle_motifs, Motif::new(format!("{}_rc", s.name), Side::End, &rc, a));
            }
            if let Some(e) = set.end {
                let fwd = e.sequence.as_bytes();
                let rc = rc_str(e.sequence);
                push(&mut end_motifs, Motif::new(e.name.to_string(), Side::End, fwd, a));
                push(&mut start_motifs, Motif::new(format!("{}_rc", e.name), Side::Start, &rc, a));
                push(&mut middle_motifs, Motif::new(e.name.to_string(), Side::End, fwd, a));
                push(&mut middle_motifs, Motif::new(format!("{}_rc", e.name), Side::Start, &rc, a));
            }
        }
        Trimmer { start_motifs, end_motifs, middle_motifs, opts: opts.clone() }
    }

    /// `true` when no adapters are configured and reads pass through untouched.
    pub fn is_noop(&self) -> bool { self.start_motifs.is_empty() && self.end_motifs.is_empty() }

    pub fn trim(&self, read: &LongRead) -> ReadTrim {
        let o = &self.opts;
        let seq = upper(&read.seq);
        let n = seq.len();
        let (head, tail, tail_off) = end_windows(&seq, o.end_size);

        let mut start_cut = 0usize;
        for m in &self.start_motifs {
            let hit = m.best(head, o.end_threshold).or_else(|| m.searcher.find_at_start(head, o.end_threshold, o.min_trim_size));
            if let Some(h) = hit {
                if h.span() >= o.min_trim_size {
                    log::trace!("{}: {} at start {}..{}", read.id, m.name, h.start, h.end);
                    start_cut = start_cut.max(h.end + o.extra_end_trim);
                }
            }
        }
        let mut end_cut = n;
        for m in &self.end_motifs {
            let hit = m.best(tail, o.end_threshold).or_else(|| m.searcher.find_at_end(tail, o.end_threshold, o.min_trim_size));
            if let Some(h) = hit {
                if h.span() >= o.min_trim_size {
                    let h = h.offset(tail_off);
                    log::trace!("{}: {} at end {}..{}", read.id, m.name, h.start, h.end);
                    end_cut = end_cut.min(h.start.saturating_sub(o.extra_end_trim));
                }
            }
        }
        let start_cut = start_cut.min(n);
        let mut out = ReadTrim { start_trimmed: start_cut, end_trimmed: n - end_cut.max(start_cut), ..Default::default() };
        if start_cut >= end_cut {
            out.discarded = true;
            return out;
        }

        let core = &seq[start_cut..end_cut];
        let mut cuts: Vec<(usize, usize)> = Vec::new();
        for m in &self.middle_motifs {
            for h in m.all(core, o.middle_threshold) {
                let h = h.offset(start_cut);
                let (before, after) = match m.side {
                    Side::Start => (o.extra_middle_trim_bad_side, o.extra_middle_trim_good_side),
                    Side::End => (o.extra_middle_trim_good_side, o.extra_middle_trim_bad_side),
                };
                cuts.push((h.start.saturating_sub(before).max(start_cut), (h.end + after).min(end_cut)));
            }
        }
        out.middle_hits = cuts.len();

        if cuts.is_empty() || o.no_split {
            let piece = if start_cut == 0 && end_cut == n { read.clone() } else { read.slice(read.id.clone(), start_cut, end_cut) };
            out.pieces.push(piece);
            return out;
        }
        if o.discard_middle {
            out.discarded = true;
            return out;
        }

        out.split = true;
        cuts.sort_unstable();
        let mut keep: Vec<(usize, usize)> = Vec::new();
        let mut pos = start_cut;
        for (s, e) in cuts {
            if s > pos { keep.push((pos, s)); }
            pos = pos.max(e);
        }
        if pos < end_cut { keep.push((pos, end_cut)); }
        let base = read.id.split_whitespace().next().unwrap_or(&read.id).to_string();
        out.pieces = keep
            .into_iter()
            .filter(|(s, e)| e - s >= o.min_split_read_size)
            .enumerate()
            .map(|(i, (s, e))| read.slice(format!("{}_{}", base, i + 1), s, e))
            .collect();
        out.discarded = out.pieces.is_empty();
        out
    }
}

/// Counts from a trimming run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimReport {
    pub adapter_sets: Vec<String>,
    pub reads_in: u64,
    pub bases_in: u64,
    pub reads_out: u64,
    pub bases_out: u64,
    pub start_trimmed: u64,
    pub end_trimmed: u64,
    pub middle_adapter_reads: u64,
    /// Pieces written from reads that were cut around middle adapters.
    pub split_pieces: u64,
    pub discarded: u64,
}

impl TrimReport {
    fn add(&mut self, read: &LongRead, t: &ReadTrim) {
        self.reads_in += 1;
        self.bases_in += read.len() as u64;
        if t.start_trimmed > 0 { self.start_trimmed += 1; }
        if t.end_trimmed > 0 { self.end_trimmed += 1; }
        if t.middle_hits > 0 { self.middle_adapter_reads += 1; }
        if t.split { self.split_pieces += t.pieces.len() as u64; }
        if t.discarded { self.discarded += 1; }
        self.reads_out += t.pieces.len() as u64;
        self.bases_out += t.pieces.iter().map(|p| p.len() as u64).sum::<u64>();
    }
}

/// Trim `input` into `output` (FASTQ, gz by extension), preserving read order.
pub fn run(input: &Path, output: &Path, opts: &TrimOpts, threads: Option<usize>) -> Result<TrimReport> {
    opts.validate()?;
    let pool = crate::thread_pool(threads)?;
    let sets = pool.install(|| select_adapter_sets(input, opts))?;
    let trimmer = Trimmer::new(&sets, opts);
    let mut report = TrimReport { adapter_sets: sets.iter().map(|s| s.name.to_string()).collect(), ..Default::default() };
    log::info!(
        "trim: input={} | adapter sets=[{}] | output={}",
        input.display(),
        report.adapter_sets.join(","),
        output.display()
    );

    let mut writer = FastqWriter::create(output)?;
    seqio::for_each_chunk(input, seqio::CHUNK, |chunk| {
        let trimmed: Vec<ReadTrim> = if trimmer.is_noop() {
            chunk.iter().map(|r| ReadTrim { pieces: vec![r.clone()], ..Default::default() }).collect()
        } else {
            pool.install(|| chunk.par_iter().map(|r| trimmer.trim(r)).collect())
        };
        for (read, t) in chunk.iter().zip(&trimmed) {
            report.add(read, t);
            for p in &t.pieces {
                writer.write(p)?;
            }
        }
        Ok(())
    })?;
    writer.finish()?;
    log::info!(
        "trim: {} reads in, {} out ({} start-trimmed, {} end-trimmed, {} with middle adapters, {} discarded)",
        report.reads_in, report.reads_out, report.start_trimmed, report.end_trimmed, report.middle_adapter_reads, report.discarded
    );
    Ok(report)
}
