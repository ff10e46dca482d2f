//! Read IO for **FASTQ / FASTA (optionally gzipped) / SAM / BAM**.
//!
//! ### Design
//! - **FASTQ/FASTA(.gz)** parsed with `needletail`
//! - **SAM/BAM** parsed with `rust-htslib` (unaligned dorado output is the usual case)
//! - Reads are handed out in **chunks** so callers can fan work out on a rayon pool
//!   and still write results back in input order.
//!
//! ### Errors
//! Parsing/IO errors are bubbled via `anyhow::Result` to the caller.
//!
//! ### Example
//! ```no_run
//! use longqc::seqio;
//! let n = seqio::for_each_chunk("reads.fastq.gz", 2000, |chunk| {
//!     for r in &chunk { let _ = (&r.id, r.len()); }
//!     Ok(())
//! }).unwrap();
//! println!("processed {n} records");
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use needletail::errors::ParseErrorKind;
use needletail::parse_fastx_file;
use rust_htslib::bam;
use rust_htslib::bam::Read as _;

use crate::error::QcError;
use crate::quality::PHRED_OFFSET;

/// Reads per chunk handed to callbacks.
pub const CHUNK: usize = 2000;

/// Input format detected from path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat { Fastq, Fasta, Bam, Sam }

impl InputFormat {
    /// Detect the format from the file name, looking through a trailing `.gz`.
    pub fn detect(path: &Path) -> Result<Self, QcError> {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
        let stem = name.strip_suffix(".gz").unwrap_or(&name);
        let ext = stem.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match ext {
            "fq" | "fastq" => Ok(InputFormat::Fastq),
            "fa" | "fasta" | "fna" => Ok(InputFormat::Fasta),
            "bam" if stem.len() == name.len() => Ok(InputFormat::Bam),
            "sam" if stem.len() == name.len() => Ok(InputFormat::Sam),
            _ => Err(QcError::UnsupportedInput(path.to_path_buf())),
        }
    }

    /// `true` when records of this format carry per-base qualities.
    pub fn has_qualities(self) -> bool { !matches!(self, InputFormat::Fasta) }
}

/// A normalized long read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRead {
    pub id: String,
    pub seq: Vec<u8>,
    /// Phred+33 ASCII; `None` for FASTA input or BAM records without qualities.
    pub qual: Option<Vec<u8>>,
}

impl LongRead {
    pub fn len(&self) -> usize { self.seq.len() }

    pub fn is_empty(&self) -> bool { self.seq.is_empty() }

    /// Copy out `start..end` under a new name, keeping qualities aligned.
    pub fn slice(&self, id: String, start: usize, end: usize) -> LongRead {
        LongRead {
            id,
            seq: self.seq[start..end].to_vec(),
            qual: self.qual.as_ref().map(|q| q[start..end].to_vec()),
        }
    }
}

fn bam_record_to_read(rec: &bam::Record) -> LongRead {
    let id = String::from_utf8_lossy(rec.qname()).to_string();
    let seq = rec.seq().as_bytes();
    let q = rec.qual();
    let qual = if q.is_empty() || q.iter().all(|&b| b == 0xFF) {
        None
    } else {
        Some(q.iter().map(|&b| b.saturating_add(PHRED_OFFSET)).collect())
    };
    LongRead { id, seq, qual }
}

/// Core driver: stream records from `path` in chunks of at most `chunk_size`.
///
/// Returns the total number of records seen.
pub fn for_each_chunk<P, F>(path: P, chunk_size: usize, on_chunk: F) -> Result<usize>
where
    P: AsRef<Path>,
    F: FnMut(Vec<LongRead>) -> Result<()>,
{
    stream(path.as_ref(), chunk_size, usize::MAX, on_chunk)
}

/// The first `n` records of `path` (fewer if the file is shorter).
pub fn head<P: AsRef<Path>>(path: P, n: usize) -> Result<Vec<LongRead>> {
    let mut out = Vec::new();
    stream(path.as_ref(), CHUNK, n, |chunk| {
        out.extend(chunk);
        Ok(())
    })?;
    Ok(out)
}

fn stream<F>(p: &Path, chunk_size: usize, limit: usize, mut on_chunk: F) -> Result<usize>
where
    F: FnMut(Vec<LongRead>) -> Result<()>,
{
    let fmt = InputFormat::detect(p)?;
    let chunk_size = chunk_size.max(1);
    let mut total = 0usize;
    let mut buf: Vec<LongRead> = Vec::with_capacity(chunk_size);

    match fmt {
        InputFormat::Fastq | InputFormat::Fasta => {
            let mut reader = match parse_fastx_file(p) {
                Ok(r) => r,
                // empty input is zero reads
                Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => return Ok(0),
                Err(e) => return Err(e).with_context(|| format!("opening {}", p.display())),
            };
            while let Some(record) = reader.next() {
                if total + buf.len() >= limit { break; }
                let rec = record.with_context(|| format!("parsing {}", p.display()))?;
                let id = String::from_utf8_lossy(rec.id()).to_string();
                let seq = rec.seq().to_vec();
                let qual = rec.qual().map(|q| q.to_vec());
                buf.push(LongRead { id, seq, qual });
                if buf.len() >= chunk_size {
                    total += buf.len();
                    on_chunk(std::mem::replace(&mut buf, Vec::with_capacity(chunk_size)))?;
                }
            }
        }
        InputFormat::Bam | InputFormat::Sam => {
            let mut reader = bam::Reader::from_path(p).with_context(|| format!("opening {}", p.display()))?;
            for result in reader.records() {
                if total + buf.len() >= limit { break; }
                let rec = result.with_context(|| format!("parsing {}", p.display()))?;
                // secondary/supplementary alignments repeat a primary read
                if rec.is_secondary() || rec.is_supplementary() { continue; }
                buf.push(bam_record_to_read(&rec));
                if buf.len() >= chunk_size {
                    total += buf.len();
                    on_chunk(std::mem::replace(&mut buf, Vec::with_capacity(chunk_size)))?;
                }
            }
        }
    }
    if !buf.is_empty() {
        total += buf.len();
        on_chunk(buf)?;
    }
    Ok(total)
}

/// `true` when output at `path` will be gzip-compressed.
pub fn output_path_is_gz(path: &Path) -> bool {
    path.extension().map(|e| e.eq_ignore_ascii_case("gz")).unwrap_or(false)
}

enum Sink {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gz(w) => w.flush(),
        }
    }
}

/// FASTQ writer; gzip when the path ends in `.gz`.
///
/// Reads without qualities are written as FASTA records.
pub struct FastqWriter {
    sink: Sink,
    written: usize,
}

impl FastqWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let fh = File::create(p).with_context(|| format!("creating {}", p.display()))?;
        let w = BufWriter::new(fh);
        let sink = if output_path_is_gz(p) {
            Sink::Gz(GzEncoder::new(w, flate2::Compression::default()))
        } else {
            Sink::Plain(w)
        };
        Ok(FastqWriter { sink, written: 0 })
    }

    pub fn write(&mut self, read: &LongRead) -> std::io::Result<()> {
        let w = &mut self.sink;
        match &read.qual {
            Some(qual) => {
                w.write_all(b"@")?;
                w.write_all(read.id.as_bytes())?;
                w.write_all(b"\n")?;
                w.write_all(&read.seq)?;
                w.write_all(b"\n+\n")?;
                w.write_all(qual)?;
                w.write_all(b"\n")?;
            }
            None => {
                w.write_all(b">")?;
                w.write_all(read.id.as_bytes())?;
                w.write_all(b"\n")?;
                w.write_all(&read.seq)?;
                w.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize { self.written }

    /// Flush buffers and write the gzip trailer.
    pub fn finish(self) -> Result<usize> {
        let n = self.written;
        match self.sink {
            Sink::Plain(mut w) => w.flush()?,
            Sink::Gz(gz) => {
                let mut w = gz.finish()?;
                w.flush()?;
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_formats_through_gz() {
        let d = |s: &str| InputFormat::detect(&PathBuf::from(s));
        assert_eq!(d("a.fastq").unwrap(), InputFormat::Fastq);
        assert_eq!(d("a.FQ.GZ").unwrap(), InputFormat::Fastq);
        assert_eq!(d("dir/x.fasta.gz").unwrap(), InputFormat::Fasta);
        assert_eq!(d("a.fna").unwrap(), InputFormat::Fasta);
        assert_eq!(d("a.bam").unwrap(), InputFormat::Bam);
        assert_eq!(d("a.sam").unwrap(), InputFormat::Sam);
        assert!(d("a.bam.gz").is_err());
        assert!(d("reads.txt").is_err());
        assert!(d("reads").is_err());
    }

    #[test]
    fn writer_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["out.fastq", "out.fastq.gz"] {
            let path = dir.path().join(name);
            let mut w = FastqWriter::create(&path).unwrap();
            for i in 0..5 {
                w.write(&LongRead { id: format!("r{i}"), seq: b"ACGTACGT".to_vec(), qual: Some(b"IIIIIIII".to_vec()) }).unwrap();
            }
            assert_eq!(w.finish().unwrap(), 5);

            let mut seen = Vec::new();
            let n = for_each_chunk(&path, 2, |chunk| {
                assert!(chunk.len() <= 2);
                seen.extend(chunk);
                Ok(())
            })
            .unwrap();
            assert_eq!(n, 5);
            assert_eq!(seen[3].id, "r3");
            assert_eq!(seen[3].qual.as_deref(), Some(&b"IIIIIIII"[..]));
        }
    }

    #[test]
    fn head_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.fq");
        let mut w = FastqWriter::create(&path).unwrap();
        for i in 0..10 {
            w.write(&LongRead { id: format!("r{i}"), seq: b"AC".to_vec(), qual: Some(b"II".to_vec()) }).unwrap();
        }
        w.finish().unwrap();
        let first = head(&path, 3).unwrap();
        assert_eq!(first.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["r0", "r1", "r2"]);
        assert_eq!(head(&path, 100).unwrap().len(), 10);
    }

    #[test]
    fn reads_without_quality_are_written_as_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.fa");
        let mut w = FastqWriter::create(&path).unwrap();
        w.write(&LongRead { id: "x".into(), seq: b"ACGT".to_vec(), qual: None }).unwrap();
        w.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">x\nACGT\n");
    }

    #[test]
    fn empty_files_have_no_reads() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["empty.fastq", "empty.fastq.gz"] {
            let path = dir.path().join(name);
            FastqWriter::create(&path).unwrap().finish().unwrap();
            assert_eq!(for_each_chunk(&path, 10, |_| Ok(())).unwrap(), 0, "{name}");
        }
    }

    const SAM: &str = "@HD\tVN:1.6\tSO:unsorted
@SQ\tSN:chr1\tLN:100
r1\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII
r1\t256\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII
r2\t2048\tchr1\t10\t60\t4M\t*\t0\t0\tGGCC\tIIII
r3\t4\t*\t0\t0\t*\t*\t0\t0\tTTGA\t*
";

    fn sam_ids_and_quals(path: &Path) -> Vec<(String, Option<Vec<u8>>)> {
        let mut out = Vec::new();
        for_each_chunk(path, 10, |chunk| {
            out.extend(chunk.into_iter().map(|r| (r.id, r.qual)));
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn sam_records_skip_secondary_and_keep_missing_qualities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.sam");
        std::fs::write(&path, SAM).unwrap();
        let reads = sam_ids_and_quals(&path);
        assert_eq!(reads, [("r1".to_string(), Some(b"IIII".to_vec())), ("r3".to_string(), None)]);
        assert_eq!(head(&path, 1).unwrap()[0].seq, b"ACGT");
    }

    #[test]
    fn bam_reads_match_their_sam_source() {
        use rust_htslib::bam::Read as _;
        let dir = tempfile::tempdir().unwrap();
        let sam = dir.path().join("reads.sam");
        let bam_path = dir.path().join("reads.bam");
        std::fs::write(&sam, SAM).unwrap();
        {
            let mut reader = bam::Reader::from_path(&sam).unwrap();
            let header = bam::Header::from_template(reader.header());
            let mut writer = bam::Writer::from_path(&bam_path, &header, bam::Format::Bam).unwrap();
            for rec in reader.records() {
                writer.write(&rec.unwrap()).unwrap();
            }
        }
        assert_eq!(InputFormat::detect(&bam_path).unwrap(), InputFormat::Bam);
        assert_eq!(sam_ids_and_quals(&bam_path), sam_ids_and_quals(&sam));
    }

    #[test]
    fn slice_keeps_quality_aligned() {
        let r = LongRead { id: "r".into(), seq: b"AACCGGTT".to_vec(), qual: Some(b"!!##%%''".to_vec()) };
        let s = r.slice("r_1".into(), 2, 6);
        assert_eq!(s.seq, b"CCGG");
        assert_eq!(s.qual.unwrap(), b"##%%");
    }
}
