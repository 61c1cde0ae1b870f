//! Input sources and format adapters
//!
//! A [`PatternSource`] is one physical input stream: an ordered list of
//! files walked by a [`FileCursor`] behind its own mutex. Filling a batch
//! happens under that mutex; parsing the filled batch happens afterwards in
//! the calling thread with no lock held.
//!
//! Formats come in two flavors:
//!
//! * eager (`fasta`, `tab5`, `tab6`, `raw`, `cmdline`): each record's text is
//!   copied into its own slot of the batch buffer
//! * lazy (`fastq`): a run of whole records is copied into one byte buffer
//!   and split into records only at parse time

mod fasta;
mod fastq;
mod raw;
mod tabbed;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::batch::{Fill, Limit, PerThreadReadBuf, Side};
use crate::composer::ReadCounter;
use crate::cursor::{FileCursor, Input};
use crate::error::{ConfigError, ParseError, Result};
use crate::params::PatternParams;
use crate::qual::{self, lossy, DEFAULT_QUALITY};
use crate::record::Record;

/// The input formats understood by a [`PatternSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `>`-headed records, sequence possibly wrapped over several lines
    Fasta,
    /// Four-line `@`-headed records with qualities
    #[default]
    Fastq,
    /// `name\tseq\tqual`, or `name\tseq1\tqual1\tseq2\tqual2` for a pair
    Tab5,
    /// `name\tseq\tqual`, or `name1\tseq1\tqual1\tname2\tseq2\tqual2` for a pair
    Tab6,
    /// One bare sequence per line
    Raw,
    /// Reads given literally as `SEQ[:QUALS]` instead of file names
    CmdLine,
}
impl Format {
    /// Whether records are split out of a raw byte buffer at parse time
    #[must_use]
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Fastq)
    }

    /// Whether one record can carry both mates of a pair
    #[must_use]
    pub fn holds_both_mates(self) -> bool {
        matches!(self, Self::Tab5 | Self::Tab6)
    }

    /// The byte every file of this format must start with, if any
    #[must_use]
    pub fn magic(self) -> Option<u8> {
        match self {
            Self::Fasta => Some(b'>'),
            Self::Fastq => Some(b'@'),
            _ => None,
        }
    }

    /// How much a single fill reads by default
    #[must_use]
    pub fn default_limit(self, params: &PatternParams) -> Limit {
        if self.is_lazy() {
            Limit::Bytes(params.raw_buffer_size)
        } else {
            Limit::Records(params.batch_size)
        }
    }
}
impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" | "f" => Ok(Self::Fasta),
            "fastq" | "fq" | "q" => Ok(Self::Fastq),
            "tab5" => Ok(Self::Tab5),
            "tab6" => Ok(Self::Tab6),
            "raw" | "r" => Ok(Self::Raw),
            "cmdline" | "c" => Ok(Self::CmdLine),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}
impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fasta => "FASTA",
            Self::Fastq => "FASTQ",
            Self::Tab5 => "TAB5",
            Self::Tab6 => "TAB6",
            Self::Raw => "RAW",
            Self::CmdLine => "CMDLINE",
        };
        write!(f, "{name}")
    }
}

/// One physical input stream
#[derive(Debug)]
pub struct PatternSource {
    format: Format,
    params: Arc<PatternParams>,
    cursor: Mutex<FileCursor>,
}
impl PatternSource {
    /// Open the first usable input of `inputs`
    ///
    /// For [`Format::CmdLine`] every input is the literal read text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoValidInputs`] if no input of the list can be opened.
    pub fn new(inputs: Vec<Input>, params: Arc<PatternParams>) -> Result<Self> {
        let format = params.format;
        let inputs = if format == Format::CmdLine {
            inputs.into_iter().map(literal_input).collect()
        } else {
            inputs
        };
        let mut cursor = FileCursor::new(inputs);
        cursor.open()?;
        debug!("Created {format} source over {} input(s)", cursor.inputs().len());
        Ok(Self {
            format,
            params,
            cursor: Mutex::new(cursor),
        })
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    #[must_use]
    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    /// Records delivered by this source so far
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.cursor.lock().records_read()
    }

    /// Bytes consumed by this source so far
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.cursor.lock().bytes_read()
    }

    /// Fill one side of `pt` with the next batch of this source
    ///
    /// Rotates through the file list as files run out. `done` is reported
    /// only once the last file of the list is exhausted. When `ids` is given
    /// the batch's base RecordId is reserved while the source lock is held,
    /// so ids follow the order batches leave the source.
    ///
    /// Eager formats given a byte limit fill at most one batch of slots.
    pub fn next_batch(
        &self,
        pt: &mut PerThreadReadBuf,
        side: Side,
        limit: Limit,
        ids: Option<&ReadCounter>,
    ) -> Result<Fill> {
        let mut cursor = self.cursor.lock();
        let mut total = Fill::default();
        loop {
            if !cursor.is_open() {
                total.done = true;
                break;
            }
            self.check_magic(&mut cursor)?;

            let (fill, aligned) = self.fill_file(&mut cursor, pt, side, limit, total.records)?;
            total.absorb(fill);
            if fill.done {
                if cursor.open()? {
                    debug!("Moved on to read input {}", cursor.label());
                    total.done = false;
                    if aligned && wants_more(limit, &total) {
                        continue;
                    }
                } else {
                    total.done = true;
                }
                break;
            }
            if total.records > 0 {
                break;
            }
        }
        if let Some(ids) = ids {
            pt.set_read_id(ids.reserve(total.records));
        }
        cursor.add_records(total.records);
        Ok(total)
    }

    /// Reject a freshly opened file whose first byte is wrong for the format
    fn check_magic(&self, cursor: &mut FileCursor) -> Result<()> {
        if !cursor.first {
            return Ok(());
        }
        cursor.first = false;
        let Some(magic) = self.format.magic() else {
            return Ok(());
        };
        match cursor.skip_newlines()? {
            Some(b) if b != magic => Err(ConfigError::UnexpectedFormat {
                path: cursor.label(),
                format: self.format,
                found: char::from(b),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Read from the current file only; the flag is false when a partial record was delivered
    fn fill_file(
        &self,
        cursor: &mut FileCursor,
        pt: &mut PerThreadReadBuf,
        side: Side,
        limit: Limit,
        offset: usize,
    ) -> Result<(Fill, bool)> {
        let max = match limit {
            Limit::Records(n) => n.saturating_sub(offset),
            Limit::Bytes(_) => pt.max_buf().saturating_sub(offset),
        };
        match self.format {
            Format::Fastq => fastq::fill(cursor, pt.raw_mut(side), limit),
            Format::Fasta => Ok((fasta::fill(cursor, pt, side, offset, max)?, true)),
            Format::Tab5 | Format::Tab6 | Format::Raw | Format::CmdLine => {
                Ok((fill_lines(cursor, pt, side, offset, max)?, true))
            }
        }
    }
}

fn wants_more(limit: Limit, total: &Fill) -> bool {
    match limit {
        Limit::Records(n) => total.records < n,
        Limit::Bytes(_) => total.records == 0,
    }
}

/// Turn a command-line read into an in-memory input holding one line
fn literal_input(input: Input) -> Input {
    match input {
        Input::Memory(_) => input,
        other => {
            let mut text = other.to_string().into_bytes();
            text.push(b'\n');
            Input::Memory(Arc::from(text))
        }
    }
}

/// Eager fill for line-per-record formats; blank lines are skipped
fn fill_lines(
    cursor: &mut FileCursor,
    pt: &mut PerThreadReadBuf,
    side: Side,
    offset: usize,
    max: usize,
) -> Result<Fill> {
    let mut n = 0;
    let mut done = false;
    while n < max {
        let slot = pt.slot_mut(side, offset + n);
        slot.raw.clear();
        if cursor.read_line(&mut slot.raw)? == 0 {
            done = true;
            break;
        }
        if is_blank(&slot.raw) {
            slot.raw.clear();
            continue;
        }
        n += 1;
    }
    if !done {
        done = cursor.at_eof()?;
    }
    Ok(Fill {
        done,
        units: n,
        records: n,
    })
}

/// Parse the current record(s) of `pt` according to `params.format`
///
/// Both mates are always parsed, even if the first fails, so a lazy batch
/// stays aligned for the records that follow.
pub(crate) fn parse(pt: &mut PerThreadReadBuf, params: &PatternParams) -> std::result::Result<(), ParseError> {
    let rdid = pt.rdid();
    let (ra, raw_a, rb, raw_b) = pt.raw_parts_mut();
    ra.reset();
    rb.reset();
    match params.format {
        Format::Fastq => {
            let a = fastq::parse(ra, raw_a, rdid, params);
            let b = if raw_b.is_empty() {
                Ok(())
            } else {
                fastq::parse(rb, raw_b, rdid, params)
            };
            a.and(b)
        }
        Format::Fasta => {
            let a = fasta::parse(ra, params);
            let b = if rb.raw.is_empty() {
                Ok(())
            } else {
                fasta::parse(rb, params)
            };
            a.and(b)
        }
        Format::Tab5 => tabbed::parse(ra, rb, rdid, params, false),
        Format::Tab6 => tabbed::parse(ra, rb, rdid, params, true),
        Format::Raw | Format::CmdLine => {
            let cmdline = params.format == Format::CmdLine;
            let a = raw::parse(ra, params, cmdline);
            let b = if rb.raw.is_empty() {
                Ok(())
            } else {
                raw::parse(rb, params, cmdline)
            };
            a.and(b)
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|&b| b == b'\n' || b == b'\r')
}

/// Strip a trailing `\n` and `\r`
fn chomp(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Append the bases of `text` to `seq`
///
/// Letters are upper-cased and anything other than `ACGT` becomes `N`;
/// `.` is also `N`; every other byte is dropped.
fn push_bases(seq: &mut Vec<u8>, text: &[u8]) {
    for &c in text {
        if c == b'.' {
            seq.push(b'N');
        } else if c.is_ascii_alphabetic() {
            seq.push(match c.to_ascii_uppercase() {
                b @ (b'A' | b'C' | b'G' | b'T') => b,
                _ => b'N',
            });
        }
    }
}

/// Decode a quality line onto the record according to the configured encoding
fn push_quals(rec: &mut Record, text: &[u8], params: &PatternParams) -> std::result::Result<(), ParseError> {
    let text = chomp(text);
    if params.int_quals {
        let solexa = params.quality == qual::QualityEncoding::Solexa64;
        return qual::decode_int_quals(text, solexa, &rec.name, &mut rec.qual);
    }
    for &c in text {
        let q = qual::char_to_phred33(c, params.quality, &rec.name)?;
        rec.qual.push(q);
    }
    Ok(())
}

fn check_qual_len(rec: &Record) -> std::result::Result<(), ParseError> {
    if rec.qual.len() < rec.seq.len() {
        Err(ParseError::TooFewQualities(lossy(&rec.name)))
    } else if rec.qual.len() > rec.seq.len() {
        Err(ParseError::TooManyQualities(lossy(&rec.name)))
    } else {
        Ok(())
    }
}

/// Give a quality-less record the default quality at every position
fn default_quals(rec: &mut Record) {
    rec.qual.clear();
    rec.qual.resize(rec.seq.len(), DEFAULT_QUALITY);
}

/// Apply the configured 5'/3' trimming to sequence and qualities, then mark the record parsed
fn finish_record(rec: &mut Record, params: &PatternParams) {
    let trim5 = params.trim5.min(rec.seq.len());
    rec.seq.drain(..trim5);
    rec.qual.drain(..trim5.min(rec.qual.len()));
    let trim3 = params.trim3.min(rec.seq.len());
    rec.seq.truncate(rec.seq.len() - trim3);
    rec.qual.truncate(rec.seq.len());
    rec.trimmed5 = trim5;
    rec.trimmed3 = trim3;
    rec.parsed = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn memory(text: &str) -> Input {
        Input::Memory(Arc::from(text.as_bytes()))
    }

    fn source(format: Format, inputs: Vec<Input>) -> PatternSource {
        PatternSource::new(inputs, Arc::new(PatternParams::new(format))).unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("FASTQ".parse::<Format>().unwrap(), Format::Fastq);
        assert_eq!("fa".parse::<Format>().unwrap(), Format::Fasta);
        assert_eq!("tab6".parse::<Format>().unwrap(), Format::Tab6);
        assert!(matches!(
            "bam".parse::<Format>(),
            Err(ConfigError::UnsupportedFormat(ref s)) if s == "bam"
        ));
    }

    #[test]
    fn test_format_flavors() {
        assert!(Format::Fastq.is_lazy());
        assert!(!Format::Fasta.is_lazy());
        let params = PatternParams::default();
        assert_eq!(
            Format::Fastq.default_limit(&params),
            Limit::Bytes(params.raw_buffer_size)
        );
        assert_eq!(
            Format::Raw.default_limit(&params),
            Limit::Records(params.batch_size)
        );
    }

    #[test]
    fn test_push_bases() {
        let mut seq = Vec::new();
        push_bases(&mut seq, b"acgt.RYn 12\r\n");
        assert_eq!(seq, b"ACGTNNNN");
    }

    #[test]
    fn test_finish_record_trims() {
        let params = PatternParams::default().trim5(2).trim3(1);
        let mut rec = Record {
            seq: b"ACGTAC".to_vec(),
            qual: b"ABCDEF".to_vec(),
            ..Default::default()
        };
        finish_record(&mut rec, &params);
        assert_eq!(rec.seq(), b"GTA");
        assert_eq!(rec.qual(), b"CDE");
        assert_eq!((rec.trimmed5(), rec.trimmed3()), (2, 1));
        assert!(rec.is_parsed());
    }

    #[test]
    fn test_finish_record_short_read() {
        let params = PatternParams::default().trim5(3).trim3(3);
        let mut rec = Record {
            seq: b"ACGT".to_vec(),
            qual: b"IIII".to_vec(),
            ..Default::default()
        };
        finish_record(&mut rec, &params);
        assert!(rec.is_empty());
        assert!(rec.qual().is_empty());
        assert_eq!((rec.trimmed5(), rec.trimmed3()), (3, 1));
    }

    #[test]
    fn test_wrong_magic_is_fatal() {
        let src = source(Format::Fastq, vec![memory(">r\nACGT\n")]);
        let mut pt = PerThreadReadBuf::new(4);
        let err = src
            .next_batch(&mut pt, Side::A, Limit::Bytes(1024), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigError(ConfigError::UnexpectedFormat { found: '>', .. })
        ));
    }

    #[test]
    fn test_eager_byte_limit_fills_one_batch() {
        let src = source(Format::Raw, vec![memory("AAAA\nCCCC\nGGGG\n")]);
        let mut pt = PerThreadReadBuf::new(2);
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Bytes(1), None)
            .unwrap();
        assert_eq!(fill.records, 2);
        assert!(!fill.done);
    }

    #[test]
    fn test_rotation_reports_done_only_at_list_end() {
        let src = source(
            Format::Raw,
            vec![memory("AAAA\nCCCC\n"), memory("GGGG\n")],
        );
        let ids = ReadCounter::default();
        let mut pt = PerThreadReadBuf::new(2);

        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(2), Some(&ids))
            .unwrap();
        assert_eq!(fill.records, 2);
        assert!(!fill.done);
        assert_eq!(pt.base_rdid(), 0);

        pt.reset();
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(2), Some(&ids))
            .unwrap();
        assert_eq!(fill.records, 1);
        assert!(fill.done);
        assert_eq!(pt.base_rdid(), 2);
        assert_eq!(src.records_read(), 3);
    }

    #[test]
    fn test_rotation_keeps_filling_eager_batch() {
        let src = source(Format::Raw, vec![memory("AAAA\n"), memory("CCCC\nGGGG\n")]);
        let mut pt = PerThreadReadBuf::new(4);
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(4), None)
            .unwrap();
        assert_eq!(fill.records, 3);
        assert!(fill.done);
    }

    #[test]
    fn test_empty_files_are_skipped() {
        let src = source(Format::Fasta, vec![memory(""), memory(">r\nAC\n")]);
        let mut pt = PerThreadReadBuf::new(4);
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(4), None)
            .unwrap();
        assert_eq!(fill.records, 1);
        assert!(fill.done);
    }

    #[test]
    fn test_cmdline_inputs_are_literal() {
        let src = source(
            Format::CmdLine,
            vec![Input::from("ACGT:II"), Input::from("GGCC")],
        );
        let mut pt = PerThreadReadBuf::new(4);
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(4), None)
            .unwrap();
        assert_eq!(fill.records, 2);
        assert!(fill.done);
    }

    #[test]
    fn test_exhausted_source_keeps_reporting_done() {
        let src = source(Format::Raw, vec![memory("ACGT\n")]);
        let mut pt = PerThreadReadBuf::new(4);
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(4), None)
            .unwrap();
        assert!(fill.done);
        pt.reset();
        let fill = src
            .next_batch(&mut pt, Side::A, Limit::Records(4), None)
            .unwrap();
        assert!(fill.done);
        assert_eq!(fill.records, 0);
    }
}
