//! FASTQ: lazy, whole four-line records copied into a byte buffer
//!
//! The fill only counts lines so the critical section stays short; record
//! structure is checked by [`parse`], which walks the buffer with `memchr`
//! from the position the previous parse stopped at.

use memchr::memchr;

use crate::batch::{Fill, Limit, RawBuf};
use crate::cursor::FileCursor;
use crate::error::{ParseError, Result};
use crate::params::PatternParams;
use crate::qual::lossy;
use crate::record::Record;

use super::{check_qual_len, chomp, finish_record, is_blank, push_bases, push_quals};

const LINES_PER_RECORD: usize = 4;

/// Append whole records of the current file to `raw` until `limit` is met
///
/// Returns the fill and whether the appended text ends on a record boundary;
/// only a truncated final record leaves it unaligned.
pub(super) fn fill(cursor: &mut FileCursor, raw: &mut RawBuf, limit: Limit) -> Result<(Fill, bool)> {
    let start_len = raw.data.len();
    let mut lines = 0;
    let mut done = false;
    loop {
        if lines % LINES_PER_RECORD == 0 {
            let satisfied = match limit {
                Limit::Bytes(n) => raw.data.len() - start_len >= n,
                Limit::Records(n) => lines / LINES_PER_RECORD >= n,
            };
            if satisfied {
                break;
            }
        }
        let before = raw.data.len();
        if cursor.read_line(&mut raw.data)? == 0 {
            done = true;
            break;
        }
        // blank lines are only allowed between records
        if lines % LINES_PER_RECORD == 0 && is_blank(&raw.data[before..]) {
            raw.data.truncate(before);
            continue;
        }
        if raw.data.last() != Some(&b'\n') {
            raw.data.push(b'\n');
        }
        lines += 1;
    }
    if !done {
        done = cursor.at_eof()?;
    }
    let records = lines.div_ceil(LINES_PER_RECORD);
    let fill = Fill {
        done,
        units: raw.data.len() - start_len,
        records,
    };
    Ok((fill, lines % LINES_PER_RECORD == 0))
}

/// Parse the next record of `raw` into `rec`
///
/// The buffer cursor always moves past the record, so a failure here never
/// shifts the records that follow it.
pub(super) fn parse(
    rec: &mut Record,
    raw: &mut RawBuf,
    rdid: u64,
    params: &PatternParams,
) -> std::result::Result<(), ParseError> {
    let start = raw.cursor.min(raw.data.len());
    let mut ends = [0; LINES_PER_RECORD];
    let mut pos = start;
    for end in &mut ends {
        match memchr(b'\n', &raw.data[pos..]) {
            Some(off) => {
                *end = pos + off;
                pos += off + 1;
            }
            None => {
                raw.cursor = raw.data.len();
                return Err(ParseError::TruncatedRecord(rdid));
            }
        }
    }
    raw.cursor = pos;

    let data = &raw.data;
    let header = chomp(&data[start..ends[0]]);
    rec.name
        .extend_from_slice(header.strip_prefix(b"@").unwrap_or(header));
    push_bases(&mut rec.seq, &data[ends[0] + 1..ends[1]]);
    if data.get(ends[1] + 1) != Some(&b'+') {
        return Err(ParseError::MissingSeparator(lossy(&rec.name)));
    }
    push_quals(rec, &data[ends[2] + 1..ends[3]], params)?;
    check_qual_len(rec)?;
    finish_record(rec, params);
    Ok(())
}
