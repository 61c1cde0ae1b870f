//! FASTA: eager, one slot per `>` record, sequence lines joined

use crate::batch::{Fill, PerThreadReadBuf, Side};
use crate::cursor::FileCursor;
use crate::error::{ParseError, Result};
use crate::params::PatternParams;
use crate::record::Record;

use super::{chomp, default_quals, finish_record, push_bases};

/// Copy up to `max` records of the current file into slots starting at `offset`
pub(super) fn fill(
    cursor: &mut FileCursor,
    pt: &mut PerThreadReadBuf,
    side: Side,
    offset: usize,
    max: usize,
) -> Result<Fill> {
    let mut n = 0;
    while n < max {
        if cursor.skip_newlines()?.is_none() {
            break;
        }
        let slot = pt.slot_mut(side, offset + n);
        slot.raw.clear();
        cursor.read_line(&mut slot.raw)?;
        while !matches!(cursor.peek()?, None | Some(b'>')) {
            cursor.read_line(&mut slot.raw)?;
        }
        n += 1;
    }
    Ok(Fill {
        done: cursor.at_eof()?,
        units: n,
        records: n,
    })
}

/// Parse the text held in `rec.raw`
pub(super) fn parse(rec: &mut Record, params: &PatternParams) -> std::result::Result<(), ParseError> {
    let raw = std::mem::take(&mut rec.raw);
    let mut lines = raw.split_inclusive(|&b| b == b'\n');
    if let Some(header) = lines.next() {
        let header = chomp(header);
        rec.name
            .extend_from_slice(header.strip_prefix(b">").unwrap_or(header));
    }
    for line in lines {
        push_bases(&mut rec.seq, line);
    }
    rec.raw = raw;
    default_quals(rec);
    finish_record(rec, params);
    Ok(())
}
