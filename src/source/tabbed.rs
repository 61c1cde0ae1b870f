//! Tab-delimited reads: one line holds an unpaired read or both mates

use crate::error::ParseError;
use crate::params::PatternParams;
use crate::record::Record;

use super::{check_qual_len, chomp, finish_record, push_bases, push_quals};

/// Parse the line held in `ra.raw` into `ra`, and into `rb` when it holds a pair
///
/// `tab6` selects the six-field pair layout where the second mate carries
/// its own name; otherwise pairs have five fields and share one name.
pub(super) fn parse(
    ra: &mut Record,
    rb: &mut Record,
    rdid: u64,
    params: &PatternParams,
    tab6: bool,
) -> Result<(), ParseError> {
    let raw = std::mem::take(&mut ra.raw);
    let result = {
        let fields: Vec<&[u8]> = chomp(&raw).split(|&b| b == b'\t').collect();
        match (fields.len(), tab6) {
            (3, _) => install(ra, fields[0], fields[1], fields[2], params),
            (5, false) => {
                let a = install(ra, fields[0], fields[1], fields[2], params);
                let b = install(rb, fields[0], fields[3], fields[4], params);
                a.and(b)
            }
            (6, true) => {
                let a = install(ra, fields[0], fields[1], fields[2], params);
                let b = install(rb, fields[3], fields[4], fields[5], params);
                a.and(b)
            }
            (n, _) => Err(ParseError::MalformedTabbed {
                rdid,
                fields: n,
                expected: if tab6 { "3 or 6" } else { "3 or 5" },
            }),
        }
    };
    ra.raw = raw;
    result
}

fn install(
    rec: &mut Record,
    name: &[u8],
    seq: &[u8],
    qual: &[u8],
    params: &PatternParams,
) -> Result<(), ParseError> {
    rec.name.extend_from_slice(name);
    push_bases(&mut rec.seq, seq);
    push_quals(rec, qual, params)?;
    check_qual_len(rec)?;
    finish_record(rec, params);
    Ok(())
}
