//! Bare sequences, one per line, and reads given literally as `SEQ[:QUALS]`

use crate::error::ParseError;
use crate::params::PatternParams;
use crate::qual::DEFAULT_QUALITY;
use crate::record::Record;

use super::{chomp, default_quals, finish_record, push_bases, push_quals};

/// Parse the line held in `rec.raw`
///
/// With `cmdline` set, text after the first `:` is the quality string; it is
/// padded with the default quality or cut to the sequence length.
pub(super) fn parse(rec: &mut Record, params: &PatternParams, cmdline: bool) -> Result<(), ParseError> {
    let raw = std::mem::take(&mut rec.raw);
    let line = chomp(&raw);
    let split = if cmdline {
        line.iter().position(|&b| b == b':')
    } else {
        None
    };
    let result = match split {
        Some(idx) => {
            push_bases(&mut rec.seq, &line[..idx]);
            let quals = push_quals(rec, &line[idx + 1..], params);
            rec.qual.resize(rec.seq.len(), DEFAULT_QUALITY);
            quals
        }
        None => {
            push_bases(&mut rec.seq, line);
            default_quals(rec);
            Ok(())
        }
    };
    rec.raw = raw;
    result?;
    finish_record(rec, params);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Format;

    fn line(text: &str) -> Record {
        Record {
            raw: text.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_line() {
        let params = PatternParams::new(Format::Raw);
        let mut rec = line("acgtn\n");
        parse(&mut rec, &params, false).unwrap();
        assert_eq!(rec.seq(), b"ACGTN");
        assert_eq!(rec.qual(), b"IIIII");
        assert!(rec.name().is_empty());
    }

    #[test]
    fn test_raw_ignores_colon() {
        let params = PatternParams::new(Format::Raw);
        let mut rec = line("AC:GT\n");
        parse(&mut rec, &params, false).unwrap();
        assert_eq!(rec.seq(), b"ACGT");
    }

    #[test]
    fn test_cmdline_pads_short_quals() {
        let params = PatternParams::new(Format::CmdLine);
        let mut rec = line("ACGT:#5\n");
        parse(&mut rec, &params, true).unwrap();
        assert_eq!(rec.seq(), b"ACGT");
        assert_eq!(rec.qual(), b"#5II");
    }

    #[test]
    fn test_cmdline_truncates_long_quals() {
        let params = PatternParams::new(Format::CmdLine);
        let mut rec = line("AC:ABCDE\n");
        parse(&mut rec, &params, true).unwrap();
        assert_eq!(rec.qual(), b"AB");
    }

    #[test]
    fn test_cmdline_without_quals() {
        let params = PatternParams::new(Format::CmdLine).trim3(1);
        let mut rec = line("GGA\n");
        parse(&mut rec, &params, true).unwrap();
        assert_eq!(rec.seq(), b"GG");
        assert_eq!(rec.qual(), b"II");
        assert_eq!(rec.trimmed3(), 1);
    }
}
