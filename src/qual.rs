//! Quality score decoding
//!
//! All decoders produce Phred+33 ASCII regardless of the input encoding so
//! downstream consumers only ever see one representation.

use crate::error::ParseError;

/// Quality byte used for formats that carry no qualities
pub const DEFAULT_QUALITY: u8 = b'I';

/// Quality encoding of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityEncoding {
    /// ASCII Phred with an offset of 33 (default)
    #[default]
    Phred33,
    /// ASCII Phred with an offset of 64
    Phred64,
    /// ASCII Solexa with an offset of 64
    Solexa64,
}

/// Convert a Solexa-scaled quality to the Phred scale
#[must_use]
pub fn solexa_to_phred(sol: i32) -> i32 {
    if sol < -10 {
        return 0;
    }
    let phred = 10.0 * (1.0 + 10f64.powf(f64::from(sol) / 10.0)).log10();
    phred.round() as i32
}

/// Decode one ASCII quality character into Phred+33
pub fn char_to_phred33(c: u8, encoding: QualityEncoding, name: &[u8]) -> Result<u8, ParseError> {
    if c == b' ' {
        return Err(ParseError::WrongQualityFormat(lossy(name)));
    }
    match encoding {
        QualityEncoding::Solexa64 => {
            let q = solexa_to_phred(i32::from(c) - 64) + 33;
            if q < 33 {
                return Err(ParseError::InvalidQuality {
                    name: lossy(name),
                    found: c,
                    encoding: "64 (Solexa)",
                });
            }
            Ok(q.min(126) as u8)
        }
        QualityEncoding::Phred64 => {
            if c < 64 {
                return Err(ParseError::InvalidQuality {
                    name: lossy(name),
                    found: c,
                    encoding: "64",
                });
            }
            Ok(c - (64 - 33))
        }
        QualityEncoding::Phred33 => {
            if c < 33 {
                return Err(ParseError::InvalidQuality {
                    name: lossy(name),
                    found: c,
                    encoding: "33",
                });
            }
            Ok(c)
        }
    }
}

/// Encode an integer quality as Phred+33; negative values clamp to zero
#[must_use]
pub fn int_to_phred33(q: i32, solexa: bool) -> u8 {
    let phred = if solexa { solexa_to_phred(q) } else { q };
    (phred.clamp(0, 93) + 33) as u8
}

/// Decode whitespace-separated integer qualities into `out`
pub fn decode_int_quals(line: &[u8], solexa: bool, name: &[u8], out: &mut Vec<u8>) -> Result<(), ParseError> {
    for token in line
        .split(u8::is_ascii_whitespace)
        .filter(|t| !t.is_empty())
    {
        let parsed = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| ParseError::InvalidIntegerQuality {
                name: lossy(name),
                token: String::from_utf8_lossy(token).into_owned(),
            })?;
        out.push(int_to_phred33(parsed, solexa));
    }
    Ok(())
}

pub(crate) fn lossy(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phred33_passthrough() {
        assert_eq!(char_to_phred33(b'I', QualityEncoding::Phred33, b"r").unwrap(), b'I');
        assert_eq!(char_to_phred33(b'!', QualityEncoding::Phred33, b"r").unwrap(), b'!');
    }

    #[test]
    fn test_phred33_below_floor() {
        let err = char_to_phred33(b'\t', QualityEncoding::Phred33, b"r").unwrap_err();
        assert!(matches!(err, ParseError::InvalidQuality { found: b'\t', .. }));
    }

    #[test]
    fn test_phred64_shift() {
        // 'h' is Q40 in Phred+64, 'I' in Phred+33
        assert_eq!(char_to_phred33(b'h', QualityEncoding::Phred64, b"r").unwrap(), b'I');
        assert!(char_to_phred33(b'5', QualityEncoding::Phred64, b"r").is_err());
    }

    #[test]
    fn test_space_is_wrong_format() {
        let err = char_to_phred33(b' ', QualityEncoding::Phred33, b"read1").unwrap_err();
        assert!(matches!(err, ParseError::WrongQualityFormat(ref n) if n == "read1"));
    }

    #[test]
    fn test_solexa_to_phred() {
        assert_eq!(solexa_to_phred(-20), 0);
        assert_eq!(solexa_to_phred(-5), 1);
        assert_eq!(solexa_to_phred(0), 3);
        assert_eq!(solexa_to_phred(10), 10);
        assert_eq!(solexa_to_phred(40), 40);
    }

    #[test]
    fn test_solexa64_char() {
        // Solexa 40 ('h') maps to Phred 40
        assert_eq!(char_to_phred33(b'h', QualityEncoding::Solexa64, b"r").unwrap(), b'I');
    }

    #[test]
    fn test_int_quals() {
        let mut out = Vec::new();
        decode_int_quals(b"40 30  -5\t0", false, b"r", &mut out).unwrap();
        assert_eq!(out, vec![b'I', b'?', b'!', b'!']);
    }

    #[test]
    fn test_int_quals_rejects_garbage() {
        let mut out = Vec::new();
        let err = decode_int_quals(b"40 x1", false, b"r", &mut out).unwrap_err();
        assert!(matches!(err, ParseError::InvalidIntegerQuality { ref token, .. } if token == "x1"));
    }
}
