use std::error::Error as StdError;

use crate::Format;

/// Custom Result type for seqdispatch operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the seqdispatch library, encompassing all possible error cases
/// that can occur while dispatching reads and emitting ordered output.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors in how the inputs were configured
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Errors from parsing a single record
    #[error("Error parsing record: {0}")]
    ParseError(#[from] ParseError),

    /// Errors that occur while emitting output
    #[error("Error writing output: {0}")]
    OutputError(#[from] OutputError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// Conversion errors from anyhow errors
    #[error("Generic error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error should terminate the whole run
    ///
    /// Everything except a per-record [`ParseError`] is fatal: a malformed
    /// record only affects itself, while configuration, I/O, and output
    /// failures invalidate every record that follows.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ParseError(_))
    }
}

/// Which mate file of a pair a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateFile {
    /// The file(s) holding the first mates
    First,
    /// The file(s) holding the second mates
    Second,
}
impl MateFile {
    fn flag(self) -> &'static str {
        match self {
            Self::First => "-1",
            Self::Second => "-2",
        }
    }

    fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}
impl std::fmt::Display for MateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// Errors in the input configuration
///
/// These are never retried: the run cannot produce correct output.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// One mate source ran out of records before the other
    ///
    /// # Fields
    /// * `shorter` - The mate file that yielded fewer records
    /// * `shorter_count` - Records that mate yielded for the batch
    /// * `longer_count` - Records the other mate yielded for the batch
    #[error(
        "fewer reads in file specified with {shorter} than in file specified with {} ({shorter_count} vs {longer_count})",
        .shorter.other()
    )]
    MismatchedMates {
        shorter: MateFile,
        shorter_count: usize,
        longer_count: usize,
    },

    /// Not a single file in an input list could be opened
    #[error("No input read files were valid (tried {0})")]
    NoValidInputs(usize),

    /// No input lists were provided at all
    #[error("No input reads were specified")]
    NoInputs,

    /// The format name is not recognized
    #[error("Unsupported read format: {0}")]
    UnsupportedFormat(String),

    /// The first non-blank byte of an input is wrong for the declared format
    #[error("Reads file {path} does not look like a {format} file (first byte: {found:?})")]
    UnexpectedFormat {
        path: String,
        format: Format,
        found: char,
    },

    /// The two mate lists have a different number of files
    #[error("Mate lists differ in length: {first} file(s) for -1 but {second} file(s) for -2")]
    MateListMismatch { first: usize, second: usize },

    /// A format that carries both mates on one line was given as a mate list
    #[error("{0} reads hold both mates per line and must be given as interleaved input, not as -1/-2")]
    MatesInOneLine(Format),
}

/// Errors from parsing a single record
///
/// These do not advance the RecordId sequence on their own: the record still
/// owns its id and subsequent records parse normally.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// More sequence characters than quality values
    #[error("Read {0} has more read characters than quality values")]
    TooFewQualities(String),

    /// More quality values than sequence characters
    #[error("Read {0} has more quality values than read characters")]
    TooManyQualities(String),

    /// ASCII quality string contains a space
    #[error(
        "Encountered one or more spaces while parsing the quality string for read {0}. If this is a FASTQ file with integer (non-ASCII-encoded) qualities, try enabling integer qualities"
    )]
    WrongQualityFormat(String),

    /// A quality byte is below the floor of the selected encoding
    ///
    /// # Fields
    /// * `name` - Read name
    /// * `found` - The offending byte
    /// * `encoding` - Human readable name of the expected encoding
    #[error("Read {name}: saw ASCII character {found} but expected {encoding}-based quality")]
    InvalidQuality {
        name: String,
        found: u8,
        encoding: &'static str,
    },

    /// An integer quality token did not parse
    #[error("Read {name}: could not parse integer quality {token:?}")]
    InvalidIntegerQuality { name: String, token: String },

    /// A record ended before all of its lines were present
    #[error("Truncated record with id {0}")]
    TruncatedRecord(u64),

    /// The separator line of a FASTQ record did not start with '+'
    #[error("Read {0}: expected '+' separator line")]
    MissingSeparator(String),

    /// A tab-delimited line had an unexpected number of fields
    #[error("Tab-delimited record with id {rdid} has {fields} fields; expected {expected}")]
    MalformedTabbed {
        rdid: u64,
        fields: usize,
        expected: &'static str,
    },
}

/// Errors that occur while writing ordered output
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// A sink accepted fewer bytes than requested
    ///
    /// # Fields
    /// * `partition` - Index of the output partition
    /// * `written` - Bytes the sink accepted
    /// * `expected` - Bytes requested
    #[error("Wrote only {written} out of {expected} bytes to output {partition}")]
    ShortWrite {
        partition: usize,
        written: usize,
        expected: usize,
    },
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoDispatchError {
    fn into_dispatch_error(self) -> Error;
}

// Implement conversion for Box<dyn Error>
impl<E> IntoDispatchError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_dispatch_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum MyError {
        #[error("Custom error: {0}")]
        CustomError(String),
    }

    #[test]
    fn test_into_dispatch_error() {
        let my_error = MyError::CustomError(String::from("some error"));
        let error = my_error.into_dispatch_error();
        assert!(matches!(error, Error::GenericError(_)));
        assert!(error.is_fatal());
    }

    // ==================== Error::is_fatal Tests ====================

    #[test]
    fn test_parse_error_is_not_fatal() {
        let error = Error::ParseError(ParseError::TooFewQualities("r1".to_string()));
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let error = Error::ConfigError(ConfigError::NoValidInputs(3));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_output_error_is_fatal() {
        let error: Error = OutputError::ShortWrite {
            partition: 0,
            written: 1,
            expected: 2,
        }
        .into();
        assert!(error.is_fatal());
    }

    // ==================== ConfigError Tests ====================

    #[test]
    fn test_mismatched_mates_message() {
        let error = ConfigError::MismatchedMates {
            shorter: MateFile::Second,
            shorter_count: 3,
            longer_count: 5,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("fewer reads in file specified with -2"));
        assert!(error_str.contains("than in file specified with -1"));
        assert!(error_str.contains('3'));
        assert!(error_str.contains('5'));
    }

    #[test]
    fn test_unexpected_format_message() {
        let error = ConfigError::UnexpectedFormat {
            path: "reads.fq".to_string(),
            format: Format::Fastq,
            found: '>',
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("reads.fq"));
        assert!(error_str.contains("FASTQ"));
    }

    #[test]
    fn test_mate_list_mismatch_message() {
        let error = ConfigError::MateListMismatch {
            first: 2,
            second: 1,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains('2'));
        assert!(error_str.contains('1'));
    }

    // ==================== ParseError Tests ====================

    #[test]
    fn test_invalid_quality_message() {
        let error = ParseError::InvalidQuality {
            name: "read7".to_string(),
            found: b'#',
            encoding: "64",
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("read7"));
        assert!(error_str.contains("64"));
    }

    #[test]
    fn test_malformed_tabbed_message() {
        let error = ParseError::MalformedTabbed {
            rdid: 12,
            fields: 4,
            expected: "3 or 5",
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("12"));
        assert!(error_str.contains("3 or 5"));
    }

    // ==================== OutputError Tests ====================

    #[test]
    fn test_short_write_message() {
        let error = OutputError::ShortWrite {
            partition: 1,
            written: 10,
            expected: 20,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("Wrote only 10 out of 20"));
    }

    #[test]
    fn test_mates_in_one_line_message() {
        let error = ConfigError::MatesInOneLine(Format::Tab6);
        let error_str = format!("{error}");
        assert!(error_str.contains("TAB6"));
        assert!(error_str.contains("interleaved"));
    }

    // ==================== Error Conversion Tests ====================

    #[test]
    fn test_error_from_config_error() {
        let error: Error = ConfigError::NoInputs.into();
        assert!(matches!(error, Error::ConfigError(_)));
    }

    #[test]
    fn test_error_from_io_error() {
        let error: Error = std::io::Error::other("boom").into();
        assert!(matches!(error, Error::IoError(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let error: Error = anyhow::anyhow!("processor failed").into();
        assert!(matches!(error, Error::AnyhowError(_)));
    }

    #[test]
    fn test_error_debug_output() {
        let error = Error::ParseError(ParseError::TruncatedRecord(4));
        let debug_str = format!("{error:?}");
        assert!(debug_str.contains("ParseError"));
    }
}
