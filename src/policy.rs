//! Handling of records that fail to parse
//!
//! A malformed record never disturbs the RecordId sequence: it keeps its id
//! whatever the policy, so ordering of the records around it is unaffected.

use log::warn;

use crate::error::{ParseError, Result};

/// Policy for records that fail to parse
///
/// The default policy is `Fail`, which stops the run at the first bad record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Stop the run with the parse error (default policy)
    #[default]
    Fail,

    /// Warn, emit an empty payload for the record, and continue
    Skip,
}
impl Policy {
    /// Apply the policy to a parse failure of record `rdid`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record should be skipped
    /// * `Err(Error)` - The run should stop
    pub fn handle(self, error: ParseError, rdid: u64) -> Result<()> {
        match self {
            Self::Fail => Err(error.into()),
            Self::Skip => {
                warn!("Skipping malformed record {rdid}: {error}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_default_policy() {
        assert_eq!(Policy::default(), Policy::Fail);
    }

    #[test]
    fn test_fail_policy() {
        let result = Policy::Fail.handle(ParseError::TruncatedRecord(3), 3);
        assert!(matches!(
            result,
            Err(Error::ParseError(ParseError::TruncatedRecord(3)))
        ));
    }

    #[test]
    fn test_skip_policy() {
        let result = Policy::Skip.handle(ParseError::TooManyQualities("r".to_string()), 0);
        assert!(result.is_ok());
    }
}
