//! Input-side configuration
//!
//! [`PatternParams`] controls how reads are batched and parsed, and
//! [`Inputs`] lists where they come from.

use crate::{Format, Input, QualityEncoding};

/// Default number of records per eager batch
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Default byte target per lazy batch
pub const DEFAULT_RAW_BUFFER_SIZE: usize = 512 * 1024;

/// Parameters shared by every source of a composer
#[derive(Debug, Clone)]
pub struct PatternParams {
    /// Format of every input
    pub format: Format,
    /// Records per batch for eager formats
    pub batch_size: usize,
    /// Byte target per batch for the lazy format
    pub raw_buffer_size: usize,
    /// Bases trimmed from the 5' end
    pub trim5: usize,
    /// Bases trimmed from the 3' end
    pub trim3: usize,
    /// Global seed folded into every per-record seed
    pub seed: u32,
    /// Encoding of ASCII quality strings
    pub quality: QualityEncoding,
    /// Qualities are whitespace-separated integers
    pub int_quals: bool,
    /// Append `/1` and `/2` to mate names
    pub fix_name: bool,
    /// One source per input file rather than one per list
    pub file_parallel: bool,
}
impl Default for PatternParams {
    fn default() -> Self {
        Self {
            format: Format::Fastq,
            batch_size: DEFAULT_BATCH_SIZE,
            raw_buffer_size: DEFAULT_RAW_BUFFER_SIZE,
            trim5: 0,
            trim3: 0,
            seed: 0,
            quality: QualityEncoding::Phred33,
            int_quals: false,
            fix_name: false,
            file_parallel: false,
        }
    }
}
impl PatternParams {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    #[must_use]
    pub fn raw_buffer_size(mut self, n: usize) -> Self {
        self.raw_buffer_size = n.max(1);
        self
    }

    #[must_use]
    pub fn trim5(mut self, n: usize) -> Self {
        self.trim5 = n;
        self
    }

    #[must_use]
    pub fn trim3(mut self, n: usize) -> Self {
        self.trim3 = n;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn quality(mut self, encoding: QualityEncoding) -> Self {
        self.quality = encoding;
        self
    }

    #[must_use]
    pub fn int_quals(mut self, int_quals: bool) -> Self {
        self.int_quals = int_quals;
        self
    }

    #[must_use]
    pub fn fix_name(mut self, fix_name: bool) -> Self {
        self.fix_name = fix_name;
        self
    }

    #[must_use]
    pub fn file_parallel(mut self, file_parallel: bool) -> Self {
        self.file_parallel = file_parallel;
        self
    }
}

/// The input lists a composer is built from
///
/// # Example
///
/// ```
/// use seqdispatch::Inputs;
///
/// let inputs = Inputs::default()
///     .paired(["r1.fq"], ["r2.fq"])
///     .unpaired(["singles.fq"]);
/// assert_eq!(inputs.mate1.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Unpaired reads
    pub unpaired: Vec<Input>,
    /// First mates
    pub mate1: Vec<Input>,
    /// Second mates, parallel to `mate1`
    pub mate2: Vec<Input>,
    /// Inputs holding both mates of a pair on each line
    pub interleaved: Vec<Input>,
}
impl Inputs {
    #[must_use]
    pub fn unpaired<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Input>,
    {
        self.unpaired.extend(inputs.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn paired<I, S>(mut self, mate1: I, mate2: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Input>,
    {
        self.mate1.extend(mate1.into_iter().map(Into::into));
        self.mate2.extend(mate2.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn interleaved<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Input>,
    {
        self.interleaved.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// True if no input was given at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unpaired.is_empty()
            && self.mate1.is_empty()
            && self.mate2.is_empty()
            && self.interleaved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = PatternParams::default();
        assert_eq!(params.format, Format::Fastq);
        assert_eq!(params.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(params.raw_buffer_size, DEFAULT_RAW_BUFFER_SIZE);
        assert!(!params.fix_name);
    }

    #[test]
    fn test_builder_setters() {
        let params = PatternParams::new(Format::Fasta)
            .batch_size(0)
            .trim5(2)
            .trim3(1)
            .seed(9)
            .fix_name(true);
        assert_eq!(params.format, Format::Fasta);
        assert_eq!(params.batch_size, 1);
        assert_eq!(params.trim5, 2);
        assert_eq!(params.trim3, 1);
        assert_eq!(params.seed, 9);
        assert!(params.fix_name);
    }

    #[test]
    fn test_inputs_builder() {
        let inputs = Inputs::default()
            .paired(["a_1.fq", "b_1.fq"], ["a_2.fq", "b_2.fq"])
            .unpaired(["-"]);
        assert_eq!(inputs.mate1.len(), 2);
        assert_eq!(inputs.mate2.len(), 2);
        assert_eq!(inputs.unpaired, vec![Input::Stdin]);
        assert!(!inputs.is_empty());
        assert!(Inputs::default().is_empty());
    }
}
