//! Per-thread read dispenser
//!
//! Each worker thread owns one [`PerThreadReadDispenser`]. It pulls batches
//! from the shared [`PatternComposer`] and turns them into finalized records
//! (mate, RecordId, seed) without holding any lock.

use std::sync::Arc;

use crate::batch::PerThreadReadBuf;
use crate::composer::PatternComposer;
use crate::error::{ParseError, Result};
use crate::params::PatternParams;
use crate::record::{gen_rand_seed, Mate, Record};
use crate::source;

/// Outcome of [`PerThreadReadDispenser::next_read_pair`]
#[derive(Debug)]
pub enum NextRead {
    /// A record (or pair) is ready; `last` marks the final record of the stream
    Read { last: bool },
    /// The record owns its RecordId but could not be parsed
    Malformed { error: ParseError, last: bool },
    /// Every source is exhausted
    Exhausted,
}
impl NextRead {
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    /// Whether this is the last record of the final batch
    #[must_use]
    pub fn is_last(&self) -> bool {
        match self {
            Self::Read { last } | Self::Malformed { last, .. } => *last,
            Self::Exhausted => true,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// A worker thread's view of the composer
pub struct PerThreadReadDispenser {
    composer: Arc<PatternComposer>,
    buf: PerThreadReadBuf,
    /// The current batch is the final one of its source
    last_batch: bool,
    last_batch_size: usize,
}
impl PerThreadReadDispenser {
    #[must_use]
    pub fn new(composer: Arc<PatternComposer>) -> Self {
        let params = composer.params();
        let buf = PerThreadReadBuf::new(params.batch_size);
        Self {
            composer,
            buf,
            last_batch: false,
            last_batch_size: 0,
        }
    }

    /// Advance to the next record (or pair) and parse it
    ///
    /// A fresh batch is requested from the composer only once the current
    /// one is used up.
    ///
    /// # Errors
    ///
    /// Fatal errors from the composer: mismatched mates, unusable inputs, I/O.
    /// A record that fails to parse is not an error here; it is reported as
    /// [`NextRead::Malformed`] and the stream continues after it.
    pub fn next_read_pair(&mut self) -> Result<NextRead> {
        if self.buf.exhausted() {
            let (done, count) = self.composer.next_batch(&mut self.buf)?;
            self.last_batch = done;
            self.last_batch_size = count;
            if count == 0 {
                return Ok(NextRead::Exhausted);
            }
        } else {
            self.buf.next();
        }
        let last = self.last_batch && self.buf.is_last(self.last_batch_size);

        let params = self.composer.params();
        match source::parse(&mut self.buf, params) {
            Ok(()) => {
                finalize(&mut self.buf, params);
                Ok(NextRead::Read { last })
            }
            Err(error) => {
                let rdid = self.buf.rdid();
                let (ra, _) = self.buf.reads_mut();
                ra.rdid = rdid;
                Ok(NextRead::Malformed { error, last })
            }
        }
    }

    /// The unpaired read, or the first mate
    #[must_use]
    pub fn read_a(&self) -> &Record {
        self.buf.read_a()
    }

    /// The second mate, if the current record is a pair
    #[must_use]
    pub fn read_b(&self) -> Option<&Record> {
        if self.buf.has_mate() {
            Some(self.buf.read_b())
        } else {
            None
        }
    }

    /// RecordId of the current record
    #[must_use]
    pub fn rdid(&self) -> u64 {
        self.buf.rdid()
    }

    #[must_use]
    pub fn buf(&self) -> &PerThreadReadBuf {
        &self.buf
    }

    #[must_use]
    pub fn composer(&self) -> &PatternComposer {
        &self.composer
    }
}

/// Stamp mate, RecordId and seed on the current record(s)
fn finalize(buf: &mut PerThreadReadBuf, params: &PatternParams) {
    let rdid = buf.rdid();
    let paired = buf.has_mate();
    let (ra, rb) = buf.reads_mut();
    if paired {
        finalize_record(ra, rdid, Mate::First, params);
        finalize_record(rb, rdid, Mate::Second, params);
    } else {
        finalize_record(ra, rdid, Mate::Unpaired, params);
    }
}

fn finalize_record(rec: &mut Record, rdid: u64, mate: Mate, params: &PatternParams) {
    rec.mate = mate;
    rec.rdid = rdid;
    rec.default_name(rdid);
    rec.seed = gen_rand_seed(&rec.seq, &rec.qual, &rec.name, params.seed);
    if params.fix_name {
        rec.fix_mate_name(mate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Format, Input, Inputs};

    fn memory(text: &str) -> Input {
        Input::Memory(Arc::from(text.as_bytes()))
    }

    fn dispenser(inputs: Inputs, params: PatternParams) -> PerThreadReadDispenser {
        PerThreadReadDispenser::new(Arc::new(PatternComposer::setup(inputs, params).unwrap()))
    }

    #[test]
    fn test_unpaired_fastq_stream() {
        let text = "@r0\nACGT\n+\nIIII\n@r1\nGGGG\n+\nIIII\n@r2\nTTTT\n+\nIIII\n";
        let params = PatternParams::new(Format::Fastq).raw_buffer_size(20);
        let mut disp = dispenser(Inputs::default().unpaired([memory(text)]), params);

        let mut seen = Vec::new();
        loop {
            let next = disp.next_read_pair().unwrap();
            if next.is_exhausted() {
                break;
            }
            assert!(next.success());
            let ra = disp.read_a();
            assert_eq!(ra.mate(), Mate::Unpaired);
            assert!(disp.read_b().is_none());
            seen.push((ra.rdid(), ra.name().to_vec(), next.is_last()));
        }
        assert_eq!(
            seen,
            vec![
                (0, b"r0".to_vec(), false),
                (1, b"r1".to_vec(), false),
                (2, b"r2".to_vec(), true),
            ]
        );
    }

    #[test]
    fn test_paired_finalize() {
        let m1 = memory("@frag\nACGT\n+\nIIII\n");
        let m2 = memory("@frag\nTTGC\n+\n5555\n");
        let params = PatternParams::new(Format::Fastq).seed(11).fix_name(true);
        let mut disp = dispenser(Inputs::default().paired([m1], [m2]), params);

        let next = disp.next_read_pair().unwrap();
        assert!(next.success());
        assert!(next.is_last());
        let ra = disp.read_a();
        let rb = disp.read_b().unwrap();
        assert_eq!(ra.mate(), Mate::First);
        assert_eq!(rb.mate(), Mate::Second);
        assert_eq!(ra.name(), b"frag/1");
        assert_eq!(rb.name(), b"frag/2");
        assert_eq!(ra.rdid(), rb.rdid());
        // seed is computed before the mate suffix is added
        assert_eq!(ra.seed(), gen_rand_seed(b"ACGT", b"IIII", b"frag", 11));
        assert_eq!(rb.seed(), gen_rand_seed(b"TTGC", b"5555", b"frag", 11));

        assert!(disp.next_read_pair().unwrap().is_exhausted());
    }

    #[test]
    fn test_tab5_pairs_in_single_stream() {
        let text = "a\tAC\tII\tGT\tII\nb\tTT\tII\n";
        let params = PatternParams::new(Format::Tab5);
        let mut disp = dispenser(Inputs::default().interleaved([memory(text)]), params);

        assert!(disp.next_read_pair().unwrap().success());
        assert_eq!(disp.read_a().mate(), Mate::First);
        assert_eq!(disp.read_b().unwrap().seq(), b"GT");

        assert!(disp.next_read_pair().unwrap().success());
        assert_eq!(disp.read_a().mate(), Mate::Unpaired);
        assert!(disp.read_b().is_none());
        assert_eq!(disp.rdid(), 1);
    }

    #[test]
    fn test_raw_reads_named_by_id() {
        let params = PatternParams::new(Format::Raw).batch_size(2);
        let mut disp = dispenser(Inputs::default().unpaired([memory("AC\nGT\nTT\n")]), params);
        let mut names = Vec::new();
        while disp.next_read_pair().unwrap().success() {
            names.push(disp.read_a().name().to_vec());
        }
        assert_eq!(names, vec![b"0".to_vec(), b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_malformed_record_keeps_its_id() {
        let text = "@a\nAC\n+\nI\n@b\nAC\n+\nII\n";
        let mut disp = dispenser(
            Inputs::default().unpaired([memory(text)]),
            PatternParams::new(Format::Fastq),
        );

        let next = disp.next_read_pair().unwrap();
        assert!(matches!(
            next,
            NextRead::Malformed {
                error: ParseError::TooFewQualities(_),
                last: false
            }
        ));
        assert_eq!(disp.read_a().rdid(), 0);

        let next = disp.next_read_pair().unwrap();
        assert!(next.success());
        assert!(next.is_last());
        assert_eq!(disp.read_a().name(), b"b");
        assert_eq!(disp.read_a().rdid(), 1);
    }

    #[test]
    fn test_mismatched_mates_surface_as_error() {
        let m1 = memory("@a\nA\n+\nI\n@b\nC\n+\nI\n");
        let m2 = memory("@a\nA\n+\nI\n");
        let mut disp = dispenser(Inputs::default().paired([m1], [m2]), PatternParams::default());
        assert!(disp.next_read_pair().is_err());
    }
}
