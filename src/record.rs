//! Parsed sequencing records
//!
//! A [`Record`] lives in a slot of a per-thread batch buffer. It is populated
//! by a format parser, finalized by the dispenser (mate, id, seed) and then
//! handed to downstream processing. Slots are reset rather than reallocated
//! when the buffer moves on to the next batch.

use rand::{rngs::SmallRng, SeedableRng};

/// Which end of a fragment a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mate {
    /// Single-end read
    #[default]
    Unpaired,
    /// First mate of a pair
    First,
    /// Second mate of a pair
    Second,
}
impl Mate {
    /// Numeric mate index: 0 for unpaired, 1 or 2 for paired
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Unpaired => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// A single read (or one mate of a pair)
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Raw text handed over by an eager light parser
    pub(crate) raw: Vec<u8>,
    pub(crate) name: Vec<u8>,
    /// Forward sequence, upper-case `ACGTN`
    pub(crate) seq: Vec<u8>,
    /// Phred+33 qualities, same length as `seq`
    pub(crate) qual: Vec<u8>,
    pub(crate) mate: Mate,
    pub(crate) trimmed5: usize,
    pub(crate) trimmed3: usize,
    pub(crate) seed: u32,
    pub(crate) rdid: u64,
    pub(crate) parsed: bool,
}
impl Record {
    /// Clears the parsed fields but keeps any raw text in place
    pub fn reset(&mut self) {
        self.name.clear();
        self.seq.clear();
        self.qual.clear();
        self.mate = Mate::Unpaired;
        self.trimmed5 = 0;
        self.trimmed3 = 0;
        self.seed = 0;
        self.rdid = 0;
        self.parsed = false;
    }

    /// Clears everything, raw text included
    pub fn clear(&mut self) {
        self.raw.clear();
        self.reset();
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    #[inline]
    #[must_use]
    pub fn qual(&self) -> &[u8] {
        &self.qual
    }

    #[inline]
    #[must_use]
    pub fn mate(&self) -> Mate {
        self.mate
    }

    /// Bases removed from the 5' end
    #[inline]
    #[must_use]
    pub fn trimmed5(&self) -> usize {
        self.trimmed5
    }

    /// Bases removed from the 3' end
    #[inline]
    #[must_use]
    pub fn trimmed3(&self) -> usize {
        self.trimmed3
    }

    #[inline]
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// The global RecordId shared by both mates of a pair
    #[inline]
    #[must_use]
    pub fn rdid(&self) -> u64 {
        self.rdid
    }

    #[inline]
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// A random number generator seeded from this record's seed
    ///
    /// Two runs over the same input with the same global seed draw the same
    /// numbers for the same record, whatever thread processed it.
    #[must_use]
    pub fn rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(u64::from(self.seed))
    }

    /// Appends `/1` or `/2` to the name unless it already ends that way
    pub fn fix_mate_name(&mut self, mate: Mate) {
        let digit = match mate {
            Mate::First => b'1',
            Mate::Second => b'2',
            Mate::Unpaired => return,
        };
        if !self.name.ends_with(&[b'/', digit]) {
            self.name.push(b'/');
            self.name.push(digit);
        }
    }

    /// Names the record after its id if the input gave it no name
    pub(crate) fn default_name(&mut self, rdid: u64) {
        if self.name.is_empty() {
            let mut buffer = itoa::Buffer::new();
            self.name.extend_from_slice(buffer.format(rdid).as_bytes());
        }
    }
}

/// Two-bit code of a nucleotide, 4 for anything ambiguous
#[inline]
#[must_use]
pub fn dna_code(base: u8) -> u32 {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => 4,
    }
}

/// Derive a reproducible per-record seed
///
/// Folds the sequence, the qualities, and the name (up to the first `/`)
/// into the global seed. The result depends only on these bytes and the
/// global seed, never on which thread or batch the record came from.
#[must_use]
pub fn gen_rand_seed(seq: &[u8], qual: &[u8], name: &[u8], seed: u32) -> u32 {
    let mut rseed = seed
        .wrapping_add(101)
        .wrapping_mul(59)
        .wrapping_mul(61)
        .wrapping_mul(67)
        .wrapping_mul(71)
        .wrapping_mul(73)
        .wrapping_mul(79)
        .wrapping_mul(83);
    for (i, &b) in seq.iter().enumerate() {
        let off = ((i & 15) << 1) as u32;
        rseed ^= dna_code(b) << off;
    }
    for (i, &q) in qual.iter().take(seq.len()).enumerate() {
        let off = ((i & 3) << 3) as u32;
        rseed ^= u32::from(q) << off;
    }
    for (i, &c) in name.iter().enumerate() {
        if c == b'/' {
            break;
        }
        let off = ((i & 3) << 3) as u32;
        rseed ^= u32::from(c) << off;
    }
    rseed
}
