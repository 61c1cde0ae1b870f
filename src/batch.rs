//! Per-thread batch buffers
//!
//! A [`PerThreadReadBuf`] is owned by exactly one worker thread. It is filled
//! under a source lock and then parsed with no lock held, so nothing in here
//! is synchronized.

use crate::Record;

/// Which half of a batch a source fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Unpaired reads, or the first mates
    A,
    /// The second mates
    B,
}

/// How much a single fill should read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most this many records
    Records(usize),
    /// At least this many bytes, extended to the next record boundary
    Bytes(usize),
}

/// Outcome of filling a batch from a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fill {
    /// The source has no more input
    pub done: bool,
    /// Units read: records for eager formats, bytes for the lazy format
    pub units: usize,
    /// Records delivered (complete or truncated)
    pub records: usize,
}
impl Fill {
    pub(crate) fn absorb(&mut self, other: Fill) {
        self.done = other.done;
        self.units += other.units;
        self.records += other.records;
    }
}

/// A raw byte buffer plus the position the next parse resumes from
#[derive(Debug, Clone, Default)]
pub struct RawBuf {
    pub(crate) data: Vec<u8>,
    pub(crate) cursor: usize,
}
impl RawBuf {
    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes that have not been parsed yet
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.cursor.min(self.data.len())..]
    }
}

/// Thread-local container for one batch of reads
#[derive(Debug)]
pub struct PerThreadReadBuf {
    bufa: Vec<Record>,
    bufb: Vec<Record>,
    raw_a: RawBuf,
    raw_b: RawBuf,
    /// Maximum records per eager batch
    max_buf: usize,
    /// Index of the current record within the batch
    cur_buf: usize,
    /// Records in the current batch
    nrecords: usize,
    /// RecordId of the first record in the batch
    rdid: u64,
    /// Whether records come from the raw byte buffers
    use_byte_buffer: bool,
}
impl PerThreadReadBuf {
    #[must_use]
    pub fn new(max_buf: usize) -> Self {
        let max_buf = max_buf.max(1);
        Self {
            bufa: vec![Record::default(); max_buf],
            bufb: vec![Record::default(); max_buf],
            raw_a: RawBuf::default(),
            raw_b: RawBuf::default(),
            max_buf,
            cur_buf: 0,
            nrecords: 0,
            rdid: 0,
            use_byte_buffer: false,
        }
    }

    /// Prepare for a fresh batch
    pub fn reset(&mut self) {
        for record in self.bufa.iter_mut().chain(self.bufb.iter_mut()) {
            record.clear();
        }
        self.raw_a.clear();
        self.raw_b.clear();
        self.cur_buf = 0;
        self.nrecords = 0;
        self.rdid = 0;
        self.use_byte_buffer = false;
    }

    /// Advance to the next record of the batch
    pub fn next(&mut self) {
        debug_assert!(!self.exhausted());
        self.cur_buf += 1;
    }

    /// True when the current record is the last one of the batch (or the batch is empty)
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.cur_buf + 1 >= self.nrecords
    }

    /// True when the current record is the last of a batch holding `batch_size` records
    #[must_use]
    pub fn is_last(&self, batch_size: usize) -> bool {
        batch_size > 0 && self.cur_buf == batch_size - 1
    }

    /// RecordId of the current record
    #[must_use]
    pub fn rdid(&self) -> u64 {
        self.rdid + self.cur_buf as u64
    }

    /// RecordId of the first record of the batch
    #[must_use]
    pub fn base_rdid(&self) -> u64 {
        self.rdid
    }

    pub(crate) fn set_read_id(&mut self, rdid: u64) {
        self.rdid = rdid;
    }

    pub(crate) fn set_records(&mut self, nrecords: usize) {
        self.nrecords = nrecords;
    }

    #[must_use]
    pub fn records(&self) -> usize {
        self.nrecords
    }

    #[must_use]
    pub fn cur_buf(&self) -> usize {
        self.cur_buf
    }

    #[must_use]
    pub fn max_buf(&self) -> usize {
        self.max_buf
    }

    pub(crate) fn set_byte_buffer(&mut self, use_byte_buffer: bool) {
        self.use_byte_buffer = use_byte_buffer;
    }

    #[must_use]
    pub fn uses_byte_buffer(&self) -> bool {
        self.use_byte_buffer
    }

    /// Slot index of the current record; lazy batches parse into slot 0
    fn slot(&self) -> usize {
        if self.use_byte_buffer {
            0
        } else {
            self.cur_buf
        }
    }

    #[must_use]
    pub fn read_a(&self) -> &Record {
        &self.bufa[self.slot()]
    }

    #[must_use]
    pub fn read_b(&self) -> &Record {
        &self.bufb[self.slot()]
    }

    /// Mutable access to both records of the current slot
    pub fn reads_mut(&mut self) -> (&mut Record, &mut Record) {
        let slot = self.slot();
        (&mut self.bufa[slot], &mut self.bufb[slot])
    }

    /// Records of the current slot together with the raw buffers they parse from
    pub(crate) fn raw_parts_mut(&mut self) -> (&mut Record, &mut RawBuf, &mut Record, &mut RawBuf) {
        let slot = self.slot();
        (
            &mut self.bufa[slot],
            &mut self.raw_a,
            &mut self.bufb[slot],
            &mut self.raw_b,
        )
    }

    /// Slot `idx` on the given side, growing the slot list when needed
    pub(crate) fn slot_mut(&mut self, side: Side, idx: usize) -> &mut Record {
        let buf = match side {
            Side::A => &mut self.bufa,
            Side::B => &mut self.bufb,
        };
        if idx >= buf.len() {
            buf.resize_with(idx + 1, Record::default);
        }
        &mut buf[idx]
    }

    pub(crate) fn raw_mut(&mut self, side: Side) -> &mut RawBuf {
        match side {
            Side::A => &mut self.raw_a,
            Side::B => &mut self.raw_b,
        }
    }

    /// Whether side B of the current slot holds a second mate
    #[must_use]
    pub fn has_mate(&self) -> bool {
        self.read_b().is_parsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_exhausted() {
        let buf = PerThreadReadBuf::new(4);
        assert!(buf.exhausted());
        assert_eq!(buf.records(), 0);
    }

    #[test]
    fn test_cursor_walks_batch() {
        let mut buf = PerThreadReadBuf::new(4);
        buf.set_read_id(100);
        buf.set_records(3);
        assert!(!buf.exhausted());
        assert_eq!(buf.rdid(), 100);
        assert!(!buf.is_last(3));

        buf.next();
        assert_eq!(buf.rdid(), 101);
        buf.next();
        assert_eq!(buf.rdid(), 102);
        assert!(buf.exhausted());
        assert!(buf.is_last(3));
    }

    #[test]
    fn test_reset_clears_slots() {
        let mut buf = PerThreadReadBuf::new(2);
        buf.slot_mut(Side::A, 0).raw.extend_from_slice(b">r\nAC\n");
        buf.raw_mut(Side::B).data.extend_from_slice(b"@r\n");
        buf.set_records(1);
        buf.set_byte_buffer(true);
        buf.reset();
        assert!(buf.read_a().raw.is_empty());
        assert!(buf.raw_mut(Side::B).is_empty());
        assert!(!buf.uses_byte_buffer());
        assert!(buf.exhausted());
    }

    #[test]
    fn test_slot_mut_grows() {
        let mut buf = PerThreadReadBuf::new(1);
        buf.slot_mut(Side::B, 5).raw.push(b'x');
        assert_eq!(buf.bufb.len(), 6);
    }

    #[test]
    fn test_lazy_mode_uses_slot_zero() {
        let mut buf = PerThreadReadBuf::new(2);
        buf.set_byte_buffer(true);
        buf.set_records(2);
        buf.next();
        buf.reads_mut().0.name.extend_from_slice(b"x");
        assert_eq!(buf.bufa[0].name(), b"x");
    }

    #[test]
    fn test_fill_absorb() {
        let mut total = Fill::default();
        total.absorb(Fill {
            done: true,
            units: 10,
            records: 2,
        });
        total.absorb(Fill {
            done: false,
            units: 5,
            records: 1,
        });
        assert!(!total.done);
        assert_eq!(total.units, 15);
        assert_eq!(total.records, 3);
    }
}
