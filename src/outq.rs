//! Order-restoring output queue
//!
//! Worker threads finish records in any order. In reordering mode the queue
//! holds finished payloads in a ring keyed by RecordId and writes them out
//! only as a contiguous run starting at the low-water mark `cur`. In
//! unordered mode every thread batches its own payloads and writes them to
//! one of several output partitions when its buffer fills.
//!
//! ```
//! use seqdispatch::OutputQueue;
//!
//! let outq = OutputQueue::new(Box::new(Vec::new()), true, 1).flush_threshold(1);
//! outq.begin_read(1, 0);
//! outq.begin_read(0, 0);
//! outq.finish_read(b"second\n", 1, 0).unwrap();
//! assert_eq!(outq.num_flushed(), 0);
//! outq.finish_read(b"first\n", 0, 0).unwrap();
//! assert_eq!(outq.num_flushed(), 2);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::Mutex;

use crate::error::{OutputError, Result};

/// Default number of payloads a thread buffers in unordered mode
pub const DEFAULT_PER_THREAD_BUFFER: usize = 16;

/// Default length of a contiguous finished run that triggers an unforced write
pub const DEFAULT_FLUSH_THRESHOLD: usize = 8;

type Sink = Box<dyn Write + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SlotState {
    #[default]
    Empty,
    Started,
    Finished,
}

#[derive(Debug, Default)]
struct Slot {
    payload: Vec<u8>,
    state: SlotState,
}

/// Pending slots; `slots[i]` holds RecordId `cur + i`
#[derive(Debug, Default)]
struct Ring {
    slots: VecDeque<Slot>,
    cur: u64,
}

/// Payloads one thread has finished but not yet written (unordered mode)
#[derive(Debug, Default)]
struct ThreadBuf {
    data: Vec<u8>,
    count: usize,
}

pub struct OutputQueue {
    reorder: bool,
    nthreads: usize,
    per_thread_buf_size: usize,
    flush_threshold: usize,
    ring: Mutex<Ring>,
    thread_bufs: Vec<Mutex<ThreadBuf>>,
    /// Output partitions; reordering mode writes to the first only
    sinks: Vec<Mutex<Sink>>,
    started: AtomicU64,
    finished: AtomicU64,
    flushed: AtomicU64,
}
impl OutputQueue {
    /// Create a queue over a single sink
    ///
    /// A thread count of 0 means one slot per logical CPU.
    #[must_use]
    pub fn new(sink: Sink, reorder: bool, nthreads: usize) -> Self {
        Self::with_partitions(vec![sink], reorder, nthreads)
    }

    /// Create a queue over several sinks; thread `t` of an unordered queue writes to sink `t % n`
    ///
    /// # Panics
    ///
    /// If `sinks` is empty.
    #[must_use]
    pub fn with_partitions(sinks: Vec<Sink>, reorder: bool, nthreads: usize) -> Self {
        assert!(!sinks.is_empty(), "an output queue needs at least one sink");
        let nthreads = if nthreads == 0 {
            num_cpus::get()
        } else {
            nthreads
        };
        Self {
            reorder,
            nthreads,
            per_thread_buf_size: DEFAULT_PER_THREAD_BUFFER,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            ring: Mutex::new(Ring::default()),
            thread_bufs: (0..nthreads).map(|_| Mutex::default()).collect(),
            sinks: sinks.into_iter().map(Mutex::new).collect(),
            started: AtomicU64::new(0),
            finished: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn per_thread_buf_size(mut self, n: usize) -> Self {
        self.per_thread_buf_size = n.max(1);
        self
    }

    #[must_use]
    pub fn flush_threshold(mut self, n: usize) -> Self {
        self.flush_threshold = n.max(1);
        self
    }

    /// Declare that `tid` is about to produce output for `rdid`
    ///
    /// # Panics
    ///
    /// If `rdid` was already flushed or already started, or `tid` is out of range.
    pub fn begin_read(&self, rdid: u64, tid: usize) {
        self.check_tid(tid);
        if self.reorder {
            let mut ring = self.ring.lock();
            let idx = ring.index_of(rdid);
            if idx >= ring.slots.len() {
                ring.slots.resize_with(idx + 1, Slot::default);
            }
            let slot = &mut ring.slots[idx];
            assert!(
                slot.state == SlotState::Empty,
                "RecordId {rdid} was started twice"
            );
            slot.state = SlotState::Started;
        }
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Hand over the output for `rdid`; `payload` is copied
    ///
    /// An unforced flush follows immediately.
    ///
    /// # Errors
    ///
    /// [`OutputError::ShortWrite`] or an I/O error if the flush fails.
    ///
    /// # Panics
    ///
    /// If `rdid` was not started, was already finished, or `tid` is out of range.
    pub fn finish_read(&self, payload: &[u8], rdid: u64, tid: usize) -> Result<()> {
        self.check_tid(tid);
        if self.reorder {
            let mut ring = self.ring.lock();
            let idx = ring.index_of(rdid);
            let slot = ring
                .slots
                .get_mut(idx)
                .filter(|slot| slot.state != SlotState::Empty);
            let Some(slot) = slot else {
                panic!("RecordId {rdid} was finished without being started");
            };
            assert!(
                slot.state == SlotState::Started,
                "RecordId {rdid} was finished twice"
            );
            slot.payload.clear();
            slot.payload.extend_from_slice(payload);
            slot.state = SlotState::Finished;
            self.finished.fetch_add(1, Ordering::Relaxed);
            self.flush_ring(&mut ring, false)
        } else {
            let mut buf = self.thread_bufs[tid].lock();
            buf.data.extend_from_slice(payload);
            buf.count += 1;
            self.finished.fetch_add(1, Ordering::Relaxed);
            if buf.count >= self.per_thread_buf_size {
                self.flush_thread(tid, &mut buf)?;
            }
            Ok(())
        }
    }

    /// Write whatever is ready
    ///
    /// In reordering mode the contiguous finished run at the head of the ring
    /// is written when `force` is set or the run reaches the flush threshold.
    /// In unordered mode every thread buffer is written when `force` is set
    /// or it is full. A forced flush also flushes the sinks.
    pub fn flush(&self, force: bool) -> Result<()> {
        if self.reorder {
            let mut ring = self.ring.lock();
            self.flush_ring(&mut ring, force)?;
        } else {
            for (tid, buf) in self.thread_bufs.iter().enumerate() {
                let mut buf = buf.lock();
                if buf.count > 0 && (force || buf.count >= self.per_thread_buf_size) {
                    self.flush_thread(tid, &mut buf)?;
                }
            }
        }
        if force {
            for sink in &self.sinks {
                sink.lock().flush()?;
            }
        }
        Ok(())
    }

    /// Called with the ring lock held
    fn flush_ring(&self, ring: &mut Ring, force: bool) -> Result<()> {
        let run = ring
            .slots
            .iter()
            .take_while(|slot| slot.state == SlotState::Finished)
            .count();
        if run == 0 || (!force && run < self.flush_threshold) {
            return Ok(());
        }
        let first = ring.cur;
        for _ in 0..run {
            // a slot leaves the ring only once its payload is written
            if let Some(slot) = ring.slots.front() {
                self.write_partition(0, &slot.payload)?;
            }
            ring.slots.pop_front();
            ring.cur += 1;
            self.flushed.fetch_add(1, Ordering::Relaxed);
        }
        trace!("Flushed RecordIds {first}..{}", ring.cur);
        Ok(())
    }

    /// Called with the thread buffer lock held
    fn flush_thread(&self, tid: usize, buf: &mut ThreadBuf) -> Result<()> {
        self.write_partition(tid % self.sinks.len(), &buf.data)?;
        self.flushed.fetch_add(buf.count as u64, Ordering::Relaxed);
        buf.data.clear();
        buf.count = 0;
        Ok(())
    }

    fn write_partition(&self, partition: usize, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut sink = self.sinks[partition].lock();
        let mut written = 0;
        while written < bytes.len() {
            match sink.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(OutputError::ShortWrite {
                        partition,
                        written,
                        expected: bytes.len(),
                    }
                    .into());
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn check_tid(&self, tid: usize) {
        assert!(
            tid < self.nthreads,
            "thread id {tid} out of range for {} threads",
            self.nthreads
        );
    }

    #[must_use]
    pub fn is_reordering(&self) -> bool {
        self.reorder
    }

    #[must_use]
    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    /// Records announced with [`begin_read`](Self::begin_read)
    #[must_use]
    pub fn num_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Records handed over with [`finish_read`](Self::finish_read)
    #[must_use]
    pub fn num_finished(&self) -> u64 {
        self.finished.load(Ordering::Relaxed)
    }

    /// Records written to a sink
    #[must_use]
    pub fn num_flushed(&self) -> u64 {
        self.flushed.load(Ordering::Relaxed)
    }

    /// The low-water mark: smallest RecordId not yet written (reordering mode)
    #[must_use]
    pub fn cur(&self) -> u64 {
        self.ring.lock().cur
    }
}
impl Ring {
    fn index_of(&self, rdid: u64) -> usize {
        assert!(
            rdid >= self.cur,
            "RecordId {rdid} is below the low-water mark {}",
            self.cur
        );
        (rdid - self.cur) as usize
    }
}
impl fmt::Debug for OutputQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputQueue")
            .field("reorder", &self.reorder)
            .field("nthreads", &self.nthreads)
            .field("partitions", &self.sinks.len())
            .field("started", &self.num_started())
            .field("finished", &self.num_finished())
            .field("flushed", &self.num_flushed())
            .finish_non_exhaustive()
    }
}
