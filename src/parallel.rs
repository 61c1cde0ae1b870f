use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::composer::PatternComposer;
use crate::dispenser::{NextRead, PerThreadReadDispenser};
use crate::outq::OutputQueue;
use crate::policy::Policy;
use crate::record::Record;
use crate::Result;

/// Trait for types that turn reads into output bytes on worker threads
///
/// This is implemented by the **processor**; the thread pool is driven by
/// [`process_parallel`]. Each worker holds its own clone.
pub trait ReadProcessor: Send + Clone {
    /// Process one read (or pair), appending its output to `out`
    ///
    /// `out` is empty on entry. Whatever is left in it is emitted in
    /// RecordId order by the output queue.
    fn process_read(&mut self, ra: &Record, rb: Option<&Record>, out: &mut Vec<u8>) -> Result<()>;

    /// Called when a thread finishes processing its batch
    /// Default implementation does nothing
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread should call this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Run `processor` over every read of `composer` on a pool of worker threads
///
/// Each worker loops: acquire a batch, parse and finalize off-lock, process,
/// then hand the bytes to `outq` with `begin_read`/`finish_read`. Once every
/// worker is done the queue is force-flushed.
///
/// # Arguments
///
/// * `composer` - The dispatcher shared by all workers
/// * `outq` - Where output is collected; its thread count caps the pool size
/// * `processor` - Cloned once per worker
/// * `num_threads` - The number of threads to spawn (0 for all logical CPUs)
/// * `policy` - What to do with records that fail to parse
///
/// # Returns
///
/// * `Ok(())` - If all records were processed and written
/// * `Err(Error)` - The first fatal error any worker hit
pub fn process_parallel<P: ReadProcessor + 'static>(
    composer: Arc<PatternComposer>,
    outq: Arc<OutputQueue>,
    processor: P,
    num_threads: usize,
    policy: Policy,
) -> Result<()> {
    // Calculate the number of threads to use
    let num_threads = if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads
    }
    .min(outq.nthreads());

    // Set by the first worker to fail so the others stop pulling batches
    let abort = Arc::new(AtomicBool::new(false));

    // Build thread handles
    let mut handles = Vec::new();
    for tid in 0..num_threads {
        let mut processor = processor.clone();
        let composer = Arc::clone(&composer);
        let outq = Arc::clone(&outq);
        let abort = Arc::clone(&abort);
        processor.set_tid(tid);

        let handle = std::thread::spawn(move || -> Result<()> {
            let result = run_worker(tid, composer, &outq, &mut processor, policy, &abort);
            if result.is_err() {
                abort.store(true, Ordering::Relaxed);
            }
            result
        });
        handles.push(handle);
    }

    // Wait for every worker, keeping the first error
    let mut result = Ok(());
    for handle in handles {
        let worker = handle.join().expect("Error joining worker thread");
        if result.is_ok() {
            result = worker;
        }
    }
    result?;
    outq.flush(true)
}

fn run_worker<P: ReadProcessor>(
    tid: usize,
    composer: Arc<PatternComposer>,
    outq: &OutputQueue,
    processor: &mut P,
    policy: Policy,
    abort: &AtomicBool,
) -> Result<()> {
    let mut dispenser = PerThreadReadDispenser::new(composer);

    // reusable output buffer
    let mut out = Vec::new();

    while !abort.load(Ordering::Relaxed) {
        let next = dispenser.next_read_pair()?;
        let rdid = dispenser.rdid();
        match next {
            NextRead::Exhausted => break,
            NextRead::Read { .. } => {
                outq.begin_read(rdid, tid);
                out.clear();
                processor.process_read(dispenser.read_a(), dispenser.read_b(), &mut out)?;
                outq.finish_read(&out, rdid, tid)?;
            }
            NextRead::Malformed { error, .. } => {
                policy.handle(error, rdid)?;
                outq.begin_read(rdid, tid);
                outq.finish_read(&[], rdid, tid)?;
            }
        }
        if dispenser.buf().exhausted() {
            processor.on_batch_complete()?;
        }
    }
    Ok(())
}
