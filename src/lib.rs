//! # seqdispatch
//!
//! Multi-threaded dispatch of sequencing reads with output in input order.
//!
//! Worker threads pull batches of reads from one or more inputs through a
//! shared [`PatternComposer`], parse and finalize them with no lock held,
//! process them independently, and hand their output to an [`OutputQueue`]
//! that writes it back out in the order the reads were read.
//!
//! ## Components
//!
//! * [`PatternSource`] - one input stream (a list of files) behind its own lock
//! * [`PatternComposer`] - picks which source (or mate pair of sources) serves the next batch
//! * [`PerThreadReadDispenser`] - a worker's iterator over finalized reads
//! * [`OutputQueue`] - restores input order on output, or batches per thread when order does not matter
//! * [`process_parallel`] - runs a [`ReadProcessor`] over all reads on a thread pool
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use seqdispatch::{
//!     process_parallel, Format, Input, Inputs, OutputQueue, PatternComposer, PatternParams,
//!     Policy, ReadProcessor, Record, Result,
//! };
//!
//! #[derive(Clone)]
//! struct Lengths;
//! impl ReadProcessor for Lengths {
//!     fn process_read(&mut self, ra: &Record, _rb: Option<&Record>, out: &mut Vec<u8>) -> Result<()> {
//!         out.extend_from_slice(format!("{}\n", ra.len()).as_bytes());
//!         Ok(())
//!     }
//! }
//!
//! let reads = Input::Memory(Arc::from(&b">a\nACGT\n>b\nAC\n"[..]));
//! let composer = PatternComposer::setup(
//!     Inputs::default().unpaired([reads]),
//!     PatternParams::new(Format::Fasta),
//! )?;
//! let outq = Arc::new(OutputQueue::new(Box::new(std::io::sink()), true, 2));
//! process_parallel(Arc::new(composer), Arc::clone(&outq), Lengths, 2, Policy::Fail)?;
//! assert_eq!(outq.num_flushed(), 2);
//! # Ok::<(), seqdispatch::Error>(())
//! ```

mod batch;
mod composer;
mod cursor;
mod dispenser;
pub mod error;
mod outq;
mod parallel;
mod params;
mod policy;
mod qual;
mod record;
mod source;

pub use batch::{Fill, Limit, PerThreadReadBuf, RawBuf, Side};
pub use composer::{Layout, PatternComposer, ReadCounter};
pub use cursor::{FileCursor, Input, INPUT_BUFFER_SIZE};
pub use dispenser::{NextRead, PerThreadReadDispenser};
pub use error::{Error, IntoDispatchError, Result};
pub use outq::{OutputQueue, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PER_THREAD_BUFFER};
pub use parallel::{process_parallel, ReadProcessor};
pub use params::{Inputs, PatternParams, DEFAULT_BATCH_SIZE, DEFAULT_RAW_BUFFER_SIZE};
pub use policy::Policy;
pub use qual::{char_to_phred33, int_to_phred33, solexa_to_phred, QualityEncoding, DEFAULT_QUALITY};
pub use record::{dna_code, gen_rand_seed, Mate, Record};
pub use source::{Format, PatternSource};
