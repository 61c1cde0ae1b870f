//! Dispatch of batches to worker threads
//!
//! A [`PatternComposer`] owns every [`PatternSource`] of a run and hands the
//! next batch to whichever thread asks. Lock order is always the composer
//! lock first and a source lock second.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::batch::{Fill, Limit, PerThreadReadBuf, Side};
use crate::error::{ConfigError, MateFile, Result};
use crate::params::{Inputs, PatternParams};
use crate::source::PatternSource;
use crate::Input;

/// Source of globally unique, gapless RecordIds
#[derive(Debug, Default)]
pub struct ReadCounter(AtomicU64);
impl ReadCounter {
    /// Reserve `n` consecutive ids and return the first
    pub fn reserve(&self, n: usize) -> u64 {
        self.0.fetch_add(n as u64, Ordering::Relaxed)
    }

    /// Ids handed out so far
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// How the sources of a composer are arranged
#[derive(Debug)]
pub enum Layout {
    /// Every source yields unpaired records, or pairs stored in one record
    Single(Vec<PatternSource>),
    /// Mate-1 sources, each with its mate-2 source if it has one
    Paired(Vec<(PatternSource, Option<PatternSource>)>),
}

/// The dispatcher shared by all worker threads
#[derive(Debug)]
pub struct PatternComposer {
    layout: Layout,
    /// Index of the source (or source pair) currently being drained
    cur: Mutex<usize>,
    ids: ReadCounter,
    params: Arc<PatternParams>,
}
impl PatternComposer {
    #[must_use]
    pub fn new(layout: Layout, params: Arc<PatternParams>) -> Self {
        Self {
            layout,
            cur: Mutex::new(0),
            ids: ReadCounter::default(),
            params,
        }
    }

    /// Build a composer from input lists
    ///
    /// Without mate lists every input becomes a single-stream source, with
    /// interleaved inputs first. With mate lists the composer is paired:
    /// interleaved and unpaired inputs are added as sources with no second
    /// mate, interleaved first, then mate pairs, then unpaired.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::NoInputs`] - every list is empty
    /// * [`ConfigError::MateListMismatch`] - the mate lists differ in length
    /// * [`ConfigError::MatesInOneLine`] - mate lists given for `tab5`/`tab6` input
    /// * [`ConfigError::NoValidInputs`] - no file of some list could be opened
    pub fn setup(inputs: Inputs, params: PatternParams) -> Result<Self> {
        if inputs.is_empty() {
            return Err(ConfigError::NoInputs.into());
        }
        if inputs.mate1.len() != inputs.mate2.len() {
            return Err(ConfigError::MateListMismatch {
                first: inputs.mate1.len(),
                second: inputs.mate2.len(),
            }
            .into());
        }
        if !inputs.mate1.is_empty() && params.format.holds_both_mates() {
            return Err(ConfigError::MatesInOneLine(params.format).into());
        }
        let params = Arc::new(params);
        let Inputs {
            unpaired,
            mate1,
            mate2,
            interleaved,
        } = inputs;

        let layout = if mate1.is_empty() {
            let mut sources = build_sources(interleaved, &params)?;
            sources.extend(build_sources(unpaired, &params)?);
            Layout::Single(sources)
        } else {
            let mut pairs: Vec<_> = build_sources(interleaved, &params)?
                .into_iter()
                .map(|src| (src, None))
                .collect();
            let srca = build_sources(mate1, &params)?;
            let srcb = build_sources(mate2, &params)?;
            pairs.extend(srca.into_iter().zip(srcb.into_iter().map(Some)));
            pairs.extend(
                build_sources(unpaired, &params)?
                    .into_iter()
                    .map(|src| (src, None)),
            );
            Layout::Paired(pairs)
        };
        Ok(Self::new(layout, params))
    }

    #[must_use]
    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn is_paired(&self) -> bool {
        matches!(self.layout, Layout::Paired(_))
    }

    #[must_use]
    pub fn num_sources(&self) -> usize {
        match &self.layout {
            Layout::Single(sources) => sources.len(),
            Layout::Paired(pairs) => pairs.len(),
        }
    }

    /// RecordIds handed out so far
    #[must_use]
    pub fn total_read_count(&self) -> u64 {
        self.ids.total()
    }

    /// Fill `pt` with the next batch
    ///
    /// # Returns
    ///
    /// `(done, count)`: `count` records were delivered and `done` is set once
    /// the source they came from has nothing further. `(true, 0)` means every
    /// source is exhausted and the caller should stop asking.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MismatchedMates`] when the two mates of a pair yield a
    /// different number of records, plus any I/O or format error of the sources.
    pub fn next_batch(&self, pt: &mut PerThreadReadBuf) -> Result<(bool, usize)> {
        pt.reset();
        pt.set_byte_buffer(self.params.format.is_lazy());
        let (done, count) = match &self.layout {
            Layout::Single(sources) => self.next_single(sources, pt)?,
            Layout::Paired(pairs) => self.next_paired(pairs, pt)?,
        };
        pt.set_records(count);
        Ok((done, count))
    }

    fn next_single(&self, sources: &[PatternSource], pt: &mut PerThreadReadBuf) -> Result<(bool, usize)> {
        let limit = self.params.format.default_limit(&self.params);
        let mut cur = *self.cur.lock();
        while cur < sources.len() {
            let fill = sources[cur].next_batch(pt, Side::A, limit, Some(&self.ids))?;
            if fill.records == 0 {
                cur = self.advance(cur);
                continue;
            }
            return Ok((fill.done, fill.records));
        }
        Ok((true, 0))
    }

    fn next_paired(
        &self,
        pairs: &[(PatternSource, Option<PatternSource>)],
        pt: &mut PerThreadReadBuf,
    ) -> Result<(bool, usize)> {
        let limit = self.params.format.default_limit(&self.params);
        let mut cur = *self.cur.lock();
        while cur < pairs.len() {
            let (srca, srcb) = &pairs[cur];
            let Some(srcb) = srcb else {
                let fill = srca.next_batch(pt, Side::A, limit, Some(&self.ids))?;
                if fill.records == 0 {
                    cur = self.advance(cur);
                    continue;
                }
                return Ok((fill.done, fill.records));
            };

            let mut guard = self.cur.lock();
            if *guard != cur {
                cur = *guard;
                continue;
            }
            let (fa, fb) = self.read_pair(srca, srcb, pt, limit)?;
            if fa.records == 0 && fb.records == 0 {
                if cur + 1 > *guard {
                    *guard += 1;
                    debug!("Moved on to source pair {}", *guard);
                }
                cur = *guard;
                continue;
            }
            if fa.records != fb.records {
                let shorter = if fa.records < fb.records {
                    MateFile::First
                } else {
                    MateFile::Second
                };
                return Err(ConfigError::MismatchedMates {
                    shorter,
                    shorter_count: fa.records.min(fb.records),
                    longer_count: fa.records.max(fb.records),
                }
                .into());
            }
            pt.set_read_id(self.ids.reserve(fa.records));
            drop(guard);
            return Ok((fa.done, fa.records));
        }
        Ok((true, 0))
    }

    /// Read matching batches from both mates; called with the composer lock held
    fn read_pair(
        &self,
        srca: &PatternSource,
        srcb: &PatternSource,
        pt: &mut PerThreadReadBuf,
        limit: Limit,
    ) -> Result<(Fill, Fill)> {
        let fa = srca.next_batch(pt, Side::A, limit, None)?;
        // the second mate must yield exactly as many records as the first
        let limit_b = if fa.records > 0 {
            Limit::Records(fa.records)
        } else {
            limit
        };
        let fb = srcb.next_batch(pt, Side::B, limit_b, None)?;
        Ok((fa, fb))
    }

    /// Move past source `cur` unless another thread already has
    fn advance(&self, cur: usize) -> usize {
        let mut guard = self.cur.lock();
        if cur + 1 > *guard {
            *guard += 1;
            debug!("Moved on to source {}", *guard);
        }
        *guard
    }
}

/// One source per list, or one per file in file-parallel mode
fn build_sources(list: Vec<Input>, params: &Arc<PatternParams>) -> Result<Vec<PatternSource>> {
    if list.is_empty() {
        Ok(Vec::new())
    } else if params.file_parallel {
        list.into_iter()
            .map(|input| PatternSource::new(vec![input], Arc::clone(params)))
            .collect()
    } else {
        Ok(vec![PatternSource::new(list, Arc::clone(params))?])
    }
}
