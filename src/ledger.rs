//! Paged, append-only storage of per-iteration timestamps
//!
//! Samples live in fixed-capacity pages that are allocated only when the first
//! sample mapping to them is recorded, or ahead of time through
//! [`Ledger::reserve_next`]. Reporting consumes the ledger through
//! [`Ledger::into_drain`], which drops each page as soon as its last sample
//! has been handed out, so memory shrinks while the report is written.

use crate::clock::{Nanos, Timestamp};
use crate::error::{AppError, Result};
use std::collections::VecDeque;

/// Default number of samples per page
pub const DEFAULT_PAGE_CAPACITY: usize = 1024;

/// Send and receive time of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationSample {
    pub send_ts: Timestamp,
    pub recv_ts: Timestamp,
}

impl IterationSample {
    pub fn latency(&self) -> Nanos {
        self.recv_ts - self.send_ts
    }
}

/// Position of a sample whose receive time has not been stamped yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the receive time must be recorded through this handle"]
pub struct SampleHandle {
    page: usize,
    slot: usize,
}

/// Fixed-capacity run of consecutive samples
#[derive(Debug)]
struct ResultsPage {
    samples: Vec<IterationSample>,
    capacity: usize,
}

impl ResultsPage {
    fn allocate(capacity: usize) -> Result<Self> {
        let mut samples = Vec::new();
        samples.try_reserve_exact(capacity).map_err(|e| {
            AppError::allocation(format!("results page of {} samples: {}", capacity, e))
        })?;
        Ok(Self { samples, capacity })
    }

    fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }
}

#[derive(Debug)]
pub struct Ledger {
    pages: VecDeque<ResultsPage>,
    page_capacity: usize,
    next_index: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            pages: VecDeque::new(),
            page_capacity: DEFAULT_PAGE_CAPACITY,
            next_index: 0,
        }
    }

    pub fn with_page_capacity(page_capacity: usize) -> Result<Self> {
        if page_capacity == 0 {
            return Err(AppError::validation("Page size must be greater than 0"));
        }
        Ok(Self {
            page_capacity,
            ..Self::new()
        })
    }

    /// Allocate the page the next index maps to, if it is not held yet.
    ///
    /// After this, the following `record_send` does not allocate. At most one
    /// empty page is held ahead of the samples.
    pub fn reserve_next(&mut self) -> Result<()> {
        if self.pages.back().map_or(true, ResultsPage::is_full) {
            self.pages.push_back(ResultsPage::allocate(self.page_capacity)?);
        }
        Ok(())
    }

    /// Store the send time of iteration `index`.
    ///
    /// `index` must be the next logical index; a page is allocated when it
    /// falls on a page boundary and was not reserved.
    pub fn record_send(&mut self, index: u64, at: Timestamp) -> Result<SampleHandle> {
        if index != self.next_index {
            return Err(AppError::internal(format!(
                "sample {} recorded out of order, expected {}",
                index, self.next_index
            )));
        }

        self.reserve_next()?;

        let page = self.pages.len() - 1;
        let samples = &mut self.pages[page].samples;
        samples.push(IterationSample { send_ts: at, recv_ts: at });
        self.next_index += 1;

        Ok(SampleHandle {
            page,
            slot: samples.len() - 1,
        })
    }

    /// Stamp the receive time of the iteration behind `handle`
    pub fn record_receive(&mut self, handle: SampleHandle, at: Timestamp) -> Result<()> {
        let sample = self
            .pages
            .get_mut(handle.page)
            .and_then(|page| page.samples.get_mut(handle.slot))
            .ok_or_else(|| {
                AppError::internal(format!(
                    "no sample at page {} slot {} for receive time",
                    handle.page, handle.slot
                ))
            })?;
        sample.recv_ts = at;
        Ok(())
    }

    /// Number of recorded samples
    pub fn len(&self) -> u64 {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Pages currently allocated
    pub fn pages_held(&self) -> usize {
        self.pages.len()
    }

    /// Samples in index order, without consuming the ledger
    pub fn iter(&self) -> impl Iterator<Item = &IterationSample> + '_ {
        self.pages.iter().flat_map(|page| page.samples.iter())
    }

    /// Consume the ledger, releasing each page right after its last sample
    pub fn into_drain(self) -> Drain {
        Drain {
            pages: self.pages,
            current: None,
            index: 0,
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Consuming iterator over `(index, sample)` pairs
#[derive(Debug)]
pub struct Drain {
    pages: VecDeque<ResultsPage>,
    current: Option<std::vec::IntoIter<IterationSample>>,
    index: u64,
}

impl Drain {
    /// Pages still allocated, including the one being read
    pub fn pages_held(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }
}

impl Iterator for Drain {
    type Item = (u64, IterationSample);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(sample) = current.next() {
                    let index = self.index;
                    self.index += 1;
                    if current.len() == 0 {
                        // Last sample of this page: release it now
                        self.current = None;
                    }
                    return Some((index, sample));
                }
                self.current = None;
            }

            let page = self.pages.pop_front()?;
            self.current = Some(page.samples.into_iter());
        }
    }
}
