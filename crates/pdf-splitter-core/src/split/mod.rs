//! Size-constrained page grouping.
//!
//! Pages are packed greedily from the front of the document. For every group
//! the largest run that still fits under the ceiling is found by binary
//! search against the [`SizeOracle`], so page sizes never have to be
//! estimated and every multi-page group is maximal: appending the next page
//! would overflow the ceiling.
//!
//! A page that alone exceeds the ceiling becomes its own group flagged as
//! `oversized`. Oracle failures on multi-page runs count as "does not fit";
//! a failure on a single page aborts the split with
//! [`Error::UnmeasurablePage`].
//!
//! Binary search assumes the oracle is monotone: a run never measures smaller
//! than any of its prefixes.

mod group;
mod oracle;

pub use group::{Group, SplitPlan};
pub use oracle::{FnOracle, SizeOracle, oracle_fn};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Shared flag for aborting a split between oracle calls.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of searching for the next group starting at some page.
enum Run {
    /// `pages` pages starting at the cursor fit, measuring `size` bytes
    Fits { pages: usize, size: u64 },
    /// The page at the cursor alone measures `size` bytes, above the ceiling
    Oversized { size: u64 },
}

/// Splits a page sequence into groups under a byte ceiling.
#[derive(Debug, Clone)]
pub struct Splitter {
    ceiling: u64,
    cancel: Option<CancelFlag>,
}

impl Splitter {
    /// Create a splitter for `ceiling` bytes per group.
    pub fn new(ceiling: u64) -> Result<Self> {
        if ceiling == 0 {
            return Err(Error::InvalidArgument(
                "byte ceiling must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            ceiling,
            cancel: None,
        })
    }

    /// Abort with [`Error::SplitCancelled`] once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub const fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Partition pages `0..page_count` into groups.
    ///
    /// Nothing is returned until every page is assigned; on error or
    /// cancellation the groups computed so far are discarded.
    pub async fn split<O>(&self, page_count: usize, oracle: &O) -> Result<Vec<Group>>
    where
        O: SizeOracle + ?Sized,
    {
        debug!(
            "Splitting {} pages with the {} oracle",
            page_count,
            oracle.name()
        );

        let mut groups = Vec::new();
        let mut pos = 0;

        while pos < page_count {
            let index = groups.len() + 1;
            let group = match self.largest_fitting_run(pos, page_count - pos, oracle).await? {
                Run::Fits { pages, size } => Group {
                    index,
                    start_page: pos,
                    end_page: pos + pages - 1,
                    size,
                    oversized: false,
                },
                Run::Oversized { size } => {
                    warn!(
                        "Page {} alone is {} bytes, above the {} byte ceiling",
                        pos, size, self.ceiling
                    );
                    Group {
                        index,
                        start_page: pos,
                        end_page: pos,
                        size,
                        oversized: true,
                    }
                }
            };

            info!(
                "Group {}: pages {}-{} ({} bytes{})",
                group.index,
                group.start_page,
                group.end_page,
                group.size,
                if group.oversized { ", oversized" } else { "" }
            );

            pos = group.end_page + 1;
            groups.push(group);
        }

        Ok(groups)
    }

    /// Split and wrap the groups in a [`SplitPlan`].
    pub async fn plan<O>(&self, page_count: usize, oracle: &O) -> Result<SplitPlan>
    where
        O: SizeOracle + ?Sized,
    {
        let groups = self.split(page_count, oracle).await?;
        Ok(SplitPlan::new(page_count, self.ceiling, groups))
    }

    /// Split, failing with [`Error::SplitTimeout`] if `timeout` elapses first.
    ///
    /// On expiry the split future is dropped, so no further measurements
    /// start. A measurement already running on a blocking thread (as
    /// [`crate::pdf::PdfSizeOracle`] does) still runs to completion and its
    /// result is discarded.
    pub async fn split_with_timeout<O>(
        &self,
        page_count: usize,
        oracle: &O,
        timeout: Duration,
    ) -> Result<Vec<Group>>
    where
        O: SizeOracle + ?Sized,
    {
        tokio::time::timeout(timeout, self.split(page_count, oracle))
            .await
            .map_err(|_| Error::SplitTimeout(timeout))?
    }

    /// Binary search over run lengths `1..=remaining` starting at `pos`.
    async fn largest_fitting_run<O>(&self, pos: usize, remaining: usize, oracle: &O) -> Result<Run>
    where
        O: SizeOracle + ?Sized,
    {
        let mut lo = 1;
        let mut hi = remaining;
        let mut best: Option<(usize, u64)> = None;
        let mut single_page_size = None;

        while lo <= hi {
            let mid = lo + (hi - lo) / 2;

            match self.measure_run(pos, mid, oracle).await {
                Ok(size) => {
                    debug!(
                        "Probe pages {}..{}: {} bytes (ceiling {})",
                        pos,
                        pos + mid,
                        size,
                        self.ceiling
                    );
                    if mid == 1 {
                        single_page_size = Some(size);
                    }
                    if size <= self.ceiling {
                        best = Some((mid, size));
                        lo = mid + 1;
                    } else {
                        hi = mid - 1;
                    }
                }
                Err(e @ Error::SplitCancelled) => return Err(e),
                Err(e) if mid == 1 => {
                    return Err(Error::UnmeasurablePage {
                        page: pos,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    debug!(
                        "Probe pages {}..{} failed, treating as too large: {}",
                        pos,
                        pos + mid,
                        e
                    );
                    hi = mid - 1;
                }
            }
        }

        if let Some((pages, size)) = best {
            return Ok(Run::Fits { pages, size });
        }

        // Without a fitting run the search always ends on the single-page probe.
        let size = match single_page_size {
            Some(size) => size,
            None => self
                .measure_run(pos, 1, oracle)
                .await
                .map_err(|e| Error::UnmeasurablePage {
                    page: pos,
                    reason: e.to_string(),
                })?,
        };
        Ok(Run::Oversized { size })
    }

    async fn measure_run<O>(&self, pos: usize, len: usize, oracle: &O) -> Result<u64>
    where
        O: SizeOracle + ?Sized,
    {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(Error::SplitCancelled);
        }

        let pages: Vec<usize> = (pos..pos + len).collect();
        oracle.measure(&pages).await
    }
}

/// Partition `page_count` pages into groups of at most `ceiling` bytes.
pub async fn split<O>(page_count: usize, ceiling: u64, oracle: &O) -> Result<Vec<Group>>
where
    O: SizeOracle + ?Sized,
{
    Splitter::new(ceiling)?.split(page_count, oracle).await
}
