use serde::Serialize;
use std::ops::RangeInclusive;

use crate::error::{Error, Result};

/// A contiguous run of source pages assigned to one output part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// 1-based position among the output groups
    pub index: usize,
    /// First page (0-indexed, inclusive)
    pub start_page: usize,
    /// Last page (0-indexed, inclusive)
    pub end_page: usize,
    /// Serialized size in bytes as measured by the oracle
    pub size: u64,
    /// Single page that alone exceeds the ceiling
    pub oversized: bool,
}

impl Group {
    pub const fn page_count(&self) -> usize {
        self.end_page - self.start_page + 1
    }

    pub const fn pages(&self) -> RangeInclusive<usize> {
        self.start_page..=self.end_page
    }

    pub fn page_indices(&self) -> Vec<usize> {
        self.pages().collect()
    }

    /// Human page range, 1-indexed: `"3-7"`, or `"4"` for a single page.
    pub fn page_range_label(&self) -> String {
        if self.start_page == self.end_page {
            format!("{}", self.start_page + 1)
        } else {
            format!("{}-{}", self.start_page + 1, self.end_page + 1)
        }
    }
}

/// Result of splitting one document against one ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitPlan {
    page_count: usize,
    ceiling: u64,
    groups: Vec<Group>,
}

impl SplitPlan {
    pub(crate) const fn new(page_count: usize, ceiling: u64, groups: Vec<Group>) -> Self {
        Self {
            page_count,
            ceiling,
            groups,
        }
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    pub const fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups that exceed the ceiling on their own
    pub fn oversized(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.oversized)
    }

    pub fn has_oversized(&self) -> bool {
        self.groups.iter().any(|g| g.oversized)
    }

    pub fn total_size(&self) -> u64 {
        self.groups.iter().map(|g| g.size).sum()
    }

    /// Check the partition invariants:
    /// contiguous 1-based indices, exhaustive non-overlapping page coverage,
    /// multi-page groups within the ceiling, and `oversized` set exactly on
    /// single pages above it.
    pub fn validate(&self) -> Result<()> {
        let mut next_page = 0;

        for (position, group) in self.groups.iter().enumerate() {
            if group.index != position + 1 {
                return Err(plan_error(format!(
                    "group at position {position} has index {}",
                    group.index
                )));
            }
            if group.start_page != next_page || group.end_page < group.start_page {
                return Err(plan_error(format!(
                    "group {} covers pages {}..={} but page {next_page} was expected next",
                    group.index, group.start_page, group.end_page
                )));
            }

            let over = group.size > self.ceiling;
            if over && group.page_count() > 1 {
                return Err(plan_error(format!(
                    "group {} has {} pages and {} bytes, above the {} byte ceiling",
                    group.index,
                    group.page_count(),
                    group.size,
                    self.ceiling
                )));
            }
            if over != group.oversized {
                return Err(plan_error(format!(
                    "group {} oversized flag is {} for {} bytes",
                    group.index, group.oversized, group.size
                )));
            }

            next_page = group.end_page + 1;
        }

        if next_page != self.page_count {
            return Err(plan_error(format!(
                "groups cover {next_page} of {} pages",
                self.page_count
            )));
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("failed to encode plan: {e}")))
    }
}

fn plan_error(reason: String) -> Error {
    Error::InvalidArgument(format!("inconsistent split plan: {reason}"))
}
