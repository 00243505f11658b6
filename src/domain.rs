//! Iteration domain - how many candidates a mask describes and how to slice them.
//!
//! A flat `u64` counter addresses the keyspace. Up to 15 wildcards fit
//! exactly; from 16 wildcards on the space is capped at `2^64 - 1` indices
//! and only a subset of it is visited.

use std::ops::Range;

use crate::mask::MaskContext;

/// Largest wildcard count whose keyspace is exactly representable.
pub const MAX_EXACT_WILDCARDS: usize = 15;

const BITS_PER_NIBBLE: usize = 4;

/// Errors building an index window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("window start {start} is past window end {end}")]
    InvertedWindow { start: u64, end: u64 },
}

/// Sized enumeration domain for one mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationDomain {
    total: u64,
    saturated: bool,
    wildcard_count: usize,
    window: Range<u64>,
}

impl IterationDomain {
    /// Size the domain of a compiled mask.
    ///
    /// With 16 or more wildcards the total is capped at `u64::MAX` and the
    /// domain is flagged saturated. Index `i` feeds its 16 base-16 digits to
    /// the first 16 scanned wildcards, so only those vary and every later
    /// wildcard stays `0`.
    pub fn size(ctx: &MaskContext) -> Self {
        let wildcard_count = ctx.wildcard_count();
        let (total, saturated) = if wildcard_count <= MAX_EXACT_WILDCARDS {
            (1u64 << (wildcard_count * BITS_PER_NIBBLE), false)
        } else {
            (u64::MAX, true)
        };

        Self {
            total,
            saturated,
            wildcard_count,
            window: 0..total,
        }
    }

    /// Restrict enumeration to `[start, end)`, clamped to the total.
    ///
    /// A window that starts at or past the total yields an empty domain.
    pub fn with_window(mut self, start: u64, end: Option<u64>) -> Result<Self, DomainError> {
        if let Some(end) = end {
            if start > end {
                return Err(DomainError::InvertedWindow { start, end });
            }
        }

        let end = end.unwrap_or(self.total).min(self.total);
        let start = start.min(end);
        self.window = start..end;
        Ok(self)
    }

    /// Number of indices the full mask keyspace maps to.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard_count
    }

    /// Indices that will actually be visited.
    pub fn window(&self) -> Range<u64> {
        self.window.clone()
    }

    /// Number of indices in the window.
    pub fn len(&self) -> u64 {
        self.window.end - self.window.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split the window into launches of at most `chunk_capacity` indices.
    pub fn ranges(&self, chunk_capacity: u64) -> Partition {
        Partition::new(self.window.clone(), chunk_capacity)
    }

    /// Warning text for a saturated domain, `None` when the space is exact.
    pub fn saturation_warning(&self) -> Option<String> {
        if !self.saturated {
            return None;
        }

        Some(if self.wildcard_count == MAX_EXACT_WILDCARDS + 1 {
            format!(
                "mask has {} wildcards (2^64 keys); the 64-bit counter covers 2^64 - 1 of them, \
                 the key with every wildcard set to f is skipped",
                self.wildcard_count
            )
        } else {
            format!(
                "mask has {} wildcards (2^{} keys); the 64-bit counter only enumerates 2^64 - 1 of them, \
                 the last {} wildcards stay 0",
                self.wildcard_count,
                self.wildcard_count * BITS_PER_NIBBLE,
                self.wildcard_count - (MAX_EXACT_WILDCARDS + 1)
            )
        })
    }
}

/// Split `[0, total)` into contiguous launches of at most `chunk_capacity`.
pub fn partition(total: u64, chunk_capacity: u64) -> Partition {
    Partition::new(0..total, chunk_capacity)
}

/// Ascending, disjoint sub-ranges covering a window exactly once.
#[derive(Debug, Clone)]
pub struct Partition {
    next: u64,
    end: u64,
    chunk: u64,
}

impl Partition {
    fn new(window: Range<u64>, chunk_capacity: u64) -> Self {
        Self {
            next: window.start,
            end: window.end,
            chunk: chunk_capacity.max(1),
        }
    }
}

impl Iterator for Partition {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let start = self.next;
        let end = start.saturating_add(self.chunk).min(self.end);
        self.next = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        let count = remaining.div_ceil(self.chunk);
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        (count, Some(count))
    }
}
