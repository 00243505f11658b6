//! Output handlers for candidates and hits.

mod console;
mod multi;

pub use console::ConsoleOutput;
pub use multi::MultiOutput;

use anyhow::Result;
use crate::derive::DerivedKey;
use crate::evaluate::Hit;

/// Output trait for handling enumerated keys.
pub trait Output: Send + Sync {
    /// Output a candidate (listing mode, no matcher).
    fn key(&self, derived: &DerivedKey) -> Result<()>;

    /// Output a match hit.
    fn hit(&self, hit: &Hit) -> Result<()>;

    /// Flush any buffered output.
    fn flush(&self) -> Result<()>;
}
