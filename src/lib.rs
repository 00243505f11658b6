//! maskhunt - mask-driven private key search.
//!
//! A 64-character hex mask fixes some nibbles of a 256-bit private key and
//! leaves others as `?`. The mask is compiled once, its keyspace is mapped
//! onto a flat 64-bit counter, and every index is turned back into a key and
//! handed to an evaluator that derives addresses and checks them against
//! targets.

pub mod config;
pub mod derive;
pub mod dispatch;
pub mod domain;
pub mod evaluate;
pub mod key;
pub mod mask;
pub mod matcher;
pub mod network;
pub mod output;
pub mod reconstruct;

pub use dispatch::{Dispatcher, LaunchGeometry, SearchReport};
pub use domain::IterationDomain;
pub use key::Key;
pub use mask::{MaskContext, MaskError};

/// Default progress bar style for CLI operations.
pub fn default_progress_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
        .unwrap()
        .progress_chars("#>-")
}
