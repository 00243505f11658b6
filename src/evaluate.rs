//! Evaluation capability - what happens to each reconstructed key.
//!
//! The dispatcher only knows the [`Evaluator`] trait; curve arithmetic,
//! hashing and target comparison live behind it.

use anyhow::Result;

use crate::derive::{DerivedKey, KeyDeriver};
use crate::key::Key;
use crate::matcher::{MatchInfo, Matcher};
use crate::output::Output;

/// Result of evaluating one candidate.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Miss,
    Hit(Box<Found>),
}

impl MatchOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, MatchOutcome::Hit(_))
    }
}

/// Derived material of a matching key plus what it matched.
#[derive(Debug, Clone)]
pub struct Found {
    pub derived: DerivedKey,
    pub info: MatchInfo,
}

/// A match located in the iteration domain.
#[derive(Debug, Clone)]
pub struct Hit {
    pub index: u64,
    pub key: Key,
    pub derived: DerivedKey,
    pub info: MatchInfo,
}

impl Hit {
    pub fn new(index: u64, key: Key, found: Found) -> Self {
        Self {
            index,
            key,
            derived: found.derived,
            info: found.info,
        }
    }
}

/// Turns a candidate private key into a match decision.
///
/// Called concurrently from many workers; an `Err` is fatal to the run.
pub trait Evaluator: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    fn evaluate(&self, key: &Key) -> Result<MatchOutcome>;
}

/// Derives addresses and fingerprints and checks them against a target set.
pub struct TargetEvaluator {
    deriver: KeyDeriver,
    matcher: Matcher,
}

impl TargetEvaluator {
    pub fn new(deriver: KeyDeriver, matcher: Matcher) -> Self {
        Self { deriver, matcher }
    }
}

impl Evaluator for TargetEvaluator {
    fn name(&self) -> &'static str {
        "targets"
    }

    fn evaluate(&self, key: &Key) -> Result<MatchOutcome> {
        let derived = self.deriver.derive(key);
        Ok(match self.matcher.check(&derived) {
            Some(info) => MatchOutcome::Hit(Box::new(Found { derived, info })),
            None => MatchOutcome::Miss,
        })
    }
}

/// Writes every candidate to an output and never matches.
pub struct ListingEvaluator<'a> {
    deriver: KeyDeriver,
    output: &'a dyn Output,
}

impl<'a> ListingEvaluator<'a> {
    pub fn new(deriver: KeyDeriver, output: &'a dyn Output) -> Self {
        Self { deriver, output }
    }
}

impl Evaluator for ListingEvaluator<'_> {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn evaluate(&self, key: &Key) -> Result<MatchOutcome> {
        let derived = self.deriver.derive(key);
        self.output.key(&derived)?;
        Ok(MatchOutcome::Miss)
    }
}
