//! Launch dispatcher - drive reconstruction and evaluation over a domain.
//!
//! The domain is cut into launches no larger than one grid of blocks can
//! address. Launches run one after another; inside a launch every block runs
//! in parallel on a rayon pool and walks its thread slots, one index each.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::IterationDomain;
use crate::evaluate::{Evaluator, Hit, MatchOutcome};
use crate::mask::MaskContext;
use crate::output::Output;
use crate::reconstruct::reconstruct;

/// Threads per block and blocks per grid for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub block_size: u32,
    pub max_grid_blocks: u32,
}

impl LaunchGeometry {
    pub const DEFAULT_BLOCK_SIZE: u32 = 128;
    pub const DEFAULT_MAX_GRID_BLOCKS: u32 = 65_535;

    pub fn new(block_size: u32, max_grid_blocks: u32) -> Self {
        Self {
            block_size,
            max_grid_blocks,
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.block_size == 0 || self.max_grid_blocks == 0 {
            return Err(DispatchError::InvalidGeometry {
                block_size: self.block_size,
                max_grid_blocks: self.max_grid_blocks,
            });
        }
        Ok(())
    }

    /// Largest number of indices a single launch addresses.
    pub fn chunk_capacity(&self) -> u64 {
        self.block_size as u64 * self.max_grid_blocks as u64
    }

    /// Blocks needed to cover `len` indices.
    pub fn grid_for(&self, len: u64) -> u64 {
        len.div_ceil(self.block_size.max(1) as u64)
    }
}

impl Default for LaunchGeometry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE, Self::DEFAULT_MAX_GRID_BLOCKS)
    }
}

/// Errors that stop a search run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid launch geometry: block size {block_size}, max grid {max_grid_blocks} (both must be nonzero)")]
    InvalidGeometry { block_size: u32, max_grid_blocks: u32 },

    #[error("evaluation failed at index {index}")]
    Evaluation {
        index: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Write-once "stop" flag shared by all workers.
#[derive(Debug, Default)]
pub struct StopSignal(AtomicBool);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` for the caller that raised it first.
    pub fn raise(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary of a finished (or stopped) run.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub keys_checked: u64,
    pub ranges_launched: u64,
    pub matches_found: u64,
    pub first_hit: Option<Hit>,
    pub stopped_early: bool,
    pub timed_out: bool,
    pub saturated: bool,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn keys_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.keys_checked as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs a search over an iteration domain.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    geometry: LaunchGeometry,
    threads: usize,
    stop_on_match: bool,
    progress: bool,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(geometry: LaunchGeometry) -> Self {
        Self {
            geometry,
            threads: 0,
            stop_on_match: false,
            progress: false,
            timeout: None,
        }
    }

    /// Worker thread count; 0 lets rayon decide.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn stop_on_match(mut self, stop: bool) -> Self {
        self.stop_on_match = stop;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Wall-clock budget for the whole run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Visit every index of the domain window exactly once.
    ///
    /// Launches are issued in ascending order and each one completes before
    /// the next starts. An evaluator or output error aborts the run; with
    /// `stop_on_match` the first hit does too, and later hits are dropped.
    pub fn run(
        &self,
        ctx: &MaskContext,
        domain: &IterationDomain,
        evaluator: &dyn Evaluator,
        output: &dyn Output,
    ) -> Result<SearchReport, DispatchError> {
        self.geometry.validate()?;

        let started = Instant::now();
        let mut report = SearchReport {
            saturated: domain.is_saturated(),
            ..SearchReport::default()
        };

        if let Some(warning) = domain.saturation_warning() {
            warn!("{}", warning);
        }

        if domain.is_empty() {
            info!("iteration domain is empty, nothing to do");
            return Ok(report);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()?;

        let pb = if self.progress {
            let pb = ProgressBar::new(domain.len());
            pb.set_style(crate::default_progress_style());
            pb
        } else {
            ProgressBar::hidden()
        };

        let launch = Launch {
            ctx,
            evaluator,
            output,
            block_size: self.geometry.block_size as u64,
            stop_on_match: self.stop_on_match,
            deadline: self.timeout.map(|t| started + t),
            stop: StopSignal::new(),
            timed_out: AtomicBool::new(false),
            first_hit: OnceLock::new(),
            failure: OnceLock::new(),
            keys_checked: AtomicU64::new(0),
            matches: AtomicU64::new(0),
            pb,
        };

        info!(
            wildcards = ctx.wildcard_count(),
            keys = domain.len(),
            block_size = self.geometry.block_size,
            max_grid = self.geometry.max_grid_blocks,
            threads = pool.current_num_threads(),
            evaluator = evaluator.name(),
            "starting mask search"
        );

        for range in domain.ranges(self.geometry.chunk_capacity()) {
            if launch.halted() {
                break;
            }

            let grid = self.geometry.grid_for(range.end - range.start);
            debug!(start = range.start, end = range.end, grid, "launching range");

            pool.install(|| {
                (0..grid)
                    .into_par_iter()
                    .for_each(|block| launch.run_block(&range, block));
            });
            report.ranges_launched += 1;

            if launch.failure.get().is_some() {
                break;
            }
        }

        launch.pb.finish_and_clear();

        report.keys_checked = launch.keys_checked.load(Ordering::Relaxed);
        report.matches_found = launch.matches.load(Ordering::Relaxed);
        report.stopped_early = launch.stop.is_raised();
        report.timed_out = launch.timed_out.load(Ordering::Relaxed);
        report.elapsed = started.elapsed();

        if let Some((index, source)) = launch.failure.into_inner() {
            return Err(DispatchError::Evaluation {
                index,
                source: source.into(),
            });
        }
        report.first_hit = launch.first_hit.into_inner();

        if report.timed_out {
            warn!(keys = report.keys_checked, "time budget exhausted, search incomplete");
        }

        Ok(report)
    }
}

/// Shared state of one run, borrowed by every block.
struct Launch<'a> {
    ctx: &'a MaskContext,
    evaluator: &'a dyn Evaluator,
    output: &'a dyn Output,
    block_size: u64,
    stop_on_match: bool,
    deadline: Option<Instant>,
    stop: StopSignal,
    timed_out: AtomicBool,
    first_hit: OnceLock<Hit>,
    failure: OnceLock<(u64, anyhow::Error)>,
    keys_checked: AtomicU64,
    matches: AtomicU64,
    pb: ProgressBar,
}

impl Launch<'_> {
    fn halted(&self) -> bool {
        if self.stop.is_raised() || self.failure.get().is_some() {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn run_block(&self, range: &Range<u64>, block: u64) {
        if self.halted() {
            return;
        }

        // block < grid, so the first slot is always inside the range
        let base = range.start + block * self.block_size;
        let mut checked = 0u64;

        for thread in 0..self.block_size {
            let index = match base.checked_add(thread) {
                Some(index) if index < range.end => index,
                _ => break,
            };
            if self.stop.is_raised() || self.failure.get().is_some() {
                break;
            }

            let key = reconstruct(self.ctx, index);
            checked += 1;

            match self.evaluator.evaluate(&key) {
                Ok(MatchOutcome::Miss) => {}
                Ok(MatchOutcome::Hit(found)) => {
                    if let Err(e) = self.record_hit(Hit::new(index, key, *found)) {
                        self.fail(index, e);
                        break;
                    }
                }
                Err(e) => {
                    self.fail(index, e);
                    break;
                }
            }
        }

        self.keys_checked.fetch_add(checked, Ordering::Relaxed);
        self.pb.inc(checked);
    }

    fn record_hit(&self, hit: Hit) -> anyhow::Result<()> {
        if self.stop_on_match {
            // Only the first hit is kept and reported.
            if self.first_hit.set(hit.clone()).is_err() {
                return Ok(());
            }
            self.stop.raise();
        } else {
            let _ = self.first_hit.set(hit.clone());
        }

        info!(index = hit.index, target = %hit.info.address, "match found");
        self.matches.fetch_add(1, Ordering::Relaxed);
        self.output.hit(&hit)
    }

    fn fail(&self, index: u64, error: anyhow::Error) {
        if self.failure.set((index, error)).is_ok() {
            warn!(index, "evaluation failed, aborting remaining launches");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{DerivedKey, KeyDeriver};
    use crate::evaluate::Found;
    use crate::key::Key;
    use crate::matcher::{AddressType, MatchInfo};
    use anyhow::{anyhow, Result};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every key, hits on a fixed set of keys, optionally fails on one.
    #[derive(Default)]
    struct RecordingEvaluator {
        seen: Mutex<Vec<Key>>,
        hits: HashSet<Key>,
        fail_on: Option<Key>,
    }

    impl Evaluator for RecordingEvaluator {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn evaluate(&self, key: &Key) -> Result<MatchOutcome> {
            self.seen.lock().unwrap().push(*key);

            if self.fail_on == Some(*key) {
                return Err(anyhow!("device fault"));
            }
            if self.hits.contains(key) {
                let derived = KeyDeriver::new().derive(key);
                let info = MatchInfo {
                    address_type: AddressType::P2pkhCompressed,
                    address: derived.p2pkh_compressed.clone(),
                };
                return Ok(MatchOutcome::Hit(Box::new(Found { derived, info })));
            }
            Ok(MatchOutcome::Miss)
        }
    }

    #[derive(Default)]
    struct HitLog {
        indices: Mutex<Vec<u64>>,
    }

    impl Output for HitLog {
        fn key(&self, _derived: &DerivedKey) -> Result<()> {
            Ok(())
        }

        fn hit(&self, hit: &Hit) -> Result<()> {
            self.indices.lock().unwrap().push(hit.index);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    fn two_wildcards() -> (MaskContext, IterationDomain) {
        let ctx = MaskContext::compile(&format!("{}?{}?", "3".repeat(40), "0".repeat(22))).unwrap();
        let domain = IterationDomain::size(&ctx);
        (ctx, domain)
    }

    fn small_dispatcher() -> Dispatcher {
        Dispatcher::new(LaunchGeometry::new(4, 2)).with_threads(4)
    }

    #[test]
    fn test_geometry() {
        let g = LaunchGeometry::default();
        assert_eq!(g.chunk_capacity(), 128 * 65_535);
        assert_eq!(g.grid_for(1), 1);
        assert_eq!(g.grid_for(128), 1);
        assert_eq!(g.grid_for(129), 2);
        assert_eq!(g.grid_for(0), 0);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let (ctx, domain) = two_wildcards();
        let err = Dispatcher::new(LaunchGeometry::new(0, 10))
            .run(&ctx, &domain, &RecordingEvaluator::default(), &HitLog::default())
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidGeometry { block_size: 0, .. }));
    }

    #[test]
    fn test_visits_every_index_once() {
        let (ctx, domain) = two_wildcards();
        let evaluator = RecordingEvaluator::default();

        let report = small_dispatcher()
            .run(&ctx, &domain, &evaluator, &HitLog::default())
            .unwrap();

        assert_eq!(report.keys_checked, 256);
        assert_eq!(report.ranges_launched, 32);
        assert_eq!(report.matches_found, 0);
        assert!(!report.stopped_early);

        let seen = evaluator.seen.lock().unwrap();
        let unique: HashSet<Key> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 256);
        assert_eq!(unique.len(), 256);
        for index in 0..256 {
            assert!(unique.contains(&reconstruct(&ctx, index)));
        }
    }

    #[test]
    fn test_partial_last_block() {
        let (ctx, domain) = two_wildcards();
        let domain = domain.with_window(3, Some(14)).unwrap();
        let evaluator = RecordingEvaluator::default();

        let report = Dispatcher::new(LaunchGeometry::new(3, 2))
            .run(&ctx, &domain, &evaluator, &HitLog::default())
            .unwrap();

        assert_eq!(report.keys_checked, 11);
        assert_eq!(report.ranges_launched, 2);
        let seen: HashSet<Key> = evaluator.seen.lock().unwrap().iter().copied().collect();
        let expected: HashSet<Key> = (3..14).map(|i| reconstruct(&ctx, i)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_reports_all_hits_without_stop() {
        let (ctx, domain) = two_wildcards();
        let evaluator = RecordingEvaluator {
            hits: [7u64, 100, 255].iter().map(|&i| reconstruct(&ctx, i)).collect(),
            ..Default::default()
        };
        let output = HitLog::default();

        let report = small_dispatcher().run(&ctx, &domain, &evaluator, &output).unwrap();

        assert_eq!(report.matches_found, 3);
        assert_eq!(report.keys_checked, 256);
        assert!(report.first_hit.is_some());
        let mut indices = output.indices.lock().unwrap().clone();
        indices.sort_unstable();
        assert_eq!(indices, vec![7, 100, 255]);
    }

    #[test]
    fn test_stop_on_match_skips_remaining_ranges() {
        let (ctx, domain) = two_wildcards();
        let evaluator = RecordingEvaluator {
            hits: [9u64, 10, 200].iter().map(|&i| reconstruct(&ctx, i)).collect(),
            ..Default::default()
        };
        let output = HitLog::default();

        let report = small_dispatcher()
            .stop_on_match(true)
            .run(&ctx, &domain, &evaluator, &output)
            .unwrap();

        // Hits at 9 and 10 share the second launch (8..16); 200 is never reached.
        assert!(report.stopped_early);
        assert_eq!(report.matches_found, 1);
        assert_eq!(report.ranges_launched, 2);
        assert!(report.keys_checked <= 16);

        let first = report.first_hit.unwrap();
        assert!(first.index == 9 || first.index == 10);
        assert_eq!(*output.indices.lock().unwrap(), vec![first.index]);
    }

    #[test]
    fn test_evaluation_error_aborts() {
        let (ctx, domain) = two_wildcards();
        let evaluator = RecordingEvaluator {
            fail_on: Some(reconstruct(&ctx, 12)),
            ..Default::default()
        };

        let err = small_dispatcher()
            .run(&ctx, &domain, &evaluator, &HitLog::default())
            .unwrap_err();

        match err {
            DispatchError::Evaluation { index, source } => {
                assert_eq!(index, 12);
                assert_eq!(source.to_string(), "device fault");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(evaluator.seen.lock().unwrap().len() <= 16);
    }

    #[test]
    fn test_empty_domain() {
        let (ctx, domain) = two_wildcards();
        let domain = domain.with_window(256, None).unwrap();
        let evaluator = RecordingEvaluator::default();

        let report = small_dispatcher()
            .run(&ctx, &domain, &evaluator, &HitLog::default())
            .unwrap();

        assert_eq!(report.keys_checked, 0);
        assert_eq!(report.ranges_launched, 0);
        assert!(evaluator.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_timeout_does_no_work() {
        let (ctx, domain) = two_wildcards();
        let evaluator = RecordingEvaluator::default();

        let report = small_dispatcher()
            .with_timeout(Duration::ZERO)
            .run(&ctx, &domain, &evaluator, &HitLog::default())
            .unwrap();

        assert!(report.timed_out);
        assert_eq!(report.keys_checked, 0);
    }

    #[test]
    fn test_stop_signal_first_raiser() {
        let signal = StopSignal::new();
        assert!(!signal.is_raised());
        assert!(signal.raise());
        assert!(!signal.raise());
        assert!(signal.is_raised());
    }
}
