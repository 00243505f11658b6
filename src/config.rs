//! Search configuration collected from the command line.

use anyhow::{Context, Result};
use bitcoin::Network;
use std::time::Duration;

use crate::dispatch::{Dispatcher, LaunchGeometry};
use crate::domain::IterationDomain;
use crate::mask::MaskContext;

/// Dispatch flags shared by the search commands.
#[derive(clap::Args, Debug, Clone)]
pub struct DispatchArgs {
    /// Threads per block (indices walked by one work item)
    #[arg(long, default_value_t = LaunchGeometry::DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,

    /// Maximum blocks per launch
    #[arg(long, default_value_t = LaunchGeometry::DEFAULT_MAX_GRID_BLOCKS)]
    pub max_grid: u32,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// First iteration index to visit
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    /// Stop before this iteration index (default: end of keyspace)
    #[arg(long)]
    pub end: Option<u64>,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Everything needed to run one mask search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub mask: String,
    pub geometry: LaunchGeometry,
    pub threads: usize,
    pub start: u64,
    pub end: Option<u64>,
    pub timeout: Option<Duration>,
    pub stop_on_match: bool,
    pub progress: bool,
    pub network: Network,
}

impl SearchConfig {
    pub fn new(mask: impl Into<String>) -> Self {
        Self {
            mask: mask.into(),
            geometry: LaunchGeometry::default(),
            threads: 0,
            start: 0,
            end: None,
            timeout: None,
            stop_on_match: false,
            progress: true,
            network: Network::Bitcoin,
        }
    }

    pub fn from_args(mask: impl Into<String>, args: &DispatchArgs, network: Network) -> Self {
        Self {
            geometry: LaunchGeometry::new(args.block_size, args.max_grid),
            threads: args.threads,
            start: args.start,
            end: args.end,
            timeout: args.timeout_secs.map(Duration::from_secs),
            progress: !args.no_progress,
            network,
            ..Self::new(mask)
        }
    }

    pub fn stop_on_match(mut self, stop: bool) -> Self {
        self.stop_on_match = stop;
        self
    }

    /// Compile the mask and size its domain; fails before any work starts.
    pub fn prepare(&self) -> Result<(MaskContext, IterationDomain)> {
        self.geometry.validate()?;

        let ctx = MaskContext::compile(&self.mask).context("invalid mask")?;
        let domain = IterationDomain::size(&ctx)
            .with_window(self.start, self.end)
            .context("invalid index window")?;

        Ok((ctx, domain))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        let dispatcher = Dispatcher::new(self.geometry)
            .with_threads(self.threads)
            .stop_on_match(self.stop_on_match)
            .with_progress(self.progress);

        match self.timeout {
            Some(timeout) => dispatcher.with_timeout(timeout),
            None => dispatcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::MaskError;

    #[test]
    fn test_prepare_valid_mask() {
        let mut config = SearchConfig::new(format!("{}??", "0".repeat(62)));
        config.start = 16;

        let (ctx, domain) = config.prepare().unwrap();
        assert_eq!(ctx.wildcard_count(), 2);
        assert_eq!(domain.window(), 16..256);
    }

    #[test]
    fn test_prepare_reports_mask_error() {
        let err = SearchConfig::new("abc").prepare().unwrap_err();

        assert!(err.to_string().contains("invalid mask"));
        assert!(matches!(
            err.downcast_ref::<MaskError>(),
            Some(MaskError::InvalidLength { actual: 3, .. })
        ));
    }

    #[test]
    fn test_prepare_rejects_zero_block_size() {
        let mut config = SearchConfig::new("0".repeat(64));
        config.geometry = LaunchGeometry::new(0, 1);
        assert!(config.prepare().is_err());
    }

    #[test]
    fn test_from_args() {
        let args = DispatchArgs {
            block_size: 64,
            max_grid: 8,
            threads: 2,
            start: 5,
            end: Some(50),
            timeout_secs: Some(30),
            no_progress: true,
        };
        let config = SearchConfig::from_args("0".repeat(64), &args, Network::Testnet);

        assert_eq!(config.geometry.chunk_capacity(), 512);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(!config.progress);
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.end, Some(50));
    }
}
