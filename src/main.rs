//! maskhunt - search a masked private keyspace for target addresses.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maskhunt::config::{DispatchArgs, SearchConfig};
use maskhunt::derive::KeyDeriver;
use maskhunt::dispatch::SearchReport;
use maskhunt::evaluate::{ListingEvaluator, TargetEvaluator};
use maskhunt::matcher::Matcher;
use maskhunt::network::parse_network;
use maskhunt::output::{ConsoleOutput, MultiOutput, Output};
use maskhunt::{IterationDomain, Key, MaskContext};

#[derive(Parser)]
#[command(name = "maskhunt")]
#[command(about = "Enumerate a hex/wildcard private key mask and match derived addresses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Network (bitcoin, testnet, signet, regtest)
    #[arg(long, global = true, default_value = "bitcoin")]
    network: String,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the mask keyspace for target addresses or HASH160 values
    Scan {
        /// 64-char hex mask, `?` marks unknown nibbles
        #[arg(short, long)]
        mask: Option<String>,

        /// Target file (one address or 40-char HASH160 per line)
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Stop at the first match
        #[arg(long)]
        stop_on_match: bool,

        /// Also write hits to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        dispatch: DispatchArgs,
    },

    /// Output every key of the mask keyspace (no matching)
    Generate {
        /// 64-char hex mask, `?` marks unknown nibbles
        #[arg(short, long)]
        mask: String,

        /// Verbose output (show all key formats)
        #[arg(short, long)]
        verbose: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        dispatch: DispatchArgs,
    },

    /// Show how a mask maps onto the iteration counter
    Info {
        #[arg(short, long)]
        mask: String,
    },

    /// Print the iteration index at which a key is enumerated
    Locate {
        #[arg(short, long)]
        mask: String,

        /// Private key (64 hex chars)
        #[arg(long)]
        key: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let network = parse_network(&cli.network);

    match cli.command {
        Command::Scan {
            mask,
            targets,
            stop_on_match,
            output,
            dispatch,
        } => {
            let (mask, targets) = scan_inputs(mask, targets)?;
            let config = SearchConfig::from_args(mask, &dispatch, network).stop_on_match(stop_on_match);

            // Hits always reach stdout; --output keeps a copy on disk.
            let out: Box<dyn Output> = match output {
                Some(path) => Box::new(MultiOutput::new(vec![
                    Box::new(ConsoleOutput::new()),
                    Box::new(ConsoleOutput::to_file(&path)?),
                ])),
                None => Box::new(ConsoleOutput::new()),
            };
            run_scan(&config, targets, out.as_ref())
        }

        Command::Generate {
            mask,
            verbose,
            output,
            dispatch,
        } => {
            let config = SearchConfig::from_args(mask, &dispatch, network);

            let out: Box<dyn Output> = match (output, verbose) {
                (Some(path), true) => Box::new(ConsoleOutput::to_file_verbose(&path)?),
                (Some(path), false) => Box::new(ConsoleOutput::to_file(&path)?),
                (None, true) => Box::new(ConsoleOutput::verbose()),
                (None, false) => Box::new(ConsoleOutput::new()),
            };
            run_generate(&config, out.as_ref())
        }

        Command::Info { mask } => run_info(&mask),

        Command::Locate { mask, key } => run_locate(&mask, &key),
    }
}

/// Mask is checked first: without one there is nothing to scan.
fn scan_inputs(mask: Option<String>, targets: Option<PathBuf>) -> Result<(String, PathBuf)> {
    let Some(mask) = mask else {
        bail!("linear range mode is not supported; pass a key mask with -m/--mask");
    };
    let Some(targets) = targets else {
        bail!("scan needs a target file; pass --targets");
    };
    Ok((mask, targets))
}

fn run_scan(config: &SearchConfig, targets: PathBuf, output: &dyn Output) -> Result<()> {
    let (ctx, domain) = config.prepare()?;

    info!(path = %targets.display(), "loading targets");
    let matcher = Matcher::load(&targets)?;
    if matcher.is_empty() {
        bail!("no targets in {}", targets.display());
    }
    info!(count = matcher.count(), "targets loaded");

    let evaluator = TargetEvaluator::new(KeyDeriver::with_network(config.network), matcher);
    let report = config.dispatcher().run(&ctx, &domain, &evaluator, output)?;
    output.flush()?;

    log_report(&report);
    Ok(())
}

fn run_generate(config: &SearchConfig, output: &dyn Output) -> Result<()> {
    let (ctx, domain) = config.prepare()?;

    let evaluator = ListingEvaluator::new(KeyDeriver::with_network(config.network), output);
    let report = config.dispatcher().run(&ctx, &domain, &evaluator, output)?;
    output.flush()?;

    log_report(&report);
    Ok(())
}

fn run_info(mask: &str) -> Result<()> {
    let ctx = MaskContext::compile(mask).context("invalid mask")?;
    let domain = IterationDomain::size(&ctx);

    println!("Mask:        {}", ctx);
    println!("Fixed key:   {}", ctx.fixed_key());
    println!("Wildcards:   {}", ctx.wildcard_count());
    println!("Positions:   {:?}", ctx.wildcard_positions());
    println!("Candidates:  {}", domain.total());
    println!("Saturated:   {}", domain.is_saturated());
    if let Some(warning) = domain.saturation_warning() {
        println!("Warning:     {}", warning);
    }

    Ok(())
}

fn run_locate(mask: &str, key: &str) -> Result<()> {
    let ctx = MaskContext::compile(mask).context("invalid mask")?;
    let key: Key = key.parse().context("invalid key")?;

    match ctx.index_of(&key) {
        Some(index) => println!("{}", index),
        None => bail!("key {} is not enumerated by mask {}", key, ctx),
    }

    Ok(())
}

fn log_report(report: &SearchReport) {
    info!(
        keys = report.keys_checked,
        ranges = report.ranges_launched,
        matches = report.matches_found,
        stopped_early = report.stopped_early,
        timed_out = report.timed_out,
        elapsed_secs = report.elapsed.as_secs_f64(),
        keys_per_sec = report.keys_per_sec() as u64,
        "done"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_without_mask_reports_linear_mode() {
        let cli = Cli::try_parse_from(["maskhunt", "scan"]).unwrap();
        let Command::Scan { mask, targets, .. } = cli.command else {
            panic!("expected scan");
        };

        let err = scan_inputs(mask, targets).unwrap_err();
        assert!(err.to_string().contains("linear range mode is not supported"));
    }

    #[test]
    fn test_scan_requires_targets_with_mask() {
        let mask = format!("{}??", "0".repeat(62));
        let cli = Cli::try_parse_from(["maskhunt", "scan", "-m", mask.as_str()]).unwrap();
        let Command::Scan { mask: parsed, targets, .. } = cli.command else {
            panic!("expected scan");
        };

        let err = scan_inputs(parsed, targets).unwrap_err();
        assert!(err.to_string().contains("--targets"));

        let (mask, targets) = scan_inputs(Some(mask), Some(PathBuf::from("targets.txt"))).unwrap();
        assert_eq!(mask.len(), 64);
        assert_eq!(targets, PathBuf::from("targets.txt"));
    }
}
