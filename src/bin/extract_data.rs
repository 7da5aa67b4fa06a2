// Reads TC-centered domain files in NetCDF format, selects a fixed
// variable/level subset from each, and appends the records to monthly
// NumPy shard files for the training pipeline.

// USAGE: cargo run --release --bin extract_data -- --source <TC_domain> --workdir <out> [--force-rewrite]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tc_domain_to_npy::{default_selectors, run_extract, ExtractConfig, VarSelector, WindowSize};

/// Extract TC-centered NetCDF domains into monthly NumPy shards.
#[derive(Debug, Parser)]
#[command(name = "extract_data")]
struct Args {
    /// Root of the TC_domain tree from the domain-generation step.
    #[arg(long)]
    source: PathBuf,

    /// Working directory; shards land under exp_{n}features_{WxH}/monthly/.
    #[arg(long)]
    workdir: PathBuf,

    /// Window-size tag embedded in source filenames.
    #[arg(long, default_value = "18x18")]
    window: WindowSize,

    /// Feature layers as VAR:LEVEL, in output order. Defaults to the
    /// 13-layer U/V/T/RH(/SLP) subset at 850/950/750 hPa.
    #[arg(long, value_delimiter = ',')]
    vars: Option<Vec<VarSelector>>,

    /// Upper limit of acceptable NaN percentage in the primary-level band.
    #[arg(long, default_value_t = 5.0)]
    omit_percent: f64,

    /// Delete prior shards and rewrite the whole dataset.
    #[arg(long)]
    force_rewrite: bool,

    /// Skip the space/time metadata shard (legacy two-file layout).
    #[arg(long)]
    no_spacetime: bool,
}

fn main() -> Result<()> {
    let start = Local::now();
    println!("[{}] Starting extraction…", start.format("%Y-%m-%d %H:%M:%S"));

    let args = Args::parse();
    let cfg = ExtractConfig {
        source_root: args.source,
        work_dir: args.workdir,
        window: args.window,
        selectors: args.vars.unwrap_or_else(default_selectors),
        omit_percent: args.omit_percent,
        force_rewrite: args.force_rewrite,
        with_spacetime: !args.no_spacetime,
    };
    println!("Writing shards under {}", cfg.output_dir().display());

    let summary = run_extract(&cfg).context("extraction failed")?;

    let end = Local::now();
    println!(
        "[{}] Finished: {} processed, {} omitted. Total time: {}s",
        end.format("%Y-%m-%d %H:%M:%S"),
        summary.processed,
        summary.omitted,
        end.signed_duration_since(start).num_seconds()
    );
    Ok(())
}
