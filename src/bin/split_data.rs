// Shuffle-splits every monthly shard triple into train/test partitions,
// writes the per-month test files, and merges the training remainders
// into one globally shuffled set.

// USAGE: cargo run --release --bin split_data -- --workdir <out> [ratio]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tc_domain_to_npy::{run_split, Naming, SplitConfig, WindowSize};

/// Split monthly NumPy shards into train/test sets.
#[derive(Debug, Parser)]
#[command(name = "split_data")]
struct Args {
    /// Test percentage carved out of every month.
    #[arg(default_value_t = 20)]
    ratio: u32,

    /// Working directory used by the extraction step.
    #[arg(long)]
    workdir: PathBuf,

    /// Window-size tag of the dataset to split.
    #[arg(long, default_value = "18x18")]
    window: WindowSize,

    /// Layer count encoded in the shard prefixes.
    #[arg(long, default_value_t = 13)]
    var_num: usize,

    /// Suffix on feature shard names from the upstream NaN-fix step.
    /// Pass an empty string to split raw extractor output.
    #[arg(long, default_value = "fixed")]
    suffix: String,

    /// Shuffle seed; a fixed seed makes the split reproducible.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    let start = Local::now();
    println!("[{}] Starting split…", start.format("%Y-%m-%d %H:%M:%S"));

    let args = Args::parse();
    let data_dir = args
        .workdir
        .join(format!("exp_{}features_{}", args.var_num, args.window.tag()))
        .join("monthly");
    let cfg = SplitConfig {
        data_dir,
        naming: Naming { var_num: args.var_num, window: args.window },
        feature_suffix: args.suffix,
        test_percentage: args.ratio,
        seed: args.seed,
    };

    let summary = run_split(&cfg).context("split failed")?;

    let end = Local::now();
    println!(
        "[{}] Finished: {} months, {} test / {} train records. Total time: {}s",
        end.format("%Y-%m-%d %H:%M:%S"),
        summary.months.len(),
        summary.test_records,
        summary.train_records,
        end.signed_duration_since(start).num_seconds()
    );
    Ok(())
}
