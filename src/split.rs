//! Splitter pipeline: monthly shard triples → per-month test sets plus
//! one merged, globally shuffled training set.
//!
//! Unlike the extractor this loads each month whole, and ultimately the
//! entire training remainder, into memory; its ceiling is RAM, not disk.

use std::path::PathBuf;

use ndarray::{concatenate, s, Array2, Array4, ArrayView, Axis, Dimension};
use ndarray_npy::{read_npy, write_npy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::SplitConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub months: Vec<String>,
    pub test_records: usize,
    pub train_records: usize,
    pub with_spacetime: bool,
}

struct MonthShard {
    features: Array4<f32>,
    labels: Array2<f64>,
    spacetime: Option<Array2<f64>>,
}

/// Split every month's shard triple and merge the training remainders.
///
/// Per-month test files and the merged training files are regenerated
/// (overwritten by name) on every invocation; the monthly inputs are
/// never mutated.
pub fn run_split(cfg: &SplitConfig) -> Result<SplitSummary> {
    let months = discover_months(cfg)?;
    if months.is_empty() {
        return Err(Error::NoShards {
            dir: cfg.data_dir.clone(),
            prefix: cfg.naming.features_prefix(),
            suffix: cfg.feature_suffix.clone(),
        });
    }

    let pct = cfg.test_percentage;
    let mut train_x: Vec<Array4<f32>> = Vec::new();
    let mut train_y: Vec<Array2<f64>> = Vec::new();
    let mut train_z: Vec<Array2<f64>> = Vec::new();
    let mut with_spacetime: Option<bool> = None;
    let mut test_records = 0usize;

    for month in &months {
        let shard = load_month(cfg, month)?;
        match with_spacetime {
            None => with_spacetime = Some(shard.spacetime.is_some()),
            Some(mode) if mode != shard.spacetime.is_some() => {
                return Err(Error::MixedSpacetime { month: month.clone() })
            }
            Some(_) => {}
        }

        let n = shard.features.shape()[0];
        let order = permutation(n, cfg.seed);
        let features = shard.features.select(Axis(0), &order);
        let labels = shard.labels.select(Axis(0), &order);
        let spacetime = shard.spacetime.map(|z| z.select(Axis(0), &order));

        let split_idx = n * pct as usize / 100;
        let sig = cfg.naming.signature(month);
        write_npy(
            cfg.data_dir.join(format!("testx_{pct}%_{sig}.npy")),
            // .to_owned() sidesteps an ndarray-npy panic on empty views
            &features.slice(s![..split_idx, .., .., ..]).to_owned(),
        )?;
        write_npy(
            cfg.data_dir.join(format!("testy_{pct}%_{sig}.npy")),
            &labels.slice(s![..split_idx, ..]).to_owned(),
        )?;
        if let Some(z) = &spacetime {
            write_npy(
                cfg.data_dir.join(format!("testz_{pct}%_{sig}.npy")),
                &z.slice(s![..split_idx, ..]).to_owned(),
            )?;
        }
        test_records += split_idx;

        train_x.push(features.slice(s![split_idx.., .., .., ..]).to_owned());
        train_y.push(labels.slice(s![split_idx.., ..]).to_owned());
        if let Some(z) = spacetime {
            train_z.push(z.slice(s![split_idx.., ..]).to_owned());
        }
    }

    let features = concat_all(&train_x)?;
    let labels = concat_all(&train_y)?;
    let spacetime = if with_spacetime.unwrap_or(false) {
        Some(concat_all(&train_z)?)
    } else {
        None
    };

    // one fresh permutation over the whole concatenation
    let total = features.shape()[0];
    let order = permutation(total, cfg.seed.wrapping_add(1));
    let features = features.select(Axis(0), &order);
    let labels = labels.select(Axis(0), &order);
    let spacetime = spacetime.map(|z| z.select(Axis(0), &order));

    write_npy(cfg.data_dir.join(format!("merged_train_features{pct}.npy")), &features)?;
    write_npy(cfg.data_dir.join(format!("merged_train_labels{pct}.npy")), &labels)?;
    if let Some(z) = &spacetime {
        write_npy(cfg.data_dir.join(format!("merged_train_spacetime{pct}.npy")), z)?;
    }

    println!(
        "Split {} months: {} test records, {} merged training records.",
        months.len(),
        test_records,
        total
    );
    Ok(SplitSummary {
        months,
        test_records,
        train_records: total,
        with_spacetime: with_spacetime.unwrap_or(false),
    })
}

/// Months with a feature shard named `{prefix}{MM}{suffix}.npy`, sorted.
fn discover_months(cfg: &SplitConfig) -> Result<Vec<String>> {
    let prefix = cfg.naming.features_prefix();
    let tail = format!("{}.npy", cfg.feature_suffix);
    let mut months = Vec::new();
    for entry in std::fs::read_dir(&cfg.data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let Some(month) = rest.strip_suffix(tail.as_str()) else {
            continue;
        };
        if month.len() == 2 && month.bytes().all(|b| b.is_ascii_digit()) {
            months.push(month.to_string());
        }
    }
    months.sort();
    Ok(months)
}

fn month_paths(cfg: &SplitConfig, month: &str) -> (PathBuf, PathBuf, PathBuf) {
    let dir = &cfg.data_dir;
    (
        dir.join(format!(
            "{}{}{}.npy",
            cfg.naming.features_prefix(),
            month,
            cfg.feature_suffix
        )),
        dir.join(format!("{}{}.npy", cfg.naming.labels_prefix(), month)),
        dir.join(format!("{}{}.npy", cfg.naming.spacetime_prefix(), month)),
    )
}

fn load_month(cfg: &SplitConfig, month: &str) -> Result<MonthShard> {
    let (fpath, lpath, zpath) = month_paths(cfg, month);
    let features: Array4<f32> = read_npy(fpath)?;
    let labels: Array2<f64> = read_npy(lpath)?;
    let spacetime = if zpath.exists() {
        let z: Array2<f64> = read_npy(zpath)?;
        Some(z)
    } else {
        None
    };

    let n = features.shape()[0];
    let aligned = labels.shape()[0] == n
        && spacetime.as_ref().map_or(true, |z| z.shape()[0] == n);
    if !aligned {
        return Err(Error::ShardMisaligned {
            month: month.to_string(),
            features: n,
            labels: labels.shape()[0],
            spacetime: spacetime.as_ref().map(|z| z.shape()[0]),
        });
    }
    Ok(MonthShard { features, labels, spacetime })
}

fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

fn concat_all<A, D>(parts: &[ndarray::Array<A, D>]) -> Result<ndarray::Array<A, D>>
where
    A: Clone,
    D: Dimension + ndarray::RemoveAxis,
{
    let views: Vec<ArrayView<'_, A, D>> = parts.iter().map(|a| a.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_is_seed_deterministic() {
        assert_eq!(permutation(10, 0), permutation(10, 0));
        assert_ne!(permutation(100, 0), permutation(100, 1));
        let p = permutation(10, 7);
        let mut sorted = p.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }
}
