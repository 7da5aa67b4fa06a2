//! Extractor pipeline: NetCDF domain tree → monthly `.npy` shards.
//!
//! Strictly sequential and single-pass; at most one record lives in
//! memory at a time, which is what lets a full reanalysis archive stream
//! through without materializing.

use ndarray::{s, Array3};

use crate::config::ExtractConfig;
use crate::dates::cyclic_day_of_year;
use crate::decode::DomainFile;
use crate::error::{Error, Result};
use crate::filename::parse_tagged_name;
use crate::shard::ShardSet;

/// Final counters; `processed` includes the omitted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub processed: u64,
    pub omitted: u64,
}

/// Run the extraction end to end.
///
/// A decode failure, missing selector, or malformed tagged filename is
/// fatal; the admission filter is the only per-record skip path.
pub fn run_extract(cfg: &ExtractConfig) -> Result<ExtractSummary> {
    if !cfg.source_root.exists() {
        return Err(Error::SourceMissing(cfg.source_root.clone()));
    }
    let outdir = cfg.output_dir();
    if output_populated(&outdir)? {
        if cfg.force_rewrite {
            println!("Force rewrite is on, rewriting the whole dataset.");
        } else {
            return Err(Error::OutputAlreadyPopulated(outdir));
        }
    }
    std::fs::create_dir_all(&outdir)?;

    let naming = cfg.naming();
    let shards = ShardSet::new(&outdir, &naming, cfg.with_spacetime);
    let tag = cfg.window.tag();
    let mut processed: u64 = 0;
    let mut omitted: u64 = 0;
    let mut first = true;

    let pattern = format!("{}/**/*.nc", cfg.source_root.display());
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stamp) = parse_tagged_name(name, &tag)? else {
            continue;
        };
        if first {
            // clear prior shards before the first append of a rewrite run
            if cfg.force_rewrite {
                shards.cold_delete_all();
            }
            first = false;
        }

        let file = DomainFile::open(&path)?;
        let features = stack_features(&file, cfg)?;
        if primary_nan_ratio(&features) > cfg.omit_percent / 100.0 {
            processed += 1;
            omitted += 1;
            if processed % 1000 == 0 {
                progress(processed, omitted);
            }
            continue;
        }

        let labels = [
            file.scalar("VMAX")?,
            file.scalar("PMIN")?,
            file.scalar("RMW")?,
        ]; // knots, mb, nmile
        let spacetime = if cfg.with_spacetime {
            let (sin_day, cos_day) = cyclic_day_of_year(stamp.date);
            Some([sin_day, cos_day, file.scalar("CLAT")?, file.scalar("CLON")?])
        } else {
            None
        };
        shards.append_record(&stamp.month, &features, &labels, spacetime.as_ref())?;

        processed += 1;
        if processed % 1000 == 0 {
            progress(processed, omitted);
        }
    }

    println!("Total {processed} files processed.");
    println!("With {omitted} files omitted due to NaNs.");
    Ok(ExtractSummary { processed, omitted })
}

fn progress(processed: u64, omitted: u64) {
    println!("{processed} files processed.");
    println!("{omitted} files omitted due to NaNs.");
}

fn output_populated(outdir: &std::path::Path) -> Result<bool> {
    let entries = match std::fs::read_dir(outdir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        if entry?.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stack the selector grids, in order, into a `[L, H, W]` tensor. All
/// layers must share one grid shape; the flat shard format cannot carry a
/// per-record schema.
fn stack_features(file: &DomainFile, cfg: &ExtractConfig) -> Result<Array3<f32>> {
    let mut layers = Vec::with_capacity(cfg.selectors.len());
    let mut dims: Option<(usize, usize)> = None;
    for sel in &cfg.selectors {
        let grid = file.grid(&sel.name, sel.level)?;
        let d = grid.dim();
        match dims {
            None => dims = Some(d),
            Some(want) if want != d => {
                return Err(Error::GridShape {
                    var: sel.name.clone(),
                    level: sel.level,
                    got: vec![d.0, d.1],
                    want: vec![want.0, want.1],
                })
            }
            Some(_) => {}
        }
        layers.push(grid);
    }
    let (h, w) = dims.unwrap_or((0, 0));
    let mut data = Vec::with_capacity(layers.len() * h * w);
    for layer in &layers {
        data.extend(layer.iter().copied());
    }
    Ok(Array3::from_shape_vec((layers.len(), h, w), data)?)
}

/// Missing-data ratio over the first four layers (the primary-level band).
/// The divisor is a flat 4 regardless of how many layers exist, matching
/// the admission convention the downstream consumers were trained with.
fn primary_nan_ratio(features: &Array3<f32>) -> f64 {
    let (l, h, w) = features.dim();
    let cells = h * w;
    if cells == 0 {
        return 0.0;
    }
    let nans = features
        .slice(s![..l.min(4), .., ..])
        .iter()
        .filter(|v| v.is_nan())
        .count();
    nans as f64 / 4.0 / cells as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn nan_ratio_counts_only_the_first_four_layers() {
        let mut features = Array3::<f32>::zeros((6, 2, 2));
        features[[4, 0, 0]] = f32::NAN;
        features[[5, 1, 1]] = f32::NAN;
        assert_eq!(primary_nan_ratio(&features), 0.0);
        features[[0, 0, 0]] = f32::NAN;
        assert_eq!(primary_nan_ratio(&features), 1.0 / 4.0 / 4.0);
    }

    #[test]
    fn admission_is_strict_greater_than() {
        // 4 layers of 4x4: denominator is 4 * 16 = 64 positions
        let mut features = Array3::<f32>::zeros((4, 4, 4));
        for i in 0..16 {
            features[[0, i / 4, i % 4]] = f32::NAN;
        }
        let threshold = 25.0 / 100.0;
        // exactly at the threshold: admitted
        assert!(primary_nan_ratio(&features) <= threshold);
        features[[1, 0, 0]] = f32::NAN;
        // epsilon above: rejected
        assert!(primary_nan_ratio(&features) > threshold);
    }
}
