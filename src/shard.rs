//! Monthly shard triples and the single logical append over them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ndarray::Array3;

use crate::config::Naming;
use crate::error::Result;
use crate::npy;

/// Composite handle over one run's monthly shard files: features, labels,
/// and (richer variant) spacetime metadata. Record `i` across the triple
/// describes the same source file; positional alignment is the only
/// linkage.
pub struct ShardSet {
    dir: PathBuf,
    features: String,
    labels: String,
    spacetime: Option<String>,
}

impl ShardSet {
    pub fn new(dir: &Path, naming: &Naming, with_spacetime: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            features: naming.features_prefix(),
            labels: naming.labels_prefix(),
            spacetime: with_spacetime.then(|| naming.spacetime_prefix()),
        }
    }

    fn path(&self, prefix: &str, month: &str) -> PathBuf {
        self.dir.join(format!("{prefix}{month}.npy"))
    }

    pub fn feature_path(&self, month: &str) -> PathBuf {
        self.path(&self.features, month)
    }

    pub fn label_path(&self, month: &str) -> PathBuf {
        self.path(&self.labels, month)
    }

    pub fn spacetime_path(&self, month: &str) -> Option<PathBuf> {
        self.spacetime.as_ref().map(|p| self.path(p, month))
    }

    /// Best-effort removal of all twelve months of prior shard output.
    /// Every failure category is non-fatal and logged.
    pub fn cold_delete_all(&self) {
        for m in 1..=12u32 {
            let month = format!("{m:02}");
            cold_delete(&self.path(&self.features, &month));
            cold_delete(&self.path(&self.labels, &month));
            if let Some(st) = &self.spacetime {
                cold_delete(&self.path(st, &month));
            }
        }
    }

    /// Append one record to the month's shard triple, creating files as
    /// needed. The appends run in sequence with no rollback: a failure
    /// part-way leaves the month permanently misaligned, and the only
    /// recovery is a cold-start rerun.
    pub fn append_record(
        &self,
        month: &str,
        features: &Array3<f32>,
        labels: &[f64; 3],
        spacetime: Option<&[f64; 4]>,
    ) -> Result<()> {
        let (l, h, w) = features.dim();
        let flat: Vec<f32> = features.iter().copied().collect();
        npy::append_records(&self.path(&self.features, month), &[1, l, h, w], &flat)?;
        npy::append_records(&self.path(&self.labels, month), &[1, 3], labels)?;
        if let (Some(st), Some(vals)) = (&self.spacetime, spacetime) {
            npy::append_records(&self.path(st, month), &[1, 4], vals)?;
        }
        Ok(())
    }
}

fn cold_delete(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => println!("File {} has been removed.", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            println!("File {} does not exist.", path.display());
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            println!("No permission to remove {}.", path.display());
        }
        Err(e) => println!("Could not remove {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowSize;
    use crate::npy::record_count;
    use ndarray::Array3;

    fn naming() -> Naming {
        Naming { var_num: 2, window: WindowSize { width: 2, height: 2 } }
    }

    #[test]
    fn triple_stays_aligned_after_every_append() {
        let dir = tempfile::tempdir().unwrap();
        let shards = ShardSet::new(dir.path(), &naming(), true);
        let features = Array3::from_shape_fn((2, 2, 2), |(l, y, x)| (l * 4 + y * 2 + x) as f32);
        for i in 0..3 {
            shards
                .append_record("07", &features, &[100.0 + i as f64, 950.0, 20.0], Some(&[0.5, 0.8, 15.0, -40.0]))
                .unwrap();
            let n = record_count(&shards.feature_path("07")).unwrap();
            assert_eq!(n, i + 1);
            assert_eq!(record_count(&shards.label_path("07")).unwrap(), n);
            assert_eq!(
                record_count(&shards.spacetime_path("07").unwrap()).unwrap(),
                n
            );
        }
    }

    #[test]
    fn basic_variant_writes_no_spacetime() {
        let dir = tempfile::tempdir().unwrap();
        let shards = ShardSet::new(dir.path(), &naming(), false);
        let features = Array3::zeros((2, 2, 2));
        shards.append_record("01", &features, &[1.0, 2.0, 3.0], None).unwrap();
        assert!(shards.feature_path("01").exists());
        assert!(shards.label_path("01").exists());
        assert!(shards.spacetime_path("01").is_none());
    }

    #[test]
    fn cold_delete_tolerates_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let shards = ShardSet::new(dir.path(), &naming(), true);
        // nothing written yet; must not panic or error
        shards.cold_delete_all();
    }
}
