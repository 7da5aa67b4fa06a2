//! Thin wrapper over the NetCDF collaborator: (variable, level) lookup
//! returning a dense 2-D grid, plus named scalar attributes. Decode
//! correctness is the upstream domain-generation step's problem.

use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{Error, Result};

/// One opened TC-centered domain file.
pub struct DomainFile {
    file: netcdf::File,
    path: PathBuf,
}

impl DomainFile {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: netcdf::open(path)?,
            path: path.to_path_buf(),
        })
    }

    /// Dense 2-D grid of `var` at `level` hPa. A variable carrying a
    /// leading level dimension is sliced at the matching `lev` index; a
    /// plain 2-D variable is taken whole.
    pub fn grid(&self, var: &str, level: i32) -> Result<Array2<f32>> {
        let v = self.file.variable(var).ok_or_else(|| Error::MissingVariable {
            var: var.to_string(),
            path: self.path.clone(),
        })?;
        let dims: Vec<usize> = v.dimensions().iter().map(|d| d.len()).collect();
        match dims.as_slice() {
            [h, w] => {
                let vals = v.get_values::<f32, _>(..)?;
                Ok(Array2::from_shape_vec((*h, *w), vals)?)
            }
            [_, h, w] => {
                let idx = self.level_index(level)?;
                let vals = v.get_values::<f32, _>((&[idx, 0, 0][..], &[1, *h, *w][..]))?;
                Ok(Array2::from_shape_vec((*h, *w), vals)?)
            }
            other => Err(Error::NotAGrid {
                var: var.to_string(),
                level,
                got: other.to_vec(),
            }),
        }
    }

    fn level_index(&self, level: i32) -> Result<usize> {
        let lev = self.file.variable("lev").ok_or_else(|| Error::MissingVariable {
            var: "lev".to_string(),
            path: self.path.clone(),
        })?;
        let vals = lev.get_values::<f64, _>(..)?;
        vals.iter()
            .position(|v| (v - f64::from(level)).abs() < 1e-3)
            .ok_or_else(|| Error::MissingLevel { level, path: self.path.clone() })
    }

    /// Named scalar: a 0-dim (or single-element) variable first, then a
    /// global attribute.
    pub fn scalar(&self, name: &str) -> Result<f64> {
        if let Some(v) = self.file.variable(name) {
            let vals = v.get_values::<f64, _>(..)?;
            if let Some(first) = vals.first() {
                return Ok(*first);
            }
        }
        if let Some(attr) = self.file.attribute(name) {
            if let Some(v) = attr_as_f64(&attr.value()?) {
                return Ok(v);
            }
        }
        Err(Error::MissingScalar {
            name: name.to_string(),
            path: self.path.clone(),
        })
    }
}

fn attr_as_f64(value: &netcdf::AttributeValue) -> Option<f64> {
    use netcdf::AttributeValue::*;
    Some(match value {
        Uchar(v) => f64::from(*v),
        Schar(v) => f64::from(*v),
        Ushort(v) => f64::from(*v),
        Short(v) => f64::from(*v),
        Uint(v) => f64::from(*v),
        Int(v) => f64::from(*v),
        Ulonglong(v) => *v as f64,
        Longlong(v) => *v as f64,
        Float(v) => f64::from(*v),
        Double(v) => *v,
        _ => return None,
    })
}
