//! Appendable NumPy `.npy` (format version 1.0) writer.
//!
//! Shards grow one record at a time, so files are created with a header
//! that reserves enough width for a 20-digit leading dimension; every
//! append extends the data section and rewrites the shape in place.
//! Files stay readable by `numpy.load` and by `ndarray-npy`.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{path}: not an NPY file")]
    BadMagic { path: PathBuf },
    #[error("{path}: unsupported NPY version {major}.{minor}")]
    UnsupportedVersion { path: PathBuf, major: u8, minor: u8 },
    #[error("{path}: malformed NPY header")]
    BadHeader { path: PathBuf },
    #[error("{path}: dtype is {found}, appending {expected}")]
    DtypeMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
    #[error("{path}: record shape is {found:?}, appending {expected:?}")]
    RecordShapeMismatch {
        path: PathBuf,
        found: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("{got} elements do not fill shape {shape:?}")]
    LengthMismatch { got: usize, shape: Vec<usize> },
}

/// Scalar types the appender can store, little-endian.
pub trait Element: Copy {
    const DESCR: &'static str;
    fn extend_le(buf: &mut Vec<u8>, values: &[Self]);
}

impl Element for f32 {
    const DESCR: &'static str = "<f4";
    fn extend_le(buf: &mut Vec<u8>, values: &[Self]) {
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
}

impl Element for f64 {
    const DESCR: &'static str = "<f8";
    fn extend_le(buf: &mut Vec<u8>, values: &[Self]) {
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Header encoding
// ─────────────────────────────────────────────────────────────────────

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [d] => format!("({d},)"),
        _ => format!(
            "({})",
            shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn dict_literal(descr: &str, shape: &[usize]) -> String {
    format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr,
        shape_literal(shape)
    )
}

/// Padded dict length (excluding the 10 preamble bytes) for a fresh file,
/// sized so the leading dimension can later grow to 20 digits and still be
/// rewritten in place. Total header is a multiple of 64 per the format.
fn fresh_header_len(descr: &str, shape: &[usize]) -> usize {
    let spare = 20 - shape[0].to_string().len();
    let total = 10 + dict_literal(descr, shape).len() + spare + 1;
    let total = (total + 63) / 64 * 64;
    total - 10
}

/// Preamble + dict, space-padded to exactly `header_len` and newline-terminated.
fn encode_header(
    descr: &str,
    shape: &[usize],
    header_len: usize,
    path: &Path,
) -> Result<Vec<u8>, NpyError> {
    let dict = dict_literal(descr, shape);
    if dict.len() + 1 > header_len {
        // a foreign file created without spare shape width
        return Err(NpyError::BadHeader { path: path.to_path_buf() });
    }
    let mut out = Vec::with_capacity(10 + header_len);
    out.extend_from_slice(MAGIC);
    out.push(1);
    out.push(0);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.resize(10 + header_len - 1, b' ');
    out.push(b'\n');
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────
// Header parsing
// ─────────────────────────────────────────────────────────────────────

struct Header {
    descr: String,
    shape: Vec<usize>,
    header_len: usize,
}

fn field_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let idx = text.find(key)?;
    Some(text[idx + key.len()..].trim_start())
}

fn parse_dict(text: &str) -> Option<(String, bool, Vec<usize>)> {
    let descr = field_after(text, "'descr':")?
        .strip_prefix('\'')?
        .split('\'')
        .next()?
        .to_string();
    let fortran = match field_after(text, "'fortran_order':")? {
        t if t.starts_with("False") => false,
        t if t.starts_with("True") => true,
        _ => return None,
    };
    let dims = field_after(text, "'shape':")?
        .strip_prefix('(')?
        .split(')')
        .next()?;
    let shape = dims
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some((descr, fortran, shape))
}

fn read_header(f: &mut File, path: &Path) -> Result<Header, NpyError> {
    let mut pre = [0u8; 10];
    f.read_exact(&mut pre)?;
    if &pre[..6] != MAGIC {
        return Err(NpyError::BadMagic { path: path.to_path_buf() });
    }
    if pre[6] != 1 || pre[7] != 0 {
        return Err(NpyError::UnsupportedVersion {
            path: path.to_path_buf(),
            major: pre[6],
            minor: pre[7],
        });
    }
    let header_len = u16::from_le_bytes([pre[8], pre[9]]) as usize;
    let mut raw = vec![0u8; header_len];
    f.read_exact(&mut raw)?;
    let bad = || NpyError::BadHeader { path: path.to_path_buf() };
    let text = std::str::from_utf8(&raw).map_err(|_| bad())?;
    let (descr, fortran, shape) = parse_dict(text).ok_or_else(bad)?;
    if fortran || shape.is_empty() {
        return Err(bad());
    }
    Ok(Header { descr, shape, header_len })
}

// ─────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────

/// Append a block of records (C order, leading axis = record axis) to the
/// array at `path`, creating the file if absent. An existing file must
/// carry the same dtype and the same per-record trailing dimensions.
pub fn append_records<T: Element>(
    path: &Path,
    shape: &[usize],
    values: &[T],
) -> Result<(), NpyError> {
    let expect: usize = shape.iter().product();
    if shape.is_empty() || values.len() != expect {
        return Err(NpyError::LengthMismatch {
            got: values.len(),
            shape: shape.to_vec(),
        });
    }
    let mut payload = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
    T::extend_le(&mut payload, values);

    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(mut f) => {
            let hdr = read_header(&mut f, path)?;
            if hdr.descr != T::DESCR {
                return Err(NpyError::DtypeMismatch {
                    path: path.to_path_buf(),
                    found: hdr.descr,
                    expected: T::DESCR.to_string(),
                });
            }
            if hdr.shape.len() != shape.len() || hdr.shape[1..] != shape[1..] {
                return Err(NpyError::RecordShapeMismatch {
                    path: path.to_path_buf(),
                    found: hdr.shape[1..].to_vec(),
                    expected: shape[1..].to_vec(),
                });
            }
            f.seek(SeekFrom::End(0))?;
            f.write_all(&payload)?;
            let mut grown = hdr.shape;
            grown[0] += shape[0];
            let header = encode_header(T::DESCR, &grown, hdr.header_len, path)?;
            f.seek(SeekFrom::Start(0))?;
            f.write_all(&header)?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let header_len = fresh_header_len(T::DESCR, shape);
            let header = encode_header(T::DESCR, shape, header_len, path)?;
            let mut f = File::create(path)?;
            f.write_all(&header)?;
            f.write_all(&payload)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Record count (leading dimension) without touching the data section.
pub fn record_count(path: &Path) -> Result<usize, NpyError> {
    let mut f = File::open(path)?;
    let hdr = read_header(&mut f, path)?;
    Ok(hdr.shape[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use ndarray_npy::read_npy;

    #[test]
    fn create_then_append_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        append_records::<f32>(&path, &[1, 2, 2], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        append_records::<f32>(&path, &[1, 2, 2], &[4.0, 5.0, 6.0, 7.0]).unwrap();
        assert_eq!(record_count(&path).unwrap(), 2);

        let arr: Array3<f32> = read_npy(&path).unwrap();
        assert_eq!(arr.shape(), &[2, 2, 2]);
        assert_eq!(arr[[0, 0, 0]], 0.0);
        assert_eq!(arr[[0, 1, 1]], 3.0);
        assert_eq!(arr[[1, 0, 0]], 4.0);
        assert_eq!(arr[[1, 1, 1]], 7.0);
    }

    #[test]
    fn f64_rows_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("y.npy");
        for i in 0..3 {
            let row = [i as f64, 10.0 + i as f64, 20.0 + i as f64];
            append_records::<f64>(&path, &[1, 3], &row).unwrap();
        }
        let arr: Array2<f64> = read_npy(&path).unwrap();
        assert_eq!(arr.shape(), &[3, 3]);
        assert_eq!(arr[[2, 1]], 12.0);
    }

    #[test]
    fn header_stays_a_multiple_of_64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.npy");
        append_records::<f32>(&path, &[1, 13, 72, 72], &vec![0.0; 13 * 72 * 72]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
    }

    #[test]
    fn dtype_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.npy");
        append_records::<f32>(&path, &[1, 2], &[0.0, 1.0]).unwrap();
        let err = append_records::<f64>(&path, &[1, 2], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, NpyError::DtypeMismatch { .. }));
    }

    #[test]
    fn record_shape_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.npy");
        append_records::<f32>(&path, &[1, 2, 2], &[0.0; 4]).unwrap();
        let err = append_records::<f32>(&path, &[1, 3, 2], &[0.0; 6]).unwrap_err();
        assert!(matches!(err, NpyError::RecordShapeMismatch { .. }));
        let err = append_records::<f32>(&path, &[1, 4], &[0.0; 4]).unwrap_err();
        assert!(matches!(err, NpyError::RecordShapeMismatch { .. }));
    }

    #[test]
    fn wrong_element_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.npy");
        let err = append_records::<f32>(&path, &[1, 3], &[0.0; 4]).unwrap_err();
        assert!(matches!(err, NpyError::LengthMismatch { .. }));
    }
}
