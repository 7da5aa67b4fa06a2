use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────
// Window size
// ─────────────────────────────────────────────────────────────────────

/// Rectangular domain footprint in degrees, embedded in source filenames
/// as a `{width}x{height}` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    /// The tag as it appears in filenames, e.g. `18x18`.
    pub fn tag(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for WindowSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width = w.parse().map_err(|_| format!("bad window width {w:?}"))?;
        let height = h.parse().map_err(|_| format!("bad window height {h:?}"))?;
        Ok(Self { width, height })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Variable/level selectors
// ─────────────────────────────────────────────────────────────────────

/// One feature layer: a named variable at a pressure level (hPa).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSelector {
    pub name: String,
    pub level: i32,
}

impl fmt::Display for VarSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.level)
    }
}

impl FromStr for VarSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, level) = s
            .split_once(':')
            .ok_or_else(|| format!("expected VAR:LEVEL, got {s:?}"))?;
        if name.is_empty() {
            return Err(format!("empty variable name in {s:?}"));
        }
        let level = level.parse().map_err(|_| format!("bad level in {s:?}"))?;
        Ok(Self { name: name.to_string(), level })
    }
}

/// The standard 13-layer MERRA2 subset: U/V/T/RH at 850 and 950 hPa,
/// then U/V/T/RH/SLP at 750 hPa. Layer order is fixed; the flat shard
/// format stores no per-record schema.
pub fn default_selectors() -> Vec<VarSelector> {
    let mut out = Vec::with_capacity(13);
    for level in [850, 950] {
        for name in ["U", "V", "T", "RH"] {
            out.push(VarSelector { name: name.to_string(), level });
        }
    }
    for name in ["U", "V", "T", "RH", "SLP"] {
        out.push(VarSelector { name: name.to_string(), level: 750 });
    }
    out
}

// ─────────────────────────────────────────────────────────────────────
// Shard naming
// ─────────────────────────────────────────────────────────────────────

/// Content-derived shard naming shared by the extractor and the splitter.
#[derive(Debug, Clone)]
pub struct Naming {
    pub var_num: usize,
    pub window: WindowSize,
}

impl Naming {
    pub fn features_prefix(&self) -> String {
        format!("features{}_{}", self.var_num, self.window.tag())
    }

    pub fn labels_prefix(&self) -> String {
        format!("labels{}_{}", self.var_num, self.window.tag())
    }

    pub fn spacetime_prefix(&self) -> String {
        format!("space_time_info{}_{}", self.var_num, self.window.tag())
    }

    /// Signature used in per-month test file names, e.g. `18x1807`.
    pub fn signature(&self, month: &str) -> String {
        format!("{}{}", self.window.tag(), month)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Pipeline configs
// ─────────────────────────────────────────────────────────────────────

/// Everything the extractor needs; passed explicitly into
/// [`crate::extract::run_extract`].
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Root of the TC_domain tree, scanned recursively for `.nc` files.
    pub source_root: PathBuf,
    /// Working directory; shards land under `exp_{n}features_{WxH}/monthly/`.
    pub work_dir: PathBuf,
    pub window: WindowSize,
    /// Feature layers in output order.
    pub selectors: Vec<VarSelector>,
    /// Upper limit of acceptable NaN percentage in the primary-level band.
    pub omit_percent: f64,
    /// Wipe prior shards and rewrite the whole dataset. Without this, a
    /// populated output directory terminates the run untouched.
    pub force_rewrite: bool,
    /// Write the `[sin doy, cos doy, CLAT, CLON]` metadata shard.
    pub with_spacetime: bool,
}

impl ExtractConfig {
    pub fn naming(&self) -> Naming {
        Naming { var_num: self.selectors.len(), window: self.window }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir
            .join(format!("exp_{}features_{}", self.selectors.len(), self.window.tag()))
            .join("monthly")
    }
}

/// Everything the splitter needs; passed explicitly into
/// [`crate::split::run_split`].
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Directory holding the monthly shard triples.
    pub data_dir: PathBuf,
    pub naming: Naming,
    /// Suffix on feature shard names from the upstream NaN-fix step
    /// (`fixed` in production; empty to split raw extractor output).
    pub feature_suffix: String,
    /// Percentage of every month carved out as the held-out test set.
    pub test_percentage: u32,
    /// Seed for the per-month and global permutations; a fixed seed makes
    /// re-splitting identical input byte-reproducible.
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn window_size_round_trips() {
        let w: WindowSize = "18x18".parse().unwrap();
        assert_eq!(w, WindowSize { width: 18, height: 18 });
        assert_eq!(w.tag(), "18x18");
        assert!("18".parse::<WindowSize>().is_err());
        assert!("x18".parse::<WindowSize>().is_err());
        assert!("18xab".parse::<WindowSize>().is_err());
    }

    #[test]
    fn selector_parses() {
        let s: VarSelector = "U:850".parse().unwrap();
        assert_eq!(s.name, "U");
        assert_eq!(s.level, 850);
        assert!("U850".parse::<VarSelector>().is_err());
        assert!(":850".parse::<VarSelector>().is_err());
    }

    #[test]
    fn default_selectors_are_the_thirteen_layer_subset() {
        let sels = default_selectors();
        assert_eq!(sels.len(), 13);
        assert_eq!(sels[0], VarSelector { name: "U".into(), level: 850 });
        assert_eq!(sels[12], VarSelector { name: "SLP".into(), level: 750 });
    }

    #[test]
    fn naming_and_output_dir() {
        let cfg = ExtractConfig {
            source_root: PathBuf::from("/in"),
            work_dir: PathBuf::from("/out"),
            window: WindowSize { width: 18, height: 18 },
            selectors: default_selectors(),
            omit_percent: 5.0,
            force_rewrite: false,
            with_spacetime: true,
        };
        assert_eq!(cfg.output_dir(), Path::new("/out/exp_13features_18x18/monthly"));
        let naming = cfg.naming();
        assert_eq!(naming.features_prefix(), "features13_18x18");
        assert_eq!(naming.labels_prefix(), "labels13_18x18");
        assert_eq!(naming.spacetime_prefix(), "space_time_info13_18x18");
        assert_eq!(naming.signature("07"), "18x1807");
    }
}
