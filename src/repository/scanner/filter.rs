//! Subtree exclusion rules

use std::path::{Path, PathBuf};

/// Virtual and ephemeral filesystem roots that are never scanned
pub const BUILTIN_SKIP_PATHS: &[&str] = &[
    "/proc", "/sys", "/dev", "/run", "/snap", "/var/snap", "/tmp", "/var/tmp",
];

/// Decides whether a directory subtree is excluded from a scan.
///
/// Matching is component-wise: `/var/tmp` excludes `/var/tmp` and
/// `/var/tmp/x`, never `/var/tmpX`.
#[derive(Debug, Clone)]
pub struct PathFilter {
    skip: Vec<PathBuf>,
}

impl PathFilter {
    /// Configured skip paths unioned with [`BUILTIN_SKIP_PATHS`]
    pub fn new<I, P>(skip_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut skip: Vec<PathBuf> = BUILTIN_SKIP_PATHS.iter().map(PathBuf::from).collect();
        for path in skip_paths {
            let path = path.as_ref();
            if !path.as_os_str().is_empty() && !skip.iter().any(|s| s == path) {
                skip.push(path.to_path_buf());
            }
        }
        Self { skip }
    }

    /// Narrow the filter to one scan root: skip paths equal to the root or
    /// containing it no longer apply, so an explicitly requested root is
    /// always scanned.
    pub fn for_root(&self, root: &Path) -> Self {
        Self {
            skip: self
                .skip
                .iter()
                .filter(|skip| !root.starts_with(skip))
                .cloned()
                .collect(),
        }
    }

    /// True if `path` is a skip path or lies beneath one
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.skip.iter().any(|skip| path.starts_with(skip))
    }

    pub fn skip_paths(&self) -> &[PathBuf] {
        &self.skip
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}
