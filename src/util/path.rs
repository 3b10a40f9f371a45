use std::path::{Component, Path, PathBuf};

/// Lossy string form used for persisted paths
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Lexically normalize a path: drops `.` components and trailing
/// separators and resolves `..` against the preceding component.
/// Symlinks are not consulted, so `a/link/..` becomes `a`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Final path component, or the whole path for roots such as `/`
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_string(path))
}
