//! Bottom-up directory size aggregation
//!
//! Walks a tree in pre-order with `walkdir` and folds it back up with a
//! stack of open directories indexed by depth. A directory is emitted only
//! after every child directory has been folded into it, so consumers
//! always see children before parents.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::model::{EntryRecord, ScanErrorRecord};
use crate::util::{base_name, path_string, unix_now};

use super::error::ScanError;
use super::filter::PathFilter;
use super::types::{DirAggregate, WalkEvent, WalkOutcome};

/// Cooperative cancellation flag shared between a scan and its controller
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the scan to stop at the next directory boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// One directory whose children are still being visited
struct Frame {
    path: PathBuf,
    depth: u32,
    size: u64,
    file_count: u64,
    dir_count: u64,
    direct_size: u64,
    direct_files: u64,
    error: Option<String>,
}

impl Frame {
    fn new(path: PathBuf, depth: u32) -> Self {
        Self {
            path,
            depth,
            size: 0,
            file_count: 0,
            dir_count: 0,
            direct_size: 0,
            direct_files: 0,
            error: None,
        }
    }

    /// The directory could not be listed: it stays zero-sized and carries the error
    fn mark_unreadable(&mut self, err: &io::Error) {
        self.error = Some(err.to_string());
    }

    /// Add one file's metadata result. A failed read yields the error to
    /// record and leaves the totals untouched.
    fn account_file(&mut self, path: &Path, size: io::Result<u64>) -> Option<ScanErrorRecord> {
        match size {
            Ok(size) => {
                self.size += size;
                self.direct_size += size;
                self.file_count += 1;
                self.direct_files += 1;
                None
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot stat file");
                Some(ScanErrorRecord::from_io(path_string(path), &err, unix_now()))
            }
        }
    }

    /// Fold a finished child directory into this one
    fn absorb(&mut self, child: &Frame) {
        self.size += child.size;
        self.file_count += child.file_count;
        self.dir_count += child.dir_count + 1;
    }

    fn finish(self) -> DirAggregate {
        let parent_path = if self.depth == 0 {
            None
        } else {
            self.path.parent().map(path_string)
        };
        DirAggregate {
            entry: EntryRecord {
                path: path_string(&self.path),
                name: base_name(&self.path),
                size: self.size,
                file_count: self.file_count,
                dir_count: self.dir_count,
                depth: self.depth,
                parent_path,
                is_dir: true,
                error: self.error,
            },
            direct_size: self.direct_size,
            direct_files: self.direct_files,
        }
    }
}

/// Computes cumulative size, file count and directory count for every
/// non-excluded directory under a root in a single pass.
pub struct DirectoryAggregator {
    root: PathBuf,
    filter: PathFilter,
    max_depth: u32,
    cancel: CancelHandle,
}

impl DirectoryAggregator {
    /// `max_depth` of 0 means unlimited. Subtrees deeper than the limit are
    /// not visited and contribute nothing to their ancestors.
    pub fn new(root: impl Into<PathBuf>, filter: &PathFilter, max_depth: u32) -> Self {
        let root = root.into();
        Self {
            filter: filter.for_root(&root),
            root,
            max_depth,
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walk the tree, handing every event to `emit`. Returning `false` from
    /// `emit` stops the walk as if cancelled.
    ///
    /// Only a root that cannot be listed is an error; every other access
    /// failure becomes a [`WalkEvent::Error`].
    pub fn walk<F>(&self, mut emit: F) -> Result<WalkOutcome, ScanError>
    where
        F: FnMut(WalkEvent) -> bool,
    {
        if self.cancel.is_cancelled() {
            return Ok(WalkOutcome::Cancelled);
        }

        let mut walker = WalkDir::new(&self.root).follow_links(false);
        if self.max_depth > 0 {
            // Files directly inside the deepest kept directories still count
            walker = walker.max_depth(self.max_depth as usize + 1);
        }

        // stack[d] is the open directory at depth d
        let mut stack: Vec<Frame> = Vec::new();

        for item in walker.into_iter().filter_entry(|e| self.keep(e)) {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    self.record_error(&mut stack, err, &mut emit)?;
                    continue;
                }
            };

            let depth = entry.depth() as u32;
            if !self.unwind(&mut stack, depth as usize, &mut emit) {
                return Ok(WalkOutcome::Cancelled);
            }

            if entry.file_type().is_dir() {
                if self.cancel.is_cancelled() {
                    debug!(path = %entry.path().display(), "walk cancelled");
                    return Ok(WalkOutcome::Cancelled);
                }
                stack.push(Frame::new(entry.into_path(), depth));
                continue;
            }

            // Symlinks land here too: walkdir reports them without following
            let Some(parent) = stack.last_mut() else { continue };
            let size = entry.metadata().map(|meta| meta.len()).map_err(io::Error::from);
            if let Some(err) = parent.account_file(entry.path(), size) {
                if !emit(WalkEvent::Error(err)) {
                    return Ok(WalkOutcome::Cancelled);
                }
            }
        }

        if !self.unwind(&mut stack, 0, &mut emit) {
            return Ok(WalkOutcome::Cancelled);
        }
        Ok(WalkOutcome::Finished)
    }

    /// Subtree pruning: skip paths and directories past the depth limit
    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let beyond = self.max_depth > 0 && entry.depth() > self.max_depth as usize;
        if beyond || self.filter.is_excluded(entry.path()) {
            trace!(path = %entry.path().display(), "skipping subtree");
            return false;
        }
        true
    }

    /// Close every open directory at `depth` or deeper, folding each into
    /// its parent and emitting it. Returns false if `emit` asked to stop.
    fn unwind<F>(&self, stack: &mut Vec<Frame>, depth: usize, emit: &mut F) -> bool
    where
        F: FnMut(WalkEvent) -> bool,
    {
        while stack.len() > depth {
            let Some(done) = stack.pop() else { break };
            if let Some(parent) = stack.last_mut() {
                parent.absorb(&done);
            }
            if !emit(WalkEvent::Directory(done.finish())) {
                return false;
            }
        }
        true
    }

    /// Route a walk error. A directory that cannot be listed keeps its
    /// (zero-valued) frame and carries the error; the root is fatal.
    fn record_error<F>(&self, stack: &mut [Frame], err: walkdir::Error, emit: &mut F) -> Result<(), ScanError>
    where
        F: FnMut(WalkEvent) -> bool,
    {
        // Errors reading a single directory item carry no path of their own
        let failed_dir = err.path().map(Path::to_path_buf);
        let err = io::Error::from(err);

        if failed_dir.as_deref() == Some(self.root.as_path()) && stack.len() <= 1 {
            return Err(ScanError::RootUnreadable {
                path: path_string(&self.root),
                source: err,
            });
        }

        let path = match failed_dir {
            Some(path) => {
                if let Some(frame) = stack.iter_mut().rev().find(|frame| frame.path == path) {
                    frame.mark_unreadable(&err);
                }
                path
            }
            None => stack
                .last()
                .map(|frame| frame.path.clone())
                .unwrap_or_else(|| self.root.clone()),
        };

        debug!(path = %path.display(), error = %err, "cannot read directory");
        emit(WalkEvent::Error(ScanErrorRecord::from_io(path_string(&path), &err, unix_now())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanErrorKind;
    use std::fs;
    use rustc_hash::FxHashMap;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        fs::write(path, vec![0u8; n]).unwrap();
    }

    /// ```text
    /// root/
    ///   a.bin        (10)
    ///   one/
    ///     b.bin      (20)
    ///     two/
    ///       c.bin    (30)
    ///   three/
    ///     d.bin      (40)
    /// ```
    fn build_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("one/two")).unwrap();
        fs::create_dir_all(root.join("three")).unwrap();
        write_bytes(&root.join("a.bin"), 10);
        write_bytes(&root.join("one/b.bin"), 20);
        write_bytes(&root.join("one/two/c.bin"), 30);
        write_bytes(&root.join("three/d.bin"), 40);
        dir
    }

    fn collect(aggregator: &DirectoryAggregator) -> (WalkOutcome, Vec<DirAggregate>, Vec<ScanErrorRecord>) {
        let mut dirs = Vec::new();
        let mut errors = Vec::new();
        let outcome = aggregator
            .walk(|event| {
                match event {
                    WalkEvent::Directory(dir) => dirs.push(dir),
                    WalkEvent::Error(err) => errors.push(err),
                }
                true
            })
            .unwrap();
        (outcome, dirs, errors)
    }

    fn by_path(dirs: &[DirAggregate]) -> FxHashMap<String, EntryRecord> {
        dirs.iter().map(|d| (d.entry.path.clone(), d.entry.clone())).collect()
    }

    #[test]
    fn test_cumulative_totals() {
        let dir = build_tree();
        let root = dir.path();
        let aggregator = DirectoryAggregator::new(root, &PathFilter::default(), 0);

        let (outcome, dirs, errors) = collect(&aggregator);
        assert_eq!(outcome, WalkOutcome::Finished);
        assert!(errors.is_empty());
        assert_eq!(dirs.len(), 4);

        let entries = by_path(&dirs);
        let top = &entries[&path_string(root)];
        assert_eq!(top.size, 100);
        assert_eq!(top.file_count, 4);
        assert_eq!(top.dir_count, 3);
        assert_eq!(top.depth, 0);
        assert_eq!(top.parent_path, None);

        let one = &entries[&path_string(&root.join("one"))];
        assert_eq!(one.size, 50);
        assert_eq!(one.file_count, 2);
        assert_eq!(one.dir_count, 1);
        assert_eq!(one.depth, 1);
        assert_eq!(one.parent_path.as_deref(), Some(path_string(root).as_str()));

        let two = &entries[&path_string(&root.join("one/two"))];
        assert_eq!(two.size, 30);
        assert_eq!(two.dir_count, 0);
        assert_eq!(two.depth, 2);
        assert_eq!(two.name, "two");
    }

    #[test]
    fn test_children_emitted_before_parents() {
        let dir = build_tree();
        let aggregator = DirectoryAggregator::new(dir.path(), &PathFilter::default(), 0);
        let (_, dirs, _) = collect(&aggregator);

        let position: FxHashMap<&str, usize> = dirs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.entry.path.as_str(), i))
            .collect();
        for d in &dirs {
            if let Some(parent) = &d.entry.parent_path {
                assert!(position[d.entry.path.as_str()] < position[parent.as_str()]);
            }
        }
        assert_eq!(dirs.last().unwrap().entry.depth, 0);
    }

    #[test]
    fn test_skip_path_removes_subtree() {
        let dir = build_tree();
        let root = dir.path();
        let filter = PathFilter::new([root.join("one")]);
        let aggregator = DirectoryAggregator::new(root, &filter, 0);

        let (_, dirs, _) = collect(&aggregator);
        let entries = by_path(&dirs);

        assert_eq!(dirs.len(), 2);
        assert!(!entries.contains_key(&path_string(&root.join("one/two"))));
        let top = &entries[&path_string(root)];
        assert_eq!(top.size, 50);
        assert_eq!(top.file_count, 2);
        assert_eq!(top.dir_count, 1);
        assert_eq!(entries[&path_string(&root.join("three"))].size, 40);
    }

    #[test]
    fn test_max_depth_drops_deeper_subtrees() {
        let dir = build_tree();
        let root = dir.path();
        let aggregator = DirectoryAggregator::new(root, &PathFilter::default(), 1);

        let (_, dirs, _) = collect(&aggregator);
        let entries = by_path(&dirs);

        assert_eq!(dirs.len(), 3);
        assert_eq!(entries[&path_string(&root.join("one"))].size, 20);
        assert_eq!(entries[&path_string(&root.join("one"))].dir_count, 0);
        assert_eq!(entries[&path_string(root)].size, 70);
    }

    #[test]
    fn test_pre_cancelled_walk_emits_nothing() {
        let dir = build_tree();
        let cancel = CancelHandle::new();
        cancel.cancel();
        let aggregator = DirectoryAggregator::new(dir.path(), &PathFilter::default(), 0)
            .with_cancel(cancel);

        let (outcome, dirs, _) = collect(&aggregator);
        assert_eq!(outcome, WalkOutcome::Cancelled);
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_emit_false_stops_walk() {
        let dir = build_tree();
        let aggregator = DirectoryAggregator::new(dir.path(), &PathFilter::default(), 0);

        let mut seen = 0;
        let outcome = aggregator
            .walk(|event| {
                if matches!(event, WalkEvent::Directory(_)) {
                    seen += 1;
                }
                false
            })
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Cancelled);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let aggregator = DirectoryAggregator::new(dir.path().join("gone"), &PathFilter::default(), 0);
        let err = aggregator.walk(|_| true).unwrap_err();
        assert!(matches!(err, ScanError::RootUnreadable { .. }));
    }

    #[test]
    fn test_unreadable_file_is_recorded_and_skipped() {
        let mut frame = Frame::new(PathBuf::from("/data"), 0);
        assert!(frame.account_file(Path::new("/data/ok"), Ok(5)).is_none());

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = frame.account_file(Path::new("/data/secret"), Err(denied)).unwrap();
        assert!(frame.account_file(Path::new("/data/ok2"), Ok(7)).is_none());

        assert_eq!(err.kind, ScanErrorKind::PermissionDenied);
        assert_eq!(err.path, "/data/secret");
        assert_eq!(frame.size, 12);
        assert_eq!(frame.file_count, 2);
    }

    #[test]
    fn test_unreadable_directory_is_zero_valued() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let mut parent = Frame::new(PathBuf::from("/data"), 0);
        parent.account_file(Path::new("/data/f"), Ok(9));
        let mut locked = Frame::new(PathBuf::from("/data/locked"), 1);
        locked.mark_unreadable(&err);
        parent.absorb(&locked);

        let locked = locked.finish();
        assert_eq!(locked.entry.size, 0);
        assert!(locked.entry.error.is_some());
        assert_eq!(locked.entry.parent_path.as_deref(), Some("/data"));

        let parent = parent.finish();
        assert_eq!(parent.entry.size, 9);
        assert_eq!(parent.entry.dir_count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = build_tree();
        let root = dir.path();
        std::os::unix::fs::symlink(root.join("one"), root.join("three/link")).unwrap();

        let aggregator = DirectoryAggregator::new(root, &PathFilter::default(), 0);
        let (_, dirs, _) = collect(&aggregator);
        let entries = by_path(&dirs);

        let three = &entries[&path_string(&root.join("three"))];
        let link_len = fs::symlink_metadata(root.join("three/link")).unwrap().len();
        assert_eq!(dirs.len(), 4);
        assert_eq!(three.file_count, 2);
        assert_eq!(three.size, 40 + link_len);
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_directory_reported_and_zero_valued() {
        use std::os::unix::fs::PermissionsExt;

        let dir = build_tree();
        let root = dir.path();
        let locked = root.join("three");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running privileged: permissions are not enforced
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let aggregator = DirectoryAggregator::new(root, &PathFilter::default(), 0);
        let (outcome, dirs, errors) = collect(&aggregator);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(outcome, WalkOutcome::Finished);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, path_string(&locked));
        assert_eq!(errors[0].kind, ScanErrorKind::PermissionDenied);

        let entries = by_path(&dirs);
        let three = &entries[&path_string(&locked)];
        assert_eq!(three.size, 0);
        assert!(three.error.is_some());
        assert_eq!(entries[&path_string(root)].size, 60);
    }
}
