//! Progress reporting for library synchronization.
//!
//! A sync pushes snapshots to an [`Observer`] as it goes. Snapshots are
//! plain, serializable values so a UI shell can forward them as-is.

use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

/// Something that went wrong for one path during a sync.
///
/// Errors are collected, never fatal: a sync always runs to the end and
/// hands back every error it met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}
impl ScanError {
    pub fn new(path: impl Into<PathBuf>, message: impl Display) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Snapshot of one root's sync, emitted after every unit and on every
/// walk error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    /// Units processed so far.
    pub current: usize,
    /// Units discovered by the walk (zero while still walking).
    pub total: usize,
    pub current_path: Option<PathBuf>,
    pub errors: Vec<ScanError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Scanning,
    Indexing,
    Cleanup,
}

/// Snapshot of a multi-root sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub status: SyncStatus,
    /// Zero-based index of the root being processed.
    pub current_path_index: usize,
    pub total_paths: usize,
    /// Progress within the current root, while indexing.
    pub scan: Option<ScanProgress>,
    /// Every error so far, across all roots.
    pub errors: Vec<ScanError>,
}

/// Receives progress snapshots.
///
/// Implemented for closures and for `()` (ignore everything).
///
/// ```
/// use tankobon_library::{Observer, ScanProgress};
///
/// let print = |progress: &ScanProgress| println!("{}/{}", progress.current, progress.total);
/// print.notify(&ScanProgress::default());
/// ().notify(&ScanProgress::default());
/// ```
pub trait Observer<T>: Send + Sync {
    fn notify(&self, event: &T);
}
impl<T, F> Observer<T> for F
where
    F: Fn(&T) + Send + Sync,
{
    fn notify(&self, event: &T) {
        self(event)
    }
}
impl<T> Observer<T> for () {
    fn notify(&self, _event: &T) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_observer_receives_events() {
        let seen = Mutex::new(Vec::new());
        let observer = |progress: &ScanProgress| seen.lock().unwrap().push(progress.current);
        let dynamic: &dyn Observer<ScanProgress> = &observer;
        for current in 1..=3 {
            dynamic.notify(&ScanProgress { current, ..ScanProgress::default() });
        }
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_scan_error_message() {
        let error = ScanError::new("/lib/locked", "permission denied");
        assert_eq!(error.path, PathBuf::from("/lib/locked"));
        assert_eq!(error.message, "permission denied");
    }
}
