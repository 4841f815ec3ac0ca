/*!
 * Delete-On-Exit Hook
 * Files scheduled for removal when the process terminates
 */

use super::registry::HookRegistry;
use super::types::{HookError, HookResult};
use crate::core::errors::{ShutdownError, ShutdownResult};
use crate::core::limits::DELETE_ON_EXIT_SLOT;
use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
struct PendingFiles {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf, RandomState>,
}

/// Ordered set of paths removed during termination
///
/// Paths are removed in reverse registration order, so a directory registered
/// before its contents is removed after them.
pub struct DeleteOnExit {
    files: Mutex<Option<PendingFiles>>,
}

impl DeleteOnExit {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(Some(PendingFiles::default())),
        }
    }

    /// Create the hook and claim the delete-on-exit slot for it
    ///
    /// The slot accepts registration while earlier slots are still running,
    /// since application hooks commonly schedule files for deletion.
    pub fn install(registry: &HookRegistry) -> ShutdownResult<Arc<Self>> {
        let hook = Arc::new(Self::new());
        let runner = Arc::clone(&hook);

        match registry.register(DELETE_ON_EXIT_SLOT, true, "delete-on-exit", move || {
            runner.run()
        }) {
            Ok(()) => Ok(hook),
            Err(ShutdownError::ShutdownInProgress(reason)) => {
                warn!(%reason, "Delete-on-exit requested during shutdown, disabling");
                hook.files.lock().take();
                Ok(hook)
            }
            Err(e) => Err(e),
        }
    }

    /// Schedule `path` for deletion; duplicates are ignored
    pub fn add(&self, path: impl AsRef<Path>) -> ShutdownResult<()> {
        let path = path.as_ref();
        let mut files = self.files.lock();
        let Some(files) = files.as_mut() else {
            return Err(ShutdownError::ShutdownInProgress(format!(
                "cannot schedule {} for deletion",
                path.display()
            )));
        };

        if files.seen.insert(path.to_path_buf()) {
            files.order.push(path.to_path_buf());
        }
        Ok(())
    }

    /// Get count of scheduled paths
    pub fn pending(&self) -> usize {
        self.files.lock().as_ref().map_or(0, |files| files.order.len())
    }

    /// Remove every scheduled path, newest first
    pub fn run(&self) -> HookResult {
        let Some(files) = self.files.lock().take() else {
            return Ok(());
        };

        let mut failures = 0usize;
        for path in files.order.iter().rev() {
            match remove_path(path) {
                Ok(()) => debug!(path = %path.display(), "Deleted on exit"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Delete on exit failed");
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Err(HookError::recoverable(format!(
                "{} of {} paths could not be deleted",
                failures,
                files.order.len()
            )));
        }
        Ok(())
    }
}

impl Default for DeleteOnExit {
    fn default() -> Self {
        Self::new()
    }
}

/// Symlinks are removed themselves, never followed
fn remove_path(path: &Path) -> io::Result<()> {
    if std::fs::symlink_metadata(path)?.file_type().is_dir() {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    }
}
