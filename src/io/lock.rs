use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default wait for a contended workspace lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory lock held while a command mutates the workspace.
///
/// Backed by flock on `.notetree/.lock`; released when dropped.
pub struct WorkspaceLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("workspace is busy: another nt process holds {path}")]
    Timeout { path: PathBuf },
}

impl WorkspaceLock {
    /// Block up to `timeout` for the lock in `meta_dir`.
    pub fn acquire(meta_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = meta_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Create {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        let mut wait = Duration::from_millis(5);
        while try_flock(&file).is_err() {
            if start.elapsed() >= timeout {
                tracing::warn!(path = %path.display(), "lock wait timed out");
                return Err(LockError::Timeout { path });
            }
            std::thread::sleep(wait);
            wait = (wait * 2).min(Duration::from_millis(100));
        }
        tracing::debug!(path = %path.display(), waited_ms = start.elapsed().as_millis() as u64, "workspace locked");
        Ok(WorkspaceLock { _file: file, path })
    }

    pub fn acquire_default(meta_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(meta_dir, DEFAULT_LOCK_TIMEOUT)
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        // flock is released with the descriptor
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_flock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_flock(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_reacquirable_after_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = WorkspaceLock::acquire_default(tmp.path()).unwrap();
        assert!(tmp.path().join(".lock").exists());
        drop(lock);
        assert!(WorkspaceLock::acquire_default(tmp.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn contended_lock_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = WorkspaceLock::acquire_default(tmp.path()).unwrap();
        let second = WorkspaceLock::acquire(tmp.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn missing_dir_is_a_create_error() {
        let tmp = TempDir::new().unwrap();
        let err = WorkspaceLock::acquire_default(&tmp.path().join("nope")).err().unwrap();
        assert!(matches!(err, LockError::Create { .. }));
    }
}
