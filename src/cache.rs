//! Best-effort page-cache eviction
//!
//! The global drop needs a privileged pseudo-file that may not exist on the
//! target system. Support is probed once up front; when it is missing the
//! fixture's own pages are evicted with `posix_fadvise(DONTNEED)` instead.
//! Nothing here is ever reported as an error.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::unistd::{access, AccessFlags};

/// Linux knob that drops clean page cache, dentries and inodes
pub const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";

/// How a cache drop was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Global drop via the pseudo-file
    Global,
    /// Per-file eviction advice
    Advised,
    /// No facility was usable
    Skipped,
}

#[derive(Debug, Clone)]
pub struct CacheControl {
    knob: PathBuf,
    supported: bool,
    settle: Duration,
}

impl CacheControl {
    /// Probe the default knob
    pub fn probe(settle: Duration) -> Self {
        Self::probe_path(DROP_CACHES_PATH, settle)
    }

    /// Probe an arbitrary knob path for write access
    pub fn probe_path(knob: impl AsRef<Path>, settle: Duration) -> Self {
        let knob = knob.as_ref().to_path_buf();
        let supported = access(knob.as_path(), AccessFlags::W_OK).is_ok();
        tracing::debug!(knob = %knob.display(), supported, "probed cache drop facility");
        Self {
            knob,
            supported,
            settle,
        }
    }

    /// A control that never touches the system
    pub fn disabled() -> Self {
        Self {
            knob: PathBuf::from(DROP_CACHES_PATH),
            supported: false,
            settle: Duration::ZERO,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Evict cached pages before a cold trial over `fixture`, then let the
    /// system settle
    pub fn drop_caches(&self, fixture: Option<&Path>) -> DropOutcome {
        let outcome = if self.supported && self.write_knob() {
            DropOutcome::Global
        } else if fixture.is_some_and(advise_dontneed) {
            DropOutcome::Advised
        } else {
            DropOutcome::Skipped
        };
        tracing::debug!(?outcome, "cache drop");
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        outcome
    }

    fn write_knob(&self) -> bool {
        let result = OpenOptions::new()
            .write(true)
            .open(&self.knob)
            .and_then(|mut f| f.write_all(b"3"));
        if let Err(e) = &result {
            tracing::debug!("drop_caches write failed: {}", e);
        }
        result.is_ok()
    }
}

fn advise_dontneed(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    // Flush dirty pages first; DONTNEED only drops clean ones.
    let _ = file.sync_data();
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let ret = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED) };
    if ret != 0 {
        tracing::debug!("posix_fadvise(DONTNEED) failed with errno {}", ret);
    }
    ret == 0
}
