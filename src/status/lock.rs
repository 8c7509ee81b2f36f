use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use nix::fcntl::{flock, FlockArg};

/// A status file opened for reading and writing under an exclusive advisory lock
///
/// The lock is held until the value is dropped. Every process touching the same file must go
/// through `LockedFile` for the lock to mean anything.
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Open `path` and block until the exclusive lock is granted
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Can't open {} for locking", path.display()))?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive)
            .with_context(|| format!("Can't lock {}", path.display()))?;
        info!("Locked {}", path.display());
        Ok(LockedFile { file, path: path.to_path_buf() })
    }

    pub fn read_to_string(&mut self) -> io::Result<String> {
        let mut content = String::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut content)?;
        Ok(content)
    }

    pub fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        writeln!(self.file, "{line}")
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(err) = self.file.sync_all() {
            warn!("Can't sync {}: {}", self.path.display(), err);
        }
        if let Err(err) = flock(self.file.as_raw_fd(), FlockArg::Unlock) {
            warn!("Can't unlock {}: {}", self.path.display(), err);
        }
    }
}
