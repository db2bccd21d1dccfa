//! Persistence handles for the session cookie
//!
//! The cookie file grants an admin session on the device, so it is created
//! readable by the invoking user only.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait SessionStore: Send + Sync {
    /// Stored bytes, `None` when nothing was stored yet
    fn load(&self) -> io::Result<Option<Vec<u8>>>;

    fn save(&self, data: &[u8]) -> io::Result<()>;
}

/// Cookie file scoped to one (hostname, username) pair
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_account(dir: &Path, hostname: &str, username: &str) -> Self {
        let file_name = format!(
            "check_thecus_nas-{}-{}-cookie.txt",
            sanitize(hostname),
            sanitize(username)
        );
        Self::new(dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file if needed and restricts it to the current user
    pub fn init(&self) -> io::Result<()> {
        open_private(&self.path, false)?;
        restrict_permissions(&self.path)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, data: &[u8]) -> io::Result<()> {
        let mut file = open_private(&self.path, true)?;
        file.write_all(data)?;
        file.flush()
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn open_private(path: &Path, truncate: bool) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if truncate {
        options.truncate(true);
    } else {
        options.append(true);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

fn restrict_permissions(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// In-process store, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        *store.data.lock() = Some(data.into());
        store
    }

    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.data.lock().clone())
    }

    fn save(&self, data: &[u8]) -> io::Result<()> {
        *self.data.lock() = Some(data.to_vec());
        Ok(())
    }
}
