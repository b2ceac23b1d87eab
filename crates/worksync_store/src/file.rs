//! File-based key-value backend for persistent storage.

use crate::backend::KeyValueStore;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const VALUE_EXT: &str = "json";
const TEMP_EXT: &str = "json.tmp";

/// A directory-backed key-value store.
///
/// Every key lives in its own file named after the escaped key. Values
/// survive process restarts.
///
/// # Durability
///
/// - `set()` writes a temporary file, `sync_all()`s it, renames it over
///   the previous value and syncs the directory
/// - A reader never observes a half-written value
///
/// # Locking
///
/// The directory is guarded by an exclusive `LOCK` file for as long as the
/// store is open; a second open fails with [`StoreError::Locked`].
///
/// # Example
///
/// ```no_run
/// use worksync_store::{FileStore, KeyValueStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("cache")).unwrap();
/// store.set("settings_default", "{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    _lock_file: File,
    writes: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, is not a
    /// directory, or is locked by another process.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::InvalidPath(dir.display().to_string()));
        }
        fs::create_dir_all(dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(dir.display().to_string()));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
            writes: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", escape_key(key)))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        let dir = File::open(&self.dir)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.value_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(StoreError::Corrupted {
                key: key.to_string(),
                reason: "value is not valid UTF-8".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.writes.lock();
        let target = self.value_path(key);
        let temp = self.dir.join(format!("{}.{TEMP_EXT}", escape_key(key)));
        {
            let mut file = File::create(&temp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &target)?;
        self.sync_directory()
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.writes.lock();
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => self.sync_directory(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.ends_with(TEMP_EXT) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(&format!(".{VALUE_EXT}")) {
                match unescape_key(stem) {
                    Some(key) => keys.push(key),
                    None => tracing::warn!(file = name, "Ignoring unrecognised store file"),
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'@')
}

/// Maps a key onto a portable file name: `[A-Za-z0-9-_.@]` pass through,
/// every other byte becomes `%XX`.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if is_plain(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn unescape_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
