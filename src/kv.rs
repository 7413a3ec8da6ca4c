//! Durable key-value backends.
//!
//! Keys are `name` or `namespace/name`; values are JSON text.
//!
//! ```text
//! <store>/
//!   .lock                 # held while a session owns the store
//!   settings.json         # key `settings`
//!   task/
//!     <id>.json           # key `task/<id>`, id %XX-escaped
//! ```
//!
//! File names only ever contain `[a-z0-9_-]` and `%XX` escapes, so keys
//! that differ only in case still get distinct files on case-insensitive
//! filesystems.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

const RECORD_EXTENSION: &str = "json";
const LOCK_FILE: &str = ".lock";

/// Minimal synchronous key-value store.
pub trait KeyValueStore: fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Ephemeral store, also the test double.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Directory-backed store, one file per key.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    _lock: FileLock,
}

impl FileStore {
    /// Open (creating if needed) the store at `root` and take ownership of it.
    pub fn open(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let lock = FileLock::acquire(root.join(LOCK_FILE), lock_timeout_ms)?;
        debug!(root = %root.display(), "file store opened");
        Ok(Self { root, _lock: lock })
    }

    // `ns/name` maps to `<root>/<ns>/<name>.json`; only the first `/` splits.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let (namespace, name) = match key.split_once('/') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, key),
        };
        if name.is_empty() || namespace.is_some_and(str::is_empty) {
            return Err(Error::InvalidArgument(format!(
                "store key '{key}' has an empty segment"
            )));
        }

        let mut path = self.root.clone();
        if let Some(namespace) = namespace {
            path.push(escape_segment(namespace));
        }
        path.push(format!("{}.{RECORD_EXTENSION}", escape_segment(name)));
        Ok(path)
    }

    fn collect_keys(
        &self,
        dir: &Path,
        namespace: Option<&str>,
        keys: &mut Vec<String>,
    ) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }

            if entry.file_type()?.is_dir() {
                if namespace.is_some() {
                    warn!(dir = %entry.path().display(), "skipping nested directory");
                    continue;
                }
                match unescape_segment(&name) {
                    Some(nested) => self.collect_keys(&entry.path(), Some(&nested), keys)?,
                    None => warn!(dir = %entry.path().display(), "skipping unrecognised directory"),
                }
                continue;
            }

            let Some(stem) = name.strip_suffix(&format!(".{RECORD_EXTENSION}")) else {
                continue;
            };
            match (unescape_segment(stem), namespace) {
                (Some(record), Some(namespace)) => keys.push(format!("{namespace}/{record}")),
                (Some(record), None) => keys.push(record),
                (None, _) => warn!(file = %entry.path().display(), "skipping unrecognised file"),
            }
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        lock::write_atomic(&path, value.as_bytes())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.root, None, &mut keys)?;
        Ok(keys)
    }
}

fn is_literal(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-'
}

// Keep [a-z0-9_-]; everything else, uppercase and '.' included, becomes %XX.
fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if is_literal(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn unescape_segment(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = escaped.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else if is_literal(bytes[idx]) {
            out.push(bytes[idx]);
            idx += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(out).ok()
}
