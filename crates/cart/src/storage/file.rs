use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::KeyValueStore;
use crate::error::StorageError;

/// JSON file-backed key-value store.
///
/// All keys live in one JSON object (`{"key": "value", ...}`). The file is
/// created on first write; each write goes to its own temp file which is then
/// renamed over the original, so a crash mid-write leaves the previous
/// contents intact.
///
/// Writes run on the blocking pool and cannot be interrupted once started. A
/// caller that gives up on a write (for example after a timeout) cancels it
/// only if it has not reached the file yet; a write that has started holds the
/// lock until it finishes, so later writes always land after it.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Arc<Mutex<()>>,
}

/// Marks a blocking write as abandoned when its caller is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `edit` to the stored map on the blocking pool, under the lock.
    async fn modify<F>(&self, edit: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel = CancelOnDrop(Arc::clone(&cancelled));

        let task = tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            if cancelled.load(Ordering::SeqCst) {
                return Ok(());
            }

            let mut map = load(&path)?;
            if edit(&mut map) {
                save(&path, &map)?;
            }
            Ok(())
        });

        task.await.map_err(io::Error::from)?
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn save(path: &Path, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_vec_pretty(map)?;
    let tmp = tmp_path(path);
    if let Err(e) = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path.clone();
        let map = tokio::task::spawn_blocking(move || load(&path))
            .await
            .map_err(io::Error::from)??;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let key = key.to_string();
        self.modify(move |map| {
            map.insert(key, value);
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        self.modify(move |map| map.remove(&key).is_some()).await
    }
}
