//! Durable session slots
//!
//! A [`Storage`] is a plain string key-value store, the same shape as a
//! browser's local storage. [`SessionStore`] fixes the two keys the session
//! lives under and never interprets their contents.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// A slot write: `Some` sets the value, `None` removes the key
pub type SlotChange<'a> = (&'a str, Option<&'a str>);

/// String key-value storage
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Apply several slot writes. Implementations that can write them in one
    /// step should override this; the default applies them in order and stops
    /// at the first failure.
    fn apply(&self, changes: &[SlotChange<'_>]) -> Result<()> {
        for (key, value) in changes {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

fn apply_to(slots: &mut BTreeMap<String, String>, changes: &[SlotChange<'_>]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                slots.insert(key.to_string(), value.to_string());
            }
            None => {
                slots.remove(*key);
            }
        }
    }
}

/// In-process storage, gone when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots().remove(key);
        Ok(())
    }

    fn apply(&self, changes: &[SlotChange<'_>]) -> Result<()> {
        apply_to(&mut self.slots(), changes);
        Ok(())
    }
}

/// Storage backed by a JSON object file.
///
/// A missing, unreadable or malformed file reads as empty. On Unix the file
/// is kept at mode 0600 and a directory created for it at 0700.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> BTreeMap<String, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed session file {}: {}", self.path.display(), e);
            BTreeMap::new()
        })
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_private_dir(parent).map_err(|e| {
                    Error::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(slots)?;
        write_private_file(&self.path, content.as_bytes())
            .map_err(|e| Error::Storage(format!("cannot write {}: {}", self.path.display(), e)))
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut slots = self.read_slots();
        apply(&mut slots);
        self.write_slots(&slots)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_slots().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|slots| {
            slots.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|slots| {
            slots.remove(key);
        })
    }

    fn apply(&self, changes: &[SlotChange<'_>]) -> Result<()> {
        self.update(|slots| apply_to(slots, changes))
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn write_private_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten a file left by an older version
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

/// The bearer token and cached user record, stored side by side
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    /// Write the token, and the user record when one is given. Without a
    /// record any previously cached one is dropped so the slots stay paired.
    ///
    /// If the write fails the previous pair is put back, or both slots are
    /// cleared when that fails too. A new token never sits next to an old
    /// user record.
    pub fn save(&self, token: &str, user: Option<&str>) -> Result<()> {
        let previous_token = self.read_token();
        let previous_user = self.read_user();

        let Err(e) = self
            .storage
            .apply(&[(TOKEN_KEY, Some(token)), (USER_KEY, user)])
        else {
            return Ok(());
        };

        tracing::warn!("Failed to save session, restoring previous slots: {}", e);
        let restored = self.storage.apply(&[
            (TOKEN_KEY, previous_token.as_deref()),
            (USER_KEY, previous_user.as_deref()),
        ]);
        if let Err(restore_err) = restored {
            tracing::warn!("Failed to restore session slots: {}", restore_err);
            if let Err(clear_err) = self.clear() {
                tracing::warn!("Failed to clear session storage: {}", clear_err);
            }
        }
        Err(e)
    }

    /// Remove both slots. Both removals are attempted even if the first fails.
    pub fn clear(&self) -> Result<()> {
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        token.and(user)
    }

    pub fn read_token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY)
    }

    pub fn read_user(&self) -> Option<String> {
        self.storage.get(USER_KEY)
    }

    pub fn has_token(&self) -> bool {
        self.read_token().is_some_and(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("has_token", &self.has_token())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_save_and_read_back() {
        let store = SessionStore::in_memory();
        store.save("tok", Some(r#"{"id":1}"#)).unwrap();
        assert_eq!(store.read_token().as_deref(), Some("tok"));
        assert_eq!(store.read_user().as_deref(), Some(r#"{"id":1}"#));
    }

    #[test]
    fn test_save_without_user_drops_stale_record() {
        let store = SessionStore::in_memory();
        store.save("old", Some(r#"{"id":1}"#)).unwrap();
        store.save("new", None).unwrap();
        assert_eq!(store.read_token().as_deref(), Some("new"));
        assert!(store.read_user().is_none());
    }

    #[test]
    fn test_clear_removes_both_slots() {
        let store = SessionStore::in_memory();
        store.save("tok", Some("{}")).unwrap();
        store.clear().unwrap();
        assert!(store.read_token().is_none());
        assert!(store.read_user().is_none());
        // Clearing an empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        SessionStore::file(&path).save("tok", Some(r#"{"email":"a@b.com"}"#)).unwrap();

        let reopened = SessionStore::file(&path);
        assert_eq!(reopened.read_token().as_deref(), Some("tok"));
        assert_eq!(reopened.read_user().as_deref(), Some(r#"{"email":"a@b.com"}"#));

        reopened.clear().unwrap();
        assert!(SessionStore::file(&path).read_token().is_none());
    }

    #[test]
    fn test_file_storage_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "this is not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(storage.get(TOKEN_KEY).is_none());

        storage.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_file_storage_remove_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        storage.remove(TOKEN_KEY).unwrap();
        assert!(!storage.path().exists());
    }

    /// Memory storage whose next `failures` writes to the user slot fail
    struct FlakyStorage {
        inner: MemoryStorage,
        failures: AtomicUsize,
    }

    impl FlakyStorage {
        fn failing(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryStorage::new(),
                failures: AtomicUsize::new(failures),
            })
        }

        fn fail_user_write(&self, key: &str) -> Result<()> {
            if key == USER_KEY
                && self
                    .failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(Error::Storage("disk full".to_string()));
            }
            Ok(())
        }
    }

    impl Storage for FlakyStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.fail_user_write(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.fail_user_write(key)?;
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_save_restores_previous_pair() {
        let storage = FlakyStorage::failing(0);
        let store = SessionStore::new(storage.clone());
        store.save("old", Some(r#"{"id":1}"#)).unwrap();

        storage.failures.store(1, Ordering::SeqCst);
        assert!(store.save("new", Some(r#"{"id":2}"#)).is_err());

        assert_eq!(store.read_token().as_deref(), Some("old"));
        assert_eq!(store.read_user().as_deref(), Some(r#"{"id":1}"#));
    }

    #[test]
    fn test_failed_save_and_restore_clears_slots() {
        let storage = FlakyStorage::failing(0);
        let store = SessionStore::new(storage.clone());
        store.save("old", Some(r#"{"id":1}"#)).unwrap();

        // The write and the restore both fail; the clear then succeeds
        storage.failures.store(2, Ordering::SeqCst);
        assert!(store.save("new", None).is_err());

        assert!(store.read_token().is_none());
        assert!(store.read_user().is_none());
    }

    #[test]
    fn test_file_storage_applies_changes_in_one_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));
        storage.set(USER_KEY, "stale").unwrap();

        storage
            .apply(&[(TOKEN_KEY, Some("tok")), (USER_KEY, None)])
            .unwrap();
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok"));
        assert!(storage.get(USER_KEY).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("quizdesk");
        let path = nested.join("session.json");
        SessionStore::file(&path).save("tok", None).unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), 0o600);
        assert_eq!(mode(&nested), 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_session_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        SessionStore::file(&path).save("tok", None).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_has_token_ignores_empty() {
        let store = SessionStore::in_memory();
        assert!(!store.has_token());
        store.save("", None).unwrap();
        assert!(!store.has_token());
        store.save("t", None).unwrap();
        assert!(store.has_token());
    }
}
