//! Object stores for transcoded outputs.
//!
//! Each transcode gets its own session; the session hands back a reference
//! the submitter can fetch the output from.
//!
//! - [`MemoryStore`]: process-local, references are `memory://<session>/<name>`
//! - [`FsStore`]: directory-backed, `<root>/<session>/<name>`, atomic
//!   write-to-temp-then-rename, references are `file://` URLs

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::orchestrator::{OutputSession, StoreError};

/// A backend that can open output sessions.
pub trait ObjectStore: Send + Sync {
    /// Open a session. `None` picks a fresh unique name.
    fn new_session(&self, name: Option<&str>) -> Result<Arc<dyn OutputSession>, StoreError>;
}

fn session_name(name: Option<&str>) -> Result<String, StoreError> {
    match name {
        Some(name) => {
            validate_name(name)?;
            Ok(name.to_string())
        }
        None => Ok(uuid::Uuid::new_v4().simple().to_string()),
    }
}

/// Accept only relative paths made of normal components.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let path = Path::new(name);
    let valid = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

type Objects = HashMap<String, HashMap<String, Vec<u8>>>;

/// Process-local object store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<Objects>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored object.
    pub fn get(&self, session: &str, name: &str) -> Option<Vec<u8>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.get(session)?.get(name).cloned()
    }

    /// Fetch an object by the reference `save_data` returned.
    pub fn get_url(&self, url: &str) -> Option<Vec<u8>> {
        let rest = url.strip_prefix("memory://")?;
        let (session, name) = rest.split_once('/')?;
        self.get(session, name)
    }
}

impl ObjectStore for MemoryStore {
    fn new_session(&self, name: Option<&str>) -> Result<Arc<dyn OutputSession>, StoreError> {
        Ok(Arc::new(MemorySession {
            objects: Arc::clone(&self.objects),
            session: session_name(name)?,
        }))
    }
}

struct MemorySession {
    objects: Arc<RwLock<Objects>>,
    session: String,
}

impl OutputSession for MemorySession {
    fn save_data(&self, name: &str, data: &[u8]) -> Result<String, StoreError> {
        validate_name(name)?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects
            .entry(self.session.clone())
            .or_default()
            .insert(name.to_string(), data.to_vec());
        Ok(format!("memory://{}/{}", self.session, name))
    }
}

/// Directory-backed object store.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store at `root`, creating it if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        fs::create_dir_all(root.as_ref())?;
        let root = root.as_ref().canonicalize()?;

        // Verify the store is writable
        let probe = root.join(".store_test");
        File::create(&probe)?;
        fs::remove_file(&probe)?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for FsStore {
    fn new_session(&self, name: Option<&str>) -> Result<Arc<dyn OutputSession>, StoreError> {
        let dir = self.root.join(session_name(name)?);
        fs::create_dir_all(&dir)?;
        Ok(Arc::new(FsSession {
            dir,
            temp_dir: self.root.join(".tmp"),
        }))
    }
}

struct FsSession {
    dir: PathBuf,
    temp_dir: PathBuf,
}

impl FsSession {
    fn write_atomic(&self, final_path: &Path, data: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.temp_dir)?;
        let temp_path = self
            .temp_dir
            .join(format!(".tmp.{}", uuid::Uuid::new_v4().simple()));

        let written = File::create(&temp_path).and_then(|mut f| {
            f.write_all(data)?;
            f.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }

        if let Some(parent) = final_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                let _ = fs::remove_file(&temp_path);
                return Err(StoreError::Io(e));
            }
        }
        if let Err(e) = fs::rename(&temp_path, final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

impl OutputSession for FsSession {
    fn save_data(&self, name: &str, data: &[u8]) -> Result<String, StoreError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        self.write_atomic(&path, data)?;
        Ok(format!("file://{}", path.display()))
    }
}
