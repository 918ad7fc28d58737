// Byte storage for lesson attachments. Rows in `lesson_files` reference keys
// in here; removal ordering (bytes before rows) lives with the callers.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()))
    }

    /// Storage key for an attachment, namespaced per lesson.
    pub fn stored_name(lesson_id: i64, filename: &str) -> String {
        format!("lessons/{}/{}", lesson_id, filename)
    }

    pub fn store(&self, stored_name: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(stored_name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Best-effort removal: an already-absent file is not an error, and other
    /// failures are logged rather than propagated so cleanup can proceed.
    pub fn delete(&self, stored_name: &str) {
        let path = match self.resolve(stored_name) {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(stored_name, "refusing to delete unresolvable storage key");
                return;
            }
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, stored_name, "failed to delete stored file"),
        }
    }

    pub fn retrieve(&self, stored_name: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(stored_name)?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AppError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    // Storage keys are relative paths under the root; anything absolute or
    // containing non-normal components is treated as nonexistent.
    fn resolve(&self, stored_name: &str) -> Result<PathBuf, AppError> {
        let rel = Path::new(stored_name);
        let safe = !rel.as_os_str().is_empty()
            && !rel.is_absolute()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::NotFound);
        }
        Ok(self.root.join(rel))
    }
}

/// Reduce an upload name to a single safe path segment: keep the final
/// segment, restrict to `[A-Za-z0-9._-]`, drop leading dots.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        "file".into()
    } else {
        clean.to_string()
    }
}
