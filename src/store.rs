use crate::errors::{AppError, ResultExt};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Local append-only JSON array file of previously fetched records.
///
/// No schema versioning, no deduplication, no size bound. Appends within this
/// process are serialized by a lock and each write replaces the file through a
/// temp-file rename, so concurrent requests cannot lose updates or leave a
/// torn file behind.
#[derive(Clone)]
pub struct JsonArrayStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonArrayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored record. A missing file is an empty store; a file
    /// that is not a JSON array is treated as empty and overwritten on the
    /// next append.
    pub async fn load(&self) -> Result<Vec<Value>, AppError> {
        let _guard = self.lock.lock().await;
        self.read_records().await
    }

    /// Appends one record and returns the new length of the array.
    pub async fn append<T: Serialize>(&self, record: &T) -> Result<usize, AppError> {
        let value = serde_json::to_value(record)?;

        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;
        records.push(value);
        write_json_file(&self.path, &records)
            .await
            .with_context(|| format!("appending to {}", self.path.display()))?;

        tracing::info!(
            "Record appended to {} ({} total)",
            self.path.display(),
            records.len()
        );
        Ok(records.len())
    }

    async fn read_records(&self) -> Result<Vec<Value>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context(format!("reading {}", self.path.display())),
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    "{} is not a JSON array ({}), starting a new one",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Writes `value` as pretty JSON to `path`, creating parent directories and
/// replacing any existing file atomically.
pub async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = temp_path_for(path);
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}
