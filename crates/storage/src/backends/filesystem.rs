//! Filesystem-based package store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hatch_types::InstalledPackageRecord;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::traits::PackageStore;

/// Filesystem-based package store.
///
/// Each record is a pretty-printed JSON document named after the SHA-256 of
/// its identifier, so any identifier maps to a safe file name.
///
/// Directory structure:
/// ```text
/// root/
/// +-- records/
///     +-- {sha256(id)}.json
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemPackageStore {
    root_path: PathBuf,
}

impl FilesystemPackageStore {
    /// Create a store rooted at `root_path`. Directories are created lazily.
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
        }
    }

    /// Create a store scoped to one origin below `data_dir`.
    ///
    /// Records written through stores for different origins never see each
    /// other.
    pub fn for_origin<P: AsRef<Path>>(data_dir: P, origin: &str) -> Self {
        Self::new(data_dir.as_ref().join(sanitize_origin(origin)))
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn records_dir(&self) -> PathBuf {
        self.root_path.join("records")
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.records_dir().join(format!("{}.json", hash_id(id)))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<InstalledPackageRecord>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io("read record", path)(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupted {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl PackageStore for FilesystemPackageStore {
    async fn put(&self, record: &InstalledPackageRecord) -> Result<()> {
        let dir = self.records_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::io("create records directory", &dir))?;

        let content =
            serde_json::to_vec_pretty(record).map_err(|source| StorageError::Serialization {
                id: record.id.clone(),
                source,
            })?;

        // Readers only ever see a complete record: write aside, then rename.
        let path = self.record_path(&record.id);
        let tmp_path = dir.join(format!(
            "{}.{}.tmp",
            hash_id(&record.id),
            uuid::Uuid::new_v4()
        ));

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(StorageError::io("create temporary record", &tmp_path))?;
        file.write_all(&content)
            .await
            .map_err(StorageError::io("write temporary record", &tmp_path))?;
        file.sync_all()
            .await
            .map_err(StorageError::io("sync temporary record", &tmp_path))?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::io("replace record", &path)(e));
        }

        debug!(id = %record.id, version = %record.version, "Stored package record");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<InstalledPackageRecord>> {
        self.read_record(&self.record_path(id)).await
    }

    async fn get_all(&self) -> Result<Vec<InstalledPackageRecord>> {
        let dir = self.records_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("list records", &dir)(e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StorageError::io("list records", &dir))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match self.read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable package record: {}", e),
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.record_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%id, "Deleted package record");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("delete record", &path)(e)),
        }
    }
}

fn hash_id(id: &str) -> String {
    format!("{:x}", Sha256::digest(id.as_bytes()))
}

fn sanitize_origin(origin: &str) -> String {
    let sanitized: String = origin
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    match sanitized.trim_matches('.') {
        "" => "default".to_string(),
        trimmed => trimmed.to_string(),
    }
}
