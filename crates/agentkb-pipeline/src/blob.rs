//! Storage for uploaded document bytes.
//!
//! Documents are kept so an interrupted or failed ingestion can be run
//! again without asking the user to upload the file a second time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from a blob store.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob storage temporarily unavailable: {0}")]
    TransientIo(#[source] std::io::Error),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Where uploaded bytes live until they are deleted.
pub trait BlobStore: Send + Sync {
    /// Location `put` will store `file_name` of `tenant_id` at. Nothing is
    /// written.
    fn location(&self, tenant_id: &str, file_name: &str) -> BlobResult<String>;

    /// Store `bytes` for `tenant_id` and return their location.
    fn put(&self, tenant_id: &str, file_name: &str, bytes: &[u8]) -> BlobResult<String>;

    fn read(&self, location: &str) -> BlobResult<Vec<u8>>;

    /// Remove one blob. Removing a missing blob is not an error.
    fn delete(&self, location: &str) -> BlobResult<()>;

    /// Remove every blob of a tenant.
    fn delete_tenant(&self, tenant_id: &str) -> BlobResult<()>;
}

/// Blob store on the local file system, laid out as `{root}/{tenant}/{file}`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tenant_dir(&self, tenant_id: &str) -> BlobResult<PathBuf> {
        Ok(self.root.join(safe_name(tenant_id)?))
    }

    fn blob_path(&self, tenant_id: &str, file_name: &str) -> BlobResult<PathBuf> {
        Ok(self.tenant_dir(tenant_id)?.join(safe_name(file_name)?))
    }
}

/// Reduce a name to its final path component.
fn safe_name(name: &str) -> BlobResult<String> {
    let last = name
        .rsplit(&['/', '\\'][..])
        .next()
        .map(str::trim)
        .unwrap_or_default();

    if last.is_empty() || last == "." || last == ".." {
        return Err(BlobError::InvalidName(name.to_string()));
    }
    Ok(last.to_string())
}

fn io_error(location: &str, err: std::io::Error) -> BlobError {
    if err.kind() == ErrorKind::NotFound {
        BlobError::NotFound(location.to_string())
    } else {
        BlobError::TransientIo(err)
    }
}

impl BlobStore for LocalBlobStore {
    fn location(&self, tenant_id: &str, file_name: &str) -> BlobResult<String> {
        Ok(self.blob_path(tenant_id, file_name)?.to_string_lossy().into_owned())
    }

    fn put(&self, tenant_id: &str, file_name: &str, bytes: &[u8]) -> BlobResult<String> {
        let dir = self.tenant_dir(tenant_id)?;
        let path = self.blob_path(tenant_id, file_name)?;

        std::fs::create_dir_all(&dir).map_err(BlobError::TransientIo)?;
        std::fs::write(&path, bytes).map_err(BlobError::TransientIo)?;

        debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(path.to_string_lossy().into_owned())
    }

    fn read(&self, location: &str) -> BlobResult<Vec<u8>> {
        std::fs::read(location).map_err(|e| io_error(location, e))
    }

    fn delete(&self, location: &str) -> BlobResult<()> {
        match std::fs::remove_file(location) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::TransientIo(e)),
        }
    }

    fn delete_tenant(&self, tenant_id: &str) -> BlobResult<()> {
        let dir = self.tenant_dir(tenant_id)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::TransientIo(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(safe_name("../../etc/passwd.pdf").unwrap(), "passwd.pdf");
        assert_eq!(safe_name("C:\\Users\\me\\deck.pptx").unwrap(), "deck.pptx");
        assert!(safe_name("..").is_err());
        assert!(safe_name("docs/").is_err());
        assert!(safe_name("  ").is_err());
    }

    #[test]
    fn test_put_read_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let planned = store.location("agent-1", "notes.docx").unwrap();
        assert!(!Path::new(&planned).exists());

        let location = store.put("agent-1", "notes.docx", b"PK\x03\x04").unwrap();
        assert_eq!(location, planned);
        assert!(location.starts_with(dir.path().to_str().unwrap()));
        assert_eq!(store.read(&location).unwrap(), b"PK\x03\x04");

        store.delete(&location).unwrap();
        assert!(matches!(store.read(&location), Err(BlobError::NotFound(_))));
        store.delete(&location).unwrap();
    }

    #[test]
    fn test_delete_tenant() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let a = store.put("agent-a", "a.pdf", b"a").unwrap();
        let b = store.put("agent-b", "b.pdf", b"b").unwrap();

        store.delete_tenant("agent-a").unwrap();
        assert!(store.read(&a).is_err());
        assert_eq!(store.read(&b).unwrap(), b"b");

        store.delete_tenant("agent-a").unwrap();
    }
}
