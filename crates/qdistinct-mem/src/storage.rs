//! Abstract storage interface for storage-backed key stores.
//!
//! Implemented by `qdistinct-io::FsStorage` for the local filesystem and by
//! `qdistinct-io::MemoryStorage` for tests.

use crate::error::Result;

pub trait Storage: Send + Sync {
    /// Write bytes to a path. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a byte range from a path. May return fewer bytes at end of file.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Get size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;

    /// Whether a path currently exists.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Delete everything under a prefix. Idempotent.
    fn delete_prefix(&self, prefix: &str) -> Result<()> {
        for path in self.list(prefix)? {
            self.delete(&path)?;
        }
        Ok(())
    }

    /// Read a whole path.
    fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let len = self.size(path)?;
        self.read_range(path, 0, len as usize)
    }
}
