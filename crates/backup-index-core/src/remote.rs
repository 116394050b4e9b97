use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Where synchronized bytes end up. Implementations own the transfer; the catalog only
/// records whether it worked.
pub trait RemoteStore: Send + Sync {
    fn upload(&self, local: &Path, remote_name: &str) -> Result<()>;
    fn download(&self, remote_name: &str, dest: &Path) -> Result<()>;
}

/// Remote store backed by a plain directory, e.g. a mounted backup disk.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn remote_path(&self, remote_name: &str) -> Result<PathBuf> {
        let relative = Path::new(remote_name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Transfer(format!(
                "remote name '{}' escapes the store root",
                remote_name
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl RemoteStore for LocalDirStore {
    fn upload(&self, local: &Path, remote_name: &str) -> Result<()> {
        let target = self.remote_path(remote_name)?;
        copy_file(local, &target)
            .map_err(|e| Error::Transfer(format!("upload of {}: {}", remote_name, e)))?;
        trace!("Uploaded {} -> {}", local.display(), target.display());
        Ok(())
    }

    fn download(&self, remote_name: &str, dest: &Path) -> Result<()> {
        let source = self.remote_path(remote_name)?;
        copy_file(&source, dest)
            .map_err(|e| Error::Transfer(format!("download of {}: {}", remote_name, e)))?;
        trace!("Downloaded {} -> {}", source.display(), dest.display());
        Ok(())
    }
}

fn copy_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_upload_then_download() {
        let local = tempdir().unwrap();
        let remote = tempdir().unwrap();
        let store = LocalDirStore::new(remote.path());

        let source = local.path().join("a.txt");
        fs::write(&source, b"payload").unwrap();
        store.upload(&source, "nested/a.txt").unwrap();
        assert_eq!(
            fs::read(remote.path().join("nested").join("a.txt")).unwrap(),
            b"payload"
        );

        let restored = local.path().join("restore").join("a.txt");
        store.download("nested/a.txt", &restored).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"payload");
    }

    #[test]
    fn test_upload_of_missing_file_fails() {
        let remote = tempdir().unwrap();
        let store = LocalDirStore::new(remote.path());
        let result = store.upload(Path::new("/no/such/file"), "file");
        assert!(matches!(result, Err(Error::Transfer(_))));
    }

    #[test]
    fn test_remote_name_cannot_escape_root() {
        let remote = tempdir().unwrap();
        let store = LocalDirStore::new(remote.path());
        assert!(store.remote_path("../outside").is_err());
        assert!(store.remote_path("/etc/passwd").is_err());
        assert!(store.remote_path("ok/inside.txt").is_ok());
    }
}
