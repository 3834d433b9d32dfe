//! Per-invocation sandbox the engine sees as its filesystem.
//!
//! Each run gets a fresh temporary directory mounted at `/` (and `.`) in the
//! guest. Hooks stage inputs into it before the engine starts and read
//! results back after it exits. The directory is removed when the
//! [`VirtualFs`] is dropped.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

use crate::error::Error;

#[derive(Debug)]
pub struct VirtualFs {
    dir: TempDir,
}

impl VirtualFs {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("warthog-sandbox-")
            .tempdir()
            .context("failed to create sandbox directory")?;
        Ok(Self { dir })
    }

    /// Host directory backing the sandbox.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Map a guest path (`/maps/a.map` or `maps/a.map`) onto the host.
    pub fn host_path(&self, guest: &str) -> Result<PathBuf> {
        let mut resolved = self.root().to_path_buf();
        for component in Path::new(guest).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(Error::InvalidPath {
                        path: guest.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(resolved)
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, guest: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.host_path(guest)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent of {guest}"))?;
        }
        std::fs::write(&path, contents).with_context(|| format!("failed to write {guest}"))
    }

    pub fn read(&self, guest: &str) -> Result<Vec<u8>> {
        let path = self.host_path(guest)?;
        std::fs::read(&path).with_context(|| format!("failed to read {guest}"))
    }

    pub fn read_to_string(&self, guest: &str) -> Result<String> {
        let path = self.host_path(guest)?;
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {guest}"))
    }

    pub fn exists(&self, guest: &str) -> bool {
        self.host_path(guest).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn create_dir_all(&self, guest: &str) -> Result<()> {
        let path = self.host_path(guest)?;
        std::fs::create_dir_all(&path).with_context(|| format!("failed to create {guest}"))
    }

    pub fn remove_file(&self, guest: &str) -> Result<()> {
        let path = self.host_path(guest)?;
        std::fs::remove_file(&path).with_context(|| format!("failed to remove {guest}"))
    }

    /// Entry names in a sandbox directory, sorted.
    pub fn list(&self, guest_dir: &str) -> Result<Vec<String>> {
        let path = self.host_path(guest_dir)?;
        let mut names = std::fs::read_dir(&path)
            .with_context(|| format!("failed to list {guest_dir}"))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }
}
