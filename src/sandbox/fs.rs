/*!
 * Guarded Filesystem Operations
 * Every entry point resolves through the path resolver before touching disk
 *
 * Operations run against the canonical path a decision carried, never the
 * raw candidate, so an Allow cannot be reinterpreted by a second resolution.
 */

use super::audit::{EventLog, SecurityEvent};
use super::path::PathResolver;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::{Decision, OperationKind};
use log::warn;
use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem handle confined to the sandbox root
///
/// Cloned handles share the same resolver and logical working directory.
#[derive(Clone)]
pub struct GuardedFs {
    resolver: Arc<PathResolver>,
    events: EventLog,
}

impl GuardedFs {
    pub(crate) fn new(resolver: Arc<PathResolver>, events: EventLog) -> Self {
        Self { resolver, events }
    }

    /// Resolve or fail with `PathEscape` before any I/O syscall executes
    fn checked(&self, candidate: &Path, kind: OperationKind) -> SandboxResult<PathBuf> {
        match self.resolver.require(candidate, kind) {
            Ok(canonical) => Ok(canonical),
            Err(err) => {
                if let SandboxError::PathEscape {
                    operation,
                    attempted,
                    ..
                } = &err
                {
                    warn!("denied {} of {:?}: outside sandbox root", operation, attempted);
                    self.events.record(SecurityEvent::PathDenied {
                        operation: *operation,
                        attempted: attempted.clone(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Open an existing file for reading
    pub fn open(&self, path: impl AsRef<Path>) -> SandboxResult<File> {
        let canonical = self.checked(path.as_ref(), OperationKind::Read)?;
        File::open(canonical).map_err(SandboxError::from)
    }

    /// Create (or truncate) a file for writing
    pub fn create(&self, path: impl AsRef<Path>) -> SandboxResult<File> {
        let canonical = self.checked(path.as_ref(), OperationKind::Create)?;
        File::create(canonical).map_err(SandboxError::from)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> SandboxResult<Vec<u8>> {
        let canonical = self.checked(path.as_ref(), OperationKind::Read)?;
        fs::read(canonical).map_err(SandboxError::from)
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> SandboxResult<String> {
        let canonical = self.checked(path.as_ref(), OperationKind::Read)?;
        fs::read_to_string(canonical).map_err(SandboxError::from)
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Write)?;
        fs::write(canonical, contents).map_err(SandboxError::from)
    }

    pub fn create_dir(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Create)?;
        fs::create_dir(canonical).map_err(SandboxError::from)
    }

    pub fn create_dir_all(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Create)?;
        fs::create_dir_all(canonical).map_err(SandboxError::from)
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Delete)?;
        fs::remove_file(canonical).map_err(SandboxError::from)
    }

    pub fn remove_dir(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Delete)?;
        fs::remove_dir(canonical).map_err(SandboxError::from)
    }

    pub fn remove_dir_all(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::Delete)?;
        fs::remove_dir_all(canonical).map_err(SandboxError::from)
    }

    /// Rename within the root; both endpoints are resolved
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> SandboxResult<()> {
        let from = self.checked(from.as_ref(), OperationKind::Delete)?;
        let to = self.checked(to.as_ref(), OperationKind::Create)?;
        fs::rename(from, to).map_err(SandboxError::from)
    }

    /// Copy within the root; both endpoints are resolved
    pub fn copy(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> SandboxResult<u64> {
        let from = self.checked(from.as_ref(), OperationKind::Read)?;
        let to = self.checked(to.as_ref(), OperationKind::Create)?;
        fs::copy(from, to).map_err(SandboxError::from)
    }

    pub fn metadata(&self, path: impl AsRef<Path>) -> SandboxResult<Metadata> {
        let canonical = self.checked(path.as_ref(), OperationKind::Read)?;
        fs::metadata(canonical).map_err(SandboxError::from)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> SandboxResult<bool> {
        let canonical = self.checked(path.as_ref(), OperationKind::Read)?;
        Ok(canonical.exists())
    }

    /// List the entries of a directory inside the root
    pub fn list_dir(&self, path: impl AsRef<Path>) -> SandboxResult<Vec<PathBuf>> {
        let canonical = self.checked(path.as_ref(), OperationKind::List)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(canonical)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    /// Recursively list everything under a directory inside the root.
    ///
    /// Directory symlinks are listed but only descended into when their
    /// target resolves inside the root. Each canonical directory is visited
    /// at most once, so symlink cycles terminate and a directory reachable
    /// both directly and through a link is not reported twice.
    pub fn walk(&self, path: impl AsRef<Path>) -> SandboxResult<Vec<PathBuf>> {
        let start = self.checked(path.as_ref(), OperationKind::List)?;
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(start.clone());
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let entry_path = entry.path();
                let file_type = entry.file_type()?;
                found.push(entry_path.clone());
                if file_type.is_dir() {
                    if visited.insert(entry_path.clone()) {
                        pending.push(entry_path);
                    }
                } else if file_type.is_symlink() {
                    if let Decision::Allow(real) =
                        self.resolver.resolve(&entry_path, OperationKind::List)
                    {
                        if real.is_dir() && visited.insert(real.clone()) {
                            pending.push(real);
                        }
                    }
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// The logical working directory used to resolve relative candidates
    #[must_use]
    pub fn current_dir(&self) -> PathBuf {
        self.resolver.current_dir()
    }

    /// Change the logical working directory. Confined to the root; the
    /// process working directory is never touched.
    pub fn set_current_dir(&self, path: impl AsRef<Path>) -> SandboxResult<()> {
        let canonical = self.checked(path.as_ref(), OperationKind::ChangeDir)?;
        if !canonical.is_dir() {
            return Err(SandboxError::Io(format!(
                "not a directory: {}",
                canonical.display()
            )));
        }
        self.resolver.set_current_dir(canonical);
        Ok(())
    }
}
