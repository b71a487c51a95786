/*!
 * Sandbox Path Resolution
 * Canonicalizes candidates against the root before rendering a decision
 *
 * Lexical `..` collapsing alone is not enough: a symlink inside the root can
 * point anywhere, so every existing component is resolved to its real path
 * before the root-prefix check.
 */

use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::{Decision, DenyReason, OperationKind};
use log::trace;
use parking_lot::Mutex;
use path_clean::PathClean;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Absolute, canonicalized directory fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxRoot {
    canonical: PathBuf,
}

impl SandboxRoot {
    /// Validate and canonicalize the root. It must exist and be a directory.
    pub fn new(path: &Path) -> SandboxResult<Self> {
        let canonical = path
            .canonicalize()
            .map_err(|e| SandboxError::InvalidRoot(format!("{}: {}", path.display(), e)))?;
        if !canonical.is_dir() {
            return Err(SandboxError::InvalidRoot(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        Ok(Self { canonical })
    }

    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.canonical
    }
}

/// Resolves candidate paths to canonical real paths and decides allow/deny
///
/// Relative candidates join against a logical working directory that starts
/// at the root and only moves via guarded chdir, never the process cwd.
pub struct PathResolver {
    root: SandboxRoot,
    cwd: Mutex<PathBuf>,
}

impl PathResolver {
    #[must_use]
    pub fn new(root: SandboxRoot) -> Self {
        let cwd = Mutex::new(root.canonical.clone());
        Self { root, cwd }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// The logical working directory (canonical, always inside the root)
    #[must_use]
    pub fn current_dir(&self) -> PathBuf {
        self.cwd.lock().clone()
    }

    /// Move the logical working directory. The caller must have resolved
    /// `canonical` through this resolver first.
    pub(crate) fn set_current_dir(&self, canonical: PathBuf) {
        *self.cwd.lock() = canonical;
    }

    /// Resolve a candidate to its canonical real path and decide.
    ///
    /// Never fails for malformed input: every outcome is a `Decision`.
    pub fn resolve(&self, candidate: &Path, kind: OperationKind) -> Decision {
        if candidate.as_os_str().is_empty() {
            return Decision::Deny {
                attempted: PathBuf::new(),
                reason: DenyReason::EmptyPath,
            };
        }

        let mut resolved = if candidate.is_absolute() {
            PathBuf::new()
        } else {
            self.cwd.lock().clone()
        };

        for component in candidate.components() {
            match component {
                Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
                Component::RootDir => resolved = PathBuf::from(component.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    // Applied to the already-resolved prefix, so `..` after a
                    // symlinked directory climbs from the link target.
                    resolved.pop();
                }
                Component::Normal(name) => {
                    resolved.push(name);
                    match resolved.canonicalize() {
                        Ok(real) => resolved = real,
                        Err(_) => {
                            // A dangling symlink may still point outside the
                            // root; creating through it would materialize the
                            // target. Deny rather than trust the lexical name.
                            let is_symlink = fs::symlink_metadata(&resolved)
                                .map(|m| m.file_type().is_symlink())
                                .unwrap_or(false);
                            if is_symlink {
                                return Decision::Deny {
                                    attempted: resolved.clean(),
                                    reason: DenyReason::UnresolvableSymlink,
                                };
                            }
                            // Non-existent leaf: parents are already
                            // canonical, keep the literal name.
                        }
                    }
                }
            }
        }

        if resolved.starts_with(self.root.as_path()) {
            trace!("allow {} of {:?} -> {:?}", kind, candidate, resolved);
            Decision::Allow(resolved)
        } else {
            Decision::Deny {
                attempted: resolved.clean(),
                reason: DenyReason::OutsideRoot,
            }
        }
    }

    /// Resolve, converting a denial into a `PathEscape` error at the point
    /// of use
    pub fn require(&self, candidate: &Path, kind: OperationKind) -> SandboxResult<PathBuf> {
        match self.resolve(candidate, kind) {
            Decision::Allow(canonical) => Ok(canonical),
            Decision::Deny { attempted, .. } => Err(SandboxError::PathEscape {
                operation: kind,
                attempted,
                root: self.root.as_path().to_path_buf(),
            }),
        }
    }
}
