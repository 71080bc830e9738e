//! Sandbox mount capability.
//!
//! The engine hands every fresh [`MountDescriptor`] to a [`Mount`]. Failures are
//! reported back but never roll back the workspace tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::projector::{MountDescriptor, MountEntry};

/// Abstraction over sandboxed runtimes that accept a mount descriptor.
pub trait Mount {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<()>;
}

impl<M: Mount + ?Sized> Mount for &M {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<()> {
        (**self).mount(descriptor)
    }
}

/// Materializes descriptors onto a local directory.
///
/// Existing files are overwritten; nothing is ever removed.
#[derive(Debug, Clone)]
pub struct DirectoryMount {
    root: PathBuf,
}

impl DirectoryMount {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Mount for DirectoryMount {
    #[instrument(skip_all, fields(root = %self.root.display(), entries = descriptor.len()))]
    fn mount(&self, descriptor: &MountDescriptor) -> Result<()> {
        write_entries(&self.root, descriptor)?;
        debug!("descriptor mounted");
        Ok(())
    }
}

fn write_entries(dir: &Path, entries: &MountDescriptor) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    for (name, entry) in entries {
        let target = dir.join(name);
        match entry {
            MountEntry::File { contents } => {
                fs::write(&target, contents)
                    .with_context(|| format!("write {}", target.display()))?;
            }
            MountEntry::Directory(children) => write_entries(&target, children)?,
        }
    }
    Ok(())
}
