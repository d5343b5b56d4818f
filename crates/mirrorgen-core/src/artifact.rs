//! Writing generated packages to disk.

use std::path::PathBuf;

use mirrorgen_registry::RegistryEntry;
use mirrorgen_utils::fs::{FileSystemProvider, StandardFileSystemProvider};
use tracing::debug;

use crate::{batch::Batch, error::BatchError, manifest::PackageManifest};

pub const MANIFEST_FILE: &str = "package.json";
pub const ENTRY_FILE: &str = "index.js";
pub const README_FILE: &str = "README.md";

const ENTRY_STUB: &str = "// Generated package. It exists only to depend on its dependencies.\n";

const README_TEXT: &str = "A generated package that depends on a slice of the registry, \
kept as a backup in case any of them is unpublished.\n";

/// A package directory ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub name: String,
    pub path: PathBuf,
}

/// Destination for generated packages.
pub trait ArtifactSink: Send + Sync {
    /// Materializes `manifest` for `batch` and returns where it landed.
    ///
    /// Writing the same manifest twice must leave the same result.
    fn write(
        &self,
        batch: &Batch<RegistryEntry>,
        manifest: &PackageManifest,
    ) -> Result<ArtifactHandle, BatchError>;
}

/// Writes each package into `<root>/<name>/`.
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
    readme: bool,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            readme: true,
        }
    }

    pub fn with_readme(mut self, readme: bool) -> Self {
        self.readme = readme;
        self
    }

}

impl ArtifactSink for FsArtifactSink {
    fn write(
        &self,
        batch: &Batch<RegistryEntry>,
        manifest: &PackageManifest,
    ) -> Result<ArtifactHandle, BatchError> {
        let fs = StandardFileSystemProvider;
        let dir = self.root.join(&manifest.name);
        fs.ensure_dir_exists(&dir)?;

        fs.write_file(dir.join(MANIFEST_FILE), manifest.to_json()?)?;
        fs.write_file(dir.join(ENTRY_FILE), ENTRY_STUB)?;

        let readme = dir.join(README_FILE);
        if self.readme {
            fs.write_file(&readme, README_TEXT)?;
        } else {
            fs.safe_remove(&readme)?;
        }

        let path = fs.absolute(&dir)?;
        debug!(
            name = %manifest.name,
            batch = batch.index,
            path = %path.display(),
            "wrote artifact"
        );

        Ok(ArtifactHandle {
            name: manifest.name.clone(),
            path,
        })
    }
}
