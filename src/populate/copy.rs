use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{create_dir_all, try_exists};
use tracing::{debug, error, warn};

use crate::maven::paths::{escapes_base, relativize, sibling_pom_path};
use crate::populate::artifact_store::FinishedArtifactStore;
use crate::resolve::resolver::{DependencyResult, ResolvedArtifact};

#[async_trait]
pub trait FileCopier: Send + Sync {
    /// copies `from` to `to`, creating `to`'s parent directories as needed
    async fn copy(&self, from: &Path, to: &Path) -> anyhow::Result<()>;
}

pub struct FsFileCopier {}

#[async_trait]
impl FileCopier for FsFileCopier {
    async fn copy(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        if let Some(dir) = to.parent() {
            create_dir_all(dir).await?;
        }
        tokio::fs::copy(from, to).await?;
        Ok(())
    }
}

/// Materializes resolved artifacts and their POMs in the output directory, using the layout
///  computed by the store
pub struct CopyDependencyFiles<'a, C: FileCopier + ?Sized> {
    copier: &'a C,
    store: &'a FinishedArtifactStore,
    local_repository: &'a Path,
}

impl <'a, C: FileCopier + ?Sized> CopyDependencyFiles<'a, C> {
    pub fn new(copier: &'a C, store: &'a FinishedArtifactStore, local_repository: &'a Path) -> CopyDependencyFiles<'a, C> {
        CopyDependencyFiles {
            copier,
            store,
            local_repository,
        }
    }

    /// Returns the number of files copied. Failures are logged, they do not stop the copying.
    pub async fn copy_all(&self, dependency_results: &[DependencyResult]) -> usize {
        let mut num_copied = 0;
        for result in dependency_results {
            for artifact in result.artifacts() {
                num_copied += self.copy_artifact(artifact).await;
            }
        }
        num_copied
    }

    async fn copy_artifact(&self, artifact: &ResolvedArtifact) -> usize {
        if escapes_base(&relativize(self.local_repository, &artifact.file)) {
            warn!("{} is not inside the local repository {}, not copying it.",
                  artifact.file.display(), self.local_repository.display());
            return 0;
        }

        let mut num_copied = 0;
        let target = self.store.output_relative_path(&artifact.file);
        if self.copy_file(&artifact.file, &target).await {
            num_copied += 1;
        }

        let pom = sibling_pom_path(&artifact.file, &artifact.artifact.coordinates);
        match try_exists(&pom).await {
            Ok(true) => {
                let pom_target = self.store.output_relative_path(&pom);
                if self.copy_file(&pom, &pom_target).await {
                    num_copied += 1;
                }
            }
            Ok(false) => debug!("{} has no POM", artifact.artifact),
            Err(e) => error!("could not check for POM {}: {}", pom.display(), e),
        }
        num_copied
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> bool {
        debug!("copying {} to {}", from.display(), to.display());
        match self.copier.copy(from, to).await {
            Ok(_) => true,
            Err(e) => {
                error!("failed to copy {} to {}: {:#}", from.display(), to.display(), e);
                false
            }
        }
    }
}
