use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::maven::coordinates::MavenArtifactRef;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One physical file in the local repository, identified by its full variant key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub artifact: MavenArtifactRef,
    pub file: PathBuf,
}

/// The outcome of resolving one requested artifact: the artifact itself plus everything that is
///  reachable from it through its descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyResult {
    pub root: ResolvedArtifact,
    pub transitive: Vec<ResolvedArtifact>,
}
impl DependencyResult {
    /// the root artifact first, followed by the transitive closure in resolution order
    pub fn artifacts(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        std::iter::once(&self.root).chain(self.transitive.iter())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// the artifact (or one of its transitive dependencies) does not exist in any repository
    #[error("could not find artifact {0}")]
    ArtifactNotFound(MavenArtifactRef),
    #[error("invalid descriptor for {artifact}")]
    Descriptor {
        artifact: MavenArtifactRef,
        #[source]
        source: BoxedError,
    },
    #[error("failed to retrieve {artifact}")]
    Transport {
        artifact: MavenArtifactRef,
        #[source]
        source: BoxedError,
    },
}
impl ResolveError {
    pub fn descriptor(artifact: &MavenArtifactRef, source: anyhow::Error) -> ResolveError {
        ResolveError::Descriptor {
            artifact: artifact.clone(),
            source: source.into(),
        }
    }

    pub fn transport(artifact: &MavenArtifactRef, source: anyhow::Error) -> ResolveError {
        ResolveError::Transport {
            artifact: artifact.clone(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::ArtifactNotFound(_))
    }
}

/// The repository system: resolves an artifact together with its transitive closure.
#[async_trait]
pub trait RepositoryResolver: Send + Sync {
    async fn resolve(&self, artifact_ref: &MavenArtifactRef) -> Result<DependencyResult, ResolveError>;
}
