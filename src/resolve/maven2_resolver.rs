use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs::{metadata, read_to_string, try_exists};
use tracing::{debug, trace, warn};

use crate::config::{RepositoryConfig, UpdatePolicy};
use crate::maven::coordinates::*;
use crate::maven::paths::as_maven_path;
use crate::maven::pom::{parse_pom, Exclusion, PomDescriptor};
use crate::maven::remote_repo::RemoteMavenRepo;
use crate::resolve::resolver::{DependencyResult, RepositoryResolver, ResolveError, ResolvedArtifact};

/// Resolves artifacts from a Maven2 layout local repository, downloading missing files from
///  remote repositories into it.
///
/// The transitive closure is computed by walking POM files breadth first; the nearest
///  declaration of a (groupId, artifactId) pair wins.
pub struct Maven2RepositoryResolver {
    local_repository: PathBuf,
    remote_repositories: Vec<RemoteMavenRepo>,
    ignore_artifact_descriptor_repositories: bool,
    update_policy: UpdatePolicy,
}

impl Maven2RepositoryResolver {
    pub fn new(config: &RepositoryConfig) -> anyhow::Result<Maven2RepositoryResolver> {
        let mut remote_repositories = vec![];
        if let Some(remote) = &config.remote_repository {
            let mut repo = RemoteMavenRepo::new(&remote.name, remote.url.clone())?;
            if let Some((username, password)) = remote.credentials() {
                repo = repo.with_credentials(username, password);
            }
            remote_repositories.push(repo);
        }

        Ok(Maven2RepositoryResolver {
            local_repository: config.local_repository.clone(),
            remote_repositories,
            ignore_artifact_descriptor_repositories: config.ignore_artifact_descriptor_repositories,
            update_policy: config.update_policy,
        })
    }

    pub fn local_path(&self, artifact_ref: &MavenArtifactRef) -> PathBuf {
        self.local_repository.join(as_maven_path(artifact_ref))
    }

    /// Returns the local file for an artifact, downloading it if necessary. `Ok(None)` means that
    ///  no repository has the artifact.
    ///
    /// A failing repository does not stop the search. If no repository has the artifact, a
    ///  failure of a configured repository is returned as the error; failures of repositories
    ///  declared in POMs are only logged.
    async fn fetch(&self, artifact_ref: &MavenArtifactRef, descriptor_repositories: &[RemoteMavenRepo]) -> anyhow::Result<Option<PathBuf>> {
        let local_path = self.local_path(artifact_ref);
        let is_local = try_exists(&local_path).await?;

        if is_local && !self.needs_update(artifact_ref, &local_path, descriptor_repositories).await? {
            trace!("using {} from the local repository", artifact_ref);
            return Ok(Some(local_path));
        }

        let mut failure = None;
        for (repo, is_configured) in self.remote_repositories.iter().map(|r| (r, true))
            .chain(descriptor_repositories.iter().map(|r| (r, false)))
        {
            match repo.download_artifact(artifact_ref, &local_path).await {
                Ok(true) => {
                    debug!("downloaded {} from {}", artifact_ref, repo.name());
                    return Ok(Some(local_path));
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("failed to retrieve {} from {}: {:#}", artifact_ref, repo.name(), e);
                    if is_configured && failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if is_local {
            // no longer available upstream, but the local copy is still good
            return Ok(Some(local_path));
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    async fn needs_update(&self, artifact_ref: &MavenArtifactRef, local_path: &Path, descriptor_repositories: &[RemoteMavenRepo]) -> anyhow::Result<bool> {
        if self.remote_repositories.is_empty() && descriptor_repositories.is_empty() {
            return Ok(false);
        }
        if !artifact_ref.coordinates.version.is_snapshot() {
            return Ok(false);
        }
        let last_updated = metadata(local_path).await?
            .modified()?;
        Ok(self.update_policy.requires_update(last_updated, SystemTime::now()))
    }

    /// `Ok(None)` if there is no POM for these coordinates
    async fn read_descriptor(&self, coordinates: &MavenCoordinates, descriptor_repositories: &[RemoteMavenRepo]) -> Result<Option<PomDescriptor>, ResolveError> {
        let pom_ref = MavenArtifactRef::pom(coordinates);
        let pom_path = match self.fetch(&pom_ref, descriptor_repositories).await {
            Ok(Some(path)) => path,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ResolveError::transport(&pom_ref, e)),
        };

        let xml = read_to_string(&pom_path).await
            .map_err(|e| ResolveError::transport(&pom_ref, e.into()))?;
        parse_pom(&xml)
            .map(Some)
            .map_err(|e| ResolveError::descriptor(&pom_ref, e))
    }

    fn add_descriptor_repositories(&self, descriptor: &PomDescriptor, descriptor_repositories: &mut Vec<RemoteMavenRepo>) {
        if self.ignore_artifact_descriptor_repositories {
            return;
        }

        for repository in &descriptor.repositories {
            let mut url = repository.url.clone();
            if !url.ends_with('/') {
                url.push('/');
            }
            let is_known = self.remote_repositories.iter()
                .chain(descriptor_repositories.iter())
                .any(|r| r.base_uri() == url);
            if is_known {
                continue;
            }

            match RemoteMavenRepo::new(&repository.id, url) {
                Ok(repo) => {
                    debug!("using repository {} ({}) declared in a POM", repository.id, repo.base_uri());
                    descriptor_repositories.push(repo);
                }
                Err(e) => {
                    warn!("ignoring repository {} declared in a POM: {}", repository.id, e);
                }
            }
        }
    }
}

/// Two declarations conflict if they name the same variant of an artifact, regardless of
///  version; the nearest one wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConflictKey {
    group_id: MavenGroupId,
    artifact_id: MavenArtifactId,
    classifier: MavenClassifier,
    file_extension: String,
}
impl ConflictKey {
    fn of(artifact_ref: &MavenArtifactRef) -> ConflictKey {
        ConflictKey {
            group_id: artifact_ref.coordinates.group_id.clone(),
            artifact_id: artifact_ref.coordinates.artifact_id.clone(),
            classifier: artifact_ref.classifier.clone(),
            file_extension: artifact_ref.file_extension.clone(),
        }
    }
}

#[async_trait]
impl RepositoryResolver for Maven2RepositoryResolver {
    async fn resolve(&self, artifact_ref: &MavenArtifactRef) -> Result<DependencyResult, ResolveError> {
        let mut descriptor_repositories = vec![];

        let root_file = self.fetch(artifact_ref, &descriptor_repositories).await
            .map_err(|e| ResolveError::transport(artifact_ref, e))?
            .ok_or_else(|| ResolveError::ArtifactNotFound(artifact_ref.clone()))?;

        let mut transitive = vec![];
        let mut seen: HashSet<ConflictKey> = HashSet::new();
        seen.insert(ConflictKey::of(artifact_ref));

        // several variants of the same coordinates share one POM, it is walked once
        let mut walked: HashSet<MavenCoordinates> = HashSet::new();
        walked.insert(artifact_ref.coordinates.clone());

        let mut queue: VecDeque<(MavenCoordinates, Vec<Exclusion>)> = VecDeque::new();
        queue.push_back((artifact_ref.coordinates.clone(), vec![]));

        while let Some((coordinates, exclusions)) = queue.pop_front() {
            let descriptor = match self.read_descriptor(&coordinates, &descriptor_repositories).await? {
                Some(descriptor) => descriptor,
                None => {
                    debug!("no POM for {}, not following its dependencies", coordinates);
                    continue;
                }
            };
            self.add_descriptor_repositories(&descriptor, &mut descriptor_repositories);

            for dependency in descriptor.dependencies {
                let dependency_coordinates = &dependency.artifact.coordinates;
                if exclusions.iter().any(|e| e.matches(dependency_coordinates)) {
                    debug!("{} is excluded", dependency.artifact);
                    continue;
                }
                if !seen.insert(ConflictKey::of(&dependency.artifact)) {
                    continue;
                }

                let file = self.fetch(&dependency.artifact, &descriptor_repositories).await
                    .map_err(|e| ResolveError::transport(&dependency.artifact, e))?
                    .ok_or_else(|| ResolveError::ArtifactNotFound(dependency.artifact.clone()))?;

                if walked.insert(dependency.artifact.coordinates.clone()) {
                    let mut child_exclusions = exclusions.clone();
                    child_exclusions.extend(dependency.exclusions);
                    queue.push_back((dependency.artifact.coordinates.clone(), child_exclusions));
                }

                transitive.push(ResolvedArtifact {
                    artifact: dependency.artifact,
                    file,
                });
            }
        }

        Ok(DependencyResult {
            root: ResolvedArtifact {
                artifact: artifact_ref.clone(),
                file: root_file,
            },
            transitive,
        })
    }
}
