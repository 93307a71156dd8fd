use tracing::{error, info, warn};

use crate::config::RepositoryConfig;
use crate::maven::coordinates::*;
use crate::resolve::dependency::{Configuration, DeclaredDependency, DEFAULT_EXTENSION};
use crate::resolve::resolver::{DependencyResult, RepositoryResolver, ResolveError};

/// The classifiers attempted for a dependency that does not name its artifacts: the "real"
///  artifact, its sources and its tests
pub const DEFAULT_CLASSIFIERS: [Option<&str>; 3] = [None, Some("sources"), Some("tests")];

/// Walks declared dependencies, resolving each against the repository system one at a time.
///
/// Resolution is best effort: failures are logged and the affected artifact is simply missing
///  from the results, nothing aborts the run once it has started.
pub struct ResolutionDriver<'a, R: RepositoryResolver + ?Sized> {
    resolver: &'a R,
    remote_configured: bool,
    dependency_results: Vec<DependencyResult>,
    /// the number of declared dependencies, not including transitive dependencies
    total_dependencies_required: u64,
    /// the number of declared dependencies processed so far
    total_dependencies_retrieved: u64,
}

impl <'a, R: RepositoryResolver + ?Sized> ResolutionDriver<'a, R> {
    /// Fails if the repository configuration can not possibly yield any artifact
    pub fn new(resolver: &'a R, repositories: &RepositoryConfig) -> anyhow::Result<ResolutionDriver<'a, R>> {
        repositories.check_preconditions()?;

        if repositories.remote_repository.is_none() {
            info!("No remote repository configured, downloads will not be attempted.");
        }

        Ok(ResolutionDriver {
            resolver,
            remote_configured: repositories.remote_repository.is_some(),
            dependency_results: vec![],
            total_dependencies_required: 0,
            total_dependencies_retrieved: 0,
        })
    }

    pub async fn resolve_configurations(&mut self, configurations: &[Configuration]) -> &[DependencyResult] {
        self.total_dependencies_required += configurations.iter()
            .map(|c| c.dependencies.len() as u64)
            .sum::<u64>();
        info!("{} dependencies must be resolved.", self.total_dependencies_required);

        for configuration in configurations {
            info!("Resolving dependencies for configuration {}.", configuration.name);
            for dependency in &configuration.dependencies {
                self.resolve_dependency(dependency).await;
            }
        }

        &self.dependency_results
    }

    pub async fn resolve_dependency(&mut self, dependency: &DeclaredDependency) {
        if dependency.is_self_resolving() {
            // project and file dependencies have no POM, so they have no place in a maven2 layout
            info!("[{}/{}] Dependency '{}' is self resolving (it's probably a dependency directly on a project), ignoring it.",
                  self.total_dependencies_retrieved + 1,
                  self.total_dependencies_required,
                  dependency);
        }
        else if let Some(group_id) = dependency.group_id() {
            match dependency.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                Some(version) => {
                    let coordinates = MavenCoordinates::new(group_id, &dependency.name, version);
                    self.resolve_artifacts(dependency, coordinates).await;
                }
                None => {
                    warn!("[{}/{}] Dependency '{}' has no version, ignoring it.",
                          self.total_dependencies_retrieved + 1,
                          self.total_dependencies_required,
                          dependency);
                }
            }
        }
        else {
            info!("[{}/{}] Dependency '{}' has no group ID (it's probably a dependency directly on a file), ignoring it.",
                  self.total_dependencies_retrieved + 1,
                  self.total_dependencies_required,
                  dependency);
        }
        self.total_dependencies_retrieved += 1;
    }

    async fn resolve_artifacts(&mut self, dependency: &DeclaredDependency, coordinates: MavenCoordinates) {
        info!("[{}/{}] Attempting to resolve artifacts for '{}'.",
              self.total_dependencies_retrieved + 1,
              self.total_dependencies_required,
              coordinates);

        let requests: Vec<MavenArtifactRef> = if dependency.artifacts.is_empty() {
            DEFAULT_CLASSIFIERS.iter()
                .map(|c| MavenArtifactRef::new(coordinates.clone(), MavenClassifier::from_option(*c), DEFAULT_EXTENSION))
                .collect()
        }
        else {
            dependency.artifacts.iter()
                .map(|a| MavenArtifactRef::new(coordinates.clone(), MavenClassifier::from_option(a.classifier.as_deref()), &a.extension))
                .collect()
        };

        for artifact_ref in requests {
            if let Some(result) = self.get_dependency_result(&artifact_ref).await {
                self.handle_dependency_result(result);
            }
        }
    }

    async fn get_dependency_result(&self, artifact_ref: &MavenArtifactRef) -> Option<DependencyResult> {
        let remote_log_message = if self.remote_configured {
            "download may be required"
        }
        else {
            "no remote repository configured, no download possible"
        };
        info!("Retrieving '{}' and its dependencies ({}) ...", artifact_ref, remote_log_message);

        match self.resolver.resolve(artifact_ref).await {
            Ok(result) => Some(result),
            Err(e) => {
                self.handle_resolution_error(e, artifact_ref);
                None
            }
        }
    }

    fn handle_resolution_error(&self, e: ResolveError, artifact_ref: &MavenArtifactRef) {
        if e.is_not_found() {
            if artifact_ref.classifier.is_optional() {
                info!("Did not resolve '{}' but that is okay since that artifact is only {}.",
                      artifact_ref,
                      artifact_ref.classifier.as_str());
            }
            else {
                warn!("Failed to resolve '{}' (this artifact may be required): {}", artifact_ref, e);
            }
        }
        else {
            error!("Encountered unexpected error while resolving '{}': {:#}", artifact_ref, anyhow::Error::from(e));
        }
    }

    fn handle_dependency_result(&mut self, result: DependencyResult) {
        for artifact in result.artifacts() {
            info!("Located {}.", artifact.file.display());
        }
        self.dependency_results.push(result);
    }

    pub fn dependency_results(&self) -> &[DependencyResult] {
        &self.dependency_results
    }

    pub fn into_dependency_results(self) -> Vec<DependencyResult> {
        self.dependency_results
    }

    pub fn total_dependencies_required(&self) -> u64 {
        self.total_dependencies_required
    }

    pub fn total_dependencies_retrieved(&self) -> u64 {
        self.total_dependencies_retrieved
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use crate::config::RemoteRepositoryConfig;
    use crate::maven::paths::as_maven_path;
    use crate::resolve::dependency::DependencyKind;
    use crate::resolve::resolver::ResolvedArtifact;
    use super::*;

    /// in-memory repository system for testing purposes: knows a fixed set of artifacts, fails
    ///  with a transport error for group "broken" and records every request
    pub struct TransientResolver {
        root: PathBuf,
        available: Vec<MavenArtifactRef>,
        transitive: HashMap<MavenCoordinates, Vec<MavenArtifactRef>>,
        requests: Mutex<Vec<MavenArtifactRef>>,
    }
    impl TransientResolver {
        pub fn new(root: &str) -> TransientResolver {
            TransientResolver {
                root: PathBuf::from(root),
                available: vec![],
                transitive: HashMap::new(),
                requests: Default::default(),
            }
        }

        pub fn with(mut self, coordinates: &MavenCoordinates, classifier: Option<&str>, extension: &str) -> TransientResolver {
            self.available.push(MavenArtifactRef::new(coordinates.clone(), MavenClassifier::from_option(classifier), extension));
            self
        }

        pub fn with_transitive(mut self, coordinates: &MavenCoordinates, dependency: &MavenCoordinates) -> TransientResolver {
            self.transitive.entry(coordinates.clone())
                .or_default()
                .push(MavenArtifactRef::new(dependency.clone(), MavenClassifier::Unclassified, "jar"));
            self
        }

        pub fn requests(&self) -> Vec<MavenArtifactRef> {
            self.requests.lock().unwrap().clone()
        }

        fn resolved(&self, artifact_ref: &MavenArtifactRef) -> ResolvedArtifact {
            ResolvedArtifact {
                artifact: artifact_ref.clone(),
                file: self.root.join(as_maven_path(artifact_ref)),
            }
        }
    }

    #[async_trait]
    impl RepositoryResolver for TransientResolver {
        async fn resolve(&self, artifact_ref: &MavenArtifactRef) -> Result<DependencyResult, ResolveError> {
            self.requests.lock().unwrap().push(artifact_ref.clone());

            if artifact_ref.coordinates.group_id.0 == "broken" {
                return Err(ResolveError::transport(artifact_ref, anyhow!("connection refused")));
            }
            if !self.available.contains(artifact_ref) {
                return Err(ResolveError::ArtifactNotFound(artifact_ref.clone()));
            }

            Ok(DependencyResult {
                root: self.resolved(artifact_ref),
                transitive: self.transitive.get(&artifact_ref.coordinates)
                    .map(|deps| deps.iter().map(|d| self.resolved(d)).collect())
                    .unwrap_or_default(),
            })
        }
    }

    fn local_repo() -> RepositoryConfig {
        RepositoryConfig::new(std::env::temp_dir())
    }

    fn classifiers(results: &[DependencyResult]) -> Vec<&str> {
        results.iter()
            .map(|r| r.root.artifact.classifier.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_resolves_default_classifiers() {
        let foo_bar = MavenCoordinates::new("foo", "bar", "1.0");
        let resolver = TransientResolver::new("/repo")
            .with(&foo_bar, None, "jar")
            .with(&foo_bar, Some("sources"), "jar");

        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();
        let configurations = vec![Configuration {
            name: "compile".to_string(),
            dependencies: vec![DeclaredDependency::module("foo", "bar", "1.0")],
        }];
        let results = driver.resolve_configurations(&configurations).await;

        assert_eq!(classifiers(results), vec!["", "sources"]);
        assert_eq!(resolver.requests(), vec![
            MavenArtifactRef::new(foo_bar.clone(), MavenClassifier::Unclassified, "jar"),
            MavenArtifactRef::new(foo_bar.clone(), MavenClassifier::Classified("sources".to_string()), "jar"),
            MavenArtifactRef::new(foo_bar, MavenClassifier::Classified("tests".to_string()), "jar"),
        ]);
    }

    #[tokio::test]
    async fn test_resolves_explicit_artifacts_only() {
        let foo_bar = MavenCoordinates::new("foo", "bar", "1.0");
        let resolver = TransientResolver::new("/repo")
            .with(&foo_bar, None, "jar")
            .with(&foo_bar, Some("linux"), "zip");

        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();
        driver.resolve_dependency(&DeclaredDependency::module("foo", "bar", "1.0").with_artifact(Some("linux"), "zip")).await;

        assert_eq!(resolver.requests(), vec![
            MavenArtifactRef::new(foo_bar, MavenClassifier::Classified("linux".to_string()), "zip"),
        ]);
        assert_eq!(classifiers(driver.dependency_results()), vec!["linux"]);
    }

    #[tokio::test]
    async fn test_skips_self_resolving_and_groupless_dependencies() {
        let resolver = TransientResolver::new("/repo");
        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();

        let configurations = vec![Configuration {
            name: "compile".to_string(),
            dependencies: vec![
                DeclaredDependency { kind: DependencyKind::Project, ..DeclaredDependency::module("foo", "sibling", "1.0") },
                DeclaredDependency { kind: DependencyKind::File, group: None, version: None, ..DeclaredDependency::module("", "libs/x.jar", "") },
                DeclaredDependency { group: Some(" ".to_string()), ..DeclaredDependency::module("", "loose", "1.0") },
            ],
        }];
        driver.resolve_configurations(&configurations).await;

        assert!(resolver.requests().is_empty());
        assert!(driver.dependency_results().is_empty());
        assert_eq!(driver.total_dependencies_required(), 3);
        assert_eq!(driver.total_dependencies_retrieved(), 3);
    }

    #[tokio::test]
    async fn test_skips_dependency_without_version() {
        let resolver = TransientResolver::new("/repo");
        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();

        driver.resolve_dependency(&DeclaredDependency { version: None, ..DeclaredDependency::module("foo", "bar", "") }).await;

        assert!(resolver.requests().is_empty());
        assert_eq!(driver.total_dependencies_retrieved(), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_resolution() {
        let foo_bar = MavenCoordinates::new("foo", "bar", "1.0");
        let resolver = TransientResolver::new("/repo")
            .with(&foo_bar, None, "jar");

        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();
        let configurations = vec![Configuration {
            name: "runtime".to_string(),
            dependencies: vec![
                DeclaredDependency::module("broken", "x", "1.0"),
                DeclaredDependency::module("missing", "y", "1.0"),
                DeclaredDependency::module("foo", "bar", "1.0"),
            ],
        }];
        let results = driver.resolve_configurations(&configurations).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].root.artifact.coordinates, foo_bar);
        assert_eq!(resolver.requests().len(), 9);
    }

    #[tokio::test]
    async fn test_keeps_transitive_closure() {
        let foo_bar = MavenCoordinates::new("foo", "bar", "1.0");
        let dep = MavenCoordinates::new("foo", "dep", "2.0");
        let resolver = TransientResolver::new("/repo")
            .with(&foo_bar, None, "jar")
            .with_transitive(&foo_bar, &dep);

        let mut driver = ResolutionDriver::new(&resolver, &local_repo()).unwrap();
        driver.resolve_dependency(&DeclaredDependency::module("foo", "bar", "1.0")).await;

        let results = driver.into_dependency_results();
        assert_eq!(results.len(), 1);
        let files: Vec<PathBuf> = results[0].artifacts().map(|a| a.file.clone()).collect();
        assert_eq!(files, vec![
            PathBuf::from("/repo/foo/bar/1.0/bar-1.0.jar"),
            PathBuf::from("/repo/foo/dep/2.0/dep-2.0.jar"),
        ]);
    }

    #[test]
    fn test_fails_fast_without_any_repository() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = TransientResolver::new("/repo");

        let missing = RepositoryConfig::new(dir.path().join("missing"));
        assert!(ResolutionDriver::new(&resolver, &missing).is_err());

        let remote = RepositoryConfig {
            remote_repository: Some(RemoteRepositoryConfig {
                name: "central".to_string(),
                url: "https://repo1.maven.org/maven2".to_string(),
                username: None,
                password: None,
            }),
            ..RepositoryConfig::new(dir.path().join("missing"))
        };
        assert!(ResolutionDriver::new(&resolver, &remote).is_ok());
    }
}
