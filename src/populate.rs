pub mod artifact_store;
pub mod copy;
pub mod report;

use std::path::Path;

use tracing::info;

use crate::config::PopulateConfig;
use crate::maven::paths::sibling_pom_path;
use crate::populate::artifact_store::{ArtifactStore, FinishedArtifactStore};
use crate::populate::copy::{CopyDependencyFiles, FileCopier, FsFileCopier};
use crate::populate::report::create_report;
use crate::resolve::driver::ResolutionDriver;
use crate::resolve::maven2_resolver::Maven2RepositoryResolver;
use crate::resolve::resolver::{DependencyResult, RepositoryResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateSummary {
    pub dependencies_required: u64,
    pub dependencies_processed: u64,
    pub dependency_results: usize,
    pub coordinates: usize,
    pub files_copied: usize,
}

/// Resolves all configured dependencies against the configured repositories, copies them to the
///  output directory and writes the dependency report
pub async fn populate_repository(config: &PopulateConfig) -> anyhow::Result<PopulateSummary> {
    let resolver = Maven2RepositoryResolver::new(&config.repositories)?;
    populate_with(config, &resolver, &FsFileCopier {}).await
}

pub async fn populate_with<R: RepositoryResolver + ?Sized, C: FileCopier + ?Sized>(config: &PopulateConfig, resolver: &R, copier: &C) -> anyhow::Result<PopulateSummary> {
    config.validate()?;

    let mut driver = ResolutionDriver::new(resolver, &config.repositories)?;
    driver.resolve_configurations(&config.configurations).await;
    let dependencies_required = driver.total_dependencies_required();
    let dependencies_processed = driver.total_dependencies_retrieved();
    let dependency_results = driver.into_dependency_results();

    let local_repository = &config.repositories.local_repository;
    let output_directory = config.output_directory.as_deref()
        .unwrap_or(local_repository);
    let store = build_store(local_repository, output_directory, &dependency_results);

    let files_copied = if config.populate_local_repo_only {
        info!("Only populating the local repository {}, not copying any files.", local_repository.display());
        0
    }
    else {
        CopyDependencyFiles::new(copier, &store, local_repository)
            .copy_all(&dependency_results)
            .await
    };

    if config.create_dependency_report_file {
        if let Some(report_file) = &config.dependency_report_file {
            create_report(&store, report_file)?;
        }
    }

    let summary = PopulateSummary {
        dependencies_required,
        dependencies_processed,
        dependency_results: dependency_results.len(),
        coordinates: store.main_results().len(),
        files_copied,
    };
    info!("Resolved {} artifacts for {} of {} dependencies, copied {} files.",
          summary.coordinates, summary.dependencies_processed, summary.dependencies_required, summary.files_copied);
    Ok(summary)
}

/// every artifact of every result, including the transitive ones, with its sibling POM
fn build_store(local_repository: &Path, output_directory: &Path, dependency_results: &[DependencyResult]) -> FinishedArtifactStore {
    let mut store = ArtifactStore::new(local_repository, output_directory);
    for result in dependency_results {
        for artifact in result.artifacts() {
            let pom = sibling_pom_path(&artifact.file, &artifact.artifact.coordinates);
            store.add_result(artifact.clone(), pom);
        }
    }
    store.finish()
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::config::RepositoryConfig;
    use crate::maven::coordinates::*;
    use crate::maven::paths::as_maven_path;
    use crate::populate::report::COLUMN_HEADERS;
    use crate::resolve::dependency::{Configuration, DeclaredDependency, DependencyKind};
    use super::*;

    fn write(root: &Path, artifact_ref: &MavenArtifactRef, content: &str) {
        let path = root.join(as_maven_path(artifact_ref));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn artifact(group_id: &str, artifact_id: &str, classifier: Option<&str>, extension: &str) -> MavenArtifactRef {
        MavenArtifactRef::new(MavenCoordinates::new(group_id, artifact_id, "1.0"), MavenClassifier::from_option(classifier), extension)
    }

    fn config(root: &Path) -> PopulateConfig {
        PopulateConfig {
            repositories: RepositoryConfig::new(root.join("repository")),
            output_directory: Some(root.join("output")),
            populate_local_repo_only: false,
            create_dependency_report_file: true,
            dependency_report_file: Some(root.join("output/dependencies.tsv")),
            configurations: vec![Configuration {
                name: "compile".to_string(),
                dependencies: vec![
                    DeclaredDependency::module("foo", "bar", "1.0"),
                    DeclaredDependency::module("foo", "only-sources", "1.0"),
                    DeclaredDependency { kind: DependencyKind::Project, ..DeclaredDependency::module("foo", "sibling", "1.0") },
                    DeclaredDependency::module("foo", "missing", "1.0"),
                ],
            }],
        }
    }

    fn local_repository(root: &Path) {
        let repository = root.join("repository");
        write(&repository, &artifact("foo", "bar", None, "jar"), "bar");
        write(&repository, &artifact("foo", "bar", Some("sources"), "jar"), "bar sources");
        write(&repository, &artifact("foo", "bar", None, "pom"),
              "<project><dependencies><dependency><groupId>foo</groupId><artifactId>dep</artifactId><version>1.0</version></dependency></dependencies></project>");
        write(&repository, &artifact("foo", "dep", None, "jar"), "dep");
        write(&repository, &artifact("foo", "only-sources", Some("sources"), "jar"), "only sources");
    }

    #[tokio::test]
    async fn test_populate_repository() {
        let dir = tempfile::tempdir().unwrap();
        local_repository(dir.path());
        let config = config(dir.path());

        let summary = populate_repository(&config).await.unwrap();

        // bar's POM and its transitive dependency are copied for both of bar's results
        assert_eq!(summary, PopulateSummary {
            dependencies_required: 4,
            dependencies_processed: 4,
            dependency_results: 3,
            coordinates: 3,
            files_copied: 7,
        });

        let output = dir.path().join("output");
        assert!(output.join("foo/bar/1.0/bar-1.0.jar").is_file());
        assert!(output.join("foo/bar/1.0/bar-1.0-sources.jar").is_file());
        assert!(output.join("foo/bar/1.0/bar-1.0.pom").is_file());
        assert!(output.join("foo/dep/1.0/dep-1.0.jar").is_file());
        assert!(output.join("foo/only-sources/1.0/only-sources-1.0-sources.jar").is_file());

        let report = fs::read_to_string(output.join("dependencies.tsv")).unwrap();
        assert_eq!(report, format!("{}\n{}\n{}\n{}\n",
            COLUMN_HEADERS,
            "foo\tbar\t1.0\tfoo/bar/1.0/bar-1.0.pom\tfoo/bar/1.0/bar-1.0.jar\tfoo/bar/1.0/bar-1.0-sources.jar\tsources\tjar",
            "foo\tdep\t1.0\tfoo/dep/1.0/dep-1.0.pom\tfoo/dep/1.0/dep-1.0.jar\t\t\t",
            "foo\tonly-sources\t1.0\tfoo/only-sources/1.0/only-sources-1.0.pom\tfoo/only-sources/1.0/only-sources-1.0-sources.jar\t\t\t",
        ));

        // a second run changes nothing
        populate_repository(&config).await.unwrap();
        assert_eq!(fs::read_to_string(output.join("dependencies.tsv")).unwrap(), report);
    }

    #[tokio::test]
    async fn test_populate_local_repo_only() {
        let dir = tempfile::tempdir().unwrap();
        local_repository(dir.path());
        let config = PopulateConfig {
            populate_local_repo_only: true,
            create_dependency_report_file: false,
            ..config(dir.path())
        };

        let summary = populate_repository(&config).await.unwrap();

        assert_eq!(summary.files_copied, 0);
        assert_eq!(summary.coordinates, 3);
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = PopulateConfig {
            output_directory: None,
            ..config(dir.path())
        };
        assert!(populate_repository(&config).await.is_err());

        // local repository does not exist and there is no remote
        assert!(populate_repository(&self::config(dir.path())).await.is_err());
    }
}
