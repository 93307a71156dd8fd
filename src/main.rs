pub mod config;
pub mod maven;
pub mod populate;
pub mod resolve;
pub mod util;

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{info, Level};

use crate::config::PopulateConfig;
use crate::populate::populate_repository;

/// Resolves declared Maven dependencies into a local repository, copies them to an output
///  directory and writes a tab separated report of what was copied
#[derive(Parser, Debug)]
#[command(name = "m2-populate", version)]
struct Args {
    /// JSON config file; relative paths inside it are relative to the file
    config: PathBuf,

    /// -v for debug output, -vv for trace output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// overrides outputDirectory from the config file
    #[arg(long)]
    output_directory: Option<PathBuf>,

    /// overrides dependencyReportFile from the config file, and enables the report
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// only populate the local repository, do not copy anything
    #[arg(long)]
    local_only: bool,
}

impl Args {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn apply_overrides(&self, config: &mut PopulateConfig) {
        if let Some(output_directory) = &self.output_directory {
            config.output_directory = Some(output_directory.clone());
        }
        if let Some(report_file) = &self.report_file {
            config.create_dependency_report_file = true;
            config.dependency_report_file = Some(report_file.clone());
        }
        if self.local_only {
            config.populate_local_repo_only = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .init();

    let mut config = PopulateConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    args.apply_overrides(&mut config);
    config.make_absolute()?;

    let summary = populate_repository(&config).await?;
    info!("Done: {} of {} dependencies processed, {} dependency results, {} files copied.",
          summary.dependencies_processed, summary.dependencies_required, summary.dependency_results, summary.files_copied);
    Ok(())
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::maven::coordinates::*;
    use crate::maven::paths::as_maven_path;
    use crate::populate::artifact_store::ArtifactStore;
    use crate::populate::report::format_line;
    use crate::resolve::resolver::ResolvedArtifact;
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["m2-populate", "-vv", "--report-file", "r.tsv", "--local-only", "populate.json"]);
        assert_eq!(args.log_level(), Level::TRACE);

        let mut config = PopulateConfig::parse(r#"{ "localRepository": "repo", "outputDirectory": "out" }"#).unwrap();
        args.apply_overrides(&mut config);

        assert!(config.create_dependency_report_file);
        assert_eq!(config.dependency_report_file.as_deref(), Some(Path::new("r.tsv")));
        assert!(config.populate_local_repo_only);
        assert_eq!(config.output_directory.as_deref(), Some(Path::new("out")));
    }

    #[test]
    fn test_relative_output_directory_with_absolute_report_file() {
        let cwd = std::env::current_dir().unwrap();
        let report_file = cwd.join("out/deps.tsv");
        let args = Args::parse_from([
            "m2-populate".into(),
            "--output-directory".into(), "out".into(),
            "--report-file".into(), report_file.clone().into_os_string(),
            "populate.json".into(),
        ] as [std::ffi::OsString; 6]);

        let mut config = PopulateConfig::parse(r#"{ "localRepository": "/repo" }"#).unwrap();
        args.apply_overrides(&mut config);
        config.make_absolute().unwrap();
        assert_eq!(config.output_directory, Some(cwd.join("out")));

        let artifact = MavenArtifactRef::new(MavenCoordinates::new("foo", "bar", "1.0"), MavenClassifier::Unclassified, "jar");
        let result = ResolvedArtifact {
            file: config.repositories.local_repository.join(as_maven_path(&artifact)),
            artifact,
        };
        let mut store = ArtifactStore::new(&config.repositories.local_repository, config.output_directory.clone().unwrap());
        store.add_result(result.clone(), "/repo/foo/bar/1.0/bar-1.0.pom");
        let store = store.finish();

        let line = format_line(&result, &store, &report_file).unwrap();
        assert_eq!(line, "foo\tbar\t1.0\tfoo/bar/1.0/bar-1.0.pom\tfoo/bar/1.0/bar-1.0.jar\t\t\t");
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["m2-populate", "populate.json"]);
        assert_eq!(args.log_level(), Level::INFO);
        assert_eq!(args.config, PathBuf::from("populate.json"));
        assert!(!args.local_only);
    }
}
