use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::maven::paths::absolute_path;
use crate::resolve::dependency::Configuration;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
impl RemoteRepositoryConfig {
    /// only complete credentials are used
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

/// Controls whether a snapshot artifact that is already in the local repository is fetched from
///  the remote repository again. Release artifacts never change and are never re-fetched.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePolicy {
    #[default]
    Never,
    Daily,
    Always,
}
impl UpdatePolicy {
    pub fn requires_update(&self, last_updated: SystemTime, now: SystemTime) -> bool {
        match self {
            UpdatePolicy::Never => false,
            UpdatePolicy::Always => true,
            UpdatePolicy::Daily => now.duration_since(last_updated)
                .map(|age| age >= ONE_DAY)
                .unwrap_or(false),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    pub local_repository: PathBuf,
    #[serde(default)]
    pub remote_repository: Option<RemoteRepositoryConfig>,
    /// if false, repositories declared in POM files are consulted as well
    #[serde(default = "default_true")]
    pub ignore_artifact_descriptor_repositories: bool,
    #[serde(default)]
    pub update_policy: UpdatePolicy,
}
impl RepositoryConfig {
    pub fn new(local_repository: impl Into<PathBuf>) -> RepositoryConfig {
        RepositoryConfig {
            local_repository: local_repository.into(),
            remote_repository: None,
            ignore_artifact_descriptor_repositories: true,
            update_policy: UpdatePolicy::Never,
        }
    }

    /// Without a remote repository, everything must come from an existing local repository
    pub fn check_preconditions(&self) -> anyhow::Result<()> {
        if self.remote_repository.is_none() && !self.local_repository.is_dir() {
            bail!("since local repository {} is not a directory a remote repository must be configured",
                  self.local_repository.display());
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Everything a populate run needs, typically loaded from a JSON file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PopulateConfig {
    #[serde(flatten)]
    pub repositories: RepositoryConfig,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    /// only fill the local repository, do not copy anything to the output directory
    #[serde(default)]
    pub populate_local_repo_only: bool,
    #[serde(default)]
    pub create_dependency_report_file: bool,
    #[serde(default)]
    pub dependency_report_file: Option<PathBuf>,
    #[serde(default)]
    pub configurations: Vec<Configuration>,
}

impl PopulateConfig {
    /// Loads a config file. Relative paths in the file are relative to the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<PopulateConfig> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("failed to parse {}", path.as_ref().display()))?;
        if let Some(base) = path.as_ref().parent() {
            config.rebase(base);
        }
        config.make_absolute()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<PopulateConfig> {
        Ok(serde_json::from_str(content)?)
    }

    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &Path| if p.is_relative() { base.join(p) } else { p.to_path_buf() };

        self.repositories.local_repository = rebase(&self.repositories.local_repository);
        self.output_directory = self.output_directory.as_deref().map(rebase);
        self.dependency_report_file = self.dependency_report_file.as_deref().map(rebase);
    }

    /// Report paths are computed relative to each other, so all configured paths must be
    ///  absolute. Relative paths are taken relative to the current directory.
    pub fn make_absolute(&mut self) -> anyhow::Result<()> {
        let absolute = |p: &Path| absolute_path(p)
            .with_context(|| format!("failed to make {} absolute", p.display()));

        self.repositories.local_repository = absolute(&self.repositories.local_repository)?;
        self.output_directory = self.output_directory.as_deref().map(absolute).transpose()?;
        self.dependency_report_file = self.dependency_report_file.as_deref().map(absolute).transpose()?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.populate_local_repo_only && self.output_directory.is_none() {
            bail!("outputDirectory must be set if populateLocalRepoOnly is false");
        }
        if self.create_dependency_report_file {
            if self.dependency_report_file.is_none() {
                bail!("dependency report file is not configured");
            }
            if self.output_directory.is_none() {
                bail!("outputDirectory must be set to create a dependency report");
            }
        }
        self.repositories.check_preconditions()
    }
}
