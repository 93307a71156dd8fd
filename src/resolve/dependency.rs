use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// The extension that is requested when a dependency does not name its artifacts explicitly
pub const DEFAULT_EXTENSION: &str = "jar";

/// How a dependency is declared in the build
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// external module, resolved from a repository
    #[default]
    Module,
    /// a sibling project of the same build
    Project,
    /// a file or directory on the local file system
    File,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyArtifact {
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredDependency {
    #[serde(default)]
    pub kind: DependencyKind,
    #[serde(default)]
    pub group: Option<String>,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// explicitly requested (classifier, extension) pairs - if empty, the default classifiers
    ///  are attempted
    #[serde(default)]
    pub artifacts: Vec<DependencyArtifact>,
}
impl DeclaredDependency {
    /// resolvable without a repository, e.g. a project or file dependency
    pub fn is_self_resolving(&self) -> bool {
        self.kind != DependencyKind::Module
    }

    /// the group if it is present and not blank
    pub fn group_id(&self) -> Option<&str> {
        self.group.as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}
impl Display for DeclaredDependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}",
               self.group.as_deref().unwrap_or(""),
               self.name,
               self.version.as_deref().unwrap_or(""),
        )
    }
}

/// A named group of declared dependencies, e.g. "compile" or "testRuntime"
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<DeclaredDependency>,
}

#[cfg(test)]
impl DeclaredDependency {
    pub fn module(group: &str, name: &str, version: &str) -> DeclaredDependency {
        DeclaredDependency {
            kind: DependencyKind::Module,
            group: Some(group.to_string()),
            name: name.to_string(),
            version: Some(version.to_string()),
            artifacts: vec![],
        }
    }

    pub fn with_artifact(mut self, classifier: Option<&str>, extension: &str) -> DeclaredDependency {
        self.artifacts.push(DependencyArtifact {
            classifier: classifier.map(str::to_string),
            extension: extension.to_string(),
        });
        self
    }

}
