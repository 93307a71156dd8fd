use std::collections::HashMap;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::maven::coordinates::*;

lazy_static! {
    static ref PROPERTY_REGEX: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

/// property references can refer to other properties - bound the number of substitution passes
///  so that cycles terminate
const MAX_INTERPOLATION_PASSES: usize = 8;

/// The parts of a POM that matter for walking the transitive closure. This is a cleaned-up
///  abstraction of the format described at https://maven.apache.org/pom.html - no parent
///  resolution, no dependency management, no profiles.
#[derive(Debug, Eq, PartialEq)]
pub struct PomDescriptor {
    pub dependencies: Vec<DescriptorDependency>,
    pub repositories: Vec<DescriptorRepository>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DescriptorDependency {
    pub artifact: MavenArtifactRef,
    pub exclusions: Vec<Exclusion>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DescriptorRepository {
    pub id: String,
    pub url: String,
}

/// "*" matches anything
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}
impl Exclusion {
    pub fn matches(&self, coordinates: &MavenCoordinates) -> bool {
        (self.group_id == "*" || self.group_id == coordinates.group_id.0)
            && (self.artifact_id == "*" || self.artifact_id == coordinates.artifact_id.0)
    }
}

pub fn parse_pom(xml: &str) -> anyhow::Result<PomDescriptor> {
    let pom: PomXml = serde_xml_rs::from_str(xml)
        .context("not a valid POM")?;

    let dependencies = pom.dependencies.dependency.iter()
        .filter_map(|d| pom.transitive_dependency(d))
        .collect();

    let repositories = pom.repositories.repository.iter()
        .filter(|r| !r.url.trim().is_empty())
        .map(|r| DescriptorRepository {
            id: r.id.as_deref().unwrap_or("").trim().to_string(),
            url: pom.interpolate(r.url.trim()),
        })
        .collect();

    Ok(PomDescriptor {
        dependencies,
        repositories,
    })
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PomXml {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    parent: Option<ParentXml>,
    #[serde(default)]
    properties: HashMap<String, String>,
    #[serde(default)]
    dependencies: DependenciesXml,
    #[serde(default)]
    repositories: RepositoriesXml,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ParentXml {
    group_id: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct DependenciesXml {
    #[serde(default)]
    dependency: Vec<DependencyXml>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct DependencyXml {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    classifier: Option<String>,
    #[serde(rename = "type")]
    dependency_type: Option<String>,
    scope: Option<String>,
    optional: Option<String>,
    #[serde(default)]
    exclusions: ExclusionsXml,
}

#[derive(Deserialize, Debug, Default)]
struct ExclusionsXml {
    #[serde(default)]
    exclusion: Vec<ExclusionXml>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ExclusionXml {
    group_id: String,
    artifact_id: String,
}

#[derive(Deserialize, Debug, Default)]
struct RepositoriesXml {
    #[serde(default)]
    repository: Vec<RepositoryXml>,
}

#[derive(Deserialize, Debug, Default)]
struct RepositoryXml {
    id: Option<String>,
    url: String,
}

impl PomXml {
    fn effective_group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
            .map(str::trim)
    }

    fn effective_version(&self) -> Option<&str> {
        self.version.as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
            .map(str::trim)
    }

    fn lookup_property(&self, name: &str) -> Option<String> {
        let value = match name {
            "project.groupId" | "pom.groupId" | "groupId" => self.effective_group_id(),
            "project.artifactId" | "pom.artifactId" | "artifactId" => self.artifact_id.as_deref().map(str::trim),
            "project.version" | "pom.version" | "version" => self.effective_version(),
            "project.parent.groupId" | "parent.groupId" => self.parent.as_ref().and_then(|p| p.group_id.as_deref()),
            "project.parent.version" | "parent.version" => self.parent.as_ref().and_then(|p| p.version.as_deref()),
            _ => self.properties.get(name).map(String::as_str),
        };
        value.map(|v| v.trim().to_string())
    }

    /// replaces "${...}" references that can be resolved from this POM alone, leaving unknown
    ///  references in place
    fn interpolate(&self, value: &str) -> String {
        let mut result = value.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            if !result.contains("${") {
                break;
            }
            let replaced = PROPERTY_REGEX.replace_all(&result, |captures: &regex::Captures| {
                self.lookup_property(&captures[1])
                    .unwrap_or_else(|| captures[0].to_string())
            }).into_owned();

            if replaced == result {
                break;
            }
            result = replaced;
        }
        result
    }

    fn transitive_dependency(&self, dependency: &DependencyXml) -> Option<DescriptorDependency> {
        let group_id = self.interpolate(dependency.group_id.trim());
        let artifact_id = self.interpolate(dependency.artifact_id.trim());

        let scope = dependency.scope.as_deref().map(str::trim).unwrap_or("compile");
        if scope != "compile" && scope != "runtime" {
            debug!("not following {}:{} with scope {}", group_id, artifact_id, scope);
            return None;
        }
        if dependency.optional.as_deref().map(str::trim) == Some("true") {
            debug!("not following optional dependency {}:{}", group_id, artifact_id);
            return None;
        }

        let version = match &dependency.version {
            Some(v) => self.interpolate(v.trim()),
            None => {
                debug!("not following {}:{} - version is not declared in the POM (probably managed by a parent)", group_id, artifact_id);
                return None;
            }
        };
        if version.contains("${") || version.starts_with('[') || version.starts_with('(') {
            debug!("not following {}:{} - unsupported version {}", group_id, artifact_id, version);
            return None;
        }

        let (classifier, extension) = type_to_classifier_and_extension(
            dependency.classifier.as_deref().map(|c| self.interpolate(c.trim())),
            dependency.dependency_type.as_deref().map(str::trim),
        );

        Some(DescriptorDependency {
            artifact: MavenArtifactRef::new(
                MavenCoordinates::new(&group_id, &artifact_id, &version),
                MavenClassifier::from_option(classifier.as_deref()),
                &extension,
            ),
            exclusions: dependency.exclusions.exclusion.iter()
                .map(|e| Exclusion {
                    group_id: e.group_id.trim().to_string(),
                    artifact_id: e.artifact_id.trim().to_string(),
                })
                .collect(),
        })
    }
}

/// maps a dependency's packaging 'type' to the file that actually gets resolved
fn type_to_classifier_and_extension(classifier: Option<String>, dependency_type: Option<&str>) -> (Option<String>, String) {
    match dependency_type {
        None | Some("") | Some("jar") => (classifier, "jar".to_string()),
        Some("test-jar") => (classifier.or_else(|| Some("tests".to_string())), "jar".to_string()),
        Some("bundle") | Some("maven-plugin") | Some("ejb") => (classifier, "jar".to_string()),
        Some(other) => (classifier, other.to_string()),
    }
}
