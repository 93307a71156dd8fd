use std::fmt::{Display, Formatter};

/// Classifiers that are attempted for every dependency without explicit artifacts, but whose
///  absence in a repository is expected and not worth a warning
pub const OPTIONAL_CLASSIFIERS: [&str; 2] = ["sources", "tests"];

#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct MavenVersion(pub String);
impl MavenVersion {
    pub fn is_snapshot(&self) -> bool {
        self.0.ends_with("-SNAPSHOT")
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct MavenArtifactId(pub String);

#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct MavenGroupId(pub String);
impl MavenGroupId {
    /// "org.example.foo" -> "org/example/foo"
    pub fn as_path(&self) -> String {
        self.0.replace('.', "/")
    }
}

/// The logical identity of a dependency, independent of the physical file variant
#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct MavenCoordinates {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
    pub version: MavenVersion,
}
impl MavenCoordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> MavenCoordinates {
        MavenCoordinates {
            group_id: MavenGroupId(group_id.to_string()),
            artifact_id: MavenArtifactId(artifact_id.to_string()),
            version: MavenVersion(version.to_string()),
        }
    }
}
impl Display for MavenCoordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id.0, self.artifact_id.0, self.version.0)
    }
}

/// NB: there is no `Classified("")` - an empty classifier is normalized to `Unclassified`, so
///  "no classifier" and "empty classifier" compare equal
#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub enum MavenClassifier {
    Unclassified,
    Classified(String),
}
impl MavenClassifier {
    pub fn from_option(classifier: Option<&str>) -> MavenClassifier {
        match classifier.map(str::trim) {
            None | Some("") => MavenClassifier::Unclassified,
            Some(c) => MavenClassifier::Classified(c.to_string()),
        }
    }

    /// the classifier as stored and reported, i.e. "" for the main artifact
    pub fn as_str(&self) -> &str {
        match self {
            MavenClassifier::Unclassified => "",
            MavenClassifier::Classified(c) => c,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, MavenClassifier::Unclassified)
    }

    /// true for the canonical classifiers that may legitimately be missing from a repository.
    ///  The unclassified artifact is never optional.
    pub fn is_optional(&self) -> bool {
        match self {
            MavenClassifier::Unclassified => false,
            MavenClassifier::Classified(c) => OPTIONAL_CLASSIFIERS.contains(&c.as_str()),
        }
    }
}

/// Identifies one physical file of a dependency: coordinates plus classifier and extension.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenArtifactRef {
    pub coordinates: MavenCoordinates,
    pub classifier: MavenClassifier,
    pub file_extension: String, // without leading '.', e.g. "jar"
}
impl MavenArtifactRef {
    pub fn new(coordinates: MavenCoordinates, classifier: MavenClassifier, file_extension: &str) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates,
            classifier,
            file_extension: file_extension.to_string(),
        }
    }

    /// the descriptor (POM) belonging to these coordinates
    pub fn pom(coordinates: &MavenCoordinates) -> MavenArtifactRef {
        MavenArtifactRef::new(coordinates.clone(), MavenClassifier::Unclassified, "pom")
    }
}
impl Display for MavenArtifactRef {
    /// "group:artifact:version[:classifier]@extension"
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.coordinates)?;
        if let MavenClassifier::Classified(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        write!(f, "@{}", self.file_extension)
    }
}
