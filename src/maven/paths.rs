use std::path::{Component, Path, PathBuf};

use crate::maven::coordinates::*;

/// The relative path of an artifact inside a Maven2 layout repository, i.e.
///  "<group path>/<artifactId>/<version>/<file name>"
pub fn as_maven_path(artifact_ref: &MavenArtifactRef) -> String {
    format!(
        "{}/{}/{}/{}",
        artifact_ref.coordinates.group_id.as_path(),
        artifact_ref.coordinates.artifact_id.0,
        artifact_ref.coordinates.version.0,
        maven_file_name(artifact_ref),
    )
}

/// <artifactId>-<version>[-<classifier>][.<extension>]
pub fn maven_file_name(artifact_ref: &MavenArtifactRef) -> String {
    let classifier_string = match &artifact_ref.classifier {
        MavenClassifier::Unclassified => "".to_string(),
        MavenClassifier::Classified(c) => format!("-{}", c),
    };
    let extension_string = if artifact_ref.file_extension.is_empty() {
        "".to_string()
    }
    else {
        format!(".{}", artifact_ref.file_extension)
    };

    format!("{}-{}{}{}",
            artifact_ref.coordinates.artifact_id.0,
            artifact_ref.coordinates.version.0,
            classifier_string,
            extension_string,
    )
}

/// The POM that sits next to a resolved artifact file in a Maven2 layout
pub fn sibling_pom_path(artifact_file: &Path, coordinates: &MavenCoordinates) -> PathBuf {
    let file_name = maven_file_name(&MavenArtifactRef::pom(coordinates));
    match artifact_file.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Lexically computes the path that leads from `base` to `path`, inserting ".." where `path` is
///  not below `base`. Neither path is touched on the file system.
pub fn relativize(base: &Path, path: &Path) -> PathBuf {
    let base: Vec<Component> = base.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let path: Vec<Component> = path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = base.iter()
        .zip(path.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for c in &path[common..] {
        result.push(c.as_os_str());
    }
    result
}

/// Makes `path` absolute against the current directory and lexically removes "." and ".."
///  components, so that [`relativize`] can compare it with other absolute paths.
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root
                if !result.pop() && !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// true if the (relative) path leaves its base directory at some point
pub fn escapes_base(relative: &Path) -> bool {
    relative.is_absolute() || relative.components().any(|c| matches!(c, Component::ParentDir))
}
