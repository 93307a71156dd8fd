use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use crate::maven::coordinates::*;
use crate::maven::paths::relativize;
use crate::resolve::resolver::ResolvedArtifact;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// queried for coordinates that were never added - a bug in the caller, not a user error
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

/// The variant key of an auxiliary artifact, relative to its record's coordinates
type VariantKey = (MavenClassifier, String);

struct ArtifactRecord {
    pom: PathBuf,
    main_artifact: Option<ResolvedArtifact>,
    additional_classifiers: IndexMap<VariantKey, ResolvedArtifact>,
}

/// Collects resolved artifacts, grouping them by coordinates. Call [`ArtifactStore::finish`] once
///  everything was added to get the queryable [`FinishedArtifactStore`].
pub struct ArtifactStore {
    records: IndexMap<MavenCoordinates, ArtifactRecord>,
    local_repository: PathBuf,
    output_directory: PathBuf,
}

impl ArtifactStore {
    pub fn new(local_repository: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> ArtifactStore {
        ArtifactStore {
            records: IndexMap::new(),
            local_repository: local_repository.into(),
            output_directory: output_directory.into(),
        }
    }

    /// The first POM added for a set of coordinates is kept. An unclassified artifact replaces
    ///  the main artifact, everything else replaces the entry with the same classifier and
    ///  extension.
    pub fn add_result(&mut self, result: ResolvedArtifact, pom: impl Into<PathBuf>) -> &mut ArtifactStore {
        let record = self.records.entry(result.artifact.coordinates.clone())
            .or_insert_with(|| ArtifactRecord {
                pom: pom.into(),
                main_artifact: None,
                additional_classifiers: IndexMap::new(),
            });

        if result.artifact.classifier.is_unclassified() {
            record.main_artifact = Some(result);
        }
        else {
            let key = (result.artifact.classifier.clone(), result.artifact.file_extension.clone());
            record.additional_classifiers.insert(key, result);
        }
        self
    }

    /// Records without an unclassified artifact get their first-inserted classifier promoted to
    ///  be the main artifact.
    pub fn finish(self) -> FinishedArtifactStore {
        let records = self.records.into_iter()
            .filter_map(|(coordinates, mut record)| {
                let main_artifact = match record.main_artifact.take() {
                    Some(main) => main,
                    None => record.additional_classifiers.shift_remove_index(0)?.1,
                };
                Some((coordinates, FinishedRecord {
                    pom: record.pom,
                    main_artifact,
                    additional_classifiers: record.additional_classifiers.into_values().collect(),
                }))
            })
            .collect();

        FinishedArtifactStore {
            records,
            local_repository: self.local_repository,
            output_directory: self.output_directory,
        }
    }
}

struct FinishedRecord {
    pom: PathBuf,
    main_artifact: ResolvedArtifact,
    additional_classifiers: Vec<ResolvedArtifact>,
}

/// The read-only view of an [`ArtifactStore`]: exactly one main artifact per coordinates, plus
///  the other classifiers in the order they were added.
pub struct FinishedArtifactStore {
    records: IndexMap<MavenCoordinates, FinishedRecord>,
    local_repository: PathBuf,
    output_directory: PathBuf,
}

impl FinishedArtifactStore {
    pub fn main_results(&self) -> Vec<&ResolvedArtifact> {
        self.records.values()
            .map(|r| &r.main_artifact)
            .collect()
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn relative_path_to_main_artifact(&self, result: &ResolvedArtifact) -> Result<PathBuf, StoreError> {
        let record = self.record(result, "main artifact")?;
        Ok(self.output_relative_path(&record.main_artifact.file))
    }

    pub fn relative_path_to_pom(&self, result: &ResolvedArtifact) -> Result<PathBuf, StoreError> {
        let record = self.record(result, "POM")?;
        Ok(self.output_relative_path(&record.pom))
    }

    pub fn relative_paths_to_other_classifiers(&self, result: &ResolvedArtifact) -> Vec<PathBuf> {
        self.others(result)
            .map(|r| self.output_relative_path(&r.file))
            .collect()
    }

    pub fn main_classifier(&self, result: &ResolvedArtifact) -> Result<&str, StoreError> {
        let record = self.record(result, "main artifact")?;
        Ok(record.main_artifact.artifact.classifier.as_str())
    }

    pub fn main_extension(&self, result: &ResolvedArtifact) -> Result<&str, StoreError> {
        let record = self.record(result, "main artifact")?;
        Ok(&record.main_artifact.artifact.file_extension)
    }

    pub fn other_classifiers(&self, result: &ResolvedArtifact) -> Vec<&str> {
        self.others(result)
            .map(|r| r.artifact.classifier.as_str())
            .collect()
    }

    pub fn other_extensions(&self, result: &ResolvedArtifact) -> Vec<&str> {
        self.others(result)
            .map(|r| r.artifact.file_extension.as_str())
            .collect()
    }

    pub fn has_other_classifiers(&self, result: &ResolvedArtifact) -> bool {
        self.records.get(&result.artifact.coordinates)
            .map(|r| !r.additional_classifiers.is_empty())
            .unwrap_or(false)
    }

    /// `output_directory / relativize(local_repository, file)`
    pub fn output_relative_path(&self, file: &Path) -> PathBuf {
        self.output_directory.join(relativize(&self.local_repository, file))
    }

    fn record(&self, result: &ResolvedArtifact, what: &str) -> Result<&FinishedRecord, StoreError> {
        self.records.get(&result.artifact.coordinates)
            .ok_or_else(|| StoreError::InconsistentState(
                format!("unable to find {} for {}", what, result.file.display())))
    }

    fn others(&self, result: &ResolvedArtifact) -> impl Iterator<Item = &ResolvedArtifact> {
        self.records.get(&result.artifact.coordinates)
            .into_iter()
            .flat_map(|r| r.additional_classifiers.iter())
    }
}
