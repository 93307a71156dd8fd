use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{error, info};

use crate::maven::paths::relativize;
use crate::populate::artifact_store::{FinishedArtifactStore, StoreError};
use crate::resolve::resolver::ResolvedArtifact;

pub const COLUMN_HEADERS: &str =
    "Group ID\tArtifact ID\tVersion\tPOM File\tFile\tFiles (optional)\tClassifiers (optional)\tTypes (optional)";

const FIELD_SEPARATOR: &str = "\t";
const LIST_SEPARATOR: &str = ",";

/// Merges the store's main artifacts into the tab separated report at `report_file`. Lines are
///  kept sorted and unique, so regenerating with the same data yields the same file.
pub fn create_report(store: &FinishedArtifactStore, report_file: &Path) -> anyhow::Result<()> {
    let mut lines = read_existing_report(report_file);

    for main_result in store.main_results() {
        lines.insert(format_line(main_result, store, report_file)?);
    }

    write_lines(report_file, &lines)
}

/// One report line; all paths are relative to the directory containing the report
pub fn format_line(result: &ResolvedArtifact, store: &FinishedArtifactStore, report_file: &Path) -> Result<String, StoreError> {
    let pom = relativize_to_parent_of(report_file, &store.relative_path_to_pom(result)?);
    let file = relativize_to_parent_of(report_file, &store.relative_path_to_main_artifact(result)?);
    let files: Vec<String> = store.relative_paths_to_other_classifiers(result)
        .iter()
        .map(|p| relativize_to_parent_of(report_file, p).display().to_string())
        .collect();

    let coordinates = &result.artifact.coordinates;
    let fields = [
        coordinates.group_id.0.clone(),
        coordinates.artifact_id.0.clone(),
        coordinates.version.0.clone(),
        pom.display().to_string(),
        file.display().to_string(),
        files.join(LIST_SEPARATOR),
        store.other_classifiers(result).join(LIST_SEPARATOR),
        store.other_extensions(result).join(LIST_SEPARATOR),
    ];
    Ok(fields.join(FIELD_SEPARATOR))
}

fn read_existing_report(report_file: &Path) -> BTreeSet<String> {
    match fs::read_to_string(report_file) {
        Ok(content) => {
            info!("Updating dependency report {}.", report_file.display());
            content.lines()
                .filter(|line| *line != COLUMN_HEADERS && !line.is_empty())
                .map(str::to_string)
                .collect()
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Creating dependency report {}.", report_file.display());
            BTreeSet::new()
        }
        Err(e) => {
            error!("Unexpected error while reading existing dependency report {}; the current report will be overwritten: {}",
                   report_file.display(), e);
            BTreeSet::new()
        }
    }
}

fn write_lines(report_file: &Path, lines: &BTreeSet<String>) -> anyhow::Result<()> {
    if let Some(dir) = report_file.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
    }

    let mut content = String::with_capacity(COLUMN_HEADERS.len() + 1 + lines.iter().map(|l| l.len() + 1).sum::<usize>());
    content.push_str(COLUMN_HEADERS);
    content.push('\n');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }

    fs::write(report_file, content)
        .with_context(|| format!("failed to write dependency report {}", report_file.display()))
}

fn relativize_to_parent_of(report_file: &Path, other: &Path) -> PathBuf {
    match report_file.parent() {
        Some(dir) => relativize(dir, other),
        None => other.to_path_buf(),
    }
}

#[cfg(test)]
mod test {
    use crate::populate::artifact_store::ArtifactStore;
    use crate::populate::artifact_store::test::new_result;
    use super::*;

    const LOCAL_REPOSITORY: &str = "my/m2/repo";

    fn finished_store(root: &Path) -> FinishedArtifactStore {
        let pom = Path::new(LOCAL_REPOSITORY).join("foo/bar/1.0/bar-1.0.pom");
        let mut store = ArtifactStore::new(LOCAL_REPOSITORY, root.join("output"));
        store.add_result(new_result("foo", "bar", "1.0", None, "jar"), &pom)
            .add_result(new_result("foo", "bar", "1.0", Some("sources"), "jar"), &pom)
            .add_result(new_result("foo", "bar", "1.0", Some("linux"), "zip"), &pom)
            .add_result(new_result("abc", "def", "2.0", Some("tests"), "jar"), Path::new(LOCAL_REPOSITORY).join("abc/def/2.0/def-2.0.pom"));
        store.finish()
    }

    #[test]
    fn test_format_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("output/dependencies.tsv");

        let line = format_line(&new_result("foo", "bar", "1.0", None, "jar"), &store, &report_file).unwrap();
        assert_eq!(line, "foo\tbar\t1.0\tfoo/bar/1.0/bar-1.0.pom\tfoo/bar/1.0/bar-1.0.jar\tfoo/bar/1.0/bar-1.0-sources.jar,foo/bar/1.0/bar-1.0-linux.zip\tsources,linux\tjar,zip");
    }

    #[test]
    fn test_format_line_relative_to_report_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("reports/dependencies.tsv");

        let line = format_line(&new_result("abc", "def", "2.0", Some("tests"), "jar"), &store, &report_file).unwrap();
        assert_eq!(line, "abc\tdef\t2.0\t../output/abc/def/2.0/def-2.0.pom\t../output/abc/def/2.0/def-2.0-tests.jar\t\t\t");
    }

    #[test]
    fn test_create_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("output/reports/dependencies.tsv");

        create_report(&store, &report_file).unwrap();

        let content = fs::read_to_string(&report_file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COLUMN_HEADERS);
        assert!(lines[1].starts_with("abc\tdef\t2.0\t"));
        assert!(lines[2].starts_with("foo\tbar\t1.0\t../foo/bar/1.0/bar-1.0.pom\t"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_create_report_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("output/dependencies.tsv");

        create_report(&store, &report_file).unwrap();
        let first = fs::read(&report_file).unwrap();
        create_report(&store, &report_file).unwrap();
        let second = fs::read(&report_file).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_create_report_merges_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("output/dependencies.tsv");
        fs::create_dir_all(report_file.parent().unwrap()).unwrap();
        fs::write(&report_file, format!("{}\nzzz\tprevious\t0.1\tp.pom\tp.jar\t\t\t\n", COLUMN_HEADERS)).unwrap();

        create_report(&store, &report_file).unwrap();

        let content = fs::read_to_string(&report_file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], COLUMN_HEADERS);
        assert_eq!(lines[3], "zzz\tprevious\t0.1\tp.pom\tp.jar\t\t\t");
        assert_eq!(content.matches(COLUMN_HEADERS).count(), 1);
    }

    #[test]
    fn test_unreadable_report_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = finished_store(dir.path());
        let report_file = dir.path().join("output/dependencies.tsv");
        fs::create_dir_all(report_file.parent().unwrap()).unwrap();
        fs::write(&report_file, [0xff, 0xfe, 0x00, b'\n']).unwrap();

        create_report(&store, &report_file).unwrap();

        let content = fs::read_to_string(&report_file).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
