use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::SNAPSHOT_VERSION;
use crate::errors::WsPerfError;
use crate::parsers::version_parser;
use crate::recorder::RunResult;

const COLUMN_WIDTH: usize = 15;
const SEPARATOR: &str = "|";

/// Expands the arguments into result files: files are taken as is,
/// directories contribute their non-hidden `*.json` files.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, WsPerfError> {
    let mut files = Vec::new();
    for path in paths {
        let metadata = fs::metadata(path).map_err(|e| summary_error(path, e))?;
        if metadata.is_file() {
            files.push(path.clone());
        } else if metadata.is_dir() {
            let mut entries = Vec::new();
            for entry in fs::read_dir(path).map_err(|e| summary_error(path, e))? {
                let entry_path = entry.map_err(|e| summary_error(path, e))?.path();
                if is_result_file(&entry_path) {
                    entries.push(entry_path);
                }
            }
            entries.sort();
            files.extend(entries);
        }
    }
    Ok(files)
}

fn is_result_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    path.is_file() && !name.starts_with('.') && name.ends_with(".json")
}

pub fn load_results(files: &[PathBuf]) -> Result<Vec<RunResult>, WsPerfError> {
    files
        .iter()
        .map(|file| {
            let content = fs::read_to_string(file).map_err(|e| summary_error(file, e))?;
            serde_json::from_str(&content).map_err(|e| summary_error(file, e))
        })
        .collect()
}

fn summary_error(path: &Path, reason: impl ToString) -> WsPerfError {
    WsPerfError::Summary {
        path: path.to_owned(),
        reason: reason.to_string(),
    }
}

/// Ascending by dotted numeric components, the snapshot build always last.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_snapshot = a.starts_with(SNAPSHOT_VERSION);
    let b_snapshot = b.starts_with(SNAPSHOT_VERSION);
    match (a_snapshot, b_snapshot) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    let numbers = |v: &str| version_parser(v).map(|(_, parts)| parts).unwrap_or_default();
    numbers(a).cmp(&numbers(b)).then_with(|| a.cmp(b))
}

/// Renders the summary table. Input order does not matter.
pub fn render(results: &[RunResult]) -> String {
    let mut sorted: Vec<&RunResult> = results.iter().collect();
    sorted.sort_by(|a, b| compare_versions(&a.version, &b.version));

    let mut table = String::new();
    for header in ["Version", "Clients", "Messages", "Time"] {
        table.push_str(&pad_left(header));
        table.push_str(SEPARATOR);
    }
    table.push('\n');
    for result in sorted {
        table.push_str(&pad_right(&result.version));
        table.push_str(SEPARATOR);
        table.push_str(&pad_left(&result.number_of_clients.to_string()));
        table.push_str(SEPARATOR);
        table.push_str(&pad_left(&result.number_of_messages.to_string()));
        table.push_str(SEPARATOR);
        table.push_str(&pad_left(&format!("{}ms", result.time_taken)));
        table.push_str(SEPARATOR);
        table.push('\n');
    }
    table
}

fn pad_left(value: &str) -> String {
    format!("{value:>COLUMN_WIDTH$}")
}

fn pad_right(value: &str) -> String {
    format!("{value:<COLUMN_WIDTH$}")
}

/// Loads every result reachable from `paths` and renders the table.
/// `None` when there is nothing to show.
pub fn summarize(paths: &[PathBuf]) -> Result<Option<String>, WsPerfError> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        return Ok(None);
    }
    let results = load_results(&files)?;
    Ok(Some(render(&results)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::ResultRecorder;
    use chrono::NaiveDateTime;

    fn result(version: &str, time_taken: u64) -> RunResult {
        RunResult {
            timestamp: NaiveDateTime::parse_from_str("2024-05-01T10:15:30", "%Y-%m-%dT%H:%M:%S")
                .unwrap(),
            time_taken,
            version: version.to_owned(),
            number_of_clients: 1000,
            number_of_messages: 100,
        }
    }

    fn versions(table: &str) -> Vec<String> {
        table
            .lines()
            .skip(1)
            .map(|line| line.split(SEPARATOR).next().unwrap().trim().to_owned())
            .collect()
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.0.0", "1.2.0"), Ordering::Less);
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("999-SNAPSHOT", "1000.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("3.0.0", "999-SNAPSHOT"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("3.0.0", "3.0.0.CR1"), Ordering::Less);
    }

    #[test]
    fn test_render_layout() {
        let table = render(&[result("1.0.0", 1234)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines[0],
            "        Version|        Clients|       Messages|           Time|"
        );
        assert_eq!(
            lines[1],
            "1.0.0          |           1000|            100|         1234ms|"
        );
    }

    #[test]
    fn test_snapshot_sorted_last() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path());
        for version in ["1.0.0", "999-SNAPSHOT", "1.2.0"] {
            recorder.record(&result(version, 10)).unwrap();
        }

        let table = summarize(&[dir.path().to_owned()]).unwrap().unwrap();
        assert_eq!(versions(&table), vec!["1.0.0", "1.2.0", "999-SNAPSHOT"]);
    }

    #[test]
    fn test_render_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path());
        for version in ["2.1.0", "1.0.0", "999-SNAPSHOT"] {
            recorder.record(&result(version, 42)).unwrap();
        }
        let paths = [dir.path().to_owned()];

        let first = summarize(&paths).unwrap();
        let second = summarize(&paths).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_directory_skips_hidden_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path());
        let recorded = recorder.record(&result("1.0.0", 10)).unwrap();
        fs::write(dir.path().join(".hidden.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a result").unwrap();

        let files = collect_files(&[dir.path().to_owned()]).unwrap();
        assert_eq!(files, vec![recorded]);
    }

    #[test]
    fn test_explicit_files_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path());
        let file = recorder.record(&result("1.0.0", 10)).unwrap();

        assert_eq!(collect_files(&[file.clone()]).unwrap(), vec![file]);
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            collect_files(&[missing]),
            Err(WsPerfError::Summary { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(summarize(&[dir.path().to_owned()]).unwrap(), None);
    }

    #[test]
    fn test_malformed_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1.0.0.json");
        fs::write(&file, "not json").unwrap();
        assert!(matches!(
            load_results(&[file]),
            Err(WsPerfError::Summary { .. })
        ));
    }
}
