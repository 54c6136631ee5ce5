use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{EntryLocation, HistoryError, LogEntry, RecipeLog};

/// History kept as `<root>/<YYYY-MM-DD>/<name>.json`. The directory tree is
/// the only index; every call re-reads it.
#[derive(Debug, Clone)]
pub struct FileRecipeLog {
    root: PathBuf,
}

/// A single path segment that cannot climb out of its parent.
fn is_plain_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
}

fn list_dir(path: &Path) -> Result<fs::ReadDir, HistoryError> {
    fs::read_dir(path).map_err(|source| HistoryError::List {
        path: path.to_path_buf(),
        source,
    })
}

impl FileRecipeLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileRecipeLog { root: root.into() }
    }

    fn date_dir(&self, date: &str) -> Result<PathBuf, HistoryError> {
        if !is_plain_component(date) {
            return Err(HistoryError::NotFound("Date directory".to_string()));
        }
        let dir = self.root.join(date);
        if !dir.is_dir() {
            return Err(HistoryError::NotFound("Date directory".to_string()));
        }
        Ok(dir)
    }
}

impl RecipeLog for FileRecipeLog {
    fn put(&self, entry: &LogEntry) -> Result<EntryLocation, HistoryError> {
        let date = entry.date_key();
        let file_name = format!("{}.json", entry.file_stem());
        let date_dir = self.root.join(&date);

        fs::create_dir_all(&date_dir).map_err(|source| HistoryError::Write {
            path: date_dir.clone(),
            source,
        })?;

        let path = date_dir.join(&file_name);
        let body = serde_json::to_vec_pretty(entry)?;
        fs::write(&path, body).map_err(|source| HistoryError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("Stored history entry {} at {}", entry.id, path.display());
        Ok(EntryLocation {
            date,
            file_name,
            path,
        })
    }

    fn list_dates(&self) -> Result<Vec<String>, HistoryError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in list_dir(&self.root)? {
            let entry = entry.map_err(|source| HistoryError::List {
                path: self.root.clone(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                dates.push(name);
            }
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    fn list_entries(&self, date: &str) -> Result<Vec<String>, HistoryError> {
        let date_dir = self.date_dir(date)?;

        let mut names = Vec::new();
        for entry in list_dir(&date_dir)? {
            let entry = entry.map_err(|source| HistoryError::List {
                path: date_dir.clone(),
                source,
            })?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            if entry.path().is_file() {
                names.push(name);
            }
        }

        names.sort_unstable();
        Ok(names)
    }

    fn get(&self, date: &str, name: &str) -> Result<Value, HistoryError> {
        if !is_plain_component(date) || !is_plain_component(name) {
            return Err(HistoryError::NotFound("Recipe file".to_string()));
        }
        let path = self.root.join(date).join(name);
        if !path.is_file() {
            return Err(HistoryError::NotFound("Recipe file".to_string()));
        }

        let raw = fs::read_to_string(&path).map_err(|err| HistoryError::Read(err.to_string()))?;
        serde_json::from_str(&raw).map_err(|err| HistoryError::Read(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use serde_json::{json, Map};

    fn entry_on(day: u32, vibe: &str, prompt: &str) -> LogEntry {
        let mut output = Map::new();
        output.insert("vibe_match".to_string(), json!(vibe));
        output.insert("extra".to_string(), json!({ "kept": true }));
        let mut entry = LogEntry::new(prompt, 1, "gpt-4o", output);
        entry.timestamp = Local.with_ymd_and_hms(2025, 3, day, 21, 30, 0).unwrap();
        entry
    }

    #[test]
    fn put_writes_pretty_json_under_date_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());

        let location = log.put(&entry_on(7, "Golden Hour", "warm sunset")).unwrap();
        assert_eq!(location.date, "2025-03-07");
        assert_eq!(location.file_name, "Golden_Hour.json");
        assert_eq!(location.path, dir.path().join("2025-03-07/Golden_Hour.json"));

        let written = fs::read_to_string(&location.path).unwrap();
        assert!(written.contains("\n  \"user_input\": \"warm sunset\""));

        let stored = log.get("2025-03-07", "Golden_Hour.json").unwrap();
        assert_eq!(stored["user_input"], "warm sunset");
        assert_eq!(stored["image_count"], 1);
        assert_eq!(stored["output"]["extra"]["kept"], true);
    }

    #[test]
    fn same_day_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());

        log.put(&entry_on(1, "Tokyo Night!", "first")).unwrap();
        log.put(&entry_on(1, "Tokyo Night?", "second")).unwrap();

        let names = log.list_entries("2025-03-01").unwrap();
        assert_eq!(names, vec!["Tokyo_Night.json".to_string()]);
        let stored = log.get("2025-03-01", "Tokyo_Night.json").unwrap();
        assert_eq!(stored["user_input"], "second");
        assert_eq!(stored["output"]["vibe_match"], "Tokyo Night?");
    }

    #[test]
    fn lists_dates_newest_first_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());
        log.put(&entry_on(2, "B", "b")).unwrap();
        log.put(&entry_on(10, "A", "a")).unwrap();
        log.put(&entry_on(5, "C", "c")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            log.list_dates().unwrap(),
            vec!["2025-03-10", "2025-03-05", "2025-03-02"]
        );
    }

    #[test]
    fn missing_root_has_no_dates() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path().join("absent"));
        assert!(log.list_dates().unwrap().is_empty());
    }

    #[test]
    fn lists_only_json_files_in_ascending_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());
        log.put(&entry_on(4, "Zebra", "z")).unwrap();
        log.put(&entry_on(4, "Alpha", "a")).unwrap();
        let date_dir = dir.path().join("2025-03-04");
        fs::write(date_dir.join("readme.md"), "x").unwrap();
        fs::create_dir(date_dir.join("nested.json")).unwrap();

        assert_eq!(
            log.list_entries("2025-03-04").unwrap(),
            vec!["Alpha.json", "Zebra.json"]
        );
    }

    #[test]
    fn dot_prefixed_vibe_is_listed_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());

        let location = log.put(&entry_on(6, ".Tokyo Night", "leading dot")).unwrap();
        assert_eq!(location.file_name, ".Tokyo_Night.json");

        let names = log.list_entries("2025-03-06").unwrap();
        assert_eq!(names, vec![".Tokyo_Night.json"]);
        let stored = log.get("2025-03-06", &names[0]).unwrap();
        assert_eq!(stored["user_input"], "leading dot");
    }

    #[test]
    fn missing_date_is_not_found_and_empty_date_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());

        assert!(matches!(
            log.list_entries("2024-01-01"),
            Err(HistoryError::NotFound(_))
        ));

        fs::create_dir(dir.path().join("2024-01-02")).unwrap();
        assert!(log.list_entries("2024-01-02").unwrap().is_empty());
    }

    #[test]
    fn get_distinguishes_missing_from_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRecipeLog::new(dir.path());
        let date_dir = dir.path().join("2025-03-09");
        fs::create_dir(&date_dir).unwrap();
        fs::write(date_dir.join("broken.json"), "{ not json").unwrap();

        assert!(matches!(
            log.get("2025-03-09", "absent.json"),
            Err(HistoryError::NotFound(_))
        ));
        assert!(matches!(
            log.get("2025-03-09", "broken.json"),
            Err(HistoryError::Read(_))
        ));
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("result");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.json"), "{}").unwrap();
        let log = FileRecipeLog::new(&root);

        assert!(matches!(
            log.get("..", "secret.json"),
            Err(HistoryError::NotFound(_))
        ));
        assert!(matches!(
            log.list_entries(".."),
            Err(HistoryError::NotFound(_))
        ));
        assert!(matches!(
            log.get("x", "../../secret.json"),
            Err(HistoryError::NotFound(_))
        ));
    }
}
