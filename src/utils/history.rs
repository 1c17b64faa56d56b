use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use crate::analysis::disease_report::DiseaseReport;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Store lock was poisoned")]
    PoisonedLock,
}

/// A JSON document on disk, read once and rewritten atomically on change.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    data: Mutex<T>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            load_or_default(&path)
        } else {
            let data = T::default();
            write_atomically(&path, &data)?;
            info!("Created store at {}", path.display());
            data
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, T>, StoreError> {
        self.data.lock().map_err(|_| StoreError::PoisonedLock)
    }

    pub fn read(&self) -> Result<T, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// Applies `change` to a copy and persists it; the in-memory value is
    /// only replaced once the file has been written.
    pub fn update<R, F>(&self, change: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut T) -> Result<R, StoreError>,
    {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let outcome = change(&mut next)?;
        write_atomically(&self.path, &next)?;
        *guard = next;
        Ok(outcome)
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let parsed = File::open(path)
        .map_err(StoreError::from)
        .and_then(|file| serde_json::from_reader(BufReader::new(file)).map_err(StoreError::from));

    match parsed {
        Ok(data) => data,
        Err(e) => {
            warn!("Could not read store {}: {}. Starting empty", path.display(), e);
            T::default()
        }
    }
}

fn write_atomically<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
    }
    temp.persist(path)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub report: DiseaseReport,
}

impl HistoryEntry {
    pub fn new(report: DiseaseReport) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self { timestamp, report }
    }
}

pub trait HistoryStore: Send + Sync {
    /// Inserts `entry` as the newest item.
    fn append(&self, entry: HistoryEntry) -> Result<(), StoreError>;

    /// Entries, newest first.
    fn list(&self) -> Result<Vec<HistoryEntry>, StoreError>;

    fn get(&self, index: usize) -> Result<HistoryEntry, StoreError>;

    fn delete(&self, index: usize) -> Result<HistoryEntry, StoreError>;
}

pub struct JsonFileHistory {
    store: JsonFileStore<Vec<HistoryEntry>>,
}

impl JsonFileHistory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            store: JsonFileStore::open(path)?,
        })
    }
}

impl HistoryStore for JsonFileHistory {
    fn append(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        self.store.update(|entries| {
            entries.insert(0, entry);
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        self.store.read()
    }

    fn get(&self, index: usize) -> Result<HistoryEntry, StoreError> {
        let entries = self.store.read()?;
        let len = entries.len();
        entries
            .into_iter()
            .nth(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })
    }

    fn delete(&self, index: usize) -> Result<HistoryEntry, StoreError> {
        self.store.update(|entries| {
            if index >= entries.len() {
                return Err(StoreError::IndexOutOfRange { index, len: entries.len() });
            }
            Ok(entries.remove(index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn entry(disease: &str) -> HistoryEntry {
        HistoryEntry::new(DiseaseReport {
            disease: disease.to_string(),
            ..DiseaseReport::default()
        })
    }

    #[test]
    fn appends_newest_first_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let history = JsonFileHistory::open(&path).unwrap();

        history.append(entry("asthma")).unwrap();
        history.append(entry("diabetes")).unwrap();

        let reopened = JsonFileHistory::open(&path).unwrap();
        let diseases: Vec<String> = reopened
            .list()
            .unwrap()
            .into_iter()
            .map(|entry| entry.report.disease)
            .collect();
        assert_eq!(diseases, vec!["diabetes", "asthma"]);
        assert!(OffsetDateTime::parse(&reopened.get(0).unwrap().timestamp, &Rfc3339).is_ok());
    }

    #[test]
    fn delete_out_of_range_leaves_history_untouched() {
        let dir = tempdir().unwrap();
        let history = JsonFileHistory::open(dir.path().join("history.json")).unwrap();
        history.append(entry("asthma")).unwrap();

        assert!(matches!(
            history.delete(3),
            Err(StoreError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(history.list().unwrap().len(), 1);

        let removed = history.delete(0).unwrap();
        assert_eq!(removed.report.disease, "asthma");
        assert!(history.list().unwrap().is_empty());
        assert!(history.get(0).is_err());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let history = JsonFileHistory::open(&path).unwrap();
        assert!(history.list().unwrap().is_empty());
        history.append(entry("asthma")).unwrap();
        assert_eq!(JsonFileHistory::open(&path).unwrap().list().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        let dir = tempdir().unwrap();
        let history = Arc::new(JsonFileHistory::open(dir.path().join("history.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let history = Arc::clone(&history);
                thread::spawn(move || history.append(entry(&format!("disease {}", i))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(history.list().unwrap().len(), 8);
        let reopened = JsonFileHistory::open(history.store.path()).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 8);
    }
}
