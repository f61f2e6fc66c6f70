//! Local record store
//!
//! A small key/value store holding one JSON array per key, with typed record
//! lists on top. The in-memory store backs tests; the file store keeps one
//! `<key>.json` per list under a data directory.

use crate::approvals::records::{BeverageOrder, NdaRequest};
use crate::error::PortalError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub const BEVERAGE_ORDERS_KEY: &str = "beverage_orders";
pub const NDA_REQUESTS_KEY: &str = "nda_requests";
/// Beverage history keeps only the most recent orders
pub const BEVERAGE_ORDER_CAP: usize = 50;

/// String key/value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PortalError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PortalError>;
    fn remove(&mut self, key: &str) -> Result<(), PortalError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PortalError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PortalError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a data directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PortalError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PortalError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PortalError::Store(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PortalError> {
        let path = self.path_for(key)?;
        // atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PortalError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Records that can be looked up by id
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for BeverageOrder {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for NdaRequest {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A typed list stored as a JSON array under one key, oldest first
#[derive(Debug)]
pub struct RecordList<T> {
    key: &'static str,
    cap: Option<usize>,
    _record: PhantomData<T>,
}

impl<T> RecordList<T>
where
    T: Serialize + DeserializeOwned + Identified,
{
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            cap: None,
            _record: PhantomData,
        }
    }

    /// Keep at most `cap` records, dropping the oldest first
    pub const fn capped(key: &'static str, cap: usize) -> Self {
        Self {
            key,
            cap: Some(cap),
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// All records, oldest first. A missing key is an empty list.
    pub fn load<S: KeyValueStore>(&self, store: &S) -> Result<Vec<T>, PortalError> {
        match store.get(self.key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get<S: KeyValueStore>(&self, store: &S, id: &str) -> Result<Option<T>, PortalError> {
        Ok(self.load(store)?.into_iter().find(|r| r.id() == id))
    }

    fn save<S: KeyValueStore>(&self, store: &mut S, mut records: Vec<T>) -> Result<(), PortalError> {
        if let Some(cap) = self.cap {
            if records.len() > cap {
                let excess = records.len() - cap;
                records.drain(..excess);
                log::debug!("Dropped {excess} oldest record(s) from {}", self.key);
            }
        }
        store.set(self.key, &serde_json::to_string(&records)?)?;
        log::debug!("Saved {} record(s) to {}", records.len(), self.key);
        Ok(())
    }

    pub fn append<S: KeyValueStore>(&self, store: &mut S, record: T) -> Result<(), PortalError> {
        let mut records = self.load(store)?;
        records.push(record);
        self.save(store, records)
    }

    /// Apply `change` to the record with `id` and persist it. Nothing is
    /// written when the change fails.
    pub fn update<S, F, R>(&self, store: &mut S, id: &str, change: F) -> Result<R, PortalError>
    where
        S: KeyValueStore,
        F: FnOnce(&mut T) -> Result<R, PortalError>,
    {
        let mut records = self.load(store)?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| PortalError::NotFound(id.to_string()))?;

        let result = change(record)?;
        self.save(store, records)?;
        Ok(result)
    }

    pub fn clear<S: KeyValueStore>(&self, store: &mut S) -> Result<(), PortalError> {
        store.remove(self.key)?;
        log::info!("Cleared {}", self.key);
        Ok(())
    }
}

pub const BEVERAGE_ORDERS: RecordList<BeverageOrder> =
    RecordList::capped(BEVERAGE_ORDERS_KEY, BEVERAGE_ORDER_CAP);
pub const NDA_REQUESTS: RecordList<NdaRequest> = RecordList::new(NDA_REQUESTS_KEY);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Identified for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: usize) -> Note {
        Note {
            id: id.to_string(),
            text: format!("note {id}"),
        }
    }

    const NOTES: RecordList<Note> = RecordList::new("notes");

    #[test]
    fn test_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(NOTES.load(&store).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_update() {
        let mut store = MemoryStore::new();
        NOTES.append(&mut store, note(1)).unwrap();
        NOTES.append(&mut store, note(2)).unwrap();

        NOTES
            .update(&mut store, "2", |n| {
                n.text = "edited".to_string();
                Ok(())
            })
            .unwrap();

        let notes = NOTES.load(&store).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].text, "edited");
        assert!(matches!(
            NOTES.update(&mut store, "9", |_| Ok(())),
            Err(PortalError::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_update_is_not_saved() {
        let mut store = MemoryStore::new();
        NOTES.append(&mut store, note(1)).unwrap();

        let result: Result<(), _> = NOTES.update(&mut store, "1", |n| {
            n.text = "half-done".to_string();
            Err(PortalError::Store("nope".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(NOTES.get(&store, "1").unwrap(), Some(note(1)));
    }

    #[test]
    fn test_cap_drops_oldest() {
        let list: RecordList<Note> = RecordList::capped("notes", 50);
        let mut store = MemoryStore::new();
        for i in 0..55 {
            list.append(&mut store, note(i)).unwrap();
        }

        let notes = list.load(&store).unwrap();
        assert_eq!(notes.len(), 50);
        assert_eq!(notes[0].id, "5");
        assert_eq!(notes[49].id, "54");
    }

    #[test]
    fn test_clear() {
        let mut store = MemoryStore::new();
        NOTES.append(&mut store, note(1)).unwrap();
        NOTES.clear(&mut store).unwrap();
        assert!(NOTES.load(&store).unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("data")).unwrap();

        NOTES.append(&mut store, note(1)).unwrap();
        assert!(dir.path().join("data/notes.json").exists());

        let reopened = JsonFileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(NOTES.load(&reopened).unwrap(), vec![note(1)]);

        store.remove("notes").unwrap();
        store.remove("notes").unwrap();
        assert_eq!(store.get("notes").unwrap(), None);
    }

    #[test]
    fn test_failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();

        // a non-empty directory where the list file should go
        fs::create_dir_all(dir.path().join("notes.json/blocker")).unwrap();

        assert!(matches!(store.set("notes", "[]"), Err(PortalError::Store(_))));
        assert!(!dir.path().join("notes.json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("../etc"), Err(PortalError::Store(_))));
    }

    #[test]
    fn test_corrupt_list_is_an_error() {
        let mut store = MemoryStore::new();
        store.set("notes", "not json").unwrap();
        assert!(matches!(NOTES.load(&store), Err(PortalError::JsonError(_))));
    }
}
