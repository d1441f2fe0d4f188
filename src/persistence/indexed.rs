//! Indexed, transactional annotation store.
//!
//! Annotations are kept as individual records keyed by
//! `(resource_id, annotation_id)`, so the records of one resource form a
//! contiguous range of the key space. Every write runs as a transaction on a
//! staged copy that only replaces the live records once it has fully
//! succeeded (including writing the backing file, if any).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Annotation, AnnotationId};

use super::{StorageAdapter, StorageError};

/// Current database file format version.
pub const DATABASE_VERSION: u32 = 1;

type RecordKey = (String, AnnotationId);

/// One stored annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub resource_id: String,
    /// Position within the saved array, used to restore order.
    pub position: usize,
    pub annotation: Annotation,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatabaseFile {
    version: u32,
    records: Vec<AnnotationRecord>,
}

/// Staged view of the records handed to a transaction.
#[derive(Debug)]
pub struct Transaction {
    records: BTreeMap<RecordKey, AnnotationRecord>,
}

impl Transaction {
    /// Records of one resource in saved order.
    pub fn get_all<'a>(&'a self, resource_id: &'a str) -> Vec<&'a AnnotationRecord> {
        ordered_records(&self.records, resource_id)
    }

    pub fn put(&mut self, record: AnnotationRecord) {
        let key = (record.resource_id.clone(), record.annotation.id.clone());
        self.records.insert(key, record);
    }

    /// Delete every record of a resource. Returns how many were removed.
    pub fn delete_resource(&mut self, resource_id: &str) -> usize {
        let keys: Vec<RecordKey> = resource_records(&self.records, resource_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            self.records.remove(key);
        }
        keys.len()
    }
}

/// One resource's records sorted by saved position.
fn ordered_records<'a>(
    records: &'a BTreeMap<RecordKey, AnnotationRecord>,
    resource_id: &'a str,
) -> Vec<&'a AnnotationRecord> {
    let mut ordered: Vec<&'a AnnotationRecord> = resource_records(records, resource_id)
        .map(|(_, r)| r)
        .collect();
    ordered.sort_by_key(|r| r.position);
    ordered
}

/// The contiguous key range holding one resource's records.
fn resource_records<'a>(
    records: &'a BTreeMap<RecordKey, AnnotationRecord>,
    resource_id: &'a str,
) -> impl Iterator<Item = (&'a RecordKey, &'a AnnotationRecord)> + 'a {
    records
        .range((resource_id.to_string(), String::new())..)
        .take_while(move |((resource, _), _)| resource == resource_id)
}

#[derive(Debug, Default)]
pub struct IndexedStore {
    records: BTreeMap<RecordKey, AnnotationRecord>,
    path: Option<PathBuf>,
}

impl IndexedStore {
    /// An in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store backed by a JSON database file, loading it if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut store = Self {
            records: BTreeMap::new(),
            path: None,
        };
        if path.exists() {
            let json = fs::read_to_string(&path)?;
            let file: DatabaseFile = serde_json::from_str(&json)?;
            if file.version > DATABASE_VERSION {
                return Err(StorageError::Corrupt(format!(
                    "database version {} is newer than supported version {}",
                    file.version, DATABASE_VERSION
                )));
            }
            let mut tx = store.begin();
            for record in file.records {
                tx.put(record);
            }
            store.records = tx.records;
            log::info!("Opened annotation database {:?}", path);
        }
        store.path = Some(path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn begin(&self) -> Transaction {
        Transaction {
            records: self.records.clone(),
        }
    }

    /// Run `f` on a staged copy and commit it only if `f` and the file
    /// write both succeed.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, StorageError>,
    {
        let mut tx = self.begin();
        let value = f(&mut tx)?;
        if let Some(path) = &self.path {
            write_database(path, &tx.records)?;
        }
        self.records = tx.records;
        Ok(value)
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Resource ids that have at least one record.
    pub fn resources(&self) -> Vec<&str> {
        let mut resources: Vec<&str> = self.records.keys().map(|(r, _)| r.as_str()).collect();
        resources.dedup();
        resources
    }
}

fn write_database(
    path: &Path,
    records: &BTreeMap<RecordKey, AnnotationRecord>,
) -> Result<(), StorageError> {
    let file = DatabaseFile {
        version: DATABASE_VERSION,
        records: records.values().cloned().collect(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

impl StorageAdapter for IndexedStore {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn load(&mut self, resource_id: &str) -> Result<Vec<Annotation>, StorageError> {
        Ok(ordered_records(&self.records, resource_id)
            .into_iter()
            .map(|r| r.annotation.clone())
            .collect())
    }

    fn save(&mut self, resource_id: &str, annotations: &[Annotation]) -> Result<(), StorageError> {
        self.transaction(|tx| {
            tx.delete_resource(resource_id);
            for (position, annotation) in annotations.iter().enumerate() {
                let duplicate = tx
                    .records
                    .contains_key(&(resource_id.to_string(), annotation.id.clone()));
                if duplicate {
                    return Err(StorageError::Corrupt(format!(
                        "duplicate annotation id {} for {}",
                        annotation.id, resource_id
                    )));
                }
                tx.put(AnnotationRecord {
                    resource_id: resource_id.to_string(),
                    position,
                    annotation: annotation.clone(),
                });
            }
            Ok(())
        })
    }

    fn delete(&mut self, resource_id: &str) -> Result<(), StorageError> {
        let removed = self.transaction(|tx| Ok(tx.delete_resource(resource_id)))?;
        log::debug!("Deleted {} records of {}", removed, resource_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Geometry;

    fn point(id: &str, x: f64) -> Annotation {
        Annotation::with_id(id, Geometry::Point { x, y: 1.0 })
    }

    #[test]
    fn test_resources_are_isolated_and_ordered() {
        let mut store = IndexedStore::new();
        store
            .save("img-a", &[point("z", 1.0), point("b", 2.0)])
            .unwrap();
        store.save("img-b", &[point("q", 3.0)]).unwrap();
        store.save("img-aa", &[point("x", 4.0)]).unwrap();

        assert_eq!(
            store.load("img-a").unwrap(),
            vec![point("z", 1.0), point("b", 2.0)]
        );
        assert_eq!(store.load("img-b").unwrap(), vec![point("q", 3.0)]);
        assert_eq!(store.resources(), vec!["img-a", "img-aa", "img-b"]);
    }

    #[test]
    fn test_transaction_reads_staged_records_in_order() {
        let mut store = IndexedStore::new();
        store
            .save("img-a", &[point("z", 1.0), point("b", 2.0)])
            .unwrap();

        let ids = store
            .transaction(|tx| {
                tx.delete_resource("img-b");
                Ok(tx
                    .get_all("img-a")
                    .iter()
                    .map(|r| r.annotation.id.clone())
                    .collect::<Vec<_>>())
            })
            .unwrap();
        assert_eq!(ids, vec!["z".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_save_replaces_previous_set() {
        let mut store = IndexedStore::new();
        store.save("r", &[point("a", 1.0), point("b", 2.0)]).unwrap();
        store.save("r", &[point("b", 5.0)]).unwrap();
        assert_eq!(store.load("r").unwrap(), vec![point("b", 5.0)]);
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn test_failed_transaction_leaves_records_untouched() {
        let mut store = IndexedStore::new();
        store.save("r", &[point("a", 1.0)]).unwrap();

        let result = store.save("r", &[point("b", 1.0), point("b", 2.0)]);
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
        assert_eq!(store.load("r").unwrap(), vec![point("a", 1.0)]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = IndexedStore::new();
        store.save("r", &[point("a", 1.0)]).unwrap();
        store.delete("r").unwrap();
        store.delete("r").unwrap();
        assert!(store.load("r").unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store_reopens() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("db").join("annotations.json");

        let mut store = IndexedStore::open(&path).unwrap();
        store.save("r", &[point("a", 1.0), point("b", 2.0)]).unwrap();
        drop(store);

        let mut reopened = IndexedStore::open(&path).unwrap();
        assert_eq!(
            reopened.load("r").unwrap(),
            vec![point("a", 1.0), point("b", 2.0)]
        );
        assert_eq!(reopened.path(), Some(path.as_path()));
    }
}
