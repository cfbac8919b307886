use std::collections::HashMap;

use log::debug;

use crate::engine::validate;
use crate::{Error, Record, RecordReader, RecordWriter, Result};

/// An insertion-ordered, keyed collection of records.
///
/// Every mutation is all-or-nothing: a failed `add` or `remove` leaves the
/// store exactly as it was.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    records: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `records` in order, skipping any that fail validation.
    /// The rejected keys are returned with their errors.
    pub fn from_records<I>(records: I) -> (Self, Vec<(String, Error)>)
    where
        I: IntoIterator<Item = R>,
    {
        let mut store = Self::new();
        let mut rejected = Vec::new();
        for record in records {
            let key = record.key().to_string();
            if let Err(e) = store.add(record) {
                rejected.push((key, e));
            }
        }
        (store, rejected)
    }

    /// Records in insertion order. The iterator can be cloned to restart it.
    pub fn list(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + Clone {
        self.records.iter().map(|r| r.key())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, record) in self.records.iter().enumerate().skip(start) {
            self.index.insert(record.key().to_string(), pos);
        }
    }
}

impl<R: Record> RecordReader<R> for RecordStore<R> {
    fn get(&self, key: &str) -> Result<&R> {
        self.index
            .get(key)
            .map(|&pos| &self.records[pos])
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn records(&self) -> &[R] {
        &self.records
    }
}

impl<R: Record> RecordWriter<R> for RecordStore<R> {
    fn add(&mut self, record: R) -> Result<&R> {
        let record = validate::accept(record, self.index.keys().map(String::as_str))?;
        let pos = self.records.len();
        debug!("Adding record {}", record.key());
        self.index.insert(record.key().to_string(), pos);
        self.records.push(record);
        Ok(&self.records[pos])
    }

    fn remove(&mut self, key: &str) -> Result<R> {
        let pos = self
            .index
            .remove(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        let record = self.records.remove(pos);
        self.reindex_from(pos);
        debug!("Removed record {}", key);
        Ok(record)
    }
}

impl<'a, R: Record> IntoIterator for &'a RecordStore<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::student::sample_students;
    use crate::record::{FullName, Grades, Student};
    use crate::ValidationError;

    fn seeded() -> RecordStore<Student> {
        let (store, rejected) = RecordStore::from_records(sample_students());
        assert!(rejected.is_empty());
        store
    }

    fn keys(store: &RecordStore<Student>) -> Vec<&str> {
        store.keys().collect()
    }

    #[test]
    fn test_add_then_get_has_rounded_average() {
        let mut store = RecordStore::new();
        let subjects: Grades = [("Mathematics", 90.0), ("Physics", 85.5), ("English", 70.25)].into_iter().collect();
        let mut s = Student::new("Bondar", "IP-23", FullName::new("Bondar", "Taras", ""), 3, subjects);
        s.average = 0.0;
        store.add(s).unwrap();

        let got = store.get("Bondar").unwrap();
        // (90 + 85.5 + 70.25) / 3 = 81.9166...
        assert_eq!(got.average, 81.92);
    }

    #[test]
    fn test_add_appends_in_insertion_order() {
        let store = seeded();
        assert_eq!(keys(&store), vec!["Petrenko", "Kovalenko", "Sydorenko", "Ivanenko", "Melnyk"]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_duplicate_add_leaves_store_unchanged() {
        let mut store = seeded();
        let before: Vec<Student> = store.list().cloned().collect();

        let mut dup = sample_students().remove(0);
        dup.group = "IP-99".to_string();
        assert!(matches!(store.add(dup), Err(Error::DuplicateKey(k)) if k == "Petrenko"));

        let after: Vec<Student> = store.list().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_invalid_add_leaves_store_unchanged() {
        let mut store = seeded();
        let bad = Student::new("Bondar", "IP-23", FullName::new("Bondar", "Taras", ""), 9, Grades::new());
        assert!(matches!(store.add(bad), Err(Error::Validation(ValidationError::OutOfRange { .. }))));
        assert_eq!(store.len(), 5);
        assert!(!store.contains("Bondar"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut store = RecordStore::new();
        let s = Student::new("", "IP-23", FullName::new("X", "Y", ""), 1, [("A", 1.0)].into_iter().collect());
        assert!(matches!(store.add(s), Err(Error::Validation(ValidationError::EmptyKey))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_then_get_not_found() {
        let mut store = seeded();
        let removed = store.remove("Sydorenko").unwrap();
        assert_eq!(removed.key, "Sydorenko");
        assert!(matches!(store.get("Sydorenko"), Err(Error::NotFound(_))));

        // Positions after the removed record are still reachable by key.
        assert_eq!(store.get("Melnyk").unwrap().group, "IP-22");
        assert_eq!(keys(&store), vec!["Petrenko", "Kovalenko", "Ivanenko", "Melnyk"]);
    }

    #[test]
    fn test_remove_missing_key() {
        let mut store = seeded();
        assert!(matches!(store.remove("Nobody"), Err(Error::NotFound(k)) if k == "Nobody"));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_readd_after_remove_goes_to_end() {
        let mut store = seeded();
        let removed = store.remove("Petrenko").unwrap();
        store.add(removed).unwrap();
        assert_eq!(keys(&store).last(), Some(&"Petrenko"));
        assert_eq!(store.get("Kovalenko").unwrap().average, 93.75);
    }

    #[test]
    fn test_list_is_restartable() {
        let store = seeded();
        let iter = store.list();
        let first: Vec<&str> = iter.clone().map(|s| s.key.as_str()).collect();
        let second: Vec<&str> = iter.map(|s| s.key.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_records_reports_rejections() {
        let mut records = sample_students();
        records.push(sample_students().remove(1));
        let (store, rejected) = RecordStore::from_records(records);
        assert_eq!(store.len(), 5);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "Kovalenko");
    }
}
