use log::error;

use crate::engine::persistence::{Diagnostic, Persistence};
use crate::engine::RecordStore;
use crate::{Record, RecordReader, RecordWriter, Result};

/// A [`RecordStore`] that saves itself after every successful mutation.
///
/// When a save fails the mutation is kept in memory and the error is returned, so
/// memory and disk differ until the next successful save.
pub struct FileStore<R: Record> {
    store: RecordStore<R>,
    persistence: Option<Persistence>,
}

impl<R: Record> FileStore<R> {
    pub fn new(store: RecordStore<R>, persistence: Option<Persistence>) -> Self {
        Self { store, persistence }
    }

    /// Loads the file behind `persistence` and keeps saving to it. Load problems are
    /// returned alongside the store instead of failing.
    pub fn open(persistence: Persistence) -> (Self, Vec<Diagnostic>) {
        let loaded = persistence.load::<R>();
        (Self::new(loaded.store, Some(persistence)), loaded.diagnostics)
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::new(RecordStore::new(), None)
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    pub fn persistence(&self) -> Option<&Persistence> {
        self.persistence.as_ref()
    }

    pub fn save(&self) -> Result<()> {
        match &self.persistence {
            Some(p) => p.save(&self.store).map_err(|e| {
                error!("Failed to persist store to {:?}: {}", p.path(), e);
                e
            }),
            None => Ok(()),
        }
    }
}

impl<R: Record> RecordReader<R> for FileStore<R> {
    fn get(&self, key: &str) -> Result<&R> {
        self.store.get(key)
    }

    fn records(&self) -> &[R] {
        self.store.records()
    }
}

impl<R: Record> RecordWriter<R> for FileStore<R> {
    /// On `Err(Error::Persistence { .. })` the record *was* added.
    fn add(&mut self, record: R) -> Result<&R> {
        let key = record.key().to_string();
        self.store.add(record)?;
        self.save()?;
        self.store.get(&key)
    }

    /// On `Err(Error::Persistence { .. })` the record *was* removed.
    fn remove(&mut self, key: &str) -> Result<R> {
        let removed = self.store.remove(key)?;
        self.save()?;
        Ok(removed)
    }
}
