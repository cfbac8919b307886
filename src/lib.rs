//! Roster Store is a small in-memory keyed record store.
//!
//! Records are kept in insertion order under a unique key. Every record enters the
//! store through validation, leaves it only by whole-record removal, and the whole
//! collection is persisted to a single pretty-printed JSON file.
//!
//! ## Core Components
//! - [`record`]: The record kinds the store manages ([`Student`], [`HeightEntry`]).
//! - [`engine`]: Validation, the store itself, queries, aggregation and persistence.
//! - [`shell`]: The numbered-menu front end used by the `roster` binary.

pub mod engine;
pub mod record;
pub mod shell;

use std::path::PathBuf;
use thiserror::Error;

pub use record::{FieldValue, HeightEntry, Record, Student};

/// Errors returned by the Roster Store.
#[derive(Error, Debug)]
pub enum Error {
    /// A field value was rejected before the record reached the store.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// A record with this key is already stored.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// No record is stored under this key.
    #[error("record not found: {0}")]
    NotFound(String),
    /// An aggregate was requested over zero records.
    #[error("cannot aggregate an empty group")]
    EmptyGroup,
    /// The field is missing on a record or does not hold the expected kind of value.
    #[error("field `{0}` is missing or has the wrong type")]
    InvalidField(String),
    /// Writing the store or a report to disk failed.
    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error outside of a save.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Field-level rejections produced by [`engine::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("key cannot be empty")]
    EmptyKey,
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("at least one subject with a grade is required")]
    EmptySubjects,
    #[error("grade for '{subject}' must be between 0 and 100, got {grade}")]
    InvalidGrade { subject: String, grade: f64 },
    #[error("height must be a positive number, got {0}")]
    InvalidHeight(f64),
    #[error("height {0} cm is already recorded")]
    DuplicateHeight(f64),
    #[error("gender must be 'male' or 'female', got '{0}'")]
    InvalidGender(String),
}

/// A specialized Result type for Roster Store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Read access to a keyed collection of records.
pub trait RecordReader<R: Record> {
    /// Retrieves the record stored under `key`.
    fn get(&self, key: &str) -> Result<&R>;
    /// All records in insertion order.
    fn records(&self) -> &[R];
}

/// Whole-record mutations. There is no update operation.
pub trait RecordWriter<R: Record> {
    /// Validates and appends a record, returning the stored copy.
    fn add(&mut self, record: R) -> Result<&R>;
    /// Removes and returns the record stored under `key`.
    fn remove(&mut self, key: &str) -> Result<R>;
}
