//! Record kinds managed by the store.
//!
//! A [`Record`] knows its own key, how to validate and normalize itself, and how to
//! expose its fields by name so that [`crate::engine::query`] and
//! [`crate::engine::aggregate`] can work on any record kind.

pub mod height;
pub mod student;

pub use height::{Gender, HeightComparison, HeightEntry};
pub use student::{FullName, Grades, Student};

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::persistence::Encoding;
use crate::Result;

/// A single entity managed by a [`crate::engine::RecordStore`].
pub trait Record: Clone + fmt::Debug + fmt::Display + Serialize + DeserializeOwned {
    /// Name of the identifying field when records are stored as a flat array.
    const KEY_FIELD: &'static str;
    /// Encoding used when saving a store of this record kind.
    const ENCODING: Encoding;

    /// The unique key of this record.
    fn key(&self) -> &str;

    /// Checks every non-key field and recomputes derived fields.
    fn normalize(self) -> Result<Self>;

    /// Looks up a field by name.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

/// A dynamically typed view of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
}

impl<'a> FieldValue<'a> {
    pub fn text(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(&**s),
            FieldValue::Number(_) => None,
        }
    }

    /// Textual form used as a grouping label.
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Total order over field values. Numbers sort before text.
    pub fn total_cmp(&self, other: &FieldValue<'_>) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Number(_), FieldValue::Text(_)) => Ordering::Less,
            (FieldValue::Text(_), FieldValue::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}
