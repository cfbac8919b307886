//! Grouped statistics over a store snapshot.

use std::collections::{HashMap, HashSet};

use crate::record::Record;
use crate::{Error, Result};

/// Rounds to two decimal places. Exact halves go to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Records sharing one value of the grouping field.
#[derive(Debug, Clone)]
pub struct Group<'a, R> {
    pub label: String,
    pub records: Vec<&'a R>,
}

impl<'a, R: Record> Group<'a, R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mean(&self, field: &str) -> Result<f64> {
        mean_of(&self.records, field)
    }
}

/// Groups records by the textual value of `field`. Groups appear in the order their
/// first member was inserted; members keep insertion order. Records without the
/// field are left out.
pub fn group_by<'a, R, I>(records: I, field: &str) -> Vec<Group<'a, R>>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut groups: Vec<Group<'a, R>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(value) = record.field(field) else {
            continue;
        };
        let label = value.label();
        match positions.get(&label) {
            Some(&pos) => groups[pos].records.push(record),
            None => {
                positions.insert(label.clone(), groups.len());
                groups.push(Group {
                    label,
                    records: vec![record],
                });
            }
        }
    }
    groups
}

/// Mean of a numeric field, rounded to two decimals.
///
/// An empty slice is an error ([`Error::EmptyGroup`]) rather than `0` or `NaN`;
/// callers report "not found" before getting here.
pub fn mean_of<R: Record>(records: &[&R], field: &str) -> Result<f64> {
    if records.is_empty() {
        return Err(Error::EmptyGroup);
    }
    let mut sum = 0.0;
    for record in records {
        sum += record
            .field(field)
            .and_then(|v| v.as_number())
            .ok_or_else(|| Error::InvalidField(field.to_string()))?;
    }
    Ok(round2(sum / records.len() as f64))
}

/// Overall statistics for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Records that carry the field.
    pub count: usize,
    /// Sum of the numeric values; text values contribute nothing.
    pub sum: f64,
    /// Number of distinct values.
    pub distinct: usize,
}

pub fn summarize<R: Record>(records: &[&R], field: &str) -> Summary {
    let mut summary = Summary::default();
    let mut seen = HashSet::new();
    for value in records.iter().filter_map(|r| r.field(field)) {
        summary.count += 1;
        if let Some(n) = value.as_number() {
            summary.sum += n;
        }
        seen.insert(value.label());
    }
    summary.distinct = seen.len();
    summary
}
