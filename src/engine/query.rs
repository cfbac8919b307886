//! Read-only filtering and ordering over a store snapshot.
//!
//! Every function takes the records it works on by reference and returns them in a
//! new `Vec`, so results always keep insertion order unless a sort says otherwise.

use std::cmp::Ordering;

use crate::record::{FieldValue, Record};

/// A condition on one or more record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact match on the field's textual form, so `course = "2"` matches too.
    Equals { field: String, value: String },
    /// Case-insensitive substring match.
    Contains { field: String, needle: String },
    NumberEquals { field: String, value: f64 },
    /// Inclusive numeric range.
    Range { field: String, min: f64, max: f64 },
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(field: &str, value: &str) -> Self {
        Predicate::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Predicate::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }
    }

    pub fn number_equals(field: &str, value: f64) -> Self {
        Predicate::NumberEquals {
            field: field.to_string(),
            value,
        }
    }

    pub fn range(field: &str, min: f64, max: f64) -> Self {
        Predicate::Range {
            field: field.to_string(),
            min,
            max,
        }
    }

    /// A record lacking the field never matches.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Predicate::Equals { field, value } => {
                record.field(field).map(|v| v.label() == *value).unwrap_or(false)
            }
            Predicate::Contains { field, needle } => {
                let needle = needle.to_lowercase();
                record
                    .field(field)
                    .and_then(|v| v.as_text().map(|t| t.to_lowercase().contains(&needle)))
                    .unwrap_or(false)
            }
            Predicate::NumberEquals { field, value } => {
                record.field(field).and_then(|v| v.as_number()).map(|n| n == *value).unwrap_or(false)
            }
            Predicate::Range { field, min, max } => record
                .field(field)
                .and_then(|v| v.as_number())
                .map(|n| *min <= n && n <= *max)
                .unwrap_or(false),
            Predicate::All(preds) => preds.iter().all(|p| p.matches(record)),
        }
    }
}

pub fn filter<'a, R, I>(records: I, predicate: &Predicate) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    filter_by(records, |r| predicate.matches(r))
}

pub fn filter_by<'a, R, I, F>(records: I, mut keep: F) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
    F: FnMut(&R) -> bool,
{
    records.into_iter().filter(|r| keep(*r)).collect()
}

/// Stable sort on a named field. Ties keep insertion order in both directions and
/// records without the field go last.
pub fn sort_by_field<'a, R, I>(records: I, field: &str, descending: bool) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut keyed: Vec<(Option<FieldValue<'a>>, &'a R)> =
        records.into_iter().map(|r| (r.field(field), r)).collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(a),
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed.into_iter().map(|(_, r)| r).collect()
}

/// Stable sort on a derived key.
pub fn sort_by_key<'a, R, I, K, F>(records: I, key_fn: F, descending: bool) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
    K: Ord,
    F: Fn(&R) -> K,
{
    let mut sorted: Vec<&'a R> = records.into_iter().collect();
    if descending {
        sorted.sort_by(|a, b| key_fn(b).cmp(&key_fn(a)));
    } else {
        sorted.sort_by(|a, b| key_fn(a).cmp(&key_fn(b)));
    }
    sorted
}

/// The record whose numeric `field` is closest to `target`; the earliest wins a tie.
pub fn nearest<'a, R, I>(records: I, field: &str, target: f64) -> Option<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut best: Option<(f64, &'a R)> = None;
    for record in records {
        let Some(n) = record.field(field).and_then(|v| v.as_number()) else {
            continue;
        };
        let diff = (n - target).abs();
        if best.map_or(true, |(d, _)| diff < d) {
            best = Some((diff, record));
        }
    }
    best.map(|(_, r)| r)
}

/// The record a newcomer with `target` in `field` would follow in descending order:
/// the first record, tallest first, whose value is below `target`, or the last one
/// when nobody is below. Equal values keep insertion order.
pub fn insertion_point<'a, R, I>(records: I, field: &str, target: f64) -> Option<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut ranked: Vec<(f64, &'a R)> = records
        .into_iter()
        .filter_map(|r| r.field(field).and_then(|v| v.as_number()).map(|n| (n, r)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .iter()
        .find(|(n, _)| *n < target)
        .or_else(|| ranked.last())
        .map(|(_, r)| *r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordStore;
    use crate::record::student::sample_students;
    use crate::record::{Gender, HeightEntry, Student};
    use crate::RecordWriter;

    fn students() -> RecordStore<Student> {
        RecordStore::from_records(sample_students()).0
    }

    fn keys<R: Record>(records: &[&R]) -> Vec<String> {
        records.iter().map(|r| r.key().to_string()).collect()
    }

    #[test]
    fn test_sort_by_average_descending() {
        let mut store = RecordStore::new();
        for s in sample_students().into_iter().take(3) {
            store.add(s).unwrap();
        }
        // Petrenko 85.75, Kovalenko 93.75, Sydorenko 75.75
        let sorted = sort_by_field(&store, "average", true);
        assert_eq!(keys(&sorted), vec!["Kovalenko", "Petrenko", "Sydorenko"]);
    }

    #[test]
    fn test_sort_ties_keep_insertion_order() {
        let mut store = RecordStore::new();
        store.add(HeightEntry::new("A", Gender::Male, 170.0)).unwrap();
        store.add(HeightEntry::new("B", Gender::Female, 180.0)).unwrap();
        store.add(HeightEntry::new("C", Gender::Male, 170.0)).unwrap();
        store.add(HeightEntry::new("D", Gender::Female, 180.0)).unwrap();

        assert_eq!(keys(&sort_by_field(&store, "height", true)), vec!["B", "D", "A", "C"]);
        assert_eq!(keys(&sort_by_field(&store, "height", false)), vec!["A", "C", "B", "D"]);
        assert_eq!(
            keys(&sort_by_key(&store, |e: &HeightEntry| e.gender.as_str().to_string(), true)),
            vec!["A", "C", "B", "D"]
        );
    }

    #[test]
    fn test_sort_missing_field_goes_last() {
        let store = students();
        let sorted = sort_by_field(&store, "subjects.Chemistry", false);
        assert_eq!(sorted.len(), 5);
        assert_eq!(keys(&sorted)[0], "Petrenko");
    }

    #[test]
    fn test_sort_by_surname() {
        let store = students();
        let sorted = sort_by_key(&store, |s: &Student| s.key.clone(), false);
        assert_eq!(
            keys(&sorted),
            vec!["Ivanenko", "Kovalenko", "Melnyk", "Petrenko", "Sydorenko"]
        );
    }

    #[test]
    fn test_filter_group_exact() {
        let store = students();
        let found = filter(&store, &Predicate::equals("group", "IP-22"));
        assert_eq!(keys(&found), vec!["Sydorenko", "Melnyk"]);
        assert!(filter(&store, &Predicate::equals("group", "ip-22")).is_empty());
    }

    #[test]
    fn test_filter_on_empty_store() {
        let store: RecordStore<Student> = RecordStore::new();
        assert!(filter(&store, &Predicate::equals("group", "IP-22")).is_empty());
    }

    #[test]
    fn test_filter_contains_is_case_insensitive() {
        let store = students();
        let found = filter(&store, &Predicate::contains("full_name", "ENKO"));
        assert_eq!(keys(&found), vec!["Petrenko", "Kovalenko", "Sydorenko", "Ivanenko"]);
    }

    #[test]
    fn test_filter_numeric() {
        let store = students();
        assert_eq!(keys(&filter(&store, &Predicate::number_equals("course", 1.0))), vec!["Sydorenko", "Melnyk"]);
        assert_eq!(
            keys(&filter(&store, &Predicate::range("average", 85.75, 87.5))),
            vec!["Petrenko", "Ivanenko", "Melnyk"]
        );
        // A text field never satisfies a numeric predicate.
        assert!(filter(&store, &Predicate::range("group", 0.0, 100.0)).is_empty());
    }

    #[test]
    fn test_filter_all() {
        let store = students();
        let pred = Predicate::All(vec![
            Predicate::equals("group", "IP-21"),
            Predicate::range("subjects.Physics", 80.0, 100.0),
        ]);
        assert_eq!(keys(&filter(&store, &pred)), vec!["Kovalenko", "Ivanenko"]);
    }

    #[test]
    fn test_nearest() {
        let mut store = RecordStore::new();
        store.add(HeightEntry::new("A", Gender::Male, 170.0)).unwrap();
        store.add(HeightEntry::new("B", Gender::Female, 180.0)).unwrap();
        store.add(HeightEntry::new("C", Gender::Male, 190.0)).unwrap();

        assert_eq!(nearest(&store, "height", 176.0).map(|e| e.name.as_str()), Some("B"));
        assert_eq!(nearest(&store, "height", 175.0).map(|e| e.name.as_str()), Some("A"));
        assert!(nearest(&store, "weight", 175.0).is_none());
        assert!(nearest(&RecordStore::<HeightEntry>::new(), "height", 175.0).is_none());
    }

    fn heights(entries: &[(&str, f64)]) -> RecordStore<HeightEntry> {
        let mut store = RecordStore::new();
        for (name, h) in entries {
            store.add(HeightEntry::new(*name, Gender::Female, *h)).unwrap();
        }
        store
    }

    fn insert_after(store: &RecordStore<HeightEntry>, target: f64) -> Option<&str> {
        insertion_point(store, "height", target).map(|e| e.name.as_str())
    }

    #[test]
    fn test_insertion_point_between() {
        let store = heights(&[("A", 170.0), ("B", 180.0), ("C", 160.0)]);
        assert_eq!(insert_after(&store, 175.0), Some("A"));
        assert_eq!(insert_after(&store, 165.0), Some("C"));
    }

    #[test]
    fn test_insertion_point_tie_keeps_insertion_order() {
        let store = heights(&[("A", 170.0), ("B", 180.0), ("C", 170.0)]);
        assert_eq!(insert_after(&store, 175.0), Some("A"));
        // Nobody is shorter, so the last of the equal shortest wins.
        assert_eq!(insert_after(&store, 170.0), Some("C"));
    }

    #[test]
    fn test_insertion_point_above_everyone() {
        let store = heights(&[("A", 170.0), ("B", 180.0), ("C", 160.0)]);
        assert_eq!(insert_after(&store, 195.0), Some("B"));
    }

    #[test]
    fn test_insertion_point_below_everyone() {
        let store = heights(&[("A", 170.0), ("B", 180.0), ("C", 160.0)]);
        assert_eq!(insert_after(&store, 150.0), Some("C"));
    }

    #[test]
    fn test_insertion_point_empty_or_missing_field() {
        assert!(insertion_point(&RecordStore::<HeightEntry>::new(), "height", 170.0).is_none());
        let store = heights(&[("A", 170.0)]);
        assert!(insertion_point(&store, "weight", 170.0).is_none());
    }

    #[test]
    fn test_equals_on_numeric_field() {
        let store = students();
        let found = filter(&store, &Predicate::equals("course", "2"));
        assert_eq!(found.len(), 3);
        assert_eq!(filter(&store, &Predicate::equals("average", "85.75")).len(), 1);
        assert!(filter(&store, &Predicate::equals("course", "two")).is_empty());
    }
}
