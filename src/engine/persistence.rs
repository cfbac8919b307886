use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::engine::RecordStore;
use crate::{Error, Record, RecordWriter, Result};

/// On-disk shape of a store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `{"<key>": {<record body without the key>}, ...}`
    Keyed,
    /// `[{<record with its key field>}, ...]`
    Array,
}

/// Something that went wrong while loading, recovered from by skipping data.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Missing(PathBuf),
    Unreadable { path: PathBuf, reason: String },
    Malformed { path: PathBuf, reason: String },
    SkippedRecord { key: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Missing(path) => write!(f, "{} does not exist, starting empty", path.display()),
            Diagnostic::Unreadable { path, reason } => {
                write!(f, "could not read {}: {}, starting empty", path.display(), reason)
            }
            Diagnostic::Malformed { path, reason } => {
                write!(f, "could not parse {}: {}, starting empty", path.display(), reason)
            }
            Diagnostic::SkippedRecord { key, reason } => write!(f, "skipped record {}: {}", key, reason),
        }
    }
}

/// The result of [`Persistence::load`]: always a store, plus whatever was skipped.
#[derive(Debug)]
pub struct Loaded<R: Record> {
    pub store: RecordStore<R>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<R: Record> Loaded<R> {
    fn empty(diagnostic: Diagnostic) -> Self {
        Self {
            store: RecordStore::new(),
            diagnostics: vec![diagnostic],
        }
    }
}

/// Handles disk I/O for a [`RecordStore`].
///
/// Saves write the whole store to a temporary file in the same directory and then
/// rename it over the target, so an interrupted save never leaves a half-written file.
#[derive(Debug, Clone)]
pub struct Persistence {
    path: PathBuf,
    encoding: Encoding,
}

impl Persistence {
    pub fn new<P: AsRef<Path>>(path: P, encoding: Encoding) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            encoding,
        }
    }

    /// A handler using the record kind's own encoding.
    pub fn for_records<R: Record, P: AsRef<Path>>(path: P) -> Self {
        Self::new(path, R::ENCODING)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Loads the store file. Either encoding is accepted regardless of the configured
    /// one. This never fails: a missing or broken file gives an empty store.
    pub fn load<R: Record>(&self) -> Loaded<R> {
        let content = match fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No data file at {:?}, starting with an empty store", self.path);
                return Loaded::empty(Diagnostic::Missing(self.path.clone()));
            }
            Err(e) => {
                warn!("Could not read data file {:?}: {}", self.path, e);
                return Loaded::empty(Diagnostic::Unreadable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let doc: Value = match serde_json::from_slice(&content) {
            Ok(d) => d,
            Err(e) => {
                warn!("Could not parse data file {:?}: {}", self.path, e);
                return Loaded::empty(Diagnostic::Malformed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        match decode::<R>(doc) {
            Ok((store, diagnostics)) => {
                for d in &diagnostics {
                    warn!("{:?}: {}", self.path, d);
                }
                info!("Loaded {} records from {:?}", store.len(), self.path);
                Loaded { store, diagnostics }
            }
            Err(reason) => {
                warn!("Unexpected document in {:?}: {}", self.path, reason);
                Loaded::empty(Diagnostic::Malformed {
                    path: self.path.clone(),
                    reason,
                })
            }
        }
    }

    /// Writes the whole store atomically in the configured encoding.
    pub fn save<R: Record>(&self, store: &RecordStore<R>) -> Result<()> {
        let doc = encode(store, self.encoding)?;
        write_json(&self.path, &doc)?;
        info!("Saved {} records to {:?}", store.len(), self.path);
        Ok(())
    }
}

/// Writes any serializable value as pretty JSON using the same atomic strategy as
/// [`Persistence::save`].
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).map_err(|source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    // The temp file is owner-only; an existing target keeps its own mode.
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Serializes a store, keeping insertion order.
pub fn encode<R: Record>(store: &RecordStore<R>, encoding: Encoding) -> Result<Value> {
    match encoding {
        Encoding::Keyed => {
            let mut out = Map::new();
            for record in store.list() {
                let mut body = serde_json::to_value(record)?;
                if let Value::Object(fields) = &mut body {
                    fields.retain(|name, _| name != R::KEY_FIELD);
                }
                out.insert(record.key().to_string(), body);
            }
            Ok(Value::Object(out))
        }
        Encoding::Array => {
            let items = store
                .list()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Value::Array(items))
        }
    }
}

/// Turns either document shape into a store. Records that do not decode or do not
/// validate are skipped and reported; only a top-level shape mismatch is an error.
pub fn decode<R: Record>(doc: Value) -> std::result::Result<(RecordStore<R>, Vec<Diagnostic>), String> {
    let entries: Vec<(String, std::result::Result<R, serde_json::Error>)> = match doc {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, body)| {
                let record = match body {
                    Value::Object(mut fields) => {
                        fields.insert(R::KEY_FIELD.to_string(), Value::String(key.clone()));
                        serde_json::from_value(Value::Object(fields))
                    }
                    other => serde_json::from_value(other),
                };
                (key, record)
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(pos, item)| {
                let label = item
                    .get(R::KEY_FIELD)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", pos + 1));
                (label, serde_json::from_value(item))
            })
            .collect(),
        other => return Err(format!("expected an object or an array, found {}", json_kind(&other))),
    };

    let mut store = RecordStore::new();
    let mut diagnostics = Vec::new();
    for (key, decoded) in entries {
        let outcome = decoded.map_err(Error::from).and_then(|record| store.add(record).map(|_| ()));
        if let Err(e) = outcome {
            diagnostics.push(Diagnostic::SkippedRecord {
                key,
                reason: e.to_string(),
            });
        }
    }
    Ok((store, diagnostics))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::student::sample_students;
    use crate::record::{Gender, HeightEntry, Student};
    use crate::RecordReader;
    use tempfile::tempdir;

    fn seeded() -> RecordStore<Student> {
        RecordStore::from_records(sample_students()).0
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let persistence = Persistence::for_records::<Student, _>(dir.path().join("students.json"));

        let store = seeded();
        persistence.save(&store).unwrap();

        let loaded = persistence.load::<Student>();
        assert!(loaded.diagnostics.is_empty());
        let before: Vec<&Student> = store.list().collect();
        let after: Vec<&Student> = loaded.store.list().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_atomic_rename_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("students.json");
        let persistence = Persistence::for_records::<Student, _>(&path);

        persistence.save(&seeded()).unwrap();
        persistence.save(&seeded()).unwrap();

        assert!(path.exists());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("students.json")]);
    }

    #[test]
    fn test_keyed_layout_and_formatting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("students.json");
        let persistence = Persistence::for_records::<Student, _>(&path);

        let mut store = RecordStore::new();
        let mut s = sample_students().remove(0);
        s.key = "Петренко".to_string();
        s.full_name.surname = "Петренко".to_string();
        store.add(s).unwrap();
        persistence.save(&store).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"Петренко\": {\n    \"group\": \"IP-21\","));
        assert!(!text.contains("\"key\""));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_load_original_keyed_format() {
        // Integer grades and no explicit key field, as the exercises wrote them.
        let json = r#"{
  "Sydorenko": {
    "group": "IP-22",
    "full_name": {"surname": "Sydorenko", "first_name": "Dmytro", "patronymic": "Oleksandrovych"},
    "course": 1,
    "subjects": {"Mathematics": 75, "Programming": 80, "Physics": 70, "English": 78},
    "average": 75.75
  },
  "Melnyk": {
    "group": "IP-22",
    "full_name": {"surname": "Melnyk", "first_name": "Volodymyr", "patronymic": "Mykolayovych"},
    "course": 1,
    "subjects": {"Mathematics": 90, "Programming": 88, "Physics": 85, "English": 87},
    "average": 1.0
  }
}"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("students.json");
        fs::write(&path, json).unwrap();

        let loaded = Persistence::for_records::<Student, _>(&path).load::<Student>();
        assert!(loaded.diagnostics.is_empty());
        let keys: Vec<&str> = loaded.store.keys().collect();
        assert_eq!(keys, vec!["Sydorenko", "Melnyk"]);
        // Stale averages are recomputed on the way in.
        assert_eq!(loaded.store.get("Melnyk").unwrap().average, 87.5);
        assert_eq!(loaded.store.get("Sydorenko").unwrap().subjects.get("Physics"), Some(70.0));
    }

    #[test]
    fn test_array_format_round_trip() {
        let json = r#"[
  {"name": "Ivan", "gender": "male", "height": 180.5},
  {"name": "Olena", "gender": "female", "height": 165}
]"#;
        let dir = tempdir().unwrap();
        let path = dir.path().join("heights.json");
        fs::write(&path, json).unwrap();

        let persistence = Persistence::for_records::<HeightEntry, _>(&path);
        let loaded = persistence.load::<HeightEntry>();
        assert!(loaded.diagnostics.is_empty());
        assert_eq!(loaded.store.get("Olena").unwrap().gender, Gender::Female);

        persistence.save(&loaded.store).unwrap();
        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            doc,
            serde_json::json!([
                {"name": "Ivan", "gender": "male", "height": 180.5},
                {"name": "Olena", "gender": "female", "height": 165.0}
            ])
        );
    }

    #[test]
    fn test_keyed_document_for_array_record_kind() {
        let doc = serde_json::json!({"Ivan": {"gender": "male", "height": 180.0}});
        let (store, diagnostics) = decode::<HeightEntry>(doc).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(store.get("Ivan").unwrap().height, 180.0);
    }

    #[test]
    fn test_missing_file_gives_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let loaded = Persistence::for_records::<Student, _>(&path).load::<Student>();
        assert!(loaded.store.is_empty());
        assert_eq!(loaded.diagnostics, vec![Diagnostic::Missing(path)]);
    }

    #[test]
    fn test_malformed_file_gives_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("students.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded = Persistence::for_records::<Student, _>(&path).load::<Student>();
        assert!(loaded.store.is_empty());
        assert!(matches!(loaded.diagnostics.as_slice(), [Diagnostic::Malformed { .. }]));

        fs::write(&path, "42").unwrap();
        let loaded = Persistence::for_records::<Student, _>(&path).load::<Student>();
        assert!(loaded.store.is_empty());
        assert!(matches!(loaded.diagnostics.as_slice(), [Diagnostic::Malformed { reason, .. }] if reason.contains("a number")));
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let doc = serde_json::json!([
            {"name": "Ivan", "gender": "male", "height": 180.0},
            {"name": "Ghost", "gender": "male", "height": -1.0},
            {"name": "Ivan", "gender": "male", "height": 170.0},
            {"gender": "female", "height": 160.0},
            {"name": "Olena", "gender": "other", "height": 160.0}
        ]);
        let (store, diagnostics) = decode::<HeightEntry>(doc).unwrap();
        assert_eq!(store.len(), 1);
        let skipped: Vec<&str> = diagnostics
            .iter()
            .map(|d| match d {
                Diagnostic::SkippedRecord { key, .. } => key.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(skipped, vec!["Ghost", "Ivan", "#4", "Olena"]);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempdir().unwrap();
        // The target is an existing directory, so the final rename fails.
        let persistence = Persistence::for_records::<Student, _>(dir.path());
        let err = persistence.save(&seeded()).unwrap_err();
        assert!(matches!(err, Error::Persistence { ref path, .. } if path == dir.path()));
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("result.json");
        write_json(&path, &[serde_json::json!({"ok": true})]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[\n  {\n    \"ok\": true\n  }\n]");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("students.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let persistence = Persistence::for_records::<Student, _>(&path);
        persistence
            .save(&RecordStore::from_records(sample_students()).0)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
