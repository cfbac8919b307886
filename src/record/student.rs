use std::borrow::Cow;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::aggregate::round2;
use crate::engine::persistence::Encoding;
use crate::engine::validate;
use crate::record::{FieldValue, Record};
use crate::Result;

/// Prefix for per-subject grade lookups, e.g. `subjects.Physics`.
pub const SUBJECT_FIELD_PREFIX: &str = "subjects.";

/// A student's academic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub key: String,
    pub group: String,
    pub full_name: FullName,
    pub course: u8,
    pub subjects: Grades,
    #[serde(default)]
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullName {
    pub surname: String,
    pub first_name: String,
    #[serde(default)]
    pub patronymic: String,
}

impl FullName {
    pub fn new(surname: &str, first_name: &str, patronymic: &str) -> Self {
        Self {
            surname: surname.to_string(),
            first_name: first_name.to_string(),
            patronymic: patronymic.to_string(),
        }
    }

    /// First name and patronymic, as shown next to the surname key.
    pub fn given_names(&self) -> String {
        format!("{} {}", self.first_name, self.patronymic).trim().to_string()
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.surname, self.given_names())
    }
}

impl Student {
    /// Builds a student and computes its average. Nothing is validated until the
    /// record is added to a store.
    pub fn new(key: &str, group: &str, full_name: FullName, course: u8, subjects: Grades) -> Self {
        let average = subjects.mean().map(round2).unwrap_or_default();
        Self {
            key: key.to_string(),
            group: group.to_string(),
            full_name,
            course,
            subjects,
            average,
        }
    }
}

impl Record for Student {
    const KEY_FIELD: &'static str = "key";
    const ENCODING: Encoding = Encoding::Keyed;

    fn key(&self) -> &str {
        &self.key
    }

    fn normalize(mut self) -> Result<Self> {
        self.group = self.group.trim().to_string();
        self.full_name.surname = self.full_name.surname.trim().to_string();
        self.full_name.first_name = self.full_name.first_name.trim().to_string();
        self.full_name.patronymic = self.full_name.patronymic.trim().to_string();

        validate::require_text("group", &self.group)?;
        validate::require_text("surname", &self.full_name.surname)?;
        validate::require_text("first name", &self.full_name.first_name)?;
        validate::validate_course(i64::from(self.course))?;
        validate::validate_subjects(&self.subjects)?;

        self.average = self.subjects.mean().map(round2).unwrap_or_default();
        Ok(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "key" => FieldValue::text(&self.key),
            "group" => FieldValue::text(&self.group),
            "surname" => FieldValue::text(&self.full_name.surname),
            "first_name" => FieldValue::text(&self.full_name.first_name),
            "patronymic" => FieldValue::text(&self.full_name.patronymic),
            "full_name" => FieldValue::Text(Cow::Owned(self.full_name.to_string())),
            "course" => FieldValue::Number(f64::from(self.course)),
            "average" => FieldValue::Number(self.average),
            other => {
                let subject = other.strip_prefix(SUBJECT_FIELD_PREFIX)?;
                FieldValue::Number(self.subjects.get(subject)?)
            }
        };
        Some(value)
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} - Group: {}, Course: {}, Avg: {} | {}",
            self.key,
            self.full_name.given_names(),
            self.group,
            self.course,
            self.average,
            self.subjects
        )
    }
}

/// Subject grades in entry order. Subject names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grades(Vec<(String, f64)>);

impl Grades {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grade for a subject, returning the previous grade if the subject
    /// was already present. Existing subjects keep their position.
    pub fn insert(&mut self, subject: impl Into<String>, grade: f64) -> Option<f64> {
        let subject = subject.into();
        match self.0.iter_mut().find(|(s, _)| *s == subject) {
            Some((_, g)) => Some(std::mem::replace(g, grade)),
            None => {
                self.0.push((subject, grade));
                None
            }
        }
    }

    pub fn get(&self, subject: &str) -> Option<f64> {
        self.0.iter().find(|(s, _)| s == subject).map(|(_, g)| *g)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(s, g)| (s.as_str(), *g))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unrounded arithmetic mean, `None` when there are no grades.
    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let sum: f64 = self.0.iter().map(|(_, g)| g).sum();
        Some(sum / self.0.len() as f64)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Grades {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut grades = Grades::new();
        for (subject, grade) in iter {
            grades.insert(subject, grade);
        }
        grades
    }
}

impl fmt::Display for Grades {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (subject, grade)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", subject, grade)?;
        }
        Ok(())
    }
}

impl Serialize for Grades {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (subject, grade) in &self.0 {
            map.serialize_entry(subject, grade)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Grades {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct GradesVisitor;

        impl<'de> Visitor<'de> for GradesVisitor {
            type Value = Grades;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of subject names to numeric grades")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Grades, A::Error> {
                let mut grades = Grades::new();
                while let Some((subject, grade)) = access.next_entry::<String, f64>()? {
                    grades.insert(subject, grade);
                }
                Ok(grades)
            }
        }

        deserializer.deserialize_map(GradesVisitor)
    }
}

/// The five-student roster used to seed a new data file.
pub fn sample_students() -> Vec<Student> {
    fn student(key: &str, group: &str, first: &str, patronymic: &str, course: u8, grades: [f64; 4]) -> Student {
        let subjects = ["Mathematics", "Programming", "Physics", "English"]
            .into_iter()
            .zip(grades)
            .collect();
        Student::new(key, group, FullName::new(key, first, patronymic), course, subjects)
    }

    vec![
        student("Petrenko", "IP-21", "Oleksandr", "Ivanovych", 2, [85.0, 92.0, 78.0, 88.0]),
        student("Kovalenko", "IP-21", "Maria", "Petrivna", 2, [95.0, 98.0, 90.0, 92.0]),
        student("Sydorenko", "IP-22", "Dmytro", "Oleksandrovych", 1, [75.0, 80.0, 70.0, 78.0]),
        student("Ivanenko", "IP-21", "Anna", "Serhiivna", 2, [88.0, 85.0, 82.0, 90.0]),
        student("Melnyk", "IP-22", "Volodymyr", "Mykolayovych", 1, [90.0, 88.0, 85.0, 87.0]),
    ]
}
