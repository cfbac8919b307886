use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::aggregate::summarize;
use crate::engine::persistence::Encoding;
use crate::engine::query::{filter, Predicate};
use crate::engine::validate;
use crate::record::{FieldValue, Record};
use crate::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ValidationError::InvalidGender(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured person, identified by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightEntry {
    pub name: String,
    pub gender: Gender,
    pub height: f64,
}

impl HeightEntry {
    pub fn new(name: &str, gender: Gender, height: f64) -> Self {
        Self {
            name: name.to_string(),
            gender,
            height,
        }
    }
}

impl Record for HeightEntry {
    const KEY_FIELD: &'static str = "name";
    const ENCODING: Encoding = Encoding::Array;

    fn key(&self) -> &str {
        &self.name
    }

    fn normalize(self) -> Result<Self> {
        validate::validate_height(self.height)?;
        Ok(self)
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::text(&self.name)),
            "gender" => Some(FieldValue::text(self.gender.as_str())),
            "height" => Some(FieldValue::Number(self.height)),
            _ => None,
        }
    }
}

impl fmt::Display for HeightEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {} cm", self.name, self.gender, self.height)
    }
}

/// Total heights of girls versus boys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightComparison {
    pub total_girls_height: f64,
    pub total_boys_height: f64,
    pub girls_exceed_boys: bool,
    pub difference: f64,
    pub girls_count: usize,
    pub boys_count: usize,
}

impl HeightComparison {
    pub fn compute<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a HeightEntry>,
    {
        let entries: Vec<&HeightEntry> = entries.into_iter().collect();
        let girls = summarize(
            &filter(entries.iter().copied(), &Predicate::equals("gender", Gender::Female.as_str())),
            "height",
        );
        let boys = summarize(
            &filter(entries.iter().copied(), &Predicate::equals("gender", Gender::Male.as_str())),
            "height",
        );

        Self {
            total_girls_height: girls.sum,
            total_boys_height: boys.sum,
            girls_exceed_boys: girls.sum > boys.sum,
            difference: (girls.sum - boys.sum).abs(),
            girls_count: girls.count,
            boys_count: boys.count,
        }
    }
}
