//! Pure field checks run before a record enters a store.

use crate::record::{Grades, Record};
use crate::{Error, Result, ValidationError};

pub const COURSE_MIN: i64 = 1;
pub const COURSE_MAX: i64 = 6;
pub const GRADE_MIN: f64 = 0.0;
pub const GRADE_MAX: f64 = 100.0;

/// Rejects blank keys and keys already present in `existing`.
pub fn validate_key<'a, I>(key: &str, existing: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyKey.into());
    }
    if existing.into_iter().any(|k| k == key) {
        return Err(Error::DuplicateKey(key.to_string()));
    }
    Ok(())
}

pub fn validate_course(n: i64) -> Result<u8> {
    if !(COURSE_MIN..=COURSE_MAX).contains(&n) {
        return Err(ValidationError::OutOfRange {
            field: "course",
            value: n,
            min: COURSE_MIN,
            max: COURSE_MAX,
        }
        .into());
    }
    Ok(n as u8)
}

pub fn validate_grade(subject: &str, grade: f64) -> Result<()> {
    if !(GRADE_MIN..=GRADE_MAX).contains(&grade) {
        return Err(ValidationError::InvalidGrade {
            subject: subject.to_string(),
            grade,
        }
        .into());
    }
    Ok(())
}

pub fn validate_subjects(subjects: &Grades) -> Result<()> {
    if subjects.is_empty() {
        return Err(ValidationError::EmptySubjects.into());
    }
    for (subject, grade) in subjects.iter() {
        require_text("subject name", subject)?;
        validate_grade(subject, grade)?;
    }
    Ok(())
}

pub fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field).into());
    }
    Ok(())
}

pub fn validate_height(height: f64) -> Result<()> {
    // NaN fails the comparison as well.
    if !(height.is_finite() && height > 0.0) {
        return Err(ValidationError::InvalidHeight(height).into());
    }
    Ok(())
}

/// A valid height that none of `existing` already has.
pub fn validate_new_height<I>(height: f64, existing: I) -> Result<()>
where
    I: IntoIterator<Item = f64>,
{
    validate_height(height)?;
    if existing.into_iter().any(|h| h == height) {
        return Err(ValidationError::DuplicateHeight(height).into());
    }
    Ok(())
}

/// Runs the key check against `existing` and then the record's own field checks,
/// returning the normalized record on success.
pub fn accept<'a, R, I>(record: R, existing: I) -> Result<R>
where
    R: Record,
    I: IntoIterator<Item = &'a str>,
{
    validate_key(record.key(), existing)?;
    record.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        let existing = ["Petrenko", "Melnyk"];
        assert!(validate_key("Kovalenko", existing).is_ok());
        assert!(matches!(validate_key("   ", existing), Err(Error::Validation(ValidationError::EmptyKey))));
        assert!(matches!(validate_key("Melnyk", existing), Err(Error::DuplicateKey(k)) if k == "Melnyk"));
    }

    #[test]
    fn test_validate_course_bounds() {
        assert_eq!(validate_course(1).unwrap(), 1);
        assert_eq!(validate_course(6).unwrap(), 6);
        for bad in [0, 7, -1, 300] {
            assert!(matches!(
                validate_course(bad),
                Err(Error::Validation(ValidationError::OutOfRange { field: "course", .. }))
            ));
        }
    }

    #[test]
    fn test_validate_subjects() {
        assert!(matches!(
            validate_subjects(&Grades::new()),
            Err(Error::Validation(ValidationError::EmptySubjects))
        ));

        let ok: Grades = [("Physics", 0.0), ("English", 100.0)].into_iter().collect();
        assert!(validate_subjects(&ok).is_ok());

        let bad: Grades = [("Physics", 78.0), ("English", 100.5)].into_iter().collect();
        match validate_subjects(&bad) {
            Err(Error::Validation(ValidationError::InvalidGrade { subject, grade })) => {
                assert_eq!(subject, "English");
                assert_eq!(grade, 100.5);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let nan: Grades = [("Physics", f64::NAN)].into_iter().collect();
        assert!(validate_subjects(&nan).is_err());
    }

    #[test]
    fn test_validate_height() {
        assert!(validate_height(172.5).is_ok());
        assert!(validate_height(0.0).is_err());
        assert!(validate_height(-3.0).is_err());
        assert!(validate_height(f64::NAN).is_err());
        assert!(validate_height(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_new_height() {
        assert!(validate_new_height(170.0, [165.0, 180.0]).is_ok());
        assert!(matches!(
            validate_new_height(180.0, [165.0, 180.0]),
            Err(Error::Validation(ValidationError::DuplicateHeight(h))) if h == 180.0
        ));
        assert!(matches!(
            validate_new_height(-1.0, std::iter::empty()),
            Err(Error::Validation(ValidationError::InvalidHeight(_)))
        ));
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("group", "IP-21").is_ok());
        assert!(matches!(
            require_text("group", " \t"),
            Err(Error::Validation(ValidationError::EmptyField("group")))
        ));
    }
}
