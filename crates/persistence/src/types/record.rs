//! The record entity and its gender enumeration.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Gender of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Not known. The default.
    #[default]
    Unknown,
}

impl Gender {
    /// Returns the wire name of this gender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "UNKNOWN" => Ok(Gender::Unknown),
            _ => Err(ValidationError::InvalidGender {
                value: s.to_string(),
            }),
        }
    }
}

/// A record persisted through the gateway.
///
/// `id` and `revision` are owned by the store: they are empty on a freshly
/// constructed record and are filled in by `create`, refreshed by `update`,
/// and populated on records returned from queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub(crate) id: Option<String>,
    pub(crate) revision: Option<String>,
    /// Display name. Required and non-empty for writes.
    pub name: String,
    /// Free-form category, e.g. "dog".
    pub category: Option<String>,
    /// Whether the record is available.
    pub available: bool,
    /// Gender.
    pub gender: Gender,
    /// Date of birth.
    pub birthday: NaiveDate,
}

impl Record {
    /// Creates an unsaved record with default attributes: no category,
    /// available, unknown gender, born today.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            revision: None,
            name: name.into(),
            category: None,
            available: true,
            gender: Gender::Unknown,
            birthday: Local::now().date_naive(),
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets availability.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Sets the gender.
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// Sets the birthday.
    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = birthday;
        self
    }

    /// Store-assigned id, if the record has been persisted or loaded.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Revision returned by the store on the last write or read.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Returns `true` once the record has an id.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns `true` if the five data fields match, ignoring id and revision.
    pub fn same_data(&self, other: &Record) -> bool {
        self.name == other.name
            && self.category == other.category
            && self.available == other.available
            && self.gender == other.gender
            && self.birthday == other.birthday
    }

    /// Checks the invariants required before the record can be written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" });
        }
        Ok(())
    }

    /// Returns the id and revision, or an error naming `operation`.
    pub(crate) fn identity(
        &self,
        operation: &'static str,
    ) -> Result<(&str, &str), ValidationError> {
        match (self.id(), self.revision()) {
            (Some(id), Some(rev)) if !id.is_empty() && !rev.is_empty() => Ok((id, rev)),
            _ => Err(ValidationError::MissingIdentity { operation }),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Record {} id=[{}]>", self.name, self.id().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_str_exhaustive() {
        assert_eq!("MALE".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("UNKNOWN".parse::<Gender>().unwrap(), Gender::Unknown);

        // Lookups are exact: no case folding, no numeric aliases.
        assert!("male".parse::<Gender>().is_err());
        assert!("0".parse::<Gender>().is_err());
        assert_eq!(
            "OTHER".parse::<Gender>().unwrap_err(),
            ValidationError::InvalidGender {
                value: "OTHER".to_string()
            }
        );
    }

    #[test]
    fn test_gender_display_matches_wire_name() {
        for gender in [Gender::Male, Gender::Female, Gender::Unknown] {
            assert_eq!(gender.to_string().parse::<Gender>().unwrap(), gender);
        }
    }

    #[test]
    fn test_new_record_defaults() {
        let record = Record::new("Fido");
        assert_eq!(record.id(), None);
        assert_eq!(record.revision(), None);
        assert!(!record.is_persisted());
        assert_eq!(record.category, None);
        assert!(record.available);
        assert_eq!(record.gender, Gender::Unknown);
        assert_eq!(record.birthday, Local::now().date_naive());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(Record::new("Fido").validate().is_ok());
        assert_eq!(
            Record::new("  ").validate().unwrap_err(),
            ValidationError::MissingField { field: "name" }
        );
    }

    #[test]
    fn test_identity_requires_id_and_revision() {
        let mut record = Record::new("Fido");
        assert!(record.identity("update").is_err());

        record.id = Some("abc".to_string());
        assert_eq!(
            record.identity("delete").unwrap_err(),
            ValidationError::MissingIdentity {
                operation: "delete"
            }
        );

        record.revision = Some("1-a".to_string());
        assert_eq!(record.identity("update").unwrap(), ("abc", "1-a"));
    }

    #[test]
    fn test_display() {
        let record = Record::new("Fido");
        assert_eq!(record.to_string(), "<Record Fido id=[]>");
    }
}
