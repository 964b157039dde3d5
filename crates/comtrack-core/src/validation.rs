//! # Validation Module
//!
//! Boundary checks for request input. Everything here runs before a request
//! reaches the period calculator or the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum)                                        │
//! │  └── JSON shape, Money parsing (serde)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── names trimmed, non-empty, bounded                                 │
//! │  ├── ids are UUIDs                                                     │
//! │  ├── period ∈ {month, quarter, year}                                   │
//! │  └── dates parse; months normalize to the 1st                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (entity type name)                                         │
//! │  └── Foreign keys (entity → type, transaction → entity)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::period::{first_of_month, PeriodKind};
use crate::types::{NewEntity, NewEntityType};
use crate::{MAX_NAME_LENGTH, MAX_YEAR, MIN_YEAR};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use comtrack_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Motor ").unwrap(), "Motor");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

/// Validates that `value` is a UUID and returns it in canonical form.
pub fn validate_id(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    Uuid::parse_str(value)
        .map(|id| id.to_string())
        .map_err(|e| ValidationError::invalid_format(field, e.to_string()))
}

// =============================================================================
// Period & Date Validators
// =============================================================================

/// Parses the `period` query parameter. Missing or empty means `month`.
pub fn parse_period(value: Option<&str>) -> ValidationResult<PeriodKind> {
    match value.map(str::trim) {
        None | Some("") => Ok(PeriodKind::Month),
        Some(raw) => raw.parse(),
    }
}

/// Parses a reference date: `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// For timestamps the calendar date as written is used, without converting
/// between time zones. Years outside `MIN_YEAR..=MAX_YEAR` are rejected.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use comtrack_core::validation::parse_reference_date;
///
/// let expected = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// assert_eq!(parse_reference_date("2024-03-10").unwrap(), expected);
/// assert_eq!(parse_reference_date("2024-03-10T18:30:00+05:30").unwrap(), expected);
/// assert!(parse_reference_date("2024-02-30").is_err());
/// ```
pub fn parse_reference_date(value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| {
            ValidationError::invalid_format("date", format!("'{}' is not a valid date", value))
        })?;

    within_supported_years("date", date)
}

/// Parses a transaction month and normalizes it to the first of the month.
///
/// Accepts `YYYY-MM`, `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_month(value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required("month"));
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d") {
        return within_supported_years("month", date);
    }

    parse_reference_date(value)
        .map(first_of_month)
        .map_err(|_| ValidationError::invalid_format("month", format!("'{}' is not a valid month", value)))
}

fn within_supported_years(field: &str, date: NaiveDate) -> ValidationResult<NaiveDate> {
    if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        Ok(date)
    } else {
        Err(ValidationError::invalid_format(
            field,
            format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        ))
    }
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates and normalizes a new entity type.
pub fn validate_new_entity_type(input: &NewEntityType) -> ValidationResult<NewEntityType> {
    Ok(NewEntityType {
        name: validate_name("name", &input.name)?,
    })
}

/// Validates and normalizes a new entity.
pub fn validate_new_entity(input: &NewEntity) -> ValidationResult<NewEntity> {
    Ok(NewEntity {
        name: validate_name("name", &input.name)?,
        type_id: validate_id("typeId", &input.type_id)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "Acme Insurance").unwrap(), "Acme Insurance");
        assert!(matches!(
            validate_name("name", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_name("name", &"x".repeat(MAX_NAME_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(validate_name("name", &"x".repeat(MAX_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_id() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(validate_id("entityId", &id).unwrap(), id);
        assert_eq!(
            validate_id("entityId", &id.to_uppercase()).unwrap(),
            id,
            "ids are canonicalized to lowercase"
        );
        assert!(validate_id("entityId", "not-a-uuid").is_err());
        assert!(matches!(
            validate_id("entityId", " "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_parse_period_defaults_to_month() {
        assert_eq!(parse_period(None).unwrap(), PeriodKind::Month);
        assert_eq!(parse_period(Some("")).unwrap(), PeriodKind::Month);
        assert_eq!(parse_period(Some("year")).unwrap(), PeriodKind::Year);
        assert!(matches!(
            parse_period(Some("decade")),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_parse_reference_date() {
        assert_eq!(parse_reference_date("2024-06-01").unwrap(), d(2024, 6, 1));
        assert_eq!(parse_reference_date("2024-06-01T00:00:00Z").unwrap(), d(2024, 6, 1));
        assert!(parse_reference_date("yesterday").is_err());
        assert!(parse_reference_date("").is_err());
        assert!(parse_reference_date("2023-02-29").is_err());
    }

    #[test]
    fn test_dates_outside_supported_years_rejected() {
        assert_eq!(parse_reference_date("0001-01-01").unwrap(), d(1, 1, 1));
        assert_eq!(parse_reference_date("9999-12-31").unwrap(), d(9999, 12, 31));

        for raw in ["-262143-01-15", "+262142-12-15", "0000-06-15", "+10000-01-01"] {
            assert!(
                matches!(
                    parse_reference_date(raw),
                    Err(ValidationError::InvalidFormat { .. })
                ),
                "{} should be rejected",
                raw
            );
        }

        assert!(parse_month("-262143-01").is_err());
        assert_eq!(parse_month("9999-12").unwrap(), d(9999, 12, 1));
    }

    #[test]
    fn test_parse_month_normalizes_to_first() {
        assert_eq!(parse_month("2024-04-17").unwrap(), d(2024, 4, 1));
        assert_eq!(parse_month("2024-04").unwrap(), d(2024, 4, 1));
        assert_eq!(parse_month("2024-02-29T10:00:00Z").unwrap(), d(2024, 2, 1));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("").is_err());
    }

    #[test]
    fn test_validate_new_entity() {
        let type_id = Uuid::new_v4().to_string();
        let entity = validate_new_entity(&NewEntity {
            name: "  Acme ".to_string(),
            type_id: type_id.clone(),
        })
        .unwrap();
        assert_eq!(entity.name, "Acme");
        assert_eq!(entity.type_id, type_id);

        assert!(validate_new_entity(&NewEntity {
            name: "Acme".to_string(),
            type_id: "42".to_string(),
        })
        .is_err());
    }
}
