//! OpenMunicipio domain model
//!
//! Plain data types shared by the store and the importers:
//!
//! - [`acts`]: acts (a common record plus a per-kind payload), supports and attachments
//! - [`people`]: institutions, persons, institution charges, groups
//!
//! Every record carries a numeric id assigned by the store. Types here know
//! nothing about persistence; they only define identity keys and the fixed
//! token tables used by the XML/JSON sources.

pub mod acts;
pub mod people;

pub use acts::*;
pub use people::*;

use thiserror::Error;

/// Store-assigned record identifier.
pub type RecordId = u64;

/// Date format used by every source document (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown {field} value `{value}`")]
    UnknownToken { field: &'static str, value: String },

    #[error("invalid date `{value}` (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
}

/// Parse a source date, tolerating surrounding whitespace.
pub fn parse_date(value: &str) -> Result<chrono::NaiveDate, ModelError> {
    chrono::NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ModelError::InvalidDate {
            value: value.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates() {
        let d = parse_date(" 2012-06-22 ").unwrap();
        assert_eq!(d.to_string(), "2012-06-22");
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(matches!(
            parse_date("22/06/2012"),
            Err(ModelError::InvalidDate { .. })
        ));
    }
}
