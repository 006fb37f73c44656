//! Openpolis location documents.
//!
//! ```json
//! {
//!   "giunta":    [ { "first_name": "...", "charge": "Sindaco", "charge_descr": "...", ... } ],
//!   "consiglio": [ { "first_name": "...", "charge": "Presidente", "group": "...", ... } ]
//! }
//! ```
//!
//! The API answers `{"exception": "..."}` for unknown locations.

use crate::PeopleImportError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub giunta: Vec<Member>,
    #[serde(default)]
    pub consiglio: Vec<Member>,
}

/// One charge holder of the city government or the council.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub first_name: String,
    pub last_name: String,
    /// Timestamp; only the leading `YYYY-MM-DD` is used
    pub birth_date: String,
    #[serde(default)]
    pub birth_location: String,
    #[serde(default)]
    pub sex: String,
    pub date_start: String,
    #[serde(default)]
    pub charge: String,
    #[serde(default)]
    pub charge_descr: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub textual_rep: String,
}

impl Member {
    /// `first last - birth_date (birth_location): textual_rep`
    pub fn summary_line(&self) -> String {
        format!(
            "{} {} - {} ({}): {}",
            self.first_name, self.last_name, self.birth_date, self.birth_location, self.textual_rep
        )
    }
}

/// Turn an API/file response into location data.
pub fn parse_location(value: Value) -> Result<LocationData, PeopleImportError> {
    if let Some(exception) = value.get("exception") {
        let message = match exception {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(PeopleImportError::Api(message));
    }
    Ok(serde_json::from_value(value)?)
}

/// First `n` characters of `s`.
pub(crate) fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exception_is_an_api_error() {
        let err = parse_location(json!({"exception": "location not found"})).unwrap_err();
        assert!(matches!(err, PeopleImportError::Api(m) if m == "location not found"));
    }

    #[test]
    fn members_parse_with_optional_fields() {
        let data = parse_location(json!({
            "giunta": [{
                "first_name": "Anna", "last_name": "Verdi",
                "birth_date": "1965-03-12T00:00:00", "birth_location": "Udine",
                "sex": "F", "date_start": "2008-04-20T00:00:00",
                "charge": "Sindaco", "charge_descr": "", "textual_rep": "Sindaco"
            }],
            "consiglio": []
        }))
        .unwrap();
        assert_eq!(data.giunta.len(), 1);
        assert!(data.consiglio.is_empty());
        assert_eq!(data.giunta[0].group, None);
        assert_eq!(
            data.giunta[0].summary_line(),
            "Anna Verdi - 1965-03-12T00:00:00 (Udine): Sindaco"
        );
    }

    #[test]
    fn prefix_counts_characters() {
        assert_eq!(prefix("2008-04-20T00:00:00", 10), "2008-04-20");
        assert_eq!(prefix("abc", 10), "abc");
        assert_eq!(prefix("Lista civica Città Futura", 15), "Lista civica Ci");
        assert_eq!(prefix("àààà", 2), "àà");
    }
}
