//! Endpoint vocabulary and response DTOs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::batch::Selector;

/// Endpoint-specific suggestion options (`count`, `locations`, ...). Passed
/// through to the API untouched; the client does not validate them.
pub type SuggestOptions = Map<String, Value>;

/// Cleansing endpoint family, one per kind of structured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanKind {
    Name,
    Phone,
    Passport,
    Email,
    Birthdate,
    Vehicle,
    Address,
}

impl CleanKind {
    /// Path segment under `/clean/`.
    pub fn as_str(self) -> &'static str {
        match self {
            CleanKind::Name => "name",
            CleanKind::Phone => "phone",
            CleanKind::Passport => "passport",
            CleanKind::Email => "email",
            CleanKind::Birthdate => "birthdate",
            CleanKind::Vehicle => "vehicle",
            CleanKind::Address => "address",
        }
    }

    /// What a cleansing call of this kind extracts from each record when
    /// the caller does not pass its own selector.
    pub fn default_selector(self) -> Selector {
        match self {
            CleanKind::Name | CleanKind::Vehicle | CleanKind::Address => Selector::field("result"),
            CleanKind::Phone => Selector::field("phone"),
            CleanKind::Email => Selector::field("email"),
            CleanKind::Birthdate => Selector::field("birthdate"),
            CleanKind::Passport => Selector::projection(passport_number),
        }
    }
}

/// `"{series} {number}"`, or `None` unless both are present.
pub fn passport_number(record: &Value) -> Option<Value> {
    let series = scalar_text(record.get("series")?)?;
    let number = scalar_text(record.get("number")?)?;
    Some(Value::String(format!("{series} {number}")))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Suggestion endpoint family (`suggest/{kind}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestKind {
    Fio,
    Address,
    Party,
    Bank,
    Email,
}

impl SuggestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestKind::Fio => "fio",
            SuggestKind::Address => "address",
            SuggestKind::Party => "party",
            SuggestKind::Bank => "bank",
            SuggestKind::Email => "email",
        }
    }
}

/// Lookup-by-identifier endpoint family (`findById/{kind}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindKind {
    /// Address by FIAS/KLADR code.
    Address,
    /// Delivery service city ids by KLADR code.
    Delivery,
    /// Organization by INN or OGRN.
    Party,
}

impl FindKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindKind::Address => "address",
            FindKind::Delivery => "delivery",
            FindKind::Party => "party",
        }
    }
}

/// One ranked candidate from a suggestion or lookup endpoint.
///
/// `data` holds the endpoint-specific structured fields and is kept as raw
/// JSON; its shape differs per endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Empty when the API sends `null` or omits it.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrestricted_value: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn passport_projection_joins_series_and_number() {
        let record = json!({"source": "12 345678", "series": "12", "number": "345678"});
        assert_eq!(passport_number(&record), Some(json!("12 345678")));
    }

    #[test]
    fn passport_projection_needs_both_parts() {
        assert_eq!(passport_number(&json!({"series": "12"})), None);
        assert_eq!(passport_number(&json!({"number": "345678"})), None);
        assert_eq!(passport_number(&json!({"series": null, "number": "345678"})), None);
    }

    #[test]
    fn default_selectors_pick_documented_fields() {
        let record = json!({"result": "Иванов", "phone": "+7 916 823-33-51", "email": "a@b.ru"});
        assert_eq!(CleanKind::Name.default_selector().select(&record), Some(json!("Иванов")));
        assert_eq!(
            CleanKind::Phone.default_selector().select(&record),
            Some(json!("+7 916 823-33-51"))
        );
        assert_eq!(CleanKind::Email.default_selector().select(&record), Some(json!("a@b.ru")));
        assert_eq!(CleanKind::Birthdate.default_selector().select(&record), None);
    }

    #[test]
    fn suggestion_tolerates_missing_optional_fields() {
        let s: Suggestion = serde_json::from_value(json!({"value": "Москва"})).unwrap();
        assert_eq!(s.value, "Москва");
        assert!(s.unrestricted_value.is_none());
        assert!(s.data.is_null());
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"value": "Москва"}));
    }

    #[test]
    fn suggestion_with_null_or_missing_value_still_decodes() {
        let s: Suggestion = serde_json::from_value(json!({"value": null, "data": {"inn": "7707083893"}})).unwrap();
        assert_eq!(s.value, "");
        assert_eq!(s.data["inn"], "7707083893");

        let s: Suggestion = serde_json::from_value(json!({"unrestricted_value": "г Москва"})).unwrap();
        assert_eq!(s.value, "");
        assert_eq!(s.unrestricted_value.as_deref(), Some("г Москва"));
    }

    #[test]
    fn kinds_map_to_path_segments() {
        assert_eq!(CleanKind::Birthdate.as_str(), "birthdate");
        assert_eq!(SuggestKind::Fio.as_str(), "fio");
        assert_eq!(FindKind::Delivery.as_str(), "delivery");
    }
}
