//! Multi-record shape of the cleansing endpoints.
//!
//! # Design
//! The cleansing API takes a JSON array of values and answers with an array
//! of records in the same order. `split` turns a single value or a keyed
//! list into that array while remembering the keys; `Batch::assemble` maps
//! the response records back onto the keys by position. A single value goes
//! through the same path under the synthetic key `"0"` and comes back as
//! `CleanOutput::Single`.

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

/// Key used for the lone record of a single-value call.
pub const SINGLE_KEY: &str = "0";

/// Input of a cleansing call.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanInput {
    Single(Value),
    /// Records keyed by caller-chosen names. Order is kept.
    Keyed(Vec<(String, Value)>),
}

impl From<&str> for CleanInput {
    fn from(value: &str) -> Self {
        CleanInput::Single(Value::String(value.to_string()))
    }
}

impl From<String> for CleanInput {
    fn from(value: String) -> Self {
        CleanInput::Single(Value::String(value))
    }
}

/// Objects become keyed input under their own keys (in document order),
/// arrays under their positions `"0".."n-1"`. Scalars are a single value.
impl From<Value> for CleanInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => CleanInput::Keyed(map.into_iter().collect()),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            scalar => CleanInput::Single(scalar),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for CleanInput {
    fn from(records: Vec<(K, V)>) -> Self {
        records.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CleanInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        CleanInput::Keyed(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Result of a cleansing call. `None` marks a record whose selector found
/// nothing; the rest of the batch is still returned.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanOutput {
    Single(Option<Value>),
    Keyed(Vec<(String, Option<Value>)>),
}

impl CleanOutput {
    /// The value of a single-value call. Always `None` for keyed output.
    pub fn single(&self) -> Option<&Value> {
        match self {
            CleanOutput::Single(value) => value.as_ref(),
            CleanOutput::Keyed(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            CleanOutput::Single(value) if key == SINGLE_KEY => value.as_ref(),
            CleanOutput::Single(_) => None,
            CleanOutput::Keyed(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.as_ref()),
        }
    }

    pub fn into_keyed(self) -> Vec<(String, Option<Value>)> {
        match self {
            CleanOutput::Single(value) => vec![(SINGLE_KEY.to_string(), value)],
            CleanOutput::Keyed(entries) => entries,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CleanOutput::Single(_) => 1,
            CleanOutput::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Projection = Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// What to extract from each response record.
pub enum Selector {
    /// Value of one top-level field. JSON `null` counts as absent.
    Field(String),
    /// Computed from the whole record; `None` when it cannot be computed.
    Projection(Projection),
}

impl Selector {
    pub fn field(name: impl Into<String>) -> Self {
        Selector::Field(name.into())
    }

    pub fn projection<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Selector::Projection(Box::new(f))
    }

    pub fn select(&self, record: &Value) -> Option<Value> {
        match self {
            Selector::Field(name) => record.get(name).filter(|v| !v.is_null()).cloned(),
            Selector::Projection(f) => f(record),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Selector::Projection(_) => f.write_str("Projection(..)"),
        }
    }
}

/// Input split into parallel key and value lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub keys: Vec<String>,
    pub values: Vec<Value>,
    pub single: bool,
}

pub fn split(input: CleanInput) -> Batch {
    match input {
        CleanInput::Single(value) => Batch {
            keys: vec![SINGLE_KEY.to_string()],
            values: vec![value],
            single: true,
        },
        CleanInput::Keyed(records) => {
            let (keys, values) = records.into_iter().unzip();
            Batch {
                keys,
                values,
                single: false,
            }
        }
    }
}

impl Batch {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Apply `selector` to `records[i]` for each `keys[i]`.
    ///
    /// The record count must match the key count; anything else means the
    /// positional correspondence is lost and is reported as an `Api` error.
    pub fn assemble(self, records: &[Value], selector: &Selector) -> Result<CleanOutput> {
        if records.len() != self.keys.len() {
            return Err(Error::Api {
                status: 200,
                detail: Some(format!(
                    "expected {} records in response, got {}",
                    self.keys.len(),
                    records.len()
                )),
            });
        }
        if self.single {
            return Ok(CleanOutput::Single(selector.select(&records[0])));
        }
        Ok(CleanOutput::Keyed(
            self.keys
                .into_iter()
                .zip(records)
                .map(|(key, record)| (key, selector.select(record)))
                .collect(),
        ))
    }
}
