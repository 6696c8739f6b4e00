//! Nested request model handed to the scanner.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A request field value: a scalar leaf or a nested structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A leaf string.
    Scalar(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// Named nested values.
    Map(BTreeMap<String, Value>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Scalar(String::new()),
            serde_json::Value::Bool(b) => Value::Scalar(b.to_string()),
            serde_json::Value::Number(n) => Value::Scalar(n.to_string()),
            serde_json::Value::String(s) => Value::Scalar(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Nested request data: area name → field name → value.
///
/// Areas are request sections like query parameters, form body or cookies.
/// The request-extraction collaborator has already applied any whitelist
/// before this structure is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    areas: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Request {
    /// Empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one field value under an area.
    pub fn insert(
        &mut self,
        area: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.areas
            .entry(area.into())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    /// Parse a request from a JSON document of shape
    /// `{"<area>": {"<field>": <value>, ...}, ...}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        let serde_json::Value::Object(areas) = parsed else {
            return Err(Error::invalid_request("top level must be an object"));
        };

        let mut request = Request::new();
        for (area, fields) in areas {
            let serde_json::Value::Object(fields) = fields else {
                return Err(Error::invalid_request(format!(
                    "area '{area}' must be an object"
                )));
            };
            for (field, value) in fields {
                request.insert(area.clone(), field, Value::from(value));
            }
        }
        Ok(request)
    }

    /// True if the request carries no fields.
    pub fn is_empty(&self) -> bool {
        self.areas.values().all(BTreeMap::is_empty)
    }

    /// Iterate areas and their fields.
    pub fn areas(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Value>)> {
        self.areas.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_iterate() {
        let mut request = Request::new();
        request.insert("GET", "q", "value");
        let (area, fields) = request.areas().next().unwrap();
        assert_eq!(area, "GET");
        assert_eq!(fields["q"], Value::Scalar("value".to_string()));
    }

    #[test]
    fn test_from_json_nested() {
        let request =
            Request::from_json(r#"{"POST": {"a": "x", "b": {"c": ["y", 2]}}}"#).unwrap();
        assert!(!request.is_empty());
        let (_, fields) = request.areas().next().unwrap();
        match &fields["b"] {
            Value::Map(map) => match &map["c"] {
                Value::List(items) => {
                    assert_eq!(items[0], Value::Scalar("y".to_string()));
                    assert_eq!(items[1], Value::Scalar("2".to_string()));
                }
                other => panic!("expected list, got {other:?}"),
            },
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_rejects_scalar_area() {
        assert!(Request::from_json(r#"{"GET": "oops"}"#).is_err());
        assert!(Request::from_json("[]").is_err());
    }
}
