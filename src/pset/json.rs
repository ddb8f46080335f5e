//! JSON as an alternative input format.
use serde_json::Value as Json;

use super::{ParameterSet, Value};
use crate::error::Error;
use crate::types::Scalar;

impl ParameterSet {
    /// Objects become tables, arrays sequences, `null` the atom `nil`.
    pub fn from_json(json: &Json) -> Result<Self, Error> {
        match json {
            Json::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), value_from_json(v)))
                .collect()),
            other => Err(Error::WrongType {
                key: "<document>".into(),
                expected: format!("a JSON object at top level, not {}", json_kind(other)),
            }),
        }
    }

    pub fn from_json_str(src: &str) -> Result<Self, Error> {
        let json = serde_json::from_str::<Json>(src)?;
        Self::from_json(&json)
    }
}

fn value_from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::atom("nil"),
        Json::Bool(b) => Value::atom(b.to_string()),
        Json::Number(n) => Value::atom(n.to_string()),
        Json::String(s) => Value::atom(Scalar::String(s.clone()).to_literal()),
        Json::Array(xs) => Value::sequence(xs.iter().map(value_from_json).collect()),
        Json::Object(map) => Value::table(
            map.iter()
                .map(|(k, v)| (k.clone(), value_from_json(v)))
                .collect(),
        ),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
