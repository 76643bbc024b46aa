//! Tolerant JSON extraction from language-model text
//!
//! Model replies often wrap the JSON payload in prose or code fences. The
//! extractor scans for each `{` (or `[`) in order and parses a single JSON
//! value starting there, ignoring whatever follows it. The first candidate
//! that parses and deserializes into the requested type wins.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No JSON {0} found in response")]
    NotFound(&'static str),

    #[error("JSON {kind} found but did not match the expected shape: {message}")]
    Shape { kind: &'static str, message: String },
}

/// First well-formed JSON object in `text`, deserialized into `T`
pub fn first_object<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    first_value(text, '{', "object")
}

/// First well-formed JSON array in `text`, deserialized into `T`
pub fn first_array<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    first_value(text, '[', "array")
}

fn first_value<T: DeserializeOwned>(text: &str, open: char, kind: &'static str) -> Result<T, ExtractError> {
    let mut shape_error = None;

    for (start, _) in text.match_indices(open) {
        let mut deserializer = serde_json::Deserializer::from_str(&text[start..]);
        let Ok(value) = Value::deserialize(&mut deserializer) else {
            continue;
        };
        match serde_json::from_value::<T>(value) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                shape_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match shape_error {
        Some(message) => Err(ExtractError::Shape { kind, message }),
        None => Err(ExtractError::NotFound(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Brief {
        geographic: String,
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Here is the research you asked for:\n```json\n{\"geographic\": \"Rolling hills\"}\n```\nLet me know!";
        let brief: Brief = first_object(text).unwrap();
        assert_eq!(brief.geographic, "Rolling hills");
    }

    #[test]
    fn test_skips_malformed_candidate() {
        let text = "Note {not json} then {\"geographic\": \"ok\"}";
        let brief: Brief = first_object(text).unwrap();
        assert_eq!(brief.geographic, "ok");
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"geographic": "uses {braces} inside"} trailing }"#;
        let brief: Brief = first_object(text).unwrap();
        assert_eq!(brief.geographic, "uses {braces} inside");
    }

    #[test]
    fn test_array_extraction() {
        let text = "Sure. [{\"a\": 1}, {\"a\": 2}] done";
        let items: Vec<HashMap<String, i64>> = first_array(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["a"], 2);
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(
            first_object::<Brief>("no payload here"),
            Err(ExtractError::NotFound("object"))
        );
        assert_eq!(first_array::<Vec<i64>>("{ \"x\": 1 }"), Err(ExtractError::NotFound("array")));
    }

    #[test]
    fn test_wrong_shape_reported() {
        let result = first_object::<Brief>("{\"other\": 1}");
        assert!(matches!(result, Err(ExtractError::Shape { kind: "object", .. })));
    }
}
