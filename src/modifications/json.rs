use serde_json::Value;

use super::{ModificationParser, ParseError};
use crate::document::Modification;

/// `[{"original_text": .., "new_text": .., "reason": ..}, ..]` or the same
/// array under a top-level `"modifications"` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ModificationParser for JsonParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, content: &str) -> bool {
        matches!(
            content.trim_start_matches('\u{FEFF}').trim_start().chars().next(),
            Some('[') | Some('{')
        )
    }

    fn parse(&self, content: &str) -> Result<Vec<Modification>, ParseError> {
        let value: Value = serde_json::from_str(content.trim_start_matches('\u{FEFF}'))?;
        let records = match &value {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("modifications") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ParseError::InvalidRecord {
                        index: 0,
                        reason: "expected an array or a \"modifications\" array".to_string(),
                    });
                }
            },
            _ => {
                return Err(ParseError::InvalidRecord {
                    index: 0,
                    reason: "expected an array of modification records".to_string(),
                });
            }
        };

        records
            .iter()
            .enumerate()
            .map(|(index, record)| parse_record(index, record))
            .collect()
    }
}

fn parse_record(index: usize, record: &Value) -> Result<Modification, ParseError> {
    let field = |name: &str| -> Result<String, ParseError> {
        match record.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => Err(ParseError::InvalidRecord {
                index,
                reason: format!("{name} is empty"),
            }),
            _ => Err(ParseError::InvalidRecord {
                index,
                reason: format!("missing string field {name}"),
            }),
        }
    };

    let original_text = field("original_text")?;
    let new_text = match record.get("new_text") {
        Some(Value::String(s)) => s.clone(),
        _ => field("new_text")?,
    };
    let reason = record
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Modification {
        original_text,
        new_text,
        reason,
    })
}
