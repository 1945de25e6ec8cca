//! Response parsers.

use serde_json::Value;

use super::{Blackboard, ParseError};

/// Blackboard key the default parser merges decoded objects into.
pub const STRATEGY_KEY: &str = "strategy";

const FENCE: &str = "```";

/// Parser signature: decode `response` into the requester's blackboard.
pub type ParserFn = Box<dyn Fn(&str, &mut Blackboard) -> Result<(), ParseError> + Send + Sync>;

/// Remove a markdown code fence wrapping the whole text.
///
/// Handles both ```` ```json ... ``` ```` and ```` ``` ... ``` ````. Returns the
/// trimmed inner content if the text is fenced, otherwise the text unchanged.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() < 2 * FENCE.len() || !trimmed.starts_with(FENCE) || !trimmed.ends_with(FENCE)
    {
        return text;
    }
    let inner = &trimmed[FENCE.len()..trimmed.len() - FENCE.len()];
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Decode a JSON object response and shallow-merge it into the
/// [`STRATEGY_KEY`] entry of the blackboard.
///
/// # Errors
///
/// [`ParseError::InvalidJson`] if the text is not JSON,
/// [`ParseError::NotAnObject`] if it decodes to anything but an object,
/// [`ParseError::SlotNotAnObject`] if the blackboard already holds a
/// non-object under [`STRATEGY_KEY`]. That value is left as it was.
pub fn default_json_parser(response: &str, blackboard: &mut Blackboard) -> Result<(), ParseError> {
    let parsed: Value = serde_json::from_str(strip_code_fences(response))?;
    let Value::Object(fields) = parsed else {
        return Err(ParseError::NotAnObject(json_type_name(&parsed)));
    };
    match blackboard.object_mut(STRATEGY_KEY) {
        Some(strategy) => {
            strategy.extend(fields);
            Ok(())
        }
        None => Err(ParseError::SlotNotAnObject {
            key: STRATEGY_KEY,
            found: blackboard.get(STRATEGY_KEY).map_or("null", json_type_name),
        }),
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
