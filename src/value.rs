//! Coerces a JSON value (string, list, or scalar) into a single string, then
//! runs it through the [`Expander`](crate::expander).

use std::collections::HashMap;

use serde_json::Value;

use crate::expander::{self, Lookup};
use crate::platform::PATH_SEPARATOR;

/// Stringify a single JSON scalar the "obvious" way: strings pass through
/// unquoted, everything else matches Python's `str()` (`None`/`True`/`False`
/// for null/booleans, since env files are merged against a system whose
/// scalar conversion is `str(value)`).
fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Coerce a raw JSON value into a string, joining list elements with the
/// platform path separator, then expand `${NAME}`/`{$NAME}` references
/// against `env` (and `special`, if given, which takes priority).
pub fn process(value: &Value, env: &HashMap<String, String>, special: Option<&HashMap<String, String>>) -> String {
    let raw = match value {
        Value::Array(items) => items
            .iter()
            .map(stringify_scalar)
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string()),
        other => stringify_scalar(other),
    };

    let lookup = match special {
        Some(special) => Lookup::with_special(env, special),
        None => Lookup::new(env),
    };
    expander::expand(&raw, &lookup)
}
