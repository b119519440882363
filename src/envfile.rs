//! Parses one environment JSON file into an ordered sequence of
//! `(operator, variable_name, raw_value)` entries. Accepts three top-level
//! shapes: a flat object, a pair array, or a structured object with an
//! `environment` key (and optional `environment_allowlist`).

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ContextExt, EnvoyError, Result};

/// One of the four operator prefixes recognised on an env-file key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// No prefix — unconditional replacement.
    Assign,
    /// `+=` — append to the current value.
    Append,
    /// `^=` — prepend to the current value.
    Prepend,
    /// `?=` — assign only if not already present.
    Default,
}

/// One assignment inside a parsed file.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    pub op: Operator,
    pub var_name: String,
    pub raw_value: Value,
}

/// One env JSON file, parsed. Immutable once built.
#[derive(Debug, Clone)]
pub struct ParsedEnvFile {
    pub path: PathBuf,
    pub entries: Vec<EnvEntry>,
    pub allowlist_vars: Vec<String>,
}

fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split an operator prefix (`?=`, `+=`, `^=`) off a raw JSON key.
fn split_operator(key: &str) -> (Operator, &str) {
    if let Some(rest) = key.strip_prefix("?=") {
        (Operator::Default, rest)
    } else if let Some(rest) = key.strip_prefix("+=") {
        (Operator::Append, rest)
    } else if let Some(rest) = key.strip_prefix("^=") {
        (Operator::Prepend, rest)
    } else {
        (Operator::Assign, key)
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> EnvoyError {
    EnvoyError::InvalidEnvFile { path: path.to_path_buf(), message: message.into() }
}

fn entries_from_pairs(path: &Path, pairs: &[Value], label: &str) -> Result<Vec<EnvEntry>> {
    let mut entries = Vec::with_capacity(pairs.len());
    for (idx, entry) in pairs.iter().enumerate() {
        let Value::Array(pair) = entry else {
            return Err(invalid(path, format!("{label} entry {idx} must be a [key, value] pair, got {entry}")));
        };
        let [key, value] = pair.as_slice() else {
            return Err(invalid(path, format!("{label} entry {idx} must be a [key, value] pair, got {entry}")));
        };
        let Value::String(key) = key else {
            return Err(invalid(path, format!("{label} entry {idx} key must be a string, got {key}")));
        };
        entries.push(entry_from_key_value(path, key, value.clone())?);
    }
    Ok(entries)
}

fn entries_from_object(path: &Path, map: &serde_json::Map<String, Value>) -> Result<Vec<EnvEntry>> {
    map.iter().map(|(key, value)| entry_from_key_value(path, key, value.clone())).collect()
}

fn entry_from_key_value(path: &Path, key: &str, value: Value) -> Result<EnvEntry> {
    let (op, var_name) = split_operator(key);
    if !is_valid_var_name(var_name) {
        return Err(invalid(path, format!("invalid variable name: '{var_name}'")));
    }
    Ok(EnvEntry { op, var_name: var_name.to_string(), raw_value: value })
}

fn allowlist_from_value(path: &Path, value: &Value) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(invalid(path, "'environment_allowlist' must be an array of variable names"));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(invalid(path, format!("'environment_allowlist' entries must be strings, got {other}"))),
        })
        .collect()
}

fn parse_structured(path: &Path, map: &serde_json::Map<String, Value>) -> Result<ParsedEnvFile> {
    let env_value = &map["environment"];
    let entries = match env_value {
        Value::Object(inner) => entries_from_object(path, inner)?,
        Value::Array(pairs) => entries_from_pairs(path, pairs, "environment")?,
        other => {
            return Err(invalid(
                path,
                format!("'environment' must be an object or array, got {other}"),
            ));
        }
    };

    let allowlist_vars = match map.get("environment_allowlist") {
        Some(value) => allowlist_from_value(path, value)?,
        None => Vec::new(),
    };

    let known = ["environment", "environment_allowlist"];
    let unknown: Vec<&str> = map.keys().map(String::as_str).filter(|k| !known.contains(k)).collect();
    if !unknown.is_empty() {
        tracing::warn!(path = %path.display(), keys = ?unknown, "unknown top-level keys in structured env file");
    }

    Ok(ParsedEnvFile { path: path.to_path_buf(), entries, allowlist_vars })
}

/// Parse one environment JSON file already read into memory.
pub fn parse_str(path: &Path, content: &str) -> Result<ParsedEnvFile> {
    let data: Value = serde_json::from_str(content)
        .map_err(|e| invalid(path, format!("invalid JSON: {e}")))?;

    match &data {
        Value::Object(map) if map.contains_key("environment") => parse_structured(path, map),
        Value::Object(map) => {
            Ok(ParsedEnvFile { path: path.to_path_buf(), entries: entries_from_object(path, map)?, allowlist_vars: Vec::new() })
        }
        Value::Array(pairs) => {
            Ok(ParsedEnvFile { path: path.to_path_buf(), entries: entries_from_pairs(path, pairs, "list")?, allowlist_vars: Vec::new() })
        }
        other => Err(invalid(path, format!("top-level value must be a JSON object or array, got {other}"))),
    }
}

/// Read and parse one environment JSON file from disk.
pub fn parse_file(path: &Path) -> Result<ParsedEnvFile> {
    if !path.exists() {
        return Err(EnvoyError::EnvFileMissing { path: path.to_path_buf() });
    }
    let content = fs::read_to_string(path).with_path(path)?;
    parse_str(path, &content)
}
