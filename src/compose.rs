//! The central merge engine. Consumes an ordered list of parsed files plus a
//! base map, applies operators left-to-right, and produces the final
//! environment map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::envfile::{Operator, ParsedEnvFile};
use crate::platform::{to_forward_slashes, PATH_SEPARATOR};
use crate::value;

/// Per-file bundle-local variables, computed from the file's path at merge time.
#[derive(Debug, Clone)]
pub struct SpecialVars {
    pub file: String,
    pub bundle: String,
    pub bundle_env: String,
    pub bundle_name: String,
}

const BUNDLE_ENV_DIR_NAME: &str = "envoy_env";

/// Compute `__FILE__`/`__BUNDLE__`/`__BUNDLE_ENV__`/`__BUNDLE_NAME__` for a
/// file by walking its ancestors looking for a directory named `envoy_env`.
/// Falls back to the file's parent directory when no such ancestor exists.
pub fn special_vars(path: &Path) -> SpecialVars {
    let file = to_forward_slashes(path);

    let mut bundle_env_dir: Option<&Path> = None;
    if let Some(parent) = path.parent() {
        let mut cursor = Some(parent);
        while let Some(dir) = cursor {
            if dir.file_name().is_some_and(|n| n == BUNDLE_ENV_DIR_NAME) {
                bundle_env_dir = Some(dir);
                break;
            }
            cursor = dir.parent();
        }
    }

    let (bundle_env, bundle) = match bundle_env_dir {
        Some(dir) => (dir, dir.parent().unwrap_or(dir)),
        None => {
            let parent = path.parent().unwrap_or(path);
            (parent, parent)
        }
    };

    let bundle_name = bundle.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    SpecialVars {
        file,
        bundle: to_forward_slashes(bundle),
        bundle_env: to_forward_slashes(bundle_env),
        bundle_name,
    }
}

impl SpecialVars {
    fn as_lookup_map(&self) -> HashMap<String, String> {
        HashMap::from([
            ("__FILE__".to_string(), self.file.clone()),
            ("__BUNDLE__".to_string(), self.bundle.clone()),
            ("__BUNDLE_ENV__".to_string(), self.bundle_env.clone()),
            ("__BUNDLE_NAME__".to_string(), self.bundle_name.clone()),
        ])
    }
}

/// Seed allowlisted variables from the host environment into `map`, for every
/// name declared across all files' `environment_allowlist`, in file order.
/// Only applied when the name is absent from `map` and present in `host_env`.
/// This runs as a pre-pass before any entry is processed, so a later file's
/// allowlist is visible to `+=`/`^=` operators in an earlier file.
fn seed_allowlists(files: &[ParsedEnvFile], map: &mut HashMap<String, String>, host_env: &HashMap<String, String>) {
    for file in files {
        for name in &file.allowlist_vars {
            if !map.contains_key(name)
                && let Some(value) = host_env.get(name)
            {
                map.insert(name.clone(), value.clone());
            }
        }
    }
}

fn apply_entry(map: &mut HashMap<String, String>, op: Operator, var_name: &str, processed: String) {
    match op {
        Operator::Assign => {
            map.insert(var_name.to_string(), processed);
        }
        Operator::Default => {
            map.entry(var_name.to_string()).or_insert(processed);
        }
        Operator::Append => {
            map.entry(var_name.to_string())
                .and_modify(|current| {
                    if !current.is_empty() {
                        current.push(PATH_SEPARATOR);
                        current.push_str(&processed);
                    } else {
                        *current = processed.clone();
                    }
                })
                .or_insert(processed);
        }
        Operator::Prepend => {
            map.entry(var_name.to_string())
                .and_modify(|current| {
                    if !current.is_empty() {
                        let mut next = processed.clone();
                        next.push(PATH_SEPARATOR);
                        next.push_str(current);
                        *current = next;
                    } else {
                        *current = processed.clone();
                    }
                })
                .or_insert(processed);
        }
    }
}

/// Compose the final environment map from an ordered list of parsed files
/// plus a base map. `base` is never mutated — a copy is made before any file
/// is processed.
///
/// `host_env` feeds the allowlist pre-pass only (§4.4); composition itself
/// never reads `std::env::var` directly, so the core stays a pure function
/// of its inputs. Callers typically pass the same process environment that
/// [`crate::seed`] derived `base` from.
pub fn compose(files: &[ParsedEnvFile], base: &HashMap<String, String>, host_env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut map = base.clone();

    seed_allowlists(files, &mut map, host_env);

    for file in files {
        let special = special_vars(&file.path).as_lookup_map();
        for entry in &file.entries {
            let processed = value::process(&entry.raw_value, &map, Some(&special));
            apply_entry(&mut map, entry.op, &entry.var_name, processed);
        }
    }

    map
}

/// Resolve env file paths for one command's origin directory, erroring if any
/// referenced file is missing on disk (single-file mode of §4.5).
pub fn require_files_exist(paths: &[PathBuf]) -> crate::error::Result<()> {
    for path in paths {
        if !path.exists() {
            return Err(crate::error::EnvoyError::EnvFileMissing { path: path.clone() });
        }
    }
    Ok(())
}
