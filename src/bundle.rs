//! A discovered bundle: a directory containing an `envoy_env/` subdirectory
//! with a `commands.json` and environment JSON files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ContextExt, EnvoyError, Result};

const ENV_DIR_NAME: &str = "envoy_env";

/// Version sentinel reserved for a future versioned-bundle registry. All
/// bundles built from a filesystem path use this value; no resolver logic
/// depends on it today (spec.md §9).
pub const BUNDLE_CHECKOUT: &str = "checkout";

/// Default namespace used when a bundle's parent directory name doesn't look
/// like a namespace token.
pub const DEFAULT_NAMESPACE: &str = "gt";

fn is_namespace_token(s: &str) -> bool {
    if s.is_empty() || s.len() > 20 {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Infer a bundle's namespace from its parent directory name, falling back
/// to [`DEFAULT_NAMESPACE`] when that name isn't a valid identifier token.
pub fn infer_namespace(bundle_root: &Path) -> String {
    match bundle_root.parent().and_then(|p| p.file_name()).map(|n| n.to_string_lossy().into_owned()) {
        Some(name) if is_namespace_token(&name) => name,
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

/// A discovered envoy bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub path: PathBuf,
    pub name: String,
    pub namespace: String,
    /// Absolute path to the `envoy_env/` subdirectory.
    pub envoy_env: PathBuf,
    /// Index of env-file-name → absolute path, scanned once at construction.
    pub env_files: HashMap<String, PathBuf>,
}

impl Bundle {
    /// Construct a bundle from a filesystem path that already has an
    /// `envoy_env/` subdirectory, inferring the namespace unless `namespace`
    /// is given explicitly.
    pub fn from_path(root: &Path, namespace: Option<String>) -> Result<Self> {
        if !root.is_dir() {
            return Err(EnvoyError::Io {
                path: Some(root.to_path_buf()),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "bundle path does not exist"),
            });
        }
        let envoy_env = root.join(ENV_DIR_NAME);
        if !envoy_env.is_dir() {
            return Err(EnvoyError::Io {
                path: Some(root.to_path_buf()),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a valid bundle (no envoy_env/)"),
            });
        }

        let namespace = namespace.unwrap_or_else(|| infer_namespace(root));
        let name = root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let env_files = index_env_files(&envoy_env)?;

        Ok(Bundle { path: root.to_path_buf(), name, namespace, envoy_env, env_files })
    }

    /// Namespaced package identifier: `"<namespace>:<name>"`.
    pub fn bndlid(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    /// Version of this bundle. Always [`BUNDLE_CHECKOUT`] today; reserved for
    /// a future production-bundle registry.
    pub fn version(&self) -> &'static str {
        BUNDLE_CHECKOUT
    }

    pub fn is_production(&self) -> bool {
        false
    }

    pub fn is_checkout(&self) -> bool {
        !self.is_production()
    }

    pub fn commands_file(&self) -> PathBuf {
        self.envoy_env.join("commands.json")
    }
}

fn index_env_files(envoy_env: &Path) -> Result<HashMap<String, PathBuf>> {
    let mut index = HashMap::new();
    let entries = std::fs::read_dir(envoy_env).with_path(envoy_env)?;
    for entry in entries {
        let entry = entry.with_path(envoy_env)?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) {
                index.insert(name, path);
            }
        }
    }
    Ok(index)
}

/// A bundle-config file: an explicit JSON list of bundle paths (or
/// `{"bundles": [...]}`), as passed via `--bundles-config`/`ENVOY_BUNDLES_CONFIG`.
pub fn load_bundles_from_config(config_file: &Path) -> Result<Vec<Bundle>> {
    let content = std::fs::read_to_string(config_file).with_path(config_file)?;
    let data: serde_json::Value = serde_json::from_str(&content).map_err(|e| EnvoyError::InvalidCommandsFile {
        path: config_file.to_path_buf(),
        message: format!("invalid JSON: {e}"),
    })?;

    let paths: Vec<String> = match &data {
        serde_json::Value::Object(map) => match map.get("bundles") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        },
        serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        other => {
            return Err(EnvoyError::InvalidCommandsFile {
                path: config_file.to_path_buf(),
                message: format!("bundle config must be a JSON object or array, got {other}"),
            });
        }
    };

    let mut bundles = Vec::new();
    for path_str in paths {
        let path = PathBuf::from(&path_str);
        match Bundle::from_path(&path, None) {
            Ok(bundle) => bundles.push(bundle),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "invalid bundle in config"),
        }
    }
    Ok(bundles)
}
