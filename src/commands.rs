//! Command registry and reference resolver: loads `commands.json` files into
//! named [`CommandDefinition`]s and recursively expands `environment` lists
//! into an ordered sequence of `(file_name, env_dir)` pairs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::bundle::Bundle;
use crate::error::{ContextExt, EnvoyError, Result};

/// One entry in `commands.json`: an executable (or alias chain) plus the
/// ordered list of environment-file/command-reference entries that build its
/// subprocess environment.
#[derive(Debug, Clone)]
pub struct CommandDefinition {
    pub name: String,
    /// Ordered references: entries with a dot in the basename are env file
    /// names, entries without are other command names.
    pub environment: Vec<String>,
    /// `alias[0]` is the executable, `alias[1:]` are base arguments
    /// prepended to caller-supplied arguments. Empty means the command name
    /// itself is the executable.
    pub alias: Vec<String>,
    /// Originating bundle, absent in single-file mode.
    pub bundle_id: Option<String>,
    /// Directory this command's file-name entries resolve against.
    pub env_dir: PathBuf,
}

impl CommandDefinition {
    pub fn executable(&self) -> &str {
        self.alias.first().map(String::as_str).unwrap_or(&self.name)
    }

    pub fn base_args(&self) -> &[String] {
        self.alias.get(1..).unwrap_or(&[])
    }
}

/// A resolved environment-file reference: which file, and which directory it
/// resolves against (the declaring command's `env_dir`, not the caller's).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub file_name: String,
    pub env_dir: PathBuf,
}

/// A purely syntactic test: a dot in the basename means file, no dot means
/// command reference. A command named e.g. `v1.2` is indistinguishable from
/// a file reference when it appears in another command's `environment` list
/// — that ambiguity is preserved rather than resolved by also checking the
/// registry.
fn is_file_reference(entry: &str) -> bool {
    Path::new(entry).file_name().map(|n| n.to_string_lossy().contains('.')).unwrap_or(false)
}

/// Collection of command definitions, built once per invocation and read
/// thereafter.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDefinition>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Load commands from a single `commands.json`, used in single-file mode.
    /// Invalid entries are skipped with a warning; valid entries still load.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(EnvoyError::InvalidCommandsFile {
                path: path.to_path_buf(),
                message: "commands file does not exist".to_string(),
            });
        }
        let content = std::fs::read_to_string(path).with_path(path)?;
        let data: Value = serde_json::from_str(&content).map_err(|e| EnvoyError::InvalidCommandsFile {
            path: path.to_path_buf(),
            message: format!("invalid JSON: {e}"),
        })?;
        let Value::Object(map) = data else {
            return Err(EnvoyError::InvalidCommandsFile {
                path: path.to_path_buf(),
                message: "top-level value must be a JSON object".to_string(),
            });
        };

        let env_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for (name, value) in map {
            match parse_command_entry(&name, &value, None, &env_dir) {
                Some(def) => {
                    self.commands.insert(name, def);
                }
                None => tracing::warn!(command = %name, path = %path.display(), "skipping invalid command entry"),
            }
        }
        Ok(())
    }

    /// Load commands from a list of bundles in declaration order. A later
    /// bundle's command overrides an earlier one with the same name; the
    /// collision is logged, naming both origin bundles.
    pub fn load_from_bundles(&mut self, bundles: &[Bundle]) -> Result<()> {
        for bundle in bundles {
            let commands_file = bundle.commands_file();
            if !commands_file.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&commands_file).with_path(&commands_file)?;
            let data: Value = serde_json::from_str(&content).map_err(|e| EnvoyError::InvalidCommandsFile {
                path: commands_file.clone(),
                message: format!("invalid JSON: {e}"),
            })?;
            let Value::Object(map) = data else {
                return Err(EnvoyError::InvalidCommandsFile {
                    path: commands_file.clone(),
                    message: "top-level value must be a JSON object".to_string(),
                });
            };

            for (name, value) in map {
                match parse_command_entry(&name, &value, Some(bundle.bndlid()), &bundle.envoy_env) {
                    Some(def) => {
                        if let Some(existing) = self.commands.get(&name) {
                            tracing::warn!(
                                command = %name,
                                previous_bundle = ?existing.bundle_id,
                                new_bundle = %bundle.bndlid(),
                                "command overridden by later bundle"
                            );
                        }
                        self.commands.insert(name, def);
                    }
                    None => tracing::warn!(command = %name, bundle = %bundle.bndlid(), "skipping invalid command entry"),
                }
            }
        }
        Ok(())
    }

    /// Resolve one command's full, ordered environment-file chain, expanding
    /// references recursively. `visited` is carried by value rather than
    /// mutated in place: each recursive call gets its own extended copy, so
    /// resolution stays a pure function safe to run concurrently against a
    /// shared registry.
    pub fn resolve_environment(&self, command_name: &str) -> Result<Vec<ResolvedFile>> {
        self.resolve_with_visited(command_name, HashSet::new())
    }

    fn resolve_with_visited(&self, command_name: &str, visited: HashSet<String>) -> Result<Vec<ResolvedFile>> {
        if visited.contains(command_name) {
            return Err(EnvoyError::CircularReference { name: command_name.to_string() });
        }
        let def = self
            .commands
            .get(command_name)
            .ok_or_else(|| EnvoyError::UnknownCommand { name: command_name.to_string() })?;

        let mut next_visited = visited;
        next_visited.insert(command_name.to_string());

        let mut resolved = Vec::with_capacity(def.environment.len());
        for entry in &def.environment {
            if is_file_reference(entry) {
                resolved.push(ResolvedFile { file_name: entry.clone(), env_dir: def.env_dir.clone() });
            } else if self.commands.contains_key(entry) {
                resolved.extend(self.resolve_with_visited(entry, next_visited.clone())?);
            } else {
                return Err(EnvoyError::UnknownReference { name: entry.clone() });
            }
        }
        Ok(resolved)
    }
}

/// Name of the env file every bundle (or, in single-file mode, the commands
/// file's own directory) contributes implicitly, ahead of any resolved file.
pub const GLOBAL_ENV_FILE: &str = "global_env.json";

/// File-path collection for single-file mode: `env_dir/global_env.json` is
/// prepended if present, then each resolved file resolves directly against
/// its declaring command's `env_dir`. Not named in spec.md §4.5 (which only
/// describes the multi-bundle global-env prepend) but present in the original
/// implementation's `_collect_env_files` for legacy mode too — carried over
/// as a silent-in-the-spec supplement.
pub fn collect_single_file_paths(env_dir: &Path, resolved: &[ResolvedFile]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let global_env = env_dir.join(GLOBAL_ENV_FILE);
    if global_env.is_file() {
        paths.push(global_env);
    }
    paths.extend(resolved.iter().map(|r| r.env_dir.join(&r.file_name)));
    paths
}

/// File-path collection for multi-bundle mode (spec.md §4.5): every bundle's
/// `global_env.json` (if present) is prepended in bundle declaration order;
/// then each resolved file name is looked up across every bundle's env-file
/// index and appended wherever it is found. A name present in more than one
/// bundle contributes one path per bundle, all merged into the composition —
/// unlike single-file mode, a resolved entry's own `env_dir` is not used here.
pub fn collect_bundle_env_paths(bundles: &[Bundle], resolved: &[ResolvedFile]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for bundle in bundles {
        if let Some(path) = bundle.env_files.get(GLOBAL_ENV_FILE) {
            paths.push(path.clone());
        }
    }
    for file in resolved {
        for bundle in bundles {
            if let Some(path) = bundle.env_files.get(&file.file_name) {
                paths.push(path.clone());
            }
        }
    }
    paths
}

fn parse_command_entry(name: &str, value: &Value, bundle_id: Option<String>, env_dir: &Path) -> Option<CommandDefinition> {
    let obj = value.as_object()?;
    let environment = match obj.get("environment")? {
        Value::Array(items) => items.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    let alias = match obj.get("alias") {
        Some(Value::Array(items)) => items.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()?,
        Some(_) => return None,
        None => Vec::new(),
    };
    Some(CommandDefinition {
        name: name.to_string(),
        environment,
        alias,
        bundle_id,
        env_dir: env_dir.to_path_buf(),
    })
}

/// Locate the single-file-mode `commands.json`: an `ENVOY_COMMANDS_FILE`
/// override if it names an existing file, otherwise the nearest
/// `envoy_env/commands.json` walking up from `start`. A stale/missing
/// override falls through to the directory walk rather than failing.
pub fn find_commands_file(start: &Path, host_env: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(path) = host_env.get("ENVOY_COMMANDS_FILE") {
        let override_path = PathBuf::from(path);
        if override_path.is_file() {
            return Some(override_path);
        }
    }
    let mut cursor = Some(start);
    while let Some(dir) = cursor {
        let candidate = dir.join("envoy_env").join("commands.json");
        if candidate.is_file() {
            return Some(candidate);
        }
        cursor = dir.parent();
    }
    None
}
