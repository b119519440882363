use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Error taxonomy for envoy's environment-composition and command-resolution core.
///
/// Variants map 1:1 onto the conceptual error kinds of the composition engine:
/// a malformed env file, a missing file a resolved command depends on, an
/// unknown or circular command reference, an unknown command requested for
/// launch, and the I/O/JSON failures that can occur while reading bundles.
#[derive(Debug)]
pub enum EnvoyError {
    /// Malformed JSON, unsupported top-level shape, or a malformed pair-array entry.
    InvalidEnvFile { path: PathBuf, message: String },

    /// A file referenced by a resolved command does not exist on disk.
    EnvFileMissing { path: PathBuf },

    /// An `environment` entry without a dot names a command that is not registered.
    UnknownReference { name: String },

    /// A command reference chain revisited a command already in the visit set.
    CircularReference { name: String },

    /// The command name requested for launch is not registered.
    UnknownCommand { name: String },

    /// Wraps another error surfaced from a higher-level composition call.
    EnvBuildFailure { source: Box<EnvoyError> },

    /// Malformed `commands.json` or bundle-config JSON.
    InvalidCommandsFile { path: PathBuf, message: String },

    /// Filesystem or I/O failure reading a bundle, env file, or commands file.
    Io { path: Option<PathBuf>, source: io::Error },

    /// The launched child process could not be spawned.
    LaunchFailure { executable: String, source: io::Error },

    /// A JSON parse failure with no file path to attach (most call sites
    /// instead construct `InvalidEnvFile`/`InvalidCommandsFile` directly, so
    /// the path is reported); kept for generic `?`-propagation sites.
    Json(serde_json::Error),
}

impl fmt::Display for EnvoyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvoyError::InvalidEnvFile { path, message } => {
                write!(f, "invalid environment file {}: {}", path.display(), message)
            }
            EnvoyError::EnvFileMissing { path } => {
                write!(f, "environment file not found: {}", path.display())
            }
            EnvoyError::UnknownReference { name } => {
                write!(f, "environment reference '{name}' does not match any known command")
            }
            EnvoyError::CircularReference { name } => {
                write!(f, "circular environment reference detected at command '{name}'")
            }
            EnvoyError::UnknownCommand { name } => {
                write!(f, "unknown command: '{name}'")
            }
            EnvoyError::EnvBuildFailure { source } => {
                write!(f, "failed to build environment: {source}")
            }
            EnvoyError::InvalidCommandsFile { path, message } => {
                write!(f, "invalid commands file {}: {}", path.display(), message)
            }
            EnvoyError::Io { path: Some(path), source } => {
                write!(f, "I/O error at {}: {}", path.display(), source)
            }
            EnvoyError::Io { path: None, source } => write!(f, "I/O error: {source}"),
            EnvoyError::LaunchFailure { executable, source } => {
                write!(f, "failed to launch '{executable}': {source}")
            }
            EnvoyError::Json(source) => write!(f, "JSON error: {source}"),
        }
    }
}

impl Error for EnvoyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnvoyError::EnvBuildFailure { source } => Some(source.as_ref()),
            EnvoyError::Io { source, .. } => Some(source),
            EnvoyError::LaunchFailure { source, .. } => Some(source),
            EnvoyError::Json(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for EnvoyError {
    fn from(err: io::Error) -> Self {
        EnvoyError::Io { path: None, source: err }
    }
}

impl From<serde_json::Error> for EnvoyError {
    fn from(err: serde_json::Error) -> Self {
        EnvoyError::Json(err)
    }
}

/// Result type for envoy operations.
pub type Result<T> = std::result::Result<T, EnvoyError>;

/// Helper trait for attaching the file path an I/O error occurred at.
pub trait ContextExt<T> {
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> ContextExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| EnvoyError::Io { path: Some(path.to_path_buf()), source })
    }
}
