// Platform-specific configuration consumed by ValueProcessor and the composer's
// APPEND/PREPEND operators. The separator is factored into this single point
// rather than sprinkled as ';'/':' literals through the rest of the crate.

use std::path::{Path, PathBuf};

/// The join separator for list values and APPEND/PREPEND concatenation.
///
/// `;` on Windows targets, `:` elsewhere — chosen by the target runtime, not
/// by the env file being processed.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';

#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Normalize a path to forward slashes.
///
/// Special variables (`__FILE__`, `__BUNDLE__`, etc.) are always surfaced with
/// forward slashes regardless of host OS; consumers that need native
/// separators convert at the point of use.
pub fn to_forward_slashes<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Convert a forward-slash path string into the host's native separator form.
pub fn to_native_path(path: &str) -> PathBuf {
    #[cfg(windows)]
    {
        PathBuf::from(path.replace('/', "\\"))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from(path)
    }
}
