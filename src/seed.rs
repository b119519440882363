//! Produces the initial base map for [`crate::compose`] from one of two
//! modes: inherited (a copy of the host environment) or closed (the
//! intersection of the host environment with a core OS allowlist, plus
//! envoy's own variables, plus a caller-supplied extra allowlist).

use std::collections::{HashMap, HashSet};

/// Variables always seeded into the subprocess environment in closed mode.
/// They provide identity, paths, and OS services that most tools assume are
/// present, are never secret, and their absence tends to break child
/// processes in unexpected ways. Grounded 1:1 on the original implementation's
/// `_CORE_ENV_VARS`.
pub const CORE_ENV_VARS: &[&str] = &[
    // User identity & home
    "USERNAME",
    "USERPROFILE",
    "USERDOMAIN",
    "USERDOMAIN_ROAMINGPROFILE",
    "HOMEDRIVE",
    "HOMEPATH",
    // User data directories
    "APPDATA",
    "LOCALAPPDATA",
    "PUBLIC",
    // Temp
    "TEMP",
    "TMP",
    "TMPDIR",
    // System / Windows layout
    "SystemRoot",
    "SystemDrive",
    "windir",
    "ProgramFiles",
    "ProgramFiles(x86)",
    "ProgramW6432",
    "CommonProgramFiles",
    "CommonProgramFiles(x86)",
    "CommonProgramW6432",
    // Hardware / OS identity
    "COMPUTERNAME",
    "OS",
    "PROCESSOR_ARCHITECTURE",
    "PROCESSOR_IDENTIFIER",
    "PROCESSOR_LEVEL",
    "PROCESSOR_REVISION",
    "NUMBER_OF_PROCESSORS",
    // Shell / console
    "COMSPEC",
    "TERM",
    "TERM_PROGRAM",
    "COLORTERM",
    // Unix identity
    "HOME",
    "USER",
    "LOGNAME",
    "SHELL",
    // Locale / encoding
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "LC_MESSAGES",
    // XDG base dirs
    "XDG_RUNTIME_DIR",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "XDG_CACHE_HOME",
];

/// Envoy's own environment variables, always carried through so that a child
/// process which itself invokes envoy inherits the same discovery context.
pub const ENVOY_ENV_VARS: &[&str] = &["ENVOY_BNDL_ROOTS", "ENVOY_ALLOWLIST", "ENVOY_BUNDLES_CONFIG"];

/// The two environment-inheritance modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Child process receives only env-file-declared variables, core OS
    /// variables, envoy's own variables, and the caller's extra allowlist.
    Closed,
    /// Child process inherits the full host environment, with env-file
    /// values layered on top.
    Inherited,
}

/// Build the initial base map handed to [`crate::compose::compose`] as `B`.
///
/// `extra_allowlist` is the caller-supplied additional set of variable names
/// to carry through in closed mode (e.g. from `--allow`/`ENVOY_ALLOWLIST`);
/// it is ignored in inherited mode.
pub fn build_seed(mode: Mode, host_env: &HashMap<String, String>, extra_allowlist: &HashSet<String>) -> HashMap<String, String> {
    match mode {
        Mode::Inherited => host_env.clone(),
        Mode::Closed => {
            let mut seed = HashMap::new();
            let names = CORE_ENV_VARS
                .iter()
                .copied()
                .chain(ENVOY_ENV_VARS.iter().copied())
                .map(str::to_string)
                .chain(extra_allowlist.iter().cloned());
            for name in names {
                if let Some(value) = host_env.get(&name) {
                    seed.insert(name, value.clone());
                }
            }
            seed
        }
    }
}

/// Parse an `ENVOY_ALLOWLIST`-style value: variable names joined by the
/// platform path separator.
pub fn parse_allowlist(raw: &str) -> HashSet<String> {
    raw.split(crate::platform::PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn closed_mode_only_seeds_allowlisted_vars() {
        let h = host(&[("HOME", "/home/u"), ("SECRET_TOKEN", "shh")]);
        let seed = build_seed(Mode::Closed, &h, &HashSet::new());
        assert_eq!(seed.get("HOME"), Some(&"/home/u".to_string()));
        assert!(!seed.contains_key("SECRET_TOKEN"));
    }

    #[test]
    fn closed_mode_requires_presence_in_host_env() {
        let h = host(&[]);
        let seed = build_seed(Mode::Closed, &h, &HashSet::new());
        assert!(seed.is_empty());
    }

    #[test]
    fn closed_mode_extra_allowlist_is_additive() {
        let h = host(&[("CUSTOM_VAR", "value")]);
        let mut extra = HashSet::new();
        extra.insert("CUSTOM_VAR".to_string());
        let seed = build_seed(Mode::Closed, &h, &extra);
        assert_eq!(seed.get("CUSTOM_VAR"), Some(&"value".to_string()));
    }

    #[test]
    fn inherited_mode_copies_full_host_env() {
        let h = host(&[("HOME", "/home/u"), ("SECRET_TOKEN", "shh")]);
        let seed = build_seed(Mode::Inherited, &h, &HashSet::new());
        assert_eq!(seed, h);
    }

    #[test]
    fn envoy_own_vars_carry_through_in_closed_mode() {
        let h = host(&[("ENVOY_BNDL_ROOTS", "/roots")]);
        let seed = build_seed(Mode::Closed, &h, &HashSet::new());
        assert_eq!(seed.get("ENVOY_BNDL_ROOTS"), Some(&"/roots".to_string()));
    }

    #[test]
    fn parse_allowlist_splits_on_path_separator() {
        let raw = format!("A{}B{}", crate::platform::PATH_SEPARATOR, crate::platform::PATH_SEPARATOR);
        let parsed = parse_allowlist(&raw);
        assert_eq!(parsed, HashSet::from(["A".to_string(), "B".to_string()]));
    }
}
