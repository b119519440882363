//! Wires the CLI surface to the composition core: resolves a command,
//! builds its environment, and hands off to the launcher.

use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;

use crate::bundle::{self, Bundle};
use crate::cli::Cli;
use crate::commands::{self, CommandRegistry};
use crate::compose;
use crate::discovery;
use crate::envfile;
use crate::error::{EnvoyError, Result};
use crate::launcher;
use crate::seed::{self, Mode};

/// Exit code for env-build and command-lookup failures (spec.md §6).
const EXIT_FAILURE: i32 = 1;
/// Exit code used when the launched child was terminated by a signal.
const EXIT_SIGNAL: i32 = 130;

fn host_environment() -> HashMap<String, String> {
    env::vars().collect()
}

/// Which discovery path produced the registry — governs how a resolved
/// command's file names turn into filesystem paths (spec.md §4.5).
enum RegistrySource {
    /// A single `commands.json`: `env_dir/global_env.json` is prepended if
    /// present, then each resolved file resolves directly against the
    /// declaring command's `env_dir`.
    SingleFile { env_dir: std::path::PathBuf },
    /// A set of bundles: a resolved file name is looked up across every
    /// bundle's env-file index, and every bundle's `global_env.json` is
    /// prepended.
    MultiBundle(Vec<Bundle>),
}

/// Build the command registry from whichever source the CLI resolves to:
/// an explicit single commands file, or a set of discovered/configured
/// bundles.
fn build_registry(cli: &Cli, host_env: &HashMap<String, String>) -> Result<(CommandRegistry, RegistrySource)> {
    let mut registry = CommandRegistry::new();

    if let Some(path) = &cli.commands_file {
        registry.load_from_file(path)?;
        let env_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        return Ok((registry, RegistrySource::SingleFile { env_dir }));
    }

    let cwd = env::current_dir().unwrap_or_default();
    if let Some(path) = commands::find_commands_file(&cwd, host_env) {
        registry.load_from_file(&path)?;
        let env_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        return Ok((registry, RegistrySource::SingleFile { env_dir }));
    }

    let bundles = resolve_bundles(cli, host_env)?;
    registry.load_from_bundles(&bundles)?;
    Ok((registry, RegistrySource::MultiBundle(bundles)))
}

fn resolve_bundles(cli: &Cli, host_env: &HashMap<String, String>) -> Result<Vec<Bundle>> {
    if let Some(config_path) = &cli.bundles_config {
        return bundle::load_bundles_from_config(config_path);
    }
    if let Some(raw_path) = host_env.get("ENVOY_BUNDLES_CONFIG") {
        return bundle::load_bundles_from_config(Path::new(raw_path));
    }

    if let Some(raw_roots) = &cli.bundle_roots {
        return Ok(discovery::discover_bundles_from_roots(&discovery::parse_roots(raw_roots)));
    }

    Ok(discovery::discover_bundles_auto(host_env))
}

fn extra_allowlist(cli: &Cli, host_env: &HashMap<String, String>) -> HashSet<String> {
    let raw = cli.allow.clone().or_else(|| host_env.get("ENVOY_ALLOWLIST").cloned());
    match raw {
        Some(raw) => seed::parse_allowlist(&raw),
        None => HashSet::new(),
    }
}

/// Collect the filesystem paths a resolved command's environment-file chain
/// maps to, per the discovery mode that produced the registry (spec.md §4.5).
fn collect_env_file_paths(resolved: &[commands::ResolvedFile], source: &RegistrySource) -> Result<Vec<std::path::PathBuf>> {
    match source {
        RegistrySource::SingleFile { env_dir } => {
            let required: Vec<_> = resolved.iter().map(|r| r.env_dir.join(&r.file_name)).collect();
            compose::require_files_exist(&required)?;
            Ok(commands::collect_single_file_paths(env_dir, resolved))
        }
        RegistrySource::MultiBundle(bundles) => Ok(commands::collect_bundle_env_paths(bundles, resolved)),
    }
}

/// Resolve a command's environment, erroring per spec.md §6 if any step
/// fails.
fn build_environment(
    registry: &CommandRegistry,
    command_name: &str,
    source: &RegistrySource,
    cli: &Cli,
    host_env: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    let resolved = registry.resolve_environment(command_name)?;
    let paths = collect_env_file_paths(&resolved, source)?;

    let files = paths
        .iter()
        .map(|path| envfile::parse_file(path))
        .collect::<Result<Vec<_>>>()?;

    let mode = if cli.inherit_env { Mode::Inherited } else { Mode::Closed };
    let seed_map = seed::build_seed(mode, host_env, &extra_allowlist(cli, host_env));

    Ok(compose::compose(&files, &seed_map, host_env))
}

/// Execute the parsed CLI invocation and return the process exit code.
pub fn run(cli: Cli) -> i32 {
    let host_env = host_environment();

    let (registry, source) = match build_registry(&cli, &host_env) {
        Ok(built) => built,
        Err(err) => {
            eprintln!("{err}");
            return EXIT_FAILURE;
        }
    };

    if cli.list {
        for name in registry.list_commands() {
            println!("{name}");
        }
        return 0;
    }

    if let Some(name) = &cli.info {
        return match registry.resolve_environment(name).and_then(|resolved| collect_env_file_paths(&resolved, &source)) {
            Ok(paths) => {
                for path in &paths {
                    println!("{}", path.display());
                }
                0
            }
            Err(err) => {
                eprintln!("{err}");
                EXIT_FAILURE
            }
        };
    }

    if let Some(name) = &cli.which {
        return match registry.get(name) {
            Some(def) => {
                println!("{}", def.executable());
                0
            }
            None => {
                eprintln!("{}", EnvoyError::UnknownCommand { name: name.clone() });
                EXIT_FAILURE
            }
        };
    }

    let Some(name) = &cli.name else {
        eprintln!("no command given; pass a command name or --list");
        return EXIT_FAILURE;
    };

    let def = match registry.get(name) {
        Some(def) => def.clone(),
        None => {
            eprintln!("{}", EnvoyError::UnknownCommand { name: name.clone() });
            return EXIT_FAILURE;
        }
    };

    let env = match build_environment(&registry, name, &source, &cli, &host_env) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("{err}");
            return EXIT_FAILURE;
        }
    };

    let mut args = def.base_args().to_vec();
    args.extend(cli.args.iter().cloned());

    match launcher::launch(def.executable(), &args, &env, None) {
        Ok(Some(code)) => code,
        Ok(None) => EXIT_SIGNAL,
        Err(err) => {
            eprintln!("{err}");
            EXIT_FAILURE
        }
    }
}
