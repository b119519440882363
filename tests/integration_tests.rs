// End-to-end tests building a bundle fixture on disk and resolving +
// composing its environment the way `run::run` would.

use std::collections::HashMap;
use std::fs;

use envoy_lib::bundle::Bundle;
use envoy_lib::commands::{self, CommandRegistry};
use envoy_lib::compose;
use envoy_lib::envfile;
use envoy_lib::seed::{self, Mode};
use tempfile::tempdir;

fn write_bundle(root: &std::path::Path, commands_json: &str, env_files: &[(&str, &str)]) {
    let env_dir = root.join("envoy_env");
    fs::create_dir_all(&env_dir).unwrap();
    fs::write(env_dir.join("commands.json"), commands_json).unwrap();
    for (name, content) in env_files {
        fs::write(env_dir.join(name), content).unwrap();
    }
}

#[test]
fn single_file_mode_resolves_and_composes_an_environment() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site");
    write_bundle(
        &root,
        r#"{"maya": {"environment": ["base.json", "maya_env.json"], "alias": ["maya.bin", "-nosplash"]}}"#,
        &[
            ("base.json", r#"{"+=PATH": ["/tools/bin"]}"#),
            ("maya_env.json", r#"{"MAYA_ROOT": "${__BUNDLE__}/maya"}"#),
        ],
    );

    let mut registry = CommandRegistry::new();
    registry.load_from_file(&root.join("envoy_env").join("commands.json")).unwrap();

    let def = registry.get("maya").unwrap();
    assert_eq!(def.executable(), "maya.bin");
    assert_eq!(def.base_args(), &["-nosplash".to_string()]);

    let resolved = registry.resolve_environment("maya").unwrap();
    let paths: Vec<_> = resolved.iter().map(|r| r.env_dir.join(&r.file_name)).collect();
    compose::require_files_exist(&paths).unwrap();

    let files: Vec<_> = paths.iter().map(|p| envfile::parse_file(p).unwrap()).collect();

    let mut host = HashMap::new();
    host.insert("PATH".to_string(), "/usr/bin".to_string());
    let base = seed::build_seed(Mode::Closed, &host, &Default::default());
    let env = compose::compose(&files, &base, &host);

    assert_eq!(env["PATH"], format!("/usr/bin{}/tools/bin", envoy_lib::platform::PATH_SEPARATOR));
    assert!(env["MAYA_ROOT"].ends_with("/site/maya"));
}

#[test]
fn single_file_mode_prepends_sibling_global_env_json() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site");
    write_bundle(
        &root,
        r#"{"maya": {"environment": ["maya_env.json"]}}"#,
        &[("global_env.json", r#"{"SITE_WIDE": "1"}"#), ("maya_env.json", r#"{"MAYA_SPECIFIC": "1"}"#)],
    );

    let mut registry = CommandRegistry::new();
    let env_dir = root.join("envoy_env");
    registry.load_from_file(&env_dir.join("commands.json")).unwrap();

    let resolved = registry.resolve_environment("maya").unwrap();
    let paths = commands::collect_single_file_paths(&env_dir, &resolved);
    assert_eq!(paths, vec![env_dir.join("global_env.json"), env_dir.join("maya_env.json")]);

    let files: Vec<_> = paths.iter().map(|p| envfile::parse_file(p).unwrap()).collect();
    let env = compose::compose(&files, &HashMap::new(), &HashMap::new());
    assert_eq!(env["SITE_WIDE"], "1");
    assert_eq!(env["MAYA_SPECIFIC"], "1");
}

#[test]
fn multi_bundle_mode_lets_later_bundle_override_commands() {
    let dir = tempdir().unwrap();
    let base_root = dir.path().join("gt").join("base");
    let override_root = dir.path().join("gt").join("override");
    write_bundle(
        &base_root,
        r#"{"shared": {"environment": ["base_shared.json"]}, "maya": {"environment": ["shared", "first.json"]}}"#,
        &[("base_shared.json", r#"{"TOOLCHAIN": "v1"}"#), ("first.json", r#"{"SOURCE": "base"}"#)],
    );
    write_bundle(
        &override_root,
        r#"{"maya": {"environment": ["shared", "second.json"]}}"#,
        &[("second.json", r#"{"SOURCE": "override"}"#)],
    );

    let bundle_base = Bundle::from_path(&base_root, None).unwrap();
    let bundle_override = Bundle::from_path(&override_root, None).unwrap();

    let mut registry = CommandRegistry::new();
    registry.load_from_bundles(&[bundle_base, bundle_override]).unwrap();

    let resolved = registry.resolve_environment("maya").unwrap();
    let names: Vec<&str> = resolved.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["base_shared.json", "second.json"]);

    let paths: Vec<_> = resolved.iter().map(|r| r.env_dir.join(&r.file_name)).collect();
    let files: Vec<_> = paths.iter().map(|p| envfile::parse_file(p).unwrap()).collect();
    let env = compose::compose(&files, &HashMap::new(), &HashMap::new());
    assert_eq!(env["TOOLCHAIN"], "v1");
    assert_eq!(env["SOURCE"], "override");
}

#[test]
fn multi_bundle_mode_prepends_global_env_and_merges_duplicate_file_names() {
    let dir = tempdir().unwrap();
    let a_root = dir.path().join("gt").join("a");
    let b_root = dir.path().join("gt").join("b");
    write_bundle(
        &a_root,
        r#"{"maya": {"environment": ["shared.json"]}}"#,
        &[("global_env.json", r#"{"FROM_A_GLOBAL": "1"}"#), ("shared.json", r#"{"+=TOOLS": ["a"]}"#)],
    );
    write_bundle(
        &b_root,
        r#"{}"#,
        &[("global_env.json", r#"{"FROM_B_GLOBAL": "1"}"#), ("shared.json", r#"{"+=TOOLS": ["b"]}"#)],
    );

    let bundle_a = Bundle::from_path(&a_root, None).unwrap();
    let bundle_b = Bundle::from_path(&b_root, None).unwrap();

    let mut registry = CommandRegistry::new();
    registry.load_from_bundles(&[bundle_a.clone(), bundle_b.clone()]).unwrap();

    let resolved = registry.resolve_environment("maya").unwrap();
    let paths = envoy_lib::commands::collect_bundle_env_paths(&[bundle_a, bundle_b], &resolved);

    // Both bundles' global_env.json come first, in declaration order, ahead
    // of the resolved shared.json entries (which also appear once per bundle).
    assert_eq!(paths.len(), 4);
    assert!(paths[0].ends_with("a/envoy_env/global_env.json"));
    assert!(paths[1].ends_with("b/envoy_env/global_env.json"));

    let files: Vec<_> = paths.iter().map(|p| envfile::parse_file(p).unwrap()).collect();
    let env = compose::compose(&files, &HashMap::new(), &HashMap::new());
    assert_eq!(env["FROM_A_GLOBAL"], "1");
    assert_eq!(env["FROM_B_GLOBAL"], "1");
    assert_eq!(env["TOOLS"], format!("a{}b", envoy_lib::platform::PATH_SEPARATOR));
}

#[test]
fn missing_referenced_env_file_is_reported_before_composition() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site");
    write_bundle(
        &root,
        r#"{"maya": {"environment": ["ghost.json"]}}"#,
        &[],
    );

    let mut registry = CommandRegistry::new();
    registry.load_from_file(&root.join("envoy_env").join("commands.json")).unwrap();

    let resolved = registry.resolve_environment("maya").unwrap();
    let paths: Vec<_> = resolved.iter().map(|r| r.env_dir.join(&r.file_name)).collect();
    assert!(compose::require_files_exist(&paths).is_err());
}

#[test]
fn inherited_mode_carries_full_host_environment_through() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site");
    write_bundle(&root, r#"{"maya": {"environment": ["env.json"]}}"#, &[("env.json", r#"{"EXTRA": "1"}"#)]);

    let mut registry = CommandRegistry::new();
    registry.load_from_file(&root.join("envoy_env").join("commands.json")).unwrap();
    let resolved = registry.resolve_environment("maya").unwrap();
    let paths: Vec<_> = resolved.iter().map(|r| r.env_dir.join(&r.file_name)).collect();
    let files: Vec<_> = paths.iter().map(|p| envfile::parse_file(p).unwrap()).collect();

    let mut host = HashMap::new();
    host.insert("SECRET_TOKEN".to_string(), "shh".to_string());
    let base = seed::build_seed(Mode::Inherited, &host, &Default::default());
    let env = compose::compose(&files, &base, &host);

    assert_eq!(env["SECRET_TOKEN"], "shh");
    assert_eq!(env["EXTRA"], "1");
}
