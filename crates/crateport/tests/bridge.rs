//! End-to-end bridge tests against a fake toolchain.
//!
//! A small shell script stands in for the external toolchain: it
//! mimics the `build <crate_dir>` invocation shape and writes a
//! `pkg/<name>.js` loader stub, which is enough to exercise the full
//! init → build → resolve path without a real wasm toolchain.

#![cfg(unix)]

use crateport::{BridgeConfig, BridgeError, BundlerHooks, CrateBridgePlugin};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const GOOD_TOOL: &str = r#"#!/bin/sh
set -e
crate_dir="$2"
name=$(basename "$crate_dir" | tr '-' '_')
mkdir -p "$crate_dir/pkg"
printf '{"module": "%s.js"}\n' "$name" > "$crate_dir/pkg/package.json"
printf 'export default {};\n' > "$crate_dir/pkg/$name.js"
"#;

const FAILING_TOOL: &str = r#"#!/bin/sh
echo "error[E0425]: cannot find value" >&2
exit 101
"#;

const SLOW_TOOL: &str = r#"#!/bin/sh
sleep 30
"#;

fn write_tool(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("fake-tool");
    std::fs::write(&path, contents).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn project(crates: &[&str]) -> (tempfile::TempDir, BridgeConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("crates");
    for name in crates {
        std::fs::create_dir_all(root.join(name).join("src")).unwrap();
    }
    let config = BridgeConfig::new(root, crates.iter().map(|s| s.to_string()).collect());
    (dir, config)
}

#[tokio::test]
async fn successful_build_makes_crate_resolvable() {
    let (dir, config) = project(&["hello"]);
    let tool = write_tool(dir.path(), GOOD_TOOL);
    let plugin = CrateBridgePlugin::new(config.with_cli(tool.display().to_string()));

    plugin.init().await.unwrap();
    plugin.build_all().await.unwrap();

    let resolved = plugin.resolve("hello").await.expect("hello should resolve");
    assert!(resolved.exists(), "artifact should exist on disk");
    assert!(resolved.starts_with(dir.path().join("crates/hello")));
    assert!(resolved.ends_with("pkg/hello.js"));
}

#[tokio::test]
async fn builds_run_for_every_configured_crate() {
    let (dir, config) = project(&["hello", "other-crate"]);
    let tool = write_tool(dir.path(), GOOD_TOOL);
    let plugin = CrateBridgePlugin::new(config.with_cli(tool.display().to_string()));

    plugin.init().await.unwrap();
    plugin.build_all().await.unwrap();

    assert!(plugin.resolve("hello").await.is_some());
    let resolved = plugin.resolve("other-crate").await.unwrap();
    assert!(resolved.ends_with("pkg/other_crate.js"));
}

#[tokio::test]
async fn failed_rebuild_retains_previous_artifact() {
    let (dir, config) = project(&["hello"]);
    let tool = write_tool(dir.path(), GOOD_TOOL);
    let plugin = CrateBridgePlugin::new(config.with_cli(tool.display().to_string()));

    plugin.init().await.unwrap();
    plugin.build("hello").await.unwrap();
    let good = plugin.resolve("hello").await.unwrap();

    // The next build breaks
    write_tool(dir.path(), FAILING_TOOL);
    let err = plugin.build("hello").await.unwrap_err();
    match err {
        BridgeError::BuildFailed {
            krate,
            exit_code,
            stderr,
        } => {
            assert_eq!(krate, "hello");
            assert_eq!(exit_code, 101);
            assert!(stderr.contains("E0425"));
        }
        other => panic!("expected BuildFailed, got {other:?}"),
    }

    // The dev server keeps serving the last good artifact
    assert_eq!(plugin.resolve("hello").await, Some(good.clone()));
    assert!(good.exists());
}

#[tokio::test]
async fn missing_toolchain_leaves_crate_unresolved() {
    let (_dir, config) = project(&["hello"]);
    let plugin = CrateBridgePlugin::new(config.with_cli("crateport-test-no-such-binary"));

    plugin.init().await.unwrap();
    let err = plugin.build_all().await.unwrap_err();
    assert!(matches!(err, BridgeError::ToolchainNotFound { .. }));

    // No prior artifact: import resolution fails for callers, the
    // process itself keeps running
    assert_eq!(plugin.resolve("hello").await, None);
}

#[tokio::test]
async fn slow_toolchain_times_out() {
    let (dir, config) = project(&["hello"]);
    let tool = write_tool(dir.path(), SLOW_TOOL);
    let plugin = CrateBridgePlugin::new(
        config
            .with_cli(tool.display().to_string())
            .with_timeout_secs(1),
    );

    plugin.init().await.unwrap();
    let err = plugin.build("hello").await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { timeout_secs: 1, .. }));

    // A timed-out build records nothing
    assert_eq!(plugin.resolve("hello").await, None);
}

#[tokio::test]
async fn relative_root_delivers_watch_events() {
    let (dir, _config) = project(&["hello"]);
    std::env::set_current_dir(dir.path()).unwrap();

    // The spec'd configuration shape: a relative root
    let config = BridgeConfig::new("./crates", vec!["hello".to_string()]).with_debounce_ms(50);
    let plugin = CrateBridgePlugin::new(config);

    plugin.init().await.unwrap();
    let mut rx = plugin.watch().await.unwrap();

    std::fs::write(
        dir.path().join("crates/hello/src/lib.rs"),
        "pub fn changed() {}",
    )
    .unwrap();

    let change = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("no change event delivered for a relative config root")
        .expect("channel open");
    assert_eq!(change.krate, "hello");

    // Leave the soon-to-be-deleted tempdir before it is cleaned up
    std::env::set_current_dir(std::env::temp_dir()).unwrap();
}

#[tokio::test]
async fn subpath_imports_resolve_into_the_artifact_dir() {
    let (dir, config) = project(&["hello"]);
    let tool = write_tool(dir.path(), GOOD_TOOL);
    let plugin = CrateBridgePlugin::new(config.with_cli(tool.display().to_string()));

    plugin.init().await.unwrap();
    plugin.build("hello").await.unwrap();

    let manifest = plugin.resolve("hello/package.json").await.unwrap();
    assert!(manifest.exists());
}

#[tokio::test]
async fn watched_change_triggers_rebuild() {
    let (dir, config) = project(&["hello"]);
    let tool = write_tool(dir.path(), GOOD_TOOL);
    let plugin = CrateBridgePlugin::new(
        config.with_cli(tool.display().to_string()).with_debounce_ms(50),
    );

    plugin.init().await.unwrap();
    let changes = plugin.watch().await.unwrap();
    let loop_handle = tokio::spawn(crateport::run_dev_loop(plugin.clone(), changes));

    std::fs::write(
        dir.path().join("crates/hello/src/lib.rs"),
        "pub fn changed() {}",
    )
    .unwrap();

    // Wait for the rebuild triggered by the change to land
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        if plugin.resolve("hello").await.is_some() {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "rebuild did not complete in time"
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    loop_handle.abort();
}
