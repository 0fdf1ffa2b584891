//! Integration tests for `ConfigWatcher` against a real temp directory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tc_warden::config_watcher::ConfigWatcher;
use tc_warden::AppError;

#[tokio::test]
async fn modifying_config_file_sends_notification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("limits.toml");
    fs::write(&path, "[global]\ninterface = \"eth0\"\n").unwrap();

    let (watcher, mut events) = ConfigWatcher::new(&path).expect("watcher starts");
    assert_eq!(watcher.path(), path.as_path());

    // Give the backend a moment to register the watch.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&path, "[global]\ninterface = \"eth1\"\n").unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("notification within 5s");
    assert!(event.is_some());
}

#[tokio::test]
async fn sibling_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("limits.toml");
    fs::write(&path, "").unwrap();

    let (_watcher, mut events) = ConfigWatcher::new(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(dir.path().join("other.toml"), "x = 1\n").unwrap();

    let result = tokio::time::timeout(Duration::from_millis(500), events.recv()).await;
    assert!(result.is_err(), "no notification for unrelated files");
}

#[tokio::test]
async fn dropping_watcher_closes_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("limits.toml");
    fs::write(&path, "").unwrap();

    let (watcher, mut events) = ConfigWatcher::new(&path).unwrap();
    drop(watcher);

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "channel closes once the watcher is gone");
}

#[test]
fn watching_missing_directory_fails() {
    let err = ConfigWatcher::new(Path::new("/nonexistent-tc-warden-dir/limits.toml"))
        .expect_err("missing directory");
    assert!(matches!(err, AppError::Watch(_)), "got {err:?}");
}
