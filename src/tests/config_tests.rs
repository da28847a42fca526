use super::*;
use tempfile::TempDir;

fn store_in(temp: &TempDir) -> JsonConfigStore {
    JsonConfigStore::open(temp.path().join("config.json"))
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);

    let config = store.get();
    assert_eq!(config, Config::default());
    assert_eq!(config.refresh_interval, 60);
    assert_eq!(config.alert_thresholds, vec![75.0, 90.0]);
    assert!(config.notifications_enabled);
    assert_eq!(config.overlay_position, "top");
}

#[test]
fn test_set_session_key_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);

    store.set_session_key("sk-ant-sid01-abc").unwrap();
    store.set_organization_id("org-1").unwrap();

    let reopened = store_in(&temp);
    assert_eq!(reopened.get().session_key, "sk-ant-sid01-abc");
    assert_eq!(reopened.get().organization_id, "org-1");
}

#[test]
fn test_clear_credentials_keeps_other_settings() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.set_session_key("sk-ant-sid01-abc").unwrap();
    store.set_organization_id("org-1").unwrap();
    store.set_overlay_enabled(false).unwrap();

    store.clear_credentials().unwrap();

    let reopened = store_in(&temp).get();
    assert!(reopened.session_key.is_empty());
    assert!(reopened.organization_id.is_empty());
    assert!(!reopened.overlay_enabled);
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.json"), "{ not json").unwrap();

    let store = store_in(&temp);
    assert_eq!(store.get(), Config::default());
}

#[test]
fn test_partial_file_fills_missing_fields() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.json"),
        r#"{"refresh_interval": 120, "alert_thresholds": [50]}"#,
    )
    .unwrap();

    let config = store_in(&temp).get();
    assert_eq!(config.refresh_interval, 120);
    assert_eq!(config.alert_thresholds, vec![50.0]);
    assert!(config.overlay_enabled);
    assert!(config.visible_stats.weekly_usage);
}

#[test]
fn test_normal_interval_is_floored() {
    let config = Config {
        refresh_interval: 5,
        ..Config::default()
    };
    assert_eq!(config.normal_interval(), std::time::Duration::from_secs(15));

    let config = Config {
        refresh_interval: 90,
        ..Config::default()
    };
    assert_eq!(config.normal_interval(), std::time::Duration::from_secs(90));
}

#[test]
fn test_save_creates_missing_parent_directory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("deep").join("config.json");
    let store = JsonConfigStore::open(path.clone());

    store.save().unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());
}

#[cfg(unix)]
#[test]
fn test_saved_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    store.set_session_key("sk-ant-secret").unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_memory_store_failing_save_still_updates_value() {
    let store = MemoryStore::failing(Config::default());
    assert!(store.set_session_key("sk-ant-x").is_err());
    assert_eq!(store.get().session_key, "sk-ant-x");
    assert_eq!(store.save_count(), 0);
}
