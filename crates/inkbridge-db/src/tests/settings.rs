use std::collections::HashMap;

use super::test_db;

#[test]
fn test_open_and_migrate() {
    let db = test_db();
    let settings = db.get_all_settings().unwrap();
    assert!(settings.is_empty());
}

#[test]
fn test_settings_crud() {
    let db = test_db();
    db.set_setting("RECONNECT_DELAY_MS", "1000", false).unwrap();
    assert_eq!(
        db.get_setting("RECONNECT_DELAY_MS").unwrap(),
        Some("1000".into())
    );

    db.set_setting("RECONNECT_DELAY_MS", "2500", false).unwrap();
    assert_eq!(
        db.get_setting("RECONNECT_DELAY_MS").unwrap(),
        Some("2500".into())
    );

    assert!(db.delete_setting("RECONNECT_DELAY_MS").unwrap());
    assert_eq!(db.get_setting("RECONNECT_DELAY_MS").unwrap(), None);
    assert!(!db.delete_setting("RECONNECT_DELAY_MS").unwrap());
}

#[test]
fn test_secret_flag_round_trips() {
    let db = test_db();
    db.set_setting("AUTH_TOKEN", "abc", true).unwrap();
    db.set_setting("USER_ID", "u1", false).unwrap();

    assert_eq!(db.is_secret("AUTH_TOKEN").unwrap(), Some(true));
    assert_eq!(db.is_secret("USER_ID").unwrap(), Some(false));
    assert_eq!(db.is_secret("MISSING").unwrap(), None);
}

#[test]
fn test_bulk_update_keeps_secret_flag() {
    let db = test_db();
    db.set_setting("AUTH_TOKEN", "old", true).unwrap();

    let mut batch = HashMap::new();
    batch.insert("AUTH_TOKEN".to_string(), "new".to_string());
    batch.insert("SOUND_ENABLED".to_string(), "false".to_string());
    db.update_settings_bulk(&batch).unwrap();

    let all = db.get_all_settings().unwrap();
    assert_eq!(all.get("AUTH_TOKEN").map(String::as_str), Some("new"));
    assert_eq!(all.get("SOUND_ENABLED").map(String::as_str), Some("false"));
    assert_eq!(db.is_secret("AUTH_TOKEN").unwrap(), Some(true));
    assert_eq!(db.is_secret("SOUND_ENABLED").unwrap(), Some(false));
}

#[test]
fn test_reopen_file_database() {
    let dir = std::env::temp_dir().join(format!("inkbridge-db-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.db");
    {
        let db = crate::Database::open(&path).unwrap();
        db.set_setting("USER_ID", "u1", false).unwrap();
    }
    let db = crate::Database::open(&path).unwrap();
    assert_eq!(db.get_setting("USER_ID").unwrap(), Some("u1".into()));
    let _ = std::fs::remove_dir_all(&dir);
}
