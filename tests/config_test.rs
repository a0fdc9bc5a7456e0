// ==========================================
// 配置与应用装配集成测试
// ==========================================
// 职责: 验证 config_kv 中的审计配置能驱动 AppState 装配
// ==========================================

mod test_helpers;

use std::time::Duration;

use campaign_closure::app::AppState;
use campaign_closure::config::{config_keys, ConfigManager};
use campaign_closure::domain::types::ClosureType;
use test_helpers::*;

#[tokio::test]
async fn test_app_state_uses_configured_audit_settings() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let blob_dir = tempfile::tempdir().unwrap();

    {
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_config_value(
                config_keys::AUDIT_BLOB_ROOT_DIR,
                blob_dir.path().to_str().unwrap(),
            )
            .unwrap();
        config
            .set_config_value(config_keys::AUDIT_PUBLIC_BASE_URL, "https://audits.example.org/")
            .unwrap();
        config.set_config_value(config_keys::AUDIT_KEY_PREFIX, "/closures/").unwrap();
        config.set_config_value(config_keys::AUDIT_MAX_ATTEMPTS, "2").unwrap();
        config.set_config_value(config_keys::AUDIT_RETRY_BASE_DELAY_MS, "10").unwrap();
        config.set_config_value(config_keys::AUDIT_LOCALE, "en-US").unwrap();
    }

    let state = AppState::new(db_path.clone()).await.unwrap();
    let settings = &state.audit_settings;
    assert_eq!(settings.blob_root_dir, blob_dir.path());
    assert_eq!(settings.public_base_url.as_deref(), Some("https://audits.example.org"));
    assert_eq!(settings.key_prefix, "closures");
    assert_eq!(settings.max_attempts, 2);
    assert_eq!(settings.retry_base_delay, Duration::from_millis(10));
    assert_eq!(settings.locale, "en");

    // 装配后的流水线使用配置的前缀与 URL
    let campaign_id = {
        let conn = open_shared(&db_path);
        let guard = conn.lock().unwrap();
        seed_active_campaign(&guard, 200.0)
    };
    state
        .closure_api
        .close_campaign(campaign_id, ClosureType::EndDate, None, None)
        .await
        .unwrap();
    state
        .closure_api
        .wait_for_document(campaign_id, Duration::from_secs(10))
        .await
        .unwrap();

    let url = state.closure_api.get_audit_document_url(campaign_id).await.unwrap();
    assert!(url.starts_with(&format!(
        "https://audits.example.org/closures/{}/audit-report-",
        campaign_id
    )));

    let key = url.trim_start_matches("https://audits.example.org/");
    let bytes = std::fs::read(blob_dir.path().join(key)).unwrap();
    assert!(String::from_utf8(bytes).unwrap().starts_with("Campaign Closure Audit Report"));
}

#[tokio::test]
async fn test_app_state_initializes_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fresh.db").to_string_lossy().to_string();
    let blob_dir = tempfile::tempdir().unwrap();

    // 先建表写入 blob 目录，避免落到用户数据目录
    {
        let conn = campaign_closure::db::open_sqlite_connection(&db_path).unwrap();
        campaign_closure::db::init_schema(&conn).unwrap();
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_config_value(
                config_keys::AUDIT_BLOB_ROOT_DIR,
                blob_dir.path().to_str().unwrap(),
            )
            .unwrap();
    }

    let state = AppState::new(db_path).await.unwrap();
    assert_eq!(state.audit_settings.key_prefix, "audits");
    assert_eq!(state.audit_settings.max_attempts, 3);
    assert_eq!(state.audit_settings.locale, "zh-CN");
    assert!(state.audit_settings.public_base_url.is_none());
    assert!(state.pipeline.resume_pending().await.unwrap().is_empty());

    let snapshot: serde_json::Value =
        serde_json::from_str(&state.config_manager.get_config_snapshot().unwrap()).unwrap();
    assert!(snapshot.get(config_keys::AUDIT_BLOB_ROOT_DIR).is_some());
}
