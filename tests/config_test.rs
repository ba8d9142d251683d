// ==========================================
// 配置管理器测试
// ==========================================
// 测试目标: 默认值回退与覆写读取
// ==========================================


use garment_aps::config::config_manager::{
    KEY_AT_RISK_BUFFER_DAYS, KEY_COMMIT_RETRIES, KEY_HORIZON_DAYS,
};
use garment_aps::config::ConfigManager;

use test_helpers::create_test_db;

#[test]
fn test_defaults_when_keys_absent() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    assert_eq!(config.get_horizon_days().unwrap(), 730);
    assert_eq!(config.get_at_risk_buffer_days().unwrap(), 3);
    assert_eq!(config.get_commit_retries().unwrap(), 2);

    let settings = config.load_engine_settings().unwrap();
    assert_eq!(settings.horizon_days, 730);
    assert_eq!(settings.at_risk_buffer_days, 3);
    assert_eq!(settings.commit_retries, 2);
}

#[test]
fn test_overrides_read_back() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    config.set_config_value(KEY_HORIZON_DAYS, "365").unwrap();
    config.set_config_value(KEY_AT_RISK_BUFFER_DAYS, "7").unwrap();
    config.set_config_value(KEY_COMMIT_RETRIES, "5").unwrap();

    let settings = config.load_engine_settings().unwrap();
    assert_eq!(settings.horizon_days, 365);
    assert_eq!(settings.at_risk_buffer_days, 7);
    assert_eq!(settings.commit_retries, 5);

    // 覆写幂等
    config.set_config_value(KEY_HORIZON_DAYS, "400").unwrap();
    assert_eq!(config.get_horizon_days().unwrap(), 400);
}

#[test]
fn test_malformed_value_is_error() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    config.set_config_value(KEY_HORIZON_DAYS, "not-a-number").unwrap();
    assert!(config.get_horizon_days().is_err());
}
