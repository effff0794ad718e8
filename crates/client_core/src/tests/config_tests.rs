use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

#[test]
fn defaults_point_at_local_api() {
    let settings = ClientSettings::default();
    assert_eq!(settings.api_base_url, "http://localhost:8000/api");
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
}

#[test]
fn normalizes_bare_host_to_http_url() {
    let url = normalize_api_base_url("localhost:8000/api/").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/api");
}

#[test]
fn keeps_https_scheme() {
    let url = normalize_api_base_url(" https://payroll.example.co.ke/api ").expect("url");
    assert_eq!(url.scheme(), "https");
    assert_eq!(url.path(), "/api");
}

#[test]
fn empty_url_falls_back_to_default() {
    let url = normalize_api_base_url("   ").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/api");
}

#[test]
fn rejects_non_http_schemes() {
    let err = normalize_api_base_url("ftp://files.example.com").expect_err("must fail");
    assert!(err.to_string().contains("http or https"), "unexpected error: {err}");
}

#[test]
fn file_values_override_defaults() {
    let mut settings = ClientSettings::default();
    apply_file_overrides(
        &mut settings,
        r#"
api_base_url = "http://10.0.0.5:9000/api"
request_timeout_secs = 5
intent_queue_capacity = 0
event_buffer = 32
"#,
    );

    assert_eq!(settings.api_base_url, "http://10.0.0.5:9000/api");
    assert_eq!(settings.request_timeout_secs, Some(5));
    assert_eq!(settings.intent_queue_capacity, 1);
    assert_eq!(settings.event_buffer, 32);
}

#[test]
fn unparseable_file_is_ignored() {
    let mut settings = ClientSettings::default();
    apply_file_overrides(&mut settings, "api_base_url = ");
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn app_prefixed_env_wins_over_legacy_name() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(&mut settings, |key| match key {
        "PAYROLL_API_URL" => Some("http://legacy:8000/api".to_string()),
        "APP__API_BASE_URL" => Some("http://preferred:8000/api".to_string()),
        "APP__REQUEST_TIMEOUT_SECS" => Some("0".to_string()),
        "APP__EVENT_BUFFER" => Some("not-a-number".to_string()),
        _ => None,
    });

    assert_eq!(settings.api_base_url, "http://preferred:8000/api");
    assert_eq!(settings.request_timeout_secs, Some(0));
    assert_eq!(settings.request_timeout(), None);
    assert_eq!(settings.event_buffer, ClientSettings::default().event_buffer);
}

#[test]
fn loads_settings_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("payroll_console_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("console.toml");
    fs::write(&path, "intent_queue_capacity = 8\n").expect("write settings");

    let settings = load_settings_from(&path);
    assert_eq!(settings.intent_queue_capacity, 8);

    fs::remove_dir_all(temp_root).expect("cleanup");
}
