use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    /// Per-request timeout enforced by the HTTP repository. `None` disables it.
    pub request_timeout_secs: Option<u64>,
    pub intent_queue_capacity: usize,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".into(),
            request_timeout_secs: Some(30),
            intent_queue_capacity: 64,
            event_buffer: 256,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        normalize_api_base_url(&self.api_base_url)
    }
}

/// Defaults, then `console.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unparseable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs").and_then(toml::Value::as_integer) {
        settings.request_timeout_secs = u64::try_from(v).ok();
    }
    if let Some(v) = file_cfg.get("intent_queue_capacity").and_then(toml::Value::as_integer) {
        if let Ok(v) = usize::try_from(v) {
            settings.intent_queue_capacity = v.max(1);
        }
    }
    if let Some(v) = file_cfg.get("event_buffer").and_then(toml::Value::as_integer) {
        if let Ok(v) = usize::try_from(v) {
            settings.event_buffer = v.max(1);
        }
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PAYROLL_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }
    if let Some(v) = lookup("APP__INTENT_QUEUE_CAPACITY") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.intent_queue_capacity = parsed.max(1);
        }
    }
    if let Some(v) = lookup("APP__EVENT_BUFFER") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.event_buffer = parsed.max(1);
        }
    }
}

/// Accepts `localhost:8000/api`, `http://host/api/` and similar; always
/// returns an absolute http(s) URL without a trailing slash.
pub fn normalize_api_base_url(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    let raw = if raw.is_empty() {
        ClientSettings::default().api_base_url
    } else if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let trimmed = raw.trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("invalid api base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!(
            "api base url '{raw}' must use http or https, not '{}'",
            url.scheme()
        );
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
