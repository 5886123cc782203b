use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub const DEV_SESSION_SECRET: &str = "dev-admin-session-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    /// Empty disables the admin surface.
    pub admin_password: String,
    pub admin_session_secret: String,
    pub admin_session_ttl_seconds: i64,
    pub export_utc_offset_minutes: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/rsvp.db".into(),
            admin_password: String::new(),
            admin_session_secret: DEV_SESSION_SECRET.into(),
            admin_session_ttl_seconds: 3600,
            export_utc_offset_minutes: 0,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `server.toml` table, then environment variables.
/// The `APP__*` form wins over the short alias when both are set.
pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
            let get = |key: &str| file_cfg.get(key).map(toml_to_string);
            if let Some(v) = get("bind_addr") {
                settings.server_bind = v;
            }
            if let Some(v) = get("database_url") {
                settings.database_url = v;
            }
            if let Some(v) = get("admin_password") {
                settings.admin_password = v;
            }
            if let Some(v) = get("admin_session_secret") {
                settings.admin_session_secret = v;
            }
            if let Some(v) = get("admin_session_ttl_seconds").and_then(|v| v.parse().ok()) {
                settings.admin_session_ttl_seconds = v;
            }
            if let Some(v) = get("export_utc_offset_minutes").and_then(|v| v.parse().ok()) {
                settings.export_utc_offset_minutes = v;
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__ADMIN_PASSWORD") {
        settings.admin_password = v;
    }
    if let Some(v) = env("APP__ADMIN_SESSION_SECRET") {
        settings.admin_session_secret = v;
    }

    if let Some(v) = env("APP__ADMIN_SESSION_TTL_SECONDS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.admin_session_ttl_seconds = parsed;
        }
    }
    if let Some(v) = env("APP__EXPORT_UTC_OFFSET_MINUTES") {
        if let Ok(parsed) = v.parse::<i32>() {
            settings.export_utc_offset_minutes = parsed;
        }
    }

    settings
}

fn toml_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
