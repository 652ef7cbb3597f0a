use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 30,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("triage.toml") {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("TRIAGE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("server_url") {
            settings.server_url = v.clone();
        }
        if let Some(v) = file_cfg.get("request_timeout_secs") {
            if let Ok(parsed) = v.parse::<u64>() {
                settings.request_timeout_secs = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_settings_override_defaults() {
        let mut settings = Settings::default();
        apply_file_settings(
            &mut settings,
            "server_url = \"http://triage.internal:8080\"\nrequest_timeout_secs = \"10\"\n",
        );
        assert_eq!(settings.server_url, "http://triage.internal:8080");
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn malformed_file_keeps_defaults() {
        let mut settings = Settings::default();
        apply_file_settings(&mut settings, "not really toml [");
        assert_eq!(settings.server_url, Settings::default().server_url);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn unparseable_timeout_is_ignored() {
        let mut settings = Settings::default();
        apply_file_settings(&mut settings, "request_timeout_secs = \"soon\"\n");
        assert_eq!(settings.request_timeout_secs, 30);
    }
}
