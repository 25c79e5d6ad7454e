use std::{collections::HashMap, fs};

use client_core::AggregationMode;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub aggregation: AggregationMode,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".into(),
            aggregation: AggregationMode::Client,
            request_timeout_secs: 30,
        }
    }
}

/// Defaults, then `dashboard.toml`, then environment variables. Later layers
/// win; unparseable values fall back to the previous layer.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("dashboard.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_base_url") {
                settings.api_base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("aggregation") {
                if let Ok(parsed) = v.parse() {
                    settings.aggregation = parsed;
                }
            }
            if let Some(v) = file_cfg.get("request_timeout_secs") {
                if let Ok(parsed) = v.parse() {
                    settings.request_timeout_secs = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("DASHBOARD__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("DASHBOARD__AGGREGATION") {
        if let Ok(parsed) = v.parse() {
            settings.aggregation = parsed;
        }
    }
    if let Ok(v) = std::env::var("DASHBOARD__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}
