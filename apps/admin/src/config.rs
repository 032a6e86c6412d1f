use std::{collections::HashMap, fs, path::Path};

pub const SETTINGS_FILE: &str = "admin.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".into(),
            username: None,
            password: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    /// Flags given on the command line win over everything else.
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        if let Some(v) = api_url {
            self.api_base_url = v;
        }
        if let Some(v) = username {
            self.username = Some(v);
        }
        if let Some(v) = password {
            self.password = Some(v);
        }
        self
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_url") {
                settings.api_base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("username") {
                settings.username = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("password") {
                settings.password = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("log_filter") {
                settings.log_filter = v.clone();
            }
        }
    }

    if let Some(v) = env("ORDERS_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("ORDERS_USERNAME") {
        settings.username = Some(v);
    }
    if let Some(v) = env("ORDERS_PASSWORD") {
        settings.password = Some(v);
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
