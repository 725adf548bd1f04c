use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::AuthoringOptions;

pub const SETTINGS_FILE: &str = "author.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_ms: u64,
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub notification_timeout_ms: u64,
    pub credential: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080/api".into(),
            request_timeout_ms: 10_000,
            debounce_ms: 300,
            min_query_len: 2,
            notification_timeout_ms: 5_000,
            credential: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn authoring_options(&self) -> AuthoringOptions {
        AuthoringOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            min_query_len: self.min_query_len,
            notification_timeout: Duration::from_millis(self.notification_timeout_ms),
        }
    }

    /// Applies keys from an `author.toml` string map. Malformed files are ignored.
    fn apply_file(&mut self, raw: &str) {
        let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
            return;
        };
        if let Some(v) = file_cfg.get("api_url") {
            self.api_url = v.clone();
        }
        if let Some(v) = file_cfg.get("request_timeout_ms").and_then(|v| v.parse().ok()) {
            self.request_timeout_ms = v;
        }
        if let Some(v) = file_cfg.get("debounce_ms").and_then(|v| v.parse().ok()) {
            self.debounce_ms = v;
        }
        if let Some(v) = file_cfg.get("min_query_len").and_then(|v| v.parse().ok()) {
            self.min_query_len = v;
        }
        if let Some(v) = file_cfg
            .get("notification_timeout_ms")
            .and_then(|v| v.parse().ok())
        {
            self.notification_timeout_ms = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DIRECTORY_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("APP__API_URL") {
            self.api_url = v;
        }

        if let Some(v) = var("APP__REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.request_timeout_ms = v;
        }
        if let Some(v) = var("APP__DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.debounce_ms = v;
        }
        if let Some(v) = var("APP__MIN_QUERY_LEN").and_then(|v| v.parse().ok()) {
            self.min_query_len = v;
        }
        if let Some(v) = var("APP__NOTIFICATION_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.notification_timeout_ms = v;
        }

        if let Some(v) = var("DIRECTORY_CREDENTIAL") {
            self.credential = Some(v);
        }
        if let Some(v) = var("APP__CREDENTIAL") {
            self.credential = Some(v);
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

fn load_settings_from(path: &Path, var: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(var);
    settings
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_file_and_env_yield_defaults() {
        let settings = load_settings_from(Path::new("does-not-exist.toml"), vars(&[]));
        assert_eq!(settings, Settings::default());
        let options = settings.authoring_options();
        assert_eq!(options.debounce, Duration::from_millis(300));
        assert_eq!(options.min_query_len, 2);
    }

    #[test]
    fn env_overrides_file_and_bad_numbers_are_ignored() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("author_settings_test_{suffix}.toml"));
        fs::write(
            &path,
            "api_url = \"http://file.example/api\"\ndebounce_ms = \"150\"\nmin_query_len = \"3\"\n",
        )
        .expect("write settings");

        let settings = load_settings_from(
            &path,
            vars(&[
                ("DIRECTORY_API_URL", "http://legacy.example"),
                ("APP__API_URL", "http://env.example/api"),
                ("APP__MIN_QUERY_LEN", "many"),
                ("DIRECTORY_CREDENTIAL", "token-1"),
            ]),
        );
        fs::remove_file(&path).expect("cleanup");

        assert_eq!(settings.api_url, "http://env.example/api");
        assert_eq!(settings.debounce_ms, 150);
        assert_eq!(settings.min_query_len, 3);
        assert_eq!(settings.credential.as_deref(), Some("token-1"));
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
    }
}
