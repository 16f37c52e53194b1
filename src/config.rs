use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub roster: RosterSettings,
    #[serde(default)]
    pub preferences: PreferenceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterSettings {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_roster_table")]
    pub table: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceSettings {
    #[serde(default = "default_preferences_path")]
    pub path: String,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

fn default_roster_table() -> String { "creators".to_string() }
fn default_preferences_path() -> String { "data/filters.json".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with DISCOVERY_)
    /// 4. Hosted store credentials (SUPABASE_URL / SUPABASE_ANON_KEY)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., DISCOVERY__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("DISCOVERY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_store_credentials(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("DISCOVERY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Look up a hosted store variable, accepting the `VITE_`-prefixed form
/// front-end bundles export as well.
fn store_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&format!("VITE_{}", name))
        .or_else(|| lookup(name))
        .filter(|v| !v.is_empty())
}

/// Override roster credentials from the hosted store's environment variables
fn apply_store_credentials<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = store_var(&lookup, "SUPABASE_URL") {
        builder = builder.set_override("roster.endpoint", url)?;
    }
    if let Some(key) = store_var(&lookup, "SUPABASE_ANON_KEY") {
        builder = builder.set_override("roster.api_key", key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 8080

[roster]
endpoint = "https://store.test"
api_key = "anon"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.roster.table, "creators");
        assert_eq!(settings.preferences.path, "data/filters.json");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_store_credentials_override() {
        let base = Config::builder()
            .set_default("roster.endpoint", "https://from-file.test")
            .unwrap()
            .set_default("roster.api_key", "file-key")
            .unwrap()
            .build()
            .unwrap();

        let env = HashMap::from([
            ("VITE_SUPABASE_URL".to_string(), "https://vite.test".to_string()),
            ("SUPABASE_ANON_KEY".to_string(), "plain-key".to_string()),
        ]);

        let merged = apply_store_credentials(base, |name| env.get(name).cloned()).unwrap();
        assert_eq!(merged.get_string("roster.endpoint").unwrap(), "https://vite.test");
        assert_eq!(merged.get_string("roster.api_key").unwrap(), "plain-key");
    }
}
