//! Application settings.
//!
//! Values come from an optional `settings.toml` in the working directory,
//! overridden by environment variables prefixed with `CONTA` and using `__`
//! as section separator, e.g. `CONTA__SERVER__PORT=8080` or
//! `CONTA__CRON__SECRET=...`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    /// IANA zone deciding which day is "today", UTC when absent.
    pub timezone: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
            timezone: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
pub struct Cron {
    /// Bearer secret of `/api/cron/*`. Without it those endpoints answer 500.
    pub secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Push {
    /// Push gateway endpoint. Notifications are only logged when absent.
    pub gateway_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub cron: Cron,
    #[serde(default)]
    pub push: Push,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("CONTA").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn full_settings() {
        let settings = from_toml(
            r#"
            [app]
            level = "debug"
            timezone = "America/Sao_Paulo"

            [server]
            port = 3000
            database = { sqlite = "conta.db" }

            [cron]
            secret = "s3cret"

            [push]
            gateway_url = "http://localhost:9000/send"
            "#,
        );

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.app.timezone.as_deref(), Some("America/Sao_Paulo"));
        let server = settings.server.unwrap();
        assert_eq!(server.port, 3000);
        assert!(matches!(server.database, Database::Sqlite(ref path) if path == "conta.db"));
        assert_eq!(settings.cron.secret.as_deref(), Some("s3cret"));
        assert_eq!(
            settings.push.gateway_url.as_deref(),
            Some("http://localhost:9000/send")
        );
    }

    #[test]
    fn sections_are_optional() {
        let settings = from_toml(
            r#"
            [server]
            port = 8080
            database = "memory"
            "#,
        );

        assert_eq!(settings.app.level, "info");
        assert!(settings.app.timezone.is_none());
        assert!(matches!(settings.server.unwrap().database, Database::Memory));
        assert!(settings.cron.secret.is_none());
        assert!(settings.push.gateway_url.is_none());
    }
}
