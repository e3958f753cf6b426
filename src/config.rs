//! Environment-driven configuration.

use std::time::Duration;

use figment::Figment;
use figment::providers::Env;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Crate log level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_target_url")]
    pub default_target_url: String,
    #[serde(default = "default_anime_target_url")]
    pub anime_target_url: String,
    #[serde(default = "default_movies_target_url")]
    pub movies_target_url: String,
    /// Fixed origin used for rewritten links instead of the request's `Host`.
    #[serde(default)]
    pub public_origin: Option<String>,
    /// Grace period for in-flight requests once a shutdown signal arrives.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_target_url() -> String {
    "https://www.example.com".to_owned()
}

fn default_anime_target_url() -> String {
    "https://ww1.anoboy.app".to_owned()
}

fn default_movies_target_url() -> String {
    "https://tv4.lk21official.cc".to_owned()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

impl Config {
    /// Every configuration source, in merge order.
    pub fn figment() -> Figment {
        Figment::new().merge(Env::raw())
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

/// Bare numbers are seconds, strings go through `fundu` (`500ms`, `8s`, `1m`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Fractional(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Fractional(secs) => {
            Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
        }
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_duration(text: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
    ]);
    let parsed = parser
        .parse(text.trim())
        .map_err(|e| format!("invalid duration {text:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {text:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply() {
        Jail::expect_with(|_jail| {
            let config: Config = Figment::new().extract()?;
            assert_eq!(config.port, 8080);
            assert_eq!(config.log_level, "info");
            assert_eq!(config.anime_target_url, "https://ww1.anoboy.app");
            assert_eq!(config.movies_target_url, "https://tv4.lk21official.cc");
            assert!(config.public_origin.is_none());
            assert_eq!(config.shutdown_timeout, Duration::from_secs(8));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "9000");
            jail.set_env("DEFAULT_TARGET_URL", "https://site.example");
            jail.set_env("PUBLIC_ORIGIN", "https://gate.example");
            jail.set_env("SHUTDOWN_TIMEOUT", "1500ms");
            let config = Config::load()?;
            assert_eq!(config.port, 9000);
            assert_eq!(config.default_target_url, "https://site.example");
            assert_eq!(config.public_origin.as_deref(), Some("https://gate.example"));
            assert_eq!(config.shutdown_timeout, Duration::from_millis(1500));
            Ok(())
        });
    }

    #[test]
    fn bare_shutdown_timeout_is_seconds() {
        Jail::expect_with(|jail| {
            jail.set_env("SHUTDOWN_TIMEOUT", "3");
            assert_eq!(Config::load()?.shutdown_timeout, Duration::from_secs(3));
            Ok(())
        });
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration(" 250ms "), Ok(Duration::from_millis(250)));
        assert!(parse_duration("soon").is_err());
    }
}
