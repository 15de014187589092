use anyhow::Result;
use std::env;
use crate::constants::*;
use crate::services::HubSettings;
use crate::services::session::TripLength;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub session_min_minutes: u64,
    pub session_max_minutes: u64,
    pub hub_queue_capacity: usize,
    /// Allowed CORS origins, permissive when empty
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            port: parse_or(&lookup, "PORT", DEFAULT_SERVER_PORT)?,
            session_min_minutes: parse_or(&lookup, "SESSION_MIN_MINUTES", DEFAULT_SESSION_MIN_MINUTES)?,
            session_max_minutes: parse_or(&lookup, "SESSION_MAX_MINUTES", DEFAULT_SESSION_MAX_MINUTES)?,
            hub_queue_capacity: parse_or(&lookup, "HUB_QUEUE_CAPACITY", DEFAULT_HUB_QUEUE_CAPACITY)?,
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };

        if config.session_min_minutes == 0 || config.session_min_minutes > config.session_max_minutes {
            anyhow::bail!(
                "SESSION_MIN_MINUTES ({}) must be positive and not exceed SESSION_MAX_MINUTES ({})",
                config.session_min_minutes,
                config.session_max_minutes
            );
        }
        if config.hub_queue_capacity == 0 {
            anyhow::bail!("HUB_QUEUE_CAPACITY must be positive");
        }

        Ok(config)
    }

    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            trip: TripLength {
                min_minutes: self.session_min_minutes,
                max_minutes: self.session_max_minutes,
            },
            queue_capacity: self.hub_queue_capacity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            session_min_minutes: DEFAULT_SESSION_MIN_MINUTES,
            session_max_minutes: DEFAULT_SESSION_MAX_MINUTES,
            hub_queue_capacity: DEFAULT_HUB_QUEUE_CAPACITY,
            allowed_origins: Vec::new(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.session_min_minutes, 5);
        assert_eq!(config.session_max_minutes, 34);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("SESSION_MIN_MINUTES", "1"),
            ("SESSION_MAX_MINUTES", "2"),
            ("ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.hub_settings().trip, TripLength { min_minutes: 1, max_minutes: 2 });
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_rejects_inverted_trip_range() {
        let err = Config::from_lookup(lookup(&[
            ("SESSION_MIN_MINUTES", "30"),
            ("SESSION_MAX_MINUTES", "10"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SESSION_MIN_MINUTES"));
    }

    #[test]
    fn test_rejects_garbage_port() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
    }
}
