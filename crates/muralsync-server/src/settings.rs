//! Server settings layered from `MURALSYNC_*` environment variables over
//! the compiled defaults.

use std::str::FromStr;
use std::time::Duration;

use muralsync::ServerConfig;

/// A variable was set but could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct SettingsError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

pub const BIND: &str = "MURALSYNC_BIND";
pub const SESSION_TIMEOUT_SECS: &str = "MURALSYNC_SESSION_TIMEOUT_SECS";
pub const MAX_SESSION_AGE_SECS: &str = "MURALSYNC_MAX_SESSION_AGE_SECS";
pub const CLEANUP_INTERVAL_SECS: &str = "MURALSYNC_CLEANUP_INTERVAL_SECS";
pub const MAX_NOTES: &str = "MURALSYNC_MAX_NOTES";
pub const MAX_DRAWINGS: &str = "MURALSYNC_MAX_DRAWINGS";
pub const MAX_TEXTS: &str = "MURALSYNC_MAX_TEXTS";
pub const SESSION_CODE_LENGTH: &str = "MURALSYNC_SESSION_CODE_LENGTH";
pub const SWEEP_CEILING: &str = "MURALSYNC_SWEEP_CEILING";
pub const STATS_INTERVAL_SECS: &str = "MURALSYNC_STATS_INTERVAL_SECS";
pub const CONNECTION_TIMEOUT_SECS: &str = "MURALSYNC_CONNECTION_TIMEOUT_SECS";

/// Reads settings from the process environment.
pub fn from_env() -> Result<ServerConfig, SettingsError> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Builds a config from `lookup`, starting from [`ServerConfig::default`].
/// Unset and empty variables keep the default.
pub fn from_lookup<F>(lookup: F) -> Result<ServerConfig, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Lookup(lookup);
    let mut config = ServerConfig::default();

    if let Some(bind) = env.raw(BIND) {
        config.bind_addr = bind;
    }
    if let Some(timeout) = env.secs(CONNECTION_TIMEOUT_SECS)? {
        config.connection_timeout = timeout;
    }

    let engine = &mut config.engine;
    if let Some(period) = env.secs(STATS_INTERVAL_SECS)? {
        engine.stats_interval = period;
    }
    if let Some(period) = env.secs(CLEANUP_INTERVAL_SECS)? {
        engine.reaper.period = period;
    }

    let store = &mut engine.store;
    if let Some(timeout) = env.secs(SESSION_TIMEOUT_SECS)? {
        store.idle_timeout = timeout;
    }
    if let Some(age) = env.secs(MAX_SESSION_AGE_SECS)? {
        store.max_age = age;
    }
    if let Some(n) = env.parse(MAX_NOTES)? {
        store.max_notes = n;
    }
    if let Some(n) = env.parse(MAX_DRAWINGS)? {
        store.max_drawings = n;
    }
    if let Some(n) = env.parse(MAX_TEXTS)? {
        store.max_texts = n;
    }
    if let Some(n) = env.parse(SESSION_CODE_LENGTH)? {
        store.code_length = n;
    }
    if let Some(n) = env.parse(SWEEP_CEILING)? {
        store.sweep_ceiling = n;
    }

    Ok(config)
}

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    fn raw(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, SettingsError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.raw(name) else {
            return Ok(None);
        };
        value.parse().map(Some).map_err(|e: T::Err| SettingsError {
            name,
            reason: e.to_string(),
            value,
        })
    }

    fn secs(&self, name: &'static str) -> Result<Option<Duration>, SettingsError> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_gives_defaults() {
        let config = from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides_each_layer() {
        let config = from_lookup(lookup(&[
            (BIND, "0.0.0.0:8080"),
            (SESSION_TIMEOUT_SECS, "120"),
            (MAX_SESSION_AGE_SECS, "3600"),
            (CLEANUP_INTERVAL_SECS, "5"),
            (MAX_NOTES, "10"),
            (MAX_DRAWINGS, "20"),
            (MAX_TEXTS, "30"),
            (SESSION_CODE_LENGTH, "8"),
            (SWEEP_CEILING, "50"),
            (STATS_INTERVAL_SECS, "0"),
            (CONNECTION_TIMEOUT_SECS, "90"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.connection_timeout, Duration::from_secs(90));
        assert_eq!(config.engine.stats_interval, Duration::ZERO);
        assert_eq!(config.engine.reaper.period, Duration::from_secs(5));

        let store = &config.engine.store;
        assert_eq!(store.idle_timeout, Duration::from_secs(120));
        assert_eq!(store.max_age, Duration::from_secs(3600));
        assert_eq!(store.max_notes, 10);
        assert_eq!(store.max_drawings, 20);
        assert_eq!(store.max_texts, 30);
        assert_eq!(store.code_length, 8);
        assert_eq!(store.sweep_ceiling, 50);
    }

    #[test]
    fn test_from_lookup_blank_value_keeps_default() {
        let config = from_lookup(lookup(&[(MAX_NOTES, "  ")])).unwrap();
        assert_eq!(config.engine.store.max_notes, 200);
    }

    #[test]
    fn test_from_lookup_unparsable_value_names_variable() {
        let err = from_lookup(lookup(&[(MAX_DRAWINGS, "lots")])).unwrap_err();
        assert_eq!(err.name, MAX_DRAWINGS);
        assert_eq!(err.value, "lots");
        assert!(err.to_string().contains("MURALSYNC_MAX_DRAWINGS"));
    }

    #[test]
    fn test_from_lookup_negative_seconds_rejected() {
        let err = from_lookup(lookup(&[(SESSION_TIMEOUT_SECS, "-1")])).unwrap_err();
        assert_eq!(err.name, SESSION_TIMEOUT_SECS);
    }
}
