//! Purpose: Resolve where the console talks to and how long it waits.
//! Exports: `ConsoleConfig`, `parse_duration`, env variable names.
//! Role: Single source for endpoint and timeout settings used by the CLI and embedders.
//! Invariants: Precedence is defaults, then environment, then explicit overrides.
//! Invariants: URLs are validated when gateways are built, not when settings are read.
#![allow(clippy::result_large_err)]

use crate::api::{
    ApiResult, BreedCache, DEFAULT_BREEDS_URL, Error, ErrorKind, HttpBreedSource, RemoteGateway,
};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_BASE_URL: &str = "SPYCATS_API_BASE_URL";
pub const ENV_BREEDS_URL: &str = "SPYCATS_BREEDS_URL";
pub const ENV_TIMEOUT: &str = "SPYCATS_TIMEOUT";
pub const ENV_SUGGEST_DEBOUNCE: &str = "SPYCATS_SUGGEST_DEBOUNCE";

const DURATION_HINT: &str = "Use a number plus ms|s|m|h (e.g. 10s).";

#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub breeds_url: String,
    pub timeout: Duration,
    pub suggest_debounce: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            breeds_url: DEFAULT_BREEDS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            suggest_debounce: Duration::ZERO,
        }
    }
}

impl ConsoleConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> ApiResult<Self> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Applies non-blank values from `lookup`; unset or blank keys keep the current value.
    pub fn overlay_env<F>(mut self, lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = get(ENV_BREEDS_URL) {
            self.breeds_url = url;
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            self.timeout = parse_duration(&raw)
                .map_err(|err| err.with_hint(format!("Check {ENV_TIMEOUT}. {DURATION_HINT}")))?;
        }
        if let Some(raw) = get(ENV_SUGGEST_DEBOUNCE) {
            self.suggest_debounce = parse_duration(&raw).map_err(|err| {
                err.with_hint(format!("Check {ENV_SUGGEST_DEBOUNCE}. {DURATION_HINT}"))
            })?;
        }
        Ok(self)
    }

    pub fn with_api_base_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_base_url = url;
        }
        self
    }

    pub fn with_breeds_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.breeds_url = url;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        self
    }

    pub fn gateway(&self) -> ApiResult<RemoteGateway> {
        Ok(RemoteGateway::new(self.api_base_url.clone())?.with_timeout(self.timeout))
    }

    pub fn breed_source(&self) -> ApiResult<HttpBreedSource> {
        Ok(HttpBreedSource::new(self.breeds_url.clone())?.with_timeout(self.timeout))
    }

    pub fn breed_cache(&self) -> ApiResult<BreedCache<HttpBreedSource>> {
        self.breed_source().map(BreedCache::new)
    }
}

/// Parses `<digits><unit>` where unit is `ms`, `s`, `m`, or `h`.
pub fn parse_duration(input: &str) -> ApiResult<Duration> {
    let trimmed = input.trim();
    let split = trimmed.find(|ch: char| !ch.is_ascii_digit());
    let Some((digits, unit)) = split.map(|idx| trimmed.split_at(idx)) else {
        return Err(invalid_duration(trimmed));
    };
    let value: u64 = digits.parse().map_err(|_| invalid_duration(trimmed))?;
    let millis = match unit {
        "ms" => value,
        "s" => value.saturating_mul(1_000),
        "m" => value.saturating_mul(60_000),
        "h" => value.saturating_mul(3_600_000),
        _ => return Err(invalid_duration(trimmed)),
    };
    Ok(Duration::from_millis(millis))
}

fn invalid_duration(input: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid duration '{input}'"))
        .with_hint(DURATION_HINT)
}

#[cfg(test)]
mod tests {
    use super::{
        ConsoleConfig, DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_SUGGEST_DEBOUNCE, ENV_TIMEOUT,
        parse_duration,
    };
    use crate::api::{DEFAULT_BREEDS_URL, ErrorKind};
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_duration_accepts_each_unit() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration(" 2h ").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn parse_duration_rejects_bare_and_unknown_units() {
        for input in ["", "10", "s", "1.5s", "3d", "-1s"] {
            let err = parse_duration(input).expect_err(input);
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn defaults_without_env() {
        let config = ConsoleConfig::default().overlay_env(env(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.breeds_url, DEFAULT_BREEDS_URL);
        assert_eq!(config.suggest_debounce, Duration::ZERO);
    }

    #[test]
    fn env_then_explicit_overrides() {
        let config = ConsoleConfig::default()
            .overlay_env(env(&[(ENV_API_BASE_URL, "http://api.test"), (ENV_TIMEOUT, "250ms")]))
            .unwrap();
        assert_eq!(config.api_base_url, "http://api.test");
        assert_eq!(config.timeout, Duration::from_millis(250));

        let config = config
            .with_api_base_url(Some("http://flag.test".to_string()))
            .with_timeout(None);
        assert_eq!(config.api_base_url, "http://flag.test");
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = ConsoleConfig::default()
            .overlay_env(env(&[(ENV_API_BASE_URL, "  ")]))
            .unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn bad_env_timeout_is_a_usage_error() {
        let err = ConsoleConfig::default()
            .overlay_env(env(&[(ENV_TIMEOUT, "soon")]))
            .expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().is_some_and(|hint| hint.contains(ENV_TIMEOUT)));
    }

    #[test]
    fn suggest_debounce_comes_from_env() {
        let config = ConsoleConfig::default()
            .overlay_env(env(&[(ENV_SUGGEST_DEBOUNCE, "150ms")]))
            .unwrap();
        assert_eq!(config.suggest_debounce, Duration::from_millis(150));

        let err = ConsoleConfig::default()
            .overlay_env(env(&[(ENV_SUGGEST_DEBOUNCE, "fast")]))
            .expect_err("invalid");
        assert!(err.hint().is_some_and(|hint| hint.contains(ENV_SUGGEST_DEBOUNCE)));
    }

    #[test]
    fn bad_urls_surface_when_building_gateways() {
        let config = ConsoleConfig::default().with_api_base_url(Some("ftp://nope".to_string()));
        assert_eq!(config.gateway().err().map(|err| err.kind()), Some(ErrorKind::Usage));
    }
}
