use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cqrs_es::mem_store::MemStore;
use cqrs_es::{CqrsFramework, Query};
use thiserror::Error;

use crate::SimpleLoggingQuery;
use crate::domain::booking::{Booking, BookingServices};
use crate::domain::route::{RouteCatalog, RouteError};
use crate::i18n::{Language, UnsupportedLanguage};
use crate::services::payment_gateway::{
    DEFAULT_REFUND_DELAY, DEFAULT_SETTLE_DELAY, PaymentGateway, RetryPolicy, RetryingGateway,
    SimulatedGateway,
};
use crate::view_repository::BookingViewRepository;

pub type BookingCqrs = CqrsFramework<Booking, MemStore<Booking>>;

#[must_use]
pub fn cqrs_framework(services: BookingServices) -> (Arc<BookingCqrs>, BookingViewRepository) {
    // A very simple query that traces each event.
    let simple_query = SimpleLoggingQuery {};

    // Latest view of every session, read back by the wizard and the HTTP layer.
    let view_repo = BookingViewRepository::new();

    let queries: Vec<Box<dyn Query<Booking>>> =
        vec![Box::new(simple_query), Box::new(view_repo.clone())];

    (
        Arc::new(CqrsFramework::new(MemStore::default(), queries, services)),
        view_repo,
    )
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
    #[error(transparent)]
    Language(#[from] UnsupportedLanguage),
    #[error("cannot read routes file {path}: {source}")]
    RoutesFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Routes(#[from] RouteError),
}

/// Runtime settings, read from the environment (after `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub language: Language,
    pub settle_delay: Duration,
    pub refund_delay: Duration,
    pub retry: RetryPolicy,
    /// JSON route catalog; the bundled sample is used when unset.
    pub routes_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3030,
            language: Language::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            refund_delay: DEFAULT_REFUND_DELAY,
            retry: RetryPolicy::default(),
            routes_file: None,
        }
    }
}

impl Settings {
    /// # Errors
    ///
    /// Returns an error when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            get(key)
                .map(|value| {
                    value
                        .parse::<u64>()
                        .map_err(|_| ConfigError::Invalid { key, value })
                })
                .transpose()
        };

        let defaults = Self::default();
        let port = match get("BUS_BOOKING_PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "BUS_BOOKING_PORT",
                value,
            })?,
            None => defaults.port,
        };
        let language = match get("BUS_BOOKING_LANGUAGE") {
            Some(code) => code.parse::<Language>()?,
            None => defaults.language,
        };
        let settle_delay = number("BUS_BOOKING_SETTLE_DELAY_MS")?
            .map_or(defaults.settle_delay, Duration::from_millis);
        let refund_delay = number("BUS_BOOKING_REFUND_DELAY_MS")?
            .map_or(defaults.refund_delay, Duration::from_millis);
        let retry = match number("BUS_BOOKING_RETRY_ATTEMPTS")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "BUS_BOOKING_RETRY_ATTEMPTS",
                    value: "0".to_string(),
                });
            }
            Some(attempts) => RetryPolicy {
                max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                ..defaults.retry
            },
            None => defaults.retry,
        };

        Ok(Self {
            port,
            language,
            settle_delay,
            refund_delay,
            retry,
            routes_file: get("BUS_BOOKING_ROUTES_FILE").map(PathBuf::from),
        })
    }

    /// # Errors
    ///
    /// Returns an error when the routes file is unreadable or invalid.
    pub fn load_catalog(&self) -> Result<RouteCatalog, ConfigError> {
        match &self.routes_file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::RoutesFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(RouteCatalog::from_json(&json)?)
            }
            None => Ok(RouteCatalog::sample()?),
        }
    }

    /// The simulated gateway wrapped in the configured retry policy.
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::new(RetryingGateway::new(
            SimulatedGateway::new(self.settle_delay, self.refund_delay),
            self.retry,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(settings(&[]).unwrap(), Settings::default());
    }

    #[test]
    fn reads_every_variable() {
        let s = settings(&[
            ("BUS_BOOKING_PORT", "8080"),
            ("BUS_BOOKING_LANGUAGE", "hi"),
            ("BUS_BOOKING_SETTLE_DELAY_MS", "10"),
            ("BUS_BOOKING_REFUND_DELAY_MS", " 5 "),
            ("BUS_BOOKING_RETRY_ATTEMPTS", "4"),
            ("BUS_BOOKING_ROUTES_FILE", "/tmp/routes.json"),
        ])
        .unwrap();

        assert_eq!(s.port, 8080);
        assert_eq!(s.language, Language::Hi);
        assert_eq!(s.settle_delay, Duration::from_millis(10));
        assert_eq!(s.refund_delay, Duration::from_millis(5));
        assert_eq!(s.retry.max_attempts, 4);
        assert_eq!(s.routes_file, Some(PathBuf::from("/tmp/routes.json")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let s = settings(&[("BUS_BOOKING_PORT", "  "), ("BUS_BOOKING_LANGUAGE", "")]).unwrap();
        assert_eq!(s.port, 3030);
        assert_eq!(s.language, Language::En);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            settings(&[("BUS_BOOKING_PORT", "http")]),
            Err(ConfigError::Invalid {
                key: "BUS_BOOKING_PORT",
                ..
            })
        ));
        assert!(matches!(
            settings(&[("BUS_BOOKING_LANGUAGE", "fr")]),
            Err(ConfigError::Language(_))
        ));
        assert!(matches!(
            settings(&[("BUS_BOOKING_RETRY_ATTEMPTS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_routes_file_is_reported() {
        let s = Settings {
            routes_file: Some(PathBuf::from("/definitely/not/here.json")),
            ..Settings::default()
        };
        assert!(matches!(
            s.load_catalog(),
            Err(ConfigError::RoutesFile { .. })
        ));
        assert!(Settings::default().load_catalog().is_ok());
    }
}
