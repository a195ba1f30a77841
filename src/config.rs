//! Runtime configuration
//!
//! Read from the environment (after `.env` is loaded by the binaries).

use std::path::PathBuf;
use std::str::FromStr;

use crate::classifier::ClassifierConfig;
use crate::error::ChatbotError;
use crate::Result;

const DEFAULT_INTENTS_PATH: &str = "intents.json";
const DEFAULT_CHAT_LOG_PATH: &str = "chat_log.csv";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Intent definitions file
    pub intents_path: PathBuf,
    /// CSV conversation log
    pub chat_log_path: PathBuf,
    /// HTTP port for the API binary
    pub port: u16,
    pub classifier: ClassifierConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            intents_path: PathBuf::from(DEFAULT_INTENTS_PATH),
            chat_log_path: PathBuf::from(DEFAULT_CHAT_LOG_PATH),
            port: DEFAULT_PORT,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("INTENTS_PATH") {
            config.intents_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHAT_LOG_PATH") {
            config.chat_log_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT").or_else(|| lookup("API_PORT")) {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(max_iter) = lookup("CLASSIFIER_MAX_ITER") {
            config.classifier.max_iter = parse_var("CLASSIFIER_MAX_ITER", &max_iter)?;
            if config.classifier.max_iter == 0 {
                return Err(ChatbotError::ConfigError(
                    "CLASSIFIER_MAX_ITER must be at least 1".to_string(),
                ));
            }
        }
        if let Some(c) = lookup("CLASSIFIER_C") {
            config.classifier.c = parse_var("CLASSIFIER_C", &c)?;
        }

        Ok(config)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        ChatbotError::ConfigError(format!("Invalid {} '{}': {}", name, value, e))
    })
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
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.intents_path, PathBuf::from("intents.json"));
        assert_eq!(config.chat_log_path, PathBuf::from("chat_log.csv"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.classifier.max_iter, 10_000);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("INTENTS_PATH", "data/intents.json"),
            ("API_PORT", "9000"),
            ("CLASSIFIER_C", "2.5"),
        ]))
        .unwrap();

        assert_eq!(config.intents_path, PathBuf::from("data/intents.json"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.classifier.c, 2.5);
    }

    #[test]
    fn test_port_takes_precedence() {
        let config =
            AppConfig::from_lookup(lookup(&[("PORT", "3000"), ("API_PORT", "9000")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_zero_iteration_cap() {
        let err = AppConfig::from_lookup(lookup(&[("CLASSIFIER_MAX_ITER", "0")])).unwrap_err();
        assert!(matches!(err, ChatbotError::ConfigError(_)));
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ChatbotError::ConfigError(_)));
    }
}
