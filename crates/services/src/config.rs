use std::env;

use memo_core::model::{ClientSettings, ClientSettingsDraft};

use crate::error::ConfigError;
use crate::practice::DEFAULT_LEAD_IN_SECS;

pub const ENV_API_BASE_URL: &str = "MEMO_API_BASE_URL";
pub const ENV_API_KEY: &str = "MEMO_API_KEY";
pub const ENV_LEAD_IN_SECS: &str = "MEMO_LEAD_IN_SECS";

/// Runtime settings for the services layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ServicesConfig {
    pub settings: ClientSettings,
    /// Seconds before a blank's start time at which playback pauses.
    pub lead_in: f64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            settings: ClientSettings::default(),
            lead_in: DEFAULT_LEAD_IN_SECS,
        }
    }
}

impl ServicesConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid base URL or lead-in value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid base URL or lead-in value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let settings = ClientSettingsDraft {
            api_base_url: lookup(ENV_API_BASE_URL),
            api_key: lookup(ENV_API_KEY),
        }
        .validate()?;

        let lead_in = match lookup(ENV_LEAD_IN_SECS) {
            Some(raw) if !raw.trim().is_empty() => parse_lead_in(&raw)?,
            _ => DEFAULT_LEAD_IN_SECS,
        };

        Ok(Self { settings, lead_in })
    }

    #[must_use]
    pub fn remote_enabled(&self) -> bool {
        self.settings.api_base_url().is_some()
    }
}

fn parse_lead_in(raw: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::InvalidLeadIn {
        value: raw.to_owned(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServicesConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServicesConfig::default());
        assert!(!config.remote_enabled());
    }

    #[test]
    fn reads_remote_settings_and_lead_in() {
        let config = ServicesConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://songs.example.com/api/"),
            (ENV_API_KEY, " secret "),
            (ENV_LEAD_IN_SECS, "0.5"),
        ]))
        .unwrap();
        assert_eq!(
            config.settings.api_base_url(),
            Some("https://songs.example.com/api")
        );
        assert_eq!(config.settings.api_key(), Some("secret"));
        assert_eq!(config.lead_in, 0.5);
        assert!(config.remote_enabled());
    }

    #[test]
    fn rejects_bad_lead_in() {
        for raw in ["-1", "soon", "inf"] {
            let err = ServicesConfig::from_lookup(lookup(&[(ENV_LEAD_IN_SECS, raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidLeadIn { .. }), "{raw}");
        }
    }

    #[test]
    fn rejects_bad_base_url() {
        let err =
            ServicesConfig::from_lookup(lookup(&[(ENV_API_BASE_URL, "ftp://nope")])).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }
}
