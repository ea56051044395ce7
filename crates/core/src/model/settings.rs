use thiserror::Error;
use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientSettings {
    api_base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ClientSettingsDraft {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientSettingsDraft {
    /// Normalize blank values away and check the base URL.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidBaseUrl` if the URL does not parse or is
    /// not http(s).
    pub fn validate(self) -> Result<ClientSettings, SettingsError> {
        let api_base_url = normalize_optional(self.api_base_url)
            .map(|raw| raw.trim_end_matches('/').to_owned());
        let api_key = normalize_optional(self.api_key);

        if let Some(raw) = api_base_url.as_ref() {
            let parsed = Url::parse(raw).map_err(|_| SettingsError::InvalidBaseUrl(raw.clone()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SettingsError::InvalidBaseUrl(raw.clone()));
            }
        }

        Ok(ClientSettings {
            api_base_url,
            api_key,
        })
    }
}

impl ClientSettings {
    /// Base URL without a trailing slash.
    #[must_use]
    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
