use reqwest::{Client, RequestBuilder};

use memo_core::model::{ClientSettings, PracticeBundle, PracticeProgress, SessionId, SongRequest};

use crate::error::GenerationError;

#[derive(Clone, Debug)]
struct Endpoint {
    base_url: String,
    api_key: Option<String>,
}

/// HTTP client for the song generation service.
#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: Option<Endpoint>,
}

impl GenerationClient {
    #[must_use]
    pub fn new(settings: &ClientSettings) -> Self {
        let endpoint = settings.api_base_url().map(|base| Endpoint {
            base_url: base.trim_end_matches('/').to_owned(),
            api_key: settings.api_key().map(str::to_owned),
        });
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Ask the service to write and record a song for `request`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the client is disabled, the request
    /// fails, or the service answers with a non-success status.
    pub async fn generate(&self, request: &SongRequest) -> Result<PracticeBundle, GenerationError> {
        let builder = self.request(|client, base| client.post(format!("{base}/generate-song")))?;
        let response = builder.json(request).send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Fetch a previously generated session.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the client is disabled, the request
    /// fails, or the service answers with a non-success status.
    pub async fn fetch_session(&self, id: SessionId) -> Result<PracticeBundle, GenerationError> {
        let builder = self.request(|client, base| client.get(format!("{base}/sessions/{id}")))?;
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }
        let mut bundle: PracticeBundle = response.json().await?;
        bundle.session_id.get_or_insert(id);
        Ok(bundle)
    }

    /// Store the practice summary for a session on the service.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the client is disabled, the request
    /// fails, or the service answers with a non-success status.
    pub async fn put_progress(
        &self,
        id: SessionId,
        progress: &PracticeProgress,
    ) -> Result<(), GenerationError> {
        let builder =
            self.request(|client, base| client.put(format!("{base}/sessions/{id}/progress")))?;
        let response = builder.json(progress).send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }
        Ok(())
    }

    fn request(
        &self,
        build: impl FnOnce(&Client, &str) -> RequestBuilder,
    ) -> Result<RequestBuilder, GenerationError> {
        let endpoint = self.endpoint.as_ref().ok_or(GenerationError::Disabled)?;
        let builder = build(&self.client, &endpoint.base_url);
        Ok(match endpoint.api_key.as_deref() {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        })
    }
}
