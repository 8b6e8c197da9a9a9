//! Shared request plumbing for the hosted backend.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the project's public (anon) key on every request.
pub const API_KEY_HEADER: &str = "apikey";

/// HTTP client for one hosted backend project.
#[derive(Debug, Clone)]
pub struct HostedClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// Errors from the hosted backend layer.
#[derive(Debug, thiserror::Error)]
pub enum HostedError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

impl HostedError {
    /// HTTP status reported by the backend, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// The backend's own error message, suitable for showing to the user.
    ///
    /// Auth, REST and storage endpoints all answer with a JSON object; the
    /// first of `msg`, `message`, `error_description` or `error` wins. A
    /// non-JSON body is returned as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::Request(e) => e.to_string(),
            Self::Api { body, status } => {
                let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
                let from_json = parsed.as_ref().and_then(|json| {
                    ["msg", "message", "error_description", "error"]
                        .iter()
                        .find_map(|key| json.get(key).and_then(|v| v.as_str()))
                        .map(str::to_string)
                });
                match from_json {
                    Some(message) => message,
                    None if body.trim().is_empty() => format!("Backend returned status {status}"),
                    None => body.clone(),
                }
            }
        }
    }

    /// PostgREST / Postgres error code (`23505` for unique violations).
    pub fn pg_code(&self) -> Option<String> {
        match self {
            Self::Api { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_str()
                .map(str::to_string),
            Self::Request(_) => None,
        }
    }
}

impl HostedClient {
    /// * `base_url` - project URL, e.g. `https://abc.supabase.co`.
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, anon_key)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a project-relative path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `Authorization` value for calls made without a signed-in caller.
    pub fn anon_credential(&self) -> String {
        format!("Bearer {}", self.anon_key)
    }

    /// Request carrying only the anon key.
    pub(crate) fn anon(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Request on behalf of a caller, forwarding their `Authorization` value.
    pub(crate) fn as_caller(&self, method: Method, path: &str, credential: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.anon_key)
            .header(AUTHORIZATION, credential)
    }

    // ---- response helpers ----

    /// Return the response unchanged on success, or an [`HostedError::Api`]
    /// carrying the status and body text.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, HostedError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), %body, "Hosted backend rejected request");
            return Err(HostedError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    pub(crate) async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, HostedError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn check_status(response: reqwest::Response) -> Result<(), HostedError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
