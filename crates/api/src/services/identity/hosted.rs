use async_trait::async_trait;
use url::Url;
use wedflex_core::identity::{Identity, Session};
use wedflex_core::magic_link::CallbackExchange;
use wedflex_hosted::HostedClient;

use super::{IdentityError, IdentityProvider};
use crate::middleware::auth::{CurrentIdentity, Credential};

/// Access-token lifetime assumed when a callback fragment omits `expires_in`.
const DEFAULT_FRAGMENT_EXPIRY_SECS: i64 = 3600;

/// Identity backed by the managed auth service.
pub struct HostedIdentity {
    client: HostedClient,
}

impl HostedIdentity {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn send_magic_link(&self, email: &str, redirect_to: &Url) -> Result<(), IdentityError> {
        self.client
            .send_magic_link(email, redirect_to.as_str())
            .await
            .map_err(|e| IdentityError::Upstream(e.user_message()))
    }

    async fn exchange(&self, exchange: &CallbackExchange) -> Result<Session, IdentityError> {
        if let Some(message) = exchange.error_message() {
            return Err(IdentityError::Rejected(message));
        }

        match exchange {
            CallbackExchange::Fragment(_) => {
                let access_token = exchange.param("access_token").ok_or_else(|| {
                    IdentityError::Rejected("Sign-in link is missing an access token".into())
                })?;
                let refresh_token = exchange.param("refresh_token").unwrap_or_default();
                let expires_in = exchange
                    .param("expires_in")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_FRAGMENT_EXPIRY_SECS);
                Ok(self
                    .client
                    .session_from_tokens(&access_token, &refresh_token, expires_in)
                    .await?)
            }
            CallbackExchange::Query(_) => {
                let code = exchange.code().ok_or_else(|| {
                    IdentityError::Rejected("Sign-in link is missing its code".into())
                })?;
                let kind = exchange.param("type");
                Ok(self.client.verify_token_hash(&code, kind.as_deref()).await?)
            }
        }
    }

    async fn resolve(&self, credential: &Credential) -> Result<Option<Identity>, IdentityError> {
        match self.client.get_user(credential.as_str()).await {
            Ok(identity) => Ok(Some(identity)),
            Err(e) if matches!(e.status(), Some(401 | 403)) => Ok(None),
            Err(e) => Err(IdentityError::Upstream(e.user_message())),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        Ok(self.client.refresh_session(refresh_token).await?)
    }

    async fn sign_out(&self, caller: &CurrentIdentity) -> Result<(), IdentityError> {
        self.client
            .sign_out(caller.credential.as_str())
            .await
            .map_err(|e| IdentityError::Upstream(e.user_message()))
    }
}
