//! Passwordless sign-in against the hosted auth service.

use reqwest::Method;
use serde::Serialize;
use serde_json::json;
use wedflex_core::identity::{Identity, Session, BEARER_TOKEN_TYPE};

use crate::client::{HostedClient, HostedError};

/// Verification type used when the callback query does not name one.
pub const DEFAULT_VERIFY_TYPE: &str = "email";

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    token_hash: &'a str,
}

impl HostedClient {
    /// `POST /auth/v1/otp`: email a one-time sign-in link.
    ///
    /// The link returns to `redirect_to`. Unknown emails are signed up.
    pub async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), HostedError> {
        let response = self
            .anon(Method::POST, "/auth/v1/otp")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `POST /auth/v1/verify`: trade a one-time token hash for a session.
    pub async fn verify_token_hash(
        &self,
        token_hash: &str,
        kind: Option<&str>,
    ) -> Result<Session, HostedError> {
        let response = self
            .anon(Method::POST, "/auth/v1/verify")
            .json(&VerifyRequest {
                kind: kind.unwrap_or(DEFAULT_VERIFY_TYPE),
                token_hash,
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /auth/v1/user`: who does this `Authorization` value belong to?
    pub async fn get_user(&self, credential: &str) -> Result<Identity, HostedError> {
        let response = self
            .as_caller(Method::GET, "/auth/v1/user", credential)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Build a session from tokens delivered in a callback fragment.
    ///
    /// The access token is checked against `/auth/v1/user` before it is trusted.
    pub async fn session_from_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> Result<Session, HostedError> {
        let user = self.get_user(&format!("Bearer {access_token}")).await?;
        Ok(Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in,
            token_type: BEARER_TOKEN_TYPE.to_string(),
            user,
        })
    }

    /// `POST /auth/v1/token?grant_type=refresh_token`.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, HostedError> {
        let response = self
            .anon(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /auth/v1/logout`: revoke the caller's refresh tokens.
    pub async fn sign_out(&self, credential: &str) -> Result<(), HostedError> {
        let response = self
            .as_caller(Method::POST, "/auth/v1/logout", credential)
            .send()
            .await?;
        Self::check_status(response).await
    }
}
