//! Identity extractors for Axum handlers.
//!
//! Every handler obtains the caller the same way: the raw `Authorization`
//! header is captured as a [`Credential`] and resolved once through the
//! [`IdentityProvider`](crate::services::identity::IdentityProvider) held in
//! [`AppState`].

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use wedflex_core::error::CoreError;
use wedflex_core::identity::Identity;

use crate::error::AppError;
use crate::state::AppState;

/// Rejection message when a route requires a session and none resolves.
pub const NOT_AUTHENTICATED: &str = "not authenticated";

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// The caller's `Authorization` header value, kept verbatim so it can be
/// forwarded to collaborators that enforce ownership themselves.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(header_value: impl Into<String>) -> Self {
        Self(header_value.into())
    }

    /// Build the header value for a bearer token.
    pub fn bearer(token: &str) -> Self {
        Self(format!("Bearer {token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The token after the `Bearer ` scheme, if the header uses it.
    pub fn bearer_token(&self) -> Option<&str> {
        let (scheme, token) = self.0.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }

    fn from_parts(parts: &Parts) -> Option<Self> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// The raw `Authorization` header, if any, without resolving it.
///
/// Lets a handler validate its input before paying for identity lookup.
#[derive(Debug, Clone)]
pub struct MaybeCredential(pub Option<Credential>);

impl FromRequestParts<AppState> for MaybeCredential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeCredential(Credential::from_parts(parts)))
    }
}

// ---------------------------------------------------------------------------
// Resolved identity
// ---------------------------------------------------------------------------

/// A signed-in couple, resolved from the bearer credential.
///
/// ```ignore
/// async fn my_handler(caller: CurrentIdentity) -> AppResult<Json<()>> {
///     tracing::info!(couple_id = %caller.identity.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentIdentity {
    pub identity: Identity,
    /// The credential the identity was resolved from.
    pub credential: Credential,
}

impl CurrentIdentity {
    /// Resolve a credential through the configured provider.
    pub async fn resolve(
        state: &AppState,
        credential: Option<Credential>,
    ) -> Result<Option<Self>, AppError> {
        let Some(credential) = credential else {
            return Ok(None);
        };
        let identity = state.identity.resolve(&credential).await?;
        Ok(identity.map(|identity| Self {
            identity,
            credential,
        }))
    }

    /// Like [`resolve`](Self::resolve), but a missing identity is a 401.
    pub async fn require(
        state: &AppState,
        credential: Option<Credential>,
    ) -> Result<Self, AppError> {
        Self::resolve(state, credential)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized(NOT_AUTHENTICATED.into())))
    }
}

impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::require(state, Credential::from_parts(parts)).await
    }
}

/// The signed-in couple, or `None` for anonymous callers.
///
/// An unresolvable credential counts as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<CurrentIdentity>);

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = CurrentIdentity::resolve(state, Credential::from_parts(parts)).await?;
        Ok(MaybeIdentity(caller))
    }
}
