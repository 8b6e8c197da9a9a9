//! Magic-link sign-in rules: callback URLs, continuation targets, and how a
//! callback URL is turned into an exchange attempt.
//!
//! Nothing here performs I/O. Providers decide how a [`CallbackExchange`] is
//! traded for a session; this module decides *whether* one is attempted and
//! where the user lands afterwards.

use url::{form_urlencoded, Url};

use crate::error::CoreError;

/// Sign-in entry point for couples.
pub const SIGN_IN_PATH: &str = "/auth/signin";

/// Path the emailed link points back to.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Where a couple lands after signing in when no continuation was given.
pub const DEFAULT_NEXT: &str = "/dashboard/couple";

/// Role marker carried on sign-in and callback URLs.
pub const COUPLE_ROLE: &str = "couple";

/// Message attached to the sign-in redirect when the provider gave none.
pub const DEFAULT_SIGN_IN_ERROR: &str = "Sign-in failed";

/// Query/fragment parameters that carry a one-time code.
const CODE_PARAMS: [&str; 2] = ["code", "token_hash"];

// ---------------------------------------------------------------------------
// Continuation targets
// ---------------------------------------------------------------------------

/// Accept only same-site relative paths as continuation targets.
///
/// Returns `None` for absolute URLs, protocol-relative (`//host`) paths and
/// anything not starting with `/`.
pub fn sanitize_next(next: &str) -> Option<&str> {
    let next = next.trim();
    let relative = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    relative.then_some(next)
}

/// Resolve an optional continuation target, defaulting to the dashboard.
pub fn next_or_default(next: Option<&str>) -> String {
    next.and_then(sanitize_next)
        .unwrap_or(DEFAULT_NEXT)
        .to_string()
}

/// Build the URL the emailed link should return to.
///
/// `next` is attached only when it is a safe relative path.
pub fn callback_url(origin: &Url, next: Option<&str>) -> Result<Url, CoreError> {
    let mut url = origin
        .join(CALLBACK_PATH)
        .map_err(|e| CoreError::Internal(format!("Invalid public origin '{origin}': {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("role", COUPLE_ROLE);
        if let Some(next) = next.and_then(sanitize_next) {
            query.append_pair("next", next);
        }
    }
    Ok(url)
}

/// Relative sign-in path, optionally carrying a continuation and an error.
pub fn sign_in_path(next: Option<&str>, error: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("role", COUPLE_ROLE);
    if let Some(next) = next.and_then(sanitize_next) {
        query.append_pair("next", next);
    }
    if let Some(error) = error {
        query.append_pair("error", error);
    }
    format!("{SIGN_IN_PATH}?{}", query.finish())
}

/// Sign-in redirect used when an exchange fails.
pub fn failure_redirect(message: Option<&str>) -> String {
    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_SIGN_IN_ERROR);
    sign_in_path(None, Some(message))
}

// ---------------------------------------------------------------------------
// Callback handling
// ---------------------------------------------------------------------------

/// What a callback URL carries for the provider to exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackExchange {
    /// Tokens (or an error) delivered in the URL fragment.
    Fragment(String),
    /// A one-time code delivered in the query string (full query retained).
    Query(String),
}

impl CallbackExchange {
    fn raw(&self) -> &str {
        match self {
            Self::Fragment(raw) | Self::Query(raw) => raw,
        }
    }

    /// Look up a single parameter in the fragment or query.
    pub fn param(&self, key: &str) -> Option<String> {
        form_urlencoded::parse(self.raw().as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// The one-time code, if the exchange carries one.
    pub fn code(&self) -> Option<String> {
        CODE_PARAMS.iter().find_map(|key| self.param(key))
    }

    /// An error reported by the identity service in the link itself.
    pub fn error_message(&self) -> Option<String> {
        self.param("error_description").or_else(|| self.param("error"))
    }
}

/// The decision derived from a callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPlan {
    /// Where to send the user after a successful exchange.
    pub next: String,
    /// What to exchange, or `None` when the URL carries nothing usable.
    pub exchange: Option<CallbackExchange>,
}

/// Inspect a callback URL.
///
/// A non-empty fragment wins; otherwise a `code`/`token_hash` query parameter
/// is exchanged together with the rest of the query string.
pub fn plan_callback(url: &Url) -> CallbackPlan {
    let next = url
        .query_pairs()
        .find(|(k, _)| k == "next")
        .map(|(_, v)| v.into_owned());
    let next = next_or_default(next.as_deref());

    let fragment = url.fragment().filter(|f| !f.is_empty());
    let has_code = url
        .query_pairs()
        .any(|(k, v)| CODE_PARAMS.contains(&k.as_ref()) && !v.is_empty());

    let exchange = match fragment {
        Some(fragment) => Some(CallbackExchange::Fragment(fragment.to_string())),
        None if has_code => Some(CallbackExchange::Query(
            url.query().unwrap_or_default().to_string(),
        )),
        None => None,
    };

    CallbackPlan { next, exchange }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://wedflex.example").unwrap()
    }

    #[test]
    fn callback_url_carries_role_and_next() {
        let url = callback_url(&origin(), Some("/post-your-first-offer")).unwrap();
        assert_eq!(url.path(), CALLBACK_PATH);
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("role".into(), "couple".into())));
        assert!(pairs.contains(&("next".into(), "/post-your-first-offer".into())));
    }

    #[test]
    fn callback_url_drops_unsafe_next() {
        let url = callback_url(&origin(), Some("https://evil.example")).unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "next"));
    }

    #[test]
    fn next_only_accepts_relative_paths() {
        assert_eq!(sanitize_next("/post-offer"), Some("/post-offer"));
        assert_eq!(sanitize_next("//evil.example"), None);
        assert_eq!(sanitize_next("https://evil.example"), None);
        assert_eq!(sanitize_next("/\\evil.example"), None);
        assert_eq!(next_or_default(None), DEFAULT_NEXT);
    }

    #[test]
    fn failure_redirect_encodes_message() {
        let path = failure_redirect(Some("Link expired & used"));
        assert!(path.starts_with("/auth/signin?role=couple&error="));
        assert!(path.contains("Link+expired+%26+used"));
        assert_eq!(
            failure_redirect(None),
            "/auth/signin?role=couple&error=Sign-in+failed"
        );
    }

    #[test]
    fn fragment_takes_precedence_over_code() {
        let url = Url::parse(
            "https://wedflex.example/auth/callback?code=abc&next=/post-offer#access_token=t&refresh_token=r",
        )
        .unwrap();
        let plan = plan_callback(&url);
        assert_eq!(plan.next, "/post-offer");
        let exchange = plan.exchange.unwrap();
        assert!(matches!(exchange, CallbackExchange::Fragment(_)));
        assert_eq!(exchange.param("access_token").as_deref(), Some("t"));
    }

    #[test]
    fn code_in_query_is_exchanged_with_full_query() {
        let url = Url::parse("https://wedflex.example/auth/callback?role=couple&code=xyz").unwrap();
        let plan = plan_callback(&url);
        assert_eq!(plan.next, DEFAULT_NEXT);
        let exchange = plan.exchange.unwrap();
        assert_eq!(exchange, CallbackExchange::Query("role=couple&code=xyz".into()));
        assert_eq!(exchange.code().as_deref(), Some("xyz"));
    }

    #[test]
    fn nothing_to_exchange() {
        let url = Url::parse("https://wedflex.example/auth/callback?role=couple").unwrap();
        assert_eq!(plan_callback(&url).exchange, None);
    }

    #[test]
    fn error_in_fragment_is_reported() {
        let exchange =
            CallbackExchange::Fragment("error=access_denied&error_description=Email+link+is+invalid".into());
        assert_eq!(exchange.error_message().as_deref(), Some("Email link is invalid"));
    }
}
