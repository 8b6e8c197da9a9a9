//! Turning a normalized offer into exactly one stored row.

use wedflex_core::offer::{NewOffer, NormalizedOffer, Offer};

use super::offer_store::{InsertOutcome, OfferStore, StoreError};
use crate::middleware::auth::CurrentIdentity;

/// A stored offer and whether it was already there.
#[derive(Debug, Clone)]
pub struct Submission {
    pub offer: Offer,
    /// `true` when the idempotency key matched an earlier submission.
    pub deduplicated: bool,
}

/// Insert `offer` as an open offer owned by the caller.
///
/// With a `client_request_id`, an earlier offer from the same couple with
/// that key is returned instead of inserting again; a unique-key conflict
/// on insert resolves the same way. Without a key every call inserts.
/// Store failures are returned unchanged and never retried.
pub async fn submit_offer(
    store: &dyn OfferStore,
    caller: &CurrentIdentity,
    offer: NormalizedOffer,
) -> Result<Submission, StoreError> {
    let couple_id = caller.identity.id;
    let request_id = offer.client_request_id;

    if let Some(key) = request_id {
        if let Some(existing) = store.find_by_request_id(caller, key).await? {
            tracing::info!(offer_id = %existing.id, %couple_id, "Offer already submitted");
            return Ok(Submission {
                offer: existing,
                deduplicated: true,
            });
        }
    }

    let new = NewOffer::open(offer, couple_id);
    match store.insert(caller, &new).await? {
        InsertOutcome::Created(created) => {
            tracing::info!(
                offer_id = %created.id,
                %couple_id,
                offer_cents = ?created.offer_cents,
                "Offer posted",
            );
            Ok(Submission {
                offer: created,
                deduplicated: false,
            })
        }
        InsertOutcome::Duplicate => {
            let existing = match request_id {
                Some(key) => store.find_by_request_id(caller, key).await?,
                None => None,
            };
            let existing = existing.ok_or_else(|| {
                StoreError::Remote("This offer conflicts with one you already posted".into())
            })?;
            tracing::info!(offer_id = %existing.id, %couple_id, "Concurrent duplicate resolved");
            Ok(Submission {
                offer: existing,
                deduplicated: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wedflex_core::identity::Identity;
    use wedflex_core::types::EntityId;
    use wedflex_hosted::HostedClient;

    use super::*;
    use crate::middleware::auth::Credential;
    use crate::services::offer_store::{HostedOfferStore, MemoryOfferStore};

    fn caller() -> CurrentIdentity {
        CurrentIdentity {
            identity: Identity {
                id: EntityId::new_v4(),
                email: None,
            },
            credential: Credential::bearer("t"),
        }
    }

    fn offer(key: Option<EntityId>) -> NormalizedOffer {
        NormalizedOffer {
            title: "Day-of coordinator".into(),
            category: "Day-of Coordination".into(),
            location: "Austin, TX".into(),
            service_date: None,
            event_at: None,
            guest_count: Some(80),
            details: None,
            inspiration_link: None,
            inspiration_images: None,
            offer_cents: Some(30_000),
            accepted_terms: true,
            client_request_id: key,
        }
    }

    #[tokio::test]
    async fn owner_and_status_are_set() {
        let store = MemoryOfferStore::new();
        let pat = caller();
        let submitted = submit_offer(&store, &pat, offer(None)).await.unwrap();
        assert_eq!(submitted.offer.couple_id, pat.identity.id);
        assert_eq!(submitted.offer.status, "open");
        assert!(!submitted.deduplicated);
    }

    #[tokio::test]
    async fn same_key_returns_same_offer() {
        let store = MemoryOfferStore::new();
        let pat = caller();
        let key = EntityId::new_v4();
        let first = submit_offer(&store, &pat, offer(Some(key))).await.unwrap();
        let second = submit_offer(&store, &pat, offer(Some(key))).await.unwrap();
        assert_eq!(first.offer.id, second.offer.id);
        assert!(second.deduplicated);
        assert_eq!(store.len().await, 1);
    }

    /// Hosted backend whose insert always fails with the given PostgREST error.
    async fn rejecting_backend(body: serde_json::Value) -> HostedOfferStore {
        use axum::routing::post;
        use axum::{http::StatusCode, Json, Router};

        let app = Router::new().route(
            "/rest/v1/service_requests",
            post(move || {
                let body = body.clone();
                async move { (StatusCode::CONFLICT, Json(body)) }
            })
                .get(|| async { Json(serde_json::json!([])) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        HostedOfferStore::new(HostedClient::new(&format!("http://{addr}"), "anon"))
    }

    #[tokio::test]
    async fn foreign_key_conflict_is_not_a_duplicate() {
        let store = rejecting_backend(serde_json::json!({
            "code": "23503",
            "message": "insert or update on table \"service_requests\" violates foreign key constraint \"service_requests_couple_id_fkey\"",
        }))
        .await;
        let pat = caller();

        let err = submit_offer(&store, &pat, offer(Some(EntityId::new_v4())))
            .await
            .unwrap_err();
        assert_matches!(&err, StoreError::Remote(_));
        assert!(err.to_string().contains("foreign key"), "{err}");
    }

    #[tokio::test]
    async fn unique_conflict_without_key_is_surfaced() {
        let store = rejecting_backend(serde_json::json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"service_requests_pkey\"",
        }))
        .await;

        let err = submit_offer(&store, &caller(), offer(None)).await.unwrap_err();
        assert!(err.to_string().starts_with("duplicate key value"), "{err}");
    }

    #[tokio::test]
    async fn no_key_means_no_dedup() {
        let store = MemoryOfferStore::new();
        let pat = caller();
        let first = submit_offer(&store, &pat, offer(None)).await.unwrap();
        let second = submit_offer(&store, &pat, offer(None)).await.unwrap();
        assert_ne!(first.offer.id, second.offer.id);
        assert_eq!(store.len().await, 2);
    }
}
