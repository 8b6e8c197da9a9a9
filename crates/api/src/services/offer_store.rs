//! Where offers are persisted.
//!
//! All reads are scoped to the calling couple. The hosted store forwards
//! the caller's credential and lets the backend's row-level security do the
//! scoping as well.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use wedflex_core::offer::{NewOffer, Offer};
use wedflex_core::types::EntityId;
use wedflex_db::repositories::OfferRepo;
use wedflex_db::DbPool;
use wedflex_hosted::{HostedClient, HostedError};

use crate::middleware::auth::CurrentIdentity;

/// PostgreSQL unique-violation code, as reported through PostgREST.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The remote store refused or failed; message shown verbatim.
    #[error("{0}")]
    Remote(String),
}

impl From<HostedError> for StoreError {
    fn from(err: HostedError) -> Self {
        StoreError::Remote(err.user_message())
    }
}

/// Result of a single insert attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(Offer),
    /// The couple already has an offer with this idempotency key.
    Duplicate,
}

#[async_trait]
pub trait OfferStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn insert(
        &self,
        caller: &CurrentIdentity,
        offer: &NewOffer,
    ) -> Result<InsertOutcome, StoreError>;

    async fn find_by_id(
        &self,
        caller: &CurrentIdentity,
        id: EntityId,
    ) -> Result<Option<Offer>, StoreError>;

    async fn find_by_request_id(
        &self,
        caller: &CurrentIdentity,
        request_id: EntityId,
    ) -> Result<Option<Offer>, StoreError>;

    /// The caller's offers, newest first.
    async fn list_for_couple(
        &self,
        caller: &CurrentIdentity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, StoreError>;

    /// Is the store reachable?
    async fn ping(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Hosted
// ---------------------------------------------------------------------------

pub struct HostedOfferStore {
    client: HostedClient,
}

impl HostedOfferStore {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OfferStore for HostedOfferStore {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn insert(
        &self,
        caller: &CurrentIdentity,
        offer: &NewOffer,
    ) -> Result<InsertOutcome, StoreError> {
        match self
            .client
            .insert_offer(caller.credential.as_str(), offer)
            .await
        {
            Ok(row) => Ok(InsertOutcome::Created(row)),
            // Only the idempotency key is unique per couple; any other 409
            // (foreign key, check) is a real rejection.
            Err(e)
                if offer.offer.client_request_id.is_some()
                    && e.pg_code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(
        &self,
        caller: &CurrentIdentity,
        id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        Ok(self
            .client
            .find_offer(caller.credential.as_str(), caller.identity.id, id)
            .await?)
    }

    async fn find_by_request_id(
        &self,
        caller: &CurrentIdentity,
        request_id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        Ok(self
            .client
            .find_offer_by_request_id(caller.credential.as_str(), caller.identity.id, request_id)
            .await?)
    }

    async fn list_for_couple(
        &self,
        caller: &CurrentIdentity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, StoreError> {
        Ok(self
            .client
            .list_offers(caller.credential.as_str(), caller.identity.id, limit, offset)
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.client.ping_rest().await?)
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgOfferStore {
    pool: DbPool,
}

impl PgOfferStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfferStore for PgOfferStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(
        &self,
        _caller: &CurrentIdentity,
        offer: &NewOffer,
    ) -> Result<InsertOutcome, StoreError> {
        Ok(match OfferRepo::insert(&self.pool, offer).await? {
            Some(row) => InsertOutcome::Created(row.into()),
            None => InsertOutcome::Duplicate,
        })
    }

    async fn find_by_id(
        &self,
        caller: &CurrentIdentity,
        id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        let row = OfferRepo::find_by_id(&self.pool, caller.identity.id, id).await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_request_id(
        &self,
        caller: &CurrentIdentity,
        request_id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        let row = OfferRepo::find_by_request_id(&self.pool, caller.identity.id, request_id).await?;
        Ok(row.map(Into::into))
    }

    async fn list_for_couple(
        &self,
        caller: &CurrentIdentity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, StoreError> {
        let rows = OfferRepo::list_for_couple(&self.pool, caller.identity.id, limit, offset).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(wedflex_db::health_check(&self.pool).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local offers, oldest first.
#[derive(Default)]
pub struct MemoryOfferStore {
    offers: RwLock<Vec<Offer>>,
}

impl MemoryOfferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.offers.read().await.len()
    }
}

#[async_trait]
impl OfferStore for MemoryOfferStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        _caller: &CurrentIdentity,
        offer: &NewOffer,
    ) -> Result<InsertOutcome, StoreError> {
        let mut offers = self.offers.write().await;
        if let Some(key) = offer.offer.client_request_id {
            let taken = offers
                .iter()
                .any(|o| o.couple_id == offer.couple_id && o.client_request_id == Some(key));
            if taken {
                return Ok(InsertOutcome::Duplicate);
            }
        }
        let stored = Offer::from_new(EntityId::new_v4(), offer.clone(), Utc::now());
        offers.push(stored.clone());
        Ok(InsertOutcome::Created(stored))
    }

    async fn find_by_id(
        &self,
        caller: &CurrentIdentity,
        id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        let offers = self.offers.read().await;
        Ok(offers
            .iter()
            .find(|o| o.id == id && o.couple_id == caller.identity.id)
            .cloned())
    }

    async fn find_by_request_id(
        &self,
        caller: &CurrentIdentity,
        request_id: EntityId,
    ) -> Result<Option<Offer>, StoreError> {
        let offers = self.offers.read().await;
        Ok(offers
            .iter()
            .find(|o| o.couple_id == caller.identity.id && o.client_request_id == Some(request_id))
            .cloned())
    }

    async fn list_for_couple(
        &self,
        caller: &CurrentIdentity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, StoreError> {
        let offers = self.offers.read().await;
        Ok(offers
            .iter()
            .rev()
            .filter(|o| o.couple_id == caller.identity.id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wedflex_core::identity::Identity;
    use wedflex_core::offer::NormalizedOffer;

    use super::*;
    use crate::middleware::auth::Credential;

    fn caller() -> CurrentIdentity {
        CurrentIdentity {
            identity: Identity {
                id: EntityId::new_v4(),
                email: Some("pat@example.com".into()),
            },
            credential: Credential::bearer("t"),
        }
    }

    fn offer(title: &str, key: Option<EntityId>) -> NormalizedOffer {
        NormalizedOffer {
            title: title.into(),
            category: "Music & DJ".into(),
            location: "Nashville, TN".into(),
            service_date: None,
            event_at: None,
            guest_count: None,
            details: None,
            inspiration_link: None,
            inspiration_images: None,
            offer_cents: Some(50_000),
            accepted_terms: true,
            client_request_id: key,
        }
    }

    #[tokio::test]
    async fn memory_store_rejects_reused_key_per_couple() {
        let store = MemoryOfferStore::new();
        let pat = caller();
        let key = EntityId::new_v4();
        let new = NewOffer::open(offer("DJ", Some(key)), pat.identity.id);

        assert_matches!(store.insert(&pat, &new).await.unwrap(), InsertOutcome::Created(_));
        assert_eq!(store.insert(&pat, &new).await.unwrap(), InsertOutcome::Duplicate);

        let sam = caller();
        let theirs = NewOffer::open(offer("DJ", Some(key)), sam.identity.id);
        assert_matches!(store.insert(&sam, &theirs).await.unwrap(), InsertOutcome::Created(_));
    }

    #[tokio::test]
    async fn memory_store_reads_are_owner_scoped_and_newest_first() {
        let store = MemoryOfferStore::new();
        let pat = caller();
        let sam = caller();
        for title in ["first", "second"] {
            let new = NewOffer::open(offer(title, None), pat.identity.id);
            store.insert(&pat, &new).await.unwrap();
        }
        let InsertOutcome::Created(other) = store
            .insert(&sam, &NewOffer::open(offer("theirs", None), sam.identity.id))
            .await
            .unwrap()
        else {
            panic!("expected insert");
        };

        let listed = store.list_for_couple(&pat, 25, 0).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
        assert_eq!(store.find_by_id(&pat, other.id).await.unwrap(), None);
        assert_eq!(store.list_for_couple(&pat, 1, 1).await.unwrap().len(), 1);
    }
}
