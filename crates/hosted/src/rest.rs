//! Table access through the hosted REST gateway.
//!
//! Row-level security on the backend restricts every read and write to the
//! couple named by the forwarded credential; the explicit `couple_id`
//! filters below only narrow further.

use reqwest::Method;
use wedflex_core::offer::{NewOffer, Offer, OFFERS_TABLE};
use wedflex_core::types::EntityId;

use crate::client::{HostedClient, HostedError};

/// Ask the gateway to echo the written row back.
const PREFER_RETURN: &str = "return=representation";

/// Ask the gateway for a single object rather than an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

fn table_path() -> String {
    format!("/rest/v1/{OFFERS_TABLE}")
}

impl HostedClient {
    /// Insert one offer and return the stored row.
    pub async fn insert_offer(&self, credential: &str, offer: &NewOffer) -> Result<Offer, HostedError> {
        let response = self
            .as_caller(Method::POST, &table_path(), credential)
            .header("Prefer", PREFER_RETURN)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(offer)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// One of the couple's offers by id.
    pub async fn find_offer(
        &self,
        credential: &str,
        couple_id: EntityId,
        id: EntityId,
    ) -> Result<Option<Offer>, HostedError> {
        self.select_one(
            credential,
            &[
                ("id", format!("eq.{id}")),
                ("couple_id", format!("eq.{couple_id}")),
            ],
        )
        .await
    }

    /// The couple's offer created with the given idempotency key.
    pub async fn find_offer_by_request_id(
        &self,
        credential: &str,
        couple_id: EntityId,
        request_id: EntityId,
    ) -> Result<Option<Offer>, HostedError> {
        self.select_one(
            credential,
            &[
                ("couple_id", format!("eq.{couple_id}")),
                ("client_request_id", format!("eq.{request_id}")),
            ],
        )
        .await
    }

    /// The couple's offers, newest first.
    pub async fn list_offers(
        &self,
        credential: &str,
        couple_id: EntityId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, HostedError> {
        let response = self
            .as_caller(Method::GET, &table_path(), credential)
            .query(&[
                ("select", "*".to_string()),
                ("couple_id", format!("eq.{couple_id}")),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Cheap reachability probe of the REST gateway.
    pub async fn ping_rest(&self) -> Result<(), HostedError> {
        let response = self
            .anon(Method::GET, &table_path())
            .query(&[("select", "id"), ("limit", "0")])
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn select_one(
        &self,
        credential: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<Offer>, HostedError> {
        let response = self
            .as_caller(Method::GET, &table_path(), credential)
            .query(&[("select", "*"), ("limit", "1")])
            .query(filters)
            .send()
            .await?;
        let rows: Vec<Offer> = Self::parse_response(response).await?;
        Ok(rows.into_iter().next())
    }
}
