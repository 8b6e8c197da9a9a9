//! Server-held offer wizards.
//!
//! A draft starts anonymous and is claimed by the first signed-in caller
//! that touches it. From then on only that identity may read or change it.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use wedflex_core::error::CoreError;
use wedflex_core::types::{EntityId, Timestamp};
use wedflex_core::wizard::{FlowVariant, OfferWizard};

const ENTITY: &str = "Offer draft";

#[derive(Debug, Clone)]
struct DraftEntry {
    wizard: OfferWizard,
    owner: Option<EntityId>,
    updated_at: Timestamp,
}

/// A draft as handed to handlers.
#[derive(Debug, Clone)]
pub struct DraftSnapshot {
    pub id: EntityId,
    pub wizard: OfferWizard,
    pub owner: Option<EntityId>,
    pub updated_at: Timestamp,
}

/// In-memory map of draft id to wizard.
#[derive(Default)]
pub struct DraftStore {
    drafts: RwLock<HashMap<EntityId, DraftEntry>>,
}

fn not_found(id: EntityId) -> CoreError {
    CoreError::NotFound {
        entity: ENTITY,
        id: id.to_string(),
    }
}

/// Check `caller` may use a draft owned by `owner`, claiming it if unowned.
fn authorize(entry: &mut DraftEntry, caller: Option<EntityId>) -> Result<(), CoreError> {
    match (entry.owner, caller) {
        (None, Some(caller)) => {
            entry.owner = Some(caller);
            Ok(())
        }
        (None, None) => Ok(()),
        (Some(owner), Some(caller)) if owner == caller => Ok(()),
        (Some(_), _) => Err(CoreError::Forbidden(
            "This offer draft belongs to another account".into(),
        )),
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, variant: FlowVariant, owner: Option<EntityId>) -> DraftSnapshot {
        let id = EntityId::new_v4();
        let entry = DraftEntry {
            wizard: OfferWizard::new(variant),
            owner,
            updated_at: Utc::now(),
        };
        let snapshot = DraftSnapshot {
            id,
            wizard: entry.wizard.clone(),
            owner,
            updated_at: entry.updated_at,
        };
        self.drafts.write().await.insert(id, entry);
        snapshot
    }

    pub async fn get(
        &self,
        id: EntityId,
        caller: Option<EntityId>,
    ) -> Result<DraftSnapshot, CoreError> {
        self.update(id, caller, |_| Ok(())).await.map(|(snapshot, ())| snapshot)
    }

    /// Run `f` against the draft under the write lock.
    ///
    /// Changes made by `f` are kept even when it returns an error, so a
    /// failed step leaves the entered values in place.
    pub async fn update<T>(
        &self,
        id: EntityId,
        caller: Option<EntityId>,
        f: impl FnOnce(&mut OfferWizard) -> Result<T, CoreError>,
    ) -> Result<(DraftSnapshot, T), CoreError> {
        let mut drafts = self.drafts.write().await;
        let entry = drafts.get_mut(&id).ok_or_else(|| not_found(id))?;
        authorize(entry, caller)?;
        entry.updated_at = Utc::now();
        let value = f(&mut entry.wizard)?;
        Ok((
            DraftSnapshot {
                id,
                wizard: entry.wizard.clone(),
                owner: entry.owner,
                updated_at: entry.updated_at,
            },
            value,
        ))
    }

    /// Discard a draft.
    pub async fn remove(&self, id: EntityId, caller: Option<EntityId>) -> Result<(), CoreError> {
        let mut drafts = self.drafts.write().await;
        let entry = drafts.get_mut(&id).ok_or_else(|| not_found(id))?;
        authorize(entry, caller)?;
        drafts.remove(&id);
        Ok(())
    }

    /// Drop drafts untouched for longer than `ttl_mins`. Returns how many.
    pub async fn sweep_idle(&self, ttl_mins: i64) -> usize {
        let cutoff = Utc::now() - Duration::minutes(ttl_mins);
        let mut drafts = self.drafts.write().await;
        let before = drafts.len();
        drafts.retain(|_, entry| entry.updated_at >= cutoff);
        before - drafts.len()
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drafts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wedflex_core::wizard::{DraftPatch, WizardStep};

    use super::*;

    #[tokio::test]
    async fn anonymous_draft_is_claimed_by_first_signed_in_caller() {
        let store = DraftStore::new();
        let draft = store.create(FlowVariant::PostOffer, None).await;
        let pat = EntityId::new_v4();
        let sam = EntityId::new_v4();

        assert!(store.get(draft.id, None).await.is_ok());
        assert_eq!(store.get(draft.id, Some(pat)).await.unwrap().owner, Some(pat));
        assert_matches!(store.get(draft.id, Some(sam)).await, Err(CoreError::Forbidden(_)));
        assert_matches!(store.get(draft.id, None).await, Err(CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn failed_step_keeps_entered_values() {
        let store = DraftStore::new();
        let draft = store.create(FlowVariant::PostOffer, None).await;
        let result = store
            .update(draft.id, None, |wizard| {
                wizard.update(DraftPatch {
                    title: Some("Need a DJ".into()),
                    ..DraftPatch::default()
                });
                wizard.advance(false)
            })
            .await;
        assert_matches!(result, Err(CoreError::Validation(_)));

        let after = store.get(draft.id, None).await.unwrap();
        assert_eq!(after.wizard.draft.title, "Need a DJ");
        assert_eq!(after.wizard.step, WizardStep::EventBasics);
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_drafts() {
        let store = DraftStore::new();
        store.create(FlowVariant::PostOffer, None).await;
        assert_eq!(store.sweep_idle(60).await, 0);
        assert_eq!(store.sweep_idle(-1).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn removed_drafts_are_gone() {
        let store = DraftStore::new();
        let draft = store.create(FlowVariant::FirstOffer, None).await;
        store.remove(draft.id, None).await.unwrap();
        assert_matches!(store.get(draft.id, None).await, Err(CoreError::NotFound { .. }));
    }
}
