//! Repository tests against a live PostgreSQL (`DATABASE_URL`).

use sqlx::PgPool;
use uuid::Uuid;
use wedflex_core::offer::{NewOffer, NormalizedOffer};
use wedflex_db::repositories::{MagicLinkRepo, OfferRepo, SessionRepo, UserRepo};

fn offer(request_id: Option<Uuid>) -> NormalizedOffer {
    NormalizedOffer {
        title: "Bartender for reception".into(),
        category: "Bartending".into(),
        location: "Chicago, IL".into(),
        service_date: None,
        event_at: None,
        guest_count: Some(80),
        details: None,
        inspiration_link: None,
        inspiration_images: Some(vec!["https://cdn.example/a.png".into()]),
        offer_cents: Some(30_000),
        accepted_terms: true,
        client_request_id: request_id,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insert_sets_owner_and_open_status(pool: PgPool) {
    wedflex_db::health_check(&pool).await.unwrap();

    let couple = Uuid::new_v4();
    let row = OfferRepo::insert(&pool, &NewOffer::open(offer(None), couple))
        .await
        .unwrap()
        .expect("insert without a request id never conflicts");
    assert_eq!(row.couple_id, couple);
    assert_eq!(row.status, "open");
    assert_eq!(row.inspiration_images.as_deref().map(<[String]>::len), Some(1));

    let found = OfferRepo::find_by_id(&pool, couple, row.id).await.unwrap();
    assert!(found.is_some());
    let other_couple = OfferRepo::find_by_id(&pool, Uuid::new_v4(), row.id)
        .await
        .unwrap();
    assert!(other_couple.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_request_id_does_not_insert_twice(pool: PgPool) {
    let couple = Uuid::new_v4();
    let key = Some(Uuid::new_v4());

    let first = OfferRepo::insert(&pool, &NewOffer::open(offer(key), couple))
        .await
        .unwrap()
        .unwrap();
    let second = OfferRepo::insert(&pool, &NewOffer::open(offer(key), couple))
        .await
        .unwrap();
    assert!(second.is_none());

    let existing = OfferRepo::find_by_request_id(&pool, couple, key.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(existing.id, first.id);

    // Without a key, identical submissions are separate rows.
    OfferRepo::insert(&pool, &NewOffer::open(offer(None), couple)).await.unwrap();
    OfferRepo::insert(&pool, &NewOffer::open(offer(None), couple)).await.unwrap();
    let all = OfferRepo::list_for_couple(&pool, couple, 10, 0).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn magic_link_is_single_use_and_sessions_rotate(pool: PgPool) {
    use chrono::{Duration, Utc};
    use wedflex_db::models::magic_link::CreateMagicLink;
    use wedflex_db::models::session::CreateSession;

    MagicLinkRepo::create(
        &pool,
        &CreateMagicLink {
            email: "pat@example.com".into(),
            token_hash: "a".repeat(64),
            redirect_to: "http://localhost:3000/auth/callback".into(),
            expires_at: Utc::now() + Duration::minutes(15),
        },
    )
    .await
    .unwrap();

    assert!(MagicLinkRepo::consume(&pool, &"a".repeat(64)).await.unwrap().is_some());
    assert!(MagicLinkRepo::consume(&pool, &"a".repeat(64)).await.unwrap().is_none());

    let user = UserRepo::upsert_signed_in(&pool, "pat@example.com").await.unwrap();
    let again = UserRepo::upsert_signed_in(&pool, "pat@example.com").await.unwrap();
    assert_eq!(user.id, again.id);

    let session = SessionRepo::create(
        &pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: "b".repeat(64),
            expires_at: Utc::now() + Duration::days(7),
        },
    )
    .await
    .unwrap();
    assert!(SessionRepo::revoke(&pool, session.id).await.unwrap());
    assert!(SessionRepo::find_by_refresh_token_hash(&pool, &"b".repeat(64))
        .await
        .unwrap()
        .is_none());
}
