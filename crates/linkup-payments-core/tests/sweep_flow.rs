//! Boost expiry sweep

mod common;

use chrono::{DateTime, Duration, Utc};

use common::Fixture;
use linkup_db::EventRepository;
use linkup_payments_core::{ExpirySweep, SweepReport};
use linkup_types::{
    Event, EventVisibility, PromotionKind, SponsorStatus, Sponsorship, SponsorshipId, User,
};

fn approved(
    fx: &Fixture,
    host: &User,
    event: &Event,
    kind: PromotionKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Sponsorship {
    let package = fx.add_package(kind, 1_999, 3);
    let sponsorship = Sponsorship {
        id: SponsorshipId::new(),
        event_id: event.id,
        user_id: host.id,
        package_id: package.id,
        payment_id: None,
        kind,
        status: SponsorStatus::Approved,
        amount_cents: 1_999,
        currency: Some("usd".into()),
        start_date: Some(start),
        end_date: Some(end),
        created_at: start,
    };
    fx.store.insert_sponsorship(sponsorship.clone());
    sponsorship
}

#[tokio::test]
async fn test_lapsed_boost_expires_and_unboosts() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    fx.ledger.events.set_boosted(event.id, true).await.unwrap();

    let now = Utc::now();
    let lapsed = approved(
        &fx,
        &host,
        &event,
        PromotionKind::Boosted,
        now - Duration::days(3),
        now - Duration::minutes(1),
    );

    let report = ExpirySweep::new(fx.ledger.clone()).run_once(now).await.unwrap();

    assert_eq!(report, SweepReport { expired: 1, unboosted: 1 });
    assert_eq!(fx.store.sponsorship(lapsed.id).unwrap().status, SponsorStatus::Expired);
    assert!(!fx.store.event(event.id).unwrap().boosted);
}

#[tokio::test]
async fn test_window_ending_exactly_now_is_lapsed() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let now = Utc::now();
    let boost = approved(&fx, &host, &event, PromotionKind::Boosted, now - Duration::days(1), now);

    ExpirySweep::new(fx.ledger.clone()).run_once(now).await.unwrap();
    assert_eq!(fx.store.sponsorship(boost.id).unwrap().status, SponsorStatus::Expired);
}

#[tokio::test]
async fn test_running_boost_keeps_event_boosted() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    fx.ledger.events.set_boosted(event.id, true).await.unwrap();

    let now = Utc::now();
    let old = approved(
        &fx,
        &host,
        &event,
        PromotionKind::Boosted,
        now - Duration::days(6),
        now - Duration::days(3),
    );
    let current = approved(
        &fx,
        &host,
        &event,
        PromotionKind::Boosted,
        now - Duration::days(1),
        now + Duration::days(2),
    );

    let report = ExpirySweep::new(fx.ledger.clone()).run_once(now).await.unwrap();

    assert_eq!(report, SweepReport { expired: 1, unboosted: 0 });
    assert_eq!(fx.store.sponsorship(old.id).unwrap().status, SponsorStatus::Expired);
    assert_eq!(fx.store.sponsorship(current.id).unwrap().status, SponsorStatus::Approved);
    assert!(fx.store.event(event.id).unwrap().boosted);
}

#[tokio::test]
async fn test_sponsored_windows_are_not_swept() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let now = Utc::now();
    let sponsored = approved(
        &fx,
        &host,
        &event,
        PromotionKind::Sponsored,
        now - Duration::days(10),
        now - Duration::days(3),
    );

    let report = ExpirySweep::new(fx.ledger.clone()).run_once(now).await.unwrap();

    assert_eq!(report, SweepReport::default());
    assert_eq!(
        fx.store.sponsorship(sponsored.id).unwrap().status,
        SponsorStatus::Approved
    );
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    fx.ledger.events.set_boosted(event.id, true).await.unwrap();
    let now = Utc::now();
    approved(
        &fx,
        &host,
        &event,
        PromotionKind::Boosted,
        now - Duration::days(4),
        now - Duration::days(1),
    );

    let sweep = ExpirySweep::new(fx.ledger.clone());
    sweep.run_once(now).await.unwrap();
    let second = sweep.run_once(now).await.unwrap();

    assert_eq!(second, SweepReport::default());
}

#[tokio::test]
async fn test_many_lapsed_boosts_on_one_event() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let other = fx.add_event(&host, 2_500, EventVisibility::Public);
    fx.ledger.events.set_boosted(event.id, true).await.unwrap();
    fx.ledger.events.set_boosted(other.id, true).await.unwrap();

    let now = Utc::now();
    for days in [2, 3] {
        approved(
            &fx,
            &host,
            &event,
            PromotionKind::Boosted,
            now - Duration::days(days + 3),
            now - Duration::days(days),
        );
    }

    let report = ExpirySweep::new(fx.ledger.clone()).run_once(now).await.unwrap();

    assert_eq!(report, SweepReport { expired: 2, unboosted: 1 });
    assert!(!fx.store.event(event.id).unwrap().boosted);
    assert!(fx.store.event(other.id).unwrap().boosted);
}
