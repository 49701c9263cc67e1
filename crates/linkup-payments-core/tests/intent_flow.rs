//! Intent builder flows over the in-memory ledger

mod common;

use chrono::{Duration, Utc};

use common::Fixture;
use linkup_db::{BookingRepository, EventRepository, PaymentRepository};
use linkup_payments_core::PaymentsError;
use linkup_types::{
    Booking, BookingId, BookingStatus, EventId, EventVisibility, JoinApproval, PackageId,
    PaymentOwner, PaymentStatus, PromotionKind, SponsorStatus, Sponsorship, SponsorshipId,
};

// =============================================================================
// Bookings
// =============================================================================

#[tokio::test]
async fn test_booking_intent_creates_pending_records() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 10_000, EventVisibility::Public);

    let result = fx
        .builder()
        .create_booking_intent(guest.id, event.id)
        .await
        .unwrap();

    let booking = fx.store.booking(result.booking_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_id, Some(result.payment_id));

    let payment = fx.store.payment(result.payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.owner, PaymentOwner::Booking(result.booking_id));
    assert_eq!(payment.amount_cents, 10_000);
    assert!(payment.transaction_id.starts_with("tran_"));

    let (key, request) = fx.provider.last_request().unwrap();
    assert_eq!(key, format!("booking_intent_{}", result.booking_id));
    assert_eq!(request.amount_cents, 10_000);
    assert_eq!(request.currency, "usd");
    assert_eq!(request.receipt_email, guest.email);

    let transfer = request.transfer.unwrap();
    assert_eq!(transfer.destination, "acct_host_1");
    assert_eq!(transfer.amount_cents, 9_680);
    assert_eq!(result.split.fee_cents, 320);

    assert_eq!(request.metadata["payment"], result.payment_id.to_string());
    assert_eq!(request.metadata["booking"], result.booking_id.to_string());
    assert_eq!(request.metadata["transaction_id"], payment.transaction_id);
}

#[tokio::test]
async fn test_repeated_booking_requests_converge() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let builder = fx.builder();

    let first = builder.create_booking_intent(guest.id, event.id).await.unwrap();
    let second = builder.create_booking_intent(guest.id, event.id).await.unwrap();

    assert_eq!(first.booking_id, second.booking_id);
    assert_eq!(first.payment_id, second.payment_id);
    assert_eq!(first.intent.id, second.intent.id);
    assert_eq!(fx.store.all_bookings().len(), 1);
    assert_eq!(fx.store.all_payments().len(), 1);

    let keys: Vec<String> = fx.provider.requests().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
    assert_eq!(fx.provider.intent_count(), 1);
}

#[tokio::test]
async fn test_booking_after_failed_payment_gets_fresh_payment() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let builder = fx.builder();

    let first = builder.create_booking_intent(guest.id, event.id).await.unwrap();
    fx.ledger
        .payments
        .settle(
            first.payment_id,
            linkup_db::PaymentSettlement {
                status: PaymentStatus::Failed,
                intent_id: "pi_test_1".into(),
                payment_method_id: None,
                receipt_email: None,
                currency: None,
            },
        )
        .await
        .unwrap();

    let second = builder.create_booking_intent(guest.id, event.id).await.unwrap();
    assert_eq!(first.booking_id, second.booking_id);
    assert_ne!(first.payment_id, second.payment_id);
    assert_eq!(
        fx.store.booking(second.booking_id).unwrap().payment_id,
        Some(second.payment_id)
    );
}

#[tokio::test]
async fn test_booking_rejects_missing_event() {
    let fx = Fixture::new();
    let guest = fx.guest();

    let err = fx
        .builder()
        .create_booking_intent(guest.id, EventId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.provider.calls(), 0);
}

#[tokio::test]
async fn test_booking_requires_verified_user() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.add_user(false, None);
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);

    let err = fx
        .builder()
        .create_booking_intent(guest.id, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::Forbidden(_)));
    assert!(fx.store.all_bookings().is_empty());
}

#[tokio::test]
async fn test_booking_requires_host_payouts() {
    let fx = Fixture::new();
    let host = fx.add_user(true, None);
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);

    let err = fx
        .builder()
        .create_booking_intent(guest.id, event.id)
        .await
        .unwrap_err();
    match err {
        PaymentsError::Forbidden(msg) => assert_eq!(msg, "Host hasn't registered payouts!"),
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn test_private_event_needs_approved_join_request() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Private);
    let builder = fx.builder();

    fx.ledger
        .events
        .create_join_request(event.id, guest.id, JoinApproval::Pending)
        .await
        .unwrap();
    let err = builder.create_booking_intent(guest.id, event.id).await.unwrap_err();
    assert!(matches!(err, PaymentsError::Forbidden(_)));

    fx.ledger
        .events
        .create_join_request(event.id, guest.id, JoinApproval::Approved)
        .await
        .unwrap();
    assert!(builder.create_booking_intent(guest.id, event.id).await.is_ok());
}

#[tokio::test]
async fn test_confirmed_booking_conflicts() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);

    fx.store.insert_booking(Booking {
        id: BookingId::new(),
        event_id: event.id,
        user_id: guest.id,
        status: BookingStatus::Confirmed,
        payment_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    });

    let err = fx
        .builder()
        .create_booking_intent(guest.id, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::Conflict(_)));
    assert_eq!(fx.provider.calls(), 0);
}

#[tokio::test]
async fn test_price_below_fees_is_rejected() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let cheap = fx.add_event(&host, 30, EventVisibility::Public);
    let free = fx.add_event(&host, 0, EventVisibility::Public);
    let builder = fx.builder();

    for event in [cheap, free] {
        let err = builder.create_booking_intent(guest.id, event.id).await.unwrap_err();
        assert!(matches!(err, PaymentsError::BadRequest(_)));
    }
    assert!(fx.store.all_bookings().is_empty());
}

#[tokio::test]
async fn test_provider_failure_leaves_pending_records_for_retry() {
    let fx = Fixture::new();
    let host = fx.host();
    let guest = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);

    fx.provider.fail();
    let err = fx
        .builder()
        .create_booking_intent(guest.id, event.id)
        .await
        .unwrap_err();
    assert!(err.is_provider_error());

    let bookings = fx.store.all_bookings();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Pending);
    assert!(fx
        .ledger
        .bookings
        .find_for_user_event(guest.id, event.id, BookingStatus::Pending)
        .await
        .unwrap()
        .is_some());
}

// =============================================================================
// Sponsorships
// =============================================================================

#[tokio::test]
async fn test_sponsorship_intent_has_no_split() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let package = fx.add_package(PromotionKind::Sponsored, 4_999, 7);

    let result = fx
        .builder()
        .create_sponsorship_intent(host.id, event.id, package.id)
        .await
        .unwrap();

    let sponsorship = fx.store.sponsorship(result.sponsorship_id).unwrap();
    assert_eq!(sponsorship.status, SponsorStatus::Pending);
    assert_eq!(sponsorship.kind, PromotionKind::Sponsored);
    assert_eq!(sponsorship.amount_cents, 4_999);
    assert_eq!(sponsorship.payment_id, Some(result.payment_id));

    let (key, request) = fx.provider.last_request().unwrap();
    assert_eq!(key, format!("sponsored_intent_{}", result.sponsorship_id));
    assert!(request.transfer.is_none());
    assert_eq!(request.amount_cents, 4_999);
    assert_eq!(request.description.as_deref(), Some("Event Sponsorship Payment"));
    assert_eq!(request.metadata["sponsored"], result.sponsorship_id.to_string());
    assert_eq!(request.metadata["package"], package.id.to_string());
    assert_eq!(request.metadata["event"], event.id.to_string());
    assert_eq!(request.metadata["payment"], result.payment_id.to_string());
}

#[tokio::test]
async fn test_only_host_may_promote() {
    let fx = Fixture::new();
    let host = fx.host();
    let other = fx.guest();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let package = fx.add_package(PromotionKind::Boosted, 1_999, 3);

    let err = fx
        .builder()
        .create_sponsorship_intent(other.id, event.id, package.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::Forbidden(_)));
}

#[tokio::test]
async fn test_sponsorship_missing_package_or_event() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let package = fx.add_package(PromotionKind::Boosted, 1_999, 3);
    let builder = fx.builder();

    let err = builder
        .create_sponsorship_intent(host.id, event.id, PackageId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::NotFound("package")));

    let err = builder
        .create_sponsorship_intent(host.id, EventId::new(), package.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::NotFound("event")));
}

#[tokio::test]
async fn test_active_sponsorship_of_same_kind_conflicts() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let boost = fx.add_package(PromotionKind::Boosted, 1_999, 3);
    let sponsor = fx.add_package(PromotionKind::Sponsored, 4_999, 7);
    let now = Utc::now();

    fx.store.insert_sponsorship(Sponsorship {
        id: SponsorshipId::new(),
        event_id: event.id,
        user_id: host.id,
        package_id: boost.id,
        payment_id: None,
        kind: PromotionKind::Boosted,
        status: SponsorStatus::Approved,
        amount_cents: 1_999,
        currency: Some("usd".into()),
        start_date: Some(now - Duration::days(1)),
        end_date: Some(now + Duration::days(2)),
        created_at: now - Duration::days(1),
    });

    let builder = fx.builder();
    let err = builder
        .create_sponsorship_intent(host.id, event.id, boost.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentsError::Conflict(_)));

    // A different kind is unaffected
    assert!(builder
        .create_sponsorship_intent(host.id, event.id, sponsor.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_expired_sponsorship_does_not_block() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let boost = fx.add_package(PromotionKind::Boosted, 1_999, 3);
    let now = Utc::now();

    fx.store.insert_sponsorship(Sponsorship {
        id: SponsorshipId::new(),
        event_id: event.id,
        user_id: host.id,
        package_id: boost.id,
        payment_id: None,
        kind: PromotionKind::Boosted,
        status: SponsorStatus::Approved,
        amount_cents: 1_999,
        currency: Some("usd".into()),
        start_date: Some(now - Duration::days(5)),
        end_date: Some(now - Duration::days(2)),
        created_at: now - Duration::days(5),
    });

    assert!(fx
        .builder()
        .create_sponsorship_intent(host.id, event.id, boost.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_pending_sponsorship_is_reused() {
    let fx = Fixture::new();
    let host = fx.host();
    let event = fx.add_event(&host, 2_500, EventVisibility::Public);
    let package = fx.add_package(PromotionKind::Sponsored, 4_999, 7);
    let builder = fx.builder();

    let first = builder
        .create_sponsorship_intent(host.id, event.id, package.id)
        .await
        .unwrap();
    let second = builder
        .create_sponsorship_intent(host.id, event.id, package.id)
        .await
        .unwrap();

    assert_eq!(first.sponsorship_id, second.sponsorship_id);
    assert_eq!(first.payment_id, second.payment_id);
    assert_eq!(fx.store.all_sponsorships().len(), 1);
    assert_eq!(fx.store.all_payments().len(), 1);
    assert_eq!(fx.provider.intent_count(), 1);
}
