//! End-to-end donation flow tests against a real on-disk SQLite database.
//!
//! On-disk (not `:memory:`) so the concurrency tests exercise multiple pool
//! connections contending on the writer lock, the same way deployed
//! verifications do.

use sqlx::SqlitePool;
use tempfile::TempDir;

use portal::amount::Amount;
use portal::db;
use portal::errors::PortalError;
use portal::gateway::SimulatedGateway;
use portal::intake::{self, IntakeRequest, ANONYMOUS_DONOR};
use portal::models::{CampaignStatus, NewCampaign, NewDonation, PaymentMethod};
use portal::verify;

async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite:{}/portal.db", dir.path().display());
    let pool = db::init_pool(&url, 5).await.expect("pool");
    (dir, pool)
}

async fn seed_campaign(pool: &SqlitePool, target_cents: i64) -> i64 {
    db::create_campaign(
        pool,
        &NewCampaign {
            title: "Flood Relief".to_string(),
            description: "Emergency flood relief fund".to_string(),
            target_amount: target_cents,
            status: CampaignStatus::Active,
            end_date: None,
            created_at: 1_700_000_000,
        },
    )
    .await
    .expect("campaign")
    .id
}

fn guest_request(campaign_id: i64, amount: f64) -> IntakeRequest {
    IntakeRequest {
        campaign_id,
        amount: Amount::from_float(amount),
        payment_method: PaymentMethod::Qr,
        donor_name: "Aisyah".to_string(),
        donor_email: "aisyah@example.com".to_string(),
        donor_phone: "0123456789".to_string(),
        anonymous: false,
        user_id: 0,
    }
}

async fn donate_and_verify(pool: &SqlitePool, campaign_id: i64, amount: f64) -> i64 {
    let outcome = intake::create_donation(pool, None, guest_request(campaign_id, amount))
        .await
        .expect("intake");
    verify::verify_donation(pool, &SimulatedGateway, outcome.donation.id)
        .await
        .expect("verify");
    outcome.donation.id
}

// ─────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_intake_creates_pending_donation_with_cleared_identity() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;
    donate_and_verify(&pool, campaign_id, 200.0).await;

    let mut req = guest_request(campaign_id, 50.0);
    req.anonymous = true;
    let outcome = intake::create_donation(&pool, None, req).await.unwrap();

    assert!(outcome.donation.is_pending());
    assert_eq!(outcome.donation.donor_name, ANONYMOUS_DONOR);
    assert_eq!(outcome.donation.donor_email, "");
    assert_eq!(outcome.donation.donor_phone, "");
    assert!(outcome.donation.payment_date.is_none());
    assert!(outcome.donation.transaction_id.starts_with("TXN-"));
    assert!(!outcome.qr_payload.is_empty());

    // Intake must not touch the campaign aggregates.
    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 20_000);
    assert_eq!(campaign.donors_count, 1);
}

#[tokio::test]
async fn intake_rejects_unknown_campaign_without_creating_a_row() {
    let (_dir, pool) = test_pool().await;

    let err = intake::create_donation(&pool, None, guest_request(999_999, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound("campaign")));
    assert!(db::get_donation(&pool, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn intake_rejects_non_positive_amounts() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    for amount in [0.0, -5.0] {
        let err = intake::create_donation(&pool, None, guest_request(campaign_id, amount))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }
    assert!(db::get_donation(&pool, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn intake_rejects_unknown_user_id() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let mut req = guest_request(campaign_id, 10.0);
    req.user_id = 4242;
    let err = intake::create_donation(&pool, None, req).await.unwrap_err();
    assert!(matches!(err, PortalError::InvalidInput(_)));
}

#[tokio::test]
async fn intake_backfills_identity_from_registered_user() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;
    let user = db::insert_user(&pool, "Farid", "farid@example.com", "0198765432", None)
        .await
        .unwrap();

    let mut req = guest_request(campaign_id, 25.0);
    req.donor_name.clear();
    req.donor_email.clear();
    req.donor_phone.clear();
    req.user_id = user.id;

    let outcome = intake::create_donation(&pool, None, req).await.unwrap();
    assert_eq!(outcome.donation.user_id, user.id);
    assert_eq!(outcome.donation.donor_name, "Farid");
    assert_eq!(outcome.donation.donor_email, "farid@example.com");
    assert_eq!(outcome.donation.donor_phone, "0198765432");
}

#[tokio::test]
async fn transaction_ids_are_unique_across_intakes() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let a = intake::create_donation(&pool, None, guest_request(campaign_id, 10.0))
        .await
        .unwrap();
    let b = intake::create_donation(&pool, None, guest_request(campaign_id, 10.0))
        .await
        .unwrap();
    assert_ne!(a.donation.transaction_id, b.donation.transaction_id);
}

// ─────────────────────────────────────────────────────────
// Verification
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn verification_applies_amount_and_recomputes_progress() {
    let (_dir, pool) = test_pool().await;
    // Target 1000.00, seeded to 200.00 through a verified donation.
    let campaign_id = seed_campaign(&pool, 100_000).await;
    donate_and_verify(&pool, campaign_id, 200.0).await;

    let mut req = guest_request(campaign_id, 50.0);
    req.anonymous = true;
    let outcome = intake::create_donation(&pool, None, req).await.unwrap();
    let verified = verify::verify_donation(&pool, &SimulatedGateway, outcome.donation.id)
        .await
        .unwrap();

    assert_eq!(verified.donation.status, "completed");
    assert!(verified.donation.payment_date.is_some());
    assert_eq!(verified.campaign_title, "Flood Relief");

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 25_000);
    assert_eq!(campaign.donors_count, 2);
    assert_eq!(campaign.progress_percentage, 25.0);
}

#[tokio::test]
async fn second_verification_is_rejected_and_changes_nothing() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let outcome = intake::create_donation(&pool, None, guest_request(campaign_id, 50.0))
        .await
        .unwrap();
    verify::verify_donation(&pool, &SimulatedGateway, outcome.donation.id)
        .await
        .unwrap();

    let err = verify::verify_donation(&pool, &SimulatedGateway, outcome.donation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::AlreadyProcessed(_)));

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 5_000);
    assert_eq!(campaign.donors_count, 1);
}

#[tokio::test]
async fn verifying_a_nonexistent_donation_changes_nothing() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let err = verify::verify_donation(&pool, &SimulatedGateway, 999_999)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound("donation")));

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 0);
    assert_eq!(campaign.donors_count, 0);
}

#[tokio::test]
async fn registered_donor_lifetime_total_accumulates() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;
    let user = db::insert_user(&pool, "Farid", "farid@example.com", "", None)
        .await
        .unwrap();

    for amount in [25.0, 75.0] {
        let mut req = guest_request(campaign_id, amount);
        req.user_id = user.id;
        let outcome = intake::create_donation(&pool, None, req).await.unwrap();
        verify::verify_donation(&pool, &SimulatedGateway, outcome.donation.id)
            .await
            .unwrap();
    }

    let user = db::find_user(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.total_donated, 10_000);
}

#[tokio::test]
async fn card_donations_are_declined_and_stay_pending() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let mut req = guest_request(campaign_id, 50.0);
    req.payment_method = PaymentMethod::Card;
    let outcome = intake::create_donation(&pool, None, req).await.unwrap();

    let err = verify::verify_donation(&pool, &SimulatedGateway, outcome.donation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::GatewayDeclined(_)));

    let donation = db::get_donation(&pool, outcome.donation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(donation.is_pending());

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 0);
}

#[tokio::test]
async fn failed_donor_update_rolls_back_the_whole_verification() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    // Inserted below the intake layer: attribution points at a user row
    // that does not exist, so the donor-total step must abort the
    // transaction.
    let donation = db::insert_donation(
        &pool,
        &NewDonation {
            user_id: 4242,
            campaign_id,
            amount: 1_000,
            transaction_id: "TXN-20250101000000-orphan01".to_string(),
            payment_method: PaymentMethod::Qr,
            donor_name: "Ghost".to_string(),
            donor_email: String::new(),
            donor_phone: String::new(),
            is_anonymous: false,
            created_at: 1_700_000_000,
        },
    )
    .await
    .unwrap();

    let err = verify::verify_donation(&pool, &SimulatedGateway, donation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound("user")));

    // No partial effect: donation still pending, campaign untouched.
    let donation = db::get_donation(&pool, donation.id).await.unwrap().unwrap();
    assert!(donation.is_pending());
    assert!(donation.payment_date.is_none());

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 0);
    assert_eq!(campaign.donors_count, 0);
    assert_eq!(campaign.progress_percentage, 0.0);
}

#[tokio::test]
async fn overfunded_campaign_reports_progress_above_hundred() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    donate_and_verify(&pool, campaign_id, 900.0).await;
    donate_and_verify(&pool, campaign_id, 200.0).await;

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 110_000);
    assert_eq!(campaign.progress_percentage, 110.0);
}

// ─────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_verifications_on_one_campaign_do_not_lose_updates() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let a = intake::create_donation(&pool, None, guest_request(campaign_id, 30.0))
        .await
        .unwrap()
        .donation
        .id;
    let b = intake::create_donation(&pool, None, guest_request(campaign_id, 70.0))
        .await
        .unwrap()
        .donation
        .id;

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let task_a =
        tokio::spawn(async move { verify::verify_donation(&pool_a, &SimulatedGateway, a).await });
    let task_b =
        tokio::spawn(async move { verify::verify_donation(&pool_b, &SimulatedGateway, b).await });

    task_a.await.unwrap().unwrap();
    task_b.await.unwrap().unwrap();

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 10_000);
    assert_eq!(campaign.donors_count, 2);
    assert_eq!(campaign.progress_percentage, 10.0);
}

#[tokio::test]
async fn racing_verifications_of_one_donation_complete_it_exactly_once() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    let id = intake::create_donation(&pool, None, guest_request(campaign_id, 50.0))
        .await
        .unwrap()
        .donation
        .id;

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let task_a =
        tokio::spawn(async move { verify::verify_donation(&pool_a, &SimulatedGateway, id).await });
    let task_b =
        tokio::spawn(async move { verify::verify_donation(&pool_b, &SimulatedGateway, id).await });

    let results = [task_a.await.unwrap(), task_b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, PortalError::AlreadyProcessed(_)));
        }
    }

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, 5_000);
    assert_eq!(campaign.donors_count, 1);
}

// ─────────────────────────────────────────────────────────
// Sum consistency
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn current_amount_equals_sum_of_completed_donations() {
    let (_dir, pool) = test_pool().await;
    let campaign_id = seed_campaign(&pool, 100_000).await;

    donate_and_verify(&pool, campaign_id, 12.5).await;
    donate_and_verify(&pool, campaign_id, 7.25).await;
    // Left pending on purpose: must not count.
    intake::create_donation(&pool, None, guest_request(campaign_id, 99.0))
        .await
        .unwrap();

    let (sum,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0) FROM donations \
         WHERE campaign_id = ?1 AND status = 'completed'",
    )
    .bind(campaign_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let campaign = db::get_campaign(&pool, campaign_id).await.unwrap().unwrap();
    assert_eq!(campaign.current_amount, sum);
    assert_eq!(campaign.current_amount, 1_975);
    assert_eq!(campaign.donors_count, 2);

    let wall = db::list_campaign_donations(&pool, campaign_id, 50).await.unwrap();
    assert_eq!(wall.len(), 2);
}
