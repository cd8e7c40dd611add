//! Payment verification — the single write site for campaign and donor
//! aggregates.
//!
//! Completing a donation and applying its financial effect is one atomic
//! unit: the status flip, the campaign aggregate update, and the donor
//! lifetime total all commit together or not at all. Re-invoking
//! verification for an already-completed donation is a no-op failure
//! (`AlreadyProcessed`), which makes caller-side retries safe.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::amount::Amount;
use crate::db;
use crate::errors::{PortalError, Result};
use crate::gateway::{Confirmation, PaymentGateway, PaymentIntent};
use crate::models::{DonationRecord, PaymentMethod};

#[derive(Debug)]
pub struct VerifiedDonation {
    pub donation: DonationRecord,
    pub campaign_title: String,
}

/// Transition one pending donation to `completed` and apply its effect.
///
/// Preconditions (donation exists, status is `pending`) are re-checked by
/// the guarded update inside the transaction, so two concurrent calls for
/// the same donation resolve to exactly one completion.
pub async fn verify_donation(
    pool: &SqlitePool,
    gateway: &dyn PaymentGateway,
    donation_id: i64,
) -> Result<VerifiedDonation> {
    let donation = db::get_donation(pool, donation_id)
        .await?
        .ok_or(PortalError::NotFound("donation"))?;
    if !donation.is_pending() {
        return Err(PortalError::AlreadyProcessed(donation_id));
    }

    let method = PaymentMethod::parse(&donation.payment_method).ok_or_else(|| {
        PortalError::InvalidInput(format!(
            "donation {donation_id} carries unknown payment method '{}'",
            donation.payment_method
        ))
    })?;

    // Gateway round-trip happens outside the transaction; a decline leaves
    // the donation pending.
    let intent = PaymentIntent {
        donation_id: donation.id,
        transaction_id: donation.transaction_id.clone(),
        method,
        amount: Amount::from_cents(donation.amount),
    };
    if let Confirmation::Declined { reason } = gateway.confirm(&intent).await? {
        warn!(donation_id, "payment declined: {reason}");
        return Err(PortalError::GatewayDeclined(reason));
    }

    let paid_at = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    // Guarded flip first. It is the transaction's first write, so concurrent
    // verifications serialize on the writer lock here, and losing the race
    // surfaces as zero rows affected.
    if !db::mark_donation_completed(&mut *tx, donation.id, paid_at).await? {
        tx.rollback().await?;
        return Err(PortalError::AlreadyProcessed(donation.id));
    }

    let campaign = db::campaign_for_update(&mut *tx, donation.campaign_id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))?;

    let new_current = Amount::from_cents(campaign.current_amount) + Amount::from_cents(donation.amount);
    let progress = new_current.percent_of(Amount::from_cents(campaign.target_amount));

    db::apply_campaign_totals(
        &mut *tx,
        campaign.id,
        new_current.as_cents(),
        campaign.donors_count + 1,
        progress,
    )
    .await?;

    if donation.user_id > 0 {
        db::apply_donor_total(&mut *tx, donation.user_id, donation.amount).await?;
    }

    tx.commit()
        .await
        .map_err(|e| PortalError::TransactionFailure(e.to_string()))?;

    info!(
        donation_id = donation.id,
        campaign_id = campaign.id,
        amount = %Amount::from_cents(donation.amount),
        "donation verified"
    );

    let donation = db::get_donation(pool, donation.id)
        .await?
        .ok_or(PortalError::NotFound("donation"))?;

    Ok(VerifiedDonation {
        donation,
        campaign_title: campaign.title,
    })
}
