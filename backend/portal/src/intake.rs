//! Donation intake — records a pending donation and hands back the
//! QR payment-intent payload.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::amount::Amount;
use crate::auth::Principal;
use crate::db;
use crate::errors::{PortalError, Result};
use crate::models::{DonationRecord, NewDonation, PaymentMethod};

pub const ANONYMOUS_DONOR: &str = "Anonymous";

/// Validated intake input, after DTO-level required-field checks.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub campaign_id: i64,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub anonymous: bool,
    /// 0 = guest. Overridden by an authenticated principal.
    pub user_id: i64,
}

#[derive(Debug)]
pub struct IntakeOutcome {
    pub donation: DonationRecord,
    pub campaign_title: String,
    pub qr_payload: String,
}

/// Create a donation in `pending` status.
///
/// Donor identity resolution: an authenticated principal wins over a
/// body-supplied `user_id`; blank name/email are backfilled from the user
/// row; `anonymous` clears the display identity afterwards but keeps the
/// user attribution for the lifetime-total accounting.
pub async fn create_donation(
    pool: &SqlitePool,
    principal: Option<&Principal>,
    req: IntakeRequest,
) -> Result<IntakeOutcome> {
    if !req.amount.is_positive() {
        return Err(PortalError::InvalidInput(
            "donation amount must be greater than zero".to_string(),
        ));
    }

    let campaign = db::get_campaign(pool, req.campaign_id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))?;

    let user_id = match principal {
        Some(p) => p.id,
        None => req.user_id,
    };
    if user_id < 0 {
        return Err(PortalError::InvalidInput("invalid user id".to_string()));
    }

    let mut donor_name = req.donor_name.trim().to_string();
    let mut donor_email = req.donor_email.trim().to_string();
    let mut donor_phone = req.donor_phone.trim().to_string();

    if user_id > 0 {
        let user = db::find_user(pool, user_id)
            .await?
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown user id {user_id}")))?;
        if donor_name.is_empty() {
            donor_name = user.name;
        }
        if donor_email.is_empty() {
            donor_email = user.email;
        }
        if donor_phone.is_empty() {
            donor_phone = user.phone;
        }
    }

    if req.anonymous {
        donor_name = ANONYMOUS_DONOR.to_string();
        donor_email.clear();
        donor_phone.clear();
    }

    let now = Utc::now();
    let transaction_id = generate_transaction_id(now);

    let donation = db::insert_donation(
        pool,
        &NewDonation {
            user_id,
            campaign_id: campaign.id,
            amount: req.amount.as_cents(),
            transaction_id,
            payment_method: req.payment_method,
            donor_name,
            donor_email,
            donor_phone,
            is_anonymous: req.anonymous,
            created_at: now.timestamp(),
        },
    )
    .await?;

    let qr_payload = encode_qr_payload(&donation, &campaign.title)?;

    info!(
        donation_id = donation.id,
        campaign_id = campaign.id,
        amount = %req.amount,
        "donation recorded, awaiting payment"
    );

    Ok(IntakeOutcome {
        donation,
        campaign_title: campaign.title,
        qr_payload,
    })
}

/// Human-readable, time-ordered transaction reference:
/// `TXN-<UTC yyyymmddHHMMSS>-<8 hex>`. Uniqueness is enforced by the
/// database index; the random suffix makes same-second collisions
/// implausible.
fn generate_transaction_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("TXN-{}-{}", now.format("%Y%m%d%H%M%S"), &suffix[..8])
}

#[derive(Serialize)]
struct QrPayload<'a> {
    donation_id: i64,
    transaction_id: &'a str,
    amount: Amount,
    campaign: &'a str,
}

/// The payload a client renders as a QR code. Opaque to this service:
/// base64-wrapped JSON carrying the payment-intent fields.
fn encode_qr_payload(donation: &DonationRecord, campaign_title: &str) -> Result<String> {
    let payload = serde_json::to_string(&QrPayload {
        donation_id: donation.id,
        transaction_id: &donation.transaction_id,
        amount: Amount::from_cents(donation.amount),
        campaign: campaign_title,
    })?;
    Ok(BASE64.encode(payload))
}
