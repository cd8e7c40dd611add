//! Axum REST API handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::amount::Amount;
use crate::auth::AuthContext;
use crate::db;
use crate::errors::{PortalError, Result};
use crate::gateway::PaymentGateway;
use crate::intake::{self, IntakeRequest};
use crate::models::{CampaignRecord, DonationRecord, PaymentMethod};
use crate::verify;

pub struct ApiState {
    pub pool: SqlitePool,
    pub gateway: Arc<dyn PaymentGateway>,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    pub campaign_id: Option<i64>,
    pub amount: Option<Amount>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub donor_name: String,
    #[serde(default)]
    pub donor_email: String,
    #[serde(default)]
    pub donor_phone: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub donation_id: Option<i64>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DonationResponse {
    pub success: bool,
    pub donation_id: i64,
    pub transaction_id: String,
    pub amount: Amount,
    pub campaign_title: String,
    pub donor_name: String,
    pub qr_payload: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ReceiptData {
    pub receipt_id: String,
    pub transaction_id: String,
    pub date: String,
    pub donor_name: String,
    pub donor_email: String,
    pub amount: Amount,
    pub payment_method: String,
    pub campaign_title: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub donation_id: i64,
    pub transaction_id: String,
    pub amount: Amount,
    pub campaign_title: String,
    pub donor_name: String,
    pub receipt_data: ReceiptData,
}

#[derive(Serialize)]
pub struct DonationView {
    pub success: bool,
    pub donation_id: i64,
    pub status: String,
    pub campaign_title: String,
    pub receipt_data: Option<ReceiptData>,
}

#[derive(Serialize)]
pub struct CampaignsResponse {
    pub success: bool,
    pub count: usize,
    pub campaigns: Vec<CampaignRecord>,
}

#[derive(Serialize)]
pub struct CampaignResponse {
    pub success: bool,
    pub campaign: CampaignRecord,
}

#[derive(Serialize)]
pub struct DonorWallEntry {
    pub donor_name: String,
    pub amount: Amount,
    pub payment_date: Option<i64>,
}

#[derive(Serialize)]
pub struct CampaignDonationsResponse {
    pub success: bool,
    pub campaign_id: i64,
    pub count: usize,
    pub donations: Vec<DonorWallEntry>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Donations shown on a campaign's donor wall.
const DONOR_WALL_LIMIT: i64 = 50;

fn receipt_data(donation: &DonationRecord, campaign_title: &str) -> ReceiptData {
    let date = donation
        .payment_date
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    ReceiptData {
        receipt_id: format!("RCP-{:06}", donation.id),
        transaction_id: donation.transaction_id.clone(),
        date,
        donor_name: donation.donor_name.clone(),
        donor_email: donation.donor_email.clone(),
        amount: Amount::from_cents(donation.amount),
        payment_method: donation.payment_method.clone(),
        campaign_title: campaign_title.to_string(),
        status: donation.status.clone(),
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /donations`
///
/// Records a pending donation and returns the QR payment payload.
pub async fn donate(
    State(state): State<Arc<ApiState>>,
    AuthContext(principal): AuthContext,
    Json(req): Json<DonationRequest>,
) -> Result<Json<DonationResponse>> {
    let campaign_id = req
        .campaign_id
        .ok_or_else(|| PortalError::InvalidInput("campaign_id is required".to_string()))?;
    let amount = req
        .amount
        .ok_or_else(|| PortalError::InvalidInput("amount is required".to_string()))?;

    let method_str = req.payment_method.as_deref().unwrap_or("qr");
    let payment_method = PaymentMethod::parse(method_str).ok_or_else(|| {
        PortalError::InvalidInput(format!("unknown payment method '{method_str}'"))
    })?;

    let outcome = intake::create_donation(
        &state.pool,
        principal.as_ref(),
        IntakeRequest {
            campaign_id,
            amount,
            payment_method,
            donor_name: req.donor_name,
            donor_email: req.donor_email,
            donor_phone: req.donor_phone,
            anonymous: req.anonymous,
            user_id: req.user_id,
        },
    )
    .await?;

    Ok(Json(DonationResponse {
        success: true,
        donation_id: outcome.donation.id,
        transaction_id: outcome.donation.transaction_id.clone(),
        amount: Amount::from_cents(outcome.donation.amount),
        campaign_title: outcome.campaign_title,
        donor_name: outcome.donation.donor_name,
        qr_payload: outcome.qr_payload,
        message: "donation recorded, awaiting payment confirmation",
    }))
}

/// `POST /donations/verify`
///
/// Confirms payment for a pending donation and applies its financial
/// effect atomically.
pub async fn verify_payment(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let donation_id = req
        .donation_id
        .ok_or_else(|| PortalError::InvalidInput("donation_id is required".to_string()))?;

    let verified = verify::verify_donation(&state.pool, state.gateway.as_ref(), donation_id).await?;

    let receipt = receipt_data(&verified.donation, &verified.campaign_title);
    Ok(Json(VerifyResponse {
        success: true,
        donation_id: verified.donation.id,
        transaction_id: verified.donation.transaction_id.clone(),
        amount: Amount::from_cents(verified.donation.amount),
        campaign_title: verified.campaign_title,
        donor_name: verified.donation.donor_name.clone(),
        receipt_data: receipt,
    }))
}

/// `GET /donations/:id`
///
/// Read-only donation view for the receipt page. Receipt fields are only
/// present once the donation is completed.
pub async fn donation_receipt(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<DonationView>> {
    let donation = db::get_donation(&state.pool, id)
        .await?
        .ok_or(PortalError::NotFound("donation"))?;
    let campaign = db::get_campaign(&state.pool, donation.campaign_id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))?;

    let receipt = donation
        .payment_date
        .is_some()
        .then(|| receipt_data(&donation, &campaign.title));

    Ok(Json(DonationView {
        success: true,
        donation_id: donation.id,
        status: donation.status,
        campaign_title: campaign.title,
        receipt_data: receipt,
    }))
}

/// `GET /campaigns`
pub async fn list_campaigns(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CampaignsResponse>> {
    let campaigns = db::list_campaigns(&state.pool).await?;
    Ok(Json(CampaignsResponse {
        success: true,
        count: campaigns.len(),
        campaigns,
    }))
}

/// `GET /campaigns/:id`
pub async fn get_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignResponse>> {
    let campaign = db::get_campaign(&state.pool, id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))?;
    Ok(Json(CampaignResponse {
        success: true,
        campaign,
    }))
}

/// `GET /campaigns/:id/donations`
///
/// Recent completed donations for the campaign's donor wall. Anonymous
/// donations carry the cleared display name, so no identity leaks here.
pub async fn campaign_donations(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignDonationsResponse>> {
    let campaign = db::get_campaign(&state.pool, id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))?;

    let donations = db::list_campaign_donations(&state.pool, campaign.id, DONOR_WALL_LIMIT)
        .await?
        .into_iter()
        .map(|d| DonorWallEntry {
            donor_name: d.donor_name,
            amount: Amount::from_cents(d.amount),
            payment_date: d.payment_date,
        })
        .collect::<Vec<_>>();

    Ok(Json(CampaignDonationsResponse {
        success: true,
        campaign_id: campaign.id,
        count: donations.len(),
        donations,
    }))
}
