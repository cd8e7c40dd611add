//! Domain records and the string-coded enums stored with them.
//!
//! Enum values are persisted as short identifier strings; parsing is strict
//! at the API boundary and lenient when reading rows we wrote ourselves.

use serde::{Deserialize, Serialize};

/// Lifecycle of a donation. The only transition is `Pending` → `Completed`,
/// applied exactly once by payment verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Supported payment channels. `Card` is recorded at intake but the
/// simulated gateway declines it (card capture is not wired up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Qr,
    Fpx,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Fpx => "fpx",
            Self::Card => "card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qr" => Some(Self::Qr),
            "fpx" => Some(Self::Fpx),
            "card" => Some(Self::Card),
            _ => None,
        }
    }
}

/// Campaign lifecycle, managed by admin tooling and independent of the
/// donation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Completed,
    Cancelled,
    Draft,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Draft => "draft",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Donor,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "donor" => Some(Self::Donor),
            _ => None,
        }
    }
}

/// A donation ready to be inserted in `pending` status.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub user_id: i64,
    pub campaign_id: i64,
    pub amount: i64,
    pub transaction_id: String,
    pub payment_method: PaymentMethod,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub is_anonymous: bool,
    pub created_at: i64,
}

/// A campaign ready to be inserted. Aggregates start at zero.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub target_amount: i64,
    pub status: CampaignStatus,
    pub end_date: Option<i64>,
    pub created_at: i64,
}

/// A donation row as stored in / read from the database.
///
/// `amount` is integer cents; timestamps are Unix seconds. `user_id` of 0
/// marks a guest donation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonationRecord {
    pub id: i64,
    pub user_id: i64,
    pub campaign_id: i64,
    pub amount: i64,
    pub transaction_id: String,
    pub payment_method: String,
    pub status: String,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub is_anonymous: bool,
    pub created_at: i64,
    pub payment_date: Option<i64>,
}

impl DonationRecord {
    pub fn is_pending(&self) -> bool {
        DonationStatus::parse(&self.status) == Some(DonationStatus::Pending)
    }
}

/// A campaign row. Aggregate columns (`current_amount`, `donors_count`,
/// `progress_percentage`) are written only by payment verification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub target_amount: i64,
    pub current_amount: i64,
    pub donors_count: i64,
    pub progress_percentage: f64,
    pub status: String,
    pub end_date: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub api_token: Option<String>,
    pub role: String,
    pub total_donated: i64,
    pub created_at: i64,
}
