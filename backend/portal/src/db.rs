//! Database layer — migrations, typed queries, and the transaction-scoped
//! helpers used by payment verification.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::{PortalError, Result};
use crate::models::{CampaignRecord, DonationRecord, NewCampaign, NewDonation, UserRecord};

/// Establish a SQLite connection pool and run pending migrations.
///
/// WAL mode plus a busy timeout makes concurrent verifications queue on the
/// single-writer lock instead of failing with SQLITE_BUSY.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Campaigns
// ─────────────────────────────────────────────────────────

pub async fn create_campaign(pool: &SqlitePool, campaign: &NewCampaign) -> Result<CampaignRecord> {
    let result = sqlx::query(
        r#"
        INSERT INTO campaigns (title, description, target_amount, status, end_date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&campaign.title)
    .bind(&campaign.description)
    .bind(campaign.target_amount)
    .bind(campaign.status.as_str())
    .bind(campaign.end_date)
    .bind(campaign.created_at)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_campaign(pool, id)
        .await?
        .ok_or(PortalError::NotFound("campaign"))
}

pub async fn get_campaign(pool: &SqlitePool, id: i64) -> Result<Option<CampaignRecord>> {
    let row = sqlx::query_as::<_, CampaignRecord>(
        r#"
        SELECT id, title, description, target_amount, current_amount, donors_count,
               progress_percentage, status, end_date, created_at
        FROM   campaigns
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All campaigns, newest first. Backs the public browsing page.
pub async fn list_campaigns(pool: &SqlitePool) -> Result<Vec<CampaignRecord>> {
    let rows = sqlx::query_as::<_, CampaignRecord>(
        r#"
        SELECT id, title, description, target_amount, current_amount, donors_count,
               progress_percentage, status, end_date, created_at
        FROM   campaigns
        ORDER  BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Recent completed donations for a campaign's donor wall.
pub async fn list_campaign_donations(
    pool: &SqlitePool,
    campaign_id: i64,
    limit: i64,
) -> Result<Vec<DonationRecord>> {
    let rows = sqlx::query_as::<_, DonationRecord>(
        r#"
        SELECT id, user_id, campaign_id, amount, transaction_id, payment_method,
               status, donor_name, donor_email, donor_phone, is_anonymous,
               created_at, payment_date
        FROM   donations
        WHERE  campaign_id = ?1 AND status = 'completed'
        ORDER  BY payment_date DESC, id DESC
        LIMIT  ?2
        "#,
    )
    .bind(campaign_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

pub async fn find_user(pool: &SqlitePool, id: i64) -> Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email, phone, api_token, role, total_donated, created_at
        FROM   users
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_user_by_token(pool: &SqlitePool, token: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email, phone, api_token, role, total_donated, created_at
        FROM   users
        WHERE  api_token = ?1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    phone: &str,
    api_token: Option<&str>,
) -> Result<UserRecord> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, phone, api_token)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(api_token)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    find_user(pool, id).await?.ok_or(PortalError::NotFound("user"))
}

// ─────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────

pub async fn insert_donation(pool: &SqlitePool, donation: &NewDonation) -> Result<DonationRecord> {
    let result = sqlx::query(
        r#"
        INSERT INTO donations
            (user_id, campaign_id, amount, transaction_id, payment_method,
             status, donor_name, donor_email, donor_phone, is_anonymous, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(donation.user_id)
    .bind(donation.campaign_id)
    .bind(donation.amount)
    .bind(&donation.transaction_id)
    .bind(donation.payment_method.as_str())
    .bind(&donation.donor_name)
    .bind(&donation.donor_email)
    .bind(&donation.donor_phone)
    .bind(donation.is_anonymous)
    .bind(donation.created_at)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_donation(pool, id)
        .await?
        .ok_or(PortalError::NotFound("donation"))
}

pub async fn get_donation(pool: &SqlitePool, id: i64) -> Result<Option<DonationRecord>> {
    let row = sqlx::query_as::<_, DonationRecord>(
        r#"
        SELECT id, user_id, campaign_id, amount, transaction_id, payment_method,
               status, donor_name, donor_email, donor_phone, is_anonymous,
               created_at, payment_date
        FROM   donations
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ─────────────────────────────────────────────────────────
// Verification transaction helpers
//
// These run on an open transaction's connection. The guarded status flip is
// always the transaction's first write, so concurrent verifications
// serialize on SQLite's writer lock and the campaign read below can never
// observe a stale aggregate.
// ─────────────────────────────────────────────────────────

/// Flip a donation from `pending` to `completed`, stamping the payment time.
/// Returns `false` when the donation was not pending (a concurrent call won).
pub async fn mark_donation_completed(
    conn: &mut SqliteConnection,
    donation_id: i64,
    paid_at: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE donations
        SET    status = 'completed', payment_date = ?2
        WHERE  id = ?1 AND status = 'pending'
        "#,
    )
    .bind(donation_id)
    .bind(paid_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Read-for-update: the campaign aggregate row, fetched on the transaction
/// that will write it back.
pub async fn campaign_for_update(
    conn: &mut SqliteConnection,
    campaign_id: i64,
) -> Result<Option<CampaignRecord>> {
    let row = sqlx::query_as::<_, CampaignRecord>(
        r#"
        SELECT id, title, description, target_amount, current_amount, donors_count,
               progress_percentage, status, end_date, created_at
        FROM   campaigns
        WHERE  id = ?1
        "#,
    )
    .bind(campaign_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn apply_campaign_totals(
    conn: &mut SqliteConnection,
    campaign_id: i64,
    current_amount: i64,
    donors_count: i64,
    progress_percentage: f64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE campaigns
        SET    current_amount = ?2, donors_count = ?3, progress_percentage = ?4
        WHERE  id = ?1
        "#,
    )
    .bind(campaign_id)
    .bind(current_amount)
    .bind(donors_count)
    .bind(progress_percentage)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(PortalError::NotFound("campaign"));
    }
    Ok(())
}

/// Add a completed donation to a registered donor's lifetime total.
/// A missing user row is an error so the surrounding transaction rolls back
/// as a unit.
pub async fn apply_donor_total(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: i64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET    total_donated = total_donated + ?2
        WHERE  id = ?1
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(PortalError::NotFound("user"));
    }
    Ok(())
}
