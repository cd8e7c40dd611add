//! Payment gateway seam.
//!
//! The portal never talks to a real acquirer; the QR flow is simulated.
//! Keeping the confirmation step behind a trait object means a real gateway
//! integration replaces [`SimulatedGateway`] without touching the
//! verification transaction.

use async_trait::async_trait;

use crate::amount::Amount;
use crate::errors::Result;
use crate::models::PaymentMethod;

/// What the gateway is asked to confirm.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub donation_id: i64,
    pub transaction_id: String,
    pub method: PaymentMethod,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn confirm(&self, intent: &PaymentIntent) -> Result<Confirmation>;
}

/// Demo gateway: QR and FPX intents confirm immediately; card capture is
/// not wired up and is declined.
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn confirm(&self, intent: &PaymentIntent) -> Result<Confirmation> {
        match intent.method {
            PaymentMethod::Qr | PaymentMethod::Fpx => Ok(Confirmation::Confirmed),
            PaymentMethod::Card => Ok(Confirmation::Declined {
                reason: "card payments are not supported yet".to_string(),
            }),
        }
    }
}
