// storefront/src/services/payment_gateway.rs

//! Mock card payment gateway.

use crate::errors::{AppError, Result as AppResult};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
  RequiresConfirmation,
  Succeeded,
  Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
  pub id: String,
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub status: IntentStatus,
  pub account_id: String,
}

/// Simulated gateway. Any amount ending in `123` (modulo 1000) is declined.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
  account_id: String,
  latency: Duration,
}

impl MockPaymentGateway {
  pub fn new(account_id: impl Into<String>) -> Self {
    Self {
      account_id: account_id.into(),
      latency: Duration::from_millis(50),
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  #[instrument(name = "payment_gateway::create_intent", skip(self), fields(account_id = %self.account_id), err(Display))]
  pub async fn create_intent(&self, order_id: Uuid, amount_cents: i64, currency: &str) -> AppResult<PaymentIntent> {
    if amount_cents <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero.".to_string()));
    }
    tokio::time::sleep(self.latency).await;
    let intent = PaymentIntent {
      id: format!("mock_pi_{}", Uuid::new_v4().simple()),
      order_id,
      amount_cents,
      currency: currency.to_string(),
      status: IntentStatus::RequiresConfirmation,
      account_id: self.account_id.clone(),
    };
    info!(intent_id = %intent.id, "Payment intent created.");
    Ok(intent)
  }

  #[instrument(name = "payment_gateway::confirm", skip_all, fields(intent_id = %intent.id), err(Display))]
  pub async fn confirm(&self, intent: &mut PaymentIntent) -> AppResult<()> {
    tokio::time::sleep(self.latency).await;
    if intent.amount_cents % 1000 == 123 {
      intent.status = IntentStatus::Failed;
      warn!("Card payment declined.");
      return Err(AppError::Payment("The card payment was declined.".to_string()));
    }
    intent.status = IntentStatus::Succeeded;
    info!("Card payment succeeded.");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn declines_amounts_ending_in_123() {
    let gateway = MockPaymentGateway::new("acct").with_latency(Duration::ZERO);

    let mut ok = gateway.create_intent(Uuid::new_v4(), 4_999, "USD").await.unwrap();
    gateway.confirm(&mut ok).await.unwrap();
    assert_eq!(ok.status, IntentStatus::Succeeded);

    let mut declined = gateway.create_intent(Uuid::new_v4(), 2_123, "USD").await.unwrap();
    assert!(matches!(gateway.confirm(&mut declined).await, Err(AppError::Payment(_))));
    assert_eq!(declined.status, IntentStatus::Failed);

    assert!(gateway.create_intent(Uuid::new_v4(), 0, "USD").await.is_err());
  }
}
