// storefront/src/services/mailer.rs

//! Outgoing email: the `Mailer` seam, the logging implementation and message templates.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Appointment, Order, OrderItem, User};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub subject: String,
  pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  /// Sends `message` and returns the provider's message id.
  async fn send(&self, message: EmailMessage) -> AppResult<String>;
}

/// Logs messages instead of delivering them and keeps a copy for inspection.
pub struct LogMailer {
  sender: String,
  outbox: Mutex<Vec<EmailMessage>>,
}

impl LogMailer {
  pub fn new(sender: impl Into<String>) -> Self {
    Self {
      sender: sender.into(),
      outbox: Mutex::new(Vec::new()),
    }
  }

  pub fn sent(&self) -> Vec<EmailMessage> {
    self.outbox.lock().clone()
  }
}

#[async_trait]
impl Mailer for LogMailer {
  #[instrument(name = "LogMailer::send", skip_all, fields(to = %message.to, subject = %message.subject))]
  async fn send(&self, message: EmailMessage) -> AppResult<String> {
    if !message.to.contains('@') {
      return Err(AppError::Internal(format!("Invalid recipient '{}'", message.to)));
    }
    let message_id = format!("log_{}", Uuid::new_v4().simple());
    info!(from = %self.sender, %message_id, "Email dispatched to log.");
    self.outbox.lock().push(message);
    Ok(message_id)
  }
}

/// Sends `message`, logging instead of returning a failure. Returns whether it was sent.
pub async fn send_best_effort(mailer: &dyn Mailer, message: EmailMessage) -> bool {
  let subject = message.subject.clone();
  match mailer.send(message).await {
    Ok(_) => true,
    Err(e) => {
      warn!(%subject, error = %e, "Email could not be sent.");
      false
    }
  }
}

fn money(cents: i64, currency: &str) -> String {
  format!("{}.{:02} {}", cents / 100, cents % 100, currency)
}

pub fn welcome_email(user: &User) -> EmailMessage {
  EmailMessage {
    to: user.email.clone(),
    subject: "Welcome to the shop".to_string(),
    body: format!(
      "Hi {},\n\nYour account is ready. Happy shopping!",
      user.display_name()
    ),
  }
}

pub fn order_confirmation_email(order: &Order, items: &[OrderItem]) -> EmailMessage {
  let lines: Vec<String> = items
    .iter()
    .map(|item| {
      format!(
        "  {} x {} = {}",
        item.quantity,
        item.product_name,
        money(item.line_total_cents(), &order.currency)
      )
    })
    .collect();
  let mut body = format!(
    "Hi {},\n\nThanks for your order {}.\n\n{}\n\nSubtotal: {}\n",
    order.shipping_name,
    order.id,
    lines.join("\n"),
    money(order.subtotal_cents, &order.currency)
  );
  if order.discount_cents > 0 {
    body.push_str(&format!("Discount: -{}\n", money(order.discount_cents, &order.currency)));
  }
  body.push_str(&format!("Total: {}\n", money(order.total_cents, &order.currency)));
  EmailMessage {
    to: order.shipping_email.clone(),
    subject: format!("Order confirmation {}", order.id),
    body,
  }
}

pub fn order_status_email(order: &Order) -> EmailMessage {
  let mut body = format!(
    "Hi {},\n\nYour order {} is now {}.",
    order.shipping_name, order.id, order.status
  );
  if let Some(tracking) = &order.tracking_number {
    body.push_str(&format!("\nTracking number: {}", tracking));
  }
  EmailMessage {
    to: order.shipping_email.clone(),
    subject: format!("Order {} is {}", order.id, order.status),
    body,
  }
}

pub fn appointment_confirmation_email(appointment: &Appointment, customer: &User) -> EmailMessage {
  EmailMessage {
    to: customer.email.clone(),
    subject: "Your nutritionist appointment".to_string(),
    body: format!(
      "Hi {},\n\nYour appointment is booked for {} (UTC).",
      customer.display_name(),
      appointment.starts_at.format("%Y-%m-%d %H:%M")
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn log_mailer_keeps_sent_messages() {
    let mailer = LogMailer::new("shop@example.com");
    let ok = send_best_effort(
      &mailer,
      EmailMessage {
        to: "ana@example.com".to_string(),
        subject: "Hello".to_string(),
        body: "Body".to_string(),
      },
    )
    .await;
    let bad = send_best_effort(
      &mailer,
      EmailMessage {
        to: "nobody".to_string(),
        subject: "Hello".to_string(),
        body: "Body".to_string(),
      },
    )
    .await;

    assert!(ok);
    assert!(!bad);
    assert_eq!(mailer.sent().len(), 1);
  }

  #[test]
  fn money_formatting() {
    assert_eq!(money(123_456, "USD"), "1234.56 USD");
    assert_eq!(money(5, "EUR"), "0.05 EUR");
  }
}
