// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use shopflow::{ContextData, FlowError, Handler, StepControl};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct OrderDraft {
  pub total_cents: i64,
  pub notes: Vec<String>,
  pub stop_at: Option<String>,
  pub offline_payment: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DraftError {
  #[error("engine: {0}")]
  Flow(String),

  #[error("step failed: {0}")]
  Step(String),
}

impl From<FlowError> for DraftError {
  fn from(err: FlowError) -> Self {
    DraftError::Flow(err.to_string())
  }
}

/// Records `label` in the draft notes and adds `amount` to the total.
pub fn recording_handler(label: &'static str, amount: i64) -> Handler<OrderDraft, DraftError> {
  Box::new(move |ctx: ContextData<OrderDraft>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total_cents += amount;
      guard.notes.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(StepControl::Stop);
      }
      Ok(StepControl::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<OrderDraft, DraftError> {
  Box::new(move |ctx: ContextData<OrderDraft>| {
    Box::pin(async move {
      ctx.write().notes.push(label.to_string());
      Err(DraftError::Step(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
