// tests/registry_tests.rs
mod common;

use common::*;
use shopflow::{ContextData, FlowRegistry, Pipeline, PipelineResult, StepControl, StepDef};

#[derive(Debug, Default)]
struct SigninDraft {
  email: String,
  signed_in: bool,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<DraftError>::new();

  let mut orders = Pipeline::<OrderDraft, DraftError>::new("orders", [StepDef::required("price")]);
  orders.on_step("price", recording_handler("price", 42));
  registry.register(orders);

  let mut signin = Pipeline::<SigninDraft, DraftError>::new("signin", [StepDef::required("verify")]);
  signin.on_step("verify", |ctx: ContextData<SigninDraft>| async move {
    let mut guard = ctx.write();
    guard.signed_in = guard.email.contains('@');
    Ok::<_, DraftError>(StepControl::Continue)
  });
  registry.register(signin);

  assert_eq!(registry.len(), 2);
  assert!(registry.is_registered::<SigninDraft>());

  let order_ctx = ContextData::new(OrderDraft::default());
  assert_eq!(registry.run(order_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(order_ctx.read().total_cents, 42);

  let signin_ctx = ContextData::new(SigninDraft {
    email: "ana@example.com".to_string(),
    signed_in: false,
  });
  registry.run(signin_ctx.clone()).await.unwrap();
  assert!(signin_ctx.read().signed_in);
}

#[tokio::test]
async fn unknown_context_type_is_an_error() {
  setup_tracing();
  let registry = FlowRegistry::<DraftError>::new();
  assert!(registry.is_empty());

  let err = registry.run(ContextData::new(OrderDraft::default())).await.unwrap_err();
  match err {
    DraftError::Flow(msg) => assert!(msg.contains("No pipeline registered")),
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
async fn later_registration_replaces_earlier_one() {
  setup_tracing();
  let registry = FlowRegistry::<DraftError>::new();

  let mut first = Pipeline::<OrderDraft, DraftError>::new("first", [StepDef::required("price")]);
  first.on_step("price", recording_handler("first", 1));
  registry.register(first);

  let mut second = Pipeline::<OrderDraft, DraftError>::new("second", [StepDef::required("price")]);
  second.on_step("price", recording_handler("second", 2));
  registry.register(second);

  let ctx = ContextData::new(OrderDraft::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(registry.len(), 1);
  assert_eq!(ctx.read().notes, vec!["second"]);
}
