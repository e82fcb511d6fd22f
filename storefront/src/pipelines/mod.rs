// storefront/src/pipelines/mod.rs

//! Multi-step workflows, registered once at startup.

use crate::errors::AppError;
use shopflow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod checkout_pipeline;
pub mod order_status_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  signup_pipeline::register_signup_pipeline(flows);
  signin_pipeline::register_signin_pipeline(flows);
  checkout_pipeline::register_checkout_pipeline(flows);
  order_status_pipeline::register_order_status_pipeline(flows);
  tracing::info!(pipelines = flows.len(), "All application pipelines registered.");
}
