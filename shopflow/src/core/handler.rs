// shopflow/src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::StepControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed asynchronous step handler.
///
/// Handlers take a clone of the shared context and resolve to a
/// [`StepControl`] or the pipeline's error type.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>> + Send + Sync,
>;
