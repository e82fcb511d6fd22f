// shopflow/src/lib.rs

//! Shopflow: small asynchronous step pipelines.
//!
//! A pipeline is an ordered list of named steps run against one shared
//! context. Each step may carry `before`, `on` and `after` handlers; a handler
//! either lets the run continue, stops it cleanly, or fails it with the
//! pipeline's error type. Steps can be optional (a step without handlers is
//! then skipped instead of failing the run) and can carry a skip condition
//! evaluated against the context right before the step runs.
//!
//! Pipelines are registered in a [`FlowRegistry`] keyed by the context type,
//! so callers only need the context value to dispatch the matching workflow.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineResult, StepControl};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::definition::Pipeline;
pub use crate::registry::FlowRegistry;
