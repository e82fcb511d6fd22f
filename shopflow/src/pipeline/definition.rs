// shopflow/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` type and its structural editing methods.

use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// Ordered named steps over a context `TData`, whose handlers fail with `Err`.
///
/// `Err` must be constructible from [`FlowError`] so that engine failures
/// (such as a required step with no handlers) surface as the pipeline's own
/// error type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(name: impl Into<String>, steps: impl IntoIterator<Item = StepDef<TData>>) -> Self {
    Self {
      name: name.into(),
      steps: steps.into_iter().collect(),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn position(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Handler registration against an unknown step is a wiring bug, not a runtime condition.
  pub(crate) fn assert_step_exists(&self, step_name: &str) {
    if self.position(step_name).is_none() {
      panic!(
        "pipeline '{}' has no step named '{}'; handlers must target a declared step",
        self.name, step_name
      );
    }
  }

  pub fn insert_after_step(&mut self, existing_step_name: &str, step: StepDef<TData>) -> FlowResult<()> {
    let idx = self.position(existing_step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: existing_step_name.to_string(),
    })?;
    self.steps.insert(idx + 1, step);
    Ok(())
  }

  pub fn remove_step(&mut self, step_name: &str) -> FlowResult<()> {
    let idx = self.position(step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: step_name.to_string(),
    })?;
    self.steps.remove(idx);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
    Ok(())
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position(step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: step_name.to_string(),
    })?;
    self.steps[idx].optional = optional;
    Ok(())
  }
}
