use super::EvaluationContext;
use crate::backend::BackendSession;
use crate::error::{Result, RunnerError};
use crate::evaluation::output::PhysicalResult;
use crate::model::{DatasetHandle, Pipeline, Value};

/// Read-only view over a completed run.
///
/// Holds the run's evaluation context, so every physical result bound during
/// the run stays queryable for as long as the result is kept.
pub struct EvaluationResult<'a> {
    context: EvaluationContext<'a>,
}

impl<'a> EvaluationResult<'a> {
    pub(super) fn new(context: EvaluationContext<'a>) -> Self {
        Self { context }
    }

    pub fn get(&self, handle: &DatasetHandle) -> Option<&PhysicalResult> {
        self.context.results.get(handle)
    }

    /// Like [`EvaluationResult::get`], failing with `UnresolvedHandle` for unknown handles.
    pub fn resolve(&self, handle: &DatasetHandle) -> Result<&PhysicalResult> {
        self.context.resolve(handle)
    }

    /// Gather the elements behind `handle` to the caller.
    pub fn collect(&self, handle: &DatasetHandle) -> Result<Vec<Value>> {
        match self.resolve(handle)? {
            PhysicalResult::Dataset(dataset) => self.context.session().collect(dataset),
            PhysicalResult::View(view) => Ok(view.elements().map_err(RunnerError::from)?.to_vec()),
        }
    }

    /// Every bound handle, sorted.
    pub fn handles(&self) -> Vec<&DatasetHandle> {
        let mut handles: Vec<&DatasetHandle> = self.context.results.keys().collect();
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.context.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context.results.is_empty()
    }

    pub fn session(&self) -> &dyn BackendSession {
        self.context.session()
    }

    pub fn pipeline(&self) -> &'a Pipeline {
        self.context.pipeline()
    }
}
