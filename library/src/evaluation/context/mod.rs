//! Evaluation context: carries all state produced during a single pipeline run.

mod result;

pub use result::EvaluationResult;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use super::output::{PhysicalResult, SideInput};
use crate::backend::{BackendSession, Dataset};
use crate::error::{Result, RunnerError};
use crate::model::{DatasetHandle, OperationKind, Pipeline};

/// Where the traversal currently is, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalPosition {
    pub index: usize,
    pub transform: String,
    pub kind: OperationKind,
}

impl fmt::Display for TraversalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transform `{}` ({}) at position {}",
            self.transform, self.kind, self.index
        )
    }
}

/// Context for a single pipeline run.
///
/// Created once per run. Maps every dataset handle evaluated so far to its
/// physical result; entries are only ever added, never replaced or removed.
pub struct EvaluationContext<'a> {
    session: Arc<dyn BackendSession>,
    pipeline: &'a Pipeline,
    results: HashMap<DatasetHandle, PhysicalResult>,
    position: Option<TraversalPosition>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(session: Arc<dyn BackendSession>, pipeline: &'a Pipeline) -> Self {
        Self {
            session,
            pipeline,
            results: HashMap::new(),
            position: None,
        }
    }

    /// The backend session evaluators submit work to.
    pub fn session(&self) -> &dyn BackendSession {
        self.session.as_ref()
    }

    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    pub fn position(&self) -> Option<&TraversalPosition> {
        self.position.as_ref()
    }

    pub(crate) fn set_position(&mut self, position: TraversalPosition) {
        self.position = Some(position);
    }

    /// Register the physical result for `handle`.
    ///
    /// Fails with [`RunnerError::Rebind`] if `handle` already has one.
    pub fn bind(&mut self, handle: DatasetHandle, result: PhysicalResult) -> Result<()> {
        if self.results.contains_key(&handle) {
            return Err(RunnerError::Rebind { handle });
        }
        debug!("Bound {} to a {}", handle, result.type_name());
        self.results.insert(handle, result);
        Ok(())
    }

    pub fn bind_dataset(&mut self, handle: DatasetHandle, dataset: Dataset) -> Result<()> {
        self.bind(handle, PhysicalResult::Dataset(dataset))
    }

    /// The physical result bound to `handle`.
    ///
    /// Fails with [`RunnerError::UnresolvedHandle`] if nothing was bound yet,
    /// which means the traversal order or the DAG itself is broken.
    pub fn resolve(&self, handle: &DatasetHandle) -> Result<&PhysicalResult> {
        self.results
            .get(handle)
            .ok_or_else(|| RunnerError::UnresolvedHandle {
                handle: handle.clone(),
                context: self.describe_unresolved(handle),
            })
    }

    pub fn resolve_dataset(&self, handle: &DatasetHandle) -> Result<&Dataset> {
        let result = self.resolve(handle)?;
        result.as_dataset().ok_or_else(|| RunnerError::TypeMismatch {
            handle: handle.clone(),
            expected: "dataset",
        })
    }

    pub fn resolve_side_input(&self, handle: &DatasetHandle) -> Result<&SideInput> {
        let result = self.resolve(handle)?;
        result.as_side_input().ok_or_else(|| RunnerError::TypeMismatch {
            handle: handle.clone(),
            expected: "view",
        })
    }

    pub fn is_bound(&self, handle: &DatasetHandle) -> bool {
        self.results.contains_key(handle)
    }

    pub fn into_result(self) -> EvaluationResult<'a> {
        EvaluationResult::new(self)
    }

    fn describe_unresolved(&self, handle: &DatasetHandle) -> String {
        let mut context = String::new();
        if let Some(position) = &self.position {
            context.push_str(&format!(" (while evaluating {})", position));
        }
        match self.pipeline.producer_of(handle) {
            Some(producer) => context.push_str(&format!("; produced by `{}`", producer.name)),
            None => context.push_str("; no transform in the pipeline produces it"),
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalSession;
    use crate::config::RunnerOptions;
    use crate::model::{PropertyMap, Value};

    fn session() -> Arc<dyn BackendSession> {
        Arc::new(LocalSession::new(&RunnerOptions::default().with_master("local")).unwrap())
    }

    fn two_node_pipeline() -> (Pipeline, DatasetHandle, DatasetHandle) {
        let mut p = Pipeline::new("p");
        let a = p
            .apply("a", OperationKind::Create, &[], PropertyMap::new())
            .unwrap();
        let b = p
            .apply("b", OperationKind::ParDo, &[a.clone()], PropertyMap::new())
            .unwrap();
        (p, a, b)
    }

    #[test]
    fn test_bind_then_resolve() {
        let (p, a, _) = two_node_pipeline();
        let session = session();
        let mut ctx = EvaluationContext::new(session.clone(), &p);
        let dataset = session.parallelize(vec![Value::from(1)], 1).unwrap();
        let id = dataset.id();
        ctx.bind_dataset(a.clone(), dataset).unwrap();
        assert_eq!(ctx.resolve_dataset(&a).unwrap().id(), id);
        assert!(ctx.is_bound(&a));
    }

    #[test]
    fn test_second_bind_fails_and_keeps_first() {
        let (p, a, _) = two_node_pipeline();
        let session = session();
        let mut ctx = EvaluationContext::new(session.clone(), &p);
        let first = session.parallelize(vec![Value::from(1)], 1).unwrap();
        let first_id = first.id();
        ctx.bind_dataset(a.clone(), first).unwrap();

        let second = session.parallelize(vec![Value::from(2)], 1).unwrap();
        let err = ctx.bind_dataset(a.clone(), second).unwrap_err();
        assert!(matches!(err, RunnerError::Rebind { ref handle } if *handle == a));
        assert_eq!(ctx.resolve_dataset(&a).unwrap().id(), first_id);
    }

    #[test]
    fn test_resolve_before_bind_names_position_and_producer() {
        let (p, a, _) = two_node_pipeline();
        let mut ctx = EvaluationContext::new(session(), &p);
        ctx.set_position(TraversalPosition {
            index: 1,
            transform: "b".into(),
            kind: OperationKind::ParDo,
        });
        let err = ctx.resolve(&a).unwrap_err();
        match err {
            RunnerError::UnresolvedHandle { handle, context } => {
                assert_eq!(handle, a);
                assert!(context.contains("`b`"), "{}", context);
                assert!(context.contains("position 1"), "{}", context);
                assert!(context.contains("produced by `a`"), "{}", context);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_wrong_variant_is_type_mismatch() {
        let (p, a, _) = two_node_pipeline();
        let session = session();
        let mut ctx = EvaluationContext::new(session.clone(), &p);
        ctx.bind_dataset(a.clone(), session.parallelize(Vec::new(), 1).unwrap())
            .unwrap();
        assert!(matches!(
            ctx.resolve_side_input(&a),
            Err(RunnerError::TypeMismatch { expected: "view", .. })
        ));
    }
}
