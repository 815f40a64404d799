//! Registry mapping operation kinds to their evaluators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;

use super::evaluator::TransformEvaluator;
use crate::error::{Result, RunnerError};
use crate::functions::FunctionRegistry;
use crate::model::OperationKind;

/// Lookup table from [`OperationKind`] to evaluator.
///
/// Keys match by exact identity. Registering a kind that is already present
/// replaces the earlier evaluator, returns it, and logs a warning.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<OperationKind, Arc<dyn TransformEvaluator>>,
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in evaluators registered.
    ///
    /// `functions` backs the `par_do` evaluator.
    pub fn with_builtin_evaluators(functions: FunctionRegistry) -> Self {
        use super::evaluators::combine::{CombineGloballyEvaluator, CombinePerKeyEvaluator};
        use super::evaluators::create::CreateEvaluator;
        use super::evaluators::flatten::FlattenEvaluator;
        use super::evaluators::group_by_key::GroupByKeyEvaluator;
        use super::evaluators::par_do::ParDoEvaluator;
        use super::evaluators::text_io::{ReadTextEvaluator, WriteTextEvaluator};
        use super::evaluators::view::CreateViewEvaluator;

        let mut registry = Self::new();
        registry.register(OperationKind::Create, Arc::new(CreateEvaluator));
        registry.register(OperationKind::ParDo, Arc::new(ParDoEvaluator::new(functions)));
        registry.register(OperationKind::GroupByKey, Arc::new(GroupByKeyEvaluator));
        registry.register(OperationKind::CombinePerKey, Arc::new(CombinePerKeyEvaluator));
        registry.register(OperationKind::CombineGlobally, Arc::new(CombineGloballyEvaluator));
        registry.register(OperationKind::Flatten, Arc::new(FlattenEvaluator));
        registry.register(OperationKind::CreateView, Arc::new(CreateViewEvaluator));
        registry.register(OperationKind::ReadText, Arc::new(ReadTextEvaluator));
        registry.register(OperationKind::WriteText, Arc::new(WriteTextEvaluator));
        registry
    }

    /// Register or replace the evaluator for `kind`.
    ///
    /// Returns the replaced evaluator, if there was one.
    pub fn register(
        &mut self,
        kind: OperationKind,
        evaluator: Arc<dyn TransformEvaluator>,
    ) -> Option<Arc<dyn TransformEvaluator>> {
        let previous = self.evaluators.insert(kind.clone(), evaluator);
        if previous.is_some() {
            warn!("Replaced the evaluator registered for `{}`", kind);
        }
        previous
    }

    /// The evaluator for `kind`.
    ///
    /// Fails with [`RunnerError::UnsupportedOperation`] if none is registered.
    pub fn lookup(&self, kind: &OperationKind) -> Result<Arc<dyn TransformEvaluator>> {
        self.evaluators
            .get(kind)
            .cloned()
            .ok_or_else(|| RunnerError::UnsupportedOperation { kind: kind.clone() })
    }

    pub fn contains(&self, kind: &OperationKind) -> bool {
        self.evaluators.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<OperationKind> = self.evaluators.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
