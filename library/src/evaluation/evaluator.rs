//! Transform evaluator trait: one implementation per operation kind.

use std::sync::Arc;

use super::context::EvaluationContext;
use crate::error::Result;
use crate::model::TransformNode;

/// Translates one kind of logical transform into backend work.
///
/// An evaluator reads the transform's inputs with `ctx.resolve(..)`, submits
/// work through `ctx.session()` and binds every declared output with
/// `ctx.bind(..)`. Evaluators are invoked one at a time, in dependency order.
pub trait TransformEvaluator: Send + Sync {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()>;
}

/// Closures are evaluators too, which keeps ad-hoc plug-ins short.
impl<F> TransformEvaluator for F
where
    F: Fn(&TransformNode, &mut EvaluationContext<'_>) -> Result<()> + Send + Sync,
{
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        self(node, ctx)
    }
}

/// Wrap a closure as a shareable evaluator.
pub fn evaluator_fn<F>(f: F) -> Arc<dyn TransformEvaluator>
where
    F: Fn(&TransformNode, &mut EvaluationContext<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}
