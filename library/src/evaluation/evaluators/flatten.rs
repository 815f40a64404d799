//! Evaluator for flatten nodes.

use super::main_output;
use crate::error::Result;
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::model::TransformNode;

/// Union of all inputs, in input order. No inputs yields an empty dataset.
pub struct FlattenEvaluator;

impl TransformEvaluator for FlattenEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let inputs = node
            .inputs
            .iter()
            .map(|handle| ctx.resolve_dataset(handle).cloned())
            .collect::<Result<Vec<_>>>()?;

        let dataset = if inputs.is_empty() {
            ctx.session().parallelize(Vec::new(), 1)?
        } else {
            ctx.session().union(&inputs)?
        };
        ctx.bind_dataset(output, dataset)
    }
}
