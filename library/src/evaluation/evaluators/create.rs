//! Evaluator for create nodes: a dataset from literal values.

use super::{main_output, partitions};
use crate::error::{Result, RunnerError};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::model::{TransformNode, Value};

/// Parallelizes the JSON array in the `values` property.
pub struct CreateEvaluator;

impl TransformEvaluator for CreateEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();

        let values = match node.property("values") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(Value::from_json)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|reason| RunnerError::invalid_property(&node.name, "values", reason))?,
            Some(_) => {
                return Err(RunnerError::invalid_property(
                    &node.name,
                    "values",
                    "expected an array",
                ));
            }
            None => Vec::new(),
        };

        let partitions = partitions(node)?.unwrap_or_else(|| ctx.session().default_parallelism());
        let dataset = ctx.session().parallelize(values, partitions)?;
        ctx.bind_dataset(output, dataset)
    }
}
