//! Evaluators for combine_per_key and combine_globally nodes.

use serde::{Deserialize, Serialize};

use super::group_by_key::group_partition;
use super::{main_output, partitions, required_str, single_input};
use crate::error::{Result, RunnerError};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::model::{TransformNode, Value};

/// Associative reduction selected by the `combiner` property.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Combiner {
    Sum,
    Count,
    Min,
    Max,
}

impl Combiner {
    fn from_node(node: &TransformNode) -> Result<Self> {
        let name = required_str(node, "combiner")?;
        serde_json::from_value(serde_json::Value::String(name.to_string())).map_err(|_| {
            RunnerError::invalid_property(
                &node.name,
                "combiner",
                format!("unknown combiner `{}` (expected sum, count, min or max)", name),
            )
        })
    }

    /// Reduce raw input values. `None` means there is nothing to emit.
    pub fn combine(self, values: &[Value]) -> Result<Option<Value>> {
        match self {
            Combiner::Sum => sum(values).map(Some),
            Combiner::Count => Ok(Some(Value::Int(values.len() as i64))),
            Combiner::Min => Ok(values.iter().min().cloned()),
            Combiner::Max => Ok(values.iter().max().cloned()),
        }
    }

    /// Reduce partial results produced by [`Combiner::combine`].
    pub fn merge(self, partials: &[Value]) -> Result<Option<Value>> {
        match self {
            // Partial counts add up.
            Combiner::Count => sum(partials).map(Some),
            other => other.combine(partials),
        }
    }
}

fn sum(values: &[Value]) -> Result<Value> {
    let mut int_total: i64 = 0;
    let mut float_total: Option<f64> = None;
    for value in values {
        match value {
            Value::Int(v) => {
                int_total = int_total
                    .checked_add(*v)
                    .ok_or_else(|| RunnerError::execution("integer overflow in sum"))?;
            }
            Value::Float(v) => *float_total.get_or_insert(0.0) += v.0,
            other => {
                return Err(RunnerError::execution(format!("cannot sum {}", other)));
            }
        }
    }
    Ok(match float_total {
        Some(f) => Value::from(f + int_total as f64),
        None => Value::Int(int_total),
    })
}

/// Combines the values of each key: `Pair(k, v)` → `Pair(k, combined)`.
pub struct CombinePerKeyEvaluator;

impl TransformEvaluator for CombinePerKeyEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let combiner = Combiner::from_node(node)?;
        let input = ctx.resolve_dataset(single_input(node)?)?.clone();
        let partitions = partitions(node)?.unwrap_or_else(|| ctx.session().default_parallelism());

        let shuffled = ctx.session().shuffle_by_key(&input, partitions)?;
        let combined = ctx.session().map_partitions(&shuffled, &|_, partition| {
            let mut out = Vec::new();
            for (key, values) in group_partition(partition)? {
                if let Some(value) = combiner.combine(&values)? {
                    out.push(Value::pair(key, value));
                }
            }
            Ok(out)
        })?;
        ctx.bind_dataset(output, combined)
    }
}

/// Combines a whole dataset into a single-element dataset.
///
/// Each partition is reduced on the workers; the partials are merged on the driver.
pub struct CombineGloballyEvaluator;

impl TransformEvaluator for CombineGloballyEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let combiner = Combiner::from_node(node)?;
        let input = ctx.resolve_dataset(single_input(node)?)?.clone();

        let partials = ctx.session().map_partitions(&input, &|_, partition| {
            if partition.is_empty() {
                return Ok(Vec::new());
            }
            Ok(combiner.combine(partition)?.into_iter().collect())
        })?;
        let partials = ctx.session().collect(&partials)?;
        let result: Vec<Value> = combiner.merge(&partials)?.into_iter().collect();

        let dataset = ctx.session().parallelize(result, 1)?;
        ctx.bind_dataset(output, dataset)
    }
}
