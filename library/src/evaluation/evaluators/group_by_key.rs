//! Evaluator for group_by_key nodes.

use std::collections::BTreeMap;

use super::{main_output, partitions, single_input};
use crate::error::{Result, RunnerError};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::model::{TransformNode, Value};

/// `Pair(k, v)` elements become one `Pair(k, List(vs))` per distinct key.
///
/// Values keep their input order; keys come out sorted within each partition.
pub struct GroupByKeyEvaluator;

impl TransformEvaluator for GroupByKeyEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let input = ctx.resolve_dataset(single_input(node)?)?.clone();
        let partitions = partitions(node)?.unwrap_or_else(|| ctx.session().default_parallelism());

        let shuffled = ctx.session().shuffle_by_key(&input, partitions)?;
        let grouped = ctx.session().map_partitions(&shuffled, &|_, partition| {
            Ok(group_partition(partition)?
                .into_iter()
                .map(|(key, values)| Value::pair(key, Value::List(values)))
                .collect())
        })?;
        ctx.bind_dataset(output, grouped)
    }
}

/// Group one partition's pairs by key.
pub(crate) fn group_partition(partition: &[Value]) -> Result<BTreeMap<Value, Vec<Value>>> {
    let mut groups: BTreeMap<Value, Vec<Value>> = BTreeMap::new();
    for element in partition {
        let (key, value) = element.as_pair().ok_or_else(|| {
            RunnerError::execution(format!("expected a key/value pair, got {}", element))
        })?;
        groups.entry(key.clone()).or_default().push(value.clone());
    }
    Ok(groups)
}
