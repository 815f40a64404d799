//! Evaluator for par_do nodes: applies a named function to every element.

use super::main_output;
use crate::error::{Result, RunnerError};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::evaluation::output::SideInput;
use crate::functions::{FunctionRegistry, ProcessContext};
use crate::model::TransformNode;

/// Input 0 is the main dataset; inputs 1.. are views, named in order by the
/// `side_inputs` property. The `fn` property names the function to apply.
pub struct ParDoEvaluator {
    functions: FunctionRegistry,
}

impl ParDoEvaluator {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self { functions }
    }
}

impl TransformEvaluator for ParDoEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let function_name = super::required_str(node, "fn")?;
        let function = self.functions.get(function_name)?;

        let (main, side_handles) = node.inputs.split_first().ok_or_else(|| {
            RunnerError::pipeline(format!("transform `{}` has no main input", node.name))
        })?;
        let input = ctx.resolve_dataset(main)?.clone();

        let names = side_input_names(node)?;
        if names.len() != side_handles.len() {
            return Err(RunnerError::invalid_property(
                &node.name,
                "side_inputs",
                format!(
                    "{} names given for {} side inputs",
                    names.len(),
                    side_handles.len()
                ),
            ));
        }
        let side_inputs: Vec<(String, SideInput)> = names
            .into_iter()
            .zip(side_handles)
            .map(|(name, handle)| -> Result<(String, SideInput)> {
                Ok((name, ctx.resolve_side_input(handle)?.clone()))
            })
            .collect::<Result<_>>()?;

        let dataset = ctx.session().map_partitions(&input, &|index, partition| {
            let process_ctx = ProcessContext::new(index, &side_inputs);
            let mut out = Vec::with_capacity(partition.len());
            for element in partition {
                out.extend(function.process(element, &process_ctx)?);
            }
            Ok(out)
        })?;
        ctx.bind_dataset(output, dataset)
    }
}

fn side_input_names(node: &TransformNode) -> Result<Vec<String>> {
    match node.property("side_inputs") {
        None => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    RunnerError::invalid_property(&node.name, "side_inputs", "expected strings")
                })
            })
            .collect(),
        Some(_) => Err(RunnerError::invalid_property(
            &node.name,
            "side_inputs",
            "expected an array of names",
        )),
    }
}
