//! Built-in transform evaluators: one per operation kind.

pub mod combine;
pub mod create;
pub mod flatten;
pub mod group_by_key;
pub mod par_do;
pub mod text_io;
pub mod view;

use crate::error::{Result, RunnerError};
use crate::model::{DatasetHandle, TransformNode};

/// The output single-output operations bind.
fn main_output(node: &TransformNode) -> Result<&DatasetHandle> {
    node.main_output()
        .ok_or_else(|| RunnerError::pipeline(format!("transform `{}` declares no output", node.name)))
}

/// The only input of a one-input operation.
fn single_input(node: &TransformNode) -> Result<&DatasetHandle> {
    match node.inputs.as_slice() {
        [input] => Ok(input),
        inputs => Err(RunnerError::pipeline(format!(
            "transform `{}` ({}) takes one input, found {}",
            node.name,
            node.kind,
            inputs.len()
        ))),
    }
}

fn required_str<'a>(node: &'a TransformNode, key: &str) -> Result<&'a str> {
    match node.property(key) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(_) => Err(RunnerError::invalid_property(&node.name, key, "expected a string")),
        None => Err(RunnerError::invalid_property(&node.name, key, "missing")),
    }
}

fn optional_str<'a>(node: &'a TransformNode, key: &str) -> Result<Option<&'a str>> {
    match node.property(key) {
        None => Ok(None),
        Some(_) => required_str(node, key).map(Some),
    }
}

/// Partition count from the `partitions` property, if set.
fn partitions(node: &TransformNode) -> Result<Option<usize>> {
    match node.property("partitions") {
        None => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => Ok(Some(n as usize)),
            _ => Err(RunnerError::invalid_property(
                &node.name,
                "partitions",
                "expected a positive integer",
            )),
        },
    }
}
