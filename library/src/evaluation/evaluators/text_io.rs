//! Evaluators for read_text and write_text nodes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use super::{main_output, partitions, required_str, single_input};
use crate::error::Result;
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::model::{TransformNode, Value};

/// One `Str` element per line of the file at `path`.
pub struct ReadTextEvaluator;

impl TransformEvaluator for ReadTextEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let path = required_str(node, "path")?;

        let contents = fs::read_to_string(path)?;
        let lines: Vec<Value> = contents.lines().map(Value::from).collect();
        info!("Read {} lines from {}", lines.len(), path);

        let partitions = partitions(node)?.unwrap_or_else(|| ctx.session().default_parallelism());
        let dataset = ctx.session().parallelize(lines, partitions)?;
        ctx.bind_dataset(output, dataset)
    }
}

/// Writes one line per element to `path`: strings verbatim, anything else as JSON.
///
/// Binds its input unchanged under its output, if it declares one.
pub struct WriteTextEvaluator;

impl TransformEvaluator for WriteTextEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let path = Path::new(required_str(node, "path")?);
        let input = ctx.resolve_dataset(single_input(node)?)?.clone();
        let values = ctx.session().collect(&input)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        for value in &values {
            writeln!(writer, "{}", value)?;
        }
        writer.flush()?;
        info!("Wrote {} lines to {}", values.len(), path.display());

        if !node.outputs.is_empty() {
            ctx.bind_dataset(main_output(node)?.clone(), input)?;
        }
        Ok(())
    }
}
