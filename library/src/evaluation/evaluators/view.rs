//! Evaluator for create_view nodes: turns a dataset into a broadcast side input.

use std::sync::Arc;

use log::info;

use super::{main_output, optional_str, single_input};
use crate::broadcast::BroadcastValue;
use crate::codec::{BincodeCodec, Codec};
use crate::error::{Result, RunnerError};
use crate::evaluation::context::EvaluationContext;
use crate::evaluation::evaluator::TransformEvaluator;
use crate::evaluation::output::{PhysicalResult, SideInput, ViewKind};
use crate::model::{TransformNode, Value};

/// Collects its input on the driver, encodes it once and broadcasts the bytes.
///
/// The `view` property selects `singleton` (exactly one element) or
/// `iterable` (the default).
pub struct CreateViewEvaluator;

impl TransformEvaluator for CreateViewEvaluator {
    fn evaluate(&self, node: &TransformNode, ctx: &mut EvaluationContext<'_>) -> Result<()> {
        let output = main_output(node)?.clone();
        let kind = match optional_str(node, "view")? {
            None | Some("iterable") => ViewKind::Iterable,
            Some("singleton") => ViewKind::Singleton,
            Some(other) => {
                return Err(RunnerError::invalid_property(
                    &node.name,
                    "view",
                    format!("unknown view kind `{}`", other),
                ));
            }
        };

        let input = ctx.resolve_dataset(single_input(node)?)?.clone();
        let values = ctx.session().collect(&input)?;
        if kind == ViewKind::Singleton && values.len() != 1 {
            return Err(RunnerError::execution(format!(
                "singleton view `{}` needs exactly one element, found {}",
                node.name,
                values.len()
            )));
        }

        let codec: Arc<dyn Codec<Vec<Value>>> = Arc::new(BincodeCodec::new());
        let broadcast = BroadcastValue::create(ctx.session(), &values, codec)?;
        info!(
            "Broadcast view `{}` as blob {} ({} elements)",
            node.name,
            broadcast.broadcast().id(),
            values.len()
        );
        ctx.bind(output, PhysicalResult::View(SideInput::new(kind, broadcast)))
    }
}
