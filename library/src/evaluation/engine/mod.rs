//! Pipeline runner: drives one all-or-nothing evaluation of a pipeline.

use std::sync::Arc;

use log::{debug, error, info};

use super::context::{EvaluationContext, EvaluationResult, TraversalPosition};
use super::registry::EvaluatorRegistry;
use crate::backend::{BackendSession, LocalSession};
use crate::config::RunnerOptions;
use crate::error::{Result, RunnerError};
use crate::functions::FunctionRegistry;
use crate::model::{CompositeNode, DatasetHandle, Pipeline, PipelineVisitor, TransformNode};

/// Translates a pipeline into backend work and runs it.
///
/// To run a pipeline on the local backend with two worker threads:
///
/// ```no_run
/// use dataflow_runner::{FunctionRegistry, Pipeline, PipelineRunner, RunnerOptions};
///
/// # fn main() -> Result<(), dataflow_runner::RunnerError> {
/// let pipeline = Pipeline::new("example");
/// let runner = PipelineRunner::create(
///     RunnerOptions::default().with_master("local[2]"),
///     FunctionRegistry::new(),
/// );
/// let result = runner.run(&pipeline)?;
/// # Ok(())
/// # }
/// ```
pub struct PipelineRunner {
    options: RunnerOptions,
    registry: EvaluatorRegistry,
}

impl PipelineRunner {
    /// Create a runner with all built-in evaluators; `functions` backs `par_do`.
    pub fn create(options: RunnerOptions, functions: FunctionRegistry) -> Self {
        Self::with_registry(options, EvaluatorRegistry::with_builtin_evaluators(functions))
    }

    pub fn with_registry(options: RunnerOptions, registry: EvaluatorRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    /// Register extra or replacement evaluators before running.
    pub fn registry_mut(&mut self) -> &mut EvaluatorRegistry {
        &mut self.registry
    }

    /// Run `pipeline` on a new local session built from the runner's options.
    pub fn run<'p>(&self, pipeline: &'p Pipeline) -> Result<EvaluationResult<'p>> {
        let session = LocalSession::new(&self.options)?;
        self.run_with_session(pipeline, Arc::new(session))
    }

    /// Run `pipeline` on an existing backend session.
    ///
    /// Every transform is evaluated exactly once, after all transforms producing
    /// its inputs. The first failure aborts the run.
    pub fn run_with_session<'p>(
        &self,
        pipeline: &'p Pipeline,
        session: Arc<dyn BackendSession>,
    ) -> Result<EvaluationResult<'p>> {
        pipeline.validate()?;
        info!(
            "Running pipeline '{}' as job '{}' on {}",
            pipeline.name,
            session.job_name(),
            session.master()
        );

        let mut evaluator = Evaluator {
            registry: &self.registry,
            ctx: EvaluationContext::new(session, pipeline),
        };
        pipeline.traverse_topologically(&mut evaluator)?;

        info!("Pipeline '{}' finished", pipeline.name);
        Ok(evaluator.ctx.into_result())
    }
}

/// Visitor dispatching each primitive transform to its evaluator.
struct Evaluator<'r, 'p> {
    registry: &'r EvaluatorRegistry,
    ctx: EvaluationContext<'p>,
}

impl PipelineVisitor for Evaluator<'_, '_> {
    fn enter_composite(&mut self, node: &CompositeNode) -> Result<()> {
        debug!("Entering composite '{}'", node.name);
        Ok(())
    }

    fn leave_composite(&mut self, node: &CompositeNode) -> Result<()> {
        debug!("Leaving composite '{}'", node.name);
        Ok(())
    }

    fn visit_transform(&mut self, node: &TransformNode, position: usize) -> Result<()> {
        self.ctx.set_position(TraversalPosition {
            index: position,
            transform: node.name.clone(),
            kind: node.kind.clone(),
        });
        info!("Evaluating {} (#{})", node, position);

        self.registry
            .lookup(&node.kind)
            .and_then(|evaluator| evaluator.evaluate(node, &mut self.ctx))
            .map_err(|source| {
                error!("Evaluating {} (#{}) failed: {}", node, position, source);
                RunnerError::Transform {
                    name: node.name.clone(),
                    kind: node.kind.clone(),
                    position,
                    source: Box::new(source),
                }
            })
    }

    fn visit_value(&mut self, handle: &DatasetHandle, producer: &TransformNode) -> Result<()> {
        if !self.ctx.is_bound(handle) {
            debug!("Transform '{}' left output {} unbound", producer.name, handle);
        }
        Ok(())
    }
}
