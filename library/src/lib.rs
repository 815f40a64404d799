//! Runs logical dataflow pipelines on a distributed-compute backend.
//!
//! A [`Pipeline`] is a DAG of transforms over symbolic [`DatasetHandle`]s. The
//! [`PipelineRunner`] walks it in dependency order and dispatches every
//! primitive transform to the [`TransformEvaluator`] registered for its
//! [`OperationKind`]; evaluators turn handles into backend-side results stored
//! in the run's [`EvaluationContext`].

pub mod backend;
pub mod broadcast;
pub mod codec;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod functions;
pub mod model;

pub use backend::{BackendSession, Dataset, LocalSession};
pub use broadcast::BroadcastValue;
pub use config::RunnerOptions;
pub use error::{DecodeError, EncodeError, RunnerError};
pub use evaluation::context::{EvaluationContext, EvaluationResult};
pub use evaluation::engine::PipelineRunner;
pub use evaluation::evaluator::{TransformEvaluator, evaluator_fn};
pub use evaluation::output::{PhysicalResult, SideInput, ViewKind};
pub use evaluation::registry::EvaluatorRegistry;
pub use functions::{DoFn, FunctionRegistry, ProcessContext};
pub use model::{DatasetHandle, OperationKind, Pipeline, PropertyMap, TransformNode, Value};
