//! Translation core: evaluation context, evaluator registry and the runner.
//!
//! The runner walks a pipeline in dependency order and hands every primitive
//! transform to the evaluator registered for its operation kind. Evaluators
//! read their inputs from, and bind their outputs into, the run's
//! `EvaluationContext`.

pub mod context;
pub mod engine;
pub mod evaluator;
pub mod evaluators;
pub mod output;
pub mod registry;
