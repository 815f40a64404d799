//! Logical pipeline model: values, dataset handles, nodes and the DAG itself.

pub mod graph_analysis;
pub mod handle;
pub mod node;
pub mod pipeline;
pub mod value;

pub use graph_analysis::PipelineVisitor;
pub use handle::{DatasetHandle, MAIN_OUTPUT, OperationKind};
pub use node::{CompositeNode, Node, PropertyMap, TransformNode};
pub use pipeline::Pipeline;
pub use value::Value;
