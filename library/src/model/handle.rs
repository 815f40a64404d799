//! Identities used by the logical pipeline: dataset handles and operation kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the single output of a transform added with `Pipeline::apply`.
pub const MAIN_OUTPUT: &str = "out";

/// Identifies one output of one transform node.
///
/// A handle is purely symbolic: the data it stands for only exists once an
/// evaluator binds a physical result for it in the `EvaluationContext`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetHandle {
    pub node_id: Uuid,
    pub output: String,
}

impl DatasetHandle {
    pub fn new(node_id: Uuid, output: &str) -> Self {
        Self {
            node_id,
            output: output.to_string(),
        }
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.output)
    }
}

/// The operation types the runner knows how to dispatch.
///
/// Dispatch is by exact identity: two kinds match only if they are the same
/// variant (and, for [`OperationKind::Custom`], carry the same name).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    ParDo,
    GroupByKey,
    CombinePerKey,
    CombineGlobally,
    Flatten,
    CreateView,
    ReadText,
    WriteText,
    /// Operation supplied by a plug-in evaluator.
    Custom(String),
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::ParDo => "par_do",
            OperationKind::GroupByKey => "group_by_key",
            OperationKind::CombinePerKey => "combine_per_key",
            OperationKind::CombineGlobally => "combine_globally",
            OperationKind::Flatten => "flatten",
            OperationKind::CreateView => "create_view",
            OperationKind::ReadText => "read_text",
            OperationKind::WriteText => "write_text",
            OperationKind::Custom(name) => return write!(f, "custom:{}", name),
        };
        f.write_str(name)
    }
}
