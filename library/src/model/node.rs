use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handle::{DatasetHandle, OperationKind};

/// Operation parameters, keyed by property name.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "node_type")]
pub enum Node {
    Composite(CompositeNode),
    Transform(TransformNode),
}

impl Node {
    /// Get the ID of this node
    pub fn id(&self) -> Uuid {
        match self {
            Node::Composite(c) => c.id,
            Node::Transform(t) => t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Composite(c) => &c.name,
            Node::Transform(t) => &t.name,
        }
    }
}

/// A grouping of other nodes. Never dispatched to an evaluator.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CompositeNode {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Uuid>,
}

impl CompositeNode {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            children: Vec::new(),
        }
    }
}

/// A primitive operation: reads `inputs`, produces `outputs`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TransformNode {
    pub id: Uuid,
    pub name: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub inputs: Vec<DatasetHandle>,
    #[serde(default)]
    pub outputs: Vec<DatasetHandle>,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl TransformNode {
    /// The first output, which single-output operations bind.
    pub fn main_output(&self) -> Option<&DatasetHandle> {
        self.outputs.first()
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for TransformNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.kind)
    }
}
