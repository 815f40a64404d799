//! The logical pipeline: an immutable-once-built DAG of transforms.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handle::{DatasetHandle, MAIN_OUTPUT, OperationKind};
use super::node::{CompositeNode, Node, PropertyMap, TransformNode};
use crate::error::{Result, RunnerError};

/// A logical pipeline.
///
/// Transforms are added through [`Pipeline::apply`], which only accepts inputs
/// that are already produced by an existing transform, so a pipeline built
/// through the API is acyclic by construction. Pipelines loaded from JSON are
/// checked with [`Pipeline::validate`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Pipeline {
    pub name: String,
    pub root: Uuid,
    pub nodes: HashMap<Uuid, Node>,
    /// Composite scopes opened with `begin_composite` (builder state only).
    #[serde(skip)]
    scope: Vec<Uuid>,
}

impl Pipeline {
    pub fn new(name: &str) -> Self {
        let root = CompositeNode::new(name);
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, Node::Composite(root));
        Self {
            name: name.to_string(),
            root: root_id,
            nodes,
            scope: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let pipeline: Pipeline = serde_json::from_str(json)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a single-output transform to the current composite.
    pub fn apply(
        &mut self,
        name: &str,
        kind: OperationKind,
        inputs: &[DatasetHandle],
        properties: PropertyMap,
    ) -> Result<DatasetHandle> {
        let mut outputs = self.apply_multi(name, kind, inputs, &[MAIN_OUTPUT], properties)?;
        Ok(outputs.remove(0))
    }

    /// Add a transform with several named outputs to the current composite.
    pub fn apply_multi(
        &mut self,
        name: &str,
        kind: OperationKind,
        inputs: &[DatasetHandle],
        outputs: &[&str],
        properties: PropertyMap,
    ) -> Result<Vec<DatasetHandle>> {
        for input in inputs {
            if self.producer_of(input).is_none() {
                return Err(RunnerError::pipeline(format!(
                    "transform `{}` reads {} which no transform produces",
                    name, input
                )));
            }
        }
        let unique: HashSet<&&str> = outputs.iter().collect();
        if unique.len() != outputs.len() {
            return Err(RunnerError::pipeline(format!(
                "transform `{}` declares duplicate outputs",
                name
            )));
        }

        let id = Uuid::new_v4();
        let outputs: Vec<DatasetHandle> = outputs
            .iter()
            .map(|output| DatasetHandle::new(id, output))
            .collect();
        let node = TransformNode {
            id,
            name: name.to_string(),
            kind,
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
            properties,
        };
        self.add_child(Node::Transform(node))?;
        Ok(outputs)
    }

    /// Open a composite; subsequent transforms are added inside it.
    pub fn begin_composite(&mut self, name: &str) -> Result<Uuid> {
        let composite = CompositeNode::new(name);
        let id = composite.id;
        self.add_child(Node::Composite(composite))?;
        self.scope.push(id);
        Ok(id)
    }

    pub fn end_composite(&mut self) -> Result<()> {
        self.scope
            .pop()
            .map(|_| ())
            .ok_or_else(|| RunnerError::pipeline("end_composite called without an open composite"))
    }

    fn add_child(&mut self, node: Node) -> Result<()> {
        let parent_id = self.scope.last().copied().unwrap_or(self.root);
        let child_id = node.id();
        match self.nodes.get_mut(&parent_id) {
            Some(Node::Composite(parent)) => parent.children.push(child_id),
            _ => {
                return Err(RunnerError::pipeline(format!(
                    "composite {} not found",
                    parent_id
                )));
            }
        }
        self.nodes.insert(child_id, node);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_transform(&self, id: Uuid) -> Option<&TransformNode> {
        match self.nodes.get(&id) {
            Some(Node::Transform(t)) => Some(t),
            _ => None,
        }
    }

    pub fn get_composite(&self, id: Uuid) -> Option<&CompositeNode> {
        match self.nodes.get(&id) {
            Some(Node::Composite(c)) => Some(c),
            _ => None,
        }
    }

    /// The transform that produces `handle`, if any.
    pub fn producer_of(&self, handle: &DatasetHandle) -> Option<&TransformNode> {
        self.get_transform(handle.node_id)
            .filter(|t| t.outputs.contains(handle))
    }

    /// All transforms, in no particular order.
    pub fn transforms(&self) -> impl Iterator<Item = &TransformNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Transform(t) => Some(t),
            Node::Composite(_) => None,
        })
    }

    /// Handles that no transform in the pipeline reads.
    pub fn terminal_outputs(&self) -> Vec<DatasetHandle> {
        let consumed: HashSet<&DatasetHandle> =
            self.transforms().flat_map(|t| t.inputs.iter()).collect();
        let mut terminal: Vec<DatasetHandle> = self
            .transforms()
            .flat_map(|t| t.outputs.iter())
            .filter(|h| !consumed.contains(h))
            .cloned()
            .collect();
        terminal.sort();
        terminal
    }

    /// Check structural invariants.
    ///
    /// Checks:
    /// - The root exists and is a composite
    /// - Every node is the child of exactly one composite and reachable from the root
    /// - Every output handle names its own transform and is declared once
    /// - No transform reads its own output; every input is produced by some transform
    /// - The transforms are acyclic and every composite is dependency-contiguous
    pub fn validate(&self) -> Result<()> {
        if self.get_composite(self.root).is_none() {
            return Err(RunnerError::pipeline(format!(
                "root {} is missing or not a composite",
                self.root
            )));
        }

        let mut parent_count: HashMap<Uuid, usize> = HashMap::new();
        for node in self.nodes.values() {
            if let Node::Composite(c) = node {
                for child in &c.children {
                    if !self.nodes.contains_key(child) {
                        return Err(RunnerError::pipeline(format!(
                            "composite `{}` references missing node {}",
                            c.name, child
                        )));
                    }
                    *parent_count.entry(*child).or_default() += 1;
                }
            }
        }
        for (id, node) in &self.nodes {
            let expected = if *id == self.root { 0 } else { 1 };
            let actual = parent_count.get(id).copied().unwrap_or(0);
            if actual != expected {
                return Err(RunnerError::pipeline(format!(
                    "node `{}` has {} parents, expected {}",
                    node.name(),
                    actual,
                    expected
                )));
            }
        }

        // Parent counts alone accept a cycle of composites detached from the root.
        let mut reachable = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                if let Some(Node::Composite(c)) = self.get(id) {
                    stack.extend(c.children.iter().copied());
                }
            }
        }
        let unreachable = self
            .nodes
            .iter()
            .find_map(|(id, node)| (!reachable.contains(id)).then_some(node));
        if let Some(node) = unreachable {
            return Err(RunnerError::pipeline(format!(
                "node `{}` is not reachable from the root",
                node.name()
            )));
        }

        let mut produced = HashSet::new();
        for t in self.transforms() {
            for output in &t.outputs {
                if output.node_id != t.id {
                    return Err(RunnerError::pipeline(format!(
                        "transform `{}` declares output {} owned by another node",
                        t.name, output
                    )));
                }
                if !produced.insert(output) {
                    return Err(RunnerError::pipeline(format!(
                        "output {} is declared twice",
                        output
                    )));
                }
            }
        }
        for t in self.transforms() {
            if let Some(own) = t.inputs.iter().find(|h| t.outputs.contains(h)) {
                return Err(RunnerError::pipeline(format!(
                    "transform `{}` reads its own output {}",
                    t.name, own
                )));
            }
            if let Some(missing) = t.inputs.iter().find(|h| !produced.contains(h)) {
                return Err(RunnerError::pipeline(format!(
                    "transform `{}` reads {} which no transform produces",
                    t.name, missing
                )));
            }
        }

        self.check_acyclic()?;
        // Acyclic transforms can still fail to order when a nested composite
        // interleaves with its siblings.
        self.topological_order().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rejects_unknown_input() {
        let mut p = Pipeline::new("p");
        let stray = DatasetHandle::new(Uuid::new_v4(), MAIN_OUTPUT);
        let err = p
            .apply("map", OperationKind::ParDo, &[stray], PropertyMap::new())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Pipeline(_)));
    }

    #[test]
    fn test_apply_records_producer() {
        let mut p = Pipeline::new("p");
        let out = p
            .apply("source", OperationKind::Create, &[], PropertyMap::new())
            .unwrap();
        assert_eq!(p.producer_of(&out).unwrap().name, "source");
        assert_eq!(p.terminal_outputs(), vec![out]);
    }

    #[test]
    fn test_apply_multi_rejects_duplicate_outputs() {
        let mut p = Pipeline::new("p");
        let err = p
            .apply_multi("split", OperationKind::ParDo, &[], &["a", "a"], PropertyMap::new())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Pipeline(_)));
    }

    #[test]
    fn test_end_composite_without_begin_fails() {
        let mut p = Pipeline::new("p");
        assert!(p.end_composite().is_err());
        p.begin_composite("group").unwrap();
        assert!(p.end_composite().is_ok());
        assert!(p.end_composite().is_err());
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let mut p = Pipeline::new("p");
        let a = p
            .apply("a", OperationKind::Create, &[], PropertyMap::new())
            .unwrap();
        p.begin_composite("inner").unwrap();
        p.apply("b", OperationKind::ParDo, &[a], PropertyMap::new())
            .unwrap();
        p.end_composite().unwrap();

        let loaded = Pipeline::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(loaded.nodes, p.nodes);
        assert_eq!(loaded.root, p.root);
    }

    #[test]
    fn test_validate_detects_cycle() {
        let mut p = Pipeline::new("p");
        let a = p
            .apply("a", OperationKind::Create, &[], PropertyMap::new())
            .unwrap();
        let b = p
            .apply("b", OperationKind::ParDo, &[a.clone()], PropertyMap::new())
            .unwrap();
        // Rewire a to read b's output, which is only possible by editing the graph.
        if let Some(Node::Transform(t)) = p.nodes.get_mut(&a.node_id) {
            t.inputs.push(b);
        }
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_self_read_after_json_roundtrip() {
        let mut p = Pipeline::new("p");
        let a = p
            .apply("a", OperationKind::Create, &[], PropertyMap::new())
            .unwrap();
        if let Some(Node::Transform(t)) = p.nodes.get_mut(&a.node_id) {
            t.inputs.push(a.clone());
        }
        let err = Pipeline::from_json(&p.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, RunnerError::Pipeline(_)));
        assert!(err.to_string().contains("reads its own output"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_detached_composite_cycle() {
        let mut p = Pipeline::new("p");
        let mut c1 = CompositeNode::new("c1");
        let mut c2 = CompositeNode::new("c2");
        let hidden_id = Uuid::new_v4();
        let hidden_out = DatasetHandle::new(hidden_id, MAIN_OUTPUT);
        let hidden = TransformNode {
            id: hidden_id,
            name: "hidden".to_string(),
            kind: OperationKind::Create,
            inputs: Vec::new(),
            outputs: vec![hidden_out.clone()],
            properties: PropertyMap::new(),
        };
        c1.children = vec![c2.id, hidden.id];
        c2.children = vec![c1.id];
        p.nodes.insert(hidden.id, Node::Transform(hidden));
        p.nodes.insert(c1.id, Node::Composite(c1));
        p.nodes.insert(c2.id, Node::Composite(c2));
        p.apply("reader", OperationKind::ParDo, &[hidden_out], PropertyMap::new())
            .unwrap();

        let err = Pipeline::from_json(&p.to_json().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not reachable from the root"), "{}", err);
    }

    #[test]
    fn test_validate_detects_orphan() {
        let mut p = Pipeline::new("p");
        let orphan = CompositeNode::new("orphan");
        p.nodes.insert(orphan.id, Node::Composite(orphan));
        assert!(p.validate().is_err());
    }
}
