//! Dependency ordering and topological traversal of a pipeline.
//!
//! Ordering is hierarchical: within each composite, children are sorted with
//! Kahn's algorithm, treating a nested composite as a single unit that depends
//! on whatever its descendants read from outside it. The resulting visit order
//! of transforms is a valid topological order of the whole DAG.

use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use super::handle::DatasetHandle;
use super::node::{CompositeNode, Node, TransformNode};
use super::pipeline::Pipeline;
use crate::error::{Result, RunnerError};

/// Callbacks invoked while walking a pipeline in dependency order.
///
/// Returning an error from any callback stops the traversal immediately.
pub trait PipelineVisitor {
    fn enter_composite(&mut self, _node: &CompositeNode) -> Result<()> {
        Ok(())
    }

    fn leave_composite(&mut self, _node: &CompositeNode) -> Result<()> {
        Ok(())
    }

    /// Visit a primitive transform. `position` counts transforms visited so far.
    fn visit_transform(&mut self, node: &TransformNode, position: usize) -> Result<()>;

    /// Called once for every output of a transform, right after the transform itself.
    fn visit_value(&mut self, _handle: &DatasetHandle, _producer: &TransformNode) -> Result<()> {
        Ok(())
    }
}

impl Pipeline {
    /// Walk every node once in dependency order.
    ///
    /// Composites (the root included) are entered and left around their
    /// children but are never passed to `visit_transform`.
    pub fn traverse_topologically(&self, visitor: &mut dyn PipelineVisitor) -> Result<()> {
        let mut position = 0;
        self.traverse_node(self.root, visitor, &mut position)
    }

    /// Transform IDs in the order `traverse_topologically` visits them.
    pub fn topological_order(&self) -> Result<Vec<Uuid>> {
        struct Collect(Vec<Uuid>);

        impl PipelineVisitor for Collect {
            fn visit_transform(&mut self, node: &TransformNode, _position: usize) -> Result<()> {
                self.0.push(node.id);
                Ok(())
            }
        }

        let mut collect = Collect(Vec::new());
        self.traverse_topologically(&mut collect)?;
        Ok(collect.0)
    }

    fn traverse_node(
        &self,
        id: Uuid,
        visitor: &mut dyn PipelineVisitor,
        position: &mut usize,
    ) -> Result<()> {
        match self.get(id) {
            Some(Node::Composite(composite)) => {
                visitor.enter_composite(composite)?;
                for child in self.ordered_children(composite)? {
                    self.traverse_node(child, visitor, position)?;
                }
                visitor.leave_composite(composite)
            }
            Some(Node::Transform(transform)) => {
                visitor.visit_transform(transform, *position)?;
                *position += 1;
                for output in &transform.outputs {
                    visitor.visit_value(output, transform)?;
                }
                Ok(())
            }
            None => Err(RunnerError::pipeline(format!("node {} not found", id))),
        }
    }

    /// Sort a composite's children so that producers come before consumers.
    ///
    /// Returns Err if the children depend on each other cyclically.
    fn ordered_children(&self, composite: &CompositeNode) -> Result<Vec<Uuid>> {
        let children = &composite.children;

        // Which child (by index) produces each handle inside this composite.
        let mut producer_index: HashMap<&DatasetHandle, usize> = HashMap::new();
        let mut consumed: Vec<Vec<&DatasetHandle>> = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            let mut inputs = Vec::new();
            for transform in self.subtree_transforms(*child) {
                for output in &transform.outputs {
                    producer_index.insert(output, index);
                }
                inputs.extend(transform.inputs.iter());
            }
            consumed.push(inputs);
        }

        let mut in_degree = vec![0usize; children.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); children.len()];
        for (index, inputs) in consumed.iter().enumerate() {
            let upstream: HashSet<usize> = inputs
                .iter()
                .filter_map(|h| producer_index.get(h).copied())
                .filter(|&p| p != index)
                .collect();
            for p in upstream {
                dependents[p].push(index);
                in_degree[index] += 1;
            }
        }

        // Kahn's algorithm; the ready set is ordered by insertion index so the
        // result is deterministic.
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| i)
            .collect();
        let mut sorted = Vec::with_capacity(children.len());

        while let Some(index) = ready.pop_first() {
            sorted.push(children[index]);
            for &next in &dependents[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if sorted.len() != children.len() {
            let stuck: Vec<&str> = children
                .iter()
                .filter(|id| !sorted.contains(id))
                .filter_map(|id| self.get_composite(*id))
                .map(|c| c.name.as_str())
                .collect();
            if stuck.is_empty() {
                return Err(RunnerError::pipeline(format!(
                    "cycle detected in composite `{}`",
                    composite.name
                )));
            }
            // The transforms may still be acyclic: a nested composite that both
            // feeds and reads a sibling cannot be placed as one unit.
            return Err(RunnerError::pipeline(format!(
                "cannot order children of composite `{}`: nested composite(s) `{}` both feed and depend on a sibling; composites must be dependency-contiguous",
                composite.name,
                stuck.join("`, `")
            )));
        }
        Ok(sorted)
    }

    /// Fails if the transforms, ignoring composite structure, depend on each
    /// other cyclically. A transform reading its own output counts as a cycle.
    pub(crate) fn check_acyclic(&self) -> Result<()> {
        let transforms: Vec<&TransformNode> = self.transforms().collect();
        let index_of: HashMap<Uuid, usize> = transforms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();

        let mut in_degree = vec![0usize; transforms.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); transforms.len()];
        for (index, t) in transforms.iter().enumerate() {
            let upstream: HashSet<usize> = t
                .inputs
                .iter()
                .filter_map(|h| index_of.get(&h.node_id).copied())
                .collect();
            for p in upstream {
                dependents[p].push(index);
                in_degree[index] += 1;
            }
        }

        let mut ready: Vec<usize> = (0..transforms.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(index) = ready.pop() {
            visited += 1;
            for &next in &dependents[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if visited != transforms.len() {
            let mut members: Vec<&str> = transforms
                .iter()
                .zip(&in_degree)
                .filter(|(_, deg)| **deg > 0)
                .map(|(t, _)| t.name.as_str())
                .collect();
            members.sort();
            return Err(RunnerError::pipeline(format!(
                "cycle detected: transforms `{}` cannot be ordered",
                members.join("`, `")
            )));
        }
        Ok(())
    }

    /// All transforms at or below `id`.
    fn subtree_transforms(&self, id: Uuid) -> Vec<&TransformNode> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            match self.get(current) {
                Some(Node::Transform(t)) => found.push(t),
                Some(Node::Composite(c)) => stack.extend(c.children.iter().copied()),
                None => {}
            }
        }
        found
    }
}
