//! PhysicalResult: the backend-side realization of a dataset handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::Dataset;
use crate::broadcast::BroadcastValue;
use crate::error::DecodeError;
use crate::model::Value;

/// What an evaluator binds for one of its outputs.
#[derive(Clone, Debug)]
pub enum PhysicalResult {
    /// A distributed collection.
    Dataset(Dataset),
    /// A dataset materialized once and broadcast to all workers as a side input.
    View(SideInput),
}

impl PhysicalResult {
    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            PhysicalResult::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_side_input(&self) -> Option<&SideInput> {
        match self {
            PhysicalResult::View(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalResult::Dataset(_) => "dataset",
            PhysicalResult::View(_) => "view",
        }
    }
}

impl From<Dataset> for PhysicalResult {
    fn from(dataset: Dataset) -> Self {
        PhysicalResult::Dataset(dataset)
    }
}

/// How a view presents its elements to a consuming function.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Exactly one element.
    Singleton,
    /// All elements, in order.
    Iterable,
}

/// A broadcast side input. Cloning shares the same decoded cache.
#[derive(Clone, Debug)]
pub struct SideInput {
    pub kind: ViewKind,
    pub value: Arc<BroadcastValue<Vec<Value>>>,
}

impl SideInput {
    pub fn new(kind: ViewKind, value: BroadcastValue<Vec<Value>>) -> Self {
        Self {
            kind,
            value: Arc::new(value),
        }
    }

    /// The view's elements, decoding the broadcast on first access.
    pub fn elements(&self) -> Result<&[Value], DecodeError> {
        self.value.value().map(Vec::as_slice)
    }
}
