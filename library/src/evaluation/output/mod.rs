//! Physical results bound to dataset handles during a run.

mod physical_result;

pub use physical_result::{PhysicalResult, SideInput, ViewKind};
