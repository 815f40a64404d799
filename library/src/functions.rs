//! User functions applied element-wise by `par_do` transforms.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RunnerError};
use crate::evaluation::output::SideInput;
use crate::model::Value;

/// An element-wise function: one input element to zero or more outputs.
///
/// Runs on worker threads, possibly many partitions at once.
pub trait DoFn: Send + Sync {
    fn process(&self, element: &Value, ctx: &ProcessContext<'_>) -> Result<Vec<Value>>;
}

impl<F> DoFn for F
where
    F: Fn(&Value, &ProcessContext<'_>) -> Result<Vec<Value>> + Send + Sync,
{
    fn process(&self, element: &Value, ctx: &ProcessContext<'_>) -> Result<Vec<Value>> {
        self(element, ctx)
    }
}

/// What a [`DoFn`] can see besides the element: its partition and side inputs.
pub struct ProcessContext<'a> {
    partition: usize,
    side_inputs: &'a [(String, SideInput)],
}

impl<'a> ProcessContext<'a> {
    pub fn new(partition: usize, side_inputs: &'a [(String, SideInput)]) -> Self {
        Self {
            partition,
            side_inputs,
        }
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    /// All elements of the side input `name`.
    ///
    /// The first access on a worker decodes the broadcast; decode failures
    /// surface as [`RunnerError::Decode`].
    pub fn side_input(&self, name: &str) -> Result<&'a [Value]> {
        let (_, view) = self
            .side_inputs
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| RunnerError::execution(format!("no side input named `{}`", name)))?;
        Ok(view.elements()?)
    }

    /// The single element of the side input `name`.
    pub fn singleton(&self, name: &str) -> Result<&'a Value> {
        match self.side_input(name)? {
            [value] => Ok(value),
            other => Err(RunnerError::execution(format!(
                "side input `{}` holds {} elements, expected exactly one",
                name,
                other.len()
            ))),
        }
    }
}

/// Named [`DoFn`]s available to `par_do` transforms.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn DoFn>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a function. Returns `true` if one was replaced.
    pub fn register(&mut self, name: &str, function: Arc<dyn DoFn>) -> bool {
        self.functions.insert(name.to_string(), function).is_some()
    }

    pub fn register_fn<F>(&mut self, name: &str, function: F) -> bool
    where
        F: Fn(&Value, &ProcessContext<'_>) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(function))
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DoFn>> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownFunction(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Broadcast;
    use crate::broadcast::BroadcastValue;
    use crate::codec::{BincodeCodec, Codec, CodecContext};
    use crate::evaluation::output::ViewKind;

    fn view(kind: ViewKind, values: Vec<Value>) -> SideInput {
        let codec: Arc<dyn Codec<Vec<Value>>> = Arc::new(BincodeCodec::new());
        let bytes = codec.encode(&values, CodecContext::Outer).unwrap();
        SideInput::new(kind, BroadcastValue::new(Broadcast::new(0, bytes), codec))
    }

    #[test]
    fn test_registered_closure_runs() {
        let mut functions = FunctionRegistry::new();
        functions.register_fn("negate", |v, _| Ok(vec![Value::from(-v.as_int().unwrap_or(0))]));
        let f = functions.get("negate").unwrap();
        let ctx = ProcessContext::new(0, &[]);
        assert_eq!(f.process(&Value::from(3), &ctx).unwrap(), vec![Value::from(-3)]);
    }

    #[test]
    fn test_unknown_function() {
        let functions = FunctionRegistry::new();
        assert!(matches!(
            functions.get("missing").err().unwrap(),
            RunnerError::UnknownFunction(name) if name == "missing"
        ));
    }

    #[test]
    fn test_side_input_lookup() {
        let side = vec![
            ("factor".to_string(), view(ViewKind::Singleton, vec![Value::from(10)])),
            ("words".to_string(), view(ViewKind::Iterable, vec![Value::from("a"), Value::from("b")])),
        ];
        let ctx = ProcessContext::new(2, &side);
        assert_eq!(ctx.partition(), 2);
        assert_eq!(ctx.singleton("factor").unwrap(), &Value::from(10));
        assert_eq!(ctx.side_input("words").unwrap().len(), 2);
        assert!(ctx.singleton("words").is_err());
        assert!(ctx.side_input("missing").is_err());
    }
}
