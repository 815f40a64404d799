//! Functions available to `par_do` transforms run from the command line.

use dataflow_runner::{FunctionRegistry, RunnerError, Value};

pub fn builtin_functions() -> FunctionRegistry {
    let mut functions = FunctionRegistry::new();
    functions.register_fn("identity", |element, _| Ok(vec![element.clone()]));
    functions.register_fn("split_words", |element, _| {
        let line = element.as_str().ok_or_else(|| {
            RunnerError::execution(format!("split_words expects strings, got {}", element))
        })?;
        Ok(line.split_whitespace().map(Value::from).collect())
    });
    functions.register_fn("to_pair_one", |element, _| {
        Ok(vec![Value::pair(element.clone(), 1)])
    });
    functions.register_fn("format_kv", |element, _| {
        let (key, value) = element.as_pair().ok_or_else(|| {
            RunnerError::execution(format!("format_kv expects pairs, got {}", element))
        })?;
        Ok(vec![Value::from(format!("{}: {}", key, value))])
    });
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataflow_runner::{DoFn, ProcessContext};

    fn apply(name: &str, element: Value) -> Result<Vec<Value>, RunnerError> {
        let ctx = ProcessContext::new(0, &[]);
        builtin_functions().get(name)?.process(&element, &ctx)
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            apply("split_words", Value::from("  to be  or ")).unwrap(),
            vec![Value::from("to"), Value::from("be"), Value::from("or")]
        );
        assert!(apply("split_words", Value::from(3)).is_err());
    }

    #[test]
    fn test_format_kv() {
        assert_eq!(
            apply("format_kv", Value::pair("fox", 2)).unwrap(),
            vec![Value::from("fox: 2")]
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(
            builtin_functions().names(),
            vec!["format_kv", "identity", "split_words", "to_pair_one"]
        );
    }
}
