//! Integration tests for the built-in evaluator catalog.

use std::fs;

use dataflow_runner::{
    FunctionRegistry, OperationKind, Pipeline, PipelineRunner, PropertyMap, RunnerError,
    RunnerOptions, Value,
};
use serde_json::json;

fn props(pairs: &[(&str, serde_json::Value)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn functions() -> FunctionRegistry {
    let mut functions = FunctionRegistry::new();
    functions.register_fn("split_words", |element, _| {
        Ok(element
            .as_str()
            .unwrap_or_default()
            .split_whitespace()
            .map(Value::from)
            .collect())
    });
    functions.register_fn("pair_with_one", |element, _| {
        Ok(vec![Value::pair(element.clone(), 1)])
    });
    functions.register_fn("scale", |element, ctx| {
        let factor = ctx.singleton("factor")?.as_int().unwrap_or(1);
        Ok(vec![Value::from(element.as_int().unwrap_or(0) * factor)])
    });
    functions.register_fn("keep_allowed", |element, ctx| {
        let allowed = ctx.side_input("allowed")?;
        Ok(if allowed.contains(element) {
            vec![element.clone()]
        } else {
            Vec::new()
        })
    });
    functions
}

fn runner() -> PipelineRunner {
    let _ = env_logger::builder().is_test(true).try_init();
    PipelineRunner::create(
        RunnerOptions::default()
            .with_master("local[4]")
            .with_default_parallelism(3),
        functions(),
    )
}

fn sorted(mut values: Vec<Value>) -> Vec<Value> {
    values.sort();
    values
}

#[test]
fn test_word_count_from_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("out").join("counts.txt");
    fs::write(&input, "the quick fox\nthe lazy dog\nthe end\n").unwrap();

    let mut p = Pipeline::new("wordcount");
    let lines = p
        .apply(
            "read",
            OperationKind::ReadText,
            &[],
            props(&[("path", json!(input.to_str().unwrap()))]),
        )
        .unwrap();
    p.begin_composite("count_words").unwrap();
    let words = p
        .apply("split", OperationKind::ParDo, &[lines], props(&[("fn", json!("split_words"))]))
        .unwrap();
    let pairs = p
        .apply("pair", OperationKind::ParDo, &[words], props(&[("fn", json!("pair_with_one"))]))
        .unwrap();
    let counts = p
        .apply(
            "sum",
            OperationKind::CombinePerKey,
            &[pairs],
            props(&[("combiner", json!("sum"))]),
        )
        .unwrap();
    p.end_composite().unwrap();
    p.apply(
        "write",
        OperationKind::WriteText,
        &[counts.clone()],
        props(&[("path", json!(output.to_str().unwrap()))]),
    )
    .unwrap();

    let result = runner().run(&p).unwrap();

    let expected = sorted(vec![
        Value::pair("dog", 1),
        Value::pair("end", 1),
        Value::pair("fox", 1),
        Value::pair("lazy", 1),
        Value::pair("quick", 1),
        Value::pair("the", 3),
    ]);
    assert_eq!(sorted(result.collect(&counts).unwrap()), expected);

    let written = fs::read_to_string(&output).unwrap();
    let mut lines: Vec<&str> = written.lines().collect();
    lines.sort();
    assert_eq!(lines.len(), 6);
    assert!(lines.contains(&r#"{"key":"the","value":3}"#));
}

#[test]
fn test_group_by_key_collects_values_in_order() {
    let mut p = Pipeline::new("group");
    let pairs = p
        .apply(
            "create",
            OperationKind::Create,
            &[],
            props(&[(
                "values",
                json!([
                    {"key": "a", "value": 1},
                    {"key": "b", "value": 2},
                    {"key": "a", "value": 3}
                ]),
            ), ("partitions", json!(1))]),
        )
        .unwrap();
    let grouped = p
        .apply("group", OperationKind::GroupByKey, &[pairs], PropertyMap::new())
        .unwrap();

    let result = runner().run(&p).unwrap();
    assert_eq!(
        sorted(result.collect(&grouped).unwrap()),
        vec![
            Value::pair("a", vec![1, 3]),
            Value::pair("b", vec![2]),
        ]
    );
}

#[test]
fn test_flatten_and_combine_globally() {
    let mut p = Pipeline::new("flatten");
    let left = p
        .apply("left", OperationKind::Create, &[], props(&[("values", json!([1, 2]))]))
        .unwrap();
    let right = p
        .apply("right", OperationKind::Create, &[], props(&[("values", json!([3, 4, 5]))]))
        .unwrap();
    let all = p
        .apply("flatten", OperationKind::Flatten, &[left, right], PropertyMap::new())
        .unwrap();
    let total = p
        .apply(
            "total",
            OperationKind::CombineGlobally,
            &[all.clone()],
            props(&[("combiner", json!("sum"))]),
        )
        .unwrap();
    let count = p
        .apply(
            "count",
            OperationKind::CombineGlobally,
            &[all.clone()],
            props(&[("combiner", json!("count"))]),
        )
        .unwrap();

    let result = runner().run(&p).unwrap();
    assert_eq!(result.collect(&all).unwrap().len(), 5);
    assert_eq!(result.collect(&total).unwrap(), vec![Value::from(15)]);
    assert_eq!(result.collect(&count).unwrap(), vec![Value::from(5)]);
}

#[test]
fn test_side_inputs_through_views() {
    let mut p = Pipeline::new("side-inputs");
    let factor = p
        .apply("factor", OperationKind::Create, &[], props(&[("values", json!([10]))]))
        .unwrap();
    let factor_view = p
        .apply(
            "factor_view",
            OperationKind::CreateView,
            &[factor],
            props(&[("view", json!("singleton"))]),
        )
        .unwrap();
    let allowed = p
        .apply("allowed", OperationKind::Create, &[], props(&[("values", json!([10, 30]))]))
        .unwrap();
    let allowed_view = p
        .apply("allowed_view", OperationKind::CreateView, &[allowed], PropertyMap::new())
        .unwrap();
    let numbers = p
        .apply(
            "numbers",
            OperationKind::Create,
            &[],
            props(&[("values", json!([1, 2, 3, 4, 5, 6]))]),
        )
        .unwrap();
    let scaled = p
        .apply(
            "scale",
            OperationKind::ParDo,
            &[numbers, factor_view.clone()],
            props(&[("fn", json!("scale")), ("side_inputs", json!(["factor"]))]),
        )
        .unwrap();
    let kept = p
        .apply(
            "keep",
            OperationKind::ParDo,
            &[scaled.clone(), allowed_view],
            props(&[("fn", json!("keep_allowed")), ("side_inputs", json!(["allowed"]))]),
        )
        .unwrap();

    let result = runner().run(&p).unwrap();
    assert_eq!(
        result.collect(&scaled).unwrap(),
        (1..=6).map(|i| Value::from(i * 10)).collect::<Vec<_>>()
    );
    assert_eq!(
        result.collect(&kept).unwrap(),
        vec![Value::from(10), Value::from(30)]
    );

    let view = result.get(&factor_view).unwrap().as_side_input().unwrap();
    assert!(view.value.is_decoded());
}

#[test]
fn test_singleton_view_with_many_elements_fails() {
    let mut p = Pipeline::new("bad-view");
    let many = p
        .apply("many", OperationKind::Create, &[], props(&[("values", json!([1, 2]))]))
        .unwrap();
    p.apply(
        "view",
        OperationKind::CreateView,
        &[many],
        props(&[("view", json!("singleton"))]),
    )
    .unwrap();

    let err = runner().run(&p).err().unwrap();
    assert!(matches!(err.root_cause(), RunnerError::Execution(_)), "{}", err);
}

#[test]
fn test_unknown_function_aborts_run() {
    let mut p = Pipeline::new("unknown-fn");
    let numbers = p
        .apply("numbers", OperationKind::Create, &[], props(&[("values", json!([1]))]))
        .unwrap();
    p.apply("map", OperationKind::ParDo, &[numbers], props(&[("fn", json!("nope"))]))
        .unwrap();

    let err = runner().run(&p).err().unwrap();
    assert!(matches!(
        err.root_cause(),
        RunnerError::UnknownFunction(name) if name == "nope"
    ));
}

#[test]
fn test_view_as_main_input_is_a_type_mismatch() {
    let mut p = Pipeline::new("mismatch");
    let numbers = p
        .apply("numbers", OperationKind::Create, &[], props(&[("values", json!([1]))]))
        .unwrap();
    let view = p
        .apply("view", OperationKind::CreateView, &[numbers], PropertyMap::new())
        .unwrap();
    p.apply(
        "flatten",
        OperationKind::Flatten,
        &[view],
        PropertyMap::new(),
    )
    .unwrap();

    let err = runner().run(&p).err().unwrap();
    assert!(matches!(
        err.root_cause(),
        RunnerError::TypeMismatch { expected: "dataset", .. }
    ));
}

#[test]
fn test_missing_input_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = Pipeline::new("missing");
    p.apply(
        "read",
        OperationKind::ReadText,
        &[],
        props(&[("path", json!(dir.path().join("absent.txt").to_str().unwrap()))]),
    )
    .unwrap();

    let err = runner().run(&p).err().unwrap();
    assert!(matches!(err.root_cause(), RunnerError::Io(_)));
}
