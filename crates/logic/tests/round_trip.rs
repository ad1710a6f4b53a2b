//! Behavioural properties of the codec and evaluator together.

use serde_json::{json, Value};

use checklogic::{
    CheckLogic, CheckRegistry, Evaluator, FilterCodec, LogicGroup, LogicLeaf, LogicNode,
    PredicateSet,
};

fn records() -> Vec<Value> {
    vec![
        json!({
            "type": "llm", "name": "gpt-4", "status": "success", "cost": 0.02,
            "duration": 1200, "promptTokens": 400, "completionTokens": 900,
            "tags": ["beta"], "user": "u-1", "createdAt": "2024-03-01T09:00:00Z",
            "input": [{"role": "user", "content": "refund please"}],
            "output": {"role": "assistant", "content": "Refund #4411 issued"},
            "metadata": {"env": "prod"}
        }),
        json!({
            "type": "chat", "name": "gpt-3.5-turbo", "status": "error", "cost": 0.001,
            "duration": 8000, "tags": [], "user": "u-2", "createdAt": "2023-12-24T18:00:00Z",
            "output": "timeout"
        }),
        json!({"type": "llm", "name": "claude-2", "status": "success"}),
        json!({}),
    ]
}

fn sample_trees() -> Vec<CheckLogic> {
    vec![
        CheckLogic::default(),
        LogicGroup::and([
            LogicLeaf::new("models").with_param("models", vec!["gpt-4", "gpt-3.5-turbo"]),
        ]),
        LogicGroup::and([
            LogicNode::from(LogicLeaf::new("models").with_param("models", vec!["gpt-4"])),
            LogicGroup::or([
                LogicLeaf::new("status").with_param("status", "error"),
                LogicLeaf::new("cost").with_param("cost", 0.5),
            ])
            .into(),
        ]),
        LogicGroup::or([
            LogicNode::from(LogicLeaf::new("duration").with_param("operator", "gte").with_param("duration", 5.0)),
            LogicNode::from(LogicLeaf::new("search").with_param("query", "refund, (partial); 100%")),
            LogicGroup::and([
                LogicLeaf::new("regex").with_param("regex", r"#\d{4}"),
                LogicLeaf::new("tokens").with_param("field", "completion").with_param("tokens", 500.0),
            ])
            .into(),
        ]),
        LogicGroup::and([
            LogicLeaf::new("date").with_param("operator", "lt").with_param("date", "2024-01-01"),
            LogicLeaf::new("metadata").with_param("key", "env").with_param("value", "prod"),
            LogicLeaf::new("tags").with_param("tags", vec!["beta", "a:b!c"]),
            LogicLeaf::new("users"),
        ]),
        LogicGroup::or([LogicGroup::and(Vec::<LogicNode>::new()), LogicGroup::or([LogicLeaf::new("type")])]),
    ]
}

#[test]
fn decoded_tree_behaves_like_original() {
    let registry = CheckRegistry::builtin();
    let predicates = PredicateSet::builtin();
    let codec = FilterCodec::new(&registry);
    let eval = Evaluator::new(&registry, &predicates);

    for tree in sample_trees() {
        let text = codec.serialize(&tree);
        let back = codec
            .deserialize(&text)
            .unwrap_or_else(|e| panic!("failed to decode {text}: {e}"));
        assert_eq!(codec.serialize(&back), text, "encoding is not stable");
        for record in records() {
            assert_eq!(
                eval.evaluate(&back, &record),
                eval.evaluate(&tree, &record),
                "verdict changed for {text} on {record}"
            );
        }
    }
}

#[test]
fn serialized_filters_are_query_safe() {
    let registry = CheckRegistry::builtin();
    let codec = FilterCodec::new(&registry);
    for tree in sample_trees() {
        let text = codec.serialize(&tree);
        assert!(
            !text.contains(['&', '=', '+', '#', ' ', '?']),
            "unsafe character in {text}"
        );
    }
}

#[test]
fn empty_filter_passes_every_record() {
    let registry = CheckRegistry::builtin();
    let predicates = PredicateSet::builtin();
    let eval = Evaluator::new(&registry, &predicates);
    for record in records() {
        assert!(eval.evaluate(&CheckLogic::default(), &record).passed);
    }
}

#[test]
fn and_or_follow_boolean_algebra() {
    let registry = CheckRegistry::builtin();
    let predicates = PredicateSet::builtin();
    let eval = Evaluator::new(&registry, &predicates);

    let a = LogicNode::from(LogicLeaf::new("status").with_param("status", "error"));
    let b = LogicNode::from(LogicGroup::or([
        LogicLeaf::new("cost").with_param("operator", "lt").with_param("cost", 0.01),
        LogicLeaf::new("models").with_param("models", vec!["claude-2"]),
    ]));
    let single = |node: &LogicNode| LogicGroup::and([node.clone()]);

    for record in records() {
        let pa = eval.evaluate(&single(&a), &record).passed;
        let pb = eval.evaluate(&single(&b), &record).passed;
        let and = LogicGroup::and([a.clone(), b.clone()]);
        let or = LogicGroup::or([a.clone(), b.clone()]);
        assert_eq!(eval.evaluate(&and, &record).passed, pa && pb);
        assert_eq!(eval.evaluate(&or, &record).passed, pa || pb);
        assert_eq!(eval.matches(&and, &record), pa && pb);
        assert_eq!(eval.matches(&or, &record), pa || pb);
    }
}

#[test]
fn ghost_check_is_tolerated() {
    let registry = CheckRegistry::builtin();
    let predicates = PredicateSet::builtin();
    let codec = FilterCodec::new(&registry);
    let eval = Evaluator::new(&registry, &predicates);

    let ghost = LogicGroup::and([LogicLeaf::new("ghost_check")]);
    let text = codec.serialize(&ghost);
    assert_eq!(text, "AND()");
    let back = codec.deserialize(&text).unwrap();
    let record = json!({"status": "error"});
    assert_eq!(eval.evaluate(&back, &record), eval.evaluate(&ghost, &record));
    assert!(eval.evaluate(&ghost, &record).passed);

    let decoded = codec.deserialize("AND(ghost_check;x:1,status;status:error)").unwrap();
    assert_eq!(decoded.leaves().len(), 1);
    assert!(eval.evaluate(&decoded, &record).passed);
}

#[test]
fn json_and_filter_forms_agree() {
    let registry = CheckRegistry::builtin();
    let codec = FilterCodec::new(&registry);
    let json = json!([
        "AND",
        {"id": "models", "params": {"models": ["gpt-4"]}},
        ["OR", {"id": "status", "params": {"status": "error"}}, {"id": "cost", "params": {"cost": 0.5}}]
    ]);
    let tree: CheckLogic = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(
        codec.serialize(&tree),
        "AND(models;models:gpt-4,OR(status;status:error,cost;cost:0.5))"
    );
    assert_eq!(serde_json::to_value(&tree).unwrap(), json);
}
