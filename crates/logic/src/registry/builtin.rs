//! The standard dashboard checks.

use super::{Check, ParamSpec, ParamType};

const RUN_TYPES: &[&str] = &[
    "llm", "trace", "thread", "chat", "agent", "chain", "tool", "retriever", "embed",
];

const COMPARISONS: &[&str] = &["gt", "gte", "lt", "lte", "eq"];

const TOKEN_FIELDS: &[&str] = &["total", "prompt", "completion"];

fn comparison() -> ParamSpec {
    ParamSpec::new("operator", ParamType::Select, "gt")
        .with_options(COMPARISONS)
        .with_width(60)
}

fn empty_list() -> Vec<String> {
    Vec::new()
}

pub(super) fn checks() -> Vec<Check> {
    vec![
        Check::new(
            "type",
            "Type",
            vec![
                ParamSpec::label("label", "Type is"),
                ParamSpec::new("type", ParamType::Select, "llm").with_options(RUN_TYPES),
            ],
        ),
        Check::new(
            "models",
            "Model",
            vec![
                ParamSpec::label("label", "Model is"),
                ParamSpec::new("models", ParamType::MultiSelect, empty_list()).with_width(100),
            ],
        ),
        Check::new(
            "tags",
            "Tags",
            vec![
                ParamSpec::label("label", "Has tag"),
                ParamSpec::new("tags", ParamType::MultiSelect, empty_list()).with_width(100),
            ],
        ),
        Check::new(
            "users",
            "Users",
            vec![
                ParamSpec::label("label", "User is"),
                ParamSpec::new("users", ParamType::MultiSelect, empty_list()).with_width(100),
            ],
        ),
        Check::new(
            "status",
            "Status",
            vec![
                ParamSpec::label("label", "Status is"),
                ParamSpec::new("status", ParamType::Select, "success")
                    .with_options(&["success", "error"]),
            ],
        ),
        Check::new(
            "cost",
            "Cost",
            vec![
                ParamSpec::label("label", "Cost"),
                comparison(),
                ParamSpec::new("cost", ParamType::Number, 0.0).with_width(70),
            ],
        ),
        Check::new(
            "duration",
            "Duration",
            vec![
                ParamSpec::label("label", "Duration"),
                comparison(),
                ParamSpec::new("duration", ParamType::Number, 5.0).with_width(60),
                ParamSpec::label("unit", "seconds"),
            ],
        ),
        Check::new(
            "tokens",
            "Tokens",
            vec![
                ParamSpec::new("field", ParamType::Select, "total").with_options(TOKEN_FIELDS),
                ParamSpec::label("label", "tokens"),
                comparison(),
                ParamSpec::new("tokens", ParamType::Number, 1000.0).with_width(70),
            ],
        ),
        Check::new(
            "date",
            "Date",
            vec![
                ParamSpec::label("label", "Date"),
                ParamSpec::new("operator", ParamType::Select, "gt")
                    .with_options(&["gt", "lt"])
                    .with_width(60),
                ParamSpec::new("date", ParamType::Date, "2024-01-01"),
            ],
        ),
        Check::new(
            "search",
            "Search",
            vec![ParamSpec::new("query", ParamType::Text, "").with_width(140)],
        ),
        Check::new(
            "length",
            "Output length",
            vec![
                ParamSpec::label("label", "Output length"),
                comparison(),
                ParamSpec::new("length", ParamType::Number, 100.0).with_width(70),
            ],
        ),
        Check::new(
            "regex",
            "Regex",
            vec![
                ParamSpec::label("label", "Output"),
                ParamSpec::new("type", ParamType::Select, "match")
                    .with_options(&["match", "notmatch"])
                    .with_width(90),
                ParamSpec::new("regex", ParamType::Text, "").with_width(140),
            ],
        ),
        Check::new(
            "metadata",
            "Metadata",
            vec![
                ParamSpec::label("label", "Metadata"),
                ParamSpec::new("key", ParamType::Text, "").with_width(90),
                ParamSpec::label("equals", "="),
                ParamSpec::new("value", ParamType::Text, "").with_width(90),
            ],
        ),
    ]
}
