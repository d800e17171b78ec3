use std::time::Duration;

use super::ast::{
    AtModifier, BinaryOp, Expr, GroupSide, Grouping, LabelMatchOp, VectorMatching, format_duration,
};
use super::*;

fn extract_metrics(expr: &Expr) -> MetricSet {
    let mut metrics = MetricSet::default();
    collect_metrics(expr, &mut metrics);
    metrics
}

fn metrics_of(query: &str) -> Vec<String> {
    let expr = parse(query).unwrap_or_else(|err| panic!("failed to parse {query}: {err}"));
    extract_metrics(&expr).sorted()
}

#[test]
fn parses_selector_with_label_matchers() {
    let expr = parse(r#"up{job="api", instance!~"test.*"}"#).unwrap();
    match expr {
        Expr::VectorSelector(selector) => {
            assert_eq!(selector.name.as_deref(), Some("up"));
            assert_eq!(selector.matchers.len(), 2);
            assert_eq!(selector.matchers[0].name, "job");
            assert_eq!(selector.matchers[0].op, LabelMatchOp::Equal);
            assert_eq!(selector.matchers[0].value, "api");
            assert_eq!(selector.matchers[1].op, LabelMatchOp::RegexNotMatch);
        }
        other => panic!("expected vector selector, got {other:?}"),
    }
}

#[test]
fn parses_range_selector_inside_function() {
    let expr = parse("rate(http_requests_total[5m])").unwrap();
    let Expr::Call(call) = expr else {
        panic!("expected call");
    };
    assert_eq!(call.func, "rate");
    match &call.args[0] {
        Expr::MatrixSelector(matrix) => {
            assert_eq!(matrix.range, Duration::from_secs(300));
            assert_eq!(matrix.selector.name.as_deref(), Some("http_requests_total"));
        }
        other => panic!("expected matrix selector, got {other:?}"),
    }
}

#[test]
fn parses_compound_durations_and_offsets() {
    let expr = parse("foo[1h30m] offset -5m @ start()").unwrap();
    let Expr::MatrixSelector(matrix) = expr else {
        panic!("expected matrix selector");
    };
    assert_eq!(matrix.range, Duration::from_secs(5400));
    let offset = matrix.selector.modifiers.offset.expect("offset set");
    assert!(offset.negative);
    assert_eq!(offset.duration, Duration::from_secs(300));
    assert_eq!(matrix.selector.modifiers.at, Some(AtModifier::Start));
}

#[test]
fn parses_aggregation_with_grouping_in_either_position() {
    for query in [
        "sum by (job, instance) (rate(x[5m]))",
        "sum(rate(x[5m])) by (job, instance)",
    ] {
        let Expr::Aggregation(aggregation) = parse(query).unwrap() else {
            panic!("expected aggregation for {query}");
        };
        assert_eq!(aggregation.op, "sum");
        assert_eq!(
            aggregation.grouping,
            Some(Grouping::By(vec!["job".to_string(), "instance".to_string()]))
        );
        assert!(aggregation.param.is_none());
    }
}

#[test]
fn parses_aggregation_parameter() {
    let Expr::Aggregation(aggregation) = parse("topk without (pod) (5, memory_bytes)").unwrap()
    else {
        panic!("expected aggregation");
    };
    assert_eq!(aggregation.param.as_deref(), Some(&Expr::Number(5.0)));
    assert_eq!(
        aggregation.grouping,
        Some(Grouping::Without(vec!["pod".to_string()]))
    );
}

#[test]
fn binary_operators_follow_precedence() {
    let Expr::Binary(top) = parse("a + b * c").unwrap() else {
        panic!("expected binary");
    };
    assert_eq!(top.op, BinaryOp::Add);
    assert!(matches!(*top.rhs, Expr::Binary(ref rhs) if rhs.op == BinaryOp::Mul));

    let Expr::Binary(pow) = parse("2 ^ 3 ^ 2").unwrap() else {
        panic!("expected binary");
    };
    assert!(matches!(*pow.rhs, Expr::Binary(ref rhs) if rhs.op == BinaryOp::Pow));

    let Expr::Binary(set) = parse("a or b and c").unwrap() else {
        panic!("expected binary");
    };
    assert_eq!(set.op, BinaryOp::Or);
}

#[test]
fn parses_vector_matching_modifiers() {
    let query = "a / on (instance) group_left (role) b > bool 0";
    let Expr::Binary(comparison) = parse(query).unwrap() else {
        panic!("expected binary");
    };
    assert_eq!(comparison.op, BinaryOp::Gt);
    assert!(comparison.modifier.return_bool);

    let Expr::Binary(division) = *comparison.lhs else {
        panic!("expected division on the left");
    };
    assert_eq!(
        division.modifier.matching,
        Some(VectorMatching::On(vec!["instance".to_string()]))
    );
    assert_eq!(
        division.modifier.group,
        Some(GroupSide::Left(vec!["role".to_string()]))
    );
}

#[test]
fn parses_subqueries() {
    let expr = parse("max_over_time(rate(errors_total[1m])[30m:1m])").unwrap();
    let Expr::Call(call) = expr else {
        panic!("expected call");
    };
    match &call.args[0] {
        Expr::Subquery(subquery) => {
            assert_eq!(subquery.range, Duration::from_secs(1800));
            assert_eq!(subquery.step, Some(Duration::from_secs(60)));
        }
        other => panic!("expected subquery, got {other:?}"),
    }
    assert!(parse("foo[5m:]").is_ok());
}

#[test]
fn parses_literals_and_comments() {
    assert_eq!(parse("0x1F").unwrap(), Expr::Number(31.0));
    assert_eq!(parse("Inf").unwrap(), Expr::Number(f64::INFINITY));
    assert_eq!(parse("1.5e3").unwrap(), Expr::Number(1500.0));
    assert_eq!(
        parse(r#""a\"b""#).unwrap(),
        Expr::String("a\"b".to_string())
    );
    assert_eq!(parse("`raw\\d`").unwrap(), Expr::String("raw\\d".to_string()));
    assert!(parse("up # trailing comment\n").is_ok());
}

#[test]
fn rejects_malformed_queries() {
    for query in [
        "sum((",
        "",
        "up{job=}",
        "rate(x[5m]",
        "{}",
        "sum(x) by (a) by (b)",
        "(a + b)[5m]",
        "a + bool b",
        "foo bar",
    ] {
        assert!(parse(query).is_err(), "expected {query:?} to be rejected");
    }
}

#[test]
fn rejects_invalid_durations_without_panicking() {
    let huge = format!("x[{}]", "18446744073709551615y".repeat(1100));
    assert_eq!(parse(&huge).unwrap_err().message, "duration out of range");

    for query in ["foo[5m5m]", "foo[1m1h]", "foo[1y1y]", "foo offset 30s1m"] {
        assert_eq!(
            parse(query).unwrap_err().message,
            "duration units must be unique and in decreasing order",
            "{query}"
        );
    }
    assert!(parse("foo[1w2d3h4m5s6ms]").is_ok());
}

#[test]
fn rejects_subquery_over_range_vector() {
    for query in ["foo[5m][10m:]", "rate(foo[5m:1m][10m:])"] {
        assert_eq!(
            parse(query).unwrap_err().message,
            "subquery is only allowed on instant vector expressions",
            "{query}"
        );
    }
}

#[test]
fn decodes_string_escapes() {
    assert_eq!(metrics_of(r#"{__name__="a\u0041"}"#), vec!["aA"]);
    assert_eq!(
        parse(r#""\x41\102\t\U0001F600\'""#).unwrap(),
        Expr::String("AB\t\u{1F600}'".to_string())
    );
    assert_eq!(
        parse(r"'it\'s'").unwrap(),
        Expr::String("it's".to_string())
    );

    for query in [r#"up{job="\q"}"#, r#"up{job="\u00"}"#, r#""\400""#, "\"a\nb\""] {
        assert!(parse(query).is_err(), "expected {query:?} to be rejected");
    }
}

#[test]
fn syntax_error_reports_position_and_offending_text() {
    let err = parse("up{job=\"a\"} +").unwrap_err();
    assert_eq!(err.column, 14);
    assert_eq!(err.offending, "end of input");

    let err = parse("foo bar").unwrap_err();
    assert_eq!(err.message, "unexpected trailing input");
    assert_eq!(err.offending, "bar");
    assert_eq!(err.column, 5);
}

#[test]
fn extracts_every_selector_in_tree() {
    let query = r#"
        sum by (job) (rate(http_requests_total{code=~"5.."}[5m]))
          / ignoring (code) sum by (job) (rate(http_requests_total[5m]))
          > on (job) group_left histogram_quantile(0.99, rate(latency_bucket[5m]))
          or absent(up{job="api"}) unless -node_load1 offset 1h
    "#;

    assert_eq!(
        metrics_of(query),
        vec![
            "http_requests_total",
            "latency_bucket",
            "node_load1",
            "up",
        ]
    );
}

#[test]
fn extracts_names_from_quoted_and_name_matchers() {
    assert_eq!(metrics_of(r#"{"http.server.duration", job="a"}"#), vec!["http.server.duration"]);
    assert_eq!(metrics_of(r#"{__name__="process_cpu_seconds_total"}"#), vec![
        "process_cpu_seconds_total"
    ]);
    assert!(metrics_of(r#"{__name__=~"job:.*"}"#).is_empty());
}

#[test]
fn recording_rule_names_with_colons_are_metrics() {
    assert_eq!(
        metrics_of("sum(job:http_requests:rate5m) by (job)"),
        vec!["job:http_requests:rate5m"]
    );
}

#[test]
fn metric_set_sorts_and_deduplicates() {
    let mut metrics = MetricSet::default();
    assert!(metrics.insert("zeta"));
    assert!(metrics.insert("alpha"));
    assert!(!metrics.insert("zeta"));
    metrics.extend(["mid".to_string(), "alpha".to_string()]);

    assert_eq!(metrics.len(), 3);
    assert!(!metrics.is_empty());
    assert_eq!(metrics.sorted(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn display_renders_parseable_promql() {
    for query in [
        r#"sum by (job) (rate(http_requests_total{code="500"}[5m] offset 1h))"#,
        "a / on (instance) group_left (role) b",
        "max_over_time(foo[1h30m:1m])",
    ] {
        let rendered = parse(query).unwrap().to_string();
        let reparsed = parse(&rendered).unwrap_or_else(|err| panic!("{rendered}: {err}"));
        assert_eq!(extract_metrics(&reparsed), extract_metrics(&parse(query).unwrap()));
    }
    assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
}

#[test]
fn display_quotes_values_as_promql() {
    let expr = parse(r#"{"http.server.duration", path="/ü\"x\"\n"}"#).unwrap();
    let rendered = expr.to_string();

    assert_eq!(rendered, r#"{"http.server.duration", path="/ü\"x\"\n"}"#);
    assert_eq!(parse(&rendered).unwrap(), expr);
}
