use std::time::Duration;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{digit1, hex_digit1, multispace0, not_line_ending, satisfy};
use nom::combinator::{recognize, value};
use nom::error::{ErrorKind, ParseError};
use nom::number::complete::recognize_float;
use nom::{IResult, Parser};

use super::ast::{
    Aggregation, AtModifier, BinaryExpr, BinaryModifier, BinaryOp, Call, Expr, GroupSide,
    Grouping, LabelMatchOp, LabelMatcher, MatrixSelector, Modifiers, Offset, Subquery, UnaryExpr,
    UnaryOp, VectorMatching, VectorSelector,
};

const AGGREGATE_OPS: [&str; 14] = [
    "avg",
    "bottomk",
    "count",
    "count_values",
    "group",
    "limit_ratio",
    "limitk",
    "max",
    "min",
    "quantile",
    "stddev",
    "stdvar",
    "sum",
    "topk",
];

// Largest unit first; a compound duration must follow this order.
const DURATION_UNITS: [(&str, u64); 7] = [
    ("y", 31_536_000_000),
    ("w", 604_800_000),
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

const OFFENDING_TEXT_CHARS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at char {column} near {offending:?}")]
pub struct SyntaxError {
    pub message: String,
    pub column: usize,
    pub offending: String,
}

impl SyntaxError {
    fn from_failure(source: &str, failure: &Failure<'_>) -> Self {
        let position = source.len().saturating_sub(failure.input.len());
        let column = source
            .get(..position)
            .map_or(0, |prefix| prefix.chars().count())
            + 1;
        let offending = if failure.input.is_empty() {
            "end of input".to_string()
        } else {
            failure.input.chars().take(OFFENDING_TEXT_CHARS).collect()
        };

        Self {
            message: failure.message.to_string(),
            column,
            offending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Failure<'a> {
    input: &'a str,
    message: &'static str,
}

impl<'a> ParseError<&'a str> for Failure<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            message: "unexpected input",
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, Failure<'a>>;

enum RangeSuffix {
    Range(Duration),
    Subquery {
        range: Duration,
        step: Option<Duration>,
    },
}

enum MatcherItem {
    Matcher(LabelMatcher),
    MetricName(String),
}

pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    match complete_expr(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => {
            Err(SyntaxError::from_failure(input, &failure))
        }
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::from_failure(
            input,
            &Failure {
                input: "",
                message: "unexpected end of input",
            },
        )),
    }
}

fn complete_expr(input: &str) -> PResult<'_, Expr> {
    let (rest, _) = ws(input)?;
    if rest.is_empty() {
        return fail(rest, "no expression found in input");
    }

    let (rest, parsed) = expr(rest)?;
    let (rest, _) = ws(rest)?;
    if !rest.is_empty() {
        return fail(rest, "unexpected trailing input");
    }

    Ok((rest, parsed))
}

fn fail<'a, T>(input: &'a str, message: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Failure(Failure { input, message }))
}

fn backtrack<'a, T>(input: &'a str, message: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Error(Failure { input, message }))
}

// Whitespace and `#` line comments.
fn ws(input: &str) -> PResult<'_, ()> {
    let mut rest = input;
    loop {
        let (after, _) = multispace0(rest)?;
        match after.strip_prefix('#') {
            Some(comment) => {
                let (after, _) = not_line_ending(comment)?;
                rest = after;
            }
            None => return Ok((after, ())),
        }
    }
}

fn expect<'a>(input: &'a str, token: char, message: &'static str) -> PResult<'a, ()> {
    let (rest, _) = ws(input)?;
    match rest.strip_prefix(token) {
        Some(after) => Ok((after, ())),
        None => fail(rest, message),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize((satisfy(is_ident_start), take_while(is_ident_char))).parse(input)
}

fn label_name(input: &str) -> PResult<'_, &str> {
    recognize((
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn keyword<'a>(input: &'a str, word: &str) -> PResult<'a, ()> {
    let (rest, ident) = identifier(input)?;
    if ident.eq_ignore_ascii_case(word) {
        Ok((rest, ()))
    } else {
        backtrack(input, "expected keyword")
    }
}

fn number_literal(input: &str) -> PResult<'_, f64> {
    if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        let (rest, digits) = hex_digit1(hex)?;
        return match u64::from_str_radix(digits, 16) {
            Ok(parsed) => Ok((rest, parsed as f64)),
            Err(_) => fail(input, "hex number out of range"),
        };
    }

    let (rest, text) = recognize_float(input)?;
    match text.parse::<f64>() {
        Ok(parsed) => Ok((rest, parsed)),
        Err(_) => fail(input, "invalid number"),
    }
}

fn string_literal(input: &str) -> PResult<'_, String> {
    let Some(quote) = input.chars().next().filter(|c| matches!(*c, '"' | '\'' | '`')) else {
        return backtrack(input, "expected string");
    };
    let body = &input[1..];

    if quote == '`' {
        return match body.find('`') {
            Some(end) => Ok((&body[end + 1..], body[..end].to_string())),
            None => fail(input, "unterminated raw string"),
        };
    }

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Ok((&body[idx + 1..], out));
        }
        match c {
            '\\' => {
                let Some((len, decoded)) = decode_escape(&body[idx + 1..]) else {
                    return fail(&body[idx..], "invalid escape sequence in string");
                };
                out.push(decoded);
                // Escape bodies are ASCII, so bytes and chars agree.
                for _ in 0..len {
                    chars.next();
                }
            }
            '\n' => return fail(input, "unterminated quoted string"),
            other => out.push(other),
        }
    }

    fail(input, "unterminated quoted string")
}

// Returns the number of bytes consumed after the backslash.
fn decode_escape(rest: &str) -> Option<(usize, char)> {
    let first = rest.chars().next()?;
    let simple = match first {
        'a' => Some('\u{07}'),
        'b' => Some('\u{08}'),
        'f' => Some('\u{0C}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{0B}'),
        '\\' | '\'' | '"' => Some(first),
        _ => None,
    };
    if let Some(decoded) = simple {
        return Some((1, decoded));
    }

    let (digits, radix, len) = match first {
        'x' => (rest.get(1..3)?, 16, 3),
        'u' => (rest.get(1..5)?, 16, 5),
        'U' => (rest.get(1..9)?, 16, 9),
        '0'..='7' => (rest.get(0..3)?, 8, 3),
        _ => return None,
    };
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let code = u32::from_str_radix(digits, radix).ok()?;
    if radix == 8 && code > 0xFF {
        return None;
    }
    Some((len, char::from_u32(code)?))
}

fn duration_unit(input: &str) -> PResult<'_, usize> {
    // `ms` has to be tried before `m`.
    let (rest, unit) = alt((
        tag("ms"),
        tag("y"),
        tag("w"),
        tag("d"),
        tag("h"),
        tag("m"),
        tag("s"),
    ))
    .parse(input)?;

    match DURATION_UNITS.iter().position(|(name, _)| *name == unit) {
        Some(rank) => Ok((rest, rank)),
        None => backtrack(input, "expected duration unit"),
    }
}

fn duration_part(input: &str) -> PResult<'_, (Duration, usize)> {
    let (rest, digits) = digit1(input)?;
    let (rest, rank) = duration_unit(rest)?;

    let millis = digits
        .parse::<u64>()
        .ok()
        .and_then(|count| count.checked_mul(DURATION_UNITS[rank].1));
    match millis {
        Some(millis) => Ok((rest, (Duration::from_millis(millis), rank))),
        None => fail(input, "duration out of range"),
    }
}

// Compound durations such as `1h30m`.
fn duration(input: &str) -> PResult<'_, Duration> {
    let (mut rest, (mut total, mut last_rank)) = duration_part(input)?;
    while rest.starts_with(|c: char| c.is_ascii_digit()) {
        let (after, (part, rank)) = duration_part(rest)?;
        if rank <= last_rank {
            return fail(rest, "duration units must be unique and in decreasing order");
        }
        let Some(sum) = total.checked_add(part) else {
            return fail(input, "duration out of range");
        };
        total = sum;
        last_rank = rank;
        rest = after;
    }
    Ok((rest, total))
}

fn label_list(input: &str) -> PResult<'_, Vec<String>> {
    let (mut rest, _) = expect(input, '(', "expected '(' before label list")?;
    let mut labels = Vec::new();

    loop {
        let (after, _) = ws(rest)?;
        if let Some(after) = after.strip_prefix(')') {
            return Ok((after, labels));
        }

        let (after, label) = match label_name(after) {
            Ok((after, label)) => (after, label.to_string()),
            Err(_) => match string_literal(after) {
                Ok(parsed) => parsed,
                Err(_) => return fail(after, "expected label name in grouping"),
            },
        };
        labels.push(label);

        let (after, _) = ws(after)?;
        if let Some(after) = after.strip_prefix(',') {
            rest = after;
            continue;
        }
        if let Some(after) = after.strip_prefix(')') {
            return Ok((after, labels));
        }
        return fail(after, "expected ',' or ')' in label list");
    }
}

fn optional_label_list(input: &str) -> PResult<'_, Vec<String>> {
    let (rest, _) = ws(input)?;
    if rest.starts_with('(') {
        label_list(rest)
    } else {
        Ok((rest, Vec::new()))
    }
}

fn expr(input: &str) -> PResult<'_, Expr> {
    binary_expr(input, 0)
}

// Precedence climbing over the binary operator table.
fn binary_expr(input: &str, min_precedence: u8) -> PResult<'_, Expr> {
    let (mut rest, mut lhs) = unary_expr(input)?;

    loop {
        let (after_ws, _) = ws(rest)?;
        let Ok((after_op, op)) = binary_op(after_ws) else {
            break;
        };
        let precedence = op.precedence();
        if precedence < min_precedence {
            break;
        }

        let (after_modifier, modifier) = binary_modifier(after_op, op)?;
        let next_min = if op.is_right_associative() {
            precedence
        } else {
            precedence + 1
        };
        let (after_rhs, rhs) = binary_expr(after_modifier, next_min)?;

        lhs = Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            modifier,
        });
        rest = after_rhs;
    }

    Ok((rest, lhs))
}

fn binary_op(input: &str) -> PResult<'_, BinaryOp> {
    let symbol = alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Gt, tag(">")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Add, tag("+")),
        value(BinaryOp::Sub, tag("-")),
        value(BinaryOp::Mul, tag("*")),
        value(BinaryOp::Div, tag("/")),
        value(BinaryOp::Mod, tag("%")),
        value(BinaryOp::Pow, tag("^")),
    ))
    .parse(input);
    if symbol.is_ok() {
        return symbol;
    }

    let (rest, word) = identifier(input)?;
    let op = match word.to_ascii_lowercase().as_str() {
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        "unless" => BinaryOp::Unless,
        "atan2" => BinaryOp::Atan2,
        _ => return backtrack(input, "expected binary operator"),
    };
    Ok((rest, op))
}

fn binary_modifier(input: &str, op: BinaryOp) -> PResult<'_, BinaryModifier> {
    let mut modifier = BinaryModifier::default();

    let (mut rest, _) = ws(input)?;
    if let Ok((after, _)) = keyword(rest, "bool") {
        if !op.is_comparison() {
            return fail(rest, "bool modifier can only be used on comparison operators");
        }
        modifier.return_bool = true;
        (rest, _) = ws(after)?;
    }

    if let Ok((after, _)) = keyword(rest, "on") {
        let (after, labels) = label_list(after)?;
        modifier.matching = Some(VectorMatching::On(labels));
        rest = after;
    } else if let Ok((after, _)) = keyword(rest, "ignoring") {
        let (after, labels) = label_list(after)?;
        modifier.matching = Some(VectorMatching::Ignoring(labels));
        rest = after;
    }

    if modifier.matching.is_some() {
        (rest, _) = ws(rest)?;
        if let Ok((after, _)) = keyword(rest, "group_left") {
            let (after, labels) = optional_label_list(after)?;
            modifier.group = Some(GroupSide::Left(labels));
            rest = after;
        } else if let Ok((after, _)) = keyword(rest, "group_right") {
            let (after, labels) = optional_label_list(after)?;
            modifier.group = Some(GroupSide::Right(labels));
            rest = after;
        }
    }

    Ok((rest, modifier))
}

fn unary_expr(input: &str) -> PResult<'_, Expr> {
    let (rest, _) = ws(input)?;
    let op = if let Some(after) = rest.strip_prefix('-') {
        Some((after, UnaryOp::Minus))
    } else {
        rest.strip_prefix('+').map(|after| (after, UnaryOp::Plus))
    };

    match op {
        Some((after, op)) => {
            let (after, operand) = unary_expr(after)?;
            Ok((
                after,
                Expr::Unary(UnaryExpr {
                    op,
                    expr: Box::new(operand),
                }),
            ))
        }
        None => postfix_expr(rest),
    }
}

fn modifiers_mut(expr: &mut Expr) -> Option<&mut Modifiers> {
    match expr {
        Expr::VectorSelector(selector) => Some(&mut selector.modifiers),
        Expr::MatrixSelector(matrix) => Some(&mut matrix.selector.modifiers),
        Expr::Subquery(subquery) => Some(&mut subquery.modifiers),
        _ => None,
    }
}

fn postfix_expr(input: &str) -> PResult<'_, Expr> {
    let (mut rest, mut operand) = primary_expr(input)?;

    loop {
        let (after_ws, _) = ws(rest)?;

        if after_ws.starts_with('[') {
            let (after, suffix) = range_suffix(after_ws)?;
            operand = apply_range(after_ws, operand, suffix)?;
            rest = after;
        } else if let Ok((after, _)) = keyword(after_ws, "offset") {
            let (after, offset) = offset_modifier(after)?;
            let Some(modifiers) = modifiers_mut(&mut operand) else {
                return fail(after_ws, "offset modifier must follow a selector or subquery");
            };
            if modifiers.offset.is_some() {
                return fail(after_ws, "offset may not be set multiple times");
            }
            modifiers.offset = Some(offset);
            rest = after;
        } else if let Some(after) = after_ws.strip_prefix('@') {
            let (after, at) = at_modifier(after)?;
            let Some(modifiers) = modifiers_mut(&mut operand) else {
                return fail(after_ws, "@ modifier must follow a selector or subquery");
            };
            if modifiers.at.is_some() {
                return fail(after_ws, "@ may not be set multiple times");
            }
            modifiers.at = Some(at);
            rest = after;
        } else {
            break;
        }
    }

    Ok((rest, operand))
}

fn range_suffix(input: &str) -> PResult<'_, RangeSuffix> {
    let (rest, _) = expect(input, '[', "expected '['")?;
    let (rest, _) = ws(rest)?;
    let (rest, range) = match duration(rest) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(_)) => return fail(rest, "expected duration in range selector"),
        Err(err) => return Err(err),
    };

    let (rest, _) = ws(rest)?;
    if let Some(rest) = rest.strip_prefix(':') {
        let (rest, _) = ws(rest)?;
        let (rest, step) = if rest.starts_with(|c: char| c.is_ascii_digit()) {
            let (rest, step) = duration(rest)?;
            (rest, Some(step))
        } else {
            (rest, None)
        };
        let (rest, _) = expect(rest, ']', "expected ']' after subquery step")?;
        return Ok((rest, RangeSuffix::Subquery { range, step }));
    }

    let (rest, _) = expect(rest, ']', "expected ']' after range")?;
    Ok((rest, RangeSuffix::Range(range)))
}

fn apply_range<'a>(
    at: &'a str,
    operand: Expr,
    suffix: RangeSuffix,
) -> Result<Expr, nom::Err<Failure<'a>>> {
    match suffix {
        RangeSuffix::Range(range) => match operand {
            Expr::VectorSelector(selector) if selector.modifiers == Modifiers::default() => {
                Ok(Expr::MatrixSelector(MatrixSelector { selector, range }))
            }
            _ => Err(nom::Err::Failure(Failure {
                input: at,
                message: "ranges only allowed for vector selectors",
            })),
        },
        RangeSuffix::Subquery { range, step } => match operand {
            Expr::MatrixSelector(_) | Expr::Subquery(_) => Err(nom::Err::Failure(Failure {
                input: at,
                message: "subquery is only allowed on instant vector expressions",
            })),
            operand => Ok(Expr::Subquery(Subquery {
                expr: Box::new(operand),
                range,
                step,
                modifiers: Modifiers::default(),
            })),
        },
    }
}

fn offset_modifier(input: &str) -> PResult<'_, Offset> {
    let (rest, _) = ws(input)?;
    let (rest, negative) = match rest.strip_prefix('-') {
        Some(after) => (after, true),
        None => (rest, false),
    };

    match duration(rest) {
        Ok((rest, duration)) => Ok((rest, Offset { negative, duration })),
        Err(nom::Err::Error(_)) => fail(rest, "expected duration after offset"),
        Err(err) => Err(err),
    }
}

fn at_modifier(input: &str) -> PResult<'_, AtModifier> {
    let (rest, _) = ws(input)?;

    for (name, at) in [("start", AtModifier::Start), ("end", AtModifier::End)] {
        if let Ok((after, _)) = keyword(rest, name) {
            let (after, _) = expect(after, '(', "expected '(' after @ modifier function")?;
            let (after, _) = expect(after, ')', "expected ')' after @ modifier function")?;
            return Ok((after, at));
        }
    }

    match number_literal(rest) {
        Ok((after, timestamp)) => Ok((after, AtModifier::Timestamp(timestamp))),
        Err(_) => fail(rest, "expected timestamp after @"),
    }
}

fn primary_expr(input: &str) -> PResult<'_, Expr> {
    let (rest, _) = ws(input)?;
    let Some(first) = rest.chars().next() else {
        return fail(rest, "unexpected end of input");
    };

    match first {
        '(' => {
            let (after, inner) = expr(&rest[1..])?;
            let (after, _) = expect(after, ')', "unclosed left parenthesis")?;
            Ok((after, Expr::Paren(Box::new(inner))))
        }
        '{' => {
            let (after, selector) = selector_body(rest, None)?;
            Ok((after, Expr::VectorSelector(selector)))
        }
        '"' | '\'' | '`' => {
            let (after, text) = string_literal(rest)?;
            Ok((after, Expr::String(text)))
        }
        c if c.is_ascii_digit() || c == '.' => match number_literal(rest) {
            Ok((after, number)) => Ok((after, Expr::Number(number))),
            Err(_) => fail(rest, "invalid number"),
        },
        c if is_ident_start(c) => identifier_expr(rest),
        _ => fail(rest, "unexpected character"),
    }
}

fn identifier_expr(input: &str) -> PResult<'_, Expr> {
    let (rest, name) = identifier(input)?;
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
        "inf" => return Ok((rest, Expr::Number(f64::INFINITY))),
        "nan" => return Ok((rest, Expr::Number(f64::NAN))),
        _ => {}
    }

    let (after_ws, _) = ws(rest)?;
    let opens_aggregation = after_ws.starts_with('(')
        || keyword(after_ws, "by").is_ok()
        || keyword(after_ws, "without").is_ok();
    if AGGREGATE_OPS.contains(&lowered.as_str()) && opens_aggregation {
        return aggregation(after_ws, lowered);
    }

    if after_ws.starts_with('(') {
        let (after, args) = call_args(after_ws)?;
        return Ok((
            after,
            Expr::Call(Call {
                func: name.to_string(),
                args,
            }),
        ));
    }

    if after_ws.starts_with('{') {
        let (after, selector) = selector_body(after_ws, Some(name))?;
        return Ok((after, Expr::VectorSelector(selector)));
    }

    Ok((
        rest,
        Expr::VectorSelector(VectorSelector {
            name: Some(name.to_string()),
            ..VectorSelector::default()
        }),
    ))
}

fn grouping(input: &str) -> PResult<'_, Option<Grouping>> {
    let (rest, _) = ws(input)?;
    if let Ok((after, _)) = keyword(rest, "by") {
        let (after, labels) = label_list(after)?;
        return Ok((after, Some(Grouping::By(labels))));
    }
    if let Ok((after, _)) = keyword(rest, "without") {
        let (after, labels) = label_list(after)?;
        return Ok((after, Some(Grouping::Without(labels))));
    }
    Ok((rest, None))
}

fn aggregation(input: &str, op: String) -> PResult<'_, Expr> {
    let (rest, leading) = grouping(input)?;
    let (rest, args) = call_args(rest)?;
    let (rest, trailing) = grouping(rest)?;

    let grouping = match (leading, trailing) {
        (Some(_), Some(_)) => return fail(rest, "aggregation may only have one grouping clause"),
        (leading, trailing) => leading.or(trailing),
    };

    let mut args = args.into_iter();
    let (param, expr) = match (args.next(), args.next(), args.next()) {
        (Some(expr), None, None) => (None, expr),
        (Some(param), Some(expr), None) => (Some(Box::new(param)), expr),
        _ => return fail(input, "wrong number of arguments for aggregate expression"),
    };

    Ok((
        rest,
        Expr::Aggregation(Aggregation {
            op,
            grouping,
            param,
            expr: Box::new(expr),
        }),
    ))
}

fn call_args(input: &str) -> PResult<'_, Vec<Expr>> {
    let (mut rest, _) = expect(input, '(', "expected '('")?;
    let mut args = Vec::new();

    let (after, _) = ws(rest)?;
    if let Some(after) = after.strip_prefix(')') {
        return Ok((after, args));
    }

    loop {
        let (after, arg) = expr(rest)?;
        args.push(arg);

        let (after, _) = ws(after)?;
        if let Some(after) = after.strip_prefix(',') {
            rest = after;
            continue;
        }
        if let Some(after) = after.strip_prefix(')') {
            return Ok((after, args));
        }
        return fail(after, "expected ',' or ')' in argument list");
    }
}

fn selector_body<'a>(input: &'a str, name: Option<&str>) -> PResult<'a, VectorSelector> {
    let (mut rest, _) = expect(input, '{', "expected '{'")?;
    let mut selector = VectorSelector {
        name: name.map(ToString::to_string),
        ..VectorSelector::default()
    };

    loop {
        let (after, _) = ws(rest)?;
        if let Some(after) = after.strip_prefix('}') {
            rest = after;
            break;
        }

        let (after, item) = matcher_item(after)?;
        match item {
            MatcherItem::Matcher(matcher) => selector.matchers.push(matcher),
            MatcherItem::MetricName(metric) => {
                if selector.name.is_some() {
                    return fail(after, "metric name must not be set twice");
                }
                selector.name = Some(metric);
            }
        }

        let (after, _) = ws(after)?;
        if let Some(after) = after.strip_prefix(',') {
            rest = after;
            continue;
        }
        if let Some(after) = after.strip_prefix('}') {
            rest = after;
            break;
        }
        return fail(after, "expected ',' or '}' in label matchers");
    }

    if selector.name.is_none() && selector.matchers.is_empty() {
        return fail(input, "vector selector must contain at least one matcher");
    }

    Ok((rest, selector))
}

fn matcher_op(input: &str) -> PResult<'_, LabelMatchOp> {
    alt((
        value(LabelMatchOp::RegexMatch, tag("=~")),
        value(LabelMatchOp::RegexNotMatch, tag("!~")),
        value(LabelMatchOp::NotEqual, tag("!=")),
        value(LabelMatchOp::Equal, tag("=")),
    ))
    .parse(input)
}

// A quoted name with no operator is the metric name itself: `{"http.requests"}`.
fn matcher_item(input: &str) -> PResult<'_, MatcherItem> {
    let (rest, name, quoted) = if input.starts_with(['"', '\'', '`']) {
        let (rest, name) = string_literal(input)?;
        (rest, name, true)
    } else {
        match label_name(input) {
            Ok((rest, name)) => (rest, name.to_string(), false),
            Err(_) => return fail(input, "expected label matcher"),
        }
    };

    let (after_ws, _) = ws(rest)?;
    match matcher_op(after_ws) {
        Ok((after, op)) => {
            let (after, _) = ws(after)?;
            let (after, value) = match string_literal(after) {
                Ok(parsed) => parsed,
                Err(nom::Err::Error(_)) => return fail(after, "expected quoted label value"),
                Err(err) => return Err(err),
            };
            Ok((after, MatcherItem::Matcher(LabelMatcher { name, op, value })))
        }
        Err(_) if quoted => Ok((rest, MatcherItem::MetricName(name))),
        Err(_) => fail(after_ws, "expected label matching operator"),
    }
}
