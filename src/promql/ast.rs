use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    VectorSelector(VectorSelector),
    MatrixSelector(MatrixSelector),
    Subquery(Subquery),
    Call(Call),
    Aggregation(Aggregation),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMatchOp {
    Equal,
    NotEqual,
    RegexMatch,
    RegexNotMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    pub name: String,
    pub op: LabelMatchOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtModifier {
    Timestamp(f64),
    Start,
    End,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub offset: Option<Offset>,
    pub at: Option<AtModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offset {
    pub negative: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSelector {
    pub name: Option<String>,
    pub matchers: Vec<LabelMatcher>,
    pub modifiers: Modifiers,
}

impl VectorSelector {
    // A bare metric identifier wins over a `__name__` equality matcher.
    pub fn metric_name(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| {
            self.matchers
                .iter()
                .find(|matcher| matcher.name == "__name__" && matcher.op == LabelMatchOp::Equal)
                .map(|matcher| matcher.value.as_str())
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    pub selector: VectorSelector,
    pub range: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub expr: Box<Expr>,
    pub range: Duration,
    pub step: Option<Duration>,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    By(Vec<String>),
    Without(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub op: String,
    pub grouping: Option<Grouping>,
    pub param: Option<Box<Expr>>,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Atan2,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    Unless,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And | Self::Unless => 2,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Ge | Self::Le => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div | Self::Mod | Self::Atan2 => 5,
            Self::Pow => 6,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, Self::Pow)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Ge | Self::Le
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorMatching {
    On(Vec<String>),
    Ignoring(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSide {
    Left(Vec<String>),
    Right(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryModifier {
    pub return_bool: bool,
    pub matching: Option<VectorMatching>,
    pub group: Option<GroupSide>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub modifier: BinaryModifier,
}

impl Expr {
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Number(_)
            | Self::String(_)
            | Self::VectorSelector(_)
            | Self::MatrixSelector(_) => Vec::new(),
            Self::Subquery(subquery) => vec![subquery.expr.as_ref()],
            Self::Call(call) => call.args.iter().collect(),
            Self::Aggregation(aggregation) => aggregation
                .param
                .iter()
                .map(|param| &**param)
                .chain(std::iter::once(aggregation.expr.as_ref()))
                .collect(),
            Self::Unary(unary) => vec![unary.expr.as_ref()],
            Self::Binary(binary) => vec![binary.lhs.as_ref(), binary.rhs.as_ref()],
            Self::Paren(inner) => vec![inner.as_ref()],
        }
    }

    // Pre-order, left to right.
    pub fn walk<'e, F>(&'e self, visit: &mut F)
    where
        F: FnMut(&'e Expr),
    {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(&str, u128); 7] = [
        ("y", 365 * 24 * 3_600_000),
        ("w", 7 * 24 * 3_600_000),
        ("d", 24 * 3_600_000),
        ("h", 3_600_000),
        ("m", 60_000),
        ("s", 1_000),
        ("ms", 1),
    ];

    let mut remaining = duration.as_millis();
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, millis) in UNITS {
        let count = remaining / millis;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            remaining -= count * millis;
        }
    }
    out
}

// Double-quoted PromQL string; non-ASCII text is written as-is.
fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: &[String]) -> fmt::Result {
    write!(f, "({})", labels.join(", "))
}

impl fmt::Display for LabelMatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNotMatch => "!~",
        })
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.op)?;
        write_quoted(f, &self.value)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(offset) = &self.offset {
            let sign = if offset.negative { "-" } else { "" };
            write!(f, " offset {sign}{}", format_duration(offset.duration))?;
        }
        match &self.at {
            Some(AtModifier::Timestamp(ts)) => write!(f, " @ {ts}"),
            Some(AtModifier::Start) => f.write_str(" @ start()"),
            Some(AtModifier::End) => f.write_str(" @ end()"),
            None => Ok(()),
        }
    }
}

impl VectorSelector {
    fn fmt_selector(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare_name = self.name.as_deref().filter(|name| {
            name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == ':')
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        });
        if let Some(name) = bare_name {
            f.write_str(name)?;
            if self.matchers.is_empty() {
                return Ok(());
            }
        }

        f.write_str("{")?;
        let mut first = true;
        if let (Some(name), None) = (&self.name, bare_name) {
            write_quoted(f, name)?;
            first = false;
        }
        for matcher in &self.matchers {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{matcher}")?;
            first = false;
        }
        f.write_str("}")
    }
}

impl fmt::Display for VectorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_selector(f)?;
        write!(f, "{}", self.modifiers)
    }
}

impl fmt::Display for MatrixSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector.fmt_selector(f)?;
        write!(
            f,
            "[{}]{}",
            format_duration(self.range),
            self.selector.modifiers
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::Atan2 => "atan2",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::And => "and",
            Self::Or => "or",
            Self::Unless => "unless",
        })
    }
}

impl fmt::Display for BinaryModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.return_bool {
            f.write_str(" bool")?;
        }
        match &self.matching {
            Some(VectorMatching::On(labels)) => {
                f.write_str(" on")?;
                write_labels(f, labels)?;
            }
            Some(VectorMatching::Ignoring(labels)) => {
                f.write_str(" ignoring")?;
                write_labels(f, labels)?;
            }
            None => {}
        }
        match &self.group {
            Some(GroupSide::Left(labels)) => {
                f.write_str(" group_left")?;
                write_labels(f, labels)
            }
            Some(GroupSide::Right(labels)) => {
                f.write_str(" group_right")?;
                write_labels(f, labels)
            }
            None => Ok(()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write_quoted(f, value),
            Self::VectorSelector(selector) => write!(f, "{selector}"),
            Self::MatrixSelector(matrix) => write!(f, "{matrix}"),
            Self::Subquery(subquery) => {
                write!(f, "{}[{}:", subquery.expr, format_duration(subquery.range))?;
                if let Some(step) = subquery.step {
                    f.write_str(&format_duration(step))?;
                }
                write!(f, "]{}", subquery.modifiers)
            }
            Self::Call(call) => {
                let args: Vec<String> = call.args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", call.func, args.join(", "))
            }
            Self::Aggregation(aggregation) => {
                f.write_str(&aggregation.op)?;
                match &aggregation.grouping {
                    Some(Grouping::By(labels)) => {
                        f.write_str(" by ")?;
                        write_labels(f, labels)?;
                        f.write_str(" ")?;
                    }
                    Some(Grouping::Without(labels)) => {
                        f.write_str(" without ")?;
                        write_labels(f, labels)?;
                        f.write_str(" ")?;
                    }
                    None => {}
                }
                match &aggregation.param {
                    Some(param) => write!(f, "({param}, {})", aggregation.expr),
                    None => write!(f, "({})", aggregation.expr),
                }
            }
            Self::Unary(unary) => {
                let sign = match unary.op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                };
                write!(f, "{sign}{}", unary.expr)
            }
            Self::Binary(binary) => write!(
                f,
                "{} {}{} {}",
                binary.lhs, binary.op, binary.modifier, binary.rhs
            ),
            Self::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
