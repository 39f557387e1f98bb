//! Go-template-style section renderer.
//!
//! Supports the subset playground files use:
//! - `{{.Field}}` / `{{.A.B}}` / `{{.}}` - HTML-escaped output relative to dot
//! - `{{$.Field}}` - output relative to the top-level data
//! - `{{if X}}`, `{{else if X}}`, `{{else}}`, `{{end}}`
//! - `{{range X}}` ... `{{else}}` ... `{{end}}` with dot bound to each element
//! - `not X`, `eq A B`, `ne A B`, `lt A B`, `le A B`, `gt A B`, `ge A B`
//! - `{{/* comment */}}` and `{{-` / `-}}` whitespace trimming
//!
//! Top-level fields behave like struct fields: naming one that does not exist
//! is an execution error. Keys inside nested objects behave like map keys and
//! render empty when missing.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::bridge::SignalValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template parse error: {0}")]
    Parse(String),

    #[error("template execution error: {0}")]
    Exec(String),
}

/// Named fields exposed to a template as its top-level data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateData {
    fields: BTreeMap<String, SignalValue>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<SignalValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<SignalValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.fields.get(name)
    }
}

/// Parse and execute `source` against `data` in one step.
pub fn render(source: &str, data: &TemplateData) -> Result<String, RenderError> {
    Template::parse(source)?.execute(data)
}

/// Escape text for safe inclusion in HTML.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&#34;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// A parsed template, reusable across executions.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Output(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        over: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Path relative to dot; empty means dot itself.
    Dot(Vec<String>),
    /// Path relative to the top-level data; empty means `$`.
    Root(Vec<String>),
    Literal(SignalValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Operand(Operand),
    Not(Operand),
    Compare(CompareOp, Operand, Operand),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Action(String),
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, RenderError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let (nodes, end) = parser.parse_list()?;
        match end {
            Terminator::Eof => Ok(Self { nodes }),
            Terminator::End => Err(RenderError::Parse("unexpected {{end}}".into())),
            Terminator::Else | Terminator::ElseIf(_) => {
                Err(RenderError::Parse("unexpected {{else}}".into()))
            }
        }
    }

    pub fn execute(&self, data: &TemplateData) -> Result<String, RenderError> {
        let mut out = String::new();
        let exec = Exec { root: data };
        exec.run(&self.nodes, &Val::Root, &mut out)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

fn tokenize(source: &str) -> Result<Vec<Token>, RenderError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    while let Some(open) = rest.find("{{") {
        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start();
        }
        let mut after = &rest[open + 2..];

        let trim_left = after.starts_with('-')
            && after[1..].starts_with(|c: char| c.is_ascii_whitespace());
        if trim_left {
            text = text.trim_end();
            after = &after[1..];
        }
        push_text(&mut tokens, text);

        let close = if after.trim_start().starts_with("/*") {
            let comment_end = after
                .find("*/")
                .ok_or_else(|| RenderError::Parse("unclosed comment".into()))?;
            let tail = &after[comment_end + 2..];
            let offset = tail.len() - tail.trim_start().len();
            if !tail.trim_start().starts_with("}}") && !tail.trim_start().starts_with("-}}") {
                return Err(RenderError::Parse("comment ends before closing delimiter".into()));
            }
            comment_end + 2 + offset + tail.trim_start().find("}}").unwrap_or(0)
        } else {
            after
                .find("}}")
                .ok_or_else(|| RenderError::Parse("unclosed action".into()))?
        };

        let mut body = &after[..close];
        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            if stripped.ends_with(|c: char| c.is_ascii_whitespace()) {
                body = stripped;
                trim_next = true;
            }
        }

        let body = body.trim();
        if !(body.starts_with("/*") && body.ends_with("*/")) {
            if body.is_empty() {
                return Err(RenderError::Parse("missing value for command".into()));
            }
            tokens.push(Token::Action(body.to_string()));
        }
        rest = &after[close + 2..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    push_text(&mut tokens, text);
    Ok(tokens)
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Split an action body into words, keeping quoted strings whole.
fn split_words(body: &str) -> Result<Vec<String>, RenderError> {
    let mut words = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = String::new();
        if c == '"' {
            word.push(c);
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                word.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        word.push(escaped);
                    }
                } else if c == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(RenderError::Parse(format!("unterminated quoted string in {body:?}")));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
        }
        words.push(word);
    }
    Ok(words)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Terminator {
    Eof,
    End,
    Else,
    ElseIf(Expr),
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), RenderError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            let body = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.clone()));
                    continue;
                }
                Token::Action(body) => body.as_str(),
            };

            let (keyword, rest) = match body.split_once(char::is_whitespace) {
                Some((k, r)) => (k, r.trim()),
                None => (body, ""),
            };
            match keyword {
                "end" => return Ok((nodes, Terminator::End)),
                "else" if rest.is_empty() => return Ok((nodes, Terminator::Else)),
                "else" => match rest.strip_prefix("if") {
                    Some(cond) if cond.starts_with(char::is_whitespace) => {
                        return Ok((nodes, Terminator::ElseIf(parse_expr(cond)?)));
                    }
                    _ => return Err(RenderError::Parse(format!("unexpected {{{{{body}}}}}"))),
                },
                "if" => nodes.push(self.parse_if(parse_expr(rest)?)?),
                "range" => nodes.push(self.parse_range(parse_expr(rest)?)?),
                _ => nodes.push(Node::Output(parse_expr(body)?)),
            }
        }
        Ok((nodes, Terminator::Eof))
    }

    fn parse_if(&mut self, cond: Expr) -> Result<Node, RenderError> {
        let (then, end) = self.parse_list()?;
        let otherwise = match end {
            Terminator::End => Vec::new(),
            Terminator::Else => self.parse_block_tail("if")?,
            Terminator::ElseIf(next) => vec![self.parse_if(next)?],
            Terminator::Eof => return Err(RenderError::Parse("unclosed {{if}}".into())),
        };
        Ok(Node::If { cond, then, otherwise })
    }

    fn parse_range(&mut self, over: Expr) -> Result<Node, RenderError> {
        let (body, end) = self.parse_list()?;
        let otherwise = match end {
            Terminator::End => Vec::new(),
            Terminator::Else => self.parse_block_tail("range")?,
            Terminator::ElseIf(_) => {
                return Err(RenderError::Parse("{{else if}} inside {{range}}".into()))
            }
            Terminator::Eof => return Err(RenderError::Parse("unclosed {{range}}".into())),
        };
        Ok(Node::Range { over, body, otherwise })
    }

    /// Parse an `{{else}}` branch, which must close with `{{end}}`.
    fn parse_block_tail(&mut self, block: &str) -> Result<Vec<Node>, RenderError> {
        let (nodes, end) = self.parse_list()?;
        match end {
            Terminator::End => Ok(nodes),
            Terminator::Eof => Err(RenderError::Parse(format!("unclosed {{{{{block}}}}}"))),
            Terminator::Else | Terminator::ElseIf(_) => {
                Err(RenderError::Parse(format!("second {{{{else}}}} in {{{{{block}}}}}")))
            }
        }
    }
}

fn parse_expr(text: &str) -> Result<Expr, RenderError> {
    let words = split_words(text)?;
    let op = match words.first().map(String::as_str) {
        None => return Err(RenderError::Parse("missing value for command".into())),
        Some("not") => {
            return match words.as_slice() {
                [_, operand] => Ok(Expr::Not(parse_operand(operand)?)),
                _ => Err(RenderError::Parse("not takes exactly one argument".into())),
            };
        }
        Some("eq") => CompareOp::Eq,
        Some("ne") => CompareOp::Ne,
        Some("lt") => CompareOp::Lt,
        Some("le") => CompareOp::Le,
        Some("gt") => CompareOp::Gt,
        Some("ge") => CompareOp::Ge,
        Some(_) => {
            return match words.as_slice() {
                [operand] => Ok(Expr::Operand(parse_operand(operand)?)),
                _ => Err(RenderError::Parse(format!("unsupported pipeline {text:?}"))),
            };
        }
    };
    match words.as_slice() {
        [_, left, right] => Ok(Expr::Compare(op, parse_operand(left)?, parse_operand(right)?)),
        [name, ..] => Err(RenderError::Parse(format!("{name} takes exactly two arguments"))),
        [] => Err(RenderError::Parse("missing value for command".into())),
    }
}

fn parse_operand(word: &str) -> Result<Operand, RenderError> {
    let path = |rest: &str| -> Result<Vec<String>, RenderError> {
        if rest.is_empty() {
            return Ok(Vec::new());
        }
        let fields: Vec<String> = rest.split('.').map(str::to_string).collect();
        if fields.iter().any(|f| !is_identifier(f)) {
            return Err(RenderError::Parse(format!("bad field path {word:?}")));
        }
        Ok(fields)
    };

    if word == "." {
        return Ok(Operand::Dot(Vec::new()));
    }
    if word == "$" {
        return Ok(Operand::Root(Vec::new()));
    }
    if let Some(rest) = word.strip_prefix("$.") {
        return Ok(Operand::Root(path(rest)?));
    }
    if let Some(rest) = word.strip_prefix('.') {
        return Ok(Operand::Dot(path(rest)?));
    }
    match word {
        "true" => return Ok(Operand::Literal(SignalValue::Bool(true))),
        "false" => return Ok(Operand::Literal(SignalValue::Bool(false))),
        "nil" => return Ok(Operand::Literal(SignalValue::Null)),
        _ => {}
    }
    if word.starts_with('"') {
        let s: String = serde_json::from_str(word)
            .map_err(|_| RenderError::Parse(format!("bad string literal {word}")))?;
        return Ok(Operand::Literal(SignalValue::String(s)));
    }
    if let Ok(n) = word.parse::<i64>() {
        return Ok(Operand::Literal(SignalValue::Int(n)));
    }
    if let Ok(x) = word.parse::<f64>() {
        return Ok(Operand::Literal(SignalValue::Float(x)));
    }
    Err(RenderError::Parse(format!("function {word:?} not defined")))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// A value during execution: the top-level data or something inside it.
#[derive(Debug, Clone)]
enum Val<'a> {
    Root,
    Value(Cow<'a, SignalValue>),
}

impl Val<'_> {
    fn is_truthy(&self, root: &TemplateData) -> bool {
        match self {
            Val::Root => !root.fields.is_empty(),
            Val::Value(v) => v.is_truthy(),
        }
    }
}

struct Exec<'a> {
    root: &'a TemplateData,
}

impl<'a> Exec<'a> {
    fn run(&self, nodes: &[Node], dot: &Val<'a>, out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => {
                    let value = self.eval(expr, dot)?;
                    out.push_str(&html_escape(&self.format(&value)));
                }
                Node::If { cond, then, otherwise } => {
                    if self.eval(cond, dot)?.is_truthy(self.root) {
                        self.run(then, dot, out)?;
                    } else {
                        self.run(otherwise, dot, out)?;
                    }
                }
                Node::Range { over, body, otherwise } => {
                    let items: Vec<Val<'_>> = match self.eval(over, dot)? {
                        Val::Root => {
                            return Err(RenderError::Exec("range can't iterate over $".into()))
                        }
                        Val::Value(Cow::Borrowed(v)) => borrowed_items(v)?,
                        Val::Value(Cow::Owned(v)) => owned_items(v)?,
                    };
                    if items.is_empty() {
                        self.run(otherwise, dot, out)?;
                    }
                    for item in &items {
                        self.run(body, item, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, dot: &Val<'a>) -> Result<Val<'a>, RenderError> {
        match expr {
            Expr::Operand(operand) => self.operand(operand, dot),
            Expr::Not(operand) => {
                let truthy = self.operand(operand, dot)?.is_truthy(self.root);
                Ok(Val::Value(Cow::Owned(SignalValue::Bool(!truthy))))
            }
            Expr::Compare(op, left, right) => {
                let left = self.operand(left, dot)?;
                let right = self.operand(right, dot)?;
                let result = compare(*op, &left, &right)?;
                Ok(Val::Value(Cow::Owned(SignalValue::Bool(result))))
            }
        }
    }

    fn operand(&self, operand: &Operand, dot: &Val<'a>) -> Result<Val<'a>, RenderError> {
        match operand {
            Operand::Literal(value) => Ok(Val::Value(Cow::Owned(value.clone()))),
            Operand::Root(path) => self.walk(Val::Root, path),
            Operand::Dot(path) => self.walk(dot.clone(), path),
        }
    }

    fn walk(&self, start: Val<'a>, path: &[String]) -> Result<Val<'a>, RenderError> {
        let mut current = start;
        for field in path {
            current = match current {
                Val::Root => match self.root.fields.get(field) {
                    Some(value) => Val::Value(Cow::Borrowed(value)),
                    None => {
                        return Err(RenderError::Exec(format!(
                            "can't evaluate field {field} in template data"
                        )))
                    }
                },
                Val::Value(Cow::Borrowed(value)) => Val::Value(field_of(value, field)?),
                Val::Value(Cow::Owned(value)) => {
                    Val::Value(Cow::Owned(field_of(&value, field)?.into_owned()))
                }
            };
        }
        Ok(current)
    }

    fn format(&self, value: &Val<'_>) -> String {
        match value {
            Val::Root => serde_json::to_string(&self.root.fields).unwrap_or_default(),
            Val::Value(v) => v.to_string(),
        }
    }
}

fn field_of<'v>(value: &'v SignalValue, field: &str) -> Result<Cow<'v, SignalValue>, RenderError> {
    match value {
        SignalValue::Object(map) => Ok(map
            .get(field)
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(SignalValue::Null))),
        SignalValue::Null => Ok(Cow::Owned(SignalValue::Null)),
        other => Err(RenderError::Exec(format!(
            "can't evaluate field {field} in type {}",
            type_name(other)
        ))),
    }
}

fn borrowed_items(value: &SignalValue) -> Result<Vec<Val<'_>>, RenderError> {
    match value {
        SignalValue::Array(items) => Ok(items.iter().map(|v| Val::Value(Cow::Borrowed(v))).collect()),
        SignalValue::Object(map) => Ok(map.values().map(|v| Val::Value(Cow::Borrowed(v))).collect()),
        SignalValue::Null => Ok(Vec::new()),
        other => Err(RenderError::Exec(format!("range can't iterate over {}", type_name(other)))),
    }
}

fn owned_items<'a>(value: SignalValue) -> Result<Vec<Val<'a>>, RenderError> {
    match value {
        SignalValue::Array(items) => Ok(items.into_iter().map(|v| Val::Value(Cow::Owned(v))).collect()),
        SignalValue::Object(map) => Ok(map.into_values().map(|v| Val::Value(Cow::Owned(v))).collect()),
        SignalValue::Null => Ok(Vec::new()),
        other => Err(RenderError::Exec(format!("range can't iterate over {}", type_name(&other)))),
    }
}

fn type_name(value: &SignalValue) -> &'static str {
    match value {
        SignalValue::Null => "nil",
        SignalValue::Bool(_) => "bool",
        SignalValue::Int(_) => "int",
        SignalValue::Float(_) => "float",
        SignalValue::String(_) => "string",
        SignalValue::Array(_) => "array",
        SignalValue::Object(_) => "map",
    }
}

fn compare(op: CompareOp, left: &Val<'_>, right: &Val<'_>) -> Result<bool, RenderError> {
    let (Val::Value(left), Val::Value(right)) = (left, right) else {
        return Err(RenderError::Exec("can't compare $".into()));
    };
    let ordering = match (left.as_ref(), right.as_ref()) {
        (SignalValue::Int(a), SignalValue::Int(b)) => Some(a.cmp(b)),
        (SignalValue::Int(a), SignalValue::Float(b)) => (*a as f64).partial_cmp(b),
        (SignalValue::Float(a), SignalValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (SignalValue::Float(a), SignalValue::Float(b)) => a.partial_cmp(b),
        (SignalValue::String(a), SignalValue::String(b)) => Some(a.cmp(b)),
        (SignalValue::Bool(a), SignalValue::Bool(b)) => Some(a.cmp(b)),
        (SignalValue::Null, SignalValue::Null) => Some(Ordering::Equal),
        _ => None,
    };

    match (op, ordering) {
        (CompareOp::Eq, ord) => Ok(ord == Some(Ordering::Equal)),
        (CompareOp::Ne, ord) => Ok(ord != Some(Ordering::Equal)),
        (_, None) => Err(RenderError::Exec(format!(
            "incompatible types for comparison: {} and {}",
            type_name(left),
            type_name(right)
        ))),
        (CompareOp::Lt, Some(ord)) => Ok(ord == Ordering::Less),
        (CompareOp::Le, Some(ord)) => Ok(ord != Ordering::Greater),
        (CompareOp::Gt, Some(ord)) => Ok(ord == Ordering::Greater),
        (CompareOp::Ge, Some(ord)) => Ok(ord != Ordering::Less),
    }
}
