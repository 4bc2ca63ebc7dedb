//! RFC 6570 URI templates: expansion and its inverse.
//!
//! # Design
//! A template is parsed once into literal and expression components. `expand`
//! follows the RFC algorithm for all eight operators and both modifiers.
//!
//! `extract` goes the other way: the template is compiled into an anchored
//! regex with one capture group per expression, and each captured span is
//! split back into variable values. Named operators (`;`, `?`, `&`) carry the
//! variable name on the wire, so their values are matched by name across the
//! whole URL. The other operators are positional. An empty positional value
//! cannot be told apart from an undefined one and is not reported.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Template parameters, keyed by variable name.
pub type Params = Map<String, Value>;

/// Everything except ALPHA / DIGIT / "-" / "." / "_" / "~".
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// `UNRESERVED` with the RFC 3986 reserved set let through as well.
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

const UNRESERVED_CLASS: &str = r"A-Za-z0-9\-._~%";
const RESERVED_CLASS: &str = r":/?#\[\]@!$&'()*+,;=";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed expression starting at byte {0}")]
    Unclosed(usize),

    #[error("unexpected '}}' at byte {0}")]
    UnexpectedClose(usize),

    #[error("empty expression at byte {0}")]
    EmptyExpression(usize),

    #[error("unsupported operator {0:?}")]
    UnsupportedOperator(char),

    #[error("invalid variable {0:?}")]
    InvalidVariable(String),

    #[error("cannot build matcher: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Result<Option<Self>, TemplateError> {
        Ok(Some(match c {
            '+' => Operator::Reserved,
            '#' => Operator::Fragment,
            '.' => Operator::Label,
            '/' => Operator::Path,
            ';' => Operator::PathParam,
            '?' => Operator::Query,
            '&' => Operator::QueryContinuation,
            '=' | ',' | '!' | '@' | '|' => return Err(TemplateError::UnsupportedOperator(c)),
            _ => return Ok(None),
        }))
    }

    fn first(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn separator(self) -> char {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ',',
            Operator::Label => '.',
            Operator::Path => '/',
            Operator::PathParam => ';',
            Operator::Query | Operator::QueryContinuation => '&',
        }
    }

    fn named(self) -> bool {
        matches!(self, Operator::PathParam | Operator::Query | Operator::QueryContinuation)
    }

    fn if_empty(self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }

    /// Regex fragment matching everything this operator can emit, as a
    /// single capture group.
    fn pattern(self) -> String {
        match self {
            Operator::Simple => format!("([{UNRESERVED_CLASS},=]*)"),
            Operator::Reserved => format!("([{UNRESERVED_CLASS}{RESERVED_CLASS}]*)"),
            Operator::Fragment => format!("(#[{UNRESERVED_CLASS}{RESERVED_CLASS}]*)?"),
            Operator::Label => r"((?:\.[A-Za-z0-9\-_~%,=]*)*)".to_string(),
            Operator::Path => format!("((?:/[{UNRESERVED_CLASS},=]*)*)"),
            Operator::PathParam => format!("((?:;[{UNRESERVED_CLASS},=]*)*)"),
            Operator::Query => r"(\?[^#]*)?".to_string(),
            Operator::QueryContinuation => r"(&[^#]*)?".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

#[derive(Debug, Clone)]
struct VarSpec {
    name: String,
    modifier: Modifier,
}

#[derive(Debug, Clone)]
struct Expression {
    operator: Operator,
    variables: Vec<VarSpec>,
}

#[derive(Debug, Clone)]
enum Component {
    Literal(String),
    Expression(Expression),
}

/// A parsed RFC 6570 URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    components: Vec<Component>,
    matcher: Regex,
}

impl UriTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut components = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                Some(pos) if rest.as_bytes()[pos] == b'}' => {
                    return Err(TemplateError::UnexpectedClose(offset + pos));
                }
                Some(pos) => {
                    if pos > 0 {
                        components.push(Component::Literal(rest[..pos].to_string()));
                    }
                    let close = rest[pos..]
                        .find('}')
                        .map(|end| pos + end)
                        .ok_or(TemplateError::Unclosed(offset + pos))?;
                    let body = &rest[pos + 1..close];
                    if body.contains('{') {
                        return Err(TemplateError::Unclosed(offset + pos));
                    }
                    components.push(Component::Expression(parse_expression(body, offset + pos)?));
                    offset += close + 1;
                    rest = &rest[close + 1..];
                }
                None => {
                    components.push(Component::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        let matcher = build_matcher(&components)?;
        Ok(Self {
            source: source.to_string(),
            components,
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Variable names in template order, without duplicates.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for var in self.expressions().flat_map(|expr| expr.variables.iter()) {
            if !names.contains(&var.name.as_str()) {
                names.push(&var.name);
            }
        }
        names
    }

    pub fn expand(&self, params: &Params) -> String {
        let mut out = String::with_capacity(self.source.len());
        for component in &self.components {
            match component {
                Component::Literal(text) => out.push_str(&encode(text, true)),
                Component::Expression(expr) => expand_expression(expr, params, &mut out),
            }
        }
        out
    }

    /// Values that were substituted into `url` by `expand`. Returns an empty
    /// mapping when `url` does not match the template.
    ///
    /// Positional values are paired with variables in template order, so an
    /// undefined variable followed by a defined one is ambiguous. Use
    /// `extract_for` when the expanded parameters are known.
    pub fn extract(&self, url: &str) -> Params {
        self.extract_with(url, None)
    }

    /// Like `extract`, but positional values are only paired with variables
    /// that `params` defines, i.e. the ones `expand(params)` emitted.
    pub fn extract_for(&self, url: &str, params: &Params) -> Params {
        self.extract_with(url, Some(params))
    }

    fn extract_with(&self, url: &str, defined: Option<&Params>) -> Params {
        let mut params = Params::new();
        let Some(captures) = self.matcher.captures(url) else {
            return params;
        };
        let spans: Vec<&str> = (1..captures.len())
            .map(|i| captures.get(i).map_or("", |m| m.as_str()))
            .collect();
        let expressions: Vec<&Expression> = self.expressions().collect();

        let mut pool: Vec<(String, Option<String>)> = Vec::new();
        for (expr, span) in expressions.iter().zip(&spans) {
            if expr.operator.named() {
                pool.extend(named_pairs(expr.operator, span));
            } else {
                extract_positional(expr, span, defined, &mut params);
            }
        }

        let known = self.variables();
        for expr in expressions.iter().filter(|expr| expr.operator.named()) {
            for var in &expr.variables {
                let values: Vec<&Option<String>> = pool
                    .iter()
                    .filter(|(name, _)| *name == var.name)
                    .map(|(_, value)| value)
                    .collect();
                match values.as_slice() {
                    [] => {}
                    [single] => {
                        let raw = single.as_deref().unwrap_or("");
                        params.insert(var.name.clone(), decode_value(raw, false));
                    }
                    many => {
                        let items = many
                            .iter()
                            .map(|value| Value::String(decode(value.as_deref().unwrap_or(""))))
                            .collect();
                        params.insert(var.name.clone(), Value::Array(items));
                    }
                }
            }
        }

        // Exploded maps in named expressions spread their keys on the wire;
        // unclaimed pairs belong to the first such variable left empty.
        let unclaimed = expressions
            .iter()
            .filter(|expr| expr.operator.named())
            .flat_map(|expr| expr.variables.iter())
            .find(|var| var.modifier == Modifier::Explode && !params.contains_key(&var.name))
            .map(|var| var.name.clone());
        if let Some(name) = unclaimed {
            let leftovers: Map<String, Value> = pool
                .iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), Value::String(decode(value.as_deref().unwrap_or("")))))
                .collect();
            if !leftovers.is_empty() {
                params.insert(name, Value::Object(leftovers));
            }
        }
        params
    }

    fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.components.iter().filter_map(|component| match component {
            Component::Expression(expr) => Some(expr),
            Component::Literal(_) => None,
        })
    }
}

/// Expand `template` with `params`.
pub fn expand(template: &str, params: &Params) -> Result<String, TemplateError> {
    Ok(UriTemplate::parse(template)?.expand(params))
}

/// Parameters of `template` that were embedded into `url`.
pub fn extract(template: &str, url: &str) -> Result<Params, TemplateError> {
    Ok(UriTemplate::parse(template)?.extract(url))
}

fn parse_expression(body: &str, position: usize) -> Result<Expression, TemplateError> {
    let mut chars = body.chars();
    let first = chars.next().ok_or(TemplateError::EmptyExpression(position))?;
    let (operator, list) = match Operator::from_char(first)? {
        Some(op) => (op, chars.as_str()),
        None => (Operator::Simple, body),
    };
    if list.is_empty() {
        return Err(TemplateError::EmptyExpression(position));
    }

    let variables = list.split(',').map(parse_varspec).collect::<Result<Vec<_>, _>>()?;
    Ok(Expression { operator, variables })
}

fn parse_varspec(spec: &str) -> Result<VarSpec, TemplateError> {
    let invalid = || TemplateError::InvalidVariable(spec.to_string());
    let (name, modifier) = if let Some(name) = spec.strip_suffix('*') {
        (name, Modifier::Explode)
    } else if let Some((name, length)) = spec.split_once(':') {
        let length: usize = length.parse().map_err(|_| invalid())?;
        if length == 0 || length >= 10_000 {
            return Err(invalid());
        }
        (name, Modifier::Prefix(length))
    } else {
        (spec, Modifier::None)
    };

    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%'));
    if !valid {
        return Err(invalid());
    }
    Ok(VarSpec {
        name: name.to_string(),
        modifier,
    })
}

fn build_matcher(components: &[Component]) -> Result<Regex, TemplateError> {
    let mut pattern = String::from("^");
    for component in components {
        match component {
            Component::Literal(text) => pattern.push_str(&regex::escape(&encode(text, true))),
            Component::Expression(expr) => pattern.push_str(&expr.operator.pattern()),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| TemplateError::Pattern(e.to_string()))
}

/// A template value after RFC 6570 normalization.
enum Expanded {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

fn to_expanded(value: &Value) -> Option<Expanded> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!items.is_empty()).then_some(Expanded::List(items))
        }
        Value::Object(entries) => {
            let pairs: Vec<(String, String)> = entries
                .iter()
                .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
                .collect();
            (!pairs.is_empty()).then_some(Expanded::Map(pairs))
        }
        other => scalar_text(other).map(Expanded::Scalar),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn expand_expression(expr: &Expression, params: &Params, out: &mut String) {
    let op = expr.operator;
    let allow = op.allow_reserved();
    let mut first = true;
    for var in &expr.variables {
        let Some(value) = params.get(&var.name).and_then(to_expanded) else {
            continue;
        };
        if first {
            out.push_str(op.first());
            first = false;
        } else {
            out.push(op.separator());
        }

        match value {
            Expanded::Scalar(text) => {
                if op.named() {
                    push_name(out, &var.name, text.is_empty(), op);
                }
                let text: String = match var.modifier {
                    Modifier::Prefix(length) => text.chars().take(length).collect(),
                    _ => text,
                };
                out.push_str(&encode(&text, allow));
            }
            Expanded::List(items) if var.modifier == Modifier::Explode => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(op.separator());
                    }
                    if op.named() {
                        push_name(out, &var.name, item.is_empty(), op);
                    }
                    out.push_str(&encode(item, allow));
                }
            }
            Expanded::List(items) => {
                if op.named() {
                    push_name(out, &var.name, false, op);
                }
                let encoded: Vec<String> = items.iter().map(|item| encode(item, allow)).collect();
                out.push_str(&encoded.join(","));
            }
            Expanded::Map(pairs) if var.modifier == Modifier::Explode => {
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push(op.separator());
                    }
                    out.push_str(&encode(key, allow));
                    if value.is_empty() {
                        out.push_str(op.if_empty());
                    } else {
                        out.push('=');
                    }
                    out.push_str(&encode(value, allow));
                }
            }
            Expanded::Map(pairs) => {
                if op.named() {
                    push_name(out, &var.name, false, op);
                }
                let encoded: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{},{}", encode(key, allow), encode(value, allow)))
                    .collect();
                out.push_str(&encoded.join(","));
            }
        }
    }
}

fn push_name(out: &mut String, name: &str, empty: bool, op: Operator) {
    out.push_str(name);
    if empty {
        out.push_str(op.if_empty());
    } else {
        out.push('=');
    }
}

/// Percent-encode `value`. With `allow_reserved`, reserved characters and
/// existing `%XX` triplets pass through untouched.
fn encode(value: &str, allow_reserved: bool) -> String {
    if !allow_reserved {
        return utf8_percent_encode(value, UNRESERVED).to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..pos], RESERVED));
        let tail = rest[pos..].as_bytes();
        if tail.len() >= 3 && tail[1].is_ascii_hexdigit() && tail[2].is_ascii_hexdigit() {
            out.push_str(&rest[pos..pos + 3]);
            rest = &rest[pos + 3..];
        } else {
            out.push_str("%25");
            rest = &rest[pos + 1..];
        }
    }
    out.extend(utf8_percent_encode(rest, RESERVED));
    out
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// A single captured value. Unencoded commas only appear between list items,
/// except for reserved expansions where they may be part of the value.
fn decode_value(raw: &str, allow_reserved: bool) -> Value {
    if !allow_reserved && raw.contains(',') {
        Value::Array(raw.split(',').map(|item| Value::String(decode(item))).collect())
    } else {
        Value::String(decode(raw))
    }
}

fn named_pairs(op: Operator, span: &str) -> Vec<(String, Option<String>)> {
    let Some(body) = span.strip_prefix(op.first()) else {
        return Vec::new();
    };
    let separator = match op {
        Operator::PathParam => ';',
        _ => '&',
    };
    body.split(separator)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => (decode(name), Some(value.to_string())),
            None => (decode(segment), None),
        })
        .collect()
}

fn extract_positional(expr: &Expression, span: &str, defined: Option<&Params>, params: &mut Params) {
    let op = expr.operator;
    let body = span.strip_prefix(op.first()).unwrap_or(span);
    if span.is_empty() {
        return;
    }
    let variables: Vec<&VarSpec> = expr
        .variables
        .iter()
        .filter(|var| defined.map_or(true, |given| given.get(&var.name).and_then(to_expanded).is_some()))
        .collect();
    let segments: Vec<&str> = match op {
        Operator::Label | Operator::Path => body.split(op.separator()).collect(),
        _ => body.split(',').collect(),
    };

    if let [var] = variables.as_slice() {
        let value = if var.modifier == Modifier::Explode {
            if segments.iter().all(|segment| segment.contains('=')) {
                let entries = segments
                    .iter()
                    .filter_map(|segment| segment.split_once('='))
                    .map(|(key, value)| (decode(key), Value::String(decode(value))))
                    .collect();
                Value::Object(entries)
            } else if segments.len() > 1 {
                Value::Array(segments.iter().map(|segment| Value::String(decode(segment))).collect())
            } else {
                Value::String(decode(body))
            }
        } else {
            decode_value(body, op.allow_reserved())
        };
        if value != Value::String(String::new()) {
            params.insert(var.name.clone(), value);
        }
        return;
    }

    for (var, segment) in variables.into_iter().zip(segments) {
        if !segment.is_empty() {
            params.insert(var.name.clone(), Value::String(decode(segment)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    fn rfc_params() -> Params {
        params(json!({
            "var": "value",
            "hello": "Hello World!",
            "path": "/foo/bar",
            "empty": "",
            "x": "1024",
            "y": "768",
            "list": ["red", "green", "blue"],
            "keys": {"comma": ",", "dot": ".", "semi": ";"},
            "undef": null,
        }))
    }

    fn expands(template: &str) -> String {
        expand(template, &rfc_params()).unwrap()
    }

    #[test]
    fn level_one_and_two() {
        assert_eq!(expands("{var}"), "value");
        assert_eq!(expands("{hello}"), "Hello%20World%21");
        assert_eq!(expands("{+hello}"), "Hello%20World!");
        assert_eq!(expands("{+path}/here"), "/foo/bar/here");
        assert_eq!(expands("here?ref={+path}"), "here?ref=/foo/bar");
        assert_eq!(expands("X{#var}"), "X#value");
        assert_eq!(expands("X{#hello}"), "X#Hello%20World!");
    }

    #[test]
    fn level_three_operators() {
        assert_eq!(expands("map?{x,y}"), "map?1024,768");
        assert_eq!(expands("{x,hello,y}"), "1024,Hello%20World%21,768");
        assert_eq!(expands("{+x,hello,y}"), "1024,Hello%20World!,768");
        assert_eq!(expands("X{.var}"), "X.value");
        assert_eq!(expands("X{.x,y}"), "X.1024.768");
        assert_eq!(expands("{/var}"), "/value");
        assert_eq!(expands("{/var,x}/here"), "/value/1024/here");
        assert_eq!(expands("{;x,y}"), ";x=1024;y=768");
        assert_eq!(expands("{;x,y,empty}"), ";x=1024;y=768;empty");
        assert_eq!(expands("{?x,y}"), "?x=1024&y=768");
        assert_eq!(expands("{?x,y,empty}"), "?x=1024&y=768&empty=");
        assert_eq!(expands("?fixed=yes{&x}"), "?fixed=yes&x=1024");
        assert_eq!(expands("{&x,y,empty}"), "&x=1024&y=768&empty=");
    }

    #[test]
    fn level_four_modifiers() {
        assert_eq!(expands("{var:3}"), "val");
        assert_eq!(expands("{list}"), "red,green,blue");
        assert_eq!(expands("{list*}"), "red,green,blue");
        assert_eq!(expands("{keys}"), "comma,%2C,dot,.,semi,%3B");
        assert_eq!(expands("{keys*}"), "comma=%2C,dot=.,semi=%3B");
        assert_eq!(expands("{/list*,path:4}"), "/red/green/blue/%2Ffoo");
        assert_eq!(expands("{;list*}"), ";list=red;list=green;list=blue");
        assert_eq!(expands("{?list}"), "?list=red,green,blue");
        assert_eq!(expands("{?list*}"), "?list=red&list=green&list=blue");
        assert_eq!(expands("{?keys*}"), "?comma=%2C&dot=.&semi=%3B");
        assert_eq!(expands("{&keys*}"), "&comma=%2C&dot=.&semi=%3B");
    }

    #[test]
    fn undefined_values_are_skipped() {
        assert_eq!(expands("{undef}"), "");
        assert_eq!(expands("{?undef}"), "");
        assert_eq!(expands("{?x,undef,y}"), "?x=1024&y=768");
        assert_eq!(expands("{missing}/tail"), "/tail");
        assert_eq!(expand("http://api.dev/test/{id}", &Params::new()).unwrap(), "http://api.dev/test/");
    }

    #[test]
    fn scalars_other_than_strings() {
        let p = params(json!({"id": 12, "flag": true, "ratio": 1.5}));
        assert_eq!(expand("/t/{id}{?flag,ratio}", &p).unwrap(), "/t/12?flag=true&ratio=1.5");
    }

    #[test]
    fn reserved_expansion_keeps_existing_escapes() {
        let p = params(json!({"v": "a%20b%zz"}));
        assert_eq!(expand("{+v}", &p).unwrap(), "a%20b%25zz");
        assert_eq!(expand("{v}", &p).unwrap(), "a%2520b%25zz");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(UriTemplate::parse("/a/{id").unwrap_err(), TemplateError::Unclosed(3));
        assert_eq!(UriTemplate::parse("/a/id}").unwrap_err(), TemplateError::UnexpectedClose(5));
        assert_eq!(UriTemplate::parse("/a/{}").unwrap_err(), TemplateError::EmptyExpression(3));
        assert_eq!(UriTemplate::parse("{|x}").unwrap_err(), TemplateError::UnsupportedOperator('|'));
        assert!(matches!(UriTemplate::parse("{a b}"), Err(TemplateError::InvalidVariable(_))));
        assert!(matches!(UriTemplate::parse("{a:0}"), Err(TemplateError::InvalidVariable(_))));
    }

    #[test]
    fn variables_in_order() {
        let t = UriTemplate::parse("/users/{id}/posts{/post}{?page,id}").unwrap();
        assert_eq!(t.variables(), vec!["id", "post", "page"]);
    }

    #[test]
    fn extract_path_variable() {
        let t = UriTemplate::parse("http://api.dev/test/{id}").unwrap();
        let got = t.extract("http://api.dev/test/3");
        assert_eq!(got, params(json!({"id": "3"})));
        assert!(t.extract("http://api.dev/test/").is_empty());
        assert!(t.extract("http://other.dev/test/3").is_empty());
    }

    #[test]
    fn extract_decodes_values() {
        let t = UriTemplate::parse("/search/{term}{?q,lang}").unwrap();
        let p = params(json!({"term": "a b/c", "q": "x&y=z", "lang": "fr"}));
        let url = t.expand(&p);
        assert_eq!(url, "/search/a%20b%2Fc?q=x%26y%3Dz&lang=fr");
        assert_eq!(t.extract(&url), p);
    }

    #[test]
    fn extract_query_by_name_in_any_order() {
        let t = UriTemplate::parse("/items{?page,size}").unwrap();
        let got = t.extract("/items?size=10&page=2");
        assert_eq!(got, params(json!({"page": "2", "size": "10"})));
        assert_eq!(t.extract("/items"), Params::new());
    }

    #[test]
    fn extract_query_continuation_after_literal_query() {
        let t = UriTemplate::parse("/items?fixed=yes{&page}").unwrap();
        assert_eq!(t.extract("/items?fixed=yes&page=4"), params(json!({"page": "4"})));
    }

    #[test]
    fn extract_lists_and_maps() {
        let t = UriTemplate::parse("/c/{list}{?tags*}").unwrap();
        let p = params(json!({"list": ["a", "b"], "tags": ["x", "y"]}));
        let url = t.expand(&p);
        assert_eq!(url, "/c/a,b?tags=x&tags=y");
        assert_eq!(t.extract(&url), p);

        let t = UriTemplate::parse("/f{?filter*}").unwrap();
        let p = params(json!({"filter": {"color": "red", "size": "m"}}));
        let url = t.expand(&p);
        assert_eq!(t.extract(&url), p);

        let t = UriTemplate::parse("/p{/segments*}").unwrap();
        let p = params(json!({"segments": ["a", "b", "c"]}));
        assert_eq!(t.extract(&t.expand(&p)), p);
    }

    #[test]
    fn extract_label_and_fragment() {
        let t = UriTemplate::parse("/file{.ext}{#section}").unwrap();
        let p = params(json!({"ext": "json", "section": "a/b"}));
        let url = t.expand(&p);
        assert_eq!(url, "/file.json#a/b");
        assert_eq!(t.extract(&url), p);
    }

    #[test]
    fn extract_path_params() {
        let t = UriTemplate::parse("/m{;x,y,empty}").unwrap();
        let got = t.extract("/m;x=1024;y=768;empty");
        assert_eq!(got, params(json!({"x": "1024", "y": "768", "empty": ""})));
    }

    #[test]
    fn extract_is_inverse_of_expand_on_template_keys() {
        let templates = [
            "http://api.dev/test/{id}",
            "/users/{user}/repos/{repo}{?page,per_page}",
            "{/a,b}{?c}{&d}",
            "/x{.fmt}{;v}",
            "{+base}/static/{file}",
        ];
        let p = params(json!({
            "id": 3, "name": "Rupert", "user": "octo cat", "repo": "hal",
            "page": 2, "a": "one", "b": "two", "c": "ç", "d": "δ",
            "fmt": "xml", "v": "9", "base": "http://cdn.dev", "file": "app.js",
        }));
        for source in templates {
            let t = UriTemplate::parse(source).unwrap();
            let got = t.extract(&t.expand(&p));
            let mut expected: Vec<&str> = p
                .keys()
                .map(String::as_str)
                .filter(|key| t.variables().contains(key))
                .collect();
            expected.sort_unstable();
            let mut keys: Vec<&str> = got.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, expected, "{source}");
            for (key, value) in &got {
                let original = scalar_text(&p[key]).unwrap();
                assert_eq!(value, &Value::String(original), "{source}: {key}");
            }
        }
    }

    #[test]
    fn extract_for_skips_undefined_leading_variables() {
        for source in ["/x/{a,b}", "/x{/a,b}", "/x{.a,b}", "/x/{+a,b}"] {
            let t = UriTemplate::parse(source).unwrap();
            let p = params(json!({"b": "x", "name": "Rupert"}));
            let url = t.expand(&p);
            assert_eq!(t.extract_for(&url, &p), params(json!({"b": "x"})), "{source}");
        }
    }

    #[test]
    fn extract_for_pairs_defined_variables_in_order() {
        let t = UriTemplate::parse("/x{/a,b,c}").unwrap();
        let p = params(json!({"a": "1", "c": "3", "b": null}));
        let url = t.expand(&p);
        assert_eq!(url, "/x/1/3");
        assert_eq!(t.extract_for(&url, &p), params(json!({"a": "1", "c": "3"})));
    }

    #[test]
    fn extract_for_keeps_empty_defined_values_in_place() {
        let t = UriTemplate::parse("/x/{a,b}").unwrap();
        let p = params(json!({"a": "", "b": "x"}));
        let url = t.expand(&p);
        assert_eq!(url, "/x/,x");
        assert_eq!(t.extract_for(&url, &p), params(json!({"b": "x"})));
    }
}
