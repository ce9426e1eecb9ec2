//! Builder-call grammar shared by column, relation, middleware, rule and directive lines.
//!
//! A line is a whitespace-separated list of calls; a call is `name[:arg1,arg2,...]`.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn property_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)$").expect("valid regex"))
}

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// One argument of a call: a literal value, or a reference to a variable (optionally one of its properties).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Literal(String),
    Variable {
        name: String,
        property: Option<String>,
    },
}

impl Argument {
    /// Builder-call argument: `post.title` is a property reference, anything else is literal.
    pub fn parse(token: &str) -> Self {
        if let Some(caps) = property_pattern().captures(token) {
            return Argument::Variable {
                name: caps[1].to_string(),
                property: Some(caps[2].to_string()),
            };
        }
        Argument::Literal(token.to_string())
    }

    /// Directive argument: bare identifiers are variables; quoted, numeric and keyword tokens are literal.
    pub fn parse_reference(token: &str) -> Self {
        let quoted = token.len() >= 2
            && ((token.starts_with('\'') && token.ends_with('\''))
                || (token.starts_with('"') && token.ends_with('"')));
        if quoted {
            return Argument::Literal(token[1..token.len() - 1].to_string());
        }
        if matches!(token, "true" | "false" | "null") || token.parse::<f64>().is_ok() {
            return Argument::Literal(token.to_string());
        }
        if identifier_pattern().is_match(token) {
            return Argument::Variable {
                name: token.to_string(),
                property: None,
            };
        }
        Argument::parse(token)
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Argument::Literal(s) => Some(s.as_str()),
            Argument::Variable { .. } => None,
        }
    }

    /// The raw text of the argument, whatever its kind.
    pub fn text(&self) -> String {
        match self {
            Argument::Literal(s) => s.clone(),
            Argument::Variable { name, property: None } => name.clone(),
            Argument::Variable {
                name,
                property: Some(p),
            } => format!("{}.{}", name, p),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Method {
    pub name: String,
    pub arguments: Vec<Argument>,
}

impl Method {
    /// Parse `name:arg1,arg2`. Empty arguments are dropped.
    pub fn parse(call: &str) -> Self {
        Self::parse_with(call, Argument::parse)
    }

    /// Like [`Method::parse`], with bare identifier arguments read as variables.
    pub fn parse_directive(call: &str) -> Self {
        Self::parse_with(call, Argument::parse_reference)
    }

    fn parse_with(call: &str, argument: fn(&str) -> Argument) -> Self {
        let (name, args) = match call.split_once(':') {
            Some((name, args)) => (name, args),
            None => (call, ""),
        };
        Method {
            name: name.to_string(),
            arguments: args
                .split(',')
                .filter(|a| !a.is_empty())
                .map(argument)
                .collect(),
        }
    }

    pub fn first_literal(&self) -> Option<&str> {
        self.arguments.first().and_then(Argument::as_literal)
    }

    pub fn literals(&self) -> Vec<String> {
        self.arguments.iter().map(Argument::text).collect()
    }
}

/// Parse a whole line into its calls, in order.
pub fn parse_line(line: &str) -> Vec<Method> {
    line.split_whitespace().map(Method::parse).collect()
}

/// A directive line `Target arg arg...`, e.g. an event class with its constructor arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Call {
    pub target: String,
    pub arguments: Vec<Argument>,
}

impl Call {
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let target = tokens.next()?;
        Some(Call {
            target: target.to_string(),
            arguments: tokens.map(Argument::parse_reference).collect(),
        })
    }
}
