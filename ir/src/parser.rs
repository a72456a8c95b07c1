//! Grammar for function declarations.
//!
//! ```text
//! declaration = header arguments compound
//! header      = {identifier | '*'} identifier          (return type tokens, then the name)
//! arguments   = '(' [argument {',' argument}] ')'
//! compound    = '{' {text | compound} '}'
//! ```
//!
//! The body is kept verbatim; nested blocks are modeled by [`Compound`] so that braces inside
//! the body balance.

use chumsky::error::SimpleReason;
use chumsky::prelude::*;

use crate::error::Error;

/// Brace-delimited block: a sequence of raw text runs and nested blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compound {
    Text(String),
    Block(Vec<Compound>),
}

impl Compound {
    fn write_to(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Block(items) => {
                out.push('{');
                items.iter().for_each(|item| item.write_to(out));
                out.push('}');
            }
        }
    }

    /// Text between the outer braces, nested blocks included verbatim.
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Block(items) => items.iter().for_each(|item| item.write_to(&mut out)),
        }
        out
    }

    /// Deepest brace nesting, counting this block.
    pub fn depth(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Block(items) => 1 + items.iter().map(Compound::depth).max().unwrap_or(0),
        }
    }
}

/// Parsed but not yet typed function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Return type tokens, address space included (`global float4*`).
    pub return_type: String,
    pub name: String,
    /// Raw argument declarations, trimmed; empty for `()` and `(void)`.
    pub arguments: Vec<String>,
    pub body: Compound,
}

fn compound() -> impl Parser<char, Compound, Error = Simple<char>> {
    recursive(|compound| {
        none_of("{}")
            .repeated()
            .at_least(1)
            .collect::<String>()
            .map(Compound::Text)
            .or(compound)
            .repeated()
            .delimited_by(just('{'), just('}'))
            .map(Compound::Block)
    })
}

fn header() -> impl Parser<char, (String, String), Error = Simple<char>> {
    let token = text::ident().or(just('*').to("*".to_string())).padded();

    token.repeated().at_least(2).try_map(|mut tokens: Vec<String>, span: std::ops::Range<usize>| {
        let name = tokens.pop().filter(|name| name != "*");
        let name = name.ok_or_else(|| Simple::custom(span.clone(), "expected a function name"))?;
        if tokens.iter().all(|token| token == "*") {
            return Err(Simple::custom(span, "expected a return type"));
        }

        let mut return_type = String::new();
        for token in tokens {
            if token != "*" && !return_type.is_empty() {
                return_type.push(' ');
            }
            return_type.push_str(&token);
        }
        Ok((return_type, name))
    })
}

fn arguments() -> impl Parser<char, Vec<String>, Error = Simple<char>> {
    none_of(",()")
        .repeated()
        .collect::<String>()
        .separated_by(just(','))
        .delimited_by(just('('), just(')'))
        .try_map(|arguments: Vec<String>, span| {
            let arguments: Vec<String> = arguments.iter().map(|argument| argument.trim().to_string()).collect();
            match arguments.as_slice() {
                [] => Ok(Vec::new()),
                [only] if only.is_empty() || only == "void" => Ok(Vec::new()),
                _ if arguments.iter().any(String::is_empty) => Err(Simple::custom(span, "empty argument")),
                _ => Ok(arguments),
            }
        })
}

fn declaration() -> impl Parser<char, Declaration, Error = Simple<char>> {
    header()
        .then(arguments())
        .then(compound().padded())
        .then_ignore(end())
        .map(|(((return_type, name), arguments), body)| Declaration { return_type, name, arguments, body })
}

/// Parses one function declaration with body.
pub fn parse_declaration(source: &str) -> Result<Declaration, Error> {
    declaration().parse(source).map_err(|errors| {
        let first = errors.into_iter().min_by_key(|error| error.span().start);
        match first {
            Some(error) => Error::Syntax { offset: error.span().start, reason: describe(&error) },
            None => Error::Syntax { offset: 0, reason: "unrecognized input".to_string() },
        }
    })
}

fn describe(error: &Simple<char>) -> String {
    match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("unclosed delimiter `{delimiter}`"),
        _ => match error.found() {
            Some(found) => format!("unexpected `{found}`"),
            None => "unexpected end of input".to_string(),
        },
    }
}
