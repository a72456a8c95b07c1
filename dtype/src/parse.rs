//! Declaration text to [`TypeDescriptor`].
//!
//! Grammar, over whitespace separated tokens with `*` always a token of its own:
//!
//! ```text
//! declaration = [address_space] {qualifier} base_type ['*'] [qualifier]
//! base_type   = identifier [vector_width]
//! ```

use std::iter::Peekable;

use smallvec::SmallVec;
use snafu::OptionExt;

use crate::error::*;
use crate::{AddrSpace, Qualifier, TypeDescriptor, VectorWidth};

fn tokenize(declaration: &str) -> SmallVec<[&str; 8]> {
    let mut tokens = SmallVec::new();
    for word in declaration.split_whitespace() {
        let mut rest = word;
        while let Some(star) = rest.find('*') {
            if star > 0 {
                tokens.push(&rest[..star]);
            }
            tokens.push("*");
            rest = &rest[star + 1..];
        }
        if !rest.is_empty() {
            tokens.push(rest);
        }
    }
    tokens
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits `float4` into (`float`, 4). Trailing digits that are not a supported width stay in the name.
pub(crate) fn split_vector_width(base: &str) -> (&str, Option<VectorWidth>) {
    let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.is_empty() || stem.len() == base.len() {
        return (base, None);
    }
    match base[stem.len()..].parse::<usize>().ok().and_then(|n| VectorWidth::try_from(n).ok()) {
        Some(width) => (stem, Some(width)),
        None => (base, None),
    }
}

impl TypeDescriptor {
    /// Parses a declaration such as `__global const float4* const`.
    ///
    /// Address spaces are normalized to their unprefixed keyword. Fails with [`Error::Syntax`]
    /// naming the first token no rule accepts.
    pub fn from_declaration(declaration: &str) -> Result<Self> {
        let tokens = tokenize(declaration);
        let mut tokens = tokens.iter().copied().peekable();
        let syntax = |token: &str| Error::Syntax { token: token.to_string(), declaration: declaration.to_string() };

        let address_space =
            tokens.next_if(|token| AddrSpace::from_keyword(token).is_some()).and_then(AddrSpace::from_keyword);

        let mut pre_qualifiers = SmallVec::<[Qualifier; 2]>::new();
        while let Some(qualifier) = next_qualifier(&mut tokens) {
            pre_qualifiers.push(qualifier);
        }

        let base = tokens.next().context(MissingBaseTypeSnafu { declaration })?;
        if !is_identifier(base) || AddrSpace::from_keyword(base).is_some() {
            return Err(syntax(base));
        }
        let (raw_type, vector_width) = split_vector_width(base);

        let pointer = tokens.next_if_eq(&"*").is_some();
        let post_qualifier = next_qualifier(&mut tokens);

        if let Some(token) = tokens.next() {
            return Err(syntax(token));
        }

        let mut descriptor = TypeDescriptor::new(raw_type);
        descriptor
            .set_vector_width(vector_width)
            .set_pointer(pointer)
            .set_address_space(address_space)
            .set_pre_qualifiers(pre_qualifiers.into_vec())
            .set_post_qualifier(post_qualifier);
        Ok(descriptor)
    }
}

fn next_qualifier<'a>(tokens: &mut Peekable<impl Iterator<Item = &'a str>>) -> Option<Qualifier> {
    tokens.next_if(|token| Qualifier::from_keyword(token).is_some()).and_then(Qualifier::from_keyword)
}
