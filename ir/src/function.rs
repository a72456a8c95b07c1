//! Function descriptors.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use bon::bon;
use snafu::ensure;

use crate::error::*;
use crate::parameter::Parameter;
use crate::parser::parse_declaration;

struct FunctionInner {
    return_type: String,
    name: String,
    parameters: Vec<Parameter>,
    body: String,
    extra: Option<String>,
    dependencies: Vec<Function>,
    content_hash: OnceLock<u64>,
}

/// An immutable device function: return type, name, parameters, body, optional extra top-level
/// code and the functions it depends on.
///
/// Cloning is cheap and shares the definition. Equality and hashing are structural over
/// (return type, name, parameter signatures, body, extra code, dependencies).
#[derive(Clone)]
pub struct Function(Arc<FunctionInner>);

#[bon]
impl Function {
    /// Builds a function from its parts.
    ///
    /// Fails when a parameter name repeats or when a dependency (transitively) carries this
    /// function's name, which the inclusion guards would silently turn into a missing definition.
    ///
    /// ```ignore
    /// let f = Function::define().return_type("double").name("square")
    ///     .parameters(vec!["double x".parse()?]).body("return x * x;").call()?;
    /// ```
    #[builder]
    pub fn define(
        #[builder(into)] return_type: String,
        #[builder(into)] name: String,
        #[builder(default)] parameters: Vec<Parameter>,
        #[builder(into)] body: String,
        #[builder(default)] dependencies: Vec<Function>,
        #[builder(into)] extra: Option<String>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for parameter in &parameters {
            ensure!(
                seen.insert(parameter.name()),
                DuplicateParameterSnafu { function: name.as_str(), name: parameter.name() }
            );
        }

        crate::graph::check_acyclic(&name, &dependencies)?;

        Ok(Self(Arc::new(FunctionInner {
            return_type,
            name,
            parameters,
            body,
            extra,
            dependencies,
            content_hash: OnceLock::new(),
        })))
    }

    /// Parses `[address space] <return type> <name>(<arguments>) { <body> }`.
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with(source, Vec::new(), None)
    }

    /// Parses a declaration and attaches dependencies and extra code.
    pub fn parse_with(source: &str, dependencies: Vec<Function>, extra: Option<String>) -> Result<Self> {
        let declaration = parse_declaration(source)?;
        let parameters: Vec<Parameter> =
            declaration.arguments.iter().map(|argument| Parameter::from_declaration(argument)).collect::<Result<_>>()?;

        Self::define()
            .return_type(declaration.return_type)
            .name(declaration.name)
            .parameters(parameters)
            .body(declaration.body.inner_text())
            .dependencies(dependencies)
            .maybe_extra(extra)
            .call()
    }
}

impl Function {
    pub fn return_type(&self) -> &str {
        &self.0.return_type
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.0.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.0.parameters.iter().find(|parameter| parameter.name() == name)
    }

    pub fn body(&self) -> &str {
        &self.0.body
    }

    pub fn extra(&self) -> Option<&str> {
        self.0.extra.as_deref()
    }

    pub fn dependencies(&self) -> &[Function] {
        &self.0.dependencies
    }

    pub fn is_void(&self) -> bool {
        self.0.return_type.trim() == "void"
    }

    /// Whether both handles share one definition.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable structural hash, computed once.
    pub fn content_hash(&self) -> u64 {
        *self.0.content_hash.get_or_init(|| {
            use xxhash_rust::xxh64::Xxh64;

            let inner = &self.0;
            let mut hasher = Xxh64::new(0);
            inner.return_type.hash(&mut hasher);
            inner.name.hash(&mut hasher);
            inner.parameters.hash(&mut hasher);
            inner.body.hash(&mut hasher);
            inner.extra.hash(&mut hasher);
            inner.dependencies.len().hash(&mut hasher);
            for dependency in &inner.dependencies {
                dependency.content_hash().hash(&mut hasher);
            }
            hasher.finish()
        })
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (&self.0, &other.0);
        self.content_hash() == other.content_hash()
            && a.name == b.name
            && a.return_type == b.return_type
            && a.parameters == b.parameters
            && a.body == b.body
            && a.extra == b.extra
            && a.dependencies == b.dependencies
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("signature", &self.signature())
            .field("dependencies", &self.0.dependencies.iter().map(Function::name).collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.definition())
    }
}
