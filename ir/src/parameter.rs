//! Function parameters.

use std::fmt;

use devfn_dtype::TypeDescriptor;
use snafu::{OptionExt, ResultExt, ensure};

use crate::error::*;

/// A named, typed function parameter.
///
/// Dotted names (`model.x`) are allowed and lowered to underscores in device code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    name: String,
    dtype: TypeDescriptor,
}

impl Parameter {
    pub fn new(dtype: TypeDescriptor, name: impl Into<String>) -> Self {
        Self { name: name.into(), dtype }
    }

    /// Parses `global const double* x`: the last whitespace separated token is the name,
    /// everything before it is the type.
    ///
    /// Pointer stars glued to the name (`double *x`) belong to the type.
    pub fn from_declaration(declaration: &str) -> Result<Self> {
        let trimmed = declaration.trim();
        let split = trimmed.rfind(char::is_whitespace).context(InvalidParameterSnafu { declaration })?;
        let (type_part, name) = trimmed.split_at(split);

        let stars = name.trim_start().len() - name.trim_start().trim_start_matches('*').len();
        let name = name.trim_start().trim_start_matches('*');
        ensure!(is_parameter_name(name), InvalidParameterSnafu { declaration });

        let type_text = format!("{}{}", type_part.trim_end(), "*".repeat(stars));
        let dtype = TypeDescriptor::from_declaration(&type_text).context(ParameterTypeSnafu { declaration })?;
        Ok(Self::new(dtype, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> &TypeDescriptor {
        &self.dtype
    }

    /// Name as used in device code.
    pub fn cl_name(&self) -> String {
        self.name.replace('.', "_")
    }

    /// `<declaration> <cl name>`, as written in a parameter list.
    pub fn signature(&self) -> String {
        format!("{} {}", self.dtype.declaration(), self.cl_name())
    }

    /// Copy of this parameter under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), dtype: self.dtype.clone() }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl std::str::FromStr for Parameter {
    type Err = Error;

    fn from_str(declaration: &str) -> Result<Self> {
        Self::from_declaration(declaration)
    }
}

fn is_parameter_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
