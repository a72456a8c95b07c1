use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Parameter type does not parse.
    #[snafu(display("invalid type in parameter `{declaration}`: {source}"))]
    ParameterType { declaration: String, source: devfn_dtype::Error },

    /// Parameter declaration has no name, or the name is not an identifier.
    #[snafu(display("invalid parameter declaration `{declaration}`"))]
    InvalidParameter { declaration: String },

    /// Function source text does not match the declaration grammar.
    #[snafu(display("syntax error in function declaration at offset {offset}: {reason}"))]
    Syntax { offset: usize, reason: String },

    #[snafu(display("function `{function}` declares parameter `{name}` more than once"))]
    DuplicateParameter { function: String, name: String },

    /// A function (transitively) depends on a function with its own name.
    #[snafu(display("dependency cycle: {}", path.join(" -> ")))]
    DependencyCycle { path: Vec<String> },
}
