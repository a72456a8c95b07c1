use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A token of a type declaration matches no grammar rule.
    #[snafu(display("syntax error in type declaration `{declaration}`: unexpected token `{token}`"))]
    Syntax { token: String, declaration: String },

    /// The declaration ended before a base type was found.
    #[snafu(display("syntax error in type declaration `{declaration}`: missing base type"))]
    MissingBaseType { declaration: String },

    #[snafu(display("unsupported vector width {width}, expected one of 2, 3, 4, 8, 16"))]
    UnsupportedVectorWidth { width: usize },
}
