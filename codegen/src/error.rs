//! Error types for kernel data marshalling and source generation.

use devfn_dtype::ScalarDType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while preparing kernel data and kernel source.
///
/// All of them are detected before any device work is submitted.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Element type text does not parse.
    #[snafu(display("invalid element type `{ctype}`: {source}"))]
    InvalidType { ctype: String, source: devfn_dtype::Error },

    /// Element type has no scalar component type (e.g. a user defined struct).
    #[snafu(display("element type `{ctype}` of `{name}` has no host representation"))]
    UnresolvedType { name: String, ctype: String },

    #[snafu(display("{len} values do not fill shape {shape:?}"))]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    /// Row width is not a whole number of vector elements.
    #[snafu(display("rows of `{name}` hold {row_len} values, not a positive multiple of {lanes} lanes"))]
    RowWidth { name: String, row_len: usize, lanes: usize },

    #[snafu(display("scalar `{name}` has {found} components, its type needs {expected}"))]
    ScalarWidth { name: String, expected: usize, found: usize },

    #[snafu(display("`{name}` has {rows} rows but {instances} instances are requested"))]
    TooFewRows { name: String, rows: usize, instances: usize },

    #[snafu(display("buffer holds `{found}` values, `{expected}` requested"))]
    ElementType { expected: ScalarDType, found: ScalarDType },

    #[snafu(display("no kernel data for `{name}`"))]
    MissingData { name: String },

    /// A pointer parameter (possibly needing a private or local scratch copy) was given by-value data.
    #[snafu(display("pointer parameter `{name}` needs buffer data, got a scalar"))]
    PointerWithoutBuffer { name: String },

    #[snafu(display("no buffer argument at index {index}"))]
    ArgumentIndex { index: usize },

    #[snafu(display("transfer of {len} bytes does not match rows {start}..{end} of `{name}`"))]
    TransferSize { name: String, start: usize, end: usize, len: usize },
}
