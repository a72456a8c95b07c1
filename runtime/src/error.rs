//! Error types for evaluation.

use snafu::Snafu;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while evaluating a function.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Inputs or runtime settings do not describe a valid execution.
    #[snafu(display("{reason}"))]
    Configuration { reason: String },

    /// Function declaration error.
    #[snafu(display("{source}"))]
    Ir { source: devfn_ir::Error },

    /// Kernel data or kernel source could not be prepared.
    #[snafu(display("invalid kernel data: {source}"))]
    Codegen { source: devfn_codegen::Error },

    /// Compilation, launch or transfer failed on a device.
    #[snafu(display("{source}"))]
    Device { source: devfn_device::Error },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Detected before any device work: missing inputs, shape mismatches, bad settings.
    Configuration,
    /// Function source text does not parse.
    Syntax,
    /// The generated program does not build on a device.
    Compile,
    /// A launch or copy failed on a device.
    Runtime,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use devfn_device::Error as DeviceError;
        use devfn_ir::Error as IrError;

        match self {
            Self::Configuration { .. } | Self::Codegen { .. } => ErrorKind::Configuration,
            Self::Ir { source } => match source {
                IrError::Syntax { .. } | IrError::ParameterType { .. } | IrError::InvalidParameter { .. } => {
                    ErrorKind::Syntax
                }
                IrError::DuplicateParameter { .. } | IrError::DependencyCycle { .. } => ErrorKind::Configuration,
            },
            Self::Device { source } => match source {
                DeviceError::Compile { .. } => ErrorKind::Compile,
                DeviceError::Launch { .. } | DeviceError::Transfer { .. } => ErrorKind::Runtime,
                DeviceError::Discovery { .. } => ErrorKind::Configuration,
            },
        }
    }
}
