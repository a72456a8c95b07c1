use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Device program failed to build.
    #[snafu(display("compilation failed on {device}:\n{log}"))]
    Compile { device: String, log: String },

    /// Kernel argument binding or launch failed.
    #[snafu(display("kernel launch failed on {device}: {reason}"))]
    Launch { device: String, reason: String },

    /// Buffer allocation or host/device copy failed.
    #[snafu(display("transfer failed on {device}: {reason}"))]
    Transfer { device: String, reason: String },

    /// Platform or device enumeration failed.
    #[snafu(display("device discovery failed: {reason}"))]
    Discovery { reason: String },
}
