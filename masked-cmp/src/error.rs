use thiserror::Error;

use crate::command::ProtocolVersion;

/// The errors that can occur while setting up or driving a masked comparison
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The parameter set violates a constraint of the masking code
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),
    /// A scenario buffer could not be allocated
    #[error("Failed to allocate a buffer of {0} words")]
    Allocation(usize),
    /// The host speaks a different command framing version
    #[error("Wrong protocol version {found}, need {expected}")]
    ProtocolVersion {
        /// The version this crate implements
        expected: ProtocolVersion,
        /// The version announced by the host
        found: ProtocolVersion,
    },
    /// A protocol version string is not of the form `major.minor`
    #[error("Malformed protocol version")]
    MalformedVersion,
    /// The command byte does not name a known command
    #[error("Unknown command {0:#04x}")]
    UnknownCommand(u8),
    /// The masked comparator reported equality in a scenario built to differ
    #[error("Masked comparison reported equal ciphertexts")]
    UnexpectedEqual,
}

/// The result type for masked comparison operations
pub type Result<T> = core::result::Result<T, Error>;
