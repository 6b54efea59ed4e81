use thiserror::Error;

use crate::driver::abi::Capability;

#[derive(Error, Debug)]
pub enum DriverError {
    /// No candidate library name could be loaded during initialization.
    #[error("no native database library could be loaded (tried: {})", .tried.join(", "))]
    LibraryNotFound { tried: Vec<String> },

    /// Initialization completed but left one or more capabilities unresolved.
    #[error("driver initialized with unresolved capabilities: {}", .0.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))]
    Unresolved(Vec<Capability>),

    /// A forwarding operation hit an unresolved dispatch-table slot.
    #[error("capability {0} is not resolved in the dispatch table")]
    UnresolvedSlot(Capability),

    /// The underlying open call reported failure; no handle was produced.
    #[error("cannot open database: {message}")]
    Open { message: String },

    /// The underlying execute call reported failure.
    #[error("SQL error: {message}")]
    Execute { message: String },

    /// An argument contained an interior NUL byte and cannot cross the FFI
    /// boundary as a C string.
    #[error("argument contains an interior NUL byte")]
    InvalidString(#[from] std::ffi::NulError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
