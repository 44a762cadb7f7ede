//! Error and result type for the stub transport

/// An enum of all error kinds.
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum Error {
    /// Internal client error
    #[error("client error: {0}")]
    Client(&'static str),
}

impl From<&'static str> for Error {
    fn from(string: &'static str) -> Error {
        Error::Client(string)
    }
}
