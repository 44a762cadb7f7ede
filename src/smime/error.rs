//! Error and result type for the S/MIME sealer

/// An enum of all error kinds.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// OpenSSL rejected the key or certificate material, or the seal
    /// operation itself failed
    #[error("crypto error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
    /// Certificate or key material could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The recipient-keyed certificate map has no entry for this address
    #[error("no encryption certificate for recipient <{0}>")]
    MissingRecipientCert(String),
    /// Envelope error
    #[error("envelope error: {0}")]
    Envelope(#[from] crate::types::Error),
}

/// Seal result type
pub type SealResult<T> = Result<T, Error>;
