use openssl::error::ErrorStack;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the payment client.
#[derive(Error, Debug)]
pub enum Error {
    /// The request could not be sent or its response body could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response lacks a usable `return_code`.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A response claiming success carries a signature that does not match.
    #[error("Invalid sign value in response")]
    TrustFailure,

    /// The client is missing something the operation needs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The merchant certificate archive could not be turned into a TLS identity.
    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("OpenSSL error: {0}")]
    Crypto(#[from] ErrorStack),

    #[error("XML processing error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Xml(err.utf8_error().to_string())
    }
}
