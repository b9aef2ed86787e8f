//! Error taxonomy for metadata resolution
//!
//! Every top-level call either returns a complete document set or exactly one
//! `MexError`. Nothing is retried internally and nothing is skipped.

use std::time::Duration;
use thiserror::Error;

pub type MexResult<T> = Result<T, MexError>;

/// Error returned by every resolution entry point
#[derive(Debug, Error)]
pub enum MexError {
    /// Malformed seed location or disallowed scheme, raised before any I/O
    #[error("invalid metadata location '{location}': {reason}")]
    Construction { location: String, reason: String },

    /// One document in the graph could not be fetched, parsed or followed
    #[error("bad metadata reference at {location}: {source}")]
    BadReference {
        location: String,
        #[source]
        source: Box<ReferenceFailure>,
    },

    #[error("metadata resolution exceeded its timeout of {budget:?}")]
    Timeout { budget: Duration },

    #[error("metadata graph requires more than {max} resolved references")]
    TooManyReferences { max: usize },

    #[error("invalid resolver configuration: {0}")]
    Config(String),

    #[error("blocking resolution cannot run inside an async runtime; use the async entry point")]
    BlockingInAsyncContext,

    #[error("failed to start resolver runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl MexError {
    pub fn construction(location: impl Into<String>, reason: impl Into<String>) -> Self {
        MexError::Construction {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn bad_reference(location: impl Into<String>, failure: impl Into<ReferenceFailure>) -> Self {
        MexError::BadReference {
            location: location.into(),
            source: Box::new(failure.into()),
        }
    }

    /// Location of the offending document, when the error names one
    pub fn location(&self) -> Option<&str> {
        match self {
            MexError::Construction { location, .. } | MexError::BadReference { location, .. } => {
                Some(location)
            }
            _ => None,
        }
    }
}

/// Underlying cause of a `BadReference`
#[derive(Debug, Error)]
pub enum ReferenceFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// An import or pointer inside the document names an unusable location
    #[error("{0}")]
    Import(String),
}

/// Failure of a fetch collaborator
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}")]
    Status { status: u16 },

    #[error("response exceeded the maximum size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("unsupported character encoding '{0}'")]
    UnsupportedCharset(String),

    #[error("response is not valid {0}")]
    Decode(String),

    #[error("SOAP fault: {0}")]
    Fault(String),

    #[error("metadata channel error: {0}")]
    Channel(String),
}

/// Failure to read a fetched document
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document is empty")]
    Empty,

    #[error("document nesting exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    #[error("text content exceeds the maximum length of {limit} bytes")]
    TextTooLong { limit: usize },

    #[error("malformed metadata: {0}")]
    Malformed(String),
}

impl From<quick_xml::events::attributes::AttrError> for ClassifyError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ClassifyError::Xml(quick_xml::Error::InvalidAttr(err))
    }
}
