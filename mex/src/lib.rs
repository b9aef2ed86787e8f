// mex library
// Metadata exchange resolver - turns one or a few seed locations into a complete,
// flattened set of interface descriptions, schemas and pointer documents.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod resolve;
pub mod retriever;
pub mod transport;

// Re-export the main entry points
pub use crate::client::{DocumentSet, MetadataExchangeClient, MetadataExchangeClientMode, Seed};
pub use crate::config::ResolverConfig;
pub use crate::document::{Document, DocumentBody, DocumentKind, ImportedLocation};
pub use crate::error::{ClassifyError, MexError, MexResult, ReferenceFailure, TransportError};
pub use crate::retriever::Retriever;
