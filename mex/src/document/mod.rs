//! Metadata documents
//!
//! - **Types**: `types.rs` - the `Document` tagged union and declared imports
//! - **Classifier**: `classify.rs` - root-element sniffing and import extraction
//! - **Dialects**: `dialect.rs` - dialect and namespace identifiers
//! - **XML**: `xml.rs` - quota-enforcing element tree behind the classifier

pub mod classify;
pub mod dialect;
pub mod types;
pub(crate) mod xml;

pub use classify::DocumentClassifier;
pub use types::*;
