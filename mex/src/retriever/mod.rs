//! Retrievers: value-identity units of work, one per document to fetch
//!
//! A retriever describes *how* to obtain one document, either by location
//! (`LocationRetriever`) or by sending a get-request to an endpoint
//! (`ReferenceRetriever`). Two retrievers are equal when their kind and
//! location/address are equal, whatever dialect or identifier they carry.
//! That identity is what the visited set is keyed by.

pub mod location;
pub mod reference;

pub use location::LocationRetriever;
pub use reference::ReferenceRetriever;

use crate::document::{Document, DocumentClassifier};
use crate::error::MexResult;
use crate::resolve::Deadline;
use crate::transport::Backends;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Everything a retrieval needs besides the retriever itself
pub struct RetrievalContext<'a> {
    pub backends: &'a Backends,
    pub classifier: DocumentClassifier,
    pub deadline: &'a Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RetrieverKind {
    Location,
    Reference,
}

#[derive(Debug, Clone)]
pub enum Retriever {
    Location(LocationRetriever),
    Reference(ReferenceRetriever),
}

impl Retriever {
    fn identity(&self) -> (RetrieverKind, &str) {
        match self {
            Retriever::Location(r) => (RetrieverKind::Location, r.location().as_str()),
            Retriever::Reference(r) => (RetrieverKind::Reference, r.address().as_str()),
        }
    }

    /// Location or address the retriever fetches from
    pub fn source(&self) -> &str {
        self.identity().1
    }

    pub fn dialect(&self) -> Option<&str> {
        match self {
            Retriever::Location(r) => r.dialect(),
            Retriever::Reference(r) => r.dialect(),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Retriever::Location(r) => r.identifier(),
            Retriever::Reference(r) => r.identifier(),
        }
    }

    /// Fetch and classify the document. The deadline is checked before
    /// anything is sent; an exhausted budget fails with `Timeout`.
    pub async fn retrieve(&self, ctx: &RetrievalContext<'_>) -> MexResult<Document> {
        let remaining = ctx.deadline.remaining()?;
        match self {
            Retriever::Location(r) => r.retrieve(ctx, remaining).await,
            Retriever::Reference(r) => r.retrieve(ctx, remaining).await,
        }
    }
}

impl PartialEq for Retriever {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Retriever {}

impl Hash for Retriever {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retriever::Location(r) => write!(f, "location {}", r.location()),
            Retriever::Reference(r) => match r.via() {
                Some(via) => write!(f, "reference {} via {}", r.address(), via),
                None => write!(f, "reference {}", r.address()),
            },
        }
    }
}

impl From<LocationRetriever> for Retriever {
    fn from(r: LocationRetriever) -> Self {
        Retriever::Location(r)
    }
}

impl From<ReferenceRetriever> for Retriever {
    fn from(r: ReferenceRetriever) -> Self {
        Retriever::Reference(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::dialect;
    use std::collections::HashSet;

    fn schemes() -> Vec<String> {
        vec!["http".to_string(), "https".to_string()]
    }

    fn location(url: &str, dialect: Option<&str>) -> Retriever {
        LocationRetriever::new(url, dialect, None, &schemes())
            .unwrap()
            .into()
    }

    #[test]
    fn test_equality_ignores_dialect_and_identifier() {
        let a = location("http://h/a/b.xsd", Some(dialect::XML_SCHEMA));
        let b: Retriever = LocationRetriever::new("http://h/a/b.xsd", None, Some("urn:x"), &schemes())
            .unwrap()
            .into();
        assert_eq!(a, b);

        let mut visited = HashSet::new();
        visited.insert(a);
        assert!(visited.contains(&b));
    }

    #[test]
    fn test_equality_uses_normalized_url() {
        assert_eq!(
            location("HTTP://H:80/a/./b.xsd", None),
            location("http://h/a/b.xsd", None)
        );
    }

    #[test]
    fn test_kinds_never_compare_equal() {
        let by_location = location("http://h/mex", None);
        let by_reference: Retriever = ReferenceRetriever::new("http://h/mex", None, None, None, &schemes())
            .unwrap()
            .into();
        assert_ne!(by_location, by_reference);
    }

    #[test]
    fn test_reference_identity_ignores_via() {
        let direct: Retriever = ReferenceRetriever::new("http://h/mex", None, None, None, &schemes())
            .unwrap()
            .into();
        let routed: Retriever =
            ReferenceRetriever::new("http://h/mex", Some("http://gateway/"), None, None, &schemes())
                .unwrap()
                .into();
        assert_eq!(direct, routed);
        assert_eq!(routed.to_string(), "reference http://h/mex via http://gateway/");
    }
}
