//! Crawl state of one resolution call

use crate::document::{Document, DocumentBody, ImportedLocation};
use crate::error::{MexError, MexResult, ReferenceFailure};
use crate::retriever::{LocationRetriever, ReferenceRetriever, Retriever};
use std::collections::HashSet;
use url::Url;

/// Work stack, visited set and output of one walk. Owned by exactly one
/// resolution call and dropped when it returns.
#[derive(Debug)]
pub struct ResolutionState {
    stack: Vec<Retriever>,
    visited: HashSet<Retriever>,
    output: Vec<Document>,
    max_resolved: usize,
    resolve_nested: bool,
    allowed_schemes: Vec<String>,
}

impl ResolutionState {
    pub fn new(max_resolved: usize, resolve_nested: bool, allowed_schemes: Vec<String>) -> Self {
        Self {
            stack: Vec::new(),
            visited: HashSet::new(),
            output: Vec::new(),
            max_resolved,
            resolve_nested,
            allowed_schemes,
        }
    }

    pub fn push(&mut self, retriever: Retriever) {
        self.stack.push(retriever);
    }

    /// Most recently pushed retriever first
    pub fn pop_next(&mut self) -> Option<Retriever> {
        self.stack.pop()
    }

    pub fn has_been_visited(&self, retriever: &Retriever) -> bool {
        self.visited.contains(retriever)
    }

    /// Records a retrieval about to happen; refused once the limit is reached
    pub fn mark_visited(&mut self, retriever: Retriever) -> MexResult<()> {
        if self.is_at_capacity() {
            return Err(MexError::TooManyReferences {
                max: self.max_resolved,
            });
        }
        self.visited.insert(retriever);
        Ok(())
    }

    pub fn is_at_capacity(&self) -> bool {
        self.visited.len() >= self.max_resolved
    }

    pub fn max_resolved(&self) -> usize {
        self.max_resolved
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.stack.len()
    }

    pub fn output(&self) -> &[Document] {
        &self.output
    }

    pub fn into_output(self) -> Vec<Document> {
        self.output
    }

    /// Fold a fetched document into the state. This is the only place the
    /// graph grows: pointers and imports become new retrievers on the stack
    /// (when nested resolution is on), content goes to the output.
    pub fn absorb(&mut self, document: Document) -> MexResult<()> {
        let Document {
            source_location,
            dialect,
            identifier,
            body,
        } = document;

        match body {
            DocumentBody::CompositeSet { children } => {
                for mut child in children {
                    if let Some(base) = source_location.as_deref() {
                        child.stamp_source_location(base);
                    }
                    self.absorb(child)?;
                }
                Ok(())
            }
            DocumentBody::ReferencePointer { address } if self.resolve_nested => {
                let retriever = ReferenceRetriever::new(
                    &address,
                    None,
                    dialect.as_deref(),
                    identifier.as_deref(),
                    &self.allowed_schemes,
                )
                .map_err(|e| unusable_pointer(source_location.as_deref(), &address, e))?;
                self.push(retriever.into());
                Ok(())
            }
            DocumentBody::LocationPointer { location } if self.resolve_nested => {
                let retriever = self.location_retriever(
                    source_location.as_deref(),
                    &location,
                    dialect.as_deref(),
                    identifier.as_deref(),
                )?;
                self.push(retriever.into());
                Ok(())
            }
            body => {
                let document = Document {
                    source_location,
                    dialect,
                    identifier,
                    body,
                };
                if self.resolve_nested {
                    for import in document.imports() {
                        let retriever = self.import_retriever(&document, import)?;
                        self.push(retriever.into());
                    }
                }
                self.output.push(document);
                Ok(())
            }
        }
    }

    fn import_retriever(
        &self,
        document: &Document,
        import: &ImportedLocation,
    ) -> MexResult<LocationRetriever> {
        self.location_retriever(
            document.source_location.as_deref(),
            &import.location,
            Some(&import.dialect),
            import.identifier.as_deref(),
        )
    }

    fn location_retriever(
        &self,
        base: Option<&str>,
        location: &str,
        dialect: Option<&str>,
        identifier: Option<&str>,
    ) -> MexResult<LocationRetriever> {
        let url = resolve_location(base, location).map_err(|reason| {
            MexError::bad_reference(
                base.unwrap_or(location),
                ReferenceFailure::Import(format!("cannot resolve '{}': {}", location, reason)),
            )
        })?;

        LocationRetriever::from_url(url, dialect, identifier, &self.allowed_schemes)
            .map_err(|e| unusable_pointer(base, location, e))
    }
}

/// Absolute locations are used verbatim, relative ones are joined onto `base`
pub fn resolve_location(base: Option<&str>, location: &str) -> Result<Url, String> {
    let location = location.trim();
    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| "relative location without a base".to_string())?;
            let base = Url::parse(base).map_err(|e| format!("invalid base '{}': {}", base, e))?;
            base.join(location).map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn unusable_pointer(base: Option<&str>, target: &str, err: MexError) -> MexError {
    let reason = match err {
        MexError::Construction { reason, .. } => reason,
        other => other.to_string(),
    };
    MexError::bad_reference(
        base.unwrap_or(target),
        ReferenceFailure::Import(format!("cannot follow '{}': {}", target, reason)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{dialect, DocumentKind};
    use pretty_assertions::assert_eq;

    fn state(max: usize, nested: bool) -> ResolutionState {
        ResolutionState::new(max, nested, vec!["http".to_string(), "https".to_string()])
    }

    fn schema(location: &str, imports: &[&str]) -> Document {
        Document::new(DocumentBody::Schema {
            raw: "<xs:schema/>".to_string(),
            imports: imports
                .iter()
                .map(|i| ImportedLocation {
                    location: i.to_string(),
                    dialect: dialect::XML_SCHEMA.to_string(),
                    identifier: None,
                })
                .collect(),
        })
        .with_source_location(location)
    }

    fn pending_sources(state: &mut ResolutionState) -> Vec<String> {
        let mut sources = Vec::new();
        while let Some(r) = state.pop_next() {
            sources.push(r.source().to_string());
        }
        sources
    }

    #[test]
    fn test_relative_and_absolute_imports() {
        assert_eq!(
            resolve_location(Some("http://h/a/b.xsd"), "c.xsd").unwrap().as_str(),
            "http://h/a/c.xsd"
        );
        assert_eq!(
            resolve_location(Some("http://h/a/b.xsd"), "http://other/d.xsd")
                .unwrap()
                .as_str(),
            "http://other/d.xsd"
        );
        assert_eq!(
            resolve_location(Some("http://h/a/b.xsd"), "../x/y.xsd").unwrap().as_str(),
            "http://h/x/y.xsd"
        );
        assert!(resolve_location(None, "c.xsd").is_err());
    }

    #[test]
    fn test_schema_is_emitted_and_imports_pushed() {
        let mut state = state(10, true);
        state
            .absorb(schema("http://h/a/b.xsd", &["c.xsd", "http://other/d.xsd"]))
            .unwrap();

        assert_eq!(state.output().len(), 1);
        assert_eq!(
            pending_sources(&mut state),
            vec!["http://other/d.xsd", "http://h/a/c.xsd"]
        );
    }

    #[test]
    fn test_import_retriever_carries_dialect() {
        let mut state = state(10, true);
        state.absorb(schema("http://h/a.xsd", &["b.xsd"])).unwrap();
        let retriever = state.pop_next().unwrap();
        assert_eq!(retriever.dialect(), Some(dialect::XML_SCHEMA));
    }

    #[test]
    fn test_nested_mode_off_passes_pointers_through() {
        let mut state = state(10, false);
        let set = Document::new(DocumentBody::CompositeSet {
            children: vec![
                Document::new(DocumentBody::LocationPointer {
                    location: "c.wsdl".to_string(),
                }),
                schema("http://h/x.xsd", &["y.xsd"]),
            ],
        })
        .with_source_location("http://h/svc/mex");

        state.absorb(set).unwrap();

        assert_eq!(state.pending_count(), 0);
        let kinds: Vec<_> = state.output().iter().map(Document::kind).collect();
        assert_eq!(kinds, vec![DocumentKind::LocationPointer, DocumentKind::Schema]);
        assert_eq!(
            state.output()[0].source_location.as_deref(),
            Some("http://h/svc/mex")
        );
    }

    #[test]
    fn test_composite_sets_flatten_and_propagate_location() {
        let mut state = state(10, true);
        let inner = Document::new(DocumentBody::CompositeSet {
            children: vec![
                Document::new(DocumentBody::LocationPointer {
                    location: "types.xsd".to_string(),
                })
                .with_dialect(dialect::XML_SCHEMA),
                Document::new(DocumentBody::ReferencePointer {
                    address: "http://h/more/mex".to_string(),
                }),
                Document::new(DocumentBody::Opaque {
                    raw: "<policy/>".to_string(),
                }),
            ],
        });
        let outer = Document::new(DocumentBody::CompositeSet {
            children: vec![inner],
        })
        .with_source_location("http://h/svc/service.svc");

        state.absorb(outer).unwrap();

        assert_eq!(state.output().len(), 1);
        assert_eq!(
            state.output()[0].source_location.as_deref(),
            Some("http://h/svc/service.svc")
        );
        assert_eq!(
            pending_sources(&mut state),
            vec!["http://h/more/mex", "http://h/svc/types.xsd"]
        );
    }

    #[test]
    fn test_unusable_import_names_importing_document() {
        let mut state = state(10, true);
        let err = state
            .absorb(schema("http://h/a.xsd", &["ftp://elsewhere/b.xsd"]))
            .unwrap_err();

        assert_eq!(err.location(), Some("http://h/a.xsd"));
        assert!(err.to_string().starts_with("bad metadata reference at http://h/a.xsd"));
    }

    #[test]
    fn test_capacity_and_visited() {
        let mut state = state(1, true);
        let r: Retriever = LocationRetriever::new(
            "http://h/a.xsd",
            None,
            None,
            &["http".to_string()],
        )
        .unwrap()
        .into();

        assert!(!state.is_at_capacity());
        assert!(!state.has_been_visited(&r));
        state.mark_visited(r.clone()).unwrap();
        assert!(state.has_been_visited(&r));
        assert!(state.is_at_capacity());
        assert_eq!(state.visited_count(), 1);

        let other: Retriever = LocationRetriever::new(
            "http://h/b.xsd",
            None,
            None,
            &["http".to_string()],
        )
        .unwrap()
        .into();
        let err = state.mark_visited(other.clone()).unwrap_err();
        assert!(matches!(err, MexError::TooManyReferences { max: 1 }));
        assert!(!state.has_been_visited(&other));
        assert_eq!(state.visited_count(), 1);
    }
}
