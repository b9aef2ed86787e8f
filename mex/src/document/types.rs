use super::dialect;
use serde::Serialize;
use std::fmt;

/// An import declared by an interface description or schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedLocation {
    /// Location as written in the document, possibly relative
    pub location: String,
    pub dialect: String,
    /// Namespace of the imported document, when the import names one
    pub identifier: Option<String>,
}

/// Discriminant of `DocumentBody`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    CompositeSet,
    InterfaceDescription,
    Schema,
    ReferencePointer,
    LocationPointer,
    Opaque,
}

impl DocumentKind {
    /// Dialect assumed for a document that arrived without one
    pub fn default_dialect(self) -> Option<&'static str> {
        match self {
            DocumentKind::CompositeSet => Some(dialect::METADATA_EXCHANGE),
            DocumentKind::InterfaceDescription => Some(dialect::WSDL),
            DocumentKind::Schema => Some(dialect::XML_SCHEMA),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::CompositeSet => "composite-set",
            DocumentKind::InterfaceDescription => "interface",
            DocumentKind::Schema => "schema",
            DocumentKind::ReferencePointer => "reference",
            DocumentKind::LocationPointer => "location",
            DocumentKind::Opaque => "opaque",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentBody {
    CompositeSet {
        children: Vec<Document>,
    },
    InterfaceDescription {
        raw: String,
        imports: Vec<ImportedLocation>,
    },
    Schema {
        raw: String,
        imports: Vec<ImportedLocation>,
    },
    /// Points at an endpoint that answers a metadata get-request
    ReferencePointer {
        address: String,
    },
    /// Points at a document fetchable by location
    LocationPointer {
        location: String,
    },
    Opaque {
        raw: String,
    },
}

/// A classified metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Where the document came from; relative imports are joined against it
    pub source_location: Option<String>,
    pub dialect: Option<String>,
    pub identifier: Option<String>,
    #[serde(flatten)]
    pub body: DocumentBody,
}

impl Document {
    pub fn new(body: DocumentBody) -> Self {
        Self {
            source_location: None,
            dialect: None,
            identifier: None,
            body,
        }
    }

    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = Some(location.into());
        self
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn kind(&self) -> DocumentKind {
        match &self.body {
            DocumentBody::CompositeSet { .. } => DocumentKind::CompositeSet,
            DocumentBody::InterfaceDescription { .. } => DocumentKind::InterfaceDescription,
            DocumentBody::Schema { .. } => DocumentKind::Schema,
            DocumentBody::ReferencePointer { .. } => DocumentKind::ReferencePointer,
            DocumentBody::LocationPointer { .. } => DocumentKind::LocationPointer,
            DocumentBody::Opaque { .. } => DocumentKind::Opaque,
        }
    }

    /// Raw XML text, for documents that carry content
    pub fn raw(&self) -> Option<&str> {
        match &self.body {
            DocumentBody::InterfaceDescription { raw, .. }
            | DocumentBody::Schema { raw, .. }
            | DocumentBody::Opaque { raw } => Some(raw),
            _ => None,
        }
    }

    pub fn imports(&self) -> &[ImportedLocation] {
        match &self.body {
            DocumentBody::InterfaceDescription { imports, .. }
            | DocumentBody::Schema { imports, .. } => imports,
            _ => &[],
        }
    }

    /// Stamp `location` unless the document already knows its origin
    pub fn stamp_source_location(&mut self, location: &str) {
        if self.source_location.is_none() {
            self.source_location = Some(location.to_string());
        }
    }
}
