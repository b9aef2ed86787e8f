//! Document classification
//!
//! Sniffs the root element of a fetched document and turns it into a typed
//! `Document`. Composite sets are unpacked section by section; interface
//! descriptions and schemas have their declared imports extracted.

use super::dialect;
use super::types::{Document, DocumentBody, ImportedLocation};
use super::xml::{self, XmlElement};
use crate::config::ReaderQuotas;
use crate::error::ClassifyError;

/// Pure classifier: text in, `Document` out, no I/O
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentClassifier {
    quotas: ReaderQuotas,
}

impl DocumentClassifier {
    pub fn new(quotas: ReaderQuotas) -> Self {
        Self { quotas }
    }

    pub fn classify(
        &self,
        text: &str,
        source_location: Option<&str>,
        dialect: Option<&str>,
        identifier: Option<&str>,
    ) -> Result<Document, ClassifyError> {
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Err(ClassifyError::Empty);
        }

        let root = xml::parse(text, self.quotas)?;
        let mut document = self.classify_element(text, &root, true)?;

        document.source_location = source_location.map(str::to_string);
        document.dialect = dialect
            .map(str::to_string)
            .or_else(|| document.kind().default_dialect().map(str::to_string));
        document.identifier = identifier
            .map(str::to_string)
            .or_else(|| inferred_identifier(&root));
        Ok(document)
    }

    fn classify_element(
        &self,
        source: &str,
        element: &XmlElement,
        is_root: bool,
    ) -> Result<Document, ClassifyError> {
        let raw = || {
            if is_root {
                source.to_string()
            } else {
                element.detached_raw(source)
            }
        };

        let body = if element.is(dialect::METADATA_EXCHANGE, "Metadata") {
            let children = element
                .children_named(dialect::METADATA_EXCHANGE, "MetadataSection")
                .map(|section| self.classify_section(source, section))
                .collect::<Result<Vec<_>, _>>()?;
            DocumentBody::CompositeSet { children }
        } else if element.is(dialect::WSDL, "definitions") {
            DocumentBody::InterfaceDescription {
                raw: raw(),
                imports: wsdl_imports(element),
            }
        } else if element.is(dialect::XML_SCHEMA, "schema") {
            DocumentBody::Schema {
                raw: raw(),
                imports: schema_imports(element),
            }
        } else {
            DocumentBody::Opaque { raw: raw() }
        };

        Ok(Document::new(body))
    }

    fn classify_section(
        &self,
        source: &str,
        section: &XmlElement,
    ) -> Result<Document, ClassifyError> {
        let dialect = section.non_empty_attr("Dialect").map(str::to_string);
        let identifier = section.non_empty_attr("Identifier").map(str::to_string);

        let content = section.children.first().ok_or_else(|| {
            ClassifyError::Malformed("metadata section has no content".to_string())
        })?;

        let mut document = if content.is(dialect::METADATA_EXCHANGE, "MetadataReference") {
            let address = content
                .children
                .iter()
                .find(|child| {
                    child.local_name == "Address"
                        && child
                            .namespace
                            .as_deref()
                            .map(dialect::is_addressing_namespace)
                            .unwrap_or(false)
                })
                .map(|address| address.text.trim().to_string())
                .filter(|address| !address.is_empty())
                .ok_or_else(|| {
                    ClassifyError::Malformed("metadata reference has no address".to_string())
                })?;
            Document::new(DocumentBody::ReferencePointer { address })
        } else if content.is(dialect::METADATA_EXCHANGE, "Location") {
            let location = content.text.trim().to_string();
            if location.is_empty() {
                return Err(ClassifyError::Malformed(
                    "metadata location is empty".to_string(),
                ));
            }
            Document::new(DocumentBody::LocationPointer { location })
        } else {
            let mut inline = self.classify_element(source, content, false)?;
            if inline.identifier.is_none() {
                inline.identifier = inferred_identifier(content);
            }
            inline
        };

        document.dialect =
            dialect.or_else(|| document.kind().default_dialect().map(str::to_string));
        if identifier.is_some() {
            document.identifier = identifier;
        }
        Ok(document)
    }
}

/// Target namespace of an interface description or schema
fn inferred_identifier(element: &XmlElement) -> Option<String> {
    if element.is(dialect::WSDL, "definitions") || element.is(dialect::XML_SCHEMA, "schema") {
        element.non_empty_attr("targetNamespace").map(str::to_string)
    } else {
        None
    }
}

fn wsdl_imports(definitions: &XmlElement) -> Vec<ImportedLocation> {
    let mut imports: Vec<ImportedLocation> = definitions
        .children_named(dialect::WSDL, "import")
        .filter_map(|import| {
            let location = import.non_empty_attr("location")?;
            Some(ImportedLocation {
                location: location.to_string(),
                dialect: dialect::WSDL.to_string(),
                identifier: import.non_empty_attr("namespace").map(str::to_string),
            })
        })
        .collect();

    for types in definitions.children_named(dialect::WSDL, "types") {
        for schema in types.children_named(dialect::XML_SCHEMA, "schema") {
            imports.extend(schema_imports(schema));
        }
    }
    imports
}

fn schema_imports(schema: &XmlElement) -> Vec<ImportedLocation> {
    let target_namespace = schema.non_empty_attr("targetNamespace");

    schema
        .children
        .iter()
        .filter(|child| child.namespace.as_deref() == Some(dialect::XML_SCHEMA))
        .filter_map(|child| {
            let identifier = match child.local_name.as_str() {
                "import" => child.non_empty_attr("namespace"),
                "include" | "redefine" => target_namespace,
                _ => return None,
            };
            let location = child.non_empty_attr("schemaLocation")?;
            Some(ImportedLocation {
                location: location.to_string(),
                dialect: dialect::XML_SCHEMA.to_string(),
                identifier: identifier.map(str::to_string),
            })
        })
        .collect()
}
