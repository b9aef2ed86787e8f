//! Namespace-aware element tree used by the classifier
//!
//! Elements remember their byte span in the source so nested documents can be
//! cut out verbatim. Depth and text quotas are enforced while reading.

use crate::config::ReaderQuotas;
use crate::error::ClassifyError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::fmt::Write;
use std::ops::Range;

#[derive(Debug, Clone)]
pub(crate) struct XmlElement {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
    pub span: Range<usize>,
    qname: String,
    /// Namespace declarations in scope from ancestors, not redeclared here
    inherited: Vec<(String, String)>,
}

impl XmlElement {
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value with surrounding whitespace removed, `None` when blank
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children
            .iter()
            .filter(move |child| child.is(namespace, local_name))
    }

    /// The element's source text, standalone: ancestor namespace
    /// declarations are copied onto its start tag.
    pub fn detached_raw(&self, source: &str) -> String {
        let raw = &source[self.span.clone()];
        if self.inherited.is_empty() {
            return raw.to_string();
        }

        let insert_at = 1 + self.qname.len();
        let mut out = String::with_capacity(raw.len() + 64 * self.inherited.len());
        out.push_str(&raw[..insert_at]);
        for (name, uri) in &self.inherited {
            let _ = write!(out, " {}=\"{}\"", name, escape(uri.as_str()));
        }
        out.push_str(&raw[insert_at..]);
        out
    }
}

type Frame = (XmlElement, Vec<(String, String)>);

pub(crate) fn parse(source: &str, quotas: ReaderQuotas) -> Result<XmlElement, ClassifyError> {
    let mut reader = NsReader::from_str(source);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = bound_namespace(resolved);

        match event {
            Event::Start(e) => {
                check_depth(stack.len() + 1, quotas)?;
                let parent_scope = stack.last().map(|(_, scope)| scope.as_slice()).unwrap_or(&[]);
                let frame = open_element(&e, namespace, parent_scope, start)?;
                stack.push(frame);
            }
            Event::Empty(e) => {
                check_depth(stack.len() + 1, quotas)?;
                let parent_scope = stack.last().map(|(_, scope)| scope.as_slice()).unwrap_or(&[]);
                let (mut element, _) = open_element(&e, namespace, parent_scope, start)?;
                element.span.end = reader.buffer_position() as usize;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let (mut element, _) = stack
                    .pop()
                    .ok_or_else(|| ClassifyError::Malformed("unexpected closing tag".to_string()))?;
                element.span.end = reader.buffer_position() as usize;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some((element, _)) = stack.last_mut() {
                    let text = t.unescape()?;
                    append_text(element, &text, quotas)?;
                }
            }
            Event::CData(c) => {
                if let Some((element, _)) = stack.last_mut() {
                    append_text(element, &String::from_utf8_lossy(&c), quotas)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ClassifyError::Malformed("unclosed element".to_string()));
    }
    root.ok_or(ClassifyError::Empty)
}

fn bound_namespace(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
        _ => None,
    }
}

fn check_depth(depth: usize, quotas: ReaderQuotas) -> Result<(), ClassifyError> {
    if depth > quotas.max_depth {
        return Err(ClassifyError::DepthExceeded {
            limit: quotas.max_depth,
        });
    }
    Ok(())
}

fn append_text(element: &mut XmlElement, text: &str, quotas: ReaderQuotas) -> Result<(), ClassifyError> {
    element.text.push_str(text);
    if element.text.len() > quotas.max_text_len {
        return Err(ClassifyError::TextTooLong {
            limit: quotas.max_text_len,
        });
    }
    Ok(())
}

fn open_element(
    e: &BytesStart<'_>,
    namespace: Option<String>,
    parent_scope: &[(String, String)],
    start: usize,
) -> Result<Frame, ClassifyError> {
    let mut attributes = Vec::new();
    let mut declared: Vec<(String, String)> = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let value = attr.unescape_value()?.into_owned();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            declared.push((String::from_utf8_lossy(key).into_owned(), value));
        } else {
            let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            attributes.push((local, value));
        }
    }

    let inherited: Vec<(String, String)> = parent_scope
        .iter()
        .filter(|(name, _)| !declared.iter().any(|(own, _)| own == name))
        .cloned()
        .collect();
    let mut scope = inherited.clone();
    scope.extend(declared);

    let element = XmlElement {
        namespace,
        local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
        span: start..start,
        qname: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        inherited,
    };
    Ok((element, scope))
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ClassifyError> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ClassifyError::Malformed(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}
