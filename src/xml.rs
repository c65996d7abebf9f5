//! Minimal namespace-aware XML element tree.
//!
//! THREDDS catalogs and ISO 19139 documents are small and queried many
//! times, so they are read into an owned tree once with `quick-xml`'s
//! [`NsReader`] and then navigated by `(namespace, local name)` pairs.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An element with resolved namespace, attributes, trimmed text and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Parse a complete document and return its root element.
    pub fn parse(xml: &str) -> Result<Element, ParseError> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = match reader.read_resolved_event() {
                Ok(pair) => pair,
                Err(e) => return Err(ParseError(e.to_string())),
            };
            let namespace = namespace_uri(&ns);

            match event {
                Event::Start(start) => {
                    let element = open_element(&reader, namespace, &start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = open_element(&reader, namespace, &start)?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError("unexpected closing tag".to_string()))?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| ParseError(e.to_string()))?;
                        current.text.push_str(value.trim());
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        current.text.push_str(String::from_utf8_lossy(&raw).trim());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| ParseError("document has no root element".to_string()))
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Direct children with the given qualified name.
    pub fn children<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    /// First direct child with the given qualified name.
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// This element and all of its descendants, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All descendants (not this element) with the given qualified name.
    pub fn find_all<'a>(&'a self, namespace: &'a str, name: &'a str) -> Vec<&'a Element> {
        self.descendants()
            .skip(1)
            .filter(|e| e.is(namespace, name))
            .collect()
    }

    /// Unqualified attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Namespace-qualified attribute value.
    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Pre-order iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

fn namespace_uri(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(uri) => Some(String::from_utf8_lossy(uri.as_ref()).into_owned()),
        _ => None,
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart,
) -> Result<Element, ParseError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError(e.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let (attr_ns, local) = reader.resolve_attribute(attr.key);
        let value: Cow<str> = attr
            .unescape_value()
            .map_err(|e| ParseError(e.to_string()))?;
        attributes.push(Attribute {
            namespace: namespace_uri(&attr_ns),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(Element {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError("multiple root elements".to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<catalog xmlns="urn:a" xmlns:x="urn:x">
  <service name="all" serviceType="Compound"/>
  <dataset name="top" ID="top">
    <dataset name="leaf" urlPath="p/leaf.nc" ID="leaf"/>
    <x:ref x:href="sub/catalog.xml">  text &amp; more </x:ref>
  </dataset>
</catalog>"#;

    #[test]
    fn parses_namespaces_and_attributes() {
        let root = Element::parse(DOC).unwrap();
        assert!(root.is("urn:a", "catalog"));
        let service = root.child("urn:a", "service").unwrap();
        assert_eq!(service.attr("serviceType"), Some("Compound"));

        let reference = &root.find_all("urn:x", "ref")[0];
        assert_eq!(reference.attr_ns("urn:x", "href"), Some("sub/catalog.xml"));
        assert_eq!(reference.attr("href"), None);
        assert_eq!(reference.text(), "text & more");
    }

    #[test]
    fn find_all_is_document_order_and_excludes_self() {
        let root = Element::parse(DOC).unwrap();
        let names: Vec<_> = root
            .find_all("urn:a", "dataset")
            .iter()
            .map(|d| d.attr("ID").unwrap())
            .collect();
        assert_eq!(names, vec!["top", "leaf"]);
        assert!(root.find_all("urn:a", "catalog").is_empty());
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(Element::parse("<a><b>").is_err());
        assert!(Element::parse("").is_err());
        assert!(Element::parse("not xml at all").is_err());
    }
}
