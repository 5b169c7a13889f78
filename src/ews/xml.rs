//! Minimal element tree over the `quick-xml` event reader.
//!
//! EWS responses are small, so they are read fully into a tree and then
//! navigated by local name. Namespace prefixes are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{HarvestError, Result};

/// An XML element with its attributes, children, and text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Local name, without namespace prefix.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated text and CDATA content directly inside this element,
    /// whitespace included.
    pub text: String,
}

impl Element {
    /// Value of the attribute with the given local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// First element with the given name in a depth-first walk, self included.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Like [`Element::find`], but a missing element is an error.
    pub fn require(&self, name: &str) -> Result<&Element> {
        self.find(name)
            .ok_or_else(|| HarvestError::MalformedResponse(format!("missing <{name}>")))
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = match raw.iter().rposition(|&b| b == b':') {
        Some(pos) => &raw[pos + 1..],
        None => raw,
    };
    String::from_utf8_lossy(name).into_owned()
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element {
        name: local_name(start.name().as_ref()),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| HarvestError::MalformedResponse(e.to_string()))?;
        let key = local_name(attr.key.as_ref());
        if key == "xmlns" || attr.key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| HarvestError::MalformedResponse(e.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

/// Parse a document and return its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(open_element(e)?),
            Event::Empty(ref e) => {
                let element = open_element(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let mut element = stack.pop().ok_or_else(|| {
                    HarvestError::MalformedResponse("unbalanced end tag".to_string())
                })?;
                // Indentation between child elements is not content.
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| HarvestError::MalformedResponse(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HarvestError::MalformedResponse(
            "document ended inside an element".to_string(),
        ));
    }
    root.ok_or_else(|| HarvestError::MalformedResponse("empty document".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_prefixes_and_unescapes() {
        let root = parse(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="urn:x"><s:Body><m:Item Id="a&amp;b">Fish &amp; Chips</m:Item><t:Empty Flag="1"/></s:Body></s:Envelope>"#,
        )
        .unwrap();
        assert_eq!(root.name, "Envelope");
        assert!(root.attributes.is_empty());
        let item = root.find("Item").unwrap();
        assert_eq!(item.attr("Id"), Some("a&b"));
        assert_eq!(item.text, "Fish & Chips");
        assert_eq!(root.find("Empty").unwrap().attr("Flag"), Some("1"));
    }

    #[test]
    fn test_text_keeps_edge_whitespace() {
        let root = parse(
            "<Envelope>\n  <Body>\n    <Text>  indented\n\nlast line\n</Text>\n  </Body>\n</Envelope>\n",
        )
        .unwrap();
        assert_eq!(root.text, "");
        let body = root.find("Body").unwrap();
        assert_eq!(body.text, "");
        assert_eq!(body.children.len(), 1);
        assert_eq!(
            body.child_text("Text"),
            Some("  indented\n\nlast line\n")
        );
    }

    #[test]
    fn test_require_reports_missing_element() {
        let root = parse("<a><b/></a>").unwrap();
        assert!(root.require("b").is_ok());
        assert!(matches!(
            root.require("c"),
            Err(HarvestError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_truncated_document_is_rejected() {
        assert!(parse("<a><b>").is_err());
        assert!(parse("").is_err());
    }
}
