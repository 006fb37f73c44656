//! Owned, namespace-resolved XML element tree.
//!
//! OM-XML documents are small (one act or one people index per file), so the
//! whole document is read into a tree and queried by `(namespace, local name)`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("unknown namespace prefix `{0}`")]
    UnknownPrefix(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name == name
    }

    /// Unqualified attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Unqualified attribute value, `None` when absent or blank.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    pub fn child(&self, namespace: &str, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// This element and all its descendants, in document order.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

pub fn parse_file(path: &Path) -> Result<XmlElement, XmlError> {
    let contents = std::fs::read_to_string(path)?;
    parse_str(&contents)
}

pub fn parse_str(xml: &str) -> Result<XmlElement, XmlError> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (ns, event) = match reader.read_resolved_event() {
            Ok(resolved) => resolved,
            Err(e) => {
                return Err(XmlError::Syntax {
                    position: reader.buffer_position() as u64,
                    message: e.to_string(),
                })
            }
        };
        let namespace = owned_namespace(ns)?;

        match event {
            Event::Start(start) => {
                let el = open_element(&reader, namespace, &start)?;
                stack.push(el);
            }
            Event::Empty(start) => {
                let el = open_element(&reader, namespace, &start)?;
                close_element(el, &mut stack, &mut root);
            }
            Event::End(_) => {
                if let Some(el) = stack.pop() {
                    close_element(el, &mut stack, &mut root);
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| syntax(&reader, e))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element `{}`", open.name),
        });
    }
    root.ok_or(XmlError::NoRoot)
}

fn syntax(reader: &NsReader<&[u8]>, e: quick_xml::Error) -> XmlError {
    XmlError::Syntax {
        position: reader.buffer_position() as u64,
        message: e.to_string(),
    }
}

fn owned_namespace(ns: ResolveResult) -> Result<Option<String>, XmlError> {
    match ns {
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(String::from_utf8_lossy(uri).into_owned())),
        ResolveResult::Unknown(prefix) => Err(XmlError::UnknownPrefix(
            String::from_utf8_lossy(&prefix).into_owned(),
        )),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart,
) -> Result<XmlElement, XmlError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(reader, e.into()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = owned_namespace(ns)?;
        let value = attr
            .unescape_value()
            .map_err(|e| syntax(reader, e))?
            .into_owned();
        attributes.push(XmlAttribute {
            namespace,
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value,
        });
    }

    Ok(XmlElement {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_element(el: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}
