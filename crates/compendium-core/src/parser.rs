//! XML parser for compendium source documents

use crate::document::{Document, Element};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

/// Parse an XML file into a Document
pub fn parse_xml<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let root = parse_root(&content, path)?;
    Ok(Document::new(root, path))
}

/// Parse XML from a string (useful for testing)
pub fn parse_xml_str(content: &str, source_name: &str) -> Result<Document> {
    let path = PathBuf::from(source_name);
    let root = parse_root(content, &path)?;
    Ok(Document::new(root, path))
}

fn parse_root(content: &str, path: &Path) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e, path)?),
            Ok(Event::Empty(e)) => {
                let element = start_element(&e, path)?;
                attach(&mut stack, &mut root, element, path)?;
            }
            Ok(Event::End(_)) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| parse_error(path, "unexpected closing tag"))?;
                settle_text(&mut element);
                attach(&mut stack, &mut root, element, path)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| parse_error(path, err))?;
                append_text(&mut stack, &text);
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&raw));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(parse_error(
                    path,
                    format!("{} (at byte {})", e, reader.buffer_position()),
                ))
            }
            // Declarations, comments, processing instructions and doctypes carry no entries
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(path, format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| parse_error(path, "document has no root element"))
}

fn start_element(start: &BytesStart<'_>, path: &Path) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));

    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(path, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|e| parse_error(path, e))?;
        element.attributes.push((key, value.to_string()));
    }

    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    path: &Path,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(parse_error(
                path,
                format!("second root element <{}>", element.name),
            ))
        }
        None => *root = Some(element),
    }
    Ok(())
}

/// Append raw text to the open element: before its first child, or after
/// its latest child. Text outside the root element is ignored.
fn append_text(stack: &mut [Element], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    let slot = match current.children.last_mut() {
        Some(child) => &mut child.tail,
        None => &mut current.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

/// Drop layout whitespace from a closed element.
///
/// Text-only elements are trimmed at both ends. When every text piece around
/// the children is blank the element is structural and loses them all. Mixed
/// content keeps its inner text exactly and is trimmed only at its outer ends.
fn settle_text(element: &mut Element) {
    fn non_empty(text: Option<String>) -> Option<String> {
        text.filter(|t| !t.is_empty())
    }

    if element.children.is_empty() {
        element.text = non_empty(element.text.take().map(|t| t.trim().to_string()));
        return;
    }

    let blank = |t: &Option<String>| t.as_deref().map_or(true, |t| t.trim().is_empty());
    if blank(&element.text) && element.children.iter().all(|c| blank(&c.tail)) {
        element.text = None;
        for child in &mut element.children {
            child.tail = None;
        }
        return;
    }

    element.text = non_empty(element.text.take().map(|t| t.trim_start().to_string()));
    for child in &mut element.children {
        child.tail = non_empty(child.tail.take());
    }
    if let Some(last) = element.children.last_mut() {
        last.tail = non_empty(last.tail.take().map(|t| t.trim_end().to_string()));
    }
}

fn parse_error(path: &Path, message: impl std::fmt::Display) -> Error {
    Error::XmlParse {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
