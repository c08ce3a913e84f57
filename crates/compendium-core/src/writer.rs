//! XML serialization for compendium documents

use crate::document::Element;
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::path::Path;

/// Serialize a root element to an indented UTF-8 XML string.
///
/// The output is stable: serializing a parsed copy of the output yields
/// identical bytes.
pub fn to_xml_string(root: &Element) -> Result<String> {
    let bytes = serialize(root).map_err(|message| Error::XmlWrite {
        path: "<memory>".into(),
        message,
    })?;
    String::from_utf8(bytes).map_err(|e| Error::XmlWrite {
        path: "<memory>".into(),
        message: e.to_string(),
    })
}

/// Write a root element to a file, creating parent directories
pub fn write_document<P: AsRef<Path>>(path: P, root: &Element) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serialize(root).map_err(|message| Error::XmlWrite {
        path: path.to_path_buf(),
        message,
    })?;
    fs::write(path, bytes)?;
    Ok(())
}

fn serialize(root: &Element) -> std::result::Result<Vec<u8>, String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| e.to_string())?;
    write_element(&mut writer, root, false)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> std::result::Result<(), String> {
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| e.to_string())
}

/// Write one element. Inside mixed content no indentation is added, since an
/// empty text event keeps the writer from breaking the line before a tag.
fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    inline: bool,
) -> std::result::Result<(), String> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if inline {
        write_text(writer, "")?;
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| e.to_string());
    }

    let mixed = inline || element.is_mixed();
    writer
        .write_event(Event::Start(start))
        .map_err(|e| e.to_string())?;
    if let Some(text) = text {
        write_text(writer, text)?;
    }
    for child in &element.children {
        write_element(writer, child, mixed)?;
        if let Some(tail) = child.tail.as_deref().filter(|t| !t.is_empty()) {
            write_text(writer, tail)?;
        }
    }
    if mixed {
        write_text(writer, "")?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| e.to_string())
}
