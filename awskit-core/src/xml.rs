//! Minimal readers for the flat XML documents S3 returns.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::BTreeMap;

use crate::error::ToolError;

fn xml_error(e: impl std::fmt::Display) -> ToolError {
    ToolError::Custom(format!("Malformed XML response: {}", e))
}

fn name_of(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Text of the first element named `tag`. Empty elements yield `Some("")`.
pub fn first_text(xml: &str, tag: &str) -> Result<Option<String>, ToolError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut inside = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if name_of(e.local_name().as_ref()) == tag => inside = true,
            Event::Empty(e) if name_of(e.local_name().as_ref()) == tag => {
                return Ok(Some(String::new()))
            }
            Event::Text(t) if inside => {
                return Ok(Some(t.unescape().map_err(xml_error)?.into_owned()));
            }
            Event::End(_) if inside => return Ok(Some(String::new())),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Every element named `record_tag`, flattened to a map of leaf name to text.
///
/// Nested leaves are keyed by their own local name; the first occurrence wins.
pub fn records(xml: &str, record_tag: &str) -> Result<Vec<BTreeMap<String, String>>, ToolError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut current: Option<BTreeMap<String, String>> = None;
    let mut depth = 0usize;
    let mut open_tag = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = name_of(e.local_name().as_ref());
                if current.is_some() {
                    depth += 1;
                } else if name == record_tag {
                    current = Some(BTreeMap::new());
                    depth = 0;
                }
                open_tag = name;
            }
            Event::End(e) => {
                let name = name_of(e.local_name().as_ref());
                if depth == 0 && name == record_tag {
                    if let Some(record) = current.take() {
                        out.push(record);
                    }
                } else if current.is_some() {
                    depth -= 1;
                }
                open_tag.clear();
            }
            Event::Empty(e) => {
                let name = name_of(e.local_name().as_ref());
                match current.as_mut() {
                    Some(record) => {
                        record.entry(name).or_default();
                    }
                    None if name == record_tag => out.push(BTreeMap::new()),
                    None => {}
                }
            }
            Event::Text(t) => {
                if let Some(record) = current.as_mut() {
                    if !open_tag.is_empty() {
                        let text = t.unescape().map_err(xml_error)?.into_owned();
                        record.entry(open_tag.clone()).or_insert(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Code and message from an S3 `<Error>` document.
pub fn error_fields(xml: &str) -> Option<(String, String)> {
    let code = first_text(xml, "Code").ok().flatten()?;
    let message = first_text(xml, "Message").ok().flatten().unwrap_or_default();
    Some((code, message))
}

pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}
