use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::params::Params;

const ROOT: &str = "xml";

/// Serializes a flat parameter set as `<xml><key>value</key>...</xml>`.
///
/// Keys are written in sorted order so the same set always yields the same
/// document. Values are escaped as XML text. Keys become element names and
/// must start with an ASCII letter or `_`, followed by ASCII letters, digits,
/// `_`, `-` or `.`; any other key is rejected with [`Error::Xml`].
pub fn to_xml(params: &Params) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;
    for key in params.sorted_keys() {
        if !is_element_name(key) {
            return Err(Error::Xml(format!("Invalid element name: {key:?}")));
        }
        writer.write_event(Event::Start(BytesStart::new(key)))?;
        writer.write_event(Event::Text(BytesText::new(params.get_string(key))))?;
        writer.write_event(Event::End(BytesEnd::new(key)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Parses the direct children of the root element into a parameter set.
///
/// Text and CDATA content are both accepted; deeper nesting is ignored.
pub fn from_xml(xml: &str) -> Result<Params> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut params = Params::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut key = String::new();
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth == 1 {
                    seen_root = true;
                } else if depth == 2 {
                    key = element_name(&e)?;
                    value.clear();
                }
            }
            Ok(Event::Empty(e)) => match depth {
                0 => seen_root = true,
                1 => {
                    params.set(element_name(&e)?, "");
                }
                _ => {}
            },
            Ok(Event::End(_)) => {
                if depth == 2 {
                    params.set(std::mem::take(&mut key), std::mem::take(&mut value));
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) if depth == 2 => {
                value.push_str(&e.unescape().map_err(|e| Error::Xml(e.to_string()))?);
            }
            Ok(Event::CData(e)) if depth == 2 => {
                value.push_str(std::str::from_utf8(&e.into_inner())?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
    }

    if !seen_root {
        return Err(Error::Xml("No root element found".into()));
    }
    if depth != 0 {
        return Err(Error::Xml("Unexpected end of document".into()));
    }
    Ok(params)
}

fn is_element_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn element_name(e: &BytesStart<'_>) -> Result<String> {
    Ok(std::str::from_utf8(e.name().as_ref())?.to_string())
}
