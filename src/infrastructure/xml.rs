// ============================================================
// XML TO JSON
// ============================================================
// Convert an XML document into a serde_json tree:
// - the document becomes `{ "<root>": <root value> }`
// - attributes become keys of their element's object
// - repeated sibling elements become arrays
// - a text-only element becomes a string
// - text mixed with child elements is kept under `_text`

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use crate::domain::error::{AppError, Result};

/// Key used for text content of an element that also has children or attributes
pub const TEXT_KEY: &str = "_text";

struct Frame {
    name: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn into_value(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if self.map.is_empty() {
            Value::String(text)
        } else {
            let mut map = self.map;
            if !text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(map)
        };
        (self.name, value)
    }
}

pub fn xml_to_json(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document = Map::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(open_frame(&reader, &e)?);
            }
            Ok(Event::Empty(e)) => {
                let (name, value) = open_frame(&reader, &e)?.into_value();
                attach(&mut stack, &mut document, name, value);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::ParseError(format!("Invalid XML text: {}", e)))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let frame = stack.pop().ok_or_else(|| {
                    AppError::ParseError("Unbalanced XML end tag".to_string())
                })?;
                let (name, value) = frame.into_value();
                attach(&mut stack, &mut document, name, value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::ParseError(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(AppError::ParseError("Unclosed XML element".to_string()));
    }
    if document.is_empty() {
        return Err(AppError::ParseError("XML document has no root element".to_string()));
    }
    Ok(Value::Object(document))
}

fn open_frame(reader: &Reader<&[u8]>, start: &BytesStart) -> Result<Frame> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut map = Map::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| AppError::ParseError(format!("Invalid XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(reader)
            .map_err(|e| AppError::ParseError(format!("Invalid XML attribute value: {}", e)))?
            .into_owned();
        map.insert(key, Value::String(value));
    }
    Ok(Frame {
        name,
        map,
        text: String::new(),
    })
}

fn attach(stack: &mut [Frame], document: &mut Map<String, Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.map, name, value),
        None => insert_child(document, name, value),
    }
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}
