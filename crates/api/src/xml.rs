//! XML rendering of JSON-shaped response bodies.
//!
//! Objects become child elements, arrays become `<list-item>` children and
//! `null` becomes an empty element, all wrapped in `<root>`.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;
use thiserror::Error;

pub const ROOT_TAG: &str = "root";
pub const ITEM_TAG: &str = "list-item";

#[derive(Debug, Error)]
#[error("xml rendering failed: {0}")]
pub struct XmlRenderError(String);

/// Render `value` as a UTF-8 XML document.
pub fn render(value: &Value) -> Result<String, XmlRenderError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| XmlRenderError(e.to_string()))?;

    write_element(&mut writer, ROOT_TAG, value)?;

    String::from_utf8(writer.into_inner()).map_err(|e| XmlRenderError(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, tag: &str, value: &Value) -> Result<(), XmlRenderError> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|e| XmlRenderError(e.to_string()))?;
    write_content(writer, value)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| XmlRenderError(e.to_string()))
}

fn write_content(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), XmlRenderError> {
    let text = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => {
            for (key, child) in map {
                write_element(writer, key, child)?;
            }
            return Ok(());
        }
        Value::Array(items) => {
            for item in items {
                write_element(writer, ITEM_TAG, item)?;
            }
            return Ok(());
        }
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
    };
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .map_err(|e| XmlRenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_paginated_envelope() {
        let body = json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{ "id": 7, "title": "Great" }],
        });

        assert_eq!(
            render(&body).unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <root><count>1</count><next></next><previous></previous>\
             <results><list-item><id>7</id><title>Great</title></list-item></results></root>"
        );
    }

    #[test]
    fn escapes_text_content() {
        let xml = render(&json!({ "comment": "a < b & \"c\"" })).unwrap();
        assert!(xml.contains("<comment>a &lt; b &amp; &quot;c&quot;</comment>"));
    }

    #[test]
    fn nested_arrays_use_list_items() {
        let xml = render(&json!([[1, 2], true])).unwrap();
        assert!(xml.ends_with(
            "<root><list-item><list-item>1</list-item><list-item>2</list-item></list-item>\
             <list-item>true</list-item></root>"
        ));
    }
}
