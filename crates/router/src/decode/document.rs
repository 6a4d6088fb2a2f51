//! Whole document decoding of JSON and XML bodies into an existing record.
//!
//! The incoming document is laid over what the destination already holds, so keys the
//! document leaves out keep their current values and no field is ever required. JSON objects
//! merge key by key at every depth while arrays and scalars are replaced. XML merges the
//! root's direct children only.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::decode::DecodeError;

pub(crate) fn decode_json<T>(input: &[u8], dest: &mut T) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let mut current = serde_json::to_value(&*dest).map_err(DecodeError::invalid_body)?;
    let incoming: Value = serde_json::from_slice(input).map_err(DecodeError::invalid_body)?;
    merge(&mut current, incoming);
    *dest = serde_json::from_value(current).map_err(DecodeError::invalid_body)?;
    Ok(())
}

/// `null` leaves the current value alone.
fn merge(current: &mut Value, incoming: Value) {
    match (current, incoming) {
        (_, Value::Null) => {}
        (Value::Object(current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match current.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        current.insert(key, value);
                    }
                }
            }
        }
        (current, incoming) => *current = incoming,
    }
}

pub(crate) fn decode_xml<T>(input: &[u8], dest: &mut T) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let document = std::str::from_utf8(input).map_err(DecodeError::invalid_body)?;
    let outline = Outline::scan(document)?;

    let Value::Object(current) = serde_json::to_value(&*dest).map_err(DecodeError::invalid_body)? else {
        return Err(DecodeError::invalid_body("destination does not serialize to a record"));
    };
    let missing: Map<String, Value> = current
        .into_iter()
        .filter(|(key, value)| !outline.children.contains(key) && renders_as_element(key, value))
        .collect();

    let merged = outline.splice(document, &missing)?;
    *dest = quick_xml::de::from_str(&merged).map_err(DecodeError::invalid_body)?;
    Ok(())
}

/// Attributes, text nodes, `null` and empty lists have no child element to add.
fn renders_as_element(key: &str, value: &Value) -> bool {
    let empty_list = value.as_array().is_some_and(Vec::is_empty);
    !key.starts_with(['@', '$']) && !value.is_null() && !empty_list
}

/// Where the root element sits in a document, and which child elements it has.
#[derive(Debug)]
struct Outline {
    root: String,
    children: HashSet<String>,
    /// Byte range of `<root/>` when the root has no content.
    empty: Option<(usize, usize)>,
    /// Byte offset of `</root>`.
    close: usize,
}

impl Outline {
    fn scan(document: &str) -> Result<Self, DecodeError> {
        let mut reader = Reader::from_str(document);
        let mut root = None;
        let mut children = HashSet::new();
        let mut empty = None;
        let mut close = None;
        let mut depth = 0usize;

        loop {
            let before = offset(&reader)?;
            match reader.read_event().map_err(DecodeError::invalid_body)? {
                Event::Start(start) => {
                    match depth {
                        0 => root = Some(element_name(&start)),
                        1 => {
                            children.insert(element_name(&start));
                        }
                        _ => {}
                    }
                    depth += 1;
                }
                Event::Empty(start) => match depth {
                    0 if root.is_none() => {
                        root = Some(element_name(&start));
                        empty = Some((before, offset(&reader)?));
                    }
                    1 => {
                        children.insert(element_name(&start));
                    }
                    _ => {}
                },
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && close.is_none() {
                        close = Some(before);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| DecodeError::invalid_body("xml document has no root element"))?;
        let close = match (close, empty) {
            (Some(close), _) => close,
            (None, Some((start, _))) => start,
            (None, None) => return Err(DecodeError::invalid_body("xml root element is not closed")),
        };
        Ok(Self { root, children, empty, close })
    }

    /// Inserts `missing` as child elements of the root, just before it closes.
    fn splice(&self, document: &str, missing: &Map<String, Value>) -> Result<String, DecodeError> {
        if missing.is_empty() {
            return Ok(document.to_owned());
        }

        let rendered = quick_xml::se::to_string_with_root(&self.root, missing).map_err(DecodeError::invalid_body)?;
        if let Some((start, end)) = self.empty {
            return Ok(format!("{}{rendered}{}", &document[..start], &document[end..]));
        }

        let inner = rendered
            .strip_prefix(&format!("<{}>", self.root))
            .and_then(|rest| rest.strip_suffix(&format!("</{}>", self.root)))
            .ok_or_else(|| DecodeError::invalid_body("unexpected xml rendering of current values"))?;
        Ok(format!("{}{inner}{}", &document[..self.close], &document[self.close..]))
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn offset<R>(reader: &Reader<R>) -> Result<usize, DecodeError> {
    usize::try_from(reader.buffer_position()).map_err(DecodeError::invalid_body)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::decode::document::{Outline, decode_json, decode_xml, merge};

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Profile {
        email: String,
        name: String,
        age: Option<u32>,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn keep() -> Profile {
        Profile { email: "keep@example.com".into(), name: "Old".into(), age: Some(40), tags: vec!["a".into()] }
    }

    #[test]
    fn merged_values() {
        let mut current = json!({"a": 1, "nested": {"x": 1, "y": 2}, "list": [1, 2]});
        merge(&mut current, json!({"nested": {"y": 3}, "list": [9], "b": true, "a": null}));

        assert_eq!(current, json!({"a": 1, "nested": {"x": 1, "y": 3}, "list": [9], "b": true}));
    }

    #[test]
    fn partial_json_keeps_absent_fields() {
        let mut profile = keep();
        decode_json(br#"{"name":"Bo","age":null}"#, &mut profile).unwrap();

        assert_eq!(profile, Profile { name: "Bo".into(), ..keep() });
    }

    #[test]
    fn partial_xml_keeps_absent_fields() {
        let mut profile = keep();
        decode_xml(b"<profile><name>Bo</name><tags>x</tags><tags>y</tags></profile>", &mut profile).unwrap();

        assert_eq!(profile, Profile { name: "Bo".into(), tags: vec!["x".into(), "y".into()], ..keep() });
    }

    #[test]
    fn empty_xml_root_keeps_everything() {
        let mut profile = keep();
        decode_xml(b"<profile/>", &mut profile).unwrap();
        assert_eq!(profile, keep());

        let mut profile = Profile::default();
        decode_xml(b"<profile><email>new@example.com</email><name/><age>3</age></profile>", &mut profile).unwrap();
        assert_eq!(profile, Profile { email: "new@example.com".into(), age: Some(3), ..Profile::default() });
    }

    #[test]
    fn outlines() {
        let outline = Outline::scan("<?xml version=\"1.0\"?>\n<p><a>1</a><b><c/></b><d/></p>").unwrap();
        assert_eq!(outline.root, "p");
        assert_eq!(outline.children.len(), 3);
        assert!(outline.children.contains("d"));
        assert!(!outline.children.contains("c"));
        assert!(outline.empty.is_none());

        Outline::scan("").unwrap_err();
        Outline::scan("<p><a>1</a>").unwrap_err();
    }

    #[test]
    fn malformed_documents() {
        decode_json(br#"{"name":"#, &mut Profile::default()).unwrap_err();
        decode_json(b"[1, 2]", &mut Profile::default()).unwrap_err();
        decode_xml(b"<profile><name>Bo</nome></profile>", &mut Profile::default()).unwrap_err();
    }
}
