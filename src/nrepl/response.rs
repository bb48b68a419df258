// nREPL response fragments and their combined view

use std::collections::BTreeMap;

use super::bencode::Value;

/// Tags whose text is concatenated across fragments.
const CONCAT_TAGS: &[&str] = &["out", "err"];

/// Tags whose entries are collected into one ordered sequence.
const SEQUENCE_TAGS: &[&str] = &["value", "status"];

/// All reply fragments received for one request, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Response {
    fragments: Vec<Value>,
}

impl Response {
    pub fn new(fragments: Vec<Value>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Value] {
        &self.fragments
    }

    /// Merge every fragment into a single tag → value map.
    ///
    /// - `out` and `err` byte strings are concatenated in order
    /// - `value` and `status` entries become one list in arrival order
    /// - every other tag (`ns`, `session`, ...) keeps the last value seen
    pub fn combined_response(&self) -> CombinedResponse {
        let mut fields: BTreeMap<String, Value> = BTreeMap::new();

        for fragment in &self.fragments {
            let Some(map) = fragment.as_dict() else {
                continue;
            };
            for (raw_key, val) in map {
                let key = String::from_utf8_lossy(raw_key).into_owned();

                if CONCAT_TAGS.contains(&key.as_str()) {
                    if let Some(bytes) = val.as_bytes() {
                        match fields
                            .entry(key)
                            .or_insert_with(|| Value::Bytes(Vec::new()))
                        {
                            Value::Bytes(existing) => existing.extend_from_slice(bytes),
                            other => *other = val.clone(),
                        }
                    }
                } else if SEQUENCE_TAGS.contains(&key.as_str()) {
                    let entry = fields.entry(key).or_insert_with(|| Value::List(Vec::new()));
                    if let Value::List(items) = entry {
                        match val {
                            Value::List(more) => items.extend(more.iter().cloned()),
                            single => items.push(single.clone()),
                        }
                    }
                } else {
                    fields.insert(key, val.clone());
                }
            }
        }

        CombinedResponse { fields }
    }
}

/// Tag → value view over a whole reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedResponse {
    fields: BTreeMap<String, Value>,
}

impl CombinedResponse {
    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.fields.get(tag)
    }

    pub fn contains_key(&self, tag: &str) -> bool {
        self.fields.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Raw stdout text, if any was printed.
    pub fn out(&self) -> Option<&[u8]> {
        self.get("out").and_then(Value::as_bytes)
    }

    /// Raw stderr text, if any was printed.
    pub fn err(&self) -> Option<&[u8]> {
        self.get("err").and_then(Value::as_bytes)
    }

    /// Printed results in arrival order.
    pub fn values(&self) -> Option<&[Value]> {
        self.get("value").and_then(Value::as_list)
    }

    pub fn ns(&self) -> Option<&[u8]> {
        self.get("ns").and_then(Value::as_bytes)
    }

    pub fn status(&self) -> Vec<&str> {
        self.get("status")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl<'a> FromIterator<(&'a str, Value)> for CombinedResponse {
    fn from_iter<I: IntoIterator<Item = (&'a str, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}
