//! Read-only view over a decoded `application/hal+json` document.
//!
//! Only one level of traversal is offered: properties, link hrefs, and the
//! documents directly under `_embedded`.

use serde_json::{Map, Value};

/// A decoded HAL document.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigator {
    data: Value,
}

impl Navigator {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Direct property access, e.g. `nav.get("id")`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Properties without the `_links` and `_embedded` sections.
    pub fn properties(&self) -> Map<String, Value> {
        self.data
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(key, _)| key.as_str() != "_links" && key.as_str() != "_embedded")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn links(&self) -> Option<&Map<String, Value>> {
        self.data.get("_links").and_then(Value::as_object)
    }

    /// `href` of the named link. For link arrays the first entry wins.
    pub fn link_href(&self, rel: &str) -> Option<&str> {
        let link = self.links()?.get(rel)?;
        let link = match link {
            Value::Array(items) => items.first()?,
            single => single,
        };
        link.get("href").and_then(Value::as_str)
    }

    /// Documents embedded under `rel`. A single object yields one navigator.
    pub fn embedded(&self, rel: &str) -> Vec<Navigator> {
        match self.data.get("_embedded").and_then(|embedded| embedded.get(rel)) {
            Some(Value::Array(items)) => items.iter().cloned().map(Navigator::new).collect(),
            Some(item @ Value::Object(_)) => vec![Navigator::new(item.clone())],
            _ => Vec::new(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.data
    }

    pub fn into_value(self) -> Value {
        self.data
    }
}
