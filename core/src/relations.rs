//! Link relation table advertised by the index resource.
//!
//! # Design
//! The index is a HAL document whose `_links` maps relation names to link
//! objects. A relation may also hold an array of links, in which case the
//! first one is used for resolution. The table is immutable once loaded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::HalError;

/// A HAL link object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: None,
            media_type: None,
            title: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum LinkEntry {
    One(Link),
    Many(Vec<Link>),
}

impl LinkEntry {
    fn first(&self) -> Option<&Link> {
        match self {
            LinkEntry::One(link) => Some(link),
            LinkEntry::Many(links) => links.first(),
        }
    }
}

#[derive(Deserialize)]
struct IndexDocument {
    #[serde(rename = "_links")]
    links: HashMap<String, LinkEntry>,
}

/// Relation name to link mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTable {
    links: HashMap<String, Link>,
}

impl RelationTable {
    /// Decode the `_links` section of an index document. A body without
    /// `_links` is malformed.
    pub fn from_index(body: &[u8]) -> Result<Self, HalError> {
        let index: IndexDocument = serde_json::from_slice(body)?;
        let links = index
            .links
            .into_iter()
            .filter_map(|(rel, entry)| entry.first().cloned().map(|link| (rel, link)))
            .collect();
        Ok(Self { links })
    }

    pub fn insert(&mut self, rel: impl Into<String>, link: Link) {
        self.links.insert(rel.into(), link);
    }

    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.links.get(rel)
    }

    /// The (possibly templated) href of `rel`.
    pub fn href(&self, rel: &str) -> Result<&str, HalError> {
        self.get(rel)
            .map(|link| link.href.as_str())
            .ok_or_else(|| HalError::UnknownRelation(rel.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Link)> for RelationTable {
    fn from_iter<I: IntoIterator<Item = (K, Link)>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().map(|(rel, link)| (rel.into(), link)).collect(),
        }
    }
}
