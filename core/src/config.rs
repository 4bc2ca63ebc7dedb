//! Static client configuration.

use std::env;

use serde::Deserialize;

/// Appended to the index URL when resolving against the public index.
pub const DEFAULT_PUBLIC_SUFFIX: &str = "public/";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub index_url: String,
    #[serde(default = "default_public_suffix")]
    pub public_suffix: String,
}

fn default_public_suffix() -> String {
    DEFAULT_PUBLIC_SUFFIX.to_string()
}

impl ClientConfig {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            public_suffix: default_public_suffix(),
        }
    }

    pub fn with_public_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.public_suffix = suffix.into();
        self
    }

    /// Reads `HAL_INDEX_URL` and, optionally, `HAL_PUBLIC_SUFFIX`.
    pub fn from_env() -> Option<Self> {
        let index_url = env::var("HAL_INDEX_URL").ok()?;
        let config = Self::new(index_url);
        Some(match env::var("HAL_PUBLIC_SUFFIX") {
            Ok(suffix) => config.with_public_suffix(suffix),
            Err(_) => config,
        })
    }

    /// URL of the index resource. The suffix is appended verbatim.
    pub fn index_url(&self, is_public: bool) -> String {
        if is_public {
            format!("{}{}", self.index_url, self.public_suffix)
        } else {
            self.index_url.clone()
        }
    }
}
