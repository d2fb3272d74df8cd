//! Header map attached to a single upload.

use std::collections::BTreeMap;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Content type applied when the caller sets none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Request headers for one upload. Lookup is ASCII-case-insensitive;
/// insertion preserves the caller's spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any existing entry that differs only
    /// in case.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let existing: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.eq_ignore_ascii_case(&name))
            .cloned()
            .collect();
        for key in existing {
            self.entries.remove(&key);
        }
        self.entries.insert(name, value.into());
    }

    /// Builder-style [`set`](Headers::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill in the defaults the engine guarantees: `Content-Type` falls back
    /// to [`DEFAULT_CONTENT_TYPE`], `Content-Length` to `payload_len`.
    /// Caller-supplied values are left untouched.
    pub fn normalize(&mut self, payload_len: usize) {
        if !self.contains(CONTENT_TYPE) {
            self.set(CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
        }
        if !self.contains(CONTENT_LENGTH) {
            self.set(CONTENT_LENGTH, payload_len.to_string());
        }
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}
