//! Header name canonicalization and the canonical header map.

use super::names::{GATEWAY_PREFIX, HOP_BY_HOP};

/// Canonicalize a header name.
///
/// `_` is treated as `-`, every non-empty segment is capitalized and the
/// rest of it lower-cased. Empty segments disappear, so `"-x--y-"` becomes
/// `"X-Y"`. Only ASCII letters change case, so the function is total and
/// idempotent for any input.
pub fn canonicalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split(['-', '_']).filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('-');
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    out
}

/// Build a canonical header map from raw transport pairs, dropping
/// hop-by-hop headers regardless of their casing.
pub fn decode_transport<I, K, V>(pairs: I) -> HeaderMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = canonicalize(name.as_ref());
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        map.append_canonical(name, value.into());
    }
    map
}

/// Wrap a gateway header name in the sub-protocol prefix.
pub fn encode_gateway_header(name: &str) -> String {
    format!("{GATEWAY_PREFIX}{}", canonicalize(name))
}

/// Strip the sub-protocol prefix from a transport header name.
///
/// Returns `None` unless the canonical name carries the prefix and has
/// something after it.
pub fn decode_gateway_header(name: &str) -> Option<String> {
    let canonical = canonicalize(name);
    if canonical.len() <= GATEWAY_PREFIX.len() {
        return None;
    }
    canonical
        .strip_prefix(GATEWAY_PREFIX)
        .map(str::to_string)
}

/// Canonical header name to ordered values.
///
/// Names are kept in first-insertion order and every value of a repeated
/// header keeps its arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a value, creating the header if absent.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.append_canonical(canonicalize(name), value.into());
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.set_all(name, vec![value.into()]);
    }

    /// Replace every value of `name` with `values`.
    pub fn set_all(&mut self, name: &str, values: Vec<String>) {
        let name = canonicalize(name);
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of `name` in arrival order; empty when absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        let name = canonicalize(name);
        self.position(&name)
            .map(|idx| self.entries[idx].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(&canonicalize(name)).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let idx = self.position(&canonicalize(name))?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterate over `(canonical name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn append_canonical(&mut self, name: String, value: String) {
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    fn position(&self, canonical: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == canonical)
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.append(&name, value);
        }
        map
    }
}
