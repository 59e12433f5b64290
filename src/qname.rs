//! `QName`: a resolved (URI, local-name) pair plus an optional prefix used
//! only when `Preserve.Prefixes` is set (spec.md §4.2/§6, GLOSSARY "QName").
//!
//! Grounded on the `(URI, LocalName[, Prefix])` triples threaded through
//! `BodyDecoder.cpp`'s `decodeQName`/`handleSE`/`handleAT` — exiCPP keeps the
//! three pieces as separate function return values rather than one struct;
//! this crate bundles them since every `Serializer`/`DocumentBuilder` call
//! site needs all three together.

use std::fmt;

/// A fully-resolved element/attribute name: a URI, a local name, and (when
/// prefixes are preserved) the prefix it was written or read with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub uri: String,
    pub local_name: String,
    pub prefix: Option<String>,
}

impl QName {
    pub fn new(uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            if !prefix.is_empty() {
                return write!(f, "{}:{}", prefix, self.local_name);
            }
        }
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_prefix_when_present() {
        let q = QName::new("http://example.com", "foo").with_prefix("ex");
        assert_eq!(q.to_string(), "ex:foo");
    }

    #[test]
    fn displays_clark_notation_without_prefix() {
        let q = QName::new("http://example.com", "foo");
        assert_eq!(q.to_string(), "{http://example.com}foo");
    }

    #[test]
    fn displays_bare_local_name_for_empty_uri() {
        let q = QName::new("", "foo");
        assert_eq!(q.to_string(), "foo");
    }
}
