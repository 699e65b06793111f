//! Paths into configuration documents

use std::fmt;

/// One step of a [`SecretPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node within a document, rendered as `$.key[0].other`
///
/// Keys that are not plain identifiers render as `["quoted key"]` so the
/// string form is unambiguous. Coordinate names are derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SecretPath {
    segments: Vec<PathSegment>,
}

impl SecretPath {
    /// The document root (`$`)
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Path to an object property below this one
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Path to an array element below this one
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Follow this path through a document
    pub fn lookup<'a>(&self, document: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
        self.segments.iter().try_fold(document, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key.as_str()),
            PathSegment::Index(index) => node.get(*index),
        })
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) if is_plain_key(key) => write!(f, ".{}", key)?,
                PathSegment::Key(key) => {
                    let quoted = serde_json::Value::String(key.clone());
                    write!(f, "[{}]", quoted)?
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(SecretPath::root().to_string(), "$");
        let path = SecretPath::root().key("hosts").index(0).key("token");
        assert_eq!(path.to_string(), "$.hosts[0].token");
    }

    #[test]
    fn test_display_quotes_ambiguous_keys() {
        let dotted = SecretPath::root().key("a.b");
        let nested = SecretPath::root().key("a").key("b");
        assert_eq!(dotted.to_string(), "$[\"a.b\"]");
        assert_ne!(dotted.to_string(), nested.to_string());
    }

    #[test]
    fn test_lookup() {
        let document = json!({"hosts": [{"token": "t0"}, {"token": "t1"}]});
        let path = SecretPath::root().key("hosts").index(1).key("token");
        assert_eq!(path.lookup(&document), Some(&json!("t1")));
        assert_eq!(SecretPath::root().key("missing").lookup(&document), None);
        assert_eq!(SecretPath::root().lookup(&document), Some(&document));
    }
}
