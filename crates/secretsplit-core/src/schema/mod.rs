//! Schema-driven location of secret leaves
//!
//! A [`ConnectorSchema`] wraps the JSON schema of a connector's configuration.
//! Leaves flagged with `"airbyte_secret": true` are secret. The schema is
//! walked in parallel with a document: object `properties` (falling back to
//! `additionalProperties`), array `items` (single schema or tuple form) and
//! the `oneOf` / `anyOf` / `allOf` combinators are all followed. When several
//! combinator branches describe the same field, the field is secret if any
//! branch marks it secret.

mod path;

pub use path::{PathSegment, SecretPath};

use serde_json::Value;

use crate::processor::pointer;

/// Schema keyword that marks a leaf as secret
pub const SECRET_MARKER: &str = "airbyte_secret";

const COMBINATORS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

/// JSON schema of a connector configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorSchema {
    root: Value,
}

impl ConnectorSchema {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// The raw JSON schema
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// View of the schema at the document root
    pub fn view(&self) -> SchemaView<'_> {
        SchemaView::of(&self.root)
    }

    /// Every secret leaf present in `document`, with its value
    ///
    /// Leaves the schema marks secret but the document omits are not reported.
    pub fn secret_leaves<'a>(&self, document: &'a Value) -> Vec<(SecretPath, &'a Value)> {
        let mut leaves = Vec::new();
        collect_secret_leaves(self.view(), document, SecretPath::root(), &mut leaves);
        leaves
    }

    /// Paths of every secret leaf present in `document`
    pub fn secret_paths(&self, document: &Value) -> Vec<SecretPath> {
        self.secret_leaves(document)
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    /// Secret leaves still holding something other than a pointer node or null
    pub fn plaintext_paths(&self, document: &Value) -> Vec<SecretPath> {
        self.secret_leaves(document)
            .into_iter()
            .filter(|(_, value)| !value.is_null() && !pointer::is_pointer(value))
            .map(|(path, _)| path)
            .collect()
    }
}

fn collect_secret_leaves<'a>(
    view: SchemaView<'_>,
    node: &'a Value,
    path: SecretPath,
    leaves: &mut Vec<(SecretPath, &'a Value)>,
) {
    if view.is_empty() {
        return;
    }
    if view.is_secret() {
        leaves.push((path, node));
        return;
    }
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                collect_secret_leaves(view.property(key), child, path.key(key.as_str()), leaves);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_secret_leaves(view.item(index), child, path.index(index), leaves);
            }
        }
        _ => {}
    }
}

/// The set of schema nodes that describe one document node
///
/// Combinator branches are flattened in, so a view may hold several nodes.
/// An empty view means the schema says nothing about the document node.
#[derive(Debug, Clone, Default)]
pub struct SchemaView<'a> {
    nodes: Vec<&'a Value>,
}

impl<'a> SchemaView<'a> {
    fn of(node: &'a Value) -> Self {
        let mut view = Self::default();
        view.push(node);
        view
    }

    fn push(&mut self, node: &'a Value) {
        if !node.is_object() {
            return;
        }
        self.nodes.push(node);
        for combinator in COMBINATORS {
            if let Some(Value::Array(branches)) = node.get(combinator) {
                for branch in branches {
                    self.push(branch);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether any describing schema node carries the secret marker
    pub fn is_secret(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| node.get(SECRET_MARKER).and_then(Value::as_bool) == Some(true))
    }

    /// View for an object property
    pub fn property(&self, key: &str) -> SchemaView<'a> {
        let mut child = SchemaView::default();
        for node in &self.nodes {
            match node.get("properties").and_then(|props| props.get(key)) {
                Some(schema) => child.push(schema),
                None => {
                    if let Some(additional) = node.get("additionalProperties") {
                        child.push(additional);
                    }
                }
            }
        }
        child
    }

    /// View for an array element
    pub fn item(&self, index: usize) -> SchemaView<'a> {
        let mut child = SchemaView::default();
        for node in &self.nodes {
            match node.get("items") {
                Some(Value::Array(tuple)) => {
                    if let Some(schema) = tuple.get(index) {
                        child.push(schema);
                    }
                }
                Some(schema) => child.push(schema),
                None => {}
            }
        }
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConnectorSchema {
        ConnectorSchema::new(json!({
            "type": "object",
            "properties": {
                "username": { "type": "string" },
                "password": { "type": "string", "airbyte_secret": true },
                "tunnel": {
                    "oneOf": [
                        { "properties": { "method": { "const": "NONE" } } },
                        { "properties": {
                            "method": { "const": "SSH_KEY" },
                            "ssh_key": { "type": "string", "airbyte_secret": true }
                        } }
                    ]
                },
                "hosts": {
                    "type": "array",
                    "items": { "properties": { "token": { "airbyte_secret": true } } }
                },
                "headers": {
                    "type": "object",
                    "additionalProperties": { "type": "string", "airbyte_secret": true }
                }
            }
        }))
    }

    #[test]
    fn test_secret_paths_follow_properties_items_and_combinators() {
        let document = json!({
            "username": "airbyte",
            "password": "abc",
            "tunnel": { "method": "SSH_KEY", "ssh_key": "---key---" },
            "hosts": [ { "token": "t0" }, { "token": "t1" } ],
            "headers": { "Authorization": "Bearer x" }
        });

        let paths: Vec<String> = schema()
            .secret_paths(&document)
            .iter()
            .map(|p| p.to_string())
            .collect();

        assert_eq!(
            paths,
            vec![
                "$.headers.Authorization",
                "$.hosts[0].token",
                "$.hosts[1].token",
                "$.password",
                "$.tunnel.ssh_key",
            ]
        );
    }

    #[test]
    fn test_absent_and_undescribed_fields_are_not_secret() {
        let document = json!({ "username": "airbyte", "extra": { "password": "not described" } });
        assert!(schema().secret_paths(&document).is_empty());
    }

    #[test]
    fn test_plaintext_paths_ignore_pointers_and_null() {
        let document = json!({
            "password": { "_secret": "source_x_secret_00_v1" },
            "tunnel": { "ssh_key": null },
            "hosts": [ { "token": "leaked" } ]
        });
        let paths: Vec<String> = schema()
            .plaintext_paths(&document)
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["$.hosts[0].token"]);
    }

    #[test]
    fn test_tuple_items() {
        let schema = ConnectorSchema::new(json!({
            "items": [ { "type": "string" }, { "airbyte_secret": true } ]
        }));
        let paths = schema.secret_paths(&json!(["public", "private", "extra"]));
        assert_eq!(paths, vec![SecretPath::root().index(1)]);
    }

    #[test]
    fn test_non_object_schema_is_empty() {
        let schema = ConnectorSchema::new(json!(true));
        assert!(schema.view().is_empty());
        assert!(schema.secret_paths(&json!({"password": "x"})).is_empty());
    }
}
