//! Pointer nodes: `{ "_secret": "<name>_v<version>" }`
//!
//! This shape is the persisted contract between this crate and stored
//! documents. A node is a pointer only when it is an object with exactly the
//! one `_secret` key holding a string.

use serde_json::{Map, Value};

use crate::coordinate::{CoordinateError, SecretCoordinate};

/// Key of the single field of a pointer node
pub const POINTER_KEY: &str = "_secret";

/// Build the pointer node referencing `coordinate`
pub fn pointer_node(coordinate: &SecretCoordinate) -> Value {
    let mut map = Map::new();
    map.insert(POINTER_KEY.to_string(), Value::String(coordinate.full_coordinate()));
    Value::Object(map)
}

/// The full coordinate string if `value` is a pointer node
pub fn pointer_target(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(POINTER_KEY).and_then(Value::as_str),
        _ => None,
    }
}

pub fn is_pointer(value: &Value) -> bool {
    pointer_target(value).is_some()
}

/// Parse the coordinate of a pointer node; `None` if `value` is not a pointer
pub fn pointer_coordinate(value: &Value) -> Option<Result<SecretCoordinate, CoordinateError>> {
    pointer_target(value).map(SecretCoordinate::parse)
}
