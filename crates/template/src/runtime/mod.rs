//! Expression runtime: path resolution, helper dispatch, insertion policy.
//!
//! Absent values are `None` and `Value::Null`; inserting either adds no
//! nodes, and both stringify to the empty string in attributes.

mod helpers;
mod vm;

pub use helpers::{HelperFn, HelperOptions, HelperRegistry};
pub use vm::{BoundRange, RenderOutput};
pub(crate) use vm::Machine;

use crate::codegen::{HelperCall, InsertMode};
use crate::error::RuntimeError;
use crate::parser::parse_path;
use markup::{NodeKey, TreeBackend};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Walk `parts` from `context` through object keys and array indices.
pub fn resolve<'v>(context: &'v Value, parts: &[String]) -> Option<&'v Value> {
    let mut current = context;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a path spelling such as `post.title` or `this`.
pub fn resolve_path<'v>(context: &'v Value, path: &str) -> Option<&'v Value> {
    let path = parse_path(path).ok()?;
    resolve(context, &path.parts)
}

/// Text form of a value. Null is empty and arrays are joined with `,`.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

pub fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Attribute hook: concatenate stringified parts; absent parts are empty.
pub fn attribute_value(parts: &[Option<Value>]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref().map(stringify).unwrap_or_default())
        .collect()
}

/// A registered helper wins; otherwise a single-segment context lookup.
pub fn ambiguous_resolve(
    helpers: &HelperRegistry,
    name: &str,
    context: &Value,
    element: NodeKey,
    escaped: bool,
    backend: &mut dyn TreeBackend,
) -> Result<Option<Value>, RuntimeError> {
    if let Some(helper) = helpers.get(name) {
        log::trace!(target: "template.runtime", "ambiguous {name} dispatched to helper");
        let mut options = HelperOptions {
            name,
            context,
            element,
            escaped,
            types: &[],
            hash: Map::new(),
            hash_types: BTreeMap::new(),
            backend,
        };
        return helper(&[], &mut options);
    }
    Ok(context.get(name).cloned())
}

pub fn invoke_helper(
    helpers: &HelperRegistry,
    call: &HelperCall,
    args: Vec<Value>,
    hash: Vec<(String, Value, &'static str)>,
    context: &Value,
    element: NodeKey,
    backend: &mut dyn TreeBackend,
) -> Result<Option<Value>, RuntimeError> {
    let helper = helpers.get(&call.name).ok_or_else(|| RuntimeError::UnknownHelper {
        name: call.name.clone(),
    })?;
    let mut hash_values = Map::new();
    let mut hash_types = BTreeMap::new();
    for (key, value, kind) in hash {
        hash_types.insert(key.clone(), kind);
        hash_values.insert(key, value);
    }
    let mut options = HelperOptions {
        name: &call.name,
        context,
        element,
        escaped: call.escaped,
        types: &call.types,
        hash: hash_values,
        hash_types,
        backend,
    };
    helper(&args, &mut options)
}

/// Insert `value` under `parent` (before `before` when given) and return
/// the inserted top-level nodes.
pub fn insert_value(
    backend: &mut dyn TreeBackend,
    parent: NodeKey,
    before: Option<NodeKey>,
    value: Option<&Value>,
    mode: InsertMode,
) -> Vec<NodeKey> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let text = stringify(value);
    let nodes = match mode {
        InsertMode::Text => vec![backend.create_text(&text)],
        InsertMode::Fragment => backend.parse_fragment(parent, &text),
    };
    for &node in &nodes {
        match before {
            Some(before) => backend.insert_before(parent, node, before),
            None => backend.append_child(parent, node),
        }
    }
    nodes
}

#[cfg(test)]
mod tests;
