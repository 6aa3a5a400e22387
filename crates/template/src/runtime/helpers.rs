//! Helper registry, call options and built-in helpers.

use super::{resolve_path, stringify};
use crate::error::RuntimeError;
use markup::{NodeKey, TreeBackend};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Helper signature. Returning `Ok(None)` means nothing is inserted, which
/// lets a helper build nodes itself through `options.backend`.
pub type HelperFn =
    Arc<dyn Fn(&[Value], &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> + Send + Sync>;

/// Everything a helper sees besides its positional arguments.
pub struct HelperOptions<'a> {
    pub name: &'a str,
    pub context: &'a Value,
    /// Element the call belongs to: the parent of a content insertion, or
    /// the element itself for element-level and attribute calls.
    pub element: NodeKey,
    pub escaped: bool,
    /// One tag per positional argument: `id`, `string`, `number`, `boolean`.
    pub types: &'a [&'static str],
    pub hash: Map<String, Value>,
    pub hash_types: BTreeMap<String, &'static str>,
    pub backend: &'a mut dyn TreeBackend,
}

impl HelperOptions<'_> {
    /// Positional argument `index`, with `id` arguments looked up in the
    /// context.
    pub fn resolve_arg(&self, args: &[Value], index: usize) -> Option<Value> {
        let value = args.get(index)?;
        match (self.types.get(index), value) {
            (Some(&"id"), Value::String(path)) => resolve_path(self.context, path).cloned(),
            _ => Some(value.clone()),
        }
    }

    /// Hash argument `key`, with `id` values looked up in the context.
    pub fn resolve_hash(&self, key: &str) -> Option<Value> {
        let value = self.hash.get(key)?;
        match (self.hash_types.get(key), value) {
            (Some(&"id"), Value::String(path)) => resolve_path(self.context, path).cloned(),
            _ => Some(value.clone()),
        }
    }
}

#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, HelperFn>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `lookup` and `log`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("lookup", lookup);
        registry.register("log", log_helper);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&[Value], &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.helpers.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// `{{lookup obj key}}`: dynamic member or index access.
fn lookup(args: &[Value], options: &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::helper(
            options.name,
            format!("expected 2 arguments, got {}", args.len()),
        ));
    }
    let Some(target) = options.resolve_arg(args, 0) else {
        return Ok(None);
    };
    let Some(key) = options.resolve_arg(args, 1) else {
        return Ok(None);
    };
    let found = match (&target, &key) {
        (Value::Object(map), key) => map.get(&stringify(key)).cloned(),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .cloned(),
        (Value::Array(items), Value::String(s)) => s.parse::<usize>().ok().and_then(|i| items.get(i)).cloned(),
        _ => None,
    };
    Ok(found)
}

/// `{{log a b level="warn"}}`: writes resolved arguments to the log.
fn log_helper(args: &[Value], options: &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> {
    let message = (0..args.len())
        .map(|i| options.resolve_arg(args, i).map(|v| stringify(&v)).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    let level = options
        .resolve_hash("level")
        .map(|v| stringify(&v))
        .unwrap_or_else(|| "info".to_string());
    let level = match level.as_str() {
        "debug" => log::Level::Debug,
        "warn" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    };
    log::log!(target: "template.runtime", level, "{message}");
    Ok(None)
}
