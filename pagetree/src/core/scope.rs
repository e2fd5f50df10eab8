//! Layered variable lookup: local page data, then parent data, then globals.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::DataMap;

/// Named lookup layer, listed in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLayer {
    Local,
    Parent,
    Global,
}

impl fmt::Display for ScopeLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeLayer::Local => f.write_str("local"),
            ScopeLayer::Parent => f.write_str("parent"),
            ScopeLayer::Global => f.write_str("global"),
        }
    }
}

/// Runtime type of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// A value found in scope, with the layer that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub layer: ScopeLayer,
    pub value: &'a Value,
}

/// Why a lookup produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound,
    TypeMismatch {
        layer: ScopeLayer,
        expected: Vec<ValueKind>,
        found: ValueKind,
    },
}

/// Ordered stack of borrowed data maps.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    layers: Vec<(ScopeLayer, &'a DataMap)>,
}

impl<'a> Scope<'a> {
    /// Scope for a page: its own data, its parent's data (if any), then globals.
    pub fn for_page(local: &'a DataMap, parent: Option<&'a DataMap>, globals: &'a DataMap) -> Self {
        let mut scope = Self::default().with_layer(ScopeLayer::Local, local);
        if let Some(parent) = parent {
            scope = scope.with_layer(ScopeLayer::Parent, parent);
        }
        scope.with_layer(ScopeLayer::Global, globals)
    }

    /// Append a layer with lower precedence than the existing ones.
    pub fn with_layer(mut self, layer: ScopeLayer, data: &'a DataMap) -> Self {
        self.layers.push((layer, data));
        self
    }

    /// First definition of `key`, searching layers in precedence order.
    pub fn resolve(&self, key: &str) -> Result<Resolved<'a>, LookupError> {
        self.layers
            .iter()
            .find_map(|(layer, data)| {
                data.get(key).map(|value| Resolved {
                    layer: *layer,
                    value,
                })
            })
            .ok_or(LookupError::NotFound)
    }

    pub fn get(&self, key: &str) -> Result<&'a Value, LookupError> {
        self.resolve(key).map(|found| found.value)
    }

    /// Like [`Scope::get`], but the value's kind must be one of `allowed`.
    pub fn get_typed(&self, key: &str, allowed: &[ValueKind]) -> Result<&'a Value, LookupError> {
        let found = self.resolve(key)?;
        let kind = ValueKind::of(found.value);
        if allowed.contains(&kind) {
            return Ok(found.value);
        }
        Err(LookupError::TypeMismatch {
            layer: found.layer,
            expected: allowed.to_vec(),
            found: kind,
        })
    }

    /// Deserialize the resolved value into `T`.
    ///
    /// A value that does not fit `T` is a type mismatch. `expected` is empty in
    /// that case since `T` is not described by a single [`ValueKind`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, LookupError> {
        let found = self.resolve(key)?;
        T::deserialize(found.value).map_err(|_| LookupError::TypeMismatch {
            layer: found.layer,
            expected: Vec::new(),
            found: ValueKind::of(found.value),
        })
    }

    /// Merge all layers into one map, higher-precedence layers winning.
    pub fn flatten(&self) -> DataMap {
        let mut merged = DataMap::new();
        for (_, data) in self.layers.iter().rev() {
            for (key, value) in data.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}
