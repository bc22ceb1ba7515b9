// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::{Error, ErrorKind, Result};
use crate::models::{CollectionProperties, PartitionKeyDefinition};
use serde_json::Value;
use std::fmt::Write;

/// A single component of a partition key.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionKeyValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
    /// The value of a partition key path that is absent from a document written before the
    /// collection was partitioned.
    Undefined,
}

impl PartitionKeyValue {
    fn to_json(&self) -> Value {
        match self {
            PartitionKeyValue::String(s) => Value::String(s.clone()),
            PartitionKeyValue::Number(n) => Value::Number(n.clone()),
            PartitionKeyValue::Bool(b) => Value::Bool(*b),
            PartitionKeyValue::Null => Value::Null,
            PartitionKeyValue::Undefined => Value::Object(Default::default()),
        }
    }

    /// Converts a value read from a document. Objects and arrays are not valid partition key
    /// values and map to `Undefined`, matching how the service indexes them.
    pub(crate) fn from_document_value(value: &Value) -> Self {
        match value {
            Value::String(s) => PartitionKeyValue::String(s.clone()),
            Value::Number(n) => PartitionKeyValue::Number(n.clone()),
            Value::Bool(b) => PartitionKeyValue::Bool(*b),
            Value::Null => PartitionKeyValue::Null,
            Value::Array(_) | Value::Object(_) => PartitionKeyValue::Undefined,
        }
    }
}

impl From<&str> for PartitionKeyValue {
    fn from(value: &str) -> Self {
        PartitionKeyValue::String(value.to_string())
    }
}

impl From<String> for PartitionKeyValue {
    fn from(value: String) -> Self {
        PartitionKeyValue::String(value)
    }
}

impl From<i64> for PartitionKeyValue {
    fn from(value: i64) -> Self {
        PartitionKeyValue::Number(value.into())
    }
}

impl From<bool> for PartitionKeyValue {
    fn from(value: bool) -> Self {
        PartitionKeyValue::Bool(value)
    }
}

impl From<f64> for PartitionKeyValue {
    fn from(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(n) => PartitionKeyValue::Number(n),
            None => PartitionKeyValue::Undefined,
        }
    }
}

/// A partition key supplied by the caller.
///
/// Use [`PartitionKey::NONE`] to address documents written before the collection was
/// partitioned, which carry no value at the partition key path.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionKey(PartitionKeyInner);

#[derive(Debug, Clone, PartialEq)]
enum PartitionKeyInner {
    None,
    Values(Vec<PartitionKeyValue>),
}

impl PartitionKey {
    /// Sentinel selecting the collection's reserved key for documents without a partition key.
    pub const NONE: PartitionKey = PartitionKey(PartitionKeyInner::None);

    /// The empty key, which addresses unpartitioned collections.
    pub const EMPTY: PartitionKey = PartitionKey(PartitionKeyInner::Values(Vec::new()));

    /// A hierarchical key with one value per declared path.
    pub fn hierarchical(values: impl IntoIterator<Item = impl Into<PartitionKeyValue>>) -> Self {
        PartitionKey(PartitionKeyInner::Values(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn is_none(&self) -> bool {
        matches!(self.0, PartitionKeyInner::None)
    }
}

macro_rules! impl_single_value_partition_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PartitionKey {
                fn from(value: $t) -> Self {
                    PartitionKey(PartitionKeyInner::Values(vec![value.into()]))
                }
            }
        )*
    };
}

impl_single_value_partition_key!(&str, String, i64, f64, bool, PartitionKeyValue);

/// A resolved partition key, ready to be sent on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionKeyInternal(Vec<PartitionKeyValue>);

impl PartitionKeyInternal {
    /// The universal empty key, `[]`.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// The key documents without a partition key value are stored under.
    pub fn none_for(definition: Option<&PartitionKeyDefinition>) -> Self {
        match definition {
            Some(definition) if !definition.system_key && !definition.paths.is_empty() => Self(
                definition
                    .paths
                    .iter()
                    .map(|_| PartitionKeyValue::Undefined)
                    .collect(),
            ),
            _ => Self::empty(),
        }
    }

    pub fn from_values(values: Vec<PartitionKeyValue>) -> Self {
        Self(values)
    }

    pub fn components(&self) -> &[PartitionKeyValue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if this key is a prefix of `other`. The empty key contains every key.
    pub fn contains(&self, other: &PartitionKeyInternal) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// The canonical JSON array form sent in `x-ms-documentdb-partitionkey`.
    ///
    /// Non-ASCII characters are escaped as `\uXXXX` so the value is a valid header.
    pub fn to_header_value(&self) -> String {
        let array = Value::Array(self.0.iter().map(PartitionKeyValue::to_json).collect());
        let json = array.to_string();
        if json.is_ascii() {
            return json;
        }

        let mut escaped = String::with_capacity(json.len());
        for c in json.chars() {
            if c.is_ascii() {
                escaped.push(c);
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(escaped, "\\u{:04x}", unit);
                }
            }
        }
        escaped
    }
}

/// Derives the effective partition key of a request.
pub struct PartitionKeyResolver;

impl PartitionKeyResolver {
    /// Resolves the partition key from, in order: the caller's explicit key, the collection's lack
    /// of a partition key path, or the document body.
    ///
    /// Fails with [`ErrorKind::MissingPartitionKey`] only when the collection declares a path and
    /// neither the caller nor the document supplies a value.
    pub fn resolve(
        explicit: Option<&PartitionKey>,
        document: Option<&Value>,
        collection: Option<&CollectionProperties>,
    ) -> Result<PartitionKeyInternal> {
        let definition = collection.and_then(|c| c.partition_key_definition());

        if let Some(explicit) = explicit {
            return Ok(match &explicit.0 {
                PartitionKeyInner::None => PartitionKeyInternal::none_for(definition),
                PartitionKeyInner::Values(values) => PartitionKeyInternal(values.clone()),
            });
        }

        let Some(definition) = definition else {
            return Ok(PartitionKeyInternal::empty());
        };

        let document = document.ok_or_else(|| missing_partition_key(definition))?;
        let mut values = Vec::with_capacity(definition.paths.len());
        for path in &definition.paths {
            let value = extract_path(document, path).ok_or_else(|| missing_partition_key(definition))?;
            values.push(PartitionKeyValue::from_document_value(value));
        }
        Ok(PartitionKeyInternal(values))
    }
}

fn missing_partition_key(definition: &PartitionKeyDefinition) -> Error {
    Error::new(
        ErrorKind::MissingPartitionKey,
        format!(
            "a partition key value for '{}' is required but was neither supplied nor found in the document",
            definition.paths.join(",")
        ),
    )
}

fn extract_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(document, |current, segment| {
            current.as_object()?.get(segment.trim_matches('"'))
        })
}
