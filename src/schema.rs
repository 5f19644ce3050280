//! Per-component schemas: registration, merging, validation, and coercion.
//!
//! Components declare a `(config-key, schema)` pair once at construction
//! time. The registry keeps those declarations in component order as an
//! explicit side table; schemas merge into one master schema by the same
//! recursive map-merge rule as documents. Conformance coerces string leaves
//! into the declared type and collects every failing path before reporting.

use heck::ToKebabCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Declarative description of a sub-document's expected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Schema {
    /// Any value conforms unchanged.
    Any,
    /// A string leaf.
    String,
    /// An integer leaf; string leaves are coerced with `parse::<i64>`.
    Int,
    /// A float leaf; string leaves are coerced with `parse::<f64>`.
    Float,
    /// A boolean leaf; `"true"` / `"false"` strings are coerced.
    Bool,
    /// A symbolic token; string leaves are canonicalized to kebab-case.
    Keyword,
    /// A key that may be absent or null.
    Optional(Box<Schema>),
    /// A sequence whose elements all conform to the inner schema.
    Sequence(Box<Schema>),
    /// A map with per-key schemas. Declared keys are required unless
    /// `Optional`; undeclared keys pass through unchanged.
    Map(BTreeMap<String, Schema>),
}

impl Schema {
    /// Convenience constructor for a map schema.
    pub fn map<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Schema::Map(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convenience constructor for an optional field.
    pub fn optional(inner: Schema) -> Self {
        Schema::Optional(Box::new(inner))
    }

    /// Convenience constructor for a sequence.
    pub fn sequence(inner: Schema) -> Self {
        Schema::Sequence(Box::new(inner))
    }
}

/// Merge two schemas by the document merge rule: maps merge key-wise, any
/// other combination takes the later schema. Schemas for disjoint keys
/// simply coexist.
pub fn merge_schemas(base: Schema, overlay: Schema) -> Schema {
    match (base, overlay) {
        (Schema::Map(mut base_map), Schema::Map(overlay_map)) => {
            for (key, overlay_schema) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_schema) => merge_schemas(base_schema, overlay_schema),
                    None => overlay_schema,
                };
                base_map.insert(key, merged);
            }
            Schema::Map(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// One field/path that failed conformance.
#[derive(Debug, Clone, Serialize)]
pub struct FieldFailure {
    /// Slash-separated path from the document root.
    pub path: String,
    /// What went wrong at that path.
    pub message: String,
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A document (or sub-document) failed schema conformance. Carries the
/// offending schema, the document that failed, and every failing field.
#[derive(Debug, Error)]
pub struct ValidationFailure {
    pub schema: Schema,
    pub document: Value,
    pub failures: Vec<FieldFailure>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration failed validation")?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

/// Association between a component identity, an optional top-level
/// configuration key, and the schema for that key's sub-document.
///
/// Declared once when a component is constructed, consumed once during
/// injection. A spec with no `config_key` opts the component out of
/// configuration entirely.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub component: String,
    pub config_key: Option<String>,
    pub schema: Option<Schema>,
}

impl ComponentSpec {
    pub fn new(
        component: impl Into<String>,
        config_key: impl Into<String>,
        schema: Schema,
    ) -> Self {
        Self {
            component: component.into(),
            config_key: Some(config_key.into()),
            schema: Some(schema),
        }
    }

    /// A component that takes no configuration at all.
    pub fn opt_out(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            config_key: None,
            schema: None,
        }
    }

    /// A component that receives the raw sub-document under `config_key`
    /// without individual validation.
    pub fn unvalidated(component: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            config_key: Some(config_key.into()),
            schema: None,
        }
    }
}

/// Explicit side table from component identity to `(config-key, schema)`,
/// kept in component (registration) order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    specs: Vec<ComponentSpec>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component's spec. A later registration for the same
    /// component replaces the earlier one in place.
    pub fn register(&mut self, spec: ComponentSpec) {
        if let Some(slot) = self
            .specs
            .iter_mut()
            .find(|existing| existing.component == spec.component)
        {
            *slot = spec;
        } else {
            self.specs.push(spec);
        }
    }

    /// Spec registered for a component, if any.
    pub fn get(&self, component: &str) -> Option<&ComponentSpec> {
        self.specs.iter().find(|spec| spec.component == component)
    }

    /// All registered `(config-key, schema)` pairs, in component order.
    pub fn extract_schemas(&self) -> Vec<(&str, &Schema)> {
        self.specs
            .iter()
            .filter_map(|spec| match (&spec.config_key, &spec.schema) {
                (Some(key), Some(schema)) => Some((key.as_str(), schema)),
                _ => None,
            })
            .collect()
    }

    /// Fold every registered schema into one master schema keyed by config
    /// key. `None` when no component declared a schema.
    pub fn master_schema(&self) -> Option<Schema> {
        let mut master: Option<Schema> = None;
        for (key, schema) in self.extract_schemas() {
            let keyed = Schema::Map(BTreeMap::from([(key.to_string(), schema.clone())]));
            master = Some(match master {
                Some(existing) => merge_schemas(existing, keyed),
                None => keyed,
            });
        }
        master
    }
}

/// Validate and coerce a document against a schema.
///
/// String leaves are coerced into the schema's declared type. Every failing
/// field is collected before the whole document is rejected with a
/// [`ValidationFailure`].
pub fn conform(schema: &Schema, document: &Value) -> Result<Value, ValidationFailure> {
    let mut failures = Vec::new();
    let coerced = conform_value(schema, document, "", &mut failures);
    if failures.is_empty() {
        Ok(coerced)
    } else {
        Err(ValidationFailure {
            schema: schema.clone(),
            document: document.clone(),
            failures,
        })
    }
}

fn fail(failures: &mut Vec<FieldFailure>, path: &str, message: String) -> Value {
    failures.push(FieldFailure {
        path: path.to_string(),
        message,
    });
    Value::Null
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}/{key}")
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

fn conform_value(
    schema: &Schema,
    value: &Value,
    path: &str,
    failures: &mut Vec<FieldFailure>,
) -> Value {
    match schema {
        Schema::Any => value.clone(),
        Schema::String => match value {
            Value::String(_) => value.clone(),
            other => fail(
                failures,
                path,
                format!("expected string, got {}", kind_of(other)),
            ),
        },
        Schema::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(parsed) => Value::Number(parsed.into()),
                Err(_) => fail(failures, path, format!("'{s}' is not an integer")),
            },
            other => fail(
                failures,
                path,
                format!("expected integer, got {}", kind_of(other)),
            ),
        },
        Schema::Float => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(parsed) => serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .unwrap_or_else(|| fail(failures, path, format!("'{s}' is not a number"))),
                Err(_) => fail(failures, path, format!("'{s}' is not a number")),
            },
            other => fail(
                failures,
                path,
                format!("expected number, got {}", kind_of(other)),
            ),
        },
        Schema::Bool => match value {
            Value::Bool(_) => value.clone(),
            Value::String(s) => match s.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => fail(failures, path, format!("'{s}' is not a boolean")),
            },
            other => fail(
                failures,
                path,
                format!("expected boolean, got {}", kind_of(other)),
            ),
        },
        Schema::Keyword => match value {
            Value::String(s) => Value::String(s.to_kebab_case()),
            other => fail(
                failures,
                path,
                format!("expected keyword, got {}", kind_of(other)),
            ),
        },
        Schema::Optional(inner) => match value {
            Value::Null => Value::Null,
            present => conform_value(inner, present, path, failures),
        },
        Schema::Sequence(inner) => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        conform_value(inner, item, &join_path(path, &index.to_string()), failures)
                    })
                    .collect(),
            ),
            other => fail(
                failures,
                path,
                format!("expected sequence, got {}", kind_of(other)),
            ),
        },
        Schema::Map(fields) => match value {
            Value::Object(map) => {
                let mut conformed = map.clone();
                for (key, field_schema) in fields {
                    let field_path = join_path(path, key);
                    match map.get(key) {
                        Some(field_value) => {
                            conformed.insert(
                                key.clone(),
                                conform_value(field_schema, field_value, &field_path, failures),
                            );
                        }
                        None => {
                            if !matches!(field_schema, Schema::Optional(_)) {
                                fail(failures, &field_path, "missing required key".to_string());
                            }
                        }
                    }
                }
                Value::Object(conformed)
            }
            other => fail(
                failures,
                path,
                format!("expected map, got {}", kind_of(other)),
            ),
        },
    }
}
