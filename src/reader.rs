//! Source reading: property expansion, format parsing, and directives.
//!
//! Reading a source is three steps: load the raw text, expand
//! `${name}` / `${name:default}` references against the property table, then
//! hand the expanded text to the parser registered for the source's
//! extension. Parsers and value-construction directives are pluggable
//! callbacks, not engine logic.

use crate::error::{ConfigError, Result};
use crate::locator::SourceLocation;
use crate::properties::PropertyTable;
use heck::ToKebabCase;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Format parser: expanded source text to a structured document.
pub type ParserFn = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// Value-construction directive: resolved argument and property table to a
/// replacement value.
pub type DirectiveFn = Arc<dyn Fn(&Value, &PropertyTable) -> anyhow::Result<Value> + Send + Sync>;

/// Property-reference pattern: a name (not itself starting with another
/// reference), optionally followed by `:` and a literal default, inside
/// `${...}` braces.
fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^{}:$]+)(?::([^{}]*))?\}").expect("property-reference pattern")
    })
}

/// Expand every property reference in `text`, left-to-right, in one pass.
///
/// `${name}` fails with [`ConfigError::UnresolvedProperty`] when `name` has
/// no table entry; `${name:default}` falls back to the literal default.
/// Expansion happens on raw text before structural parsing; replacement
/// values are not themselves re-scanned.
pub fn expand_properties(
    text: &str,
    properties: &PropertyTable,
    location: &str,
) -> Result<String> {
    let mut expanded = String::with_capacity(text.len());
    let mut last_end = 0;

    for caps in reference_pattern().captures_iter(text) {
        let Some(reference) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        expanded.push_str(&text[last_end..reference.start()]);

        match properties.get(name) {
            Some(value) => expanded.push_str(value),
            None => match caps.get(2) {
                Some(default) => expanded.push_str(default.as_str()),
                None => {
                    return Err(ConfigError::UnresolvedProperty {
                        name: name.to_string(),
                        location: location.to_string(),
                    });
                }
            },
        }
        last_end = reference.end();
    }

    expanded.push_str(&text[last_end..]);
    Ok(expanded)
}

/// Registry of value-construction directives keyed by name.
///
/// A directive is written in a source as a single-entry map whose key is the
/// directive name prefixed with `!`, e.g. `{"!join": ["db-", "${HOST}"]}`.
/// Directives are applied bottom-up after structural parsing, so a
/// directive's argument is already fully resolved when its callback runs.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    directives: HashMap<String, DirectiveFn>,
}

impl DirectiveRegistry {
    /// Registry with the standard directives: `join`, `prop`, `int`,
    /// `keyword`.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register("join", Arc::new(join_directive));
        registry.register("prop", Arc::new(prop_directive));
        registry.register("int", Arc::new(int_directive));
        registry.register("keyword", Arc::new(keyword_directive));
        registry
    }

    /// Register (or replace) a directive callback.
    pub fn register(&mut self, name: impl Into<String>, directive: DirectiveFn) {
        self.directives.insert(name.into(), directive);
    }

    /// Apply directives throughout a document, bottom-up.
    pub fn apply(&self, document: Value, properties: &PropertyTable, location: &Path) -> Result<Value> {
        match document {
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.apply(value, properties, location)?);
                }
                if resolved.len() == 1 {
                    if let Some((key, value)) = resolved.iter().next() {
                        if let Some(name) = key.strip_prefix('!') {
                            return self.invoke(name, value, properties, location);
                        }
                    }
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.apply(item, properties, location))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }

    fn invoke(
        &self,
        name: &str,
        argument: &Value,
        properties: &PropertyTable,
        location: &Path,
    ) -> Result<Value> {
        let directive = self
            .directives
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDirective {
                name: name.to_string(),
                location: location.to_path_buf(),
            })?;
        directive(argument, properties).map_err(|source| ConfigError::ParseSource {
            location: location.to_path_buf(),
            source: source.context(format!("directive '!{name}'")),
        })
    }
}

/// `!join`: concatenate scalar fragments into one string.
fn join_directive(argument: &Value, _properties: &PropertyTable) -> anyhow::Result<Value> {
    let fragments = argument
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("expected a sequence of fragments, got {argument}"))?;
    let mut joined = String::new();
    for fragment in fragments {
        match fragment {
            Value::String(s) => joined.push_str(s),
            Value::Number(n) => joined.push_str(&n.to_string()),
            Value::Bool(b) => joined.push_str(if *b { "true" } else { "false" }),
            other => anyhow::bail!("cannot join non-scalar fragment {other}"),
        }
    }
    Ok(Value::String(joined))
}

/// `!prop`: first-class property lookup, `"NAME"` or `["NAME", default]`.
fn prop_directive(argument: &Value, properties: &PropertyTable) -> anyhow::Result<Value> {
    let (name, default) = match argument {
        Value::String(name) => (name.as_str(), None),
        Value::Array(pair) if pair.len() == 2 => match &pair[0] {
            Value::String(name) => (name.as_str(), Some(&pair[1])),
            other => anyhow::bail!("property name must be a string, got {other}"),
        },
        other => anyhow::bail!("expected \"NAME\" or [\"NAME\", default], got {other}"),
    };
    match (properties.get(name), default) {
        (Some(value), _) => Ok(Value::String(value.to_string())),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => anyhow::bail!("unresolved property reference ${{{name}}}"),
    }
}

/// `!int`: coerce a string to an integer.
fn int_directive(argument: &Value, _properties: &PropertyTable) -> anyhow::Result<Value> {
    match argument {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(argument.clone()),
        Value::String(s) => {
            let parsed: i64 = s
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("'{s}' is not an integer"))?;
            Ok(Value::Number(parsed.into()))
        }
        other => anyhow::bail!("cannot coerce {other} to an integer"),
    }
}

/// `!keyword`: coerce a string to its canonical symbolic (kebab-case) form.
fn keyword_directive(argument: &Value, _properties: &PropertyTable) -> anyhow::Result<Value> {
    match argument {
        Value::String(s) => Ok(Value::String(s.to_kebab_case())),
        other => anyhow::bail!("cannot coerce {other} to a keyword"),
    }
}

/// Extension-to-parser mapping. Registration order is preserved and drives
/// selector generation order.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: Vec<(String, ParserFn)>,
    directives: DirectiveRegistry,
}

impl ParserRegistry {
    /// Empty registry with the standard directive set.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
            directives: DirectiveRegistry::standard(),
        }
    }

    /// Registry with the standard parsers: `yaml`, `yml`, `json`, `toml`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let yaml: ParserFn = Arc::new(|text| Ok(serde_yaml::from_str::<Value>(text)?));
        registry.register("yaml", Arc::clone(&yaml));
        registry.register("yml", yaml);
        registry.register("json", Arc::new(|text| Ok(serde_json::from_str(text)?)));
        registry.register(
            "toml",
            Arc::new(|text| {
                let value: toml::Value = toml::from_str(text)?;
                Ok(serde_json::to_value(value)?)
            }),
        );
        registry
    }

    /// Register a parser for an extension, replacing any existing one
    /// without disturbing registration order.
    pub fn register(&mut self, extension: impl Into<String>, parser: ParserFn) {
        let extension = extension.into();
        if let Some(slot) = self.parsers.iter_mut().find(|(ext, _)| *ext == extension) {
            slot.1 = parser;
        } else {
            self.parsers.push((extension, parser));
        }
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> Vec<String> {
        self.parsers.iter().map(|(ext, _)| ext.clone()).collect()
    }

    /// Parser registered for an extension, if any.
    pub fn parser_for(&self, extension: &str) -> Option<&ParserFn> {
        self.parsers
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, parser)| parser)
    }

    /// The directive registry applied after parsing.
    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// Mutable access for registering custom directives.
    pub fn directives_mut(&mut self) -> &mut DirectiveRegistry {
        &mut self.directives
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.extensions())
            .finish_non_exhaustive()
    }
}

/// Reads one source location into a structured document.
pub struct SourceReader<'a> {
    parsers: &'a ParserRegistry,
    properties: &'a PropertyTable,
}

impl<'a> SourceReader<'a> {
    pub fn new(parsers: &'a ParserRegistry, properties: &'a PropertyTable) -> Self {
        Self {
            parsers,
            properties,
        }
    }

    /// Load raw text from the location, expand property references, parse
    /// with the registered parser, and apply directives.
    pub fn read(&self, location: &SourceLocation) -> Result<Value> {
        debug!(location = %location, "reading configuration source");
        let text =
            std::fs::read_to_string(&location.path).map_err(|source| ConfigError::ReadSource {
                location: location.path.clone(),
                source,
            })?;
        self.read_str(&text, location)
    }

    /// Expand and parse already-loaded text. Split out for tests and for
    /// callers with non-filesystem sources.
    pub fn read_str(&self, text: &str, location: &SourceLocation) -> Result<Value> {
        let expanded = expand_properties(text, self.properties, &location.to_string())?;

        let parser = self.parsers.parser_for(&location.extension).ok_or_else(|| {
            ConfigError::UnknownExtension {
                extension: location.extension.clone(),
                location: location.path.clone(),
            }
        })?;
        let document = parser(&expanded).map_err(|source| ConfigError::ParseSource {
            location: location.path.clone(),
            source,
        })?;

        self.parsers
            .directives
            .apply(document, self.properties, &location.path)
    }
}
