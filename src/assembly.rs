//! Assembly pipeline: options, command-line grammar, and the staged
//! locate/read/merge/validate run.
//!
//! One assembly invocation is sequential and forward-only: Locating →
//! Reading → Merging → Validating (→ Injecting via
//! [`assemble_and_inject`]). Any failure aborts the remaining stages; there
//! is no retry and no partial configuration.

use crate::error::{ConfigError, Result};
use crate::inject::{Component, ComponentInjector, DependencyOrdered, ValidationMode};
use crate::locator::{generate_selectors, ResourceLocator, ResourcePathFn, SourceLocation};
use crate::merge::deep_merge_all;
use crate::properties::PropertyTable;
use crate::reader::{ParserRegistry, SourceReader};
use crate::schema::{conform, Schema, SchemaRegistry};
use heck::ToKebabCase;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Options for one assembly invocation.
///
/// Merge order (lowest to highest precedence): `overrides`, discovered
/// selector documents in generation order, `additional_files`, command-line
/// `--load` documents, command-line `key=value` overrides. The position of
/// `overrides` at the bottom of the stack is an engine decision, not
/// user-adjustable per call.
pub struct AssemblyOptions {
    /// Profiles to load, in order.
    pub profiles: Vec<String>,
    /// Variants layered within each profile, implicitly prefixed with the
    /// default (absent) variant.
    pub variants: Vec<String>,
    /// Search roots for resource discovery.
    pub roots: Vec<PathBuf>,
    /// Explicit files merged after discovered sources.
    pub additional_files: Vec<PathBuf>,
    /// Raw command-line tokens (`--load <path>` and `<path>=<value>`).
    pub args: Vec<String>,
    /// Base document folded in first, below all file layers.
    pub overrides: Option<Value>,
    /// Explicit property map, layered over the process environment.
    pub properties: HashMap<String, String>,
    /// Pre-collected master schema; when present the merged document is
    /// conformed against it in one whole-document pass.
    pub schema: Option<Schema>,
    /// Extension-to-parser mapping; registration order drives selector
    /// generation order.
    pub parsers: ParserRegistry,
    /// Replacement resource-name generator.
    pub generator: Option<ResourcePathFn>,
}

impl std::fmt::Debug for AssemblyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyOptions")
            .field("profiles", &self.profiles)
            .field("variants", &self.variants)
            .field("roots", &self.roots)
            .field("additional_files", &self.additional_files)
            .field("args", &self.args)
            .field("parsers", &self.parsers)
            .finish_non_exhaustive()
    }
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            variants: Vec::new(),
            roots: vec![PathBuf::from(".")],
            additional_files: Vec::new(),
            args: Vec::new(),
            overrides: None,
            properties: HashMap::new(),
            schema: None,
            parsers: ParserRegistry::standard(),
            generator: None,
        }
    }
}

impl AssemblyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variants.push(variant.into());
        self
    }

    /// Replace the search roots (the default is the current directory).
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_additional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.additional_files.push(path.into());
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_generator(mut self, generator: ResourcePathFn) -> Self {
        self.generator = Some(generator);
        self
    }
}

/// Parsed command-line tokens.
#[derive(Debug, Default, PartialEq)]
pub struct CommandLineInput {
    /// Paths given via `--load`, in order.
    pub loads: Vec<PathBuf>,
    /// Nested single-leaf documents built from `key=value` tokens, in order.
    pub overrides: Vec<Value>,
}

/// Parse the flat token grammar: `--load <path>` appends to the load list;
/// any other token must match `<slash-separated-path>=<value>` and becomes a
/// nested-key assignment with the value as a literal string leaf. Path
/// segments are converted to their canonical kebab-case form.
pub fn parse_args(args: &[String]) -> Result<CommandLineInput> {
    let mut input = CommandLineInput::default();
    let mut tokens = args.iter();

    while let Some(token) = tokens.next() {
        if token == "--load" {
            let path = tokens.next().ok_or_else(|| ConfigError::MalformedArgument {
                token: token.clone(),
            })?;
            input.loads.push(PathBuf::from(path));
            continue;
        }

        let Some((key_path, value)) = token.split_once('=') else {
            return Err(ConfigError::MalformedArgument {
                token: token.clone(),
            });
        };
        let segments: Vec<&str> = key_path.split('/').collect();
        if key_path.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(ConfigError::MalformedArgument {
                token: token.clone(),
            });
        }

        let mut document = Value::String(value.to_string());
        for segment in segments.into_iter().rev() {
            let mut map = serde_json::Map::new();
            map.insert(segment.to_kebab_case(), document);
            document = Value::Object(map);
        }
        input.overrides.push(document);
    }

    Ok(input)
}

/// Assemble the single merged (and, when a schema is present, validated)
/// configuration document for this invocation.
pub fn assemble(options: &AssemblyOptions) -> Result<Value> {
    let properties = PropertyTable::builder()
        .environment()
        .overrides(options.properties.clone())
        .build();
    let input = parse_args(&options.args)?;

    debug!(stage = "locating", profiles = ?options.profiles, variants = ?options.variants);
    let mut locator = ResourceLocator::new(options.roots.clone());
    if let Some(generator) = &options.generator {
        locator = locator.with_generator(Arc::clone(generator));
    }
    let selectors = generate_selectors(
        &options.profiles,
        &options.variants,
        &options.parsers.extensions(),
    );

    debug!(stage = "reading", selectors = selectors.len());
    let reader = SourceReader::new(&options.parsers, &properties);
    let mut documents = Vec::new();
    if let Some(overrides) = &options.overrides {
        documents.push(overrides.clone());
    }
    for selector in &selectors {
        for location in locator.locate(selector) {
            documents.push(reader.read(&location)?);
        }
    }
    for path in &options.additional_files {
        documents.push(reader.read(&SourceLocation::from_path(path))?);
    }
    for path in &input.loads {
        documents.push(reader.read(&SourceLocation::from_path(path))?);
    }
    documents.extend(input.overrides);

    debug!(stage = "merging", documents = documents.len());
    let merged = match deep_merge_all(documents) {
        Value::Null => Value::Object(serde_json::Map::new()),
        document => document,
    };

    match &options.schema {
        Some(schema) => {
            debug!(stage = "validating");
            Ok(conform(schema, &merged)?)
        }
        None => Ok(merged),
    }
}

/// Assemble, validate against the registry's master schema in one
/// whole-document pass, and inject each component's sub-document in
/// dependency order. Returns the validated document and the updated
/// collection.
///
/// When `options.schema` is already set, it takes the place of the
/// registry's master schema for validation. For per-component validation
/// at injection time, use [`ComponentInjector`] with
/// [`ValidationMode::PerComponent`] directly.
pub fn assemble_and_inject<G>(
    options: &AssemblyOptions,
    registry: &SchemaRegistry,
    graph: G,
) -> Result<(Value, G)>
where
    G: DependencyOrdered,
    G::Node: Component,
{
    let merged = assemble(options)?;
    let validated = match registry.master_schema() {
        Some(master) if options.schema.is_none() => {
            debug!(stage = "validating");
            conform(&master, &merged)?
        }
        _ => merged,
    };

    debug!(stage = "injecting");
    let injector = ComponentInjector::new(registry, &validated, ValidationMode::WholeDocument);
    let graph = injector.inject(graph)?;
    Ok((validated, graph))
}
