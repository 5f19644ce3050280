//! Layered configuration assembly for component systems.
//!
//! `strata` assembles a single, validated runtime configuration document by
//! discovering sources across profiles and variants, expanding `${name}`
//! property references, deep-merging the layered documents, validating and
//! coercing the result against per-component schemas, and injecting each
//! component's own slice in dependency order.
//!
//! The pipeline is single-threaded, synchronous, and all-or-nothing: one
//! invocation either yields one validated document (and a configured
//! component collection) or a single structured error.

pub mod assembly;
pub mod error;
pub mod inject;
pub mod locator;
pub mod merge;
pub mod properties;
pub mod reader;
pub mod schema;

pub use assembly::{assemble, assemble_and_inject, parse_args, AssemblyOptions};
pub use error::{ConfigError, Result};
pub use inject::{Component, ComponentInjector, DependencyOrdered, ValidationMode};
pub use locator::{generate_selectors, ResourceLocator, ResourcePathFn, Selector, SourceLocation};
pub use merge::{deep_merge, deep_merge_all};
pub use properties::{PropertyTable, PropertyTableBuilder};
pub use reader::{DirectiveRegistry, ParserRegistry, SourceReader};
pub use schema::{conform, ComponentSpec, Schema, SchemaRegistry, ValidationFailure};
