//! Dependency-ordered injection of per-component configuration.
//!
//! The injector walks an externally ordered component collection exactly
//! once. For each component it looks up the registered spec, extracts the
//! sub-document at the spec's config key from the validated configuration,
//! optionally re-validates it, and delivers it through the component's
//! configure capability. Any failure aborts the pass; no downstream
//! component is configured and the partially updated collection is dropped.

use crate::error::{ConfigError, Result};
use crate::schema::{conform, SchemaRegistry};
use serde_json::Value;
use tracing::debug;

/// A unit of the running system that can receive its own slice of
/// configuration.
///
/// `configure` is the optional capability method: the provided default
/// delegates to [`Component::assign`], the conventional field assignment.
/// Components needing custom handling override `configure`.
pub trait Component {
    /// Identity used to look up this component's [`crate::schema::ComponentSpec`].
    fn id(&self) -> &str;

    /// Conventional assignment target used by the default `configure`.
    fn assign(&mut self, config: Value);

    /// Receive the validated sub-document. Override for custom handling;
    /// errors abort the whole injection pass.
    fn configure(&mut self, config: Value) -> Result<()> {
        self.assign(config);
        Ok(())
    }
}

/// External dependency-order primitive.
///
/// The engine never reimplements topological sorting; it only requires that
/// `f` sees a node after all of that node's dependencies have been
/// processed, and that the collection is rebuilt from the updated nodes.
pub trait DependencyOrdered: Sized {
    type Node;

    /// Apply `f` to every node respecting the partial order, rebuilding the
    /// collection. The first error aborts the walk and nothing is returned.
    fn try_update_ordered<F>(self, f: F) -> Result<Self>
    where
        F: FnMut(Self::Node) -> Result<Self::Node>;
}

/// A `Vec` already sorted in dependency order by its producer.
impl<T> DependencyOrdered for Vec<T> {
    type Node = T;

    fn try_update_ordered<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(T) -> Result<T>,
    {
        let mut updated = Vec::with_capacity(self.len());
        for node in self {
            updated.push(f(node)?);
        }
        Ok(updated)
    }
}

/// How sub-documents are validated at injection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// The whole document was already conformed against the master schema;
    /// sub-documents are delivered as-is.
    WholeDocument,
    /// Each component's sub-document is conformed against that component's
    /// own schema at injection time.
    PerComponent,
}

/// Distributes validated configuration across a dependency-ordered
/// component collection. Never mutates the configuration document.
pub struct ComponentInjector<'a> {
    registry: &'a SchemaRegistry,
    config: &'a Value,
    mode: ValidationMode,
}

impl<'a> ComponentInjector<'a> {
    pub fn new(registry: &'a SchemaRegistry, config: &'a Value, mode: ValidationMode) -> Self {
        Self {
            registry,
            config,
            mode,
        }
    }

    /// Walk the collection once in dependency order, configuring each
    /// component from its sub-document. Components with no registered spec,
    /// no config key, or no matching sub-document pass through unchanged.
    pub fn inject<G>(&self, graph: G) -> Result<G>
    where
        G: DependencyOrdered,
        G::Node: Component,
    {
        graph.try_update_ordered(|mut node| {
            let component = node.id().to_string();

            let Some(spec) = self.registry.get(&component) else {
                debug!(component, "no registered spec, passing through");
                return Ok(node);
            };
            let Some(config_key) = spec.config_key.as_deref() else {
                debug!(component, "no config key, passing through");
                return Ok(node);
            };
            let Some(sub_document) = self.config.get(config_key) else {
                debug!(component, config_key, "no sub-document, passing through");
                return Ok(node);
            };

            let delivered = match (self.mode, &spec.schema) {
                (ValidationMode::PerComponent, Some(schema)) => conform(schema, sub_document)
                    .map_err(|failure| {
                        ConfigError::from(failure).for_component(&component)
                    })?,
                _ => sub_document.clone(),
            };

            debug!(component, config_key, "configuring component");
            node.configure(delivered)
                .map_err(|err| err.for_component(&component))?;
            Ok(node)
        })
    }
}
