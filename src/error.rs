//! Structured error types for configuration assembly.
//!
//! Every failure kind is fatal to the current assembly invocation; there are
//! no internal retries. Absence of a resource for a selector is the only
//! condition that is expected and non-erroring, and it never reaches this
//! module.

use crate::schema::ValidationFailure;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while assembling, validating, or injecting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A `${name}` reference with no default and no matching property.
    #[error("unresolved property reference ${{{name}}} in {location}")]
    UnresolvedProperty { name: String, location: String },

    /// A source path whose extension has no registered parser.
    #[error("no parser registered for extension '{extension}' ({})", location.display())]
    UnknownExtension {
        extension: String,
        location: PathBuf,
    },

    /// The source location could not be opened or read.
    #[error("failed to read configuration source {}", location.display())]
    ReadSource {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The format parser rejected the (expanded) source text.
    #[error("malformed configuration source {}", location.display())]
    ParseSource {
        location: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A `!name` directive with no registered callback.
    #[error("unknown directive '!{name}' in {}", location.display())]
    UnknownDirective { name: String, location: PathBuf },

    /// A command-line token matching neither `--load <path>` nor
    /// `<path>=<value>`.
    #[error(
        "malformed command-line argument '{token}' (expected --load <path> or <path>=<value>)"
    )]
    MalformedArgument { token: String },

    /// The merged document (or a component sub-document) failed schema
    /// conformance.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// A component could not be configured during injection. Wraps the
    /// triggering error with the identity of the component being configured.
    #[error("failed to configure component '{component}'")]
    ComponentConfiguration {
        component: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Wrap an error with the identity of the component being configured.
    pub fn for_component(self, component: impl Into<String>) -> Self {
        ConfigError::ComponentConfiguration {
            component: component.into(),
            source: Box::new(self),
        }
    }
}
