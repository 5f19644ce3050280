//! Resource discovery across profiles, variants, and search roots.
//!
//! A selector names one candidate configuration source set; the locator
//! resolves its generated relative path against every search root and
//! returns every match. Absence of a resource for a selector is expected
//! and silent.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Identifies one candidate configuration source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Named grouping of configuration sources (application or deployment
    /// concern); omitted from the path when absent.
    pub profile: Option<String>,
    /// Named layer within a profile; omitted from the path when absent.
    pub variant: Option<String>,
    /// File extension, which also selects the parser.
    pub extension: String,
}

impl Selector {
    pub fn new(
        profile: Option<impl Into<String>>,
        variant: Option<impl Into<String>>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            profile: profile.map(Into::into),
            variant: variant.map(Into::into),
            extension: extension.into(),
        }
    }

    /// Default resource name: the non-null of profile and variant joined
    /// with `-`, then `.` and the extension. `None` when both segments are
    /// absent, in which case the selector names nothing.
    pub fn resource_name(&self) -> Option<String> {
        let segments: Vec<&str> = [self.profile.as_deref(), self.variant.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if segments.is_empty() {
            return None;
        }
        Some(format!("{}.{}", segments.join("-"), self.extension))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resource_name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<empty>.{}", self.extension),
        }
    }
}

/// A concrete configuration source on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Absolute or root-relative path of the source file.
    pub path: PathBuf,
    /// Extension used to select the parser.
    pub extension: String,
}

impl SourceLocation {
    /// Build a location from an explicit path, taking the extension from
    /// the path itself. Used for additional files and `--load` arguments.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Self { path, extension }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Pluggable resource-name generator with the same signature as
/// [`Selector::resource_name`].
pub type ResourcePathFn = Arc<dyn Fn(&Selector) -> Option<String> + Send + Sync>;

/// Resolves selectors to source locations across an ordered set of search
/// roots (the classpath equivalent).
#[derive(Clone)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
    generator: ResourcePathFn,
}

impl ResourceLocator {
    /// Locator over the given search roots with the default name generator.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            generator: Arc::new(Selector::resource_name),
        }
    }

    /// Replace the resource-name generator.
    pub fn with_generator(mut self, generator: ResourcePathFn) -> Self {
        self.generator = generator;
        self
    }

    /// Resolve a selector against every root, returning all matches in root
    /// order. An empty result is not an error: absence of a profile/variant
    /// combination is expected.
    pub fn locate(&self, selector: &Selector) -> Vec<SourceLocation> {
        let Some(name) = (self.generator)(selector) else {
            return Vec::new();
        };

        let mut locations = Vec::new();
        for root in &self.roots {
            let path = root.join(&name);
            if path.is_file() {
                debug!(selector = %selector, path = %path.display(), "located resource");
                locations.push(SourceLocation {
                    path,
                    extension: selector.extension.clone(),
                });
            }
        }
        locations
    }
}

impl fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Cross profiles, variants, and extensions into selectors in load order:
/// profile-major, then variant (default/None variant first), then extension
/// in parser-registration order.
pub fn generate_selectors(
    profiles: &[String],
    variants: &[String],
    extensions: &[String],
) -> Vec<Selector> {
    let mut selectors = Vec::new();
    for profile in profiles {
        for variant in std::iter::once(None).chain(variants.iter().map(Some)) {
            for extension in extensions {
                selectors.push(Selector {
                    profile: Some(profile.clone()),
                    variant: variant.cloned(),
                    extension: extension.clone(),
                });
            }
        }
    }
    selectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resource_name_joins_non_null_segments() {
        let sel = Selector::new(Some("web"), Some("local"), "yaml");
        assert_eq!(sel.resource_name(), Some("web-local.yaml".to_string()));

        let sel = Selector::new(Some("web"), None::<&str>, "yaml");
        assert_eq!(sel.resource_name(), Some("web.yaml".to_string()));

        let sel = Selector::new(None::<&str>, Some("local"), "yaml");
        assert_eq!(sel.resource_name(), Some("local.yaml".to_string()));

        let sel = Selector::new(None::<&str>, None::<&str>, "yaml");
        assert_eq!(sel.resource_name(), None);
    }

    #[test]
    fn generation_order_is_profile_variant_extension() {
        let selectors = generate_selectors(
            &strings(&["app", "web"]),
            &strings(&["local"]),
            &strings(&["yaml", "json"]),
        );
        let names: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "app.yaml",
                "app.json",
                "app-local.yaml",
                "app-local.json",
                "web.yaml",
                "web.json",
                "web-local.yaml",
                "web-local.json",
            ]
        );
    }

    #[test]
    fn locate_returns_matches_in_root_order() {
        let temp = TempDir::new().unwrap();
        let root_a = temp.path().join("a");
        let root_b = temp.path().join("b");
        std::fs::create_dir_all(&root_a).unwrap();
        std::fs::create_dir_all(&root_b).unwrap();
        std::fs::write(root_a.join("app.yaml"), "x: 1").unwrap();
        std::fs::write(root_b.join("app.yaml"), "x: 2").unwrap();

        let locator = ResourceLocator::new([root_a.clone(), root_b.clone()]);
        let hits = locator.locate(&Selector::new(Some("app"), None::<&str>, "yaml"));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, root_a.join("app.yaml"));
        assert_eq!(hits[1].path, root_b.join("app.yaml"));
    }

    #[test]
    fn missing_resource_is_silent() {
        let temp = TempDir::new().unwrap();
        let locator = ResourceLocator::new([temp.path().to_path_buf()]);
        let hits = locator.locate(&Selector::new(Some("nope"), Some("local"), "yaml"));
        assert!(hits.is_empty());
    }

    #[test]
    fn generator_is_replaceable() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("custom_app.conf.yaml"), "x: 1").unwrap();

        let locator = ResourceLocator::new([temp.path().to_path_buf()]).with_generator(Arc::new(
            |sel: &Selector| {
                sel.profile
                    .as_ref()
                    .map(|p| format!("custom_{p}.conf.{}", sel.extension))
            },
        ));
        let hits = locator.locate(&Selector::new(Some("app"), None::<&str>, "yaml"));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].path.ends_with("custom_app.conf.yaml"));
    }

    #[test]
    fn location_from_path_takes_extension() {
        let loc = SourceLocation::from_path("conf/extra.json");
        assert_eq!(loc.extension, "json");
        let loc = SourceLocation::from_path("conf/noext");
        assert_eq!(loc.extension, "");
    }
}
