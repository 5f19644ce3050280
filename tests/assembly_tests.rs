//! End-to-end assembly tests: discovery, expansion, merge precedence,
//! schema coercion, and dependency-ordered injection.

use serde_json::{json, Value};
use std::path::Path;
use strata::{
    assemble, assemble_and_inject, AssemblyOptions, Component, ComponentInjector, ComponentSpec,
    ConfigError, Schema, SchemaRegistry, ValidationMode,
};
use tempfile::TempDir;

fn write(root: &Path, name: &str, content: &str) {
    std::fs::write(root.join(name), content).unwrap();
}

#[derive(Debug)]
struct TestComponent {
    name: String,
    config: Option<Value>,
}

impl TestComponent {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: None,
        }
    }
}

impl Component for TestComponent {
    fn id(&self) -> &str {
        &self.name
    }

    fn assign(&mut self, config: Value) {
        self.config = Some(config);
    }
}

#[test]
fn full_pipeline_discovers_expands_merges_and_injects() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "app.yaml",
        "web-server:\n  port: '${STRATA_PORT:8080}'\n  pool-size: 25\ndatabase:\n  host: ${STRATA_DB_HOST:localhost}\n",
    );
    write(
        temp.path(),
        "app-local.yaml",
        "database:\n  host: 127.0.0.1\n",
    );

    let mut registry = SchemaRegistry::new();
    registry.register(ComponentSpec::new(
        "web-server",
        "web-server",
        Schema::map([
            ("port", Schema::Int),
            ("pool-size", Schema::Int),
        ]),
    ));
    registry.register(ComponentSpec::new(
        "database",
        "database",
        Schema::map([("host", Schema::String)]),
    ));

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_variant("local")
        .with_roots([temp.path()]);

    // database is dependency-ordered before web-server.
    let components = vec![TestComponent::new("database"), TestComponent::new("web-server")];
    let (document, configured) = assemble_and_inject(&options, &registry, components).unwrap();

    assert_eq!(document["web-server"]["port"], json!(8080));
    assert_eq!(configured[0].config, Some(json!({"host": "127.0.0.1"})));
    assert_eq!(
        configured[1].config,
        Some(json!({"port": 8080, "pool-size": 25}))
    );
}

#[test]
fn command_line_precedence_over_files() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "web-server:\n  port: 8080\n");

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()])
        .with_args(["web-server/port=9999"])
        .with_schema(Schema::map([(
            "web-server",
            Schema::map([("port", Schema::Int)]),
        )]));

    let document = assemble(&options).unwrap();
    assert_eq!(document["web-server"]["port"], json!(9999));
}

#[test]
fn property_default_and_override() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "host: ${STRATA_HOST:localhost}\n");

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()]);
    assert_eq!(assemble(&options).unwrap()["host"], json!("localhost"));

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()])
        .with_property("STRATA_HOST", "db");
    assert_eq!(assemble(&options).unwrap()["host"], json!("db"));
}

#[test]
fn unresolved_reference_names_it_once() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "host: ${NOWHERE_SET_99}\n");

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()]);
    let err = assemble(&options).unwrap_err();
    let msg = err.to_string();
    assert_eq!(msg.matches("${NOWHERE_SET_99}").count(), 1);
    assert!(msg.contains("app.yaml"));
}

#[test]
fn sequences_concatenate_across_layers() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "tags: [a]\n");
    write(temp.path(), "app-local.yaml", "tags: [b]\n");

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_variant("local")
        .with_roots([temp.path()]);
    assert_eq!(assemble(&options).unwrap()["tags"], json!(["a", "b"]));
}

#[test]
fn multiple_profiles_load_in_order() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "base.yaml", "a: 1\nb: 1\n");
    write(temp.path(), "app.yaml", "b: 2\n");

    let options = AssemblyOptions::new()
        .with_profile("base")
        .with_profile("app")
        .with_roots([temp.path()]);
    let document = assemble(&options).unwrap();
    assert_eq!(document, json!({"a": 1, "b": 2}));
}

#[test]
fn mixed_formats_merge_across_roots() {
    let temp = TempDir::new().unwrap();
    let conf = temp.path().join("conf");
    let local = temp.path().join("local");
    std::fs::create_dir_all(&conf).unwrap();
    std::fs::create_dir_all(&local).unwrap();
    write(&conf, "app.toml", "[cache]\nttl = 60\n");
    write(&local, "app.json", r#"{"cache": {"size": 100}}"#);

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([conf, local]);
    let document = assemble(&options).unwrap();
    assert_eq!(document["cache"], json!({"ttl": 60, "size": 100}));
}

#[test]
fn coercion_failure_aborts_before_any_component_configures() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "app.yaml",
        "web-server:\n  port: not-an-int\nhandler:\n  pool: 5\n",
    );

    let mut registry = SchemaRegistry::new();
    registry.register(ComponentSpec::new(
        "web-server",
        "web-server",
        Schema::map([("port", Schema::Int)]),
    ));
    registry.register(ComponentSpec::new(
        "handler",
        "handler",
        Schema::map([("pool", Schema::Int)]),
    ));

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()]);
    let components = vec![TestComponent::new("web-server"), TestComponent::new("handler")];
    let err = assemble_and_inject(&options, &registry, components).unwrap_err();

    // Whole-document validation fails before injection starts.
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn per_component_failure_prevents_downstream_components() {
    // B depends on A; A's sub-config is invalid, so B must never configure.
    let merged = json!({
        "a": {"port": "not-an-int"},
        "b": {"pool": 5},
    });

    let mut registry = SchemaRegistry::new();
    registry.register(ComponentSpec::new(
        "a",
        "a",
        Schema::map([("port", Schema::Int)]),
    ));
    registry.register(ComponentSpec::new(
        "b",
        "b",
        Schema::map([("pool", Schema::Int)]),
    ));

    let injector = ComponentInjector::new(&registry, &merged, ValidationMode::PerComponent);
    let err = injector
        .inject(vec![TestComponent::new("a"), TestComponent::new("b")])
        .unwrap_err();

    match err {
        ConfigError::ComponentConfiguration { component, source } => {
            assert_eq!(component, "a");
            assert!(matches!(*source, ConfigError::Validation(_)));
        }
        other => panic!("expected ComponentConfiguration, got {other:?}"),
    }
}

#[test]
fn component_without_schema_receives_nothing() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "observer:\n  anything: true\n");

    let mut registry = SchemaRegistry::new();
    registry.register(ComponentSpec::opt_out("observer"));

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()]);
    let (_, configured) =
        assemble_and_inject(&options, &registry, vec![TestComponent::new("observer")]).unwrap();
    assert_eq!(configured[0].config, None);
}

#[test]
fn unvalidated_component_receives_raw_sub_document() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "raw:\n  free: form\n");

    let mut registry = SchemaRegistry::new();
    registry.register(ComponentSpec::unvalidated("raw", "raw"));

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()]);
    let (_, configured) =
        assemble_and_inject(&options, &registry, vec![TestComponent::new("raw")]).unwrap();
    assert_eq!(configured[0].config, Some(json!({"free": "form"})));
}

#[test]
fn load_argument_reads_and_merges_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.yaml", "v: base\nkeep: kept\n");
    write(temp.path(), "over.yaml", "v: loaded\n");

    let options = AssemblyOptions::new()
        .with_profile("app")
        .with_roots([temp.path()])
        .with_args([
            "--load".to_string(),
            temp.path().join("over.yaml").display().to_string(),
        ]);
    let document = assemble(&options).unwrap();
    assert_eq!(document["v"], json!("loaded"));
    assert_eq!(document["keep"], json!("kept"));
}

#[test]
fn malformed_argument_is_fatal_and_names_token() {
    let options = AssemblyOptions::new().with_args(["definitely-not-valid"]);
    let err = assemble(&options).unwrap_err();
    assert!(err.to_string().contains("definitely-not-valid"));
}

#[test]
fn unknown_extension_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app.properties", "x=1\n");

    let options = AssemblyOptions::new()
        .with_roots([temp.path()])
        .with_additional_file(temp.path().join("app.properties"));
    let err = assemble(&options).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownExtension { .. }));
}
