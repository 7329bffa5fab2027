use opshub_domain::config::HostConfig;
use opshub_domain::session::Role;
use opshub_kernel::config::{ConfigError, load_config};
use serial_test::serial;
use std::io::Write;

const HOST_TOML: &str = r#"
[orchestrator]
concurrent_setup = true
setup_timeout_ms = 250

[logging]
level = "debug"

[selection]
capabilities = ["professional_services"]

[[modules]]
id = "scheduling"
depends_on = ["settings"]
required_features = ["appointments"]
minimum_role = "staff"
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn loads_host_config_from_toml() {
    let file = write_config(HOST_TOML);
    let config: HostConfig = load_config(Some(file.path())).unwrap();

    assert!(config.orchestrator.concurrent_setup);
    assert_eq!(config.orchestrator.setup_timeout().map(|d| d.as_millis()), Some(250));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.selection.capabilities[0].as_str(), "professional_services");
    assert_eq!(config.modules[0].id.as_str(), "scheduling");
    assert_eq!(config.modules[0].minimum_role, Role::Staff);
    assert!(config.catalogue.is_none());
}

#[test]
#[serial]
fn without_a_path_the_default_file_is_optional() {
    let config: HostConfig = load_config(None::<&str>).unwrap();

    assert_eq!(config.logging.level, "info");
    assert!(config.modules.is_empty());
}

#[test]
#[serial]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result: Result<HostConfig, _> = load_config(Some(dir.path().join("absent.toml")));

    assert!(matches!(result, Err(ConfigError::Config { context: Some(_), .. })));
}
