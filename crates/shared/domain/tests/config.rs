use opshub_domain::catalogue::GateMode;
use opshub_domain::config::{HostConfig, LoggingSettings, OrchestratorSettings};
use opshub_domain::session::Role;
use serde_json::json;
use std::time::Duration;

#[test]
fn config_defaults_are_sane() {
    let orchestrator = OrchestratorSettings::default();
    assert!(!orchestrator.concurrent_setup);
    assert_eq!(orchestrator.setup_timeout(), None);

    let logging = LoggingSettings::default();
    assert_eq!(logging.level, "info");
    assert!(logging.directory.is_none());

    let host = HostConfig::default();
    assert!(host.catalogue.is_none());
    assert!(host.modules.is_empty());
}

#[test]
fn host_config_deserializes_from_json() {
    let raw = json!({
        "orchestrator": { "concurrent_setup": true, "setup_timeout_ms": 250 },
        "modules": [
            { "id": "scheduling", "depends_on": ["settings"], "required_features": ["appointments"], "minimum_role": "staff" }
        ],
        "selection": { "capabilities": ["professional_services"] }
    });

    let cfg: HostConfig = serde_json::from_value(raw).expect("config deserialize");
    assert!(cfg.orchestrator.concurrent_setup);
    assert_eq!(cfg.orchestrator.setup_timeout(), Some(Duration::from_millis(250)));
    assert_eq!(cfg.modules[0].id.as_str(), "scheduling");
    assert_eq!(cfg.modules[0].minimum_role, Role::Staff);
    assert_eq!(cfg.selection.capabilities[0].as_str(), "professional_services");
}

#[test]
fn catalogue_deserializes_from_toml() {
    let raw = r#"
        [catalogue]
        [[catalogue.capabilities]]
        id = "physical_products"
        features = ["inventory"]

        [[catalogue.optional_features]]
        feature = "point_of_sale"
        requires = ["physical_products", "cash_handling"]

        [[catalogue.optional_features]]
        feature = "invoicing"
        requires = ["professional_services", "subscriptions"]
        mode = "any"

        [[catalogue.infrastructure]]
        id = "offline_mode"
        withholds = ["online_booking"]
    "#;

    let cfg: HostConfig = toml::from_str(raw).expect("toml deserialize");
    let catalogue = cfg.catalogue.as_ref().expect("catalogue present");
    assert_eq!(catalogue.capabilities.len(), 1);
    assert_eq!(catalogue.optional_features[0].mode, GateMode::All);
    assert_eq!(catalogue.optional_features[1].mode, GateMode::Any);
    assert_eq!(catalogue.infrastructure[0].withholds[0].as_str(), "online_booking");
}

#[test]
fn unknown_descriptor_fields_are_rejected() {
    let raw = json!({ "modules": [ { "id": "settings", "dependsOn": [] } ] });
    assert!(serde_json::from_value::<HostConfig>(raw).is_err());
}
