//! Business scenarios run through the real capability catalogue.

use opshub_domain::catalogue::CapabilityCatalogue;
use opshub_domain::constants::{APPOINTMENTS, PHYSICAL_PRODUCTS, PROFESSIONAL_SERVICES};
use opshub_domain::manifest::ModuleDescriptor;
use opshub_domain::state::ActivationState;
use opshub_kernel::capabilities::CapabilityResolver;
use opshub_orchestrator::*;
use serde_json::{Value, json};

const NO_INFRA: [&str; 0] = [];

fn orchestrator() -> Orchestrator {
    let orchestrator = Orchestrator::default();
    orchestrator.register(ModuleManifest::passive(ModuleDescriptor::new("settings"))).unwrap();
    orchestrator
        .register(ModuleManifest::from_fn(
            ModuleDescriptor::new("scheduling").depends_on(["settings"]).requires([APPOINTMENTS]),
            |ctx| async move {
                ctx.add_action("dashboard.widgets", |_: &Value| Ok(json!("upcoming-appointments")))?;
                Ok(())
            },
        ))
        .unwrap();
    orchestrator
}

#[tokio::test]
async fn retail_only_keeps_scheduling_inactive() {
    let resolver = CapabilityResolver::new(&CapabilityCatalogue::business_defaults());
    let orchestrator = orchestrator();

    let features = resolver.resolve([PHYSICAL_PRODUCTS], NO_INFRA);
    orchestrator.activate(&features).await.unwrap();

    assert!(!features.contains(APPOINTMENTS));
    assert_eq!(orchestrator.module_state("scheduling"), Some(ActivationState::Inactive));
    assert_eq!(orchestrator.module_state("settings"), Some(ActivationState::Active));
}

#[tokio::test]
async fn adding_services_activates_scheduling() {
    let resolver = CapabilityResolver::new(&CapabilityCatalogue::business_defaults());
    let orchestrator = orchestrator();

    let features = resolver.resolve([PHYSICAL_PRODUCTS, PROFESSIONAL_SERVICES], NO_INFRA);
    let report = orchestrator.activate(&features).await.unwrap();

    assert!(features.contains(APPOINTMENTS));
    assert_eq!(orchestrator.module_state("scheduling"), Some(ActivationState::Active));
    assert_eq!(report.activated.len(), 2);
    assert_eq!(
        orchestrator.extensions().invoke_values("dashboard.widgets", &Value::Null),
        [json!("upcoming-appointments")]
    );
}

#[tokio::test]
async fn failing_module_does_not_block_independent_ones() {
    let orchestrator = Orchestrator::default();
    orchestrator
        .register(ModuleManifest::from_fn(ModuleDescriptor::new("cash-management"), |_| async {
            anyhow::bail!("cash drawer driver missing")
        }))
        .unwrap();
    orchestrator.register(ModuleManifest::passive(ModuleDescriptor::new("settings"))).unwrap();

    let report = orchestrator.activate(&Default::default()).await.unwrap();

    assert_eq!(orchestrator.module_state("cash-management"), Some(ActivationState::Error));
    assert_eq!(orchestrator.module_state("settings"), Some(ActivationState::Active));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].module().as_str(), "cash-management");
}
