//! Static capability catalogue, as declared in configuration.
//!
//! The resolver in `opshub-kernel` compiles this into lookup tables once; the
//! types here only describe the data.

use crate::constants::{
    APPOINTMENTS, CARD_PAYMENTS, CARD_PRESENT, CASH_DRAWER, CASH_HANDLING, EMPLOYEES, INVENTORY,
    INVOICING, OFFLINE_MODE, ONLINE_BOOKING, ONLINE_STORE, PAYMENT_GATEWAY, PAYMENT_TERMINAL,
    PHYSICAL_PRODUCTS, POINT_OF_SALE, PRODUCT_CATALOG, PROFESSIONAL_SERVICES, RECURRING_BILLING,
    SERVICE_CATALOG, SHIFT_PLANNING, SHIPPING, STAFF_MANAGEMENT, STOREFRONT, SUBSCRIPTIONS,
    TIME_TRACKING,
};
use crate::ids::{Capability, Feature, InfraSelector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapabilityCatalogue {
    pub capabilities: Vec<CapabilityDefinition>,
    pub optional_features: Vec<OptionalFeatureRule>,
    pub infrastructure: Vec<InfrastructureRule>,
}

/// A capability and the features it always grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityDefinition {
    pub id: Capability,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// How the co-requisite capabilities of an optional feature combine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Every listed capability must be selected.
    #[default]
    All,
    /// At least one listed capability must be selected.
    Any,
}

/// A feature granted only when its co-requisites are met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionalFeatureRule {
    pub feature: Feature,
    #[serde(default)]
    pub requires: Vec<Capability>,
    #[serde(default)]
    pub mode: GateMode,
    /// Infrastructure selections that must all be present as well.
    #[serde(default)]
    pub infrastructure: Vec<InfraSelector>,
}

/// Effect of one infrastructure selection on the resolved set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfrastructureRule {
    pub id: InfraSelector,
    /// Features granted outright.
    #[serde(default)]
    pub adds: Vec<Feature>,
    /// Optional features suppressed; required capability features are never withheld.
    #[serde(default)]
    pub withholds: Vec<Feature>,
}

impl CapabilityCatalogue {
    /// The built-in catalogue for small and medium businesses.
    #[must_use]
    pub fn business_defaults() -> Self {
        Self {
            capabilities: vec![
                CapabilityDefinition::new(PHYSICAL_PRODUCTS, [INVENTORY, PRODUCT_CATALOG, SHIPPING]),
                CapabilityDefinition::new(
                    PROFESSIONAL_SERVICES,
                    [APPOINTMENTS, SERVICE_CATALOG, TIME_TRACKING],
                ),
                CapabilityDefinition::new(SUBSCRIPTIONS, [RECURRING_BILLING, PRODUCT_CATALOG]),
                CapabilityDefinition::new(CASH_HANDLING, [CASH_DRAWER]),
                CapabilityDefinition::new(ONLINE_STORE, [STOREFRONT, PRODUCT_CATALOG]),
                CapabilityDefinition::new(EMPLOYEES, [STAFF_MANAGEMENT]),
            ],
            optional_features: vec![
                OptionalFeatureRule::new(POINT_OF_SALE, GateMode::All, [PHYSICAL_PRODUCTS, CASH_HANDLING]),
                OptionalFeatureRule::new(
                    ONLINE_BOOKING,
                    GateMode::All,
                    [PROFESSIONAL_SERVICES, ONLINE_STORE],
                ),
                OptionalFeatureRule::new(INVOICING, GateMode::Any, [PROFESSIONAL_SERVICES, SUBSCRIPTIONS]),
                OptionalFeatureRule::new(SHIFT_PLANNING, GateMode::All, [EMPLOYEES, PROFESSIONAL_SERVICES]),
                OptionalFeatureRule::new(CARD_PAYMENTS, GateMode::Any, [ONLINE_STORE, PHYSICAL_PRODUCTS])
                    .with_infrastructure([PAYMENT_GATEWAY]),
            ],
            infrastructure: vec![
                InfrastructureRule::new(PAYMENT_TERMINAL).adds([CARD_PRESENT]),
                InfrastructureRule::new(PAYMENT_GATEWAY),
                InfrastructureRule::new(OFFLINE_MODE).withholds([ONLINE_BOOKING, CARD_PAYMENTS]),
            ],
        }
    }

    /// Every feature id the catalogue can ever grant, sorted and deduplicated.
    #[must_use]
    pub fn known_features(&self) -> Vec<Feature> {
        let mut features: Vec<Feature> = self
            .capabilities
            .iter()
            .flat_map(|c| c.features.iter())
            .chain(self.optional_features.iter().map(|r| &r.feature))
            .chain(self.infrastructure.iter().flat_map(|r| r.adds.iter()))
            .cloned()
            .collect();
        features.sort_unstable();
        features.dedup();
        features
    }
}

impl CapabilityDefinition {
    pub fn new<I, F>(id: impl Into<Capability>, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        Self { id: id.into(), features: features.into_iter().map(Into::into).collect() }
    }
}

impl OptionalFeatureRule {
    pub fn new<I, C>(feature: impl Into<Feature>, mode: GateMode, requires: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Capability>,
    {
        Self {
            feature: feature.into(),
            requires: requires.into_iter().map(Into::into).collect(),
            mode,
            infrastructure: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_infrastructure<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InfraSelector>,
    {
        self.infrastructure.extend(selectors.into_iter().map(Into::into));
        self
    }
}

impl InfrastructureRule {
    pub fn new(id: impl Into<InfraSelector>) -> Self {
        Self { id: id.into(), adds: Vec::new(), withholds: Vec::new() }
    }

    #[must_use]
    pub fn adds<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        self.adds.extend(features.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn withholds<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        self.withholds.extend(features.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_defaults_gate_appointments_on_services() {
        let catalogue = CapabilityCatalogue::business_defaults();
        let grants = |id: &str| {
            catalogue.capabilities.iter().find(|c| c.id.as_str() == id).map(|c| c.features.clone())
        };

        assert!(grants(PROFESSIONAL_SERVICES).unwrap().iter().any(|f| f.as_str() == APPOINTMENTS));
        assert!(!grants(PHYSICAL_PRODUCTS).unwrap().iter().any(|f| f.as_str() == APPOINTMENTS));
    }

    #[test]
    fn known_features_are_unique() {
        let features = CapabilityCatalogue::business_defaults().known_features();
        let product_catalog = features.iter().filter(|f| f.as_str() == PRODUCT_CATALOG).count();

        assert_eq!(product_catalog, 1);
        assert!(features.iter().any(|f| f.as_str() == CARD_PRESENT));
    }
}
