//! Capability resolver.
//!
//! Compiles a [`CapabilityCatalogue`] into lookup tables once and answers
//! `resolve(capabilities, infrastructure)` as a pure function of its inputs:
//! the same selection always yields the same [`ResolvedFeatures`], regardless
//! of input order or duplicates.
//!
//! Resolution order:
//! 1. features granted by every selected capability;
//! 2. optional features whose co-requisites ([`GateMode::All`] or
//!    [`GateMode::Any`]) and required infrastructure are selected;
//! 3. optional features withheld by a selected infrastructure entry are removed
//!    (features from step 1 are never withheld);
//! 4. features added by selected infrastructure entries.
//!
//! Unknown capability or infrastructure ids contribute nothing. A capability
//! named only as a rule co-requisite is known and grants nothing on its own.

use fxhash::{FxHashMap, FxHashSet};
use opshub_domain::catalogue::{CapabilityCatalogue, GateMode, OptionalFeatureRule};
use opshub_domain::features::ResolvedFeatures;
use opshub_domain::ids::{Capability, Feature, InfraSelector};
use std::collections::BTreeSet;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
struct InfraEffect {
    adds: Vec<Feature>,
    withholds: Vec<Feature>,
}

#[derive(Debug, Clone)]
pub struct CapabilityResolver {
    grants: FxHashMap<Capability, Vec<Feature>>,
    rules: Vec<OptionalFeatureRule>,
    /// Rule indices keyed by every capability they mention.
    gated_by: FxHashMap<Capability, Vec<usize>>,
    /// Rules with no capability co-requisite.
    ungated: Vec<usize>,
    infrastructure: FxHashMap<InfraSelector, InfraEffect>,
}

impl CapabilityResolver {
    #[must_use]
    pub fn new(catalogue: &CapabilityCatalogue) -> Self {
        let mut grants: FxHashMap<Capability, Vec<Feature>> = FxHashMap::default();
        for definition in &catalogue.capabilities {
            grants.entry(definition.id.clone()).or_default().extend(definition.features.iter().cloned());
        }

        let rules = catalogue.optional_features.clone();
        let mut gated_by: FxHashMap<Capability, Vec<usize>> = FxHashMap::default();
        let mut ungated = Vec::new();
        for (index, rule) in rules.iter().enumerate() {
            if rule.requires.is_empty() {
                ungated.push(index);
            }
            for capability in &rule.requires {
                grants.entry(capability.clone()).or_default();
                let indices = gated_by.entry(capability.clone()).or_default();
                if indices.last() != Some(&index) {
                    indices.push(index);
                }
            }
        }

        let mut infrastructure: FxHashMap<InfraSelector, InfraEffect> = FxHashMap::default();
        for rule in &catalogue.infrastructure {
            let effect = infrastructure.entry(rule.id.clone()).or_default();
            effect.adds.extend(rule.adds.iter().cloned());
            effect.withholds.extend(rule.withholds.iter().cloned());
        }

        debug!(
            capabilities = grants.len(),
            optional_features = rules.len(),
            infrastructure = catalogue.infrastructure.len(),
            "Capability resolver compiled"
        );

        Self { grants, rules, gated_by, ungated, infrastructure }
    }

    /// Computes the resolved feature set of a selection.
    pub fn resolve<C, I>(&self, capabilities: C, infrastructure: I) -> ResolvedFeatures
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut selected: FxHashSet<&Capability> = FxHashSet::default();
        for id in capabilities {
            match self.grants.get_key_value(id.as_ref()) {
                Some((capability, _)) => {
                    selected.insert(capability);
                },
                None => trace!(capability = id.as_ref(), "Ignoring unknown capability"),
            }
        }

        let mut environment: FxHashSet<&InfraSelector> = FxHashSet::default();
        for id in infrastructure {
            match self.infrastructure.get_key_value(id.as_ref()) {
                Some((selector, _)) => {
                    environment.insert(selector);
                },
                None => trace!(infrastructure = id.as_ref(), "Ignoring unknown infrastructure"),
            }
        }

        let required: BTreeSet<Feature> =
            selected.iter().filter_map(|c| self.grants.get(*c)).flatten().cloned().collect();

        let candidates: BTreeSet<usize> = selected
            .iter()
            .filter_map(|c| self.gated_by.get(*c))
            .flatten()
            .chain(&self.ungated)
            .copied()
            .collect();

        let mut optional: BTreeSet<Feature> = candidates
            .into_iter()
            .map(|index| &self.rules[index])
            .filter(|rule| gate_open(rule, &selected, &environment))
            .map(|rule| rule.feature.clone())
            .collect();

        let effects: Vec<_> =
            environment.iter().filter_map(|selector| self.infrastructure.get(*selector)).collect();

        for effect in &effects {
            for feature in &effect.withholds {
                optional.remove(feature);
            }
        }

        let mut features = required;
        features.append(&mut optional);
        for effect in &effects {
            features.extend(effect.adds.iter().cloned());
        }

        let resolved = ResolvedFeatures::from(features);
        trace!(
            capabilities = selected.len(),
            infrastructure = environment.len(),
            features = %resolved,
            "Features resolved"
        );
        resolved
    }

    /// Capability ids known to the catalogue, sorted.
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut ids: Vec<Capability> = self.grants.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Infrastructure selectors known to the catalogue, sorted.
    #[must_use]
    pub fn infrastructure(&self) -> Vec<InfraSelector> {
        let mut ids: Vec<InfraSelector> = self.infrastructure.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

/// Membership test on a resolved set.
#[must_use]
pub fn is_feature_active(resolved: &ResolvedFeatures, feature: &str) -> bool {
    resolved.contains(feature)
}

fn gate_open(
    rule: &OptionalFeatureRule,
    selected: &FxHashSet<&Capability>,
    environment: &FxHashSet<&InfraSelector>,
) -> bool {
    let capabilities = match rule.mode {
        GateMode::All => rule.requires.iter().all(|c| selected.contains(c)),
        GateMode::Any => rule.requires.is_empty() || rule.requires.iter().any(|c| selected.contains(c)),
    };
    capabilities && rule.infrastructure.iter().all(|s| environment.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opshub_domain::catalogue::{CapabilityDefinition, InfrastructureRule};

    fn catalogue() -> CapabilityCatalogue {
        CapabilityCatalogue {
            capabilities: vec![
                CapabilityDefinition::new("a", ["fa", "shared"]),
                CapabilityDefinition::new("b", ["fb", "shared"]),
            ],
            optional_features: vec![
                OptionalFeatureRule::new("both", GateMode::All, ["a", "b"]),
                OptionalFeatureRule::new("either", GateMode::Any, ["a", "b"]),
                OptionalFeatureRule::new("always", GateMode::All, Vec::<&str>::new()),
                OptionalFeatureRule::new("wired", GateMode::Any, ["a"]).with_infrastructure(["net"]),
            ],
            infrastructure: vec![
                InfrastructureRule::new("net"),
                InfrastructureRule::new("offline").withholds(["either", "fa"]),
                InfrastructureRule::new("terminal").adds(["card"]),
            ],
        }
    }

    fn names(features: &ResolvedFeatures) -> Vec<&str> {
        features.iter().map(Feature::as_str).collect()
    }

    #[test]
    fn gate_modes() {
        let resolver = CapabilityResolver::new(&catalogue());

        assert_eq!(names(&resolver.resolve(["a"], [""; 0])), ["always", "either", "fa", "shared"]);
        assert_eq!(
            names(&resolver.resolve(["a", "b"], [""; 0])),
            ["always", "both", "either", "fa", "fb", "shared"]
        );
    }

    #[test]
    fn infrastructure_requirement_and_additions() {
        let resolver = CapabilityResolver::new(&catalogue());

        assert!(resolver.resolve(["a"], ["net"]).contains("wired"));
        assert!(!resolver.resolve(["b"], ["net"]).contains("wired"));
        assert!(resolver.resolve([""; 0], ["terminal"]).contains("card"));
    }

    #[test]
    fn withholding_never_touches_required_features() {
        let resolver = CapabilityResolver::new(&catalogue());
        let resolved = resolver.resolve(["a"], ["offline"]);

        assert!(resolved.contains("fa"));
        assert!(!resolved.contains("either"));
    }

    #[test]
    fn unknown_ids_contribute_nothing() {
        let resolver = CapabilityResolver::new(&catalogue());

        assert_eq!(resolver.resolve(["zzz"], ["nope"]), resolver.resolve([""; 0], [""; 0]));
        assert_eq!(names(&resolver.resolve(["zzz"], [""; 0])), ["always"]);
    }

    #[test]
    fn rule_only_capability_gates_its_rule() {
        let mut catalogue = catalogue();
        let loyalty = OptionalFeatureRule::new("loyalty", GateMode::All, ["a", "members"]);
        catalogue.optional_features.push(loyalty);
        let resolver = CapabilityResolver::new(&catalogue);

        assert!(resolver.capabilities().iter().any(|c| c.as_str() == "members"));
        assert!(!resolver.resolve(["a"], [""; 0]).contains("loyalty"));
        assert_eq!(
            names(&resolver.resolve(["a", "members"], [""; 0])),
            ["always", "either", "fa", "loyalty", "shared"]
        );
    }

    #[test]
    fn membership_helper() {
        let resolved = CapabilityResolver::new(&catalogue()).resolve(["b"], [""; 0]);

        assert!(is_feature_active(&resolved, "fb"));
        assert!(!is_feature_active(&resolved, "fa"));
    }

    #[test]
    fn empty_catalogue_resolves_to_empty_set() {
        let resolver = CapabilityResolver::new(&CapabilityCatalogue::default());
        assert!(resolver.resolve(["a"], ["net"]).is_empty());
    }
}
