use crate::ids::Feature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The immutable output of one capability resolution.
///
/// Cloning is a reference-count bump; equality is set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedFeatures {
    features: Arc<BTreeSet<Feature>>,
}

impl ResolvedFeatures {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// `true` when every feature of `required` is present.
    pub fn contains_all<I>(&self, required: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        required.into_iter().all(|feature| self.features.contains(feature.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl From<BTreeSet<Feature>> for ResolvedFeatures {
    fn from(features: BTreeSet<Feature>) -> Self {
        Self { features: Arc::new(features) }
    }
}

impl FromIterator<Feature> for ResolvedFeatures {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<BTreeSet<_>>())
    }
}

impl<'a> IntoIterator for &'a ResolvedFeatures {
    type Item = &'a Feature;
    type IntoIter = std::collections::btree_set::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

impl fmt::Display for ResolvedFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, feature) in self.features.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(feature.as_str())?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_insertion_order() {
        let a: ResolvedFeatures = ["b", "a", "c"].into_iter().map(Feature::from).collect();
        let b: ResolvedFeatures = ["c", "b", "a"].into_iter().map(Feature::from).collect();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{a, b, c}");
    }

    #[test]
    fn contains_all_checks_every_feature() {
        let set: ResolvedFeatures = ["inventory", "catalog"].into_iter().map(Feature::from).collect();
        assert!(set.contains_all(&[Feature::from("inventory")]));
        assert!(!set.contains_all(&[Feature::from("inventory"), Feature::from("appointments")]));
        assert!(set.contains_all(Vec::<Feature>::new()));
    }
}
