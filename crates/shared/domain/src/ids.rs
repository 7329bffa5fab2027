//! Opaque string identifiers.
//!
//! Identifiers are cheap to clone (`Arc<str>`), compare and hash like the
//! underlying string, and borrow as `&str` so sets keyed by them can be queried
//! with plain string slices.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(Arc::from(id))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(Arc::from(id))
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }
    };
}

opaque_id! {
    /// A business-level selection such as "sells physical goods".
    Capability
}

opaque_id! {
    /// A fine-grained functionality gate derived from capabilities.
    Feature
}

opaque_id! {
    /// A selection on the infrastructure axis (e.g. "payment terminal attached").
    InfraSelector
}

opaque_id! {
    /// Unique identifier of a module manifest.
    ModuleId
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_borrow_as_str() {
        let set: BTreeSet<Feature> = ["inventory", "appointments"].into_iter().map(Feature::from).collect();
        assert!(set.contains("appointments"));
        assert!(!set.contains("payroll"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ModuleId::new("cash-management");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cash-management\"");

        let back: ModuleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
