use crate::ids::{Feature, ModuleId};
use crate::session::Role;
use serde::{Deserialize, Serialize};

/// The static, data-only half of a module manifest.
///
/// Descriptors can be declared in configuration; the lifecycle callbacks are
/// bound in code by the orchestrator crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    /// Modules that must be active before this one may activate.
    #[serde(default)]
    pub depends_on: Vec<ModuleId>,
    /// All of these must be resolved for the module to activate.
    #[serde(default)]
    pub required_features: Vec<Feature>,
    /// Enable extra behavior when resolved; never block activation.
    #[serde(default)]
    pub optional_features: Vec<Feature>,
    #[serde(default)]
    pub minimum_role: Role,
    /// Extension points and events this module offers to others.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Extension points and events this module contributes to or listens on.
    #[serde(default)]
    pub consumes: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            required_features: Vec::new(),
            optional_features: Vec::new(),
            minimum_role: Role::default(),
            provides: Vec::new(),
            consumes: Vec::new(),
        }
    }

    #[must_use]
    pub fn depends_on<I, M>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModuleId>,
    {
        self.depends_on.extend(modules.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn requires<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        self.required_features.extend(features.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn optional<I, F>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Feature>,
    {
        self.optional_features.extend(features.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn minimum_role(mut self, role: Role) -> Self {
        self.minimum_role = role;
        self
    }

    #[must_use]
    pub fn provides<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn consumes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes.extend(names.into_iter().map(Into::into));
        self
    }
}
