use crate::context::ModuleContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use opshub_domain::ids::ModuleId;
use opshub_domain::manifest::ModuleDescriptor;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Setup and teardown callbacks of a module.
///
/// Both run in their own task; a panic is contained and reported like an error.
#[async_trait]
pub trait Lifecycle: Send + Sync + 'static {
    /// Registers the module's actions and subscriptions through `ctx`.
    async fn setup(&self, ctx: ModuleContext) -> anyhow::Result<()>;

    /// Runs after the module's lease is revoked and before its registrations
    /// are removed. Not called for a module whose setup failed.
    async fn teardown(&self, _ctx: ModuleContext) -> anyhow::Result<()> {
        Ok(())
    }
}

type Callback = Arc<dyn Fn(ModuleContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Closure-backed [`Lifecycle`].
#[derive(Clone)]
pub struct LifecycleFn {
    setup: Callback,
    teardown: Option<Callback>,
}

impl LifecycleFn {
    pub fn new<F, Fut>(setup: F) -> Self
    where
        F: Fn(ModuleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self { setup: callback(setup), teardown: None }
    }

    #[must_use]
    pub fn on_teardown<F, Fut>(mut self, teardown: F) -> Self
    where
        F: Fn(ModuleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.teardown = Some(callback(teardown));
        self
    }
}

fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(ModuleContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

impl fmt::Debug for LifecycleFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleFn").field("teardown", &self.teardown.is_some()).finish()
    }
}

#[async_trait]
impl Lifecycle for LifecycleFn {
    async fn setup(&self, ctx: ModuleContext) -> anyhow::Result<()> {
        (self.setup)(ctx).await
    }

    async fn teardown(&self, ctx: ModuleContext) -> anyhow::Result<()> {
        match &self.teardown {
            Some(teardown) => teardown(ctx).await,
            None => Ok(()),
        }
    }
}

/// Lifecycle of modules that only exist to gate others, e.g. descriptors
/// declared in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passive;

#[async_trait]
impl Lifecycle for Passive {
    async fn setup(&self, _ctx: ModuleContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A module's descriptor bound to its lifecycle.
#[derive(Clone)]
pub struct ModuleManifest {
    pub(crate) descriptor: Arc<ModuleDescriptor>,
    pub(crate) lifecycle: Arc<dyn Lifecycle>,
}

impl ModuleManifest {
    pub fn new(descriptor: ModuleDescriptor, lifecycle: impl Lifecycle) -> Self {
        Self { descriptor: Arc::new(descriptor), lifecycle: Arc::new(lifecycle) }
    }

    /// Shorthand for a [`LifecycleFn`] without teardown.
    pub fn from_fn<F, Fut>(descriptor: ModuleDescriptor, setup: F) -> Self
    where
        F: Fn(ModuleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(descriptor, LifecycleFn::new(setup))
    }

    #[must_use]
    pub fn passive(descriptor: ModuleDescriptor) -> Self {
        Self::new(descriptor, Passive)
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.descriptor.id
    }

    #[must_use]
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for ModuleManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleManifest").field("descriptor", &self.descriptor).finish_non_exhaustive()
    }
}
