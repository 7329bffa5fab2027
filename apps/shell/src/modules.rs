//! Demo modules wired into the shell.
//!
//! `settings` and `dashboard` are always on; the rest follow the resolved
//! features of the selection.

use opshub::domain::manifest::ModuleDescriptor;
use opshub::domain::session::Role;
use opshub::events::EventEnvelope;
use opshub::orchestrator::{Lifecycle, ModuleContext, ModuleManifest, async_trait};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

pub(crate) const WIDGETS: &str = "dashboard.widgets";
pub(crate) const SETTINGS_SECTIONS: &str = "settings.sections";
pub(crate) const SALE_COMPLETED: &str = "sales.completed";

pub(crate) fn all() -> Vec<ModuleManifest> {
    vec![settings(), dashboard(), inventory(), scheduling(), cash_management(), point_of_sale()]
}

fn settings() -> ModuleManifest {
    ModuleManifest::from_fn(
        ModuleDescriptor::new("settings").provides([SETTINGS_SECTIONS]),
        |ctx| async move {
            ctx.add_action_with_priority(SETTINGS_SECTIONS, 100, |_: &Value| Ok(json!("general")))?;
            Ok(())
        },
    )
}

fn dashboard() -> ModuleManifest {
    ModuleManifest::from_fn(
        ModuleDescriptor::new("dashboard")
            .depends_on(["settings"])
            .provides([WIDGETS])
            .consumes([SETTINGS_SECTIONS]),
        |ctx| async move {
            ctx.add_action(SETTINGS_SECTIONS, |_: &Value| Ok(json!("dashboard")))?;
            ctx.add_action_with_priority(WIDGETS, 100, |_: &Value| Ok(json!("Welcome")))?;
            Ok(())
        },
    )
}

/// Tracks stock and decrements it on every completed sale.
#[derive(Debug, Default)]
struct Inventory {
    stock: Arc<AtomicI64>,
}

#[async_trait]
impl Lifecycle for Inventory {
    async fn setup(&self, ctx: ModuleContext) -> anyhow::Result<()> {
        self.stock.store(25, Ordering::Relaxed);

        let stock = Arc::clone(&self.stock);
        ctx.add_action(WIDGETS, move |_: &Value| {
            Ok(json!(format!("Stock: {} items", stock.load(Ordering::Relaxed))))
        })?;

        let stock = Arc::clone(&self.stock);
        ctx.subscribe(SALE_COMPLETED, move |event: EventEnvelope| {
            let stock = Arc::clone(&stock);
            async move {
                let quantity = event.payload["quantity"].as_i64().unwrap_or(1);
                let left = stock.fetch_sub(quantity, Ordering::Relaxed) - quantity;
                info!(quantity, left, source = %event.source, "Stock updated");
                Ok(())
            }
        })?;
        Ok(())
    }

    async fn teardown(&self, ctx: ModuleContext) -> anyhow::Result<()> {
        info!(module = %ctx.module_id(), stock = self.stock.load(Ordering::Relaxed), "Stock snapshot");
        Ok(())
    }
}

fn inventory() -> ModuleManifest {
    ModuleManifest::new(
        ModuleDescriptor::new("inventory")
            .depends_on(["dashboard"])
            .requires(["inventory"])
            .consumes([WIDGETS, SALE_COMPLETED]),
        Inventory::default(),
    )
}

fn scheduling() -> ModuleManifest {
    ModuleManifest::from_fn(
        ModuleDescriptor::new("scheduling")
            .depends_on(["dashboard"])
            .requires(["appointments"])
            .optional(["time_tracking"])
            .minimum_role(Role::Staff)
            .consumes([WIDGETS]),
        |ctx| async move {
            let tracked = ctx.has_optional_feature("time_tracking");
            ctx.add_guarded_action(
                WIDGETS,
                0,
                |session| session.has_role(Role::Staff),
                move |_: &Value| {
                    let label = if tracked { "Appointments (timed)" } else { "Appointments" };
                    Ok(json!(label))
                },
            )?;
            Ok(())
        },
    )
}

fn cash_management() -> ModuleManifest {
    ModuleManifest::from_fn(
        ModuleDescriptor::new("cash-management")
            .depends_on(["settings"])
            .requires(["cash_drawer"])
            .minimum_role(Role::Manager)
            .consumes([WIDGETS, SETTINGS_SECTIONS]),
        |ctx| async move {
            ctx.add_action(SETTINGS_SECTIONS, |_: &Value| Ok(json!("cash drawer")))?;
            ctx.add_guarded_action(
                WIDGETS,
                -10,
                |session| session.has_role(Role::Manager),
                |_: &Value| Ok(json!("Cash drawer")),
            )?;
            Ok(())
        },
    )
}

fn point_of_sale() -> ModuleManifest {
    ModuleManifest::from_fn(
        ModuleDescriptor::new("point-of-sale")
            .depends_on(["inventory", "cash-management"])
            .requires(["point_of_sale"])
            .optional(["card_present"])
            .provides([SALE_COMPLETED])
            .consumes([WIDGETS]),
        |ctx| async move {
            let cards = ctx.has_optional_feature("card_present");
            ctx.add_action_with_priority(WIDGETS, 50, move |_: &Value| {
                Ok(json!(if cards { "Register (cash, card)" } else { "Register (cash)" }))
            })?;
            ctx.emit(SALE_COMPLETED, json!({ "quantity": 2 }));
            Ok(())
        },
    )
}
