mod modules;

use clap::Parser;
use opshub::Host;
use opshub::domain::config::HostConfig;
use opshub::domain::ids::ModuleId;
use opshub::domain::session::{Role, Session};
use opshub::kernel::config::load_config;
use opshub::orchestrator::ActivationReport;
use opshub_logger::Logger;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

/// Resolve a business selection and activate the matching modules.
#[derive(Debug, Parser)]
#[command(name = "opshub", version, about)]
struct Args {
    /// Host configuration file; `opshub.*` in the working directory is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Selected capability, repeatable or comma-separated.
    #[arg(short, long = "capability", value_delimiter = ',')]
    capabilities: Vec<String>,

    /// Selected infrastructure entry, repeatable or comma-separated.
    #[arg(short, long = "infra", value_delimiter = ',')]
    infrastructure: Vec<String>,

    /// Role of the session used for permission checks.
    #[arg(short, long, default_value = "staff")]
    role: Role,

    /// Overrides `logging.level`.
    #[arg(long)]
    log_level: Option<String>,

    /// Writes JSON log files; needs `logging.directory`.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config: HostConfig = load_config(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config.logging.json |= args.json;
    let _logger = Logger::from_settings(env!("CARGO_PKG_NAME"), &config.logging)?;

    let host = Host::builder()
        .config(config)
        .modules(modules::all())
        .session(Session::with_role(args.role).subject("shell"))
        .build()?;

    let report = if args.capabilities.is_empty() && args.infrastructure.is_empty() {
        host.apply_configured().await?
    } else {
        host.apply(&args.capabilities, &args.infrastructure).await?
    };

    // Let event deliveries triggered during setup finish.
    tokio::time::sleep(Duration::from_millis(50)).await;

    print_report(&host, &report, args.role);

    host.shutdown().await;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(host: &Host, report: &ActivationReport, role: Role) {
    println!("features: {}", report.features);
    println!("pass:     {report}");
    for failure in &report.failed {
        println!("  failed: {failure}");
    }

    println!();
    println!("{:<18} {:<12} {:<9} {}", "MODULE", "STATE", "ROLE", "DEPENDS ON");
    for module in host.orchestrator().list_modules() {
        let depends_on: Vec<&str> = module.depends_on.iter().map(ModuleId::as_str).collect();
        println!(
            "{:<18} {:<12} {:<9} {}",
            module.id.as_str(),
            module.state.as_str(),
            module.minimum_role.as_str(),
            depends_on.join(", ")
        );
    }

    let visible: Vec<String> =
        host.orchestrator().modules_for_role(role).iter().map(ToString::to_string).collect();
    println!();
    println!("visible to {role}: {}", visible.join(", "));

    let widgets = host.extensions().invoke_values(modules::WIDGETS, &Value::Null);
    println!("{}: {}", modules::WIDGETS, json!(widgets));
    let sections = host.extensions().invoke_values(modules::SETTINGS_SECTIONS, &Value::Null);
    println!("{}: {}", modules::SETTINGS_SECTIONS, json!(sections));

    for (module, name) in host.orchestrator().unprovided_consumers() {
        println!("note: {module} consumes '{name}' which no active module provides");
    }
}
