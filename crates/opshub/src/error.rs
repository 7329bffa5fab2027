use opshub_kernel::config::ConfigError;
use opshub_orchestrator::OrchestratorError;
use std::borrow::Cow;

#[opshub_derive::opshub_error]
pub enum HostError {
    #[error("Orchestrator error{}: {source}", format_context(.context))]
    Orchestrator { source: OrchestratorError, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
