use std::borrow::Cow;

/// Errors returned by subscription management.
///
/// Emission never fails: handler errors and panics are logged per delivery.
#[opshub_derive::opshub_error]
pub enum EventBusError {
    /// Event names must be non-empty and free of whitespace.
    #[error("Invalid event name{}: {message}", format_context(.context))]
    InvalidEventName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The subscribing module's activation lease has been revoked.
    #[error("Module is not active{}: {message}", format_context(.context))]
    ModuleNotActive { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
