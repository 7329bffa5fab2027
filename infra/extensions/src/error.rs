use std::borrow::Cow;

/// Registration errors of the [`Dispatcher`](crate::Dispatcher).
///
/// Invocation itself never fails; handler errors are contained per slot.
#[opshub_derive::opshub_error]
pub enum ExtensionError {
    /// Point names follow `<domain>.<point>`.
    #[error("Invalid extension point name{}: {message}", format_context(.context))]
    InvalidPointName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Module is not active{}: {message}", format_context(.context))]
    ModuleNotActive { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
