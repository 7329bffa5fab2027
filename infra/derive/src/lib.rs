#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the module host workspace.
//!
//! Every crate declares its error enum through [`macro@opshub_error`] so that
//! errors look and behave the same way everywhere: a `thiserror` display, an
//! optional context string and a `...Ext::context` helper on `Result`.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! opshub-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for domain error enums.
///
/// # Features
///
/// * **Derives**: adds `Debug` and `thiserror::Error` unless already derived.
/// * **Context**: generates a `<Name>Ext` trait with `.context(...)` for
///   `Result<T, Name>` and, for every variant wrapping a `source`, for
///   `Result<T, Source>` as well.
/// * **Conversions**: `From<Source>` for source variants, and `From<&'static str>` /
///   `From<String>` when an `Internal { message, context }` variant exists.
/// * **Formatting**: a module-level `format_context(&Option<Cow<'static, str>>)`
///   helper for use inside `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields (tuple and unit variants are rejected).
/// 3. A `context` field must have type `Option<Cow<'static, str>>`.
/// 4. Variants with a `source` field (by name, `#[source]` or `#[from]`) must also
///    carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[opshub_derive::opshub_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("catalogue.toml").context("Reading the catalogue")
/// }
/// ```
#[proc_macro_attribute]
pub fn opshub_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
