use opshub_derive::opshub_error;
use std::borrow::Cow;

#[opshub_error]
pub enum CatalogueError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Unknown entry{}: {message}", format_context(.context))]
    UnknownEntry { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn missing_file() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "catalogue.toml"))
}

#[test]
fn source_errors_convert_with_context() {
    let err = missing_file().context("Loading catalogue").unwrap_err();
    assert!(matches!(err, CatalogueError::Io { context: Some(_), .. }));
    assert_eq!(err.to_string(), "IO error (Loading catalogue): catalogue.toml");
}

#[test]
fn question_mark_uses_from_impl() {
    fn load() -> Result<(), CatalogueError> {
        missing_file()?;
        Ok(())
    }

    let err = load().unwrap_err();
    assert!(matches!(err, CatalogueError::Io { context: None, .. }));
    assert_eq!(err.to_string(), "IO error: catalogue.toml");
}

#[test]
fn context_overrides_existing_variant_context() {
    let result: Result<(), CatalogueError> =
        Err(CatalogueError::UnknownEntry { message: "billing".into(), context: None });

    let err = result.context("Resolving capability").unwrap_err();
    assert_eq!(err.to_string(), "Unknown entry (Resolving capability): billing");
}

#[test]
fn internal_variant_accepts_strings() {
    let from_static: CatalogueError = "broken invariant".into();
    let from_owned: CatalogueError = String::from("lost lease").into();

    assert!(matches!(from_static, CatalogueError::Internal { .. }));
    assert_eq!(from_owned.to_string(), "Internal error: lost lease");
}

#[test]
fn opshub_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/opshub_error_pass.rs");
}
