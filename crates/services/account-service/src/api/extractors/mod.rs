//! Custom request extractors.

mod validated_form;

pub use validated_form::{ValidatedForm, ValidatedQuery};
