//! Typed, validatable field descriptors.
//!
//! - [`Field`]: a scalar, array or object value descriptor with type
//!   coercion and an ordered validator chain
//! - [`VariantField`]: a value checked against candidate fields under
//!   `anyOf`/`allOf`/`oneOf`
//! - [`FieldSpec`]: either kind, behind the shared [`Fieldable`] capability
//! - [`FieldBuilder`] / [`VariantFieldBuilder`]: fluent declarations bound
//!   to a name and a [`BuildEnv`] at schema-build time
//! - [`MessageTemplates`]: localized validation messages
//!
//! Validation is pure: it returns a [`Validation`] carrying the converted
//! value and the first failure instead of mutating the shared field.

mod builder;
mod error;
mod field;
mod spec;
mod templates;
mod validation;
mod variant;

pub use builder::{AnyFieldBuilder, BuildEnv, FieldBuilder, VariantFieldBuilder};
pub use error::{FieldError, FieldResult};
pub use field::{Field, FieldDefault, FieldOptions, FieldType, ItemOf};
pub use spec::{FieldSpec, Fieldable};
pub use templates::{ErrorContext, LangSelector, MessageTemplates, Template};
pub use validation::{ErrorKind, Validation, ValidationError};
pub use variant::{Combinator, VariantField, VariantValidation};
