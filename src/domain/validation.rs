//! Field-level form errors

use std::collections::BTreeMap;
use std::fmt;
use validator::ValidationErrors;

/// Per-field validation messages, keyed by form field name.
///
/// A non-empty value blocks submission before any request is made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn has(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn field(&self, field: &str) -> &[String] { self.0.get(field).map(Vec::as_slice).unwrap_or(&[]) }
    pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() { Ok(()) } else { Err(crate::AdminError::Validation(self)) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, list) in errors.field_errors() {
            for err in list {
                let message = err.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| format!("invalid {field} ({})", err.code));
                out.add(field, message);
            }
        }
        out
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first { f.write_str("; ")?; }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Runs the derived rules and converts the outcome into [`FormErrors`].
pub fn check<T: validator::Validate>(form: &T) -> FormErrors {
    match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(errors) => errors.into(),
    }
}
