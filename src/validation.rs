//! Validation Support
//!
//! Request bodies are JSON documents, so validation walks a
//! [`Document`](crate::store::Document) and collects every failure before
//! reporting, rather than stopping at the first one. Each resource declares
//! a plain `fn(&Document, ValidationMode) -> Result<(), ValidationErrors>`
//! built on [`DocumentValidator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use campdir::validation::{DocumentValidator, ValidationMode};
//!
//! fn validate_review(doc: &Document, mode: ValidationMode) -> Result<(), ValidationErrors> {
//!     DocumentValidator::new(doc, mode)
//!         .required_string("title", Some(100))
//!         .number_range("rating", Some(1.0), Some(10.0), true)
//!         .finish()
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::store::Document;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was collected.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Whether a body is a full document or a partial update.
///
/// In [`ValidationMode::Update`], required fields may be omitted, but any
/// field that is present must still satisfy its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Signature of a resource's body validator.
pub type ValidateFn = fn(&Document, ValidationMode) -> Result<(), ValidationErrors>;

/// Fluent checker over one JSON body.
pub struct DocumentValidator<'a> {
    doc: &'a Document,
    mode: ValidationMode,
    errors: ValidationErrors,
}

impl<'a> DocumentValidator<'a> {
    #[must_use]
    pub fn new(doc: &'a Document, mode: ValidationMode) -> Self {
        Self {
            doc,
            mode,
            errors: ValidationErrors::new(),
        }
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(ValidationError::new(field, message));
    }

    /// Present and not null.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    fn check_missing(&mut self, field: &str, required: bool) {
        if required && self.mode == ValidationMode::Create {
            self.fail(field, "is required");
        }
    }

    /// Non-blank string, optionally capped at `max_len` characters.
    #[must_use]
    pub fn required_string(self, field: &str, max_len: Option<usize>) -> Self {
        self.string(field, max_len, true)
    }

    /// String rule; `required` only applies on create.
    #[must_use]
    pub fn string(mut self, field: &str, max_len: Option<usize>, required: bool) -> Self {
        match self.present(field) {
            None => self.check_missing(field, required),
            Some(Value::String(s)) => {
                if s.trim().is_empty() {
                    if required {
                        self.fail(field, "is required");
                    }
                } else if let Some(max) = max_len
                    && s.chars().count() > max
                {
                    self.fail(field, format!("must be at most {max} characters"));
                }
            }
            Some(_) => self.fail(field, "must be a string"),
        }
        self
    }

    /// Number within the inclusive range `[min, max]`.
    #[must_use]
    pub fn number_range(
        mut self,
        field: &str,
        min: Option<f64>,
        max: Option<f64>,
        required: bool,
    ) -> Self {
        match self.present(field) {
            None => self.check_missing(field, required),
            Some(value) => match value.as_f64() {
                Some(n) => {
                    if let Some(min) = min
                        && n < min
                    {
                        self.fail(field, format!("must be at least {min}"));
                    }
                    if let Some(max) = max
                        && n > max
                    {
                        self.fail(field, format!("must be at most {max}"));
                    }
                }
                None => self.fail(field, "must be a number"),
            },
        }
        self
    }

    /// String that must be one of `allowed`.
    #[must_use]
    pub fn one_of(mut self, field: &str, allowed: &[&str], required: bool) -> Self {
        match self.present(field) {
            None => self.check_missing(field, required),
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => {}
            Some(_) => self.fail(field, format!("must be one of: {}", allowed.join(", "))),
        }
        self
    }

    /// Non-empty array whose items are all drawn from `allowed`.
    #[must_use]
    pub fn string_list_of(mut self, field: &str, allowed: &[&str], required: bool) -> Self {
        match self.present(field) {
            None => self.check_missing(field, required),
            Some(Value::Array(items)) => {
                if items.is_empty() && required {
                    self.fail(field, "must contain at least one value");
                }
                for item in items {
                    match item.as_str() {
                        Some(s) if allowed.contains(&s) => {}
                        _ => {
                            self.fail(
                                field,
                                format!("values must be one of: {}", allowed.join(", ")),
                            );
                            break;
                        }
                    }
                }
            }
            Some(_) => self.fail(field, "must be an array"),
        }
        self
    }

    #[must_use]
    pub fn boolean(mut self, field: &str) -> Self {
        if let Some(value) = self.present(field)
            && !value.is_boolean()
        {
            self.fail(field, "must be true or false");
        }
        self
    }

    /// Optional http(s) URL.
    #[must_use]
    pub fn url(mut self, field: &str) -> Self {
        match self.present(field) {
            None => {}
            Some(Value::String(s)) => match url::Url::parse(s) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => self.fail(field, "must be a valid URL with HTTP or HTTPS"),
            },
            Some(_) => self.fail(field, "must be a string"),
        }
        self
    }

    /// Email shape check: one `@`, a non-empty local part, a dotted domain.
    #[must_use]
    pub fn email(mut self, field: &str, required: bool) -> Self {
        match self.present(field) {
            None => self.check_missing(field, required),
            Some(Value::String(s)) => {
                if !looks_like_email(s) {
                    self.fail(field, "must be a valid email");
                }
            }
            Some(_) => self.fail(field, "must be a string"),
        }
        self
    }

    /// Collect the outcome.
    ///
    /// # Errors
    ///
    /// Returns every failure recorded by the preceding rules.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.result()
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.len() > 255 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
