//! Contact and inquiry forms accepted by the brokerage API.
//!
//! Bodies are parsed as JSON and checked field by field; every failing field
//! is reported at once in a 400 response.

use once_cell::sync::Lazy;
use parapet_core::{Error, HttpRequest, HttpResponse};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$")
        .expect("valid email pattern")
});

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ().-]{7,20}$").expect("valid phone pattern"));

const MAX_NAME: usize = 100;
const MAX_MESSAGE: usize = 5000;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub constraint: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Implemented by request bodies that check themselves after parsing.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Collects field errors for one form.
#[derive(Default)]
struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    fn not_empty(&mut self, value: &str, field: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(
                field,
                format!("{} should not be empty", field),
                "notEmpty",
            ));
        }
        self
    }

    fn max_len(&mut self, value: &str, max: usize, field: &str) -> &mut Self {
        if value.chars().count() > max {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be at most {} characters", field, max),
                "maxLength",
            ));
        }
        self
    }

    fn email(&mut self, value: &str, field: &str) -> &mut Self {
        if !EMAIL_REGEX.is_match(value) {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be a valid email", field),
                "isEmail",
            ));
        }
        self
    }

    fn phone(&mut self, value: Option<&str>, field: &str) -> &mut Self {
        if let Some(value) = value
            && !PHONE_REGEX.is_match(value)
        {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be a valid phone number", field),
                "isPhone",
            ));
        }
        self
    }

    fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// `POST /api/contact`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

impl Validate for ContactForm {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::default()
            .not_empty(&self.name, "name")
            .max_len(&self.name, MAX_NAME, "name")
            .email(&self.email, "email")
            .phone(self.phone.as_deref(), "phone")
            .not_empty(&self.message, "message")
            .max_len(&self.message, MAX_MESSAGE, "message")
            .finish()
    }
}

/// What an inquiry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryKind {
    Buy,
    Sell,
    Rent,
    Valuation,
}

/// `POST /api/inquiry`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub kind: InquiryKind,
    /// Listing the inquiry refers to, if any
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Validate for InquiryForm {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::default();
        checks
            .not_empty(&self.name, "name")
            .max_len(&self.name, MAX_NAME, "name")
            .email(&self.email, "email")
            .phone(self.phone.as_deref(), "phone");
        if let Some(property_id) = &self.property_id {
            checks.not_empty(property_id, "propertyId");
        }
        if let Some(message) = &self.message {
            checks.max_len(message, MAX_MESSAGE, "message");
        }
        checks.finish()
    }
}

/// Outcome of parsing a form body.
pub enum Parsed<T> {
    Valid(T),
    /// Ready-made 400 response listing every failing field
    Invalid(HttpResponse),
}

/// Parse a JSON body and validate it.
///
/// Malformed JSON is an [`Error::BadRequest`]; well-formed bodies that fail
/// validation come back as [`Parsed::Invalid`].
pub fn parse_form<T>(req: &HttpRequest) -> Result<Parsed<T>, Error>
where
    T: DeserializeOwned + Validate,
{
    let form: T = serde_json::from_slice(&req.body)
        .map_err(|e| Error::BadRequest(format!("Invalid JSON: {}", e)))?;

    match form.validate() {
        Ok(()) => Ok(Parsed::Valid(form)),
        Err(errors) => Ok(Parsed::Invalid(error_response(&errors)?)),
    }
}

/// 400 `{ error: "validation_failed", message, errors: [...] }`
pub fn error_response(errors: &[FieldError]) -> Result<HttpResponse, Error> {
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    HttpResponse::bad_request().with_json(&serde_json::json!({
        "error": "validation_failed",
        "message": message,
        "errors": errors,
    }))
}
