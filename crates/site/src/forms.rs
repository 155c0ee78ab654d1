//! Server-side form validation.
//!
//! Handlers deserialize a form, run it through [`FieldErrors`] checks and,
//! on failure, render the same page again with the submitted values and
//! a message next to each offending field.

use std::collections::BTreeMap;

use serde::Deserialize;

use lodge_core::Email;

use crate::models::GuestDetails;

/// Shortest accepted first name on the reservation form.
pub const MIN_FIRST_NAME_LENGTH: usize = 3;

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    /// First message recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Whether any field has failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every listed field must be non-blank.
    pub fn required(&mut self, fields: &[(&'static str, &str)]) {
        for (field, value) in fields {
            if value.trim().is_empty() {
                self.add(field, "This field cannot be blank");
            }
        }
    }

    /// Returns `true` if `value` has at least `min` characters.
    pub fn min_length(&mut self, field: &'static str, value: &str, min: usize) -> bool {
        if value.trim().chars().count() < min {
            self.add(field, format!("This field must be at least {min} characters long"));
            return false;
        }
        true
    }

    /// Parse an email address, recording a failure against `field`.
    pub fn email(&mut self, field: &'static str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(_) => {
                self.add(field, "Invalid email address");
                None
            }
        }
    }
}

/// Guest details as submitted on the reservation form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl ReservationForm {
    /// Check the submission and build guest details from it.
    ///
    /// # Errors
    ///
    /// Returns every field that failed, so the form can show all of them
    /// at once.
    pub fn validate(&self) -> Result<GuestDetails, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required(&[
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
        ]);
        if errors.get("first_name").is_none() {
            errors.min_length("first_name", &self.first_name, MIN_FIRST_NAME_LENGTH);
        }
        let email = if errors.get("email").is_none() {
            errors.email("email", &self.email)
        } else {
            None
        };

        match email {
            Some(email) if errors.is_valid() => Ok(GuestDetails {
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                email,
                phone: self.phone.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

impl From<&GuestDetails> for ReservationForm {
    fn from(guest: &GuestDetails) -> Self {
        Self {
            first_name: guest.first_name.clone(),
            last_name: guest.last_name.clone(),
            email: guest.email.to_string(),
            phone: guest.phone.clone(),
        }
    }
}
