//! Request form validation.
//!
//! Every form collects all field failures before returning, so the caller can show
//! them next to their inputs. Field names are the camelCase JSON names.
use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid email format: {0}")]
pub struct InvalidEmail(pub String);

/// Trimmed, lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, InvalidEmail> {
        let trimmed = raw.trim();

        if trimmed.is_empty() || !EMAIL_RE.is_match(trimmed) {
            return Err(InvalidEmail(raw.to_string()));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field name to messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    #[serde(flatten)]
    fields: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    order: Vec<String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        if !self.fields.contains_key(field) {
            self.order.push(field.to_string());
        }

        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// First failure as `field: message`.
    pub fn summary(&self) -> String {
        self.order
            .first()
            .and_then(|field| {
                self.fields
                    .get(field)
                    .and_then(|messages| messages.first())
                    .map(|message| format!("{field}: {message}"))
            })
            .unwrap_or_else(|| "Validation failed".to_string())
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

fn require(errors: &mut ValidationErrors, field: &str, value: &str, message: &str) {
    if value.is_empty() {
        errors.add(field, message);
    }
}

fn check_email(errors: &mut ValidationErrors, raw: &str) -> Option<Email> {
    Email::parse(raw)
        .map_err(|_| errors.add("email", "Invalid email format"))
        .ok()
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be at least 6 characters");
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl LoginForm {
    pub fn is_incomplete(&self) -> bool {
        self.email.is_empty() || self.password.is_empty()
    }

    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let email = check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);

        match email {
            Some(email) => errors.into_result(Credentials {
                email,
                password: self.password.clone(),
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub address: String,
}

impl RegisterForm {
    /// Returns the form with a normalized email.
    pub fn validate(&self) -> Result<RegisterForm, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        require(&mut errors, "firstName", &self.first_name, "First name is required");
        require(&mut errors, "lastName", &self.last_name, "Last name is required");
        let email = check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        require(&mut errors, "phoneNumber", &self.phone_number, "Phone number is required");
        require(&mut errors, "dateOfBirth", &self.date_of_birth, "Date of birth is required");
        require(&mut errors, "address", &self.address, "Address is required");

        match email {
            Some(email) => errors.into_result(RegisterForm {
                email: email.to_string(),
                ..self.clone()
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppointmentForm {
    pub doctor_id: String,
    pub appointment_date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
}

impl AppointmentForm {
    pub fn validate(&self) -> Result<&Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        require(&mut errors, "doctorId", &self.doctor_id, "Doctor ID is required");
        require(&mut errors, "appointmentDate", &self.appointment_date, "Appointment date is required");
        require(&mut errors, "startTime", &self.start_time, "Start time is required");
        require(&mut errors, "endTime", &self.end_time, "End time is required");
        require(&mut errors, "reason", &self.reason, "Reason is required");

        errors.into_result(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SymptomsForm {
    pub symptoms: Option<String>,
}

impl SymptomsForm {
    /// `None` when the text is missing or blank.
    pub fn symptoms(&self) -> Option<&str> {
        self.symptoms
            .as_deref()
            .filter(|symptoms| !symptoms.trim().is_empty())
    }
}
