//! # Clinic
//!
//! Shared domain logic behind the appointment gateway.
//!
//! ## Layout
//! - `symptoms`: keyword table and the symptom to specialty matcher
//! - `doctors`: roster records and the recommendation payloads
//! - `validate`: request form validation (login, register, appointments, symptoms)
//! - `auth`: bearer token helpers and login cookie lifetime
//! - `remote`: client for the upstream clinical API
//!
//! ## Flow
//! 1. The gateway validates the incoming form.
//! 2. The upstream API is called with the caller's bearer token.
//! 3. For recommendations, the fetched roster is ranked locally by `SymptomMatcher`.
//!
//! Nothing in here keeps state between requests. The keyword table is built once
//! and only read afterwards.

pub mod auth;
pub mod doctors;
pub mod remote;
pub mod symptoms;
pub mod validate;

pub use auth::AuthToken;
pub use doctors::{DoctorRecord, Recommendation, Recommendations};
pub use remote::{ClinicApi, RemoteError, Roster, UpstreamBody, UpstreamResponse};
pub use symptoms::{KeywordTable, SpecialtyScores, SymptomMatcher, TableError};
pub use validate::{Email, ValidationErrors};
