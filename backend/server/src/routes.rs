use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{self, Path},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use clinic::{
    Recommendations, Roster, UpstreamBody, UpstreamResponse,
    auth::cookie_max_age,
    validate::{AppointmentForm, LoginForm, RegisterForm, SymptomsForm},
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    error::AppError::{self, BadRequest, Unauthorized},
    state::State,
    utils::{auth_cookie, clear_auth_cookie, parse_body, require_token},
};

type AppState = extract::State<Arc<State>>;

/// Upstream `{ result, success, message }` wrapper, read one field at a time so a
/// single unexpected value does not hide the rest.
struct Envelope {
    result: Value,
    message: Option<String>,
}

impl Envelope {
    fn read(value: Value) -> Self {
        let message = text(&value["message"]);
        let result = match value {
            Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
            _ => Value::Null,
        };

        Self { result, message }
    }

    fn field(&self, key: &str) -> Option<String> {
        text(&self.result[key])
    }
}

/// Non-empty string, or a number rendered as text.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub address: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub appointment_date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Successful upstream JSON body, or the matching error.
fn accepted(response: UpstreamResponse, fallback: &str) -> Result<Value, AppError> {
    if !response.is_success() {
        return Err(AppError::upstream(response, fallback));
    }

    match response.body {
        UpstreamBody::Json(value) => Ok(value),
        malformed => Err(AppError::malformed_upstream(&malformed)),
    }
}

pub async fn login_handler(
    extract::State(state): AppState,
    body: Bytes,
) -> Result<Response, AppError> {
    let form: LoginForm = parse_body(&body)?;

    if form.is_incomplete() {
        return Err(BadRequest("Email and password are required"));
    }

    let credentials = form.validate().map_err(|fields| AppError::Validation {
        message: "Validation failed".to_string(),
        fields,
    })?;
    info!(email = %credentials.email, "Login attempt");

    let response = state
        .api
        .login(&json!({
            "email": credentials.email.as_str(),
            "password": credentials.password,
        }))
        .await?;
    let value = accepted(response, "Login failed")?;

    let envelope = Envelope::read(value.clone());

    let Some(token) = envelope.field("token") else {
        return Err(AppError::BadGateway {
            message: "Login succeeded but token was missing".to_string(),
            details: value,
        });
    };

    let (Some(id), Some(email), Some(name)) = (
        envelope.field("patientId"),
        envelope.field("email"),
        envelope.field("fullName"),
    ) else {
        return Err(AppError::BadGateway {
            message: "Login succeeded but user data was missing".to_string(),
            details: value,
        });
    };

    let max_age = cookie_max_age(envelope.field("expiresAt").as_deref(), Utc::now());
    let cookie = auth_cookie(&token, max_age, state.config.secure_cookies())?;

    info!(user_id = %id, "Login successful");

    let session = Session {
        token,
        user: SessionUser {
            id,
            email,
            name,
            created_at: now_iso(),
        },
    };

    Ok(([(SET_COOKIE, cookie)], Json(session)).into_response())
}

pub async fn register_handler(
    extract::State(state): AppState,
    body: Bytes,
) -> Result<Json<RegisteredUser>, AppError> {
    let form: RegisterForm = parse_body(&body)?;
    let form = form.validate().map_err(AppError::invalid)?;
    info!(email = %form.email, "Registration attempt");

    let response = state.api.register(&form).await?;
    let envelope = Envelope::read(accepted(response, "Registration failed")?);

    let id = text(&envelope.result).unwrap_or_default();
    info!(user_id = %id, "Registration successful");

    Ok(Json(RegisteredUser {
        id,
        email: form.email,
        first_name: form.first_name,
        last_name: form.last_name,
        phone_number: form.phone_number,
        date_of_birth: form.date_of_birth,
        address: form.address,
        created_at: now_iso(),
        message: envelope.message,
    }))
}

pub async fn logout_handler(extract::State(state): AppState) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_auth_cookie(state.config.secure_cookies()))],
        Json(json!({ "message": "Logged out" })),
    )
}

pub async fn me_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = require_token(&headers)?;

    if token.is_expired(Utc::now()) {
        return Err(Unauthorized("Unauthorized - Token expired"));
    }

    let response = state.api.current_user(&token).await?;

    Ok(Json(accepted(response, "Failed to fetch user")?))
}

pub async fn doctors_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = require_token(&headers)?;
    let response = state.api.doctors(&token).await?;

    Ok(Json(accepted(response, "Failed to fetch doctors")?))
}

pub async fn recommend_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Recommendations>, AppError> {
    let form: SymptomsForm = parse_body(&body)?;
    let symptoms = form.symptoms().ok_or(BadRequest("Symptoms are required"))?;

    let token = require_token(&headers)?;

    let doctors = match state.api.roster(&token).await? {
        Roster::Doctors(doctors) => doctors,
        Roster::Rejected(response) => {
            return Err(AppError::Upstream {
                status: response.status,
                message: "Failed to fetch doctors".to_string(),
                details: response.body.to_details(),
            });
        }
        Roster::Malformed(body) => return Err(AppError::malformed_upstream(&body)),
    };
    info!(doctors = doctors.len(), "Roster fetched");

    let recommendations = state.matcher.recommend(symptoms, &doctors);
    info!(
        returned = recommendations.recommendations.len(),
        "Recommendations ranked"
    );

    Ok(Json(recommendations))
}

pub async fn appointments_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = require_token(&headers)?;
    let response = state.api.appointments(&token).await?;

    Ok(Json(accepted(response, "Failed to fetch appointments")?))
}

pub async fn create_appointment_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BookedAppointment>, AppError> {
    let form: AppointmentForm = parse_body(&body)?;
    let token = require_token(&headers)?;

    form.validate().map_err(AppError::invalid)?;
    info!(doctor_id = %form.doctor_id, "Create appointment attempt");

    let response = state.api.create_appointment(&token, &form).await?;
    let envelope = Envelope::read(accepted(response, "Appointment creation failed")?);

    let appointment = BookedAppointment {
        id: envelope.field("id").unwrap_or_default(),
        doctor_id: envelope.field("doctorId").unwrap_or(form.doctor_id),
        patient_id: envelope.field("patientId").unwrap_or_default(),
        appointment_date: envelope
            .field("appointmentDate")
            .unwrap_or(form.appointment_date),
        start_time: envelope.field("startTime").unwrap_or(form.start_time),
        end_time: envelope.field("endTime").unwrap_or(form.end_time),
        reason: envelope.field("reason").unwrap_or(form.reason),
        status: envelope
            .field("status")
            .unwrap_or_else(|| "pending".to_string()),
        created_at: now_iso(),
        message: envelope.message,
    };

    if appointment.id.is_empty() {
        warn!("Upstream created an appointment without an id");
    } else {
        info!(appointment_id = %appointment.id, "Appointment created");
    }

    Ok(Json(appointment))
}

pub async fn delete_appointment_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let token = require_token(&headers)?;
    info!(appointment_id = %id, "Delete appointment");

    let response = state.api.delete_appointment(&token, &id).await?;
    if !response.is_success() {
        return Err(AppError::upstream(response, "Failed to delete appointment"));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Appointment deleted successfully" })),
    ))
}
