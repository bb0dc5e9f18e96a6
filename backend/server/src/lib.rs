//! Backend-for-frontend gateway of the clinic appointment app.
//!
//! # General Infrastructure
//! - The browser only ever talks to this gateway
//! - The gateway forwards to the remote clinical API, whose base URL (including `/api`)
//!   comes from `CLINIC_API_URL`
//! - The bearer token returned on login is kept in an HttpOnly `auth_token` cookie and
//!   attached as `Authorization: Bearer` on every upstream call
//!
//! # Routes
//! - `POST /api/auth/login`, `POST /api/auth/register`, `POST /api/auth/logout`, `GET /api/auth/me`
//! - `GET /api/doctors/lookup`, `POST /api/doctors/recommend`
//! - `GET /api/appointments`, `POST /api/appointments`, `DELETE /api/appointments/:id`
//!
//! # Recommendations
//! The roster is fetched from upstream on every request and ranked locally against the
//! symptom text by `clinic::SymptomMatcher`. Nothing is cached between requests.
//!
//! # Errors
//! Every error body is JSON with a `message`, plus `details` when it came from upstream.
//! Rejected upstream calls keep their status code.
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    appointments_handler, create_appointment_handler, delete_appointment_handler,
    doctors_handler, login_handler, logout_handler, me_handler, recommend_handler,
    register_handler,
};
use state::State;

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/me", get(me_handler))
        .route("/api/doctors/lookup", get(doctors_handler))
        .route("/api/doctors/recommend", post(recommend_handler))
        .route(
            "/api/appointments",
            get(appointments_handler).post(create_appointment_handler),
        )
        .route("/api/appointments/:id", delete(delete_appointment_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
