//! Health check handler.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::api::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
    sessions: ServiceStatus,
}

/// Backend state only. Failure details go to the log, never the response.
#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
}

impl ServiceStatus {
    fn from_result<E: std::fmt::Display>(component: &'static str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self { status: "healthy" },
            Err(e) => {
                tracing::error!(component, error = %e, "Health check failed");
                Self {
                    status: "unhealthy",
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Database and session backend connectivity
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, sessions) = futures::join!(state.database.ping(), state.sessions.ping());

    let database = ServiceStatus::from_result("database", database);
    let sessions = ServiceStatus::from_result("sessions", sessions);
    let all_healthy = database.is_healthy() && sessions.is_healthy();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        services: ServiceHealth { database, sessions },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
