//! Directory bridge configuration surface.

use axum::http::StatusCode;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::directory::{self, DirectorySettings};
use crate::error::Result;

/// Fully qualified login entry point advertised to clients while the
/// bridge is enabled.
pub const LOGIN_METHOD: &str =
    concat!(env!("CARGO_PKG_NAME"), "::router::login::handler");

/// What the login UI needs to know about the bridge.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whether directory logins are offered.
    pub enabled: bool,
    /// Login entry point, present only when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Handler exposing the bridge state to the login page.
pub async fn client_config(
    State(state): State<AppState>,
) -> Result<Json<ClientConfig>> {
    let settings = state.settings.load().await?;

    Ok(Json(ClientConfig {
        enabled: settings.enabled,
        method: settings.enabled.then(|| LOGIN_METHOD.to_owned()),
    }))
}

/// Handler replacing the stored directory settings.
///
/// Validation and the connectivity probe run before anything is
/// written; deployments are expected to front this route with their own
/// administrator access control.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<DirectorySettings>,
) -> Result<StatusCode> {
    directory::persist(
        state.connector.as_ref(),
        state.settings.as_ref(),
        settings,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
