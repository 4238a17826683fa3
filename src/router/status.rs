//! Public configuration page for front-end identification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::config::Configuration;

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    version: String,
    name: String,
}

/// Public server status (configuration).
pub async fn status(
    State(config): State<Arc<Configuration>>,
) -> Json<Status> {
    Json(Status {
        version: env!("CARGO_PKG_VERSION").into(),
        name: if config.name.is_empty() {
            env!("CARGO_CRATE_NAME").into()
        } else {
            config.name.clone()
        },
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::directory::DirectorySettings;
    use crate::directory::testing::StubConnector;
    use crate::router::testing;
    use crate::{app, make_request};

    #[tokio::test]
    async fn test_status_reports_version_and_name() {
        let ctx = testing::state(
            DirectorySettings::default(),
            StubConnector::empty(),
        );
        let app = app(ctx.state.clone());

        let response =
            make_request(app, Method::GET, "/status.json", String::default())
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["name"], env!("CARGO_CRATE_NAME"));
    }
}
