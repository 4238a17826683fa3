//! Directory login endpoint.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::ValidJson;
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    /// Directory login identifier.
    #[validate(length(min = 1, message = "Username must not be empty."))]
    pub username: String,
    /// Forwarded to the caller's session layer, never stored here.
    #[validate(length(min = 1, message = "Password must not be empty."))]
    pub password: String,
}

/// Handler to log a user in against the directory.
///
/// On success the provisioned local record is returned; the host is
/// expected to open its own session from it.
pub async fn handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<Body>,
) -> Result<Json<User>> {
    let user = state
        .auth
        .authenticate(&body.username, &body.password)
        .await?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;

    use crate::directory::DirectorySettings;
    use crate::directory::testing::{StubConnector, entry};
    use crate::router::testing;
    use crate::user::User;
    use crate::{app, make_request};

    fn enabled_settings() -> DirectorySettings {
        DirectorySettings {
            enabled: true,
            server_url: "ldap://localhost:389".to_owned(),
            organizational_unit: "ou=people,dc=example,dc=org".to_owned(),
            search_template: "uid={0}".to_owned(),
            ..DirectorySettings::default()
        }
    }

    fn billy() -> crate::directory::DirectoryEntry {
        entry(
            "uid=bill,ou=people,dc=example,dc=org",
            &[
                ("givenName", "Billy"),
                ("mail", "billy@test.com"),
                ("uid", "bill"),
            ],
        )
    }

    #[tokio::test]
    async fn test_login_provisions_and_returns_user() {
        let ctx = testing::state(
            enabled_settings(),
            StubConnector::with_entries(vec![billy()]),
        );
        let app = app(ctx.state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({ "username": "bill", "password": "secret" }).to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let user: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.email, "billy@test.com");
        assert_eq!(user.first_name, "Billy");
        assert_eq!(user.username, "bill");
        assert_eq!(ctx.users.len(), 1);
    }

    #[tokio::test]
    async fn test_login_rejects_disabled_bridge() {
        let ctx = testing::state(
            DirectorySettings::default(),
            StubConnector::empty(),
        );
        let app = app(ctx.state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({ "username": "bill", "password": "secret" }).to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["detail"], "LDAP is not enabled.");
        assert_eq!(ctx.connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_user() {
        let ctx =
            testing::state(enabled_settings(), StubConnector::empty());
        let app = app(ctx.state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({ "username": "nobody", "password": "secret" }).to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["detail"], "Not a valid LDAP user");
        assert_eq!(ctx.users.len(), 0);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_username() {
        let ctx = testing::state(
            enabled_settings(),
            StubConnector::with_entries(vec![billy()]),
        );
        let app = app(ctx.state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({ "username": "", "password": "secret" }).to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.connector.connects(), 0);
    }
}
