//! Annuaire bridges application logins to an LDAP directory.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod database;
pub mod directory;
pub mod error;
mod router;
pub mod telemetry;
pub mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post, put};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub settings: Arc<dyn directory::SettingsStore>,
    pub connector: Arc<dyn directory::DirectoryConnector>,
    pub auth: directory::Authenticator,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(
                    |chunk: &Bytes,
                     latency: Duration,
                     _span: &tracing::Span| {
                        tracing::trace!(
                            size_bytes = chunk.len(),
                            latency = ?latency,
                            "sending body chunk"
                        )
                    },
                )
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(true)
                        .level(tracing::Level::INFO),
                )
                .on_request(DefaultOnRequest::new())
                .on_response(
                    DefaultOnResponse::new()
                        .include_headers(true)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::OPTIONS,
                ])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /login` verifies a credential against the directory.
        .route("/login", post(router::login::handler))
        // `GET /directory.json` tells the login page about the bridge.
        .route("/directory.json", get(router::directory::client_config))
        // `PUT /directory/settings` replaces the stored configuration.
        .route(
            "/directory/settings",
            put(router::directory::update_settings),
        )
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref cfg) => {
            database::Database::new(
                &cfg.address,
                &cfg.username
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &cfg.password
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &cfg.database
                    .clone()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME.into()),
                cfg.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            // Settings and user records both live in PostgreSQL.
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            return Err(
                "missing `postgres` entry on `config.yaml` file".into()
            );
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let settings: Arc<dyn directory::SettingsStore> =
        Arc::new(directory::PgSettingsStore::new(db.postgres.clone()));
    let users: Arc<dyn user::UserStore> =
        Arc::new(user::PgUserStore::new(db.postgres.clone()));
    let connector: Arc<dyn directory::DirectoryConnector> =
        Arc::new(directory::LdapConnector::new());

    let auth = directory::Authenticator::new(
        Arc::clone(&settings),
        users,
        Arc::clone(&connector),
    );

    Ok(AppState {
        config,
        settings,
        connector,
        auth,
    })
}
