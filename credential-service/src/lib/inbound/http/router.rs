use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use secrets::Codec;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::broker_auth::auth_client;
use super::handlers::broker_auth::auth_user;
use super::handlers::login::login;
use super::handlers::session::delete_session;
use super::handlers::session::get_session;
use super::handlers::tokens::create_token;
use super::middleware::authenticate as auth_middleware;
use crate::domain::auth::service::AuthenticationService;
use crate::domain::credential::issuer::TokenIssuer;
use crate::domain::session::service::SessionService;
use crate::outbound::repositories::PostgresAccessTokenRepository;
use crate::outbound::repositories::PostgresAuthClientRepository;
use crate::outbound::repositories::PostgresBrokerClientRepository;
use crate::outbound::repositories::PostgresOwnerDirectory;
use crate::outbound::repositories::PostgresSessionRepository;
use crate::outbound::repositories::PostgresTeamBrokerClientRepository;
use crate::outbound::repositories::PostgresTeamDirectory;
use crate::outbound::repositories::PostgresUserRepository;

pub type Engine = AuthenticationService<
    PostgresBrokerClientRepository,
    PostgresTeamBrokerClientRepository,
    PostgresAccessTokenRepository,
    PostgresAuthClientRepository,
    PostgresUserRepository,
    PostgresOwnerDirectory,
    PostgresTeamDirectory,
    Codec,
>;

pub type Sessions = SessionService<PostgresSessionRepository, PostgresUserRepository, Codec>;

pub type Issuer = TokenIssuer<
    PostgresAccessTokenRepository,
    PostgresAuthClientRepository,
    PostgresBrokerClientRepository,
    PostgresTeamBrokerClientRepository,
    Codec,
>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<Sessions>,
    pub issuer: Arc<Issuer>,
}

pub fn create_router(engine: Arc<Engine>, sessions: Arc<Sessions>, issuer: Arc<Issuer>) -> Router {
    let state = AppState {
        engine,
        sessions,
        issuer,
    };

    let public_routes = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/session/:session_id", get(get_session))
        .route("/api/auth/session/:session_id", delete(delete_session))
        .route("/api/comms/auth/user", post(auth_user))
        .route("/api/comms/auth/client", post(auth_client));

    let protected_routes = Router::new()
        .route("/api/tokens", post(create_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
