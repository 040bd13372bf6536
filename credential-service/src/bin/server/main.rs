use std::sync::Arc;

use credential_service::config::Config;
use credential_service::domain::auth::service::AuthenticationService;
use credential_service::domain::credential::issuer::TokenIssuer;
use credential_service::domain::session::service::SessionService;
use credential_service::inbound::http::router::create_router;
use credential_service::outbound::ids::Base64IdCodec;
use credential_service::outbound::repositories::PostgresAccessTokenRepository;
use credential_service::outbound::repositories::PostgresAuthClientRepository;
use credential_service::outbound::repositories::PostgresBrokerClientRepository;
use credential_service::outbound::repositories::PostgresOwnerDirectory;
use credential_service::outbound::repositories::PostgresSessionRepository;
use credential_service::outbound::repositories::PostgresTeamBrokerClientRepository;
use credential_service::outbound::repositories::PostgresTeamDirectory;
use credential_service::outbound::repositories::PostgresUserRepository;
use secrets::Codec;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "credential-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let session_policy = config.session.policy()?;

    tracing::info!(
        http_port = config.server.http_port,
        broker_url = %config.broker.url,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let codec = Arc::new(Codec::new()?);
    let id_codec = Arc::new(Base64IdCodec);

    let access_tokens = Arc::new(PostgresAccessTokenRepository::new(pg_pool.clone()));
    let auth_clients = Arc::new(PostgresAuthClientRepository::new(pg_pool.clone()));
    let broker_clients = Arc::new(PostgresBrokerClientRepository::new(pg_pool.clone()));
    let team_broker_clients = Arc::new(PostgresTeamBrokerClientRepository::new(pg_pool.clone()));
    let sessions_repo = Arc::new(PostgresSessionRepository::new(pg_pool.clone()));
    let users = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let owners = Arc::new(PostgresOwnerDirectory::new(
        pg_pool.clone(),
        id_codec.clone(),
    ));
    let teams = Arc::new(PostgresTeamDirectory::new(pg_pool, id_codec));

    let engine = Arc::new(AuthenticationService::new(
        Arc::clone(&broker_clients),
        Arc::clone(&team_broker_clients),
        Arc::clone(&access_tokens),
        Arc::clone(&auth_clients),
        Arc::clone(&users),
        owners,
        teams,
        Arc::clone(&codec),
    ));
    let sessions = Arc::new(SessionService::new(
        sessions_repo,
        users,
        Arc::clone(&codec),
        session_policy,
    ));
    let issuer = Arc::new(TokenIssuer::new(
        access_tokens,
        auth_clients,
        broker_clients,
        team_broker_clients,
        codec,
        config.broker.url.clone(),
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(engine, sessions, issuer);
    axum::serve(http_listener, http_application).await?;

    Ok(())
}
