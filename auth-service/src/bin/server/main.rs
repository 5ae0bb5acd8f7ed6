use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use auth_service::config::Config;
use auth_service::domain::user::service::AuthService;
use auth_service::inbound::messaging::KafkaRequestConsumer;
use auth_service::inbound::messaging::MessageDispatcher;
use auth_service::outbound::repositories::PostgresUserDirectory;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "auth-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let token_ttl = config.jwt.ttl()?;

    tracing::info!(
        request_timeout_ms = config.server.request_timeout_ms,
        max_in_flight_requests = config.server.max_in_flight_requests,
        kafka_brokers = %config.kafka.brokers,
        request_topic = %config.kafka.request_topic,
        reply_topic = %config.kafka.reply_topic,
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

    let password_hasher = PasswordHasher::with_work_factor(config.hashing.work_factor)?;
    let work_factor = password_hasher.work_factor();
    let authenticator = Arc::new(
        Authenticator::new(config.jwt.secret.as_bytes(), token_ttl)
            .with_password_hasher(password_hasher),
    );
    tracing::info!(
        work_factor,
        token_ttl_ms = authenticator.token_ttl().num_milliseconds(),
        "Authenticator configured"
    );

    let user_directory = Arc::new(PostgresUserDirectory::new(pg_pool));
    let auth_service = Arc::new(AuthService::new(user_directory, authenticator));

    let dispatcher = Arc::new(MessageDispatcher::new(
        auth_service,
        config.request_timeout(),
    ));
    let consumer = KafkaRequestConsumer::new(&config, dispatcher)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received, draining in-flight requests"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
    };
    consumer.start_consuming(shutdown).await;

    tracing::info!("Service stopped");

    Ok(())
}
