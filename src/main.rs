mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use crate::{
    db::db::DBClient,
    mail::sendmail::Mailer,
    middleware::rate_limit::{login_rate_limiter, otp_rate_limiter, RateLimiter},
    service::{
        ai_service::AiService,
        escrow_service::EscrowService,
        kyc_service::KycService,
        otp_service::{InMemoryOtpStore, OtpStore, RedisOtpStore, SmsOtpClient},
        transcription_service::TranscriptionService,
        trust_service::TrustService,
    },
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub trust_service: Arc<TrustService>,
    pub escrow_service: Arc<EscrowService>,
    pub ai_service: Arc<AiService>,
    pub transcription_service: Arc<TranscriptionService>,
    pub kyc_service: Arc<KycService>,
    pub sms_otp: Arc<SmsOtpClient>,
    pub mailer: Arc<Mailer>,
    pub otp_store: Arc<dyn OtpStore>,
    // Rate limits
    pub otp_limiter: RateLimiter,
    pub login_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client = Arc::new(db_client);

        let trust_service = Arc::new(TrustService::new(db_client.clone()));
        let escrow_service = Arc::new(EscrowService::new(
            db_client.clone(),
            trust_service.clone(),
            config.platform_fee_percent,
        ));

        let otp_store: Arc<dyn OtpStore> = match db_client.redis_client.clone() {
            Some(redis) => Arc::new(RedisOtpStore::new(redis)),
            None => Arc::new(InMemoryOtpStore::new()),
        };

        Self {
            ai_service: Arc::new(AiService::new(&config)),
            transcription_service: Arc::new(TranscriptionService::new(&config)),
            kyc_service: Arc::new(KycService::new(&config)),
            sms_otp: Arc::new(SmsOtpClient::new(&config)),
            mailer: Arc::new(Mailer::new(&config)),
            otp_store,
            otp_limiter: otp_rate_limiter(),
            login_limiter: login_rate_limiter(),
            env: config,
            db_client,
            trust_service,
            escrow_service,
        }
    }

    /// State backed by a pool that never connects unless a query runs.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();

        AppState::new(DBClient::new(pool), config)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kaamsetu=debug,tower_http=info")),
        )
        .init();

    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    let db_client = match config.redis_url.as_deref() {
        Some(redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => {
            tracing::info!("Redis not configured, email OTPs are kept in memory");
            DBClient::new(pool)
        }
    };

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tokio::spawn(service::background_jobs::start_cleanup_job(app_state.clone()));

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
