use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use feed_core::analytics::Analytics;
use feed_core::cache::{Cache, CacheConfig};
use feed_core::config::Config;
use feed_core::db::{create_pool, EpisodeRepo, TitleRepo, UserRepo, WatchRepo};
use feed_core::handlers::{self, AppState};
use feed_core::jobs::{
    cache_warmer::{start_cache_warmer, CacheWarmerConfig},
    redis_keepalive::{start_redis_keepalive, RedisKeepaliveConfig},
};
use feed_core::middleware::MetricsMiddleware;
use feed_core::openapi::ApiDoc;
use feed_core::services::Orchestrator;

async fn health_live() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "live" }))
}

async fn health_ready(state: web::Data<AppState>) -> HttpResponse {
    if state.orchestrator.health_check().await {
        HttpResponse::Ok().json(serde_json::json!({ "status": "ready" }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "degraded" }))
    }
}

async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(feed_core::metrics::render().await)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_target(true).with_line_number(true))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(env = %config.app.env, port = config.app.port, "configuration loaded");

    let pool = match create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("failed to create database pool: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("failed to run database migrations: {e}");
        std::process::exit(1);
    }
    tracing::info!("database migrations applied");

    let cache = Cache::connect(
        &config.redis.url,
        CacheConfig {
            namespace: config.core.cache_namespace.clone(),
        },
    )
    .await;

    let analytics = Analytics::new();

    tokio::spawn(start_redis_keepalive(cache.clone(), RedisKeepaliveConfig::default()));

    if config.redis.cache_warmer_enabled {
        let warmer_cache = cache.clone();
        let warmer_core = config.core.clone();
        let warmer_pool = pool.clone();
        tokio::spawn(start_cache_warmer(
            TitleRepo::new(warmer_pool.clone()),
            EpisodeRepo::new(warmer_pool.clone()),
            WatchRepo::new(warmer_pool),
            warmer_cache,
            warmer_core,
            CacheWarmerConfig::default(),
        ));
        tracing::info!("prefetch cache warmer job started");
    } else {
        tracing::info!("prefetch cache warmer disabled via CACHE_WARMER_ENABLED");
    }

    let orchestrator = Orchestrator::new(
        TitleRepo::new(pool.clone()),
        EpisodeRepo::new(pool.clone()),
        UserRepo::new(pool.clone()),
        WatchRepo::new(pool),
        cache,
        config.core.clone(),
        analytics,
    );
    let app_state = web::Data::new(AppState { orchestrator });
    let openapi_doc = ApiDoc::openapi();
    let bind_addr = format!("0.0.0.0:{}", config.app.port);

    tracing::info!(%bind_addr, "starting feed-core HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::Data::new(openapi_doc.clone()))
            .wrap(Logger::default())
            .wrap(MetricsMiddleware)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url(ApiDoc::openapi_json_path(), openapi_doc.clone()),
            )
            .route("/health", web::get().to(health_live))
            .route("/health/live", web::get().to(health_live))
            .route("/health/ready", web::get().to(health_ready))
            .route("/metrics", web::get().to(metrics))
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
