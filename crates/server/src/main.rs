use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use server::config::settings;
use server::db::{create_pool, run_migrations, AppState};
use server::jobs::Scheduler;
use server::{health, openapi, rest, telemetry};

#[tokio::main]
async fn main() {
    telemetry::init();
    health::record_start_time();

    let settings = settings();
    tracing::info!(
        environment = %settings.environment,
        bind = %settings.bind_addr,
        "Starting compliance server"
    );

    let pool = create_pool();
    run_migrations(&pool).await;

    Scheduler::new(pool.clone()).spawn();

    let cors = match settings.app_base_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        Err(_) => CorsLayer::permissive(),
    };

    let state = AppState { pool };
    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .merge(rest::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!(addr = %settings.bind_addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
