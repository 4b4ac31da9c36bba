use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use panggung_server::collaborators::{LogMailer, LogNotifier, RandomTokenGenerator, SystemClock};
use panggung_server::config::Config;
use panggung_server::db::Database;
use panggung_server::routes::create_routes;
use panggung_server::state::AppState;
use panggung_server::tasks::spawn_reaper_task;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let db = Database::connect(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");
    db.migrate().await.expect("Failed to run migrations");

    let state = AppState::new(
        db,
        &config,
        Arc::new(SystemClock),
        Arc::new(LogNotifier),
        Arc::new(LogMailer),
        Arc::new(RandomTokenGenerator),
    );

    spawn_reaper_task(state.transactions.clone(), config.reaper_interval_secs);

    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
